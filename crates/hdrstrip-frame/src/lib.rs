//! Length-prefixed line framing for the hdrstrip transport.
//!
//! Every line crossing the pipe is framed with:
//! - A 2-byte magic number ("LN") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian frame kind (line or end-of-stream)
//!
//! The end-of-stream marker travels through the same pipe as the data, so a
//! reader never has to consult shared state to learn that the source closed.

pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use kind::FrameKind;
pub use reader::FrameReader;
pub use writer::FrameWriter;
