//! Anonymous pipe transport for the hdrstrip line pipeline.
//!
//! This is the lowest layer of hdrstrip: a one-directional, ordered,
//! capacity-bounded byte conduit between two threads of the same process.
//! The pipeline's Producer owns the [`PipeWriter`] end and its Relay owns the
//! [`PipeReader`] end.

pub mod error;

#[cfg(unix)]
pub mod pipe;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use pipe::{pipe, PipeReader, PipeWriter};
