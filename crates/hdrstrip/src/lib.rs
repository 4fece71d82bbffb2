//! Strip the header section of a text file.
//!
//! hdrstrip copies everything after a sentinel line (`end_header` by default)
//! from a source file to a destination file. Lines move through three
//! threads, one line at a time, over an OS pipe.
//!
//! # Crate Structure
//!
//! - [`transport`] — Anonymous pipe between the Producer and Relay stages
//! - [`frame`] — Length-prefixed line framing with in-band end-of-stream
//! - [`pipeline`] — Permits, line slot, the three stages and [`pipeline::Pipeline`]

/// Re-export transport types.
pub mod transport {
    pub use hdrstrip_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hdrstrip_frame::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use hdrstrip_pipeline::*;
}
