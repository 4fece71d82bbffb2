//! Three-stage pipeline that copies the content section of a file.
//!
//! A source is split into a header and a content section by a sentinel
//! line. Three stages pass exactly one line at a time:
//!
//! - **Producer** reads a line and writes it into an OS pipe as one frame
//! - **Relay** reads the frame into the shared line slot
//! - **Filter** discards header lines (sentinel included) and writes the rest
//!
//! Turn-taking is enforced by three counting [`permit::Permit`]s forming the
//! cycle read-turn → relay-ready → filter-ready. End of input travels through
//! the same cycle as an end-of-stream frame, so every stage observes it and
//! exits.
//!
//! ```no_run
//! use hdrstrip_pipeline::{Pipeline, PipelineConfig};
//!
//! let report = Pipeline::new(PipelineConfig::default())?.run_files("data.txt", "src.txt")?;
//! println!("{} content lines", report.lines_written);
//! # Ok::<(), hdrstrip_pipeline::PipelineError>(())
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod permit;
pub mod slot;

#[cfg(unix)]
mod pipeline;
mod producer;
mod relay;

pub use config::{
    OverlongLine, PipelineConfig, SentinelMatch, DEFAULT_MAX_LINE_LEN, DEFAULT_SENTINEL,
    MAX_FRAME_SIZE,
};
pub use error::{PipelineError, Result};
pub use filter::{Disposition, FilterState, HeaderFilter};
#[cfg(unix)]
pub use pipeline::{CancelHandle, Pipeline, PipelineReport};
