use hdrstrip_frame::HEADER_SIZE;

use crate::error::{PipelineError, Result};

/// Marker that ends the header section unless configured otherwise.
pub const DEFAULT_SENTINEL: &str = "end_header";

/// Default maximum line length in bytes, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024;

/// Largest frame the transport is asked to buffer.
///
/// Matches the default Linux `/proc/sys/fs/pipe-max-size`.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// How a line is compared against the sentinel marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentinelMatch {
    /// The marker appears anywhere in the line.
    #[default]
    Contains,
    /// The line, minus one trailing `\n` or `\r\n`, equals the marker.
    Exact,
}

/// What the Producer does with a line longer than `max_line_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlongLine {
    /// Deliver the line as consecutive chunks of at most `max_line_len` bytes.
    #[default]
    Split,
    /// Abort the pipeline with [`PipelineError::LineTooLong`].
    Reject,
}

/// Configuration for one header-stripping pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Literal marking the header/content boundary. Default: `end_header`.
    pub sentinel: String,
    /// Sentinel comparison. Default: substring containment.
    pub sentinel_match: SentinelMatch,
    /// Maximum bytes per relayed line, terminator included. Default: 4 KiB.
    pub max_line_len: usize,
    /// Policy for longer lines. Default: split.
    pub overlong: OverlongLine,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            sentinel_match: SentinelMatch::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            overlong: OverlongLine::default(),
        }
    }
}

impl PipelineConfig {
    /// Check the configuration before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.sentinel.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "sentinel must not be empty".to_string(),
            ));
        }
        if self.sentinel.contains('\n') {
            return Err(PipelineError::InvalidConfig(
                "sentinel must not contain a newline".to_string(),
            ));
        }
        if self.max_line_len == 0 {
            return Err(PipelineError::InvalidConfig(
                "max line length must be at least 1 byte".to_string(),
            ));
        }
        let max = MAX_FRAME_SIZE - HEADER_SIZE;
        if self.max_line_len > max {
            return Err(PipelineError::InvalidConfig(format!(
                "max line length {} exceeds the transport limit of {max} bytes",
                self.max_line_len
            )));
        }
        Ok(())
    }
}
