use std::path::PathBuf;

/// Errors that can occur while building or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The source file could not be opened.
    #[error("cannot open source {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The destination file could not be created.
    #[error("cannot create destination {}: {source}", .path.display())]
    DestinationUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading the next line from the source failed.
    #[error("failed to read source: {0}")]
    Read(std::io::Error),

    /// Writing a content line to the destination failed.
    #[error("failed to write destination: {0}")]
    Write(std::io::Error),

    /// The pipe between Producer and Relay could not be set up.
    #[error("transport error: {0}")]
    Transport(#[from] hdrstrip_transport::TransportError),

    /// A frame could not be sent or received over the pipe.
    #[error("frame error: {0}")]
    Frame(#[from] hdrstrip_frame::FrameError),

    /// A source line is longer than the configured maximum.
    #[error("line {line} exceeds the maximum line length of {max} bytes")]
    LineTooLong { line: u64, max: usize },

    /// The pipeline configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stage thread could not be started.
    #[error("failed to spawn {stage} stage: {source}")]
    Spawn {
        stage: &'static str,
        source: std::io::Error,
    },

    /// The pipeline was cancelled before it finished.
    #[error("pipeline cancelled")]
    Cancelled,

    /// A stage found the line slot in a state its turn does not allow.
    #[error("line slot protocol violated: {0}")]
    ProtocolViolation(&'static str),

    /// A stage thread panicked.
    #[error("{0} stage panicked")]
    StagePanicked(&'static str),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
