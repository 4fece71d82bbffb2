/// Errors that can occur in pipe transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The operating system refused to create the pipe.
    #[error("failed to create pipe: {0}")]
    Create(std::io::Error),

    /// The pipe buffer could not be grown to the requested size.
    #[error("failed to resize pipe to {requested} bytes: {source}")]
    Resize {
        requested: usize,
        source: std::io::Error,
    },

    /// An I/O error occurred on the pipe.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
