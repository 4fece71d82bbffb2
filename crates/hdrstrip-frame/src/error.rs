/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x4C4E \"LN\")")]
    InvalidMagic,

    /// The frame header names a kind this codec does not know.
    #[error("unknown frame kind {0}")]
    UnknownKind(u16),

    /// An end-of-stream frame arrived with a payload attached.
    #[error("end-of-stream frame carries {0} payload bytes")]
    UnexpectedPayload(usize),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying pipe could not be prepared.
    #[error("frame transport error: {0}")]
    Transport(#[from] hdrstrip_transport::TransportError),

    /// The pipe was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
