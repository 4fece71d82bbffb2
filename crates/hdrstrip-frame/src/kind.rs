//! Frame kinds carried in the header's kind field.

use crate::error::{FrameError, Result};

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The source is exhausted. Always has an empty payload.
    EndOfStream,
    /// One source line, verbatim including its terminator.
    Line,
}

impl FrameKind {
    const END_OF_STREAM: u16 = 0;
    const LINE: u16 = 1;

    /// Wire code for this kind.
    pub fn code(self) -> u16 {
        match self {
            FrameKind::EndOfStream => Self::END_OF_STREAM,
            FrameKind::Line => Self::LINE,
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            Self::END_OF_STREAM => Ok(FrameKind::EndOfStream),
            Self::LINE => Ok(FrameKind::Line),
            other => Err(FrameError::UnknownKind(other)),
        }
    }

    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::EndOfStream => "END_OF_STREAM",
            FrameKind::Line => "LINE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(FrameKind::EndOfStream.code(), 0);
        assert_eq!(FrameKind::Line.code(), 1);
        assert_eq!(FrameKind::from_code(1).unwrap(), FrameKind::Line);
    }

    #[test]
    fn rejects_unknown_code() {
        assert!(matches!(
            FrameKind::from_code(7),
            Err(FrameError::UnknownKind(7))
        ));
    }
}
