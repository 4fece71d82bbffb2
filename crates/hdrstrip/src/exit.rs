use std::fmt;
use std::io;

use hdrstrip_pipeline::PipelineError;

// Exit codes follow sysexits(3) where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_INPUT: i32 = 66;
pub const CANT_CREATE: i32 = 73;
pub const IO_ERROR: i32 = 74;
pub const INTERNAL: i32 = 125;
pub const CANCELLED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn open_error_code(err: &io::Error, unavailable: i32) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        _ => unavailable,
    }
}

pub fn pipeline_error(err: PipelineError) -> CliError {
    let code = match &err {
        PipelineError::SourceUnavailable { source, .. } => open_error_code(source, NO_INPUT),
        PipelineError::DestinationUnavailable { source, .. } => {
            open_error_code(source, CANT_CREATE)
        }
        PipelineError::Read(_) | PipelineError::Write(_) => IO_ERROR,
        PipelineError::LineTooLong { .. } => DATA_INVALID,
        PipelineError::InvalidConfig(_) => USAGE,
        PipelineError::Cancelled => CANCELLED,
        PipelineError::Transport(_)
        | PipelineError::Frame(_)
        | PipelineError::Spawn { .. }
        | PipelineError::ProtocolViolation(_)
        | PipelineError::StagePanicked(_) => INTERNAL,
    };
    CliError::new(code, err.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_source_maps_to_no_input() {
        let err = pipeline_error(PipelineError::SourceUnavailable {
            path: PathBuf::from("data.txt"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(err.code, NO_INPUT);
        assert!(err.message.contains("data.txt"));
    }

    #[test]
    fn unreadable_source_maps_to_permission_denied() {
        let err = pipeline_error(PipelineError::SourceUnavailable {
            path: PathBuf::from("data.txt"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        });
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn destination_and_policy_errors() {
        let err = pipeline_error(PipelineError::DestinationUnavailable {
            path: PathBuf::from("src.txt"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(err.code, CANT_CREATE);

        let err = pipeline_error(PipelineError::LineTooLong { line: 3, max: 8 });
        assert_eq!(err.code, DATA_INVALID);

        assert_eq!(pipeline_error(PipelineError::Cancelled).code, CANCELLED);
    }
}
