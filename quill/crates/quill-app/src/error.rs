//! Error types for running applications.

use quill_edit::EditorError;
use quill_input::InputError;
use thiserror::Error;

/// Errors and exit signals of an application run.
///
/// `KeyboardInterrupt`, `Eof`, `Abort` and `Exit` are exit signals: a key
/// handler returning one of them ends the run with it. Any other error
/// returned by a handler is logged and the loop keeps going.
#[derive(Error, Debug)]
pub enum AppError {
    /// Ctrl-C was pressed.
    #[error("keyboard interrupt")]
    KeyboardInterrupt,

    /// Ctrl-D was pressed on empty input.
    #[error("end of input")]
    Eof,

    /// The user aborted.
    #[error("aborted: {0}")]
    Abort(String),

    /// The application asked to exit with a process exit code.
    #[error("exit with code {0}")]
    Exit(i32),

    /// Command-line usage error reported by a hosted application.
    #[error("usage error: {0}")]
    Usage(String),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading input failed.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// A key or mouse handler failed.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The exit value did not have the type the run expected.
    #[error("exit value has an unexpected type")]
    UnexpectedResult,

    /// The application is not running.
    #[error("application is not running")]
    NotRunning,

    /// The application is already running.
    #[error("application is already running")]
    AlreadyRunning,

    /// The layout is unusable, e.g. nothing can be focused.
    #[error("invalid layout: {0}")]
    Layout(String),
}

impl AppError {
    /// Returns true for the errors that end a run when a handler returns
    /// them.
    pub fn is_exit_signal(&self) -> bool {
        matches!(
            self,
            Self::KeyboardInterrupt | Self::Eof | Self::Abort(_) | Self::Exit(_)
        )
    }

    /// The process exit code a hosted application should use.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit(code) => *code,
            Self::Usage(_) => 2,
            Self::KeyboardInterrupt => 130,
            _ => 1,
        }
    }
}

impl From<EditorError> for AppError {
    fn from(err: EditorError) -> Self {
        Self::Handler(err.to_string())
    }
}

/// What key and mouse handlers return.
pub type HandlerResult = std::result::Result<(), AppError>;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Abort("no".into()).exit_code(), 1);
        assert_eq!(AppError::Usage("bad flag".into()).exit_code(), 2);
        assert_eq!(AppError::Exit(7).exit_code(), 7);
        assert_eq!(AppError::KeyboardInterrupt.exit_code(), 130);
        assert_eq!(AppError::Handler("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_exit_signals() {
        assert!(AppError::Eof.is_exit_signal());
        assert!(AppError::Exit(0).is_exit_signal());
        assert!(!AppError::Handler("x".into()).is_exit_signal());
        assert!(!AppError::Layout("x".into()).is_exit_signal());
    }
}
