//! Error types for line editing.

use std::fmt;
use thiserror::Error;

/// Rejection of a document by a [`Validator`](crate::validation::Validator).
///
/// This is a domain value shown in the validation toolbar, not a failure of
/// the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Where the cursor should be moved, as a character index.
    pub cursor_position: usize,
    /// Message shown to the user.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(cursor_position: usize, message: impl Into<String>) -> Self {
        Self {
            cursor_position,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.cursor_position)
    }
}

impl std::error::Error for ValidationError {}

/// Errors from opening a buffer in an external editor.
#[derive(Error, Debug)]
pub enum EditorError {
    /// Creating, writing or reading the temporary file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No editor was configured or found.
    #[error("no editor found; set VISUAL or EDITOR")]
    NoEditor,

    /// The editor exited unsuccessfully.
    #[error("editor exited with {0}")]
    EditorFailed(String),

    /// The editor command could not be started.
    #[error("failed to start editor `{command}`: {source}")]
    SpawnFailed {
        /// The command line that was run.
        command: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The buffer is read-only.
    #[error("buffer is read-only")]
    ReadOnly,
}

/// Errors from history backends.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Reading or writing the history file failed.
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for history operations.
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
