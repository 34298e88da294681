//! Error types for terminal input.

use thiserror::Error;

/// Errors raised by [`Input`](crate::input::Input) implementations.
#[derive(Error, Debug)]
pub enum InputError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input has been closed.
    #[error("input is closed")]
    Closed,

    /// The input is not connected to a terminal.
    #[error("input is not a terminal")]
    NotATerminal,
}

/// Result type alias for input operations.
pub type Result<T> = std::result::Result<T, InputError>;
