//! Error types for quill core operations.

use thiserror::Error;

/// Core error type for quill operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal operation failed.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid dimensions were provided.
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Feature not supported by the terminal.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

/// Result type alias using the core Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for color parsing operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// Input string was empty.
    #[error("empty input")]
    EmptyInput,

    /// Hex string had an invalid length.
    #[error("invalid hex length: {0} (expected 3 or 6)")]
    InvalidLength(usize),

    /// Invalid hexadecimal character.
    #[error("invalid hex character")]
    InvalidHexChar,

    /// Malformed `rgb(r, g, b)` expression.
    #[error("invalid rgb expression: {0}")]
    InvalidRgb(String),

    /// Unknown color name.
    #[error("unknown color name: {0}")]
    UnknownColor(String),
}

/// Error type for style-string parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    /// A token that is neither an attribute, a class nor a color.
    #[error("unknown style token: {0}")]
    UnknownToken(String),

    /// A color inside a `fg:`/`bg:` token failed to parse.
    #[error("invalid color in style: {0}")]
    Color(#[from] ColorParseError),
}

/// Result type alias for style operations.
pub type StyleResult<T> = std::result::Result<T, StyleError>;

/// Error type for markup parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// A closing tag without a matching opening tag.
    #[error("unexpected closing tag: </{0}>")]
    UnexpectedClose(String),

    /// An opening tag that was never closed.
    #[error("unclosed tag: <{0}>")]
    Unclosed(String),

    /// A tag that could not be parsed.
    #[error("invalid tag: {0}")]
    InvalidTag(String),
}
