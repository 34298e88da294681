//! Quill: interactive command lines and full-screen terminal applications.
//!
//! This crate re-exports the quill crates under short names:
//! - [`core`]: styles, colors, formatted text and cell widths
//! - [`input`]: key parsing and terminal input
//! - [`output`]: escape-sequence output and color depth detection
//! - [`screen`]: the cell grid and diff output
//! - [`edit`]: documents, buffers, completion, validation and history
//! - [`app`]: the application runtime, layout, key bindings and widgets
//! - [`shortcuts`]: prompt sessions, one-shot questions and progress bars
//!
//! # Example
//!
//! ```no_run
//! use quill::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> quill::app::Result<()> {
//!     let completer = Arc::new(WordCompleter::new(["status", "stash", "show"]));
//!     let mut session = PromptSession::new(PromptOptions::new("git> ").with_completer(completer))?;
//!     loop {
//!         match session.prompt() {
//!             Ok(line) => println!("you said: {line}"),
//!             Err(AppError::KeyboardInterrupt) => continue,
//!             Err(AppError::Eof) => break,
//!             Err(e) => return Err(e),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub use quill_app as app;
pub use quill_core as core;
pub use quill_edit as edit;
pub use quill_input as input;
pub use quill_output as output;
pub use quill_prompt as shortcuts;
pub use quill_screen as screen;

pub use quill_prompt::{print_formatted_text, PromptOptions, PromptSession};
#[cfg(unix)]
pub use quill_prompt::{confirm, prompt};

/// The types most programs need.
pub mod prelude {
    pub use quill_app::filters::Filter;
    pub use quill_app::layout::{
        BufferControl, ConditionalContainer, Dimension, Float, FloatContainer, FormattedTextControl, HSplit,
        Layout, VSplit, Window,
    };
    pub use quill_app::widgets::{Button, Frame, Label, TextArea};
    pub use quill_app::{AppContext, AppError, Application, ApplicationOptions, KeyBindings, KeyPressEvent};
    pub use quill_core::{ColorDepth, FormattedText, Style};
    pub use quill_edit::completion::{FuzzyWordCompleter, PathCompleter, WordCompleter};
    pub use quill_edit::{Buffer, Document, FileHistory, HistoryStore, InMemoryHistory, ValidationError};
    pub use quill_input::Key;
    pub use quill_prompt::progress::ProgressBar;
    pub use quill_prompt::{CompleteStyle, Confirm, PromptOptions, PromptSession, Question, ValueType};
}
