//! Ready-made front ends built on the quill application runtime.
//!
//! - [`session`]: [`PromptSession`], a reusable line editor with history,
//!   completion menus, validation and toolbars
//! - [`ask`]: one-shot questions with typed answers, and yes/no
//!   confirmation
//! - [`progress`]: [`ProgressBar`], counters drawn from a background thread
//! - [`print`]: printing formatted text outside an application

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]

pub mod ask;
pub mod print;
pub mod progress;
pub mod session;

#[cfg(unix)]
pub use ask::{confirm, prompt};
pub use ask::{Confirm, ConversionError, Question, Value, ValueType};
pub use print::{print_formatted_text, print_markup, print_to, PrintOptions};
pub use progress::{Counter, ProgressBar, ProgressOptions};
pub use session::{CompleteStyle, PromptOptions, PromptSession};
