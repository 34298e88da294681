//! Terminal input for quill.
//!
//! Raw terminal input is a stream of characters in which special keys,
//! mouse reports and pastes arrive as escape sequences. This crate turns
//! that stream into [`KeyPress`] values:
//!
//! - [`keys`]: the [`Key`] names bindings match against
//! - [`vt100_parser`]: the escape sequence state machine
//! - [`ansi_sequences`]: the sequence tables, in both directions
//! - [`mouse`]: decoding of X10, SGR and urxvt mouse reports
//! - [`input`]: the [`Input`] trait and raw/cooked mode guards
//! - [`pipe`]: [`PipeInput`], fed from code
//! - [`typeahead`]: keys left over when an application exits
//!
//! ```
//! use quill_input::keys::Key;
//! use quill_input::vt100_parser::Vt100Parser;
//!
//! let presses = Vt100Parser::parse_all("a\x1b[A\x1bf");
//! let keys: Vec<Key> = presses.iter().map(|p| p.key).collect();
//! assert_eq!(keys, vec![Key::Char('a'), Key::Up, Key::Escape, Key::Char('f')]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::match_same_arms)]

pub mod ansi_sequences;
pub mod error;
pub mod input;
pub mod keys;
pub mod mouse;
pub mod pipe;
pub mod typeahead;
#[cfg(unix)]
pub mod vt100;
pub mod vt100_parser;

pub use error::{InputError, Result};
pub use input::{Input, ModeGuard, Waker};
pub use keys::{Key, KeyPress};
pub use mouse::{parse_mouse_event, MouseButton, MouseEvent, MouseEventType, MouseModifiers};
pub use pipe::PipeInput;
#[cfg(unix)]
pub use vt100::{create_input, Vt100Input};
pub use vt100_parser::Vt100Parser;
