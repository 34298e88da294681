//! Terminal output for quill.
//!
//! - [`output`]: the [`Output`] trait
//! - [`vt100`]: [`Vt100Output`], the escape sequence writer
//! - [`dummy`]: [`DummyOutput`], which discards everything
//! - [`detect`]: color depth and terminal size discovery

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod detect;
pub mod dummy;
pub mod output;
pub mod vt100;

pub use detect::{resolve_color_depth, terminal_size};
pub use dummy::DummyOutput;
pub use output::{CursorShape, Output};
pub use vt100::{MemoryWriter, Vt100Output};

/// Creates the default output for this process: stdout.
pub fn create_output() -> Box<dyn Output> {
    Box::new(Vt100Output::from_stdout())
}
