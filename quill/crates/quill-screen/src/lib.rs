//! Screen cells and incremental terminal output for quill.
//!
//! - [`char`]: [`Char`], one cell
//! - [`screen`]: [`Screen`], the cell grid a frame is drawn into
//! - [`diff`]: [`output_screen_diff`], which writes the changes between two
//!   screens to an [`Output`](quill_output::Output)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod char;
pub mod diff;
pub mod screen;

pub use crate::char::Char;
pub use diff::{output_screen_diff, DiffOptions, DiffState};
pub use screen::{Screen, WritePosition};
