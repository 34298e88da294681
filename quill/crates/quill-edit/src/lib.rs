//! Line editing for quill.
//!
//! - [`document`]: [`Document`], immutable text plus cursor and selection
//! - [`buffer`]: [`Buffer`], the mutable editing state behind an input
//! - [`history`], [`completion`], [`validation`], [`auto_suggest`]: the
//!   pluggable producers a buffer consults
//! - [`worker`]: [`WorkerPool`], where background producers run
//! - [`editor`]: round-trips text through `$VISUAL`/`$EDITOR`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]

pub mod auto_suggest;
pub mod buffer;
pub mod clipboard;
pub mod completion;
pub mod document;
pub mod editor;
pub mod error;
pub mod history;
pub mod search;
pub mod selection;
pub mod signal;
pub mod validation;
pub mod worker;

pub use auto_suggest::{AutoSuggest, AutoSuggestFromHistory, SharedAutoSuggest, Suggestion};
pub use buffer::{
    AcceptHandler, Buffer, BufferJob, CompletionOptions, Condition, JobOutcome, ValidationState,
};
pub use clipboard::{Clipboard, ClipboardData, InMemoryClipboard};
pub use completion::{CompleteEvent, Completer, Completion, CompletionState, SharedCompleter};
pub use document::Document;
pub use error::{EditorError, HistoryError, ValidationError};
pub use history::{FileHistory, History, HistoryStore, InMemoryHistory, ThreadedHistory};
pub use search::{SearchDirection, SearchState};
pub use selection::{SelectionState, SelectionType};
pub use signal::Signal;
pub use validation::{SharedValidator, Validator};
pub use worker::WorkerPool;
