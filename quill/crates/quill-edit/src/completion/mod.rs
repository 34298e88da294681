//! Completion.
//!
//! A [`Completer`] turns a [`Document`](crate::Document) into a lazy
//! sequence of [`Completion`]s. Buffers keep the candidates being cycled
//! through in a [`CompletionState`].

mod base;
mod combine;
mod fuzzy;
mod nested;
mod path;
mod word;

pub use base::{
    completion_does_nothing, get_common_complete_suffix, CompleteEvent, Completer, Completion,
    CompletionState, Completions, ConditionalCompleter, DummyCompleter, DynamicCompleter,
    SharedCompleter, ThreadedCompleter,
};
pub use combine::{merge_completers, DeduplicateCompleter, MergedCompleter};
pub use fuzzy::{FuzzyCompleter, FuzzyWordCompleter};
pub use nested::NestedCompleter;
pub use path::{ExecutableCompleter, PathCompleter};
pub use word::WordCompleter;
