//! Key binding registries, the key processor and the default bindings.
//!
//! Bindings map key sequences to handlers. Registries compose: a
//! [`MergedKeyBindings`] concatenates several, a [`ConditionalKeyBindings`]
//! hides its inner registry behind a filter and a [`DynamicKeyBindings`]
//! asks a closure each time. The [`KeyProcessor`] turns the incoming stream
//! of [`KeyPress`](quill_input::KeyPress)es into handler calls.

pub mod bindings;
pub mod commands;
pub mod processor;

pub mod auto_suggest;
pub mod basic;
pub mod completion;
pub mod defaults;
pub mod emacs;
pub mod mouse;
pub mod open_in_editor;
pub mod page_navigation;
pub mod search;

pub use bindings::{
    Binding, ConditionalKeyBindings, DynamicKeyBindings, Handler, KeyBindings, KeyBindingsBase,
    KeySequence, MergedKeyBindings, SharedKeyBindings,
};
pub use commands::get_by_name;
pub use defaults::load_key_bindings;
pub use processor::{KeyPressEvent, KeyProcessor};
