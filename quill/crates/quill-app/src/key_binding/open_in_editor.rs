//! Editing the input in `$EDITOR`.

use super::bindings::KeyBindings;
use crate::filters;
use quill_input::Key;

/// Ctrl-X Ctrl-E opens the focused buffer in the external editor.
pub fn load_open_in_editor_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();
    kb.add_named_when(
        [Key::Control('x'), Key::Control('e')],
        !filters::has_selection(),
        "edit-and-execute-command",
    );
    kb
}
