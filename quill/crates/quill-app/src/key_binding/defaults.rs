//! The default key bindings every application starts with.

use super::basic::load_basic_bindings;
use super::bindings::{ConditionalKeyBindings, MergedKeyBindings, SharedKeyBindings};
use super::emacs::{load_emacs_bindings, load_emacs_shift_selection_bindings};
use super::mouse::load_mouse_bindings;
use super::search::load_emacs_search_bindings;
use crate::filters;
use std::rc::Rc;

/// Editing bindings, active while a buffer has focus, plus the mouse and
/// cursor position report handling.
pub fn load_key_bindings() -> SharedKeyBindings {
    let editing: SharedKeyBindings = Rc::new(MergedKeyBindings::new([
        load_basic_bindings().shared(),
        load_emacs_bindings().shared(),
        load_emacs_search_bindings().shared(),
        load_emacs_shift_selection_bindings().shared(),
    ]));
    Rc::new(MergedKeyBindings::new([
        Rc::new(ConditionalKeyBindings::new(editing, filters::buffer_has_focus())) as SharedKeyBindings,
        load_mouse_bindings().shared(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::key_binding::KeyBindingsBase;
    use quill_input::Key;

    #[test]
    fn test_editing_bindings_need_a_focused_buffer() {
        let ctx = test_context();
        ctx.begin_tick();
        let active: Vec<_> = load_key_bindings()
            .bindings()
            .into_iter()
            .filter(|b| b.keys.matches(&[Key::Control('a')]) && b.filter.eval(&ctx))
            .collect();
        assert!(active.is_empty());
    }
}
