//! Bindings every editable buffer gets: arrows, deletion, self-insert,
//! paste and the readline basics.

use super::bindings::{Binding, KeyBindings};
use super::processor::KeyPressEvent;
use crate::filters::{self, Filter};
use quill_input::{Key, KeyPress};

/// Insert-capable: writable and nothing selected.
pub fn insert_mode() -> Filter {
    !filters::is_read_only() & !filters::has_selection()
}

fn if_no_repeat(event: &KeyPressEvent<'_>) -> bool {
    !event.is_repeat
}

fn in_quoted_insert() -> Filter {
    Filter::new(|ctx| ctx.quoted_insert)
}

fn has_text_before_cursor() -> Filter {
    Filter::new(|ctx| ctx.current_buffer().is_some_and(|b| !b.text().is_empty()))
}

fn named_no_repeat(kb: &mut KeyBindings, key: Key, name: &str) {
    if let Some(binding) = Binding::named(key, name) {
        kb.add_binding(binding.with_filter(insert_mode()).save_before(if_no_repeat));
    }
}

/// Loads the basic bindings.
pub fn load_basic_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();
    let insert = insert_mode();

    // === Readline movement and history ===
    kb.add_named(Key::Home, "beginning-of-line");
    kb.add_named(Key::End, "end-of-line");
    kb.add_named(Key::Left, "backward-char");
    kb.add_named(Key::Right, "forward-char");
    kb.add_named(Key::ControlUp, "previous-history");
    kb.add_named(Key::ControlDown, "next-history");
    kb.add_named(Key::Control('l'), "clear-screen");
    kb.add_named_when(Key::PageUp, !filters::has_selection(), "previous-history");
    kb.add_named_when(Key::PageDown, !filters::has_selection(), "next-history");

    // === Editing ===
    kb.add_named_when(Key::Control('k'), insert.clone(), "kill-line");
    kb.add_named_when(Key::Control('u'), insert.clone(), "unix-line-discard");
    named_no_repeat(&mut kb, Key::Backspace, "backward-delete-char");
    named_no_repeat(&mut kb, Key::Delete, "delete-char");
    named_no_repeat(&mut kb, Key::ControlDelete, "delete-char");
    named_no_repeat(&mut kb, Key::Any, "self-insert");
    kb.add_named_when(Key::Control('t'), insert.clone(), "transpose-chars");
    kb.add_named_when(Key::Tab, insert.clone(), "menu-complete");
    kb.add_named_when(Key::BackTab, insert.clone(), "menu-complete-backward");
    kb.add_named_when(Key::Control('w'), insert.clone(), "unix-word-rubout");
    kb.add_named_when(
        Key::Control('d'),
        has_text_before_cursor() & insert.clone(),
        "delete-char",
    );

    kb.add_when(Key::Enter, insert & filters::is_multiline(), |event| {
        let copy_margin = !event.ctx.paste_mode;
        event.with_buffer(|b| b.newline(copy_margin))
    });

    // Ctrl-J behaves like Enter.
    kb.add(Key::Control('j'), |event| {
        event.ctx.feed_keys_first([KeyPress::new(Key::Enter, "\r")]);
        Ok(())
    });

    kb.add(Key::Up, |event| {
        let count = event.count();
        event.with_buffer(|b| b.auto_up(count, false))
    });
    kb.add(Key::Down, |event| {
        let count = event.count();
        event.with_buffer(|b| b.auto_down(count, false))
    });

    kb.add_when(Key::Delete, filters::has_selection(), |event| {
        if let Some(data) = event.current_buffer_mut().map(quill_edit::Buffer::cut_selection) {
            event.ctx.clipboard().set_data(data);
        }
        Ok(())
    });

    // === Global ===
    kb.add(Key::Control('z'), |event| {
        let data = event.data().to_string();
        event.with_buffer(|b| b.insert_text(&data))
    });

    kb.add(Key::BracketedPaste, |event| {
        let data = event.data().replace("\r\n", "\n").replace('\r', "\n");
        event.with_buffer(|b| b.insert_text(&data))
    });

    kb.add_binding(
        Binding::new(Key::Any, |event| {
            let data = event.data().to_string();
            event.with_buffer(|b| b.insert_text_with(&data, false, true, true))?;
            event.ctx.quoted_insert = false;
            Ok(())
        })
        .with_filter(in_quoted_insert())
        .eager(),
    );

    kb
}
