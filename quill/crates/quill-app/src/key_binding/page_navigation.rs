//! Page up and page down for full screen applications.

use super::bindings::{ConditionalKeyBindings, KeyBindings};
use super::processor::KeyPressEvent;
use crate::error::HandlerResult;
use crate::filters;
use quill_input::Key;

fn scroll_page(event: &mut KeyPressEvent<'_>, down: bool) -> HandlerResult {
    let Some(height) = event
        .ctx
        .focused_window()
        .and_then(|id| event.ctx.window_height(id))
    else {
        return Ok(());
    };
    let page = height.saturating_sub(1).max(1);
    event.with_buffer(|b| {
        let document = b.document();
        let row = document.cursor_position_row();
        let last_row = document.line_count().saturating_sub(1);
        let target = if down {
            (row + page).min(last_row)
        } else {
            row.saturating_sub(page)
        };
        let index = document.translate_row_col_to_index(target, 0);
        b.set_cursor_position(index);
        b.move_cursor(b.document().get_start_of_line_position(true));
    })
}

/// Moves the cursor one window height down.
pub fn scroll_page_down(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    scroll_page(event, true)
}

/// Moves the cursor one window height up.
pub fn scroll_page_up(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    scroll_page(event, false)
}

/// Loads the page navigation bindings, active while a buffer has focus.
pub fn load_page_navigation_bindings() -> ConditionalKeyBindings {
    let mut kb = KeyBindings::new();
    kb.add(Key::Control('v'), scroll_page_down);
    kb.add(Key::PageDown, scroll_page_down);
    kb.add([Key::Escape, Key::Char('v')], scroll_page_up);
    kb.add(Key::PageUp, scroll_page_up);
    ConditionalKeyBindings::new(kb.shared(), filters::buffer_has_focus())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{test_context, WindowInfo};
    use crate::key_binding::{KeyBindingsBase, KeyProcessor};
    use pretty_assertions::assert_eq;
    use quill_core::id::WindowId;
    use quill_edit::{Buffer, Document};
    use quill_input::KeyPress;
    use std::rc::Rc;

    #[test]
    fn test_page_down_moves_by_window_height() {
        let mut ctx = test_context();
        let text: Vec<String> = (0..20).map(|i| format!("  line {i}")).collect();
        let id = ctx.add_buffer(
            Buffer::new().with_document(Document::with_cursor(text.join("\n"), 0)),
        );
        let window = WindowId::new();
        ctx.set_windows(vec![WindowInfo::for_buffer(window, id)]);
        ctx.window_heights.insert(window, 5);
        let bindings: Rc<dyn KeyBindingsBase> = Rc::new(load_page_navigation_bindings());
        ctx.global_bindings = vec![bindings];

        let mut processor = KeyProcessor::new();
        processor.feed(KeyPress::new(Key::PageDown, ""));
        processor.process_keys(&mut ctx);

        let buffer = ctx.current_buffer().map(|b| b.document().clone());
        assert_eq!(buffer.as_ref().map(Document::cursor_position_row), Some(4));
        assert_eq!(buffer.as_ref().map(Document::cursor_position_col), Some(2));
    }
}
