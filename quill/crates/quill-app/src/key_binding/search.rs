//! Incremental search bindings.

use super::bindings::KeyBindings;
use super::processor::KeyPressEvent;
use crate::error::HandlerResult;
use crate::filters::{self, Filter};
use quill_edit::SearchDirection;
use quill_input::Key;

/// Focuses the search field, searching backwards.
pub fn start_reverse_incremental_search(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.start_search(SearchDirection::Backward);
    Ok(())
}

/// Focuses the search field, searching forwards.
pub fn start_forward_incremental_search(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.start_search(SearchDirection::Forward);
    Ok(())
}

/// Leaves the search field without moving the cursor.
pub fn abort_search(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.stop_search();
    Ok(())
}

/// Jumps to the search match and leaves the search field.
pub fn accept_search(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.accept_search();
    Ok(())
}

/// Moves to the previous match.
pub fn reverse_incremental_search(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.ctx.incremental_search(SearchDirection::Backward, count);
    Ok(())
}

/// Moves to the next match.
pub fn forward_incremental_search(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.ctx.incremental_search(SearchDirection::Forward, count);
    Ok(())
}

fn jump_to_match(event: &mut KeyPressEvent<'_>, reverse: bool) -> HandlerResult {
    let Some(id) = event.ctx.current_buffer_id() else {
        return Ok(());
    };
    let mut state = event.ctx.search_state(id);
    if reverse {
        state = state.invert();
    }
    let count = event.count();
    if let Some(buffer) = event.ctx.buffer_mut(id) {
        buffer.apply_search(&state, false, count);
    }
    Ok(())
}

/// Loads the Emacs search bindings.
pub fn load_emacs_search_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();
    let can_start = filters::control_is_searchable() & !filters::is_searching();
    let searching = filters::is_searching();

    kb.add_when(Key::Control('r'), can_start.clone(), start_reverse_incremental_search);
    kb.add_when(Key::Control('s'), can_start.clone(), start_forward_incremental_search);

    kb.add_when(Key::Control('c'), searching.clone(), abort_search);
    kb.add_when(Key::Control('g'), searching.clone(), abort_search);
    kb.add_when(Key::Control('r'), searching.clone(), reverse_incremental_search);
    kb.add_when(Key::Control('s'), searching.clone(), forward_incremental_search);
    kb.add_when(Key::Up, searching.clone(), reverse_incremental_search);
    kb.add_when(Key::Down, searching.clone(), forward_incremental_search);
    kb.add_when(Key::Enter, searching.clone(), accept_search);

    // Escape accepts, like readline.
    kb.add_binding(
        super::bindings::Binding::new(Key::Escape, accept_search)
            .with_filter(searching)
            .eager(),
    );

    // Read-only buffers search with `/` and `?`, then `n` and `N`.
    let read_only: Filter = filters::is_read_only() & !filters::is_searching();
    kb.add_when('?', read_only.clone() & can_start.clone(), start_reverse_incremental_search);
    kb.add_when('/', read_only.clone() & can_start, start_forward_incremental_search);
    kb.add_when('n', read_only.clone(), |event| jump_to_match(event, false));
    kb.add_when('N', read_only, |event| jump_to_match(event, true));

    kb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{test_context, AppContext, WindowInfo};
    use crate::key_binding::basic::load_basic_bindings;
    use crate::key_binding::KeyProcessor;
    use pretty_assertions::assert_eq;
    use quill_core::id::WindowId;
    use quill_edit::{Buffer, Document};
    use quill_input::KeyPress;

    fn setup() -> AppContext {
        let mut ctx = test_context();
        let target = ctx.add_buffer(
            Buffer::new().with_document(Document::new("apple\nbanana\napricot")),
        );
        let search = ctx.add_buffer(Buffer::new());
        let mut main = WindowInfo::for_buffer(WindowId::new(), target);
        main.search_buffer = Some(search);
        let field = WindowInfo::for_buffer(WindowId::new(), search);
        ctx.set_windows(vec![main, field]);
        ctx.global_bindings = vec![
            load_basic_bindings().shared(),
            load_emacs_search_bindings().shared(),
        ];
        ctx
    }

    fn press(ctx: &mut AppContext, keys: &[Key]) {
        let mut processor = KeyProcessor::new();
        processor.feed_multiple(keys.iter().map(|k| KeyPress::from(*k)));
        processor.process_keys(ctx);
    }

    #[test]
    fn test_reverse_search_and_accept() {
        let mut ctx = setup();
        press(&mut ctx, &[Key::Control('r')]);
        assert!(ctx.is_searching());
        press(&mut ctx, &[Key::Char('b'), Key::Char('a')]);
        press(&mut ctx, &[Key::Enter]);
        assert!(!ctx.is_searching());
        let target = ctx.current_buffer().map(Buffer::cursor_position);
        assert_eq!(target, Some(6));
    }

    #[test]
    fn test_abort_keeps_cursor() {
        let mut ctx = setup();
        let before = ctx.current_buffer().map(Buffer::cursor_position);
        press(&mut ctx, &[Key::Control('r'), Key::Char('b'), Key::Control('g')]);
        assert!(!ctx.is_searching());
        assert_eq!(ctx.current_buffer().map(Buffer::cursor_position), before);
    }
}
