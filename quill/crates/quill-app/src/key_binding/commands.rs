//! Named editing commands, as in GNU readline.
//!
//! Each command is a plain handler; [`get_by_name`] looks them up by their
//! readline name so that bindings can be declared as
//! `kb.add_named("c-a", "beginning-of-line")`.

use super::bindings::Handler;
use super::processor::KeyPressEvent;
use crate::context::BufferId;
use crate::error::HandlerResult;
use quill_edit::{Buffer, Document, SearchDirection};
use quill_input::{Key, KeyPress};
use std::rc::Rc;

type Command = fn(&mut KeyPressEvent<'_>) -> HandlerResult;

const COMMANDS: &[(&str, Command)] = &[
    // Movement
    ("beginning-of-buffer", beginning_of_buffer),
    ("end-of-buffer", end_of_buffer),
    ("beginning-of-line", beginning_of_line),
    ("end-of-line", end_of_line),
    ("forward-char", forward_char),
    ("backward-char", backward_char),
    ("forward-word", forward_word),
    ("backward-word", backward_word),
    ("clear-screen", clear_screen),
    ("redraw-current-line", redraw_current_line),
    // History
    ("accept-line", accept_line),
    ("previous-history", previous_history),
    ("next-history", next_history),
    ("beginning-of-history", beginning_of_history),
    ("end-of-history", end_of_history),
    ("reverse-search-history", reverse_search_history),
    ("forward-search-history", forward_search_history),
    // Changing text
    ("end-of-file", end_of_file),
    ("delete-char", delete_char),
    ("backward-delete-char", backward_delete_char),
    ("self-insert", self_insert),
    ("transpose-chars", transpose_chars),
    ("uppercase-word", uppercase_word),
    ("downcase-word", downcase_word),
    ("capitalize-word", capitalize_word),
    ("quoted-insert", quoted_insert),
    // Killing and yanking
    ("kill-line", kill_line),
    ("kill-word", kill_word),
    ("unix-word-rubout", unix_word_rubout),
    ("backward-kill-word", backward_kill_word),
    ("delete-horizontal-space", delete_horizontal_space),
    ("unix-line-discard", unix_line_discard),
    ("yank", yank),
    ("yank-nth-arg", yank_nth_arg),
    ("yank-last-arg", yank_last_arg),
    ("yank-pop", yank_pop),
    // Completion
    ("complete", menu_complete),
    ("menu-complete", menu_complete),
    ("menu-complete-backward", menu_complete_backward),
    // Keyboard macros
    ("start-kbd-macro", start_kbd_macro),
    ("end-kbd-macro", end_kbd_macro),
    ("call-last-kbd-macro", call_last_kbd_macro),
    ("print-last-kbd-macro", print_last_kbd_macro),
    // Miscellaneous
    ("undo", undo),
    ("insert-comment", insert_comment),
    ("prefix-meta", prefix_meta),
    ("operate-and-get-next", operate_and_get_next),
    ("edit-and-execute-command", edit_and_execute_command),
];

/// Looks up a named command.
pub fn get_by_name(name: &str) -> Option<Handler> {
    COMMANDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, command)| {
            let command = *command;
            Rc::new(command) as Handler
        })
}

/// Names of all commands.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|(n, _)| *n)
}

fn with_buffer(event: &mut KeyPressEvent<'_>, f: impl FnOnce(&mut Buffer)) -> HandlerResult {
    if let Some(buffer) = event.current_buffer_mut() {
        f(buffer);
    }
    Ok(())
}

fn ring_bell_if_empty(event: &mut KeyPressEvent<'_>, deleted: &str) {
    if deleted.is_empty() {
        event.ctx.bell();
    }
}

// Movement

fn beginning_of_buffer(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| b.set_cursor_position(0))
}

fn end_of_buffer(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| b.set_cursor_position(b.document().len()))
}

fn beginning_of_line(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| {
        b.move_cursor(b.document().get_start_of_line_position(false));
    })
}

fn end_of_line(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| b.move_cursor(b.document().get_end_of_line_position()))
}

fn forward_char(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| {
        b.move_cursor(b.document().get_cursor_right_position(count));
    })
}

fn backward_char(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| {
        b.move_cursor(b.document().get_cursor_left_position(count));
    })
}

fn forward_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| {
        if let Some(pos) = b.document().find_next_word_ending(false, count, false) {
            b.move_cursor(pos);
        }
    })
}

fn backward_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| {
        if let Some(pos) = b.document().find_previous_word_beginning(count, false) {
            b.move_cursor(pos);
        }
    })
}

fn clear_screen(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.clear_screen();
    Ok(())
}

fn redraw_current_line(_event: &mut KeyPressEvent<'_>) -> HandlerResult {
    Ok(())
}

// History

fn accept_line(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, Buffer::validate_and_handle)
}

fn previous_history(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| b.history_backward(count))
}

fn next_history(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| b.history_forward(count))
}

fn beginning_of_history(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| b.go_to_history(0))
}

fn end_of_history(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| {
        let last = b.working_lines_len().saturating_sub(1);
        b.go_to_history(last);
    })
}

fn reverse_search_history(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.start_search(SearchDirection::Backward);
    Ok(())
}

fn forward_search_history(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.start_search(SearchDirection::Forward);
    Ok(())
}

// Changing text

fn end_of_file(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.exit();
    Ok(())
}

fn delete_char(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    let deleted = event
        .current_buffer_mut()
        .map(|b| b.delete(count))
        .unwrap_or_default();
    ring_bell_if_empty(event, &deleted);
    Ok(())
}

fn backward_delete_char(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let arg = event.arg();
    let deleted = event
        .current_buffer_mut()
        .map(|b| {
            if arg < 0 {
                b.delete(arg.unsigned_abs())
            } else {
                b.delete_before_cursor(arg.unsigned_abs())
            }
        })
        .unwrap_or_default();
    ring_bell_if_empty(event, &deleted);
    Ok(())
}

/// Inserts the typed character, repeated by the argument.
pub fn self_insert(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    if !matches!(event.key(), Some(Key::Char(_))) {
        return Ok(());
    }
    let text = event.data().repeat(event.count());
    with_buffer(event, |b| b.insert_text(&text))
}

fn transpose_chars(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| {
        let p = b.cursor_position();
        if p == 0 {
            return;
        }
        let at_end = p == b.document().len() || b.document().current_char() == Some('\n');
        if !at_end {
            b.move_cursor(b.document().get_cursor_right_position(1));
        }
        b.swap_characters_before_cursor();
    })
}

fn change_word(event: &mut KeyPressEvent<'_>, change: fn(&str) -> String) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| {
        for _ in 0..count {
            let Some(pos) = b.document().find_next_word_ending(false, 1, false) else {
                return;
            };
            let words: String = b
                .document()
                .text_after_cursor()
                .chars()
                .take(pos.unsigned_abs())
                .collect();
            b.insert_text_with(&change(&words), true, true, true);
        }
    })
}

fn uppercase_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    change_word(event, str::to_uppercase)
}

fn downcase_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    change_word(event, str::to_lowercase)
}

fn capitalize_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    change_word(event, title_case)
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if at_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_start = false;
        } else {
            out.push(c);
            at_start = true;
        }
    }
    out
}

fn quoted_insert(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.quoted_insert = true;
    Ok(())
}

// Killing and yanking

fn kill_line(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let arg = event.arg();
    let Some(b) = event.current_buffer_mut() else {
        return Ok(());
    };
    let deleted = if arg < 0 {
        let n = b.document().get_start_of_line_position(false).unsigned_abs();
        b.delete_before_cursor(n)
    } else if b.document().current_char() == Some('\n') {
        b.delete(1)
    } else {
        let n = b.document().get_end_of_line_position().unsigned_abs();
        b.delete(n)
    };
    event.ctx.clipboard().set_text(&deleted);
    Ok(())
}

fn kill_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    let is_repeat = event.is_repeat;
    let clipboard = event.ctx.clipboard();
    let Some(b) = event.current_buffer_mut() else {
        return Ok(());
    };
    if let Some(pos) = b.document().find_next_word_ending(false, count, false) {
        let mut deleted = b.delete(pos.unsigned_abs());
        if is_repeat {
            deleted = clipboard.get_data().text + &deleted;
        }
        clipboard.set_text(&deleted);
    }
    Ok(())
}

fn rubout(event: &mut KeyPressEvent<'_>, big_word: bool) -> HandlerResult {
    let count = event.count();
    let is_repeat = event.is_repeat;
    let clipboard = event.ctx.clipboard();
    let Some(b) = event.current_buffer_mut() else {
        return Ok(());
    };
    let pos = b
        .document()
        .find_start_of_previous_word(count, big_word)
        .unwrap_or(-(b.cursor_position() as isize));
    if pos == 0 {
        event.ctx.bell();
        return Ok(());
    }
    let mut deleted = b.delete_before_cursor(pos.unsigned_abs());
    if is_repeat {
        deleted.push_str(&clipboard.get_data().text);
    }
    clipboard.set_text(&deleted);
    Ok(())
}

fn unix_word_rubout(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    rubout(event, true)
}

fn backward_kill_word(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    rubout(event, false)
}

fn delete_horizontal_space(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, |b| {
        let is_space = |c: char| c == ' ' || c == '\t';
        let before = b.document().text_before_cursor();
        let delete_before = before.chars().count() - before.trim_end_matches(is_space).chars().count();
        let after = b.document().text_after_cursor();
        let delete_after = after.chars().count() - after.trim_start_matches(is_space).chars().count();
        b.delete_before_cursor(delete_before);
        b.delete(delete_after);
    })
}

fn unix_line_discard(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let clipboard = event.ctx.clipboard();
    with_buffer(event, |b| {
        if b.document().cursor_position_col() == 0 {
            b.delete_before_cursor(1);
        } else {
            let n = b.document().get_start_of_line_position(false).unsigned_abs();
            let deleted = b.delete_before_cursor(n);
            clipboard.set_text(&deleted);
        }
    })
}

fn yank(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    let data = event.ctx.clipboard().get_data();
    with_buffer(event, |b| b.paste_clipboard_data(&data, count))
}

fn yank_nth_arg(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let n = event.arg_present().then(|| event.arg());
    with_buffer(event, |b| b.yank_nth_arg(n))
}

fn yank_last_arg(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let n = event.arg_present().then(|| event.arg());
    with_buffer(event, |b| b.yank_last_arg(n))
}

fn yank_pop(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let clipboard = event.ctx.clipboard();
    with_buffer(event, |b| {
        if let Some(before) = b.document_before_paste().cloned() {
            b.set_document(before);
            clipboard.rotate();
            b.paste_clipboard_data(&clipboard.get_data(), 1);
        }
    })
}

// Completion

fn menu_complete(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| {
        if b.complete_state().is_some() {
            b.complete_next(count, false);
        } else {
            b.start_completion(quill_edit::CompletionOptions::requested().insert_common_part());
        }
    })
}

fn menu_complete_backward(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    with_buffer(event, |b| b.complete_previous(count, false))
}

// Keyboard macros

fn start_kbd_macro(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.recording = Some(Vec::new());
    Ok(())
}

fn end_kbd_macro(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    if let Some(recorded) = event.ctx.recording.take() {
        event.ctx.last_macro = Some(recorded);
    }
    Ok(())
}

fn call_last_kbd_macro(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    if let Some(keys) = event.ctx.last_macro.clone() {
        event.ctx.feed_keys_first(keys);
    }
    Ok(())
}

fn print_last_kbd_macro(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let Some(keys) = event.ctx.last_macro.clone() else {
        return Ok(());
    };
    event.ctx.run_in_terminal(false, move |term| {
        let names: Vec<String> = keys.iter().map(|k| k.key.name()).collect();
        term.output.write(&names.join(" "));
        term.output.write("\r\n");
        Ok(())
    });
    Ok(())
}

// Miscellaneous

fn undo(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    with_buffer(event, Buffer::undo)
}

fn insert_comment(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let uncomment = event.arg() != 1;
    with_buffer(event, |b| {
        let lines: Vec<String> = b
            .text()
            .lines()
            .map(|line| {
                if uncomment {
                    line.strip_prefix('#').unwrap_or(line).to_string()
                } else {
                    format!("#{line}")
                }
            })
            .collect();
        b.set_document(Document::new(lines.join("\n")));
        b.validate_and_handle();
    })
}

fn prefix_meta(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.ctx.feed_keys_first([KeyPress::from(Key::Escape)]);
    Ok(())
}

fn operate_and_get_next(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let Some(id) = event.ctx.current_buffer_id() else {
        return Ok(());
    };
    let Some(b) = event.ctx.buffer_mut(id) else {
        return Ok(());
    };
    let next = b.working_index() + 1;
    b.validate_and_handle();
    event.ctx.add_pre_run(move |ctx| go_to_history_later(ctx, id, next));
    Ok(())
}

fn go_to_history_later(ctx: &mut crate::context::AppContext, id: BufferId, index: usize) {
    if let Some(b) = ctx.buffer_mut(id) {
        if index < b.working_lines_len() {
            b.go_to_history(index);
        }
    }
}

fn edit_and_execute_command(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let Some(id) = event.ctx.current_buffer_id() else {
        return Ok(());
    };
    event.ctx.run_in_terminal(false, move |term| {
        match term.ctx.buffer_mut(id) {
            Some(b) => b.open_in_editor(true).map_err(Into::into),
            None => Ok(()),
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{test_context, AppContext, WindowInfo};
    use pretty_assertions::assert_eq;
    use quill_core::WindowId;

    fn focused(text: &str, cursor: usize) -> (AppContext, BufferId) {
        let mut ctx = test_context();
        let id = ctx.add_buffer(Buffer::new().with_document(Document::with_cursor(text, cursor)));
        ctx.set_windows(vec![WindowInfo {
            id: WindowId::new(),
            buffer: Some(id),
            search_buffer: None,
            search_ignore_case: false,
            focusable: true,
            key_bindings: Vec::new(),
            modal_scope: 0,
        }]);
        (ctx, id)
    }

    fn run(ctx: &mut AppContext, name: &str, arg: Option<&str>) {
        let handler = get_by_name(name).unwrap();
        let mut event = KeyPressEvent::new(ctx, vec![KeyPress::char('x')], arg.map(String::from));
        handler(&mut event).unwrap();
    }

    #[test]
    fn test_every_name_resolves() {
        for name in names() {
            assert!(get_by_name(name).is_some(), "{name}");
        }
        assert!(get_by_name("no-such-command").is_none());
    }

    #[test]
    fn test_line_motion() {
        let (mut ctx, id) = focused("hello world", 5);
        run(&mut ctx, "beginning-of-line", None);
        assert_eq!(ctx.buffer(id).unwrap().cursor_position(), 0);
        run(&mut ctx, "end-of-line", None);
        assert_eq!(ctx.buffer(id).unwrap().cursor_position(), 11);
        run(&mut ctx, "backward-word", None);
        assert_eq!(ctx.buffer(id).unwrap().cursor_position(), 6);
    }

    #[test]
    fn test_kill_and_yank() {
        let (mut ctx, id) = focused("hello world", 5);
        run(&mut ctx, "kill-line", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), "hello");
        run(&mut ctx, "beginning-of-line", None);
        run(&mut ctx, "yank", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), " worldhello");
    }

    #[test]
    fn test_backward_kill_word() {
        let (mut ctx, id) = focused("echo hello", 10);
        run(&mut ctx, "unix-word-rubout", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), "echo ");
        assert_eq!(ctx.clipboard().get_data().text, "hello");
    }

    #[test]
    fn test_transpose_and_case() {
        let (mut ctx, id) = focused("ab", 1);
        run(&mut ctx, "transpose-chars", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), "ba");

        let (mut ctx, id) = focused("hello world", 0);
        run(&mut ctx, "capitalize-word", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), "Hello world");
        run(&mut ctx, "uppercase-word", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), "Hello WORLD");
    }

    #[test]
    fn test_self_insert_repeats() {
        let (mut ctx, id) = focused("", 0);
        run(&mut ctx, "self-insert", Some("3"));
        assert_eq!(ctx.buffer(id).unwrap().text(), "xxx");
    }

    #[test]
    fn test_delete_horizontal_space() {
        let (mut ctx, id) = focused("a   \t b", 3);
        run(&mut ctx, "delete-horizontal-space", None);
        assert_eq!(ctx.buffer(id).unwrap().text(), "ab");
    }

    #[test]
    fn test_backward_delete_rings_bell_at_start() {
        let (mut ctx, _) = focused("abc", 0);
        run(&mut ctx, "backward-delete-char", None);
        assert!(ctx.bell);
    }
}
