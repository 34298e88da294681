//! Emacs-style editing bindings and shift-selection.

use super::basic::insert_mode;
use super::bindings::{Binding, KeyBindings, KeySequence};
use super::commands::{get_by_name, self_insert};
use super::processor::KeyPressEvent;
use crate::error::HandlerResult;
use crate::filters::{self, Filter};
use quill_edit::document::FindOptions;
use quill_edit::{Buffer, CompleteEvent, CompletionOptions, Document, SelectionType};
use quill_input::Key;

const INDENT: &str = "    ";

fn run_named(event: &mut KeyPressEvent<'_>, name: &str) -> HandlerResult {
    match get_by_name(name) {
        Some(handler) => handler(event),
        None => Ok(()),
    }
}

fn esc(c: char) -> [Key; 2] {
    [Key::Escape, Key::Char(c)]
}

fn arg_is_dash() -> Filter {
    Filter::new(|ctx| ctx.key_arg() == Some("-"))
}

fn shift_selection_mode() -> Filter {
    Filter::new(|ctx| {
        ctx.current_buffer()
            .and_then(Buffer::selection)
            .is_some_and(|s| s.shift_mode)
    })
}

/// Loads the Emacs bindings.
pub fn load_emacs_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();
    let insert = insert_mode();
    let returnable = filters::is_returnable();

    // A lone escape does nothing.
    kb.add(Key::Escape, |_| Ok(()));

    // === Movement ===
    kb.add_named(Key::Control('a'), "beginning-of-line");
    kb.add_named(Key::Control('b'), "backward-char");
    kb.add_named(Key::Control('e'), "end-of-line");
    kb.add_named(Key::Control('f'), "forward-char");
    kb.add_named(Key::ControlLeft, "backward-word");
    kb.add_named(Key::ControlRight, "forward-word");
    kb.add_named(esc('b'), "backward-word");
    kb.add_named(esc('f'), "forward-word");
    kb.add_named(Key::ControlHome, "beginning-of-buffer");
    kb.add_named(Key::ControlEnd, "end-of-buffer");

    kb.add(Key::Control('n'), |event| event.with_buffer(|b| b.auto_down(1, false)));
    kb.add(Key::Control('p'), |event| {
        let count = event.count();
        event.with_buffer(|b| b.auto_up(count, false))
    });

    kb.add([Key::Escape, Key::Left], |event| {
        let count = event.count();
        event.with_buffer(|b| {
            let delta = b.document().find_previous_word_beginning(count, false).unwrap_or(0);
            b.move_cursor(delta);
        })
    });
    kb.add([Key::Escape, Key::Right], |event| {
        let count = event.count();
        event.with_buffer(|b| {
            let delta = b
                .document()
                .find_next_word_beginning(count, false)
                .unwrap_or_else(|| b.document().get_end_of_document_position());
            b.move_cursor(delta);
        })
    });

    kb.add([Key::Control('x'), Key::Control('x')], |event| {
        event.with_buffer(|b| {
            let delta = if b.document().is_cursor_at_the_end_of_line() {
                b.document().get_start_of_line_position(false)
            } else {
                b.document().get_end_of_line_position()
            };
            b.move_cursor(delta);
        })
    });

    // Sentence movement and Alt-t are accepted but do nothing.
    kb.add(esc('a'), |_| Ok(()));
    kb.add(esc('e'), |_| Ok(()));
    kb.add_when(esc('t'), insert.clone(), |_| Ok(()));

    // === Character search ===
    kb.add([Key::Control(']'), Key::Any], |event| {
        let arg = event.arg();
        character_search(event, arg)
    });
    kb.add([Key::Escape, Key::Control(']'), Key::Any], |event| {
        let arg = event.arg();
        character_search(event, -arg)
    });

    // === Editing ===
    kb.add_named_when(Key::ControlDelete, insert.clone(), "kill-word");
    kb.add_named_when([Key::Control('x'), Key::Char('r'), Key::Char('y')], insert.clone(), "yank");
    kb.add_named_when(Key::Control('y'), insert.clone(), "yank");
    kb.add_named_when(esc('c'), insert.clone(), "capitalize-word");
    kb.add_named_when(esc('d'), insert.clone(), "kill-word");
    kb.add_named_when(esc('l'), insert.clone(), "downcase-word");
    kb.add_named_when(esc('u'), insert.clone(), "uppercase-word");
    kb.add_named_when(esc('y'), insert.clone(), "yank-pop");
    kb.add_named_when([Key::Escape, Key::Backspace], insert.clone(), "backward-kill-word");
    kb.add_named_when(esc('\\'), insert.clone(), "delete-horizontal-space");

    for keys in [
        KeySequence::from(Key::Control('_')),
        KeySequence::from([Key::Control('x'), Key::Control('u')]),
    ] {
        if let Some(binding) = Binding::named(keys, "undo") {
            kb.add_binding(binding.with_filter(insert.clone()).save_before(|_| false));
        }
    }

    // === History ===
    kb.add_named_when(esc('<'), !returnable.clone(), "beginning-of-history");
    kb.add_named_when(esc('>'), !returnable.clone(), "end-of-history");
    kb.add_named_when(esc('.'), returnable.clone(), "yank-last-arg");
    kb.add_named_when(esc('_'), returnable.clone(), "yank-last-arg");
    kb.add_named_when([Key::Escape, Key::Control('y')], returnable.clone(), "yank-nth-arg");
    kb.add_named_when(esc('#'), returnable.clone(), "insert-comment");
    kb.add_named(Key::Control('o'), "operate-and-get-next");

    // Ctrl-Q needs flow control disabled (`stty -ixon`) to reach us.
    kb.add_named_when(Key::Control('q'), !filters::has_selection(), "quoted-insert");

    // === Keyboard macros ===
    kb.add_named([Key::Control('x'), Key::Char('(')], "start-kbd-macro");
    kb.add_named([Key::Control('x'), Key::Char(')')], "end-kbd-macro");
    kb.add_named([Key::Control('x'), Key::Char('e')], "call-last-kbd-macro");

    // === Repeat arguments ===
    for digit in '0'..='9' {
        let handler = move |event: &mut KeyPressEvent<'_>| {
            event.append_to_arg_count(&digit.to_string());
            Ok(())
        };
        kb.add_when(digit, filters::has_arg(), handler);
        kb.add(esc(digit), handler);
    }
    kb.add_when(esc('-'), !filters::has_arg(), |event| {
        if !event.arg_present() {
            event.append_to_arg_count("-");
        }
        Ok(())
    });
    kb.add_when('-', arg_is_dash(), |event| {
        event.ctx.key_arg = Some("-".to_string());
        Ok(())
    });

    // === Accepting input ===
    kb.add_named_when(
        [Key::Escape, Key::Enter],
        insert.clone() & returnable.clone(),
        "accept-line",
    );
    kb.add_named_when(
        Key::Enter,
        insert.clone() & returnable & !filters::is_multiline(),
        "accept-line",
    );

    // === Completion ===
    kb.add_when(esc('*'), insert.clone(), insert_all_completions);
    kb.add_when(esc('/'), insert, |event| {
        event.with_buffer(|b| {
            if b.complete_state().is_some() {
                b.complete_next(1, false);
            } else {
                b.start_completion(CompletionOptions::requested().select_first());
            }
        })
    });

    // === Selection ===
    kb.add(Key::Control('@'), |event| {
        event.with_buffer(|b| {
            if !b.text().is_empty() {
                b.start_selection(SelectionType::Characters);
            }
        })
    });
    kb.add_when(Key::Control('g'), !filters::has_selection(), |event| {
        event.with_buffer(|b| {
            b.cancel_completion();
            b.clear_validation_error();
        })
    });
    kb.add_when(Key::Control('g'), filters::has_selection(), |event| {
        event.with_buffer(Buffer::exit_selection)
    });
    for keys in [
        KeySequence::from(Key::Control('w')),
        KeySequence::from([Key::Control('x'), Key::Char('r'), Key::Char('k')]),
    ] {
        kb.add_when(keys, filters::has_selection(), |event| {
            if let Some(data) = event.current_buffer_mut().map(Buffer::cut_selection) {
                event.ctx.clipboard().set_data(data);
            }
            Ok(())
        });
    }
    kb.add_when(esc('w'), filters::has_selection(), |event| {
        if let Some(data) = event.current_buffer_mut().map(Buffer::copy_selection) {
            event.ctx.clipboard().set_data(data);
        }
        Ok(())
    });
    kb.add_when(
        [Key::Control('c'), Key::Char('>')],
        filters::has_selection(),
        |event| shift_selected_lines(event, true),
    );
    kb.add_when(
        [Key::Control('c'), Key::Char('<')],
        filters::has_selection(),
        |event| shift_selected_lines(event, false),
    );

    kb
}

fn character_search(event: &mut KeyPressEvent<'_>, count: isize) -> HandlerResult {
    let target = event.data().to_string();
    event.with_buffer(|b| {
        let options = FindOptions::default()
            .in_current_line(true)
            .count(count.unsigned_abs());
        let found = if count < 0 {
            b.document().find_backwards(&target, options)
        } else {
            b.document().find(&target, options)
        };
        if let Some(delta) = found {
            b.move_cursor(delta);
        }
    })
}

fn insert_all_completions(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    event.with_buffer(|b| {
        let Some(completer) = b.completer().cloned() else {
            return;
        };
        let document = b.document().clone();
        let words: Vec<String> = completer
            .get_completions(&document, &CompleteEvent::requested())
            .map(|c| c.text)
            .collect();
        b.insert_text(&words.join(" "));
    })
}

fn shift_selected_lines(event: &mut KeyPressEvent<'_>, right: bool) -> HandlerResult {
    let count = event.count();
    event.with_buffer(|b| {
        let (from, to) = b.document().selection_range();
        let from_row = b.document().translate_index_to_position(from).0;
        let to_row = b.document().translate_index_to_position(to).0;
        let current_row = b.document().cursor_position_row();
        let prefix = INDENT.repeat(count);
        let text = b.transform_lines(from_row..=to_row, |line| {
            if right {
                format!("{prefix}{line}")
            } else if let Some(rest) = line.strip_prefix(prefix.as_str()) {
                rest.to_string()
            } else {
                line.trim_start().to_string()
            }
        });
        let cursor = Document::new(text.as_str()).translate_row_col_to_index(current_row, 0);
        b.set_document(Document::with_cursor(text, cursor));
        b.move_cursor(b.document().get_start_of_line_position(true));
    })
}

// === Shift selection ===

const SHIFT_KEYS: [Key; 6] = [
    Key::ShiftLeft,
    Key::ShiftRight,
    Key::ShiftUp,
    Key::ShiftDown,
    Key::ShiftHome,
    Key::ShiftEnd,
];

const PLAIN_MOVES: [Key; 10] = [
    Key::Left,
    Key::Right,
    Key::Up,
    Key::Down,
    Key::Home,
    Key::End,
    Key::ControlLeft,
    Key::ControlRight,
    Key::ControlHome,
    Key::ControlEnd,
];

/// Runs the movement a shifted key stands for.
fn unshift_move(event: &mut KeyPressEvent<'_>) -> HandlerResult {
    let count = event.count();
    match event.key_sequence.first().map(|k| k.key) {
        Some(Key::ShiftUp) => event.with_buffer(|b| b.auto_up(count, false)),
        Some(Key::ShiftDown) => event.with_buffer(|b| b.auto_down(count, false)),
        Some(Key::ShiftLeft) => run_named(event, "backward-char"),
        Some(Key::ShiftRight) => run_named(event, "forward-char"),
        Some(Key::ShiftHome) => run_named(event, "beginning-of-line"),
        Some(Key::ShiftEnd) => run_named(event, "end-of-line"),
        _ => Ok(()),
    }
}

/// Loads the bindings that select text with shift plus a movement key.
pub fn load_emacs_shift_selection_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();

    for key in SHIFT_KEYS {
        kb.add_when(key, !filters::has_selection(), |event| {
            let Some(original) = event.current_buffer().map(Buffer::cursor_position) else {
                return Ok(());
            };
            if event.current_buffer().is_some_and(|b| b.text().is_empty()) {
                return Ok(());
            }
            event.with_buffer(|b| {
                b.start_selection(SelectionType::Characters);
                if let Some(mut selection) = b.selection().copied() {
                    selection.enter_shift_mode();
                    b.set_selection(Some(selection));
                }
            })?;
            unshift_move(event)?;
            event.with_buffer(|b| {
                if b.cursor_position() == original {
                    b.exit_selection();
                }
            })
        });

        kb.add_when(key, shift_selection_mode(), |event| {
            unshift_move(event)?;
            event.with_buffer(|b| {
                if b
                    .selection()
                    .is_some_and(|s| s.original_cursor_position == b.cursor_position())
                {
                    b.exit_selection();
                }
            })
        });
    }

    // Typing replaces the selection.
    kb.add_when(Key::Any, shift_selection_mode(), |event| {
        if !matches!(event.key(), Some(Key::Char(_))) {
            return Ok(());
        }
        event.with_buffer(|b| {
            b.cut_selection();
        })?;
        self_insert(event)
    });
    kb.add_when(
        Key::Enter,
        shift_selection_mode() & filters::is_multiline(),
        |event| {
            let copy_margin = !event.ctx.paste_mode;
            event.with_buffer(|b| {
                b.cut_selection();
                b.newline(copy_margin);
            })
        },
    );
    kb.add_when(Key::Backspace, shift_selection_mode(), |event| {
        event.with_buffer(|b| {
            b.cut_selection();
        })
    });
    kb.add_when(Key::Control('y'), shift_selection_mode(), |event| {
        event.with_buffer(|b| {
            b.cut_selection();
        })?;
        run_named(event, "yank")
    });

    // A plain movement ends the selection, then moves.
    for key in PLAIN_MOVES {
        kb.add_when(key, shift_selection_mode(), |event| {
            event.with_buffer(Buffer::exit_selection)?;
            let keys = event.key_sequence.clone();
            event.ctx.feed_keys_first(keys);
            Ok(())
        });
    }

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
    use quill_input::KeyPress;

    fn setup(text: &str) -> AppContext {
        let mut ctx = test_context();
        let id = ctx.add_buffer(Buffer::new().with_document(Document::new(text)));
        ctx.set_windows(vec![WindowInfo::for_buffer(WindowId::new(), id)]);
        ctx.global_bindings = vec![
            load_basic_bindings().shared(),
            load_emacs_bindings().shared(),
            load_emacs_shift_selection_bindings().shared(),
        ];
        ctx
    }

    fn press(ctx: &mut AppContext, keys: &[Key]) {
        let mut processor = KeyProcessor::new();
        processor.feed_multiple(keys.iter().map(|k| KeyPress::from(*k)));
        processor.process_keys(ctx);
    }

    fn text(ctx: &AppContext) -> String {
        ctx.current_buffer().map(|b| b.text().to_string()).unwrap_or_default()
    }

    fn cursor(ctx: &AppContext) -> usize {
        ctx.current_buffer().map_or(0, Buffer::cursor_position)
    }

    #[test]
    fn test_line_movement() {
        let mut ctx = setup("hello world");
        press(&mut ctx, &[Key::Control('a')]);
        assert_eq!(cursor(&ctx), 0);
        press(&mut ctx, &[Key::Escape, Key::Char('f')]);
        assert_eq!(cursor(&ctx), 5);
        press(&mut ctx, &[Key::Control('e')]);
        assert_eq!(cursor(&ctx), 11);
    }

    #[test]
    fn test_meta_digit_repeats_next_command() {
        let mut ctx = setup("");
        press(&mut ctx, &[Key::Escape, Key::Char('3'), Key::Char('x')]);
        assert_eq!(text(&ctx), "xxx");
    }

    #[test]
    fn test_kill_and_yank() {
        let mut ctx = setup("hello world");
        press(&mut ctx, &[Key::Control('a'), Key::Control('k')]);
        assert_eq!(text(&ctx), "");
        press(&mut ctx, &[Key::Control('y')]);
        assert_eq!(text(&ctx), "hello world");
    }

    #[test]
    fn test_character_search() {
        let mut ctx = setup("a,b,c");
        press(&mut ctx, &[Key::Control('a'), Key::Control(']'), Key::Char(',')]);
        assert_eq!(cursor(&ctx), 1);
    }

    #[test]
    fn test_shift_selection_replaced_by_typing() {
        let mut ctx = setup("abc");
        press(&mut ctx, &[Key::ShiftLeft, Key::ShiftLeft, Key::Char('x')]);
        assert_eq!(text(&ctx), "ax");
        assert!(ctx.current_buffer().is_some_and(|b| b.selection().is_none()));
    }

    #[test]
    fn test_plain_movement_ends_shift_selection() {
        let mut ctx = setup("abc");
        press(&mut ctx, &[Key::ShiftLeft, Key::Left]);
        assert!(ctx.current_buffer().is_some_and(|b| b.selection().is_none()));
        assert_eq!(cursor(&ctx), 1);
    }

    #[test]
    fn test_indent_selected_lines() {
        let mut ctx = setup("a\nb");
        press(
            &mut ctx,
            &[Key::ControlHome, Key::Control('@'), Key::ControlEnd],
        );
        press(&mut ctx, &[Key::Control('c'), Key::Char('>')]);
        assert_eq!(text(&ctx), "    a\n    b");
    }
}
