//! Terminal reports delivered as keys: mouse events, scroll wheel and
//! cursor position responses.

use super::bindings::{Binding, KeyBindings};
use crate::context::PendingMouse;
use quill_input::{parse_mouse_event, Key, KeyPress};

/// Parses the row of a cursor position report (`ESC [ row ; col R`).
pub(crate) fn parse_cpr_row(data: &str) -> Option<usize> {
    let body = data.strip_prefix("\x1b[")?.strip_suffix('R')?;
    let (row, _col) = body.split_once(';')?;
    row.parse().ok()
}

/// Loads the bindings that turn terminal reports into application events.
pub fn load_mouse_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();

    // Routed through the mouse handler grid after the key batch.
    kb.add(Key::Mouse, |event| {
        match parse_mouse_event(event.data()) {
            Some(mouse) => event.ctx.pending_mouse.push(PendingMouse { event: mouse }),
            None => tracing::debug!(data = ?event.data(), "malformed mouse report"),
        }
        Ok(())
    });

    // Without mouse reporting, some terminals turn the wheel into arrows.
    kb.add(Key::ScrollUp, |event| {
        event.ctx.feed_keys_first([KeyPress::new(Key::Up, "")]);
        Ok(())
    });
    kb.add(Key::ScrollDown, |event| {
        event.ctx.feed_keys_first([KeyPress::new(Key::Down, "")]);
        Ok(())
    });

    kb.add_binding(
        Binding::new(Key::CprResponse, |event| {
            if let Some(row) = parse_cpr_row(event.data()) {
                event.ctx.cpr_row = Some(row);
            }
            Ok(())
        })
        .save_before(|_| false)
        .without_macro_recording(),
    );

    kb
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_cpr_row() {
        assert_eq!(parse_cpr_row("\x1b[12;1R"), Some(12));
        assert_eq!(parse_cpr_row("\x1b[R"), None);
        assert_eq!(parse_cpr_row("12;1R"), None);
    }
}
