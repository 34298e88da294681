//! Accepting auto-suggestions.

use super::bindings::KeyBindings;
use crate::filters;
use once_cell::sync::Lazy;
use quill_input::Key;
use regex::Regex;

static NEXT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+\s+").expect("valid regex"));

/// The first word of a suggestion together with its trailing space.
fn first_word(text: &str) -> &str {
    match NEXT_WORD.find(text) {
        Some(m) if m.start() == 0 => m.as_str(),
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Loads the suggestion bindings: Ctrl-F, Ctrl-E and Right accept the whole
/// suggestion, Alt-F its next word.
pub fn load_auto_suggest_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();

    for key in [Key::Control('f'), Key::Control('e'), Key::Right] {
        kb.add_when(key, filters::has_suggestion(), |event| {
            event.with_buffer(|b| {
                b.accept_suggestion();
            })
        });
    }

    kb.add_when([Key::Escape, Key::Char('f')], filters::has_suggestion(), |event| {
        event.with_buffer(|b| {
            let Some(word) = b.suggestion().map(|s| first_word(&s.text).to_string()) else {
                return;
            };
            if !word.is_empty() {
                b.insert_text(&word);
            }
        })
    });

    kb
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_word() {
        assert_eq!(first_word("foo bar"), "foo ");
        assert_eq!(first_word("foo"), "foo");
        assert_eq!(first_word(" foo bar"), " ");
        assert_eq!(first_word(""), "");
    }
}
