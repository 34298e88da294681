//! VT100 / xterm input sequences.
//!
//! [`lookup`] maps a complete escape sequence to the keys it stands for
//! (some sequences, such as Alt-arrow, produce two keys). [`key_to_sequence`]
//! goes the other way and is used to synthesize input.

use crate::keys::Key;
use once_cell::sync::Lazy;
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;

/// Keys produced by one sequence.
pub type KeyList = SmallVec<[Key; 2]>;

/// Sequence that starts bracketed paste.
pub const BRACKETED_PASTE_START: &str = "\x1b[200~";
/// Sequence that ends bracketed paste.
pub const BRACKETED_PASTE_END: &str = "\x1b[201~";

const SEQUENCES: &[(&str, Key)] = &[
    // Arrows, normal and application cursor mode
    ("\x1b[A", Key::Up),
    ("\x1b[B", Key::Down),
    ("\x1b[C", Key::Right),
    ("\x1b[D", Key::Left),
    ("\x1b[H", Key::Home),
    ("\x1b[F", Key::End),
    ("\x1bOA", Key::Up),
    ("\x1bOB", Key::Down),
    ("\x1bOC", Key::Right),
    ("\x1bOD", Key::Left),
    ("\x1bOH", Key::Home),
    ("\x1bOF", Key::End),
    // Editing keypad
    ("\x1b[1~", Key::Home),
    ("\x1b[2~", Key::Insert),
    ("\x1b[3~", Key::Delete),
    ("\x1b[4~", Key::End),
    ("\x1b[5~", Key::PageUp),
    ("\x1b[6~", Key::PageDown),
    ("\x1b[7~", Key::Home),
    ("\x1b[8~", Key::End),
    ("\x1b[Z", Key::BackTab),
    ("\x1b[3;2~", Key::ShiftDelete),
    ("\x1b[3;5~", Key::ControlDelete),
    // Function keys
    ("\x1bOP", Key::F(1)),
    ("\x1bOQ", Key::F(2)),
    ("\x1bOR", Key::F(3)),
    ("\x1bOS", Key::F(4)),
    ("\x1b[[A", Key::F(1)),
    ("\x1b[[B", Key::F(2)),
    ("\x1b[[C", Key::F(3)),
    ("\x1b[[D", Key::F(4)),
    ("\x1b[[E", Key::F(5)),
    ("\x1b[11~", Key::F(1)),
    ("\x1b[12~", Key::F(2)),
    ("\x1b[13~", Key::F(3)),
    ("\x1b[14~", Key::F(4)),
    ("\x1b[15~", Key::F(5)),
    ("\x1b[17~", Key::F(6)),
    ("\x1b[18~", Key::F(7)),
    ("\x1b[19~", Key::F(8)),
    ("\x1b[20~", Key::F(9)),
    ("\x1b[21~", Key::F(10)),
    ("\x1b[23~", Key::F(11)),
    ("\x1b[24~", Key::F(12)),
    ("\x1b[25~", Key::F(13)),
    ("\x1b[26~", Key::F(14)),
    ("\x1b[28~", Key::F(15)),
    ("\x1b[29~", Key::F(16)),
    ("\x1b[31~", Key::F(17)),
    ("\x1b[32~", Key::F(18)),
    ("\x1b[33~", Key::F(19)),
    ("\x1b[34~", Key::F(20)),
    ("\x1b[20;2~", Key::F(21)),
    ("\x1b[21;2~", Key::F(22)),
    ("\x1b[23;2~", Key::F(23)),
    ("\x1b[24;2~", Key::F(24)),
    // Modified arrows (xterm)
    ("\x1b[1;5A", Key::ControlUp),
    ("\x1b[1;5B", Key::ControlDown),
    ("\x1b[1;5C", Key::ControlRight),
    ("\x1b[1;5D", Key::ControlLeft),
    ("\x1b[1;5H", Key::ControlHome),
    ("\x1b[1;5F", Key::ControlEnd),
    ("\x1b[1;2A", Key::ShiftUp),
    ("\x1b[1;2B", Key::ShiftDown),
    ("\x1b[1;2C", Key::ShiftRight),
    ("\x1b[1;2D", Key::ShiftLeft),
    ("\x1b[1;2H", Key::ShiftHome),
    ("\x1b[1;2F", Key::ShiftEnd),
    // Modified arrows (rxvt)
    ("\x1bOa", Key::ControlUp),
    ("\x1bOb", Key::ControlDown),
    ("\x1bOc", Key::ControlRight),
    ("\x1bOd", Key::ControlLeft),
    ("\x1b[a", Key::ShiftUp),
    ("\x1b[b", Key::ShiftDown),
    ("\x1b[c", Key::ShiftRight),
    ("\x1b[d", Key::ShiftLeft),
    ("\x1b[5A", Key::ControlUp),
    ("\x1b[5B", Key::ControlDown),
    ("\x1b[5C", Key::ControlRight),
    ("\x1b[5D", Key::ControlLeft),
    // Keypad center
    ("\x1b[E", Key::Ignore),
    ("\x1b[G", Key::Ignore),
];

/// Alt-modified keys that terminals send as one sequence.
const META_SEQUENCES: &[(&str, Key)] = &[
    ("\x1b[1;3A", Key::Up),
    ("\x1b[1;3B", Key::Down),
    ("\x1b[1;3C", Key::Right),
    ("\x1b[1;3D", Key::Left),
    ("\x1b[1;3H", Key::Home),
    ("\x1b[1;3F", Key::End),
    ("\x1b[3;3~", Key::Delete),
];

static TABLE: Lazy<HashMap<&'static str, KeyList>> = Lazy::new(|| {
    let mut table: HashMap<&'static str, KeyList> = SEQUENCES
        .iter()
        .map(|(seq, key)| (*seq, smallvec![*key]))
        .collect();
    for (seq, key) in META_SEQUENCES {
        table.insert(seq, smallvec![Key::Escape, *key]);
    }
    table
});

/// Keys for a complete escape sequence, if it is known.
pub fn lookup(sequence: &str) -> Option<&'static KeyList> {
    TABLE.get(sequence)
}

/// Bytes for a control key, as a character.
pub fn control_char(c: char) -> Option<char> {
    match c {
        'a'..='z' => Some(((c as u8) - b'a' + 1) as char),
        '@' => Some('\x00'),
        '\\' => Some('\x1c'),
        ']' => Some('\x1d'),
        '^' => Some('\x1e'),
        '_' => Some('\x1f'),
        _ => None,
    }
}

/// Key for a single control character in the ground state.
pub fn key_for_control_char(c: char) -> Key {
    match c {
        '\x00' => Key::Control('@'),
        '\x08' | '\x7f' => Key::Backspace,
        '\t' => Key::Tab,
        '\r' => Key::Enter,
        '\x1b' => Key::Escape,
        '\x1c' => Key::Control('\\'),
        '\x1d' => Key::Control(']'),
        '\x1e' => Key::Control('^'),
        '\x1f' => Key::Control('_'),
        c if (c as u32) < 0x1b => Key::Control(((c as u8) - 1 + b'a') as char),
        other => Key::Char(other),
    }
}

/// The input that a terminal sends for `key`.
///
/// Returns `None` for keys that have no fixed encoding (mouse reports,
/// pastes, the binding wildcard).
pub fn key_to_sequence(key: Key) -> Option<String> {
    let fixed = match key {
        Key::Char(c) => return Some(c.to_string()),
        Key::Control(c) => return control_char(c).map(|c| c.to_string()),
        Key::Escape => "\x1b",
        Key::Enter => "\r",
        Key::Tab => "\t",
        Key::Backspace => "\x7f",
        Key::Up => "\x1b[A",
        Key::Down => "\x1b[B",
        Key::Right => "\x1b[C",
        Key::Left => "\x1b[D",
        Key::Home => "\x1b[H",
        Key::End => "\x1b[F",
        Key::F(1) => "\x1bOP",
        Key::F(2) => "\x1bOQ",
        Key::F(3) => "\x1bOR",
        Key::F(4) => "\x1bOS",
        Key::BracketedPaste
        | Key::Mouse
        | Key::CprResponse
        | Key::Any
        | Key::Sigint
        | Key::Ignore
        | Key::ScrollUp
        | Key::ScrollDown => return None,
        other => {
            return SEQUENCES
                .iter()
                .find(|(_, k)| *k == other)
                .map(|(seq, _)| (*seq).to_string());
        }
    };
    Some(fixed.to_string())
}

/// Serializes keys into terminal input.
pub fn serialize_keys(keys: &[Key]) -> String {
    keys.iter()
        .filter_map(|k| key_to_sequence(*k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("\x1b[A").map(|k| k.as_slice()), Some(&[Key::Up][..]));
        assert_eq!(
            lookup("\x1b[1;3D").map(|k| k.as_slice()),
            Some(&[Key::Escape, Key::Left][..])
        );
        assert!(lookup("\x1b[99~").is_none());
    }

    #[test]
    fn test_control_chars() {
        assert_eq!(key_for_control_char('\x01'), Key::Control('a'));
        assert_eq!(key_for_control_char('\x03'), Key::Control('c'));
        assert_eq!(key_for_control_char('\x0a'), Key::Control('j'));
        assert_eq!(key_for_control_char('\x1a'), Key::Control('z'));
        assert_eq!(key_for_control_char('\r'), Key::Enter);
        assert_eq!(key_for_control_char('\x7f'), Key::Backspace);
        assert_eq!(control_char('c'), Some('\x03'));
        assert_eq!(control_char('1'), None);
    }

    #[test]
    fn test_every_named_sequence_has_a_key() {
        for (seq, key) in SEQUENCES.iter().filter(|(_, k)| *k != Key::Ignore) {
            let encoded = key_to_sequence(*key).unwrap();
            assert!(lookup(&encoded).is_some(), "{seq:?} -> {key:?}");
        }
    }
}
