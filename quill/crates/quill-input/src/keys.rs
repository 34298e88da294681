//! Keys and key presses.
//!
//! A [`Key`] is what key bindings match against; a [`KeyPress`] is one
//! parsed input event, carrying the key together with the text that
//! produced it.
//!
//! Alt/Meta combinations are not a separate key: the terminal sends them as
//! an escape prefix, so `Alt-f` arrives as `[Escape, Char('f')]` and is bound
//! as that two-key sequence.

use std::fmt;
use std::str::FromStr;

/// A key as seen by key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// Control plus a lowercase letter or one of `@ \ ] ^ _`.
    ///
    /// `Ctrl-M`, `Ctrl-I` and `Ctrl-H` are reported as [`Key::Enter`],
    /// [`Key::Tab`] and [`Key::Backspace`].
    Control(char),
    /// Escape.
    Escape,
    /// Enter / Return (`\r`).
    Enter,
    /// Tab.
    Tab,
    /// Shift-Tab.
    BackTab,
    /// Backspace (`\x7f` or `\x08`).
    Backspace,
    /// Delete.
    Delete,
    /// Shift-Delete.
    ShiftDelete,
    /// Control-Delete.
    ControlDelete,
    /// Insert.
    Insert,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Control-Up.
    ControlUp,
    /// Control-Down.
    ControlDown,
    /// Control-Left.
    ControlLeft,
    /// Control-Right.
    ControlRight,
    /// Control-Home.
    ControlHome,
    /// Control-End.
    ControlEnd,
    /// Shift-Up.
    ShiftUp,
    /// Shift-Down.
    ShiftDown,
    /// Shift-Left.
    ShiftLeft,
    /// Shift-Right.
    ShiftRight,
    /// Shift-Home.
    ShiftHome,
    /// Shift-End.
    ShiftEnd,
    /// Function keys F1 to F24.
    F(u8),
    /// Text delivered through bracketed paste; the text is in the data.
    BracketedPaste,
    /// A terminal mouse report; the raw report is in the data.
    Mouse,
    /// Mouse wheel up (terminals without mouse reporting).
    ScrollUp,
    /// Mouse wheel down.
    ScrollDown,
    /// Response to a cursor position request; the report is in the data.
    CprResponse,
    /// A recognised sequence that should be ignored.
    Ignore,
    /// Interrupt delivered as a key.
    Sigint,
    /// Binding wildcard that matches any single key.
    Any,
}

impl Key {
    /// The canonical binding name, e.g. `c-a`, `escape`, `s-up`, `f5`.
    pub fn name(&self) -> String {
        match self {
            Self::Char(' ') => "space".to_string(),
            Self::Char(c) => c.to_string(),
            Self::Control('@') => "c-space".to_string(),
            Self::Control(c) => format!("c-{c}"),
            Self::F(n) => format!("f{n}"),
            other => other.static_name().to_string(),
        }
    }

    fn static_name(&self) -> &'static str {
        match self {
            Self::Escape => "escape",
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::BackTab => "s-tab",
            Self::Backspace => "backspace",
            Self::Delete => "delete",
            Self::ShiftDelete => "s-delete",
            Self::ControlDelete => "c-delete",
            Self::Insert => "insert",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Home => "home",
            Self::End => "end",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
            Self::ControlUp => "c-up",
            Self::ControlDown => "c-down",
            Self::ControlLeft => "c-left",
            Self::ControlRight => "c-right",
            Self::ControlHome => "c-home",
            Self::ControlEnd => "c-end",
            Self::ShiftUp => "s-up",
            Self::ShiftDown => "s-down",
            Self::ShiftLeft => "s-left",
            Self::ShiftRight => "s-right",
            Self::ShiftHome => "s-home",
            Self::ShiftEnd => "s-end",
            Self::BracketedPaste => "<bracketed-paste>",
            Self::Mouse => "<vt100-mouse-event>",
            Self::ScrollUp => "<scroll-up>",
            Self::ScrollDown => "<scroll-down>",
            Self::CprResponse => "<cursor-position-response>",
            Self::Ignore => "<ignore>",
            Self::Sigint => "<sigint>",
            Self::Any => "<any>",
            Self::Char(_) | Self::Control(_) | Self::F(_) => "",
        }
    }

    /// Parses a binding name.
    ///
    /// ```
    /// use quill_input::keys::Key;
    ///
    /// assert_eq!(Key::parse("c-x"), Some(Key::Control('x')));
    /// assert_eq!(Key::parse("c-m"), Some(Key::Enter));
    /// assert_eq!(Key::parse("escape"), Some(Key::Escape));
    /// assert_eq!(Key::parse("f12"), Some(Key::F(12)));
    /// assert_eq!(Key::parse("q"), Some(Key::Char('q')));
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Self::Char(c));
        }

        let lower = name.to_ascii_lowercase();
        let lower = lower.as_str();
        let key = match lower {
            "space" => Self::Char(' '),
            "escape" | "esc" => Self::Escape,
            "enter" | "c-m" => Self::Enter,
            "tab" | "c-i" => Self::Tab,
            "s-tab" | "backtab" => Self::BackTab,
            "backspace" | "c-h" => Self::Backspace,
            "delete" => Self::Delete,
            "s-delete" => Self::ShiftDelete,
            "c-delete" => Self::ControlDelete,
            "insert" => Self::Insert,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            "c-up" => Self::ControlUp,
            "c-down" => Self::ControlDown,
            "c-left" => Self::ControlLeft,
            "c-right" => Self::ControlRight,
            "c-home" => Self::ControlHome,
            "c-end" => Self::ControlEnd,
            "s-up" => Self::ShiftUp,
            "s-down" => Self::ShiftDown,
            "s-left" => Self::ShiftLeft,
            "s-right" => Self::ShiftRight,
            "s-home" => Self::ShiftHome,
            "s-end" => Self::ShiftEnd,
            "c-space" | "c-@" => Self::Control('@'),
            "<bracketed-paste>" => Self::BracketedPaste,
            "<vt100-mouse-event>" => Self::Mouse,
            "<scroll-up>" => Self::ScrollUp,
            "<scroll-down>" => Self::ScrollDown,
            "<cursor-position-response>" => Self::CprResponse,
            "<ignore>" => Self::Ignore,
            "<sigint>" => Self::Sigint,
            "<any>" => Self::Any,
            other => {
                if let Some(rest) = other.strip_prefix("c-") {
                    let mut it = rest.chars();
                    return match (it.next(), it.next()) {
                        (Some(c), None) if c.is_ascii_lowercase() || "\\]^_".contains(c) => {
                            Some(Self::Control(c))
                        }
                        _ => None,
                    };
                }
                if let Some(n) = other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    return (1..=24).contains(&n).then_some(Self::F(n));
                }
                return None;
            }
        };
        Some(key)
    }

    /// Parses a space separated sequence such as `"c-x c-e"` or `"escape f"`.
    pub fn parse_sequence(names: &str) -> Option<Vec<Self>> {
        names.split_whitespace().map(Self::parse).collect()
    }

    /// Returns true for printable characters.
    #[inline]
    pub fn is_char(&self) -> bool {
        matches!(self, Self::Char(_))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown key: {s}"))
    }
}

/// One parsed key press.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
    /// The key.
    pub key: Key,
    /// The text this key stands for: the character for [`Key::Char`], the
    /// pasted text for [`Key::BracketedPaste`], the report for mouse and
    /// cursor position responses, the raw bytes otherwise.
    pub data: String,
    /// The raw input that produced this key press.
    pub raw: String,
}

impl KeyPress {
    /// Creates a key press whose raw input equals its data.
    pub fn new(key: Key, data: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            key,
            raw: data.clone(),
            data,
        }
    }

    /// Creates a key press with explicit raw input.
    pub fn with_raw(key: Key, data: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            key,
            data: data.into(),
            raw: raw.into(),
        }
    }

    /// A key press for a printable character.
    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c), c.to_string())
    }
}

impl From<Key> for KeyPress {
    fn from(key: Key) -> Self {
        let data = match key {
            Key::Char(c) => c.to_string(),
            other => crate::ansi_sequences::key_to_sequence(other).unwrap_or_default(),
        };
        Self::new(key, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(Key::parse("c-a"), Some(Key::Control('a')));
        assert_eq!(Key::parse("C-A"), Some(Key::Control('a')));
        assert_eq!(Key::parse("c-_"), Some(Key::Control('_')));
        assert_eq!(Key::parse("c-space"), Some(Key::Control('@')));
        assert_eq!(Key::parse("s-tab"), Some(Key::BackTab));
        assert_eq!(Key::parse("<any>"), Some(Key::Any));
        assert_eq!(Key::parse("f25"), None);
        assert_eq!(Key::parse("c-1"), None);
        assert_eq!(Key::parse("nonsense"), None);
    }

    #[test]
    fn test_name_round_trip() {
        let keys = [
            Key::Char('x'),
            Key::Char(' '),
            Key::Control('e'),
            Key::Control('@'),
            Key::Escape,
            Key::ControlLeft,
            Key::ShiftEnd,
            Key::F(7),
            Key::Any,
        ];
        for key in keys {
            assert_eq!(Key::parse(&key.name()), Some(key), "{key:?}");
        }
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(
            Key::parse_sequence("c-x c-e"),
            Some(vec![Key::Control('x'), Key::Control('e')])
        );
        assert_eq!(
            Key::parse_sequence("escape f"),
            Some(vec![Key::Escape, Key::Char('f')])
        );
        assert_eq!(Key::parse_sequence("c-x bogus"), None);
    }

    #[test]
    fn test_key_press_from_key() {
        assert_eq!(KeyPress::from(Key::Char('a')).data, "a");
        assert_eq!(KeyPress::from(Key::Up).data, "\x1b[A");
        assert_eq!(KeyPress::from(Key::Enter).data, "\r");
    }
}
