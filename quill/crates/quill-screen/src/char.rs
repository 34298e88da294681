//! Screen cells.
//!
//! A [`Char`] is one cell of a [`Screen`](crate::screen::Screen): the text
//! shown there, its style string and its display width.
//!
//! # Wide characters
//!
//! A character two cells wide is stored in the first cell with width 2; the
//! cell after it holds a [`Char::placeholder`], which the diff never writes.
//!
//! # Control characters
//!
//! Control characters are displayed in caret notation (`^A`) and styled with
//! `class:control-character`.

use quill_core::width::{char_width, str_width};
use std::rc::Rc;

thread_local! {
    static ASCII: Vec<Rc<str>> = (0u8..128).map(|b| Rc::from((b as char).to_string())).collect();
    static EMPTY_STYLE: Rc<str> = Rc::from("");
}

fn intern(c: char) -> Rc<str> {
    if c.is_ascii() {
        ASCII.with(|table| Rc::clone(&table[c as usize]))
    } else {
        Rc::from(c.to_string())
    }
}

/// The style string shared by unstyled cells.
pub fn empty_style() -> Rc<str> {
    EMPTY_STYLE.with(Rc::clone)
}

/// One cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Char {
    /// Text written to the terminal for this cell (may contain trailing
    /// zero-width characters).
    pub text: Rc<str>,
    /// Style string.
    pub style: Rc<str>,
    /// Cells this text occupies: 1 or 2, or 0 for a placeholder.
    pub width: usize,
}

impl Default for Char {
    fn default() -> Self {
        Self::blank(empty_style())
    }
}

impl Char {
    /// A cell for `c`, translating control characters.
    pub fn new(c: char, style: &Rc<str>) -> Self {
        if let Some(display) = caret_notation(c) {
            let style = if style.is_empty() {
                Rc::from("class:control-character")
            } else {
                Rc::from(format!("{style} class:control-character"))
            };
            let width = str_width(&display);
            return Self {
                text: Rc::from(display),
                style,
                width,
            };
        }
        Self {
            text: intern(c),
            style: Rc::clone(style),
            width: char_width(c),
        }
    }

    /// A space with the given style.
    pub fn blank(style: Rc<str>) -> Self {
        Self {
            text: intern(' '),
            style,
            width: 1,
        }
    }

    /// The cell covered by the right half of a wide character.
    pub fn placeholder() -> Self {
        Self {
            text: Rc::from(""),
            style: empty_style(),
            width: 0,
        }
    }

    /// Returns true for the right half of a wide character.
    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.width == 0
    }

    /// Appends a zero-width character (a combining mark) to this cell.
    pub fn push_zero_width(&mut self, c: char) {
        let mut text = self.text.to_string();
        text.push(c);
        self.text = Rc::from(text);
    }

    /// The same text with another style.
    pub fn with_style(&self, style: Rc<str>) -> Self {
        Self {
            text: Rc::clone(&self.text),
            style,
            width: self.width,
        }
    }
}

/// Caret notation for control characters, `None` for everything else.
pub fn caret_notation(c: char) -> Option<String> {
    match c as u32 {
        0x00..=0x1f => Some(format!("^{}", ((c as u8) + b'@') as char)),
        0x7f => Some("^?".to_string()),
        0x80..=0x9f => Some(format!("<{:x}>", c as u32)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        let style: Rc<str> = Rc::from("class:x");
        assert_eq!(Char::new('a', &style).width, 1);
        assert_eq!(Char::new('漢', &style).width, 2);
        assert_eq!(Char::new('\u{301}', &style).width, 0);
        assert!(Char::placeholder().is_placeholder());
    }

    #[test]
    fn test_control_characters() {
        let c = Char::new('\x01', &empty_style());
        assert_eq!(&*c.text, "^A");
        assert_eq!(c.width, 2);
        assert_eq!(&*c.style, "class:control-character");
        assert_eq!(caret_notation('\x7f').as_deref(), Some("^?"));
        assert_eq!(caret_notation('a'), None);
    }

    #[test]
    fn test_zero_width_attach() {
        let mut c = Char::new('e', &empty_style());
        c.push_zero_width('\u{301}');
        assert_eq!(&*c.text, "e\u{301}");
        assert_eq!(c.width, 1);
    }
}
