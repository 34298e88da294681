//! Formatted text: lists of `(style, text)` fragments.
//!
//! Fragments whose style contains one of the bracketed markers below carry
//! layout information rather than visible text:
//!
//! - [`SET_CURSOR_POSITION`]: the control's cursor goes at the start of
//!   this fragment
//! - [`SET_MENU_POSITION`]: completion menus anchor here
//! - [`ZERO_WIDTH_ESCAPE`]: raw escape data that takes no cells

use crate::width::str_width;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Marker style: place the cursor at this fragment.
pub const SET_CURSOR_POSITION: &str = "[SetCursorPosition]";
/// Marker style: anchor the menu at this fragment.
pub const SET_MENU_POSITION: &str = "[SetMenuPosition]";
/// Marker style: pass-through escape sequence with zero width.
pub const ZERO_WIDTH_ESCAPE: &str = "[ZeroWidthEscape]";

/// One styled run of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Fragment {
    /// Style string, e.g. `class:prompt bold`.
    pub style: String,
    /// The text. May contain newlines.
    pub text: String,
}

impl Fragment {
    /// Creates a fragment.
    pub fn new(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
        }
    }

    /// Creates an unstyled fragment.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    /// Returns true when the fragment is a zero-width escape.
    #[inline]
    pub fn is_zero_width_escape(&self) -> bool {
        self.style.contains(ZERO_WIDTH_ESCAPE)
    }

    /// Returns true when the fragment carries a cursor or menu marker.
    #[inline]
    pub fn is_position_marker(&self) -> bool {
        self.style.contains(SET_CURSOR_POSITION) || self.style.contains(SET_MENU_POSITION)
    }
}

/// A list of fragments.
///
/// ```
/// use quill_core::formatted_text::FormattedText;
///
/// let text = FormattedText::from(vec![("class:a", "hello "), ("bold", "world")]);
/// assert_eq!(text.to_plain_text(), "hello world");
/// assert_eq!(text.width(), 11);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FormattedText(Vec<Fragment>);

impl FormattedText {
    /// Creates empty formatted text.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Wraps an existing fragment list.
    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self(fragments)
    }

    /// Plain text with one style.
    pub fn styled(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self(vec![Fragment::new(style, text)])
    }

    /// Appends a fragment.
    pub fn push_str(&mut self, style: impl Into<String>, text: impl Into<String>) {
        self.0.push(Fragment::new(style, text));
    }

    /// Unwraps the fragment list.
    pub fn into_fragments(self) -> Vec<Fragment> {
        self.0
    }

    /// Concatenated text without styles.
    pub fn to_plain_text(&self) -> String {
        fragment_list_to_text(&self.0)
    }

    /// Cell width of the text (newlines are not counted specially).
    pub fn width(&self) -> usize {
        fragment_list_width(&self.0)
    }

    /// Number of characters.
    pub fn char_len(&self) -> usize {
        fragment_list_len(&self.0)
    }

    /// Prepends `style` to the style of every fragment.
    pub fn with_style_prefix(self, style: &str) -> Self {
        if style.is_empty() {
            return self;
        }
        Self(
            self.0
                .into_iter()
                .map(|f| {
                    let merged = if f.style.is_empty() {
                        style.to_string()
                    } else {
                        format!("{} {}", style, f.style)
                    };
                    Fragment::new(merged, f.text)
                })
                .collect(),
        )
    }

    /// Splits into lines at `\n`; always returns at least one line.
    pub fn split_lines(&self) -> Vec<Vec<Fragment>> {
        split_lines(&self.0)
    }
}

impl Deref for FormattedText {
    type Target = Vec<Fragment>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for FormattedText {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl IntoIterator for FormattedText {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Fragment> for FormattedText {
    fn from_iter<T: IntoIterator<Item = Fragment>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<&str> for FormattedText {
    fn from(text: &str) -> Self {
        Self(vec![Fragment::plain(text)])
    }
}

impl From<String> for FormattedText {
    fn from(text: String) -> Self {
        Self(vec![Fragment::plain(text)])
    }
}

impl From<Vec<Fragment>> for FormattedText {
    fn from(fragments: Vec<Fragment>) -> Self {
        Self(fragments)
    }
}

impl<S: Into<String>, T: Into<String>> From<Vec<(S, T)>> for FormattedText {
    fn from(pairs: Vec<(S, T)>) -> Self {
        pairs
            .into_iter()
            .map(|(style, text)| Fragment::new(style, text))
            .collect()
    }
}

impl fmt::Display for FormattedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.0 {
            if !fragment.is_zero_width_escape() {
                f.write_str(&fragment.text)?;
            }
        }
        Ok(())
    }
}

/// Concatenated text of visible fragments.
pub fn fragment_list_to_text(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .filter(|f| !f.is_zero_width_escape())
        .map(|f| f.text.as_str())
        .collect()
}

/// Total cell width of visible fragments.
pub fn fragment_list_width(fragments: &[Fragment]) -> usize {
    fragments
        .iter()
        .filter(|f| !f.is_zero_width_escape())
        .map(|f| str_width(&f.text))
        .sum()
}

/// Total character count of visible fragments.
pub fn fragment_list_len(fragments: &[Fragment]) -> usize {
    fragments
        .iter()
        .filter(|f| !f.is_zero_width_escape())
        .map(|f| f.text.chars().count())
        .sum()
}

/// Splits fragments into lines; a trailing newline yields a final empty line.
///
/// Empty parts are dropped except position markers.
pub fn split_lines(fragments: &[Fragment]) -> Vec<Vec<Fragment>> {
    let mut lines = Vec::new();
    let mut line: Vec<Fragment> = Vec::new();
    for fragment in fragments {
        if fragment.is_zero_width_escape() {
            line.push(fragment.clone());
            continue;
        }
        let mut parts = fragment.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() || fragment.is_position_marker() {
                line.push(Fragment::new(fragment.style.clone(), part));
            }
            if parts.peek().is_some() {
                lines.push(std::mem::take(&mut line));
            }
        }
    }
    lines.push(line);
    lines
}

/// Explodes fragments into one fragment per character.
pub fn explode_fragments(fragments: &[Fragment]) -> Vec<Fragment> {
    let mut out = Vec::new();
    for fragment in fragments {
        if fragment.is_zero_width_escape() {
            out.push(fragment.clone());
            continue;
        }
        for c in fragment.text.chars() {
            out.push(Fragment::new(fragment.style.clone(), c.to_string()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_lines() {
        let text = FormattedText::from(vec![("a", "one\ntw"), ("b", "o\n")]);
        let lines = text.split_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], vec![Fragment::new("a", "one")]);
        assert_eq!(
            lines[1],
            vec![Fragment::new("a", "tw"), Fragment::new("b", "o")]
        );
        assert!(lines[2].is_empty());
    }

    #[test]
    fn test_split_lines_keeps_empty_markers() {
        let text = FormattedText::from(vec![
            ("", "a\n"),
            (SET_CURSOR_POSITION, ""),
            ("", ""),
            ("", "b"),
            (SET_MENU_POSITION, ""),
        ]);
        let lines = text.split_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            vec![
                Fragment::new(SET_CURSOR_POSITION, ""),
                Fragment::new("", "b"),
                Fragment::new(SET_MENU_POSITION, ""),
            ]
        );
    }

    #[test]
    fn test_zero_width_escape_is_invisible() {
        let text = FormattedText::from(vec![(ZERO_WIDTH_ESCAPE, "\x1b]0;x\x07"), ("", "ab")]);
        assert_eq!(text.width(), 2);
        assert_eq!(text.to_plain_text(), "ab");
        assert_eq!(text.char_len(), 2);
    }

    #[test]
    fn test_style_prefix() {
        let text = FormattedText::from(vec![("", "a"), ("bold", "b")]).with_style_prefix("class:x");
        assert_eq!(text[0].style, "class:x");
        assert_eq!(text[1].style, "class:x bold");
    }

    #[test]
    fn test_explode() {
        let exploded = explode_fragments(&[Fragment::new("s", "ab")]);
        assert_eq!(exploded, vec![Fragment::new("s", "a"), Fragment::new("s", "b")]);
    }
}
