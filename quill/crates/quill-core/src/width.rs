//! Cell widths of characters and strings.
//!
//! East-asian wide characters take two cells, combining marks and other
//! zero-width characters take none. Control characters are reported as zero
//! wide; renderers display them through their own caret notation.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Number of cells `c` occupies.
#[inline]
pub fn char_width(c: char) -> usize {
    if c.is_ascii() {
        return usize::from(!c.is_ascii_control());
    }
    c.width().unwrap_or(0)
}

/// Returns true for characters that attach to the previous cell.
#[inline]
pub fn is_zero_width(c: char) -> bool {
    !c.is_control() && char_width(c) == 0
}

/// Number of cells `s` occupies.
pub fn str_width(s: &str) -> usize {
    if s.is_ascii() {
        return s.bytes().filter(|b| !b.is_ascii_control()).count();
    }
    s.chars().map(char_width).sum()
}

/// Longest prefix of `s` that fits in `max_width` cells, cut on grapheme
/// boundaries so combining sequences stay intact.
pub fn truncate_to_width(s: &str, max_width: usize) -> &str {
    let mut used = 0;
    for (offset, grapheme) in s.grapheme_indices(true) {
        let w = str_width(grapheme);
        if used + w > max_width {
            return &s[..offset];
        }
        used += w;
    }
    s
}

/// Pads `s` with spaces on the right up to `width` cells.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let current = str_width(s);
    let mut out = String::with_capacity(s.len() + width.saturating_sub(current));
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(current)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_and_control() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('\x1b'), 0);
        assert_eq!(str_width("hello"), 5);
        assert_eq!(str_width("a\tb"), 2);
    }

    #[test]
    fn test_wide_and_zero_width() {
        assert_eq!(char_width('漢'), 2);
        assert_eq!(str_width("漢字"), 4);
        assert_eq!(char_width('\u{0301}'), 0);
        assert!(is_zero_width('\u{0301}'));
        assert!(!is_zero_width('a'));
        assert_eq!(str_width("e\u{0301}"), 1);
    }

    #[test]
    fn test_truncate_keeps_graphemes() {
        assert_eq!(truncate_to_width("hello", 3), "hel");
        assert_eq!(truncate_to_width("漢字", 3), "漢");
        assert_eq!(truncate_to_width("e\u{0301}x", 1), "e\u{0301}");
        assert_eq!(truncate_to_width("ab", 10), "ab");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad_to_width("ab", 4), "ab  ");
        assert_eq!(pad_to_width("漢", 4), "漢  ");
        assert_eq!(pad_to_width("abcdef", 2), "abcdef");
    }
}
