//! The immutable text value edited by a [`Buffer`](crate::buffer::Buffer).
//!
//! A [`Document`] is text plus a cursor position and an optional selection.
//! Every position is a character index (not a byte offset); relative
//! positions returned by the `find_*` and `get_*_position` methods are
//! signed character offsets from the cursor.
//!
//! Documents are cheap to clone: the text is shared, and so is the lazily
//! computed line index when only the cursor moves.

use crate::clipboard::ClipboardData;
use crate::selection::{SelectionState, SelectionType};
use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LineIndex {
    starts: OnceCell<Vec<usize>>,
    char_len: OnceCell<usize>,
}

/// Text, cursor and selection.
#[derive(Clone)]
pub struct Document {
    text: Arc<str>,
    cursor_position: usize,
    cursor_byte: usize,
    selection: Option<SelectionState>,
    index: Arc<LineIndex>,
}

/// Options for [`Document::find`] and [`Document::find_backwards`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Only search the current line.
    pub in_current_line: bool,
    /// Allow a match starting at the cursor (forward search only).
    pub include_current_position: bool,
    /// Match case-insensitively.
    pub ignore_case: bool,
    /// Return the n-th match.
    pub count: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            in_current_line: false,
            include_current_position: false,
            ignore_case: false,
            count: 1,
        }
    }
}

impl FindOptions {
    /// Sets `in_current_line`.
    pub fn in_current_line(mut self, value: bool) -> Self {
        self.in_current_line = value;
        self
    }

    /// Sets `include_current_position`.
    pub fn include_current_position(mut self, value: bool) -> Self {
        self.include_current_position = value;
        self
    }

    /// Sets `ignore_case`.
    pub fn ignore_case(mut self, value: bool) -> Self {
        self.ignore_case = value;
        self
    }

    /// Sets `count`.
    pub fn count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }
}

/// Byte offset of the `index`-th character, or the length of `s`.
pub(crate) fn char_to_byte(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map_or(s.len(), |(b, _)| b)
}

/// Characters in `s`.
#[inline]
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice of `s` between two character indices.
pub(crate) fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let start = char_to_byte(s, from);
    let end = start + char_to_byte(&s[start..], to.saturating_sub(from));
    &s[start..end]
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    s.char_indices()
        .rev()
        .nth(n - 1)
        .map_or(s, |(b, _)| &s[b..])
}

/// Moves a character index by a signed offset, clamping at zero.
#[inline]
pub fn offset_position(position: usize, delta: isize) -> usize {
    position.checked_add_signed(delta).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punct,
}

fn classify(c: char, big_word: bool) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if big_word || c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// Runs of same-class, non-space characters as `(start, end)` pairs.
///
/// With `big_word`, a word is any run of non-whitespace; otherwise
/// alphanumeric runs and punctuation runs are separate words.
fn word_spans(chars: impl Iterator<Item = char>, big_word: bool) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, CharClass)> = None;
    let mut len = 0;
    for (i, c) in chars.enumerate() {
        let class = classify(c, big_word);
        match current {
            Some((start, cls)) if cls != class => {
                spans.push((start, i));
                current = (class != CharClass::Space).then_some((i, class));
            }
            None if class != CharClass::Space => current = Some((i, class)),
            _ => {}
        }
        len = i + 1;
    }
    if let Some((start, _)) = current {
        spans.push((start, len));
    }
    spans
}

/// Length of the word starting at the first character, plus following
/// whitespace when `include_whitespace` is set. Zero if the text starts
/// with whitespace.
fn leading_word_len(chars: &[char], big_word: bool, include_whitespace: bool) -> usize {
    let Some(&first) = chars.first() else {
        return 0;
    };
    let class = classify(first, big_word);
    if class == CharClass::Space {
        return 0;
    }
    let mut n = chars
        .iter()
        .take_while(|c| classify(**c, big_word) == class)
        .count();
    if include_whitespace {
        n += chars[n..].iter().take_while(|c| c.is_whitespace()).count();
    }
    n
}

fn literal_regex(sub: &str, ignore_case: bool) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(sub))
        .case_insensitive(ignore_case)
        .build()
        .ok()
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
            && self.cursor_position == other.cursor_position
            && self.selection == other.selection
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("text", &self.text)
            .field("cursor_position", &self.cursor_position)
            .field("selection", &self.selection)
            .finish()
    }
}

impl Document {
    /// A document with the cursor at the end of `text`.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let len = char_len(&text);
        Self::build(text, len, None)
    }

    /// A document with the cursor at `cursor_position`, clamped to the text.
    pub fn with_cursor(text: impl Into<Arc<str>>, cursor_position: usize) -> Self {
        Self::build(text.into(), cursor_position, None)
    }

    fn build(text: Arc<str>, cursor_position: usize, index: Option<Arc<LineIndex>>) -> Self {
        let cursor_byte = char_to_byte(&text, cursor_position);
        let cursor_position = if cursor_byte == text.len() {
            char_len(&text)
        } else {
            cursor_position
        };
        Self {
            text,
            cursor_position,
            cursor_byte,
            selection: None,
            index: index.unwrap_or_default(),
        }
    }

    /// The same text with the cursor moved; shares the line index.
    pub fn with_cursor_position(&self, cursor_position: usize) -> Self {
        let mut doc = Self::build(
            Arc::clone(&self.text),
            cursor_position,
            Some(Arc::clone(&self.index)),
        );
        doc.selection = self.selection;
        doc
    }

    /// The same document with another selection.
    pub fn with_selection(mut self, selection: Option<SelectionState>) -> Self {
        self.selection = selection;
        self
    }

    /// The whole text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the text.
    #[inline]
    pub fn text_arc(&self) -> &Arc<str> {
        &self.text
    }

    /// Cursor position as a character index.
    #[inline]
    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    /// The active selection.
    #[inline]
    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        *self.index.char_len.get_or_init(|| char_len(&self.text))
    }

    /// Returns true if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The character under the cursor.
    pub fn current_char(&self) -> Option<char> {
        self.text_after_cursor().chars().next()
    }

    /// The character left of the cursor.
    pub fn char_before_cursor(&self) -> Option<char> {
        self.text_before_cursor().chars().next_back()
    }

    /// Text left of the cursor.
    #[inline]
    pub fn text_before_cursor(&self) -> &str {
        &self.text[..self.cursor_byte]
    }

    /// Text right of the cursor.
    #[inline]
    pub fn text_after_cursor(&self) -> &str {
        &self.text[self.cursor_byte..]
    }

    /// Text of the current line left of the cursor.
    pub fn current_line_before_cursor(&self) -> &str {
        let before = self.text_before_cursor();
        before.rfind('\n').map_or(before, |i| &before[i + 1..])
    }

    /// Text of the current line right of the cursor.
    pub fn current_line_after_cursor(&self) -> &str {
        let after = self.text_after_cursor();
        after.find('\n').map_or(after, |i| &after[..i])
    }

    /// The line the cursor is on.
    pub fn current_line(&self) -> &str {
        let before = self.text_before_cursor();
        let start = before.rfind('\n').map_or(0, |i| i + 1);
        let end = self.cursor_byte + self.current_line_after_cursor().len();
        &self.text[start..end]
    }

    /// All lines; a trailing newline yields a final empty line.
    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }

    /// Number of lines (at least one).
    pub fn line_count(&self) -> usize {
        self.line_starts().len()
    }

    /// Lines from `row` to the end.
    pub fn lines_from(&self, row: usize) -> Vec<&str> {
        self.text.split('\n').skip(row).collect()
    }

    /// The whitespace at the start of the current line.
    pub fn leading_whitespace_in_current_line(&self) -> &str {
        let line = self.current_line();
        &line[..line.len() - line.trim_start().len()]
    }

    fn line_starts(&self) -> &[usize] {
        self.index.starts.get_or_init(|| {
            let mut starts = vec![0];
            starts.extend(
                self.text
                    .chars()
                    .enumerate()
                    .filter(|(_, c)| *c == '\n')
                    .map(|(i, _)| i + 1),
            );
            starts
        })
    }

    fn line_len(&self, row: usize) -> usize {
        let starts = self.line_starts();
        match starts.get(row + 1) {
            Some(next) => next - 1 - starts[row],
            None => self.len() - starts[row],
        }
    }

    /// Row of the cursor.
    pub fn cursor_position_row(&self) -> usize {
        self.translate_index_to_position(self.cursor_position).0
    }

    /// Column of the cursor, in characters.
    pub fn cursor_position_col(&self) -> usize {
        self.current_line_before_cursor().chars().count()
    }

    /// `(row, col)` of a character index.
    pub fn translate_index_to_position(&self, index: usize) -> (usize, usize) {
        let starts = self.line_starts();
        let row = match starts.binary_search(&index) {
            Ok(row) => row,
            Err(row) => row.saturating_sub(1),
        };
        (row, index - starts[row])
    }

    /// Character index of `(row, col)`, clamped to the text.
    pub fn translate_row_col_to_index(&self, row: usize, col: usize) -> usize {
        let starts = self.line_starts();
        let row = row.min(starts.len() - 1);
        let index = starts[row] + col.min(self.line_len(row));
        index.min(self.len())
    }

    /// Returns true if the cursor is at the end of the text.
    pub fn is_cursor_at_the_end(&self) -> bool {
        self.cursor_byte == self.text.len()
    }

    /// Returns true if the cursor is at the end of its line.
    pub fn is_cursor_at_the_end_of_line(&self) -> bool {
        self.current_line_after_cursor().is_empty()
    }

    /// Returns true if the cursor is on the first line.
    pub fn on_first_line(&self) -> bool {
        !self.text_before_cursor().contains('\n')
    }

    /// Returns true if the cursor is on the last line.
    pub fn on_last_line(&self) -> bool {
        !self.text_after_cursor().contains('\n')
    }

    /// Number of empty lines at the end of the text.
    pub fn empty_line_count_at_the_end(&self) -> usize {
        self.text
            .split('\n')
            .rev()
            .take_while(|line| line.trim().is_empty())
            .count()
    }

    // Searching

    /// Finds `sub` right of the cursor. Returns the offset of the match
    /// relative to the cursor.
    pub fn find(&self, sub: &str, options: FindOptions) -> Option<isize> {
        let re = literal_regex(sub, options.ignore_case)?;
        self.find_pattern(&re, options)
    }

    /// Like [`Document::find`] with a regular expression.
    pub fn find_pattern(&self, pattern: &Regex, options: FindOptions) -> Option<isize> {
        let text = if options.in_current_line {
            self.current_line_after_cursor()
        } else {
            self.text_after_cursor()
        };
        let (haystack, skip) = if options.include_current_position {
            (text, 0)
        } else {
            let first = text.chars().next()?;
            (&text[first.len_utf8()..], 1)
        };
        pattern
            .find_iter(haystack)
            .nth(options.count.max(1) - 1)
            .map(|m| (char_len(&haystack[..m.start()]) + skip) as isize)
    }

    /// Finds `sub` left of the cursor. Returns the (negative) offset of the
    /// start of the match relative to the cursor.
    pub fn find_backwards(&self, sub: &str, options: FindOptions) -> Option<isize> {
        let re = literal_regex(sub, options.ignore_case)?;
        self.find_pattern_backwards(&re, options)
    }

    /// Like [`Document::find_backwards`] with a regular expression.
    pub fn find_pattern_backwards(&self, pattern: &Regex, options: FindOptions) -> Option<isize> {
        let before = if options.in_current_line {
            self.current_line_before_cursor()
        } else {
            self.text_before_cursor()
        };
        let matches: Vec<_> = pattern.find_iter(before).collect();
        let m = matches.iter().rev().nth(options.count.max(1) - 1)?;
        Some(-(char_len(&before[m.start()..]) as isize))
    }

    /// Character indices of every occurrence of `sub`.
    pub fn find_all(&self, sub: &str, ignore_case: bool) -> Vec<usize> {
        let Some(re) = literal_regex(sub, ignore_case) else {
            return Vec::new();
        };
        let mut chars = 0;
        let mut last = 0;
        re.find_iter(&self.text)
            .map(|m| {
                chars += char_len(&self.text[last..m.start()]);
                last = m.start();
                chars
            })
            .collect()
    }

    // Words

    fn is_word_before_cursor_complete(&self) -> bool {
        self.char_before_cursor().map_or(true, char::is_whitespace)
    }

    /// The word left of the cursor, or `""` if the cursor follows
    /// whitespace.
    pub fn get_word_before_cursor(&self, big_word: bool) -> &str {
        if self.is_word_before_cursor_complete() {
            return "";
        }
        let start = self.find_start_of_previous_word(1, big_word).unwrap_or(0);
        tail_chars(self.text_before_cursor(), start.unsigned_abs())
    }

    /// The match of `pattern` that ends at the cursor, or `""`.
    pub fn get_word_before_cursor_matching(&self, pattern: &Regex) -> &str {
        let before = self.text_before_cursor();
        pattern
            .find_iter(before)
            .filter(|m| m.end() == before.len())
            .last()
            .map_or("", |m| &before[m.start()..])
    }

    /// Start of the word left of the cursor.
    pub fn find_start_of_previous_word(&self, count: usize, big_word: bool) -> Option<isize> {
        let spans = word_spans(self.text_before_cursor().chars().rev(), big_word);
        spans
            .get(count.max(1) - 1)
            .map(|(_, end)| -(*end as isize))
    }

    /// Start of the next word right of the cursor.
    pub fn find_next_word_beginning(&self, count: usize, big_word: bool) -> Option<isize> {
        let spans = word_spans(self.text_after_cursor().chars(), big_word);
        let mut count = count.max(1);
        for (i, (start, _)) in spans.iter().enumerate() {
            // Skip the word the cursor is on.
            if i == 0 && *start == 0 {
                count += 1;
            }
            if i + 1 == count {
                return Some(*start as isize);
            }
        }
        None
    }

    /// End of the next word right of the cursor.
    pub fn find_next_word_ending(
        &self,
        include_current_position: bool,
        count: usize,
        big_word: bool,
    ) -> Option<isize> {
        let chars = self.text_after_cursor().chars();
        let skip = usize::from(!include_current_position);
        let spans = word_spans(chars.skip(skip), big_word);
        spans
            .get(count.max(1) - 1)
            .map(|(_, end)| (end + skip) as isize)
    }

    /// Start of the previous word left of the cursor.
    pub fn find_previous_word_beginning(&self, count: usize, big_word: bool) -> Option<isize> {
        self.find_start_of_previous_word(count, big_word)
    }

    /// End of the previous word left of the cursor.
    pub fn find_previous_word_ending(&self, count: usize, big_word: bool) -> Option<isize> {
        let chars = self
            .text_after_cursor()
            .chars()
            .take(1)
            .chain(self.text_before_cursor().chars().rev());
        let spans = word_spans(chars, big_word);
        let mut count = count.max(1);
        for (i, (start, _)) in spans.iter().enumerate() {
            if i == 0 && *start == 0 {
                count += 1;
            }
            if i + 1 == count {
                return Some(1 - *start as isize);
            }
        }
        None
    }

    /// Relative `(start, end)` of the word around the cursor.
    pub fn find_boundaries_of_current_word(
        &self,
        big_word: bool,
        include_leading_whitespace: bool,
        include_trailing_whitespace: bool,
    ) -> (isize, isize) {
        let before: Vec<char> = self.current_line_before_cursor().chars().rev().collect();
        let after: Vec<char> = self.current_line_after_cursor().chars().collect();
        let mut start = leading_word_len(&before, big_word, include_leading_whitespace);
        let end = leading_word_len(&after, big_word, include_trailing_whitespace);
        if !big_word && start > 0 && end > 0 {
            // Both halves must be the same kind of word.
            if classify(before[0], false) != classify(after[0], false) {
                start = 0;
            }
        }
        (-(start as isize), end as isize)
    }

    /// The word under the cursor.
    pub fn get_word_under_cursor(&self, big_word: bool) -> &str {
        let (start, end) = self.find_boundaries_of_current_word(big_word, false, false);
        let from = offset_position(self.cursor_position, start);
        let to = offset_position(self.cursor_position, end);
        char_slice(&self.text, from, to)
    }

    // Cursor movement

    /// Offset for moving left, staying on the current line.
    pub fn get_cursor_left_position(&self, count: usize) -> isize {
        -(self.cursor_position_col().min(count) as isize)
    }

    /// Offset for moving right, staying on the current line.
    pub fn get_cursor_right_position(&self, count: usize) -> isize {
        char_len(self.current_line_after_cursor()).min(count) as isize
    }

    /// Offset for moving up `count` lines to `preferred_column` (or the
    /// current column).
    pub fn get_cursor_up_position(&self, count: usize, preferred_column: Option<usize>) -> isize {
        let column = preferred_column.unwrap_or_else(|| self.cursor_position_col());
        let row = self.cursor_position_row().saturating_sub(count);
        self.translate_row_col_to_index(row, column) as isize - self.cursor_position as isize
    }

    /// Offset for moving down `count` lines.
    pub fn get_cursor_down_position(&self, count: usize, preferred_column: Option<usize>) -> isize {
        let column = preferred_column.unwrap_or_else(|| self.cursor_position_col());
        let row = self.cursor_position_row() + count;
        self.translate_row_col_to_index(row, column) as isize - self.cursor_position as isize
    }

    /// Offset of the start of the line, or of its first non-blank
    /// character.
    pub fn get_start_of_line_position(&self, after_whitespace: bool) -> isize {
        if after_whitespace {
            let indent = char_len(self.leading_whitespace_in_current_line());
            indent as isize - self.cursor_position_col() as isize
        } else {
            -(self.cursor_position_col() as isize)
        }
    }

    /// Offset of the end of the line.
    pub fn get_end_of_line_position(&self) -> isize {
        char_len(self.current_line_after_cursor()) as isize
    }

    /// Offset of the start of the text.
    pub fn get_start_of_document_position(&self) -> isize {
        -(self.cursor_position as isize)
    }

    /// Offset of the end of the text.
    pub fn get_end_of_document_position(&self) -> isize {
        (self.len() - self.cursor_position) as isize
    }

    fn find_next_matching_line(&self, matches: impl Fn(&str) -> bool, count: usize) -> Option<usize> {
        let mut result = None;
        let mut count = count.max(1);
        for (i, line) in self.lines_from(self.cursor_position_row() + 1).iter().enumerate() {
            if matches(line) {
                result = Some(i + 1);
                count -= 1;
                if count == 0 {
                    break;
                }
            }
        }
        result
    }

    fn find_previous_matching_line(&self, matches: impl Fn(&str) -> bool, count: usize) -> Option<usize> {
        let lines = self.lines();
        let mut result = None;
        let mut count = count.max(1);
        for (i, line) in lines[..self.cursor_position_row()].iter().rev().enumerate() {
            if matches(line) {
                result = Some(i + 1);
                count -= 1;
                if count == 0 {
                    break;
                }
            }
        }
        result
    }

    /// Offset of the start of the paragraph (the line after the previous
    /// blank line, or the blank line itself with `before`).
    pub fn start_of_paragraph(&self, count: usize, before: bool) -> isize {
        let is_blank = |line: &str| line.trim().is_empty();
        match self.find_previous_matching_line(is_blank, count) {
            Some(up) => {
                let add = isize::from(!before);
                (self.get_cursor_up_position(up, Some(0)) + add).min(0)
            }
            None => -(self.cursor_position as isize),
        }
    }

    /// Offset of the end of the paragraph.
    pub fn end_of_paragraph(&self, count: usize, after: bool) -> isize {
        let is_blank = |line: &str| line.trim().is_empty();
        match self.find_next_matching_line(is_blank, count) {
            Some(down) => {
                let add = isize::from(!after);
                (self.get_cursor_down_position(down, Some(0)) - add).max(0)
            }
            None => char_len(self.text_after_cursor()) as isize,
        }
    }

    // Selection

    /// `(from, to)` of the selection, or the cursor twice.
    pub fn selection_range(&self) -> (usize, usize) {
        match self.selection {
            Some(sel) => {
                let a = sel.original_cursor_position.min(self.len());
                (a.min(self.cursor_position), a.max(self.cursor_position))
            }
            None => (self.cursor_position, self.cursor_position),
        }
    }

    /// Character ranges covered by the selection; several for a block
    /// selection.
    pub fn selection_ranges(&self) -> Vec<(usize, usize)> {
        let Some(sel) = self.selection else {
            return Vec::new();
        };
        let (from, to) = self.selection_range();
        match sel.selection_type {
            SelectionType::Block => {
                let (from_row, from_col) = self.translate_index_to_position(from);
                let (to_row, to_col) = self.translate_index_to_position(to);
                let (left, right) = (from_col.min(to_col), from_col.max(to_col));
                (from_row..=to_row)
                    .filter(|row| left <= self.line_len(*row))
                    .map(|row| {
                        (
                            self.translate_row_col_to_index(row, left),
                            self.translate_row_col_to_index(row, right.min(self.line_len(row))),
                        )
                    })
                    .collect()
            }
            SelectionType::Lines => {
                let (from_row, _) = self.translate_index_to_position(from);
                let (to_row, _) = self.translate_index_to_position(to);
                let start = self.line_starts()[from_row];
                let end = self
                    .line_starts()
                    .get(to_row + 1)
                    .copied()
                    .unwrap_or_else(|| self.len());
                vec![(start, end)]
            }
            SelectionType::Characters => vec![(from, to)],
        }
    }

    /// Columns of `row` covered by the selection.
    pub fn selection_range_at_line(&self, row: usize) -> Option<(usize, usize)> {
        let sel = self.selection?;
        if row >= self.line_count() {
            return None;
        }
        let row_start = self.translate_row_col_to_index(row, 0);
        let row_end = row_start + self.line_len(row);
        let (from, to) = self.selection_range();
        let start = row_start.max(from);
        let end = row_end.min(to);
        if start > end {
            return None;
        }
        match sel.selection_type {
            SelectionType::Lines => Some((0, self.line_len(row))),
            SelectionType::Block => {
                let (_, c1) = self.translate_index_to_position(from);
                let (_, c2) = self.translate_index_to_position(to);
                let (left, right) = (c1.min(c2), c1.max(c2));
                if left > self.line_len(row) {
                    return None;
                }
                Some((left, right.min(self.line_len(row))))
            }
            SelectionType::Characters => Some((start - row_start, end - row_start)),
        }
    }

    /// Removes the selected text. Returns the remaining document and the
    /// removed text.
    pub fn cut_selection(&self) -> (Document, ClipboardData) {
        let Some(sel) = self.selection else {
            return (self.clone(), ClipboardData::default());
        };
        let mut cut_parts = Vec::new();
        let mut remaining = String::new();
        let mut new_cursor = self.cursor_position;
        let mut last_to = 0;
        for (i, (from, to)) in self.selection_ranges().into_iter().enumerate() {
            if i == 0 {
                new_cursor = from;
            }
            remaining.push_str(char_slice(&self.text, last_to, from));
            cut_parts.push(char_slice(&self.text, from, to));
            last_to = to;
        }
        remaining.push_str(char_slice(&self.text, last_to, self.len()));
        let mut cut_text = cut_parts.join("\n");
        if sel.selection_type == SelectionType::Lines && cut_text.ends_with('\n') {
            cut_text.pop();
        }
        (
            Document::with_cursor(remaining, new_cursor),
            ClipboardData::with_type(cut_text, sel.selection_type),
        )
    }

    /// Inserts clipboard data `count` times, shaped by its selection type.
    pub fn paste_clipboard_data(&self, data: &ClipboardData, count: usize) -> Document {
        let count = count.max(1);
        match data.selection_type {
            SelectionType::Characters => {
                let inserted = data.text.repeat(count);
                let text = format!(
                    "{}{inserted}{}",
                    self.text_before_cursor(),
                    self.text_after_cursor()
                );
                Document::with_cursor(text, self.cursor_position + char_len(&inserted))
            }
            SelectionType::Lines => {
                let row = self.cursor_position_row();
                let mut lines: Vec<&str> = self.lines();
                let cursor = lines[..=row].iter().map(|l| char_len(l)).sum::<usize>() + row + 1;
                for _ in 0..count {
                    lines.insert(row + 1, &data.text);
                }
                Document::with_cursor(lines.join("\n"), cursor)
            }
            SelectionType::Block => {
                let mut lines: Vec<String> = self.lines().into_iter().map(String::from).collect();
                let start_row = self.cursor_position_row();
                let start_col = self.cursor_position_col();
                for (i, part) in data.text.split('\n').enumerate() {
                    let row = start_row + i;
                    if row >= lines.len() {
                        lines.push(String::new());
                    }
                    let line = &mut lines[row];
                    let len = char_len(line);
                    if len < start_col {
                        line.push_str(&" ".repeat(start_col - len));
                    }
                    let at = char_to_byte(line, start_col);
                    line.insert_str(at, &part.repeat(count));
                }
                Document::with_cursor(lines.join("\n"), self.cursor_position)
            }
        }
    }

    // Editing

    /// Inserts `data` at the cursor, replacing characters up to the end of
    /// the line when `overwrite` is set. The cursor moves past the insert.
    pub fn insert_text(&self, data: &str, overwrite: bool) -> Document {
        let before = self.text_before_cursor();
        let mut after = self.text_after_cursor();
        if overwrite {
            let replaced = char_slice(after, 0, char_len(data));
            let replaced = replaced.find('\n').map_or(replaced, |i| &replaced[..i]);
            after = &after[replaced.len()..];
        }
        Document::with_cursor(
            format!("{before}{data}{after}"),
            self.cursor_position + char_len(data),
        )
    }

    /// Deletes up to `count` characters left of the cursor.
    pub fn delete_before_cursor(&self, count: usize) -> (Document, String) {
        let n = count.min(self.cursor_position);
        if n == 0 {
            return (self.clone(), String::new());
        }
        let before = self.text_before_cursor();
        let deleted = tail_chars(before, n);
        let kept = &before[..before.len() - deleted.len()];
        (
            Document::with_cursor(
                format!("{kept}{}", self.text_after_cursor()),
                self.cursor_position - n,
            ),
            deleted.to_string(),
        )
    }

    /// Deletes up to `count` characters right of the cursor.
    pub fn delete_after_cursor(&self, count: usize) -> (Document, String) {
        let after = self.text_after_cursor();
        let deleted = char_slice(after, 0, count);
        if deleted.is_empty() {
            return (self.clone(), String::new());
        }
        (
            Document::with_cursor(
                format!("{}{}", self.text_before_cursor(), &after[deleted.len()..]),
                self.cursor_position,
            ),
            deleted.to_string(),
        )
    }

    /// Appends text after the document, keeping cursor and selection.
    pub fn insert_after(&self, text: &str) -> Document {
        Document::with_cursor(format!("{}{text}", self.text), self.cursor_position)
            .with_selection(self.selection)
    }

    /// Prepends text, shifting cursor and selection.
    pub fn insert_before(&self, text: &str) -> Document {
        let shift = char_len(text);
        let selection = self.selection.map(|mut s| {
            s.original_cursor_position += shift;
            s
        });
        Document::with_cursor(format!("{text}{}", self.text), self.cursor_position + shift)
            .with_selection(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(text: &str, cursor: usize) -> Document {
        Document::with_cursor(text, cursor)
    }

    #[test]
    fn test_cursor_is_clamped() {
        assert_eq!(doc("abc", 10).cursor_position(), 3);
        assert_eq!(Document::new("héllo").cursor_position(), 5);
    }

    #[test]
    fn test_lines_and_positions() {
        let d = doc("line 1\nline 2\nline 3", 10);
        assert_eq!(d.line_count(), 3);
        assert_eq!(d.current_line(), "line 2");
        assert_eq!(d.current_line_before_cursor(), "lin");
        assert_eq!(d.current_line_after_cursor(), "e 2");
        assert_eq!(d.cursor_position_row(), 1);
        assert_eq!(d.cursor_position_col(), 3);
        assert_eq!(d.translate_index_to_position(14), (2, 0));
        assert_eq!(d.translate_row_col_to_index(2, 100), 20);
        assert_eq!(d.translate_row_col_to_index(9, 2), 16);
        assert!(!d.on_first_line() && !d.on_last_line());
    }

    #[test]
    fn test_multibyte_text() {
        let d = doc("日本語 text", 2);
        assert_eq!(d.text_before_cursor(), "日本");
        assert_eq!(d.current_char(), Some('語'));
        assert_eq!(d.char_before_cursor(), Some('本'));
        let (d2, deleted) = d.delete_before_cursor(1);
        assert_eq!(deleted, "本");
        assert_eq!(d2.text(), "日語 text");
        assert_eq!(d2.cursor_position(), 1);
    }

    #[test]
    fn test_insert_and_overwrite() {
        let d = doc("hello world", 6);
        assert_eq!(d.insert_text("big ", false).text(), "hello big world");
        let over = d.insert_text("WORLD!!", true);
        assert_eq!(over.text(), "hello WORLD!!");
        assert_eq!(over.cursor_position(), 13);
        let d = doc("ab\ncd", 1);
        assert_eq!(d.insert_text("XYZ", true).text(), "aXYZ\ncd");
    }

    #[test]
    fn test_delete_after_cursor() {
        let (d, deleted) = doc("abcdef", 2).delete_after_cursor(2);
        assert_eq!(d.text(), "abef");
        assert_eq!(deleted, "cd");
        let (same, nothing) = doc("ab", 2).delete_after_cursor(1);
        assert_eq!(same.text(), "ab");
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_word_before_cursor() {
        assert_eq!(doc("git com", 7).get_word_before_cursor(false), "com");
        assert_eq!(doc("git ", 4).get_word_before_cursor(false), "");
        assert_eq!(doc("a.b-c", 5).get_word_before_cursor(false), "c");
        assert_eq!(doc("a.b-c", 5).get_word_before_cursor(true), "a.b-c");
        let re = Regex::new(r"[\w.]+").unwrap();
        assert_eq!(doc("x a.b", 5).get_word_before_cursor_matching(&re), "a.b");
    }

    #[test]
    fn test_word_motion() {
        let d = doc("foo bar.baz qux", 0);
        assert_eq!(d.find_next_word_beginning(1, false), Some(4));
        assert_eq!(d.find_next_word_beginning(2, false), Some(7));
        assert_eq!(d.find_next_word_beginning(2, true), Some(12));
        assert_eq!(d.find_next_word_ending(false, 1, false), Some(3));
        let d = doc("foo bar.baz qux", 15);
        assert_eq!(d.find_previous_word_beginning(1, false), Some(-3));
        assert_eq!(d.find_start_of_previous_word(2, true), Some(-11));
        let d = doc("foo bar", 5);
        assert_eq!(d.find_previous_word_ending(1, false), Some(-2));
    }

    #[test]
    fn test_word_under_cursor() {
        let d = doc("say hello world", 6);
        assert_eq!(d.get_word_under_cursor(false), "hello");
        assert_eq!(d.find_boundaries_of_current_word(false, false, true), (-2, 4));
        let d = doc("abc.def", 3);
        assert_eq!(d.find_boundaries_of_current_word(false, false, false), (0, 1));
    }

    #[test]
    fn test_find() {
        let d = doc("one two one two", 0);
        assert_eq!(d.find("two", FindOptions::default()), Some(4));
        assert_eq!(d.find("two", FindOptions::default().count(2)), Some(12));
        assert_eq!(d.find("one", FindOptions::default()), Some(8));
        assert_eq!(
            d.find("one", FindOptions::default().include_current_position(true)),
            Some(0)
        );
        assert_eq!(d.find("ONE", FindOptions::default().ignore_case(true)), Some(8));
        let d = doc("one two one two", 15);
        assert_eq!(d.find_backwards("one", FindOptions::default()), Some(-7));
        assert_eq!(d.find_backwards("one", FindOptions::default().count(2)), Some(-15));
        assert_eq!(d.find_all("two", false), vec![4, 12]);
    }

    #[test]
    fn test_vertical_motion() {
        let d = doc("long line\nab\nanother", 7);
        assert_eq!(d.get_cursor_down_position(1, None), 5);
        let down = d.with_cursor_position(12);
        assert_eq!(down.get_cursor_down_position(1, Some(7)), 8);
        assert_eq!(down.get_cursor_up_position(1, Some(7)), -5);
        assert_eq!(d.get_cursor_left_position(100), -7);
        assert_eq!(d.get_cursor_right_position(100), 2);
    }

    #[test]
    fn test_start_and_end_of_line() {
        let d = doc("    indented", 8);
        assert_eq!(d.get_start_of_line_position(true), -4);
        assert_eq!(d.get_start_of_line_position(false), -8);
        assert_eq!(d.get_end_of_line_position(), 4);
    }

    #[test]
    fn test_paragraphs() {
        let d = doc("a\nb\n\nc\nd", 7);
        assert_eq!(d.start_of_paragraph(1, false), -2);
        let d = doc("a\nb\n\nc\nd", 0);
        assert_eq!(d.end_of_paragraph(1, false), 3);
    }

    #[test]
    fn test_selection_and_cut() {
        let d = doc("hello world", 8)
            .with_selection(Some(SelectionState::new(2, SelectionType::Characters)));
        assert_eq!(d.selection_range(), (2, 8));
        let (rest, data) = d.cut_selection();
        assert_eq!(data.text, "llo wo");
        assert_eq!(rest.text(), "herld");
        assert_eq!(rest.cursor_position(), 2);
    }

    #[test]
    fn test_line_selection_cut() {
        let d = doc("one\ntwo\nthree", 5)
            .with_selection(Some(SelectionState::new(4, SelectionType::Lines)));
        assert_eq!(d.selection_range_at_line(1), Some((0, 3)));
        let (rest, data) = d.cut_selection();
        assert_eq!(data.text, "two");
        assert_eq!(data.selection_type, SelectionType::Lines);
        assert_eq!(rest.text(), "one\nthree");
    }

    #[test]
    fn test_block_selection() {
        let d = doc("abcd\nefgh\nijkl", 12)
            .with_selection(Some(SelectionState::new(1, SelectionType::Block)));
        assert_eq!(d.selection_ranges(), vec![(1, 2), (6, 7), (11, 12)]);
        let (rest, data) = d.cut_selection();
        assert_eq!(data.text, "b\nf\nj");
        assert_eq!(rest.text(), "acd\negh\nikl");
    }

    #[test]
    fn test_paste_modes() {
        let d = doc("ab\ncd", 1);
        let chars = d.paste_clipboard_data(&ClipboardData::new("XY"), 2);
        assert_eq!(chars.text(), "aXYXYb\ncd");
        assert_eq!(chars.cursor_position(), 5);
        let lines = d.paste_clipboard_data(&ClipboardData::with_type("new", SelectionType::Lines), 1);
        assert_eq!(lines.text(), "ab\nnew\ncd");
        assert_eq!(lines.cursor_position(), 3);
        let block = d.paste_clipboard_data(&ClipboardData::with_type("1\n2\n3", SelectionType::Block), 1);
        assert_eq!(block.text(), "a1b\nc2d\n 3");
    }

    #[test]
    fn test_empty_lines_at_end() {
        assert_eq!(doc("a\n\n\n", 0).empty_line_count_at_the_end(), 3);
        assert_eq!(doc("a", 0).empty_line_count_at_the_end(), 0);
    }

    #[test]
    fn test_insert_before_shifts_selection() {
        let d = doc("world", 2).with_selection(Some(SelectionState::new(1, SelectionType::Characters)));
        let d2 = d.insert_before("hi ");
        assert_eq!(d2.cursor_position(), 5);
        assert_eq!(d2.selection().unwrap().original_cursor_position, 4);
    }
}
