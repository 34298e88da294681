//! Completion values, the [`Completer`] trait and generic wrappers.

use crate::document::{char_len, char_slice, Document};
use quill_core::formatted_text::FormattedText;
use std::fmt;
use std::sync::Arc;

/// A candidate replacement for the text left of the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Text inserted when the completion is applied.
    pub text: String,
    /// How many characters left of the cursor are replaced, as a
    /// non-positive offset.
    pub start_position: isize,
    /// What the menu shows; defaults to `text`.
    pub display: FormattedText,
    /// Extra information shown next to the completion.
    pub display_meta: FormattedText,
    /// Style of the menu row.
    pub style: String,
    /// Style of the menu row while selected.
    pub selected_style: String,
}

impl Completion {
    /// A completion replacing `-start_position` characters with `text`.
    /// Positive start positions are clamped to zero.
    pub fn new(text: impl Into<String>, start_position: isize) -> Self {
        let text = text.into();
        Self {
            display: FormattedText::from(text.as_str()),
            text,
            start_position: start_position.min(0),
            display_meta: FormattedText::new(),
            style: String::new(),
            selected_style: String::new(),
        }
    }

    /// Sets what the menu shows.
    pub fn with_display(mut self, display: impl Into<FormattedText>) -> Self {
        self.display = display.into();
        self
    }

    /// Sets the meta text.
    pub fn with_meta(mut self, meta: impl Into<FormattedText>) -> Self {
        self.display_meta = meta.into();
        self
    }

    /// Sets the row style.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Sets the selected row style.
    pub fn with_selected_style(mut self, style: impl Into<String>) -> Self {
        self.selected_style = style.into();
        self
    }

    /// Plain text of [`Completion::display`].
    pub fn display_text(&self) -> String {
        self.display.to_plain_text()
    }

    /// Plain text of [`Completion::display_meta`].
    pub fn display_meta_text(&self) -> String {
        self.display_meta.to_plain_text()
    }

    /// The same completion for a cursor `position` characters further
    /// right, after part of it was inserted.
    pub fn new_completion_from_position(&self, position: usize) -> Self {
        let skip = (position as isize - self.start_position).max(0) as usize;
        let mut c = self.clone();
        c.text = self.text.chars().skip(skip).collect();
        c.start_position = 0;
        c
    }
}

/// Why completions are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompleteEvent {
    /// Completing while typing.
    pub text_inserted: bool,
    /// The user explicitly asked (Tab).
    pub completion_requested: bool,
}

impl CompleteEvent {
    /// Completion triggered by typing.
    pub const fn text_inserted() -> Self {
        Self {
            text_inserted: true,
            completion_requested: false,
        }
    }

    /// Completion explicitly requested.
    pub const fn requested() -> Self {
        Self {
            text_inserted: false,
            completion_requested: true,
        }
    }
}

/// A lazy sequence of completions.
pub type Completions<'a> = Box<dyn Iterator<Item = Completion> + 'a>;

/// Produces completions for a document.
///
/// Implementations must be deterministic: asking twice for the same
/// document yields the same sequence.
pub trait Completer: Send + Sync {
    /// Completions for the text before the cursor.
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a>;

    /// Whether completions should be computed on a worker thread.
    fn runs_in_background(&self) -> bool {
        false
    }
}

/// A completer shared between the buffer and worker threads.
pub type SharedCompleter = Arc<dyn Completer>;

/// Completions collected into an owned iterator.
pub(crate) fn collect<'a>(iter: impl Iterator<Item = Completion>) -> Completions<'a> {
    Box::new(iter.collect::<Vec<_>>().into_iter())
}

/// Returns true if applying `completion` would leave the text unchanged.
pub fn completion_does_nothing(document: &Document, completion: &Completion) -> bool {
    let before = document.text_before_cursor();
    let replaced = completion.start_position.unsigned_abs();
    let len = char_len(before);
    replaced <= len && char_slice(before, len - replaced, len) == completion.text
}

/// The suffix shared by every completion, provided none of them changes
/// the text before the cursor.
pub fn get_common_complete_suffix(document: &Document, completions: &[Completion]) -> String {
    let before = document.text_before_cursor();
    let before_len = char_len(before);
    let unchanged = completions.iter().all(|c| {
        let replaced = c.start_position.unsigned_abs();
        let head: String = c.text.chars().take(replaced).collect();
        replaced <= before_len && char_slice(before, before_len - replaced, before_len) == head
    });
    if !unchanged || completions.is_empty() {
        return String::new();
    }
    let suffixes: Vec<Vec<char>> = completions
        .iter()
        .map(|c| c.text.chars().skip(c.start_position.unsigned_abs()).collect())
        .collect();
    let first = &suffixes[0];
    let common = suffixes[1..].iter().fold(first.len(), |n, s| {
        n.min(first.iter().zip(s).take_while(|(a, b)| a == b).count())
    });
    first[..common].iter().collect()
}

/// Completions being cycled through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionState {
    /// The document when completion started.
    pub original_document: Document,
    /// The candidates.
    pub completions: Vec<Completion>,
    /// The selected candidate, if any.
    pub complete_index: Option<usize>,
}

impl CompletionState {
    /// A state with nothing selected.
    pub fn new(original_document: Document, completions: Vec<Completion>) -> Self {
        Self {
            original_document,
            completions,
            complete_index: None,
        }
    }

    /// Selects a candidate (or none).
    pub fn go_to_index(&mut self, index: Option<usize>) {
        self.complete_index = index.filter(|i| *i < self.completions.len());
    }

    /// The selected candidate.
    pub fn current_completion(&self) -> Option<&Completion> {
        self.complete_index.and_then(|i| self.completions.get(i))
    }

    /// Text and cursor position with the selected candidate applied.
    pub fn new_text_and_position(&self) -> (String, usize) {
        let original = &self.original_document;
        match self.current_completion() {
            None => (original.text().to_string(), original.cursor_position()),
            Some(c) => {
                let before = original.text_before_cursor();
                let len = char_len(before);
                let keep = len.saturating_sub(c.start_position.unsigned_abs());
                let head = char_slice(before, 0, keep);
                let text = format!("{head}{}{}", c.text, original.text_after_cursor());
                (text, keep + char_len(&c.text))
            }
        }
    }
}

/// A completer that never completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyCompleter;

impl Completer for DummyCompleter {
    fn get_completions<'a>(&'a self, _document: &'a Document, _event: &CompleteEvent) -> Completions<'a> {
        Box::new(std::iter::empty())
    }
}

/// Runs the wrapped completer on a worker thread.
pub struct ThreadedCompleter {
    inner: SharedCompleter,
}

impl fmt::Debug for ThreadedCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedCompleter").finish_non_exhaustive()
    }
}

impl ThreadedCompleter {
    /// Wraps `inner`.
    pub fn new(inner: impl Completer + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl Completer for ThreadedCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        self.inner.get_completions(document, event)
    }

    fn runs_in_background(&self) -> bool {
        true
    }
}

/// Delegates to whatever completer a closure returns at each call.
pub struct DynamicCompleter {
    get: Box<dyn Fn() -> Option<SharedCompleter> + Send + Sync>,
}

impl fmt::Debug for DynamicCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCompleter").finish_non_exhaustive()
    }
}

impl DynamicCompleter {
    /// Creates the wrapper; `None` completes nothing.
    pub fn new(get: impl Fn() -> Option<SharedCompleter> + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl Completer for DynamicCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        match (self.get)() {
            Some(completer) => collect(completer.get_completions(document, event)),
            None => Box::new(std::iter::empty()),
        }
    }

    fn runs_in_background(&self) -> bool {
        (self.get)().is_some_and(|c| c.runs_in_background())
    }
}

/// Completes only while a condition holds.
pub struct ConditionalCompleter {
    inner: SharedCompleter,
    condition: Box<dyn Fn() -> bool + Send + Sync>,
}

impl fmt::Debug for ConditionalCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalCompleter").finish_non_exhaustive()
    }
}

impl ConditionalCompleter {
    /// Wraps `inner`, enabled while `condition` returns true.
    pub fn new(inner: impl Completer + 'static, condition: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            condition: Box::new(condition),
        }
    }
}

impl Completer for ConditionalCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        if (self.condition)() {
            self.inner.get_completions(document, event)
        } else {
            Box::new(std::iter::empty())
        }
    }

    fn runs_in_background(&self) -> bool {
        self.inner.runs_in_background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_common_suffix() {
        let doc = Document::new("ap");
        let completions = vec![Completion::new("apple", -2), Completion::new("application", -2)];
        assert_eq!(get_common_complete_suffix(&doc, &completions), "pl");
        let diverging = vec![Completion::new("apple", -2), Completion::new("apricot", -2)];
        assert_eq!(get_common_complete_suffix(&doc, &diverging), "");
        let rewriting = vec![Completion::new("Apple", -2), Completion::new("apple", -2)];
        assert_eq!(get_common_complete_suffix(&doc, &rewriting), "");
    }

    #[test]
    fn test_state_applies_selected() {
        let doc = Document::with_cursor("say ap!", 6);
        let mut state = CompletionState::new(
            doc.clone(),
            vec![Completion::new("apple", -2), Completion::new("apricot", -2)],
        );
        assert_eq!(state.new_text_and_position(), ("say ap!".to_string(), 6));
        state.go_to_index(Some(1));
        assert_eq!(state.new_text_and_position(), ("say apricot!".to_string(), 11));
        state.go_to_index(Some(9));
        assert_eq!(state.complete_index, None);
    }

    #[test]
    fn test_new_completion_from_position() {
        let c = Completion::new("apple", -2).with_meta("fruit");
        let shifted = c.new_completion_from_position(2);
        assert_eq!(shifted.text, "e");
        assert_eq!(shifted.start_position, 0);
        assert_eq!(shifted.display_text(), "apple");
        assert_eq!(shifted.display_meta_text(), "fruit");
    }

    #[test]
    fn test_does_nothing() {
        let doc = Document::new("apple");
        assert!(completion_does_nothing(&doc, &Completion::new("apple", -5)));
        assert!(!completion_does_nothing(&doc, &Completion::new("apples", -5)));
    }

    #[test]
    fn test_conditional_and_dynamic() {
        use crate::completion::WordCompleter;
        let doc = Document::new("a");
        let off = ConditionalCompleter::new(WordCompleter::new(["abc"]), || false);
        assert_eq!(off.get_completions(&doc, &CompleteEvent::requested()).count(), 0);
        let dynamic = DynamicCompleter::new(|| Some(Arc::new(WordCompleter::new(["abc"])) as SharedCompleter));
        assert_eq!(dynamic.get_completions(&doc, &CompleteEvent::requested()).count(), 1);
        assert!(!dynamic.runs_in_background());
        assert!(ThreadedCompleter::new(DummyCompleter).runs_in_background());
    }
}
