//! Fuzzy matching on top of another completer.
//!
//! Scoring uses `nucleo-matcher`; matched characters are highlighted with
//! the `fuzzymatch.inside.character` class in the menu.

use super::base::{Completer, CompleteEvent, Completion, Completions, SharedCompleter};
use super::word::WordCompleter;
use crate::document::{char_len, char_slice, Document};
use nucleo_matcher::{
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};
use once_cell::sync::Lazy;
use quill_core::formatted_text::{Fragment, FormattedText};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z0-9_]+|[^a-zA-Z0-9_\s]+)").expect("Invalid word regex"));

/// Re-ranks the completions of an inner completer by fuzzy match against
/// the word before the cursor.
pub struct FuzzyCompleter {
    inner: SharedCompleter,
    big_word: bool,
    pattern: Option<Regex>,
    enable_fuzzy: Box<dyn Fn() -> bool + Send + Sync>,
}

impl fmt::Debug for FuzzyCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuzzyCompleter")
            .field("big_word", &self.big_word)
            .finish_non_exhaustive()
    }
}

struct FuzzyMatch {
    score: u32,
    indices: Vec<usize>,
    completion: Completion,
}

impl FuzzyCompleter {
    /// Wraps `inner`.
    pub fn new(inner: impl Completer + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            big_word: false,
            pattern: None,
            enable_fuzzy: Box::new(|| true),
        }
    }

    /// Treat everything up to whitespace as the word.
    pub fn big_word(mut self, value: bool) -> Self {
        self.big_word = value;
        self
    }

    /// Pattern extracting the word before the cursor.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Fuzzy matching is used only while `enabled` returns true; otherwise
    /// the inner completer is used as is.
    pub fn enable_fuzzy(mut self, enabled: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.enable_fuzzy = Box::new(enabled);
        self
    }

    fn word_before_cursor<'d>(&self, document: &'d Document) -> &'d str {
        if self.big_word {
            document.get_word_before_cursor(true)
        } else {
            document.get_word_before_cursor_matching(self.pattern.as_ref().unwrap_or(&*WORD_PATTERN))
        }
    }

    fn fuzzy_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        let word = self.word_before_cursor(document);
        let word_len = char_len(word);
        let cursor = document.cursor_position() - word_len;
        let trimmed = Document::with_cursor(char_slice(document.text(), 0, cursor), cursor);
        let inner: Vec<Completion> = self.inner.get_completions(&trimmed, event).collect();

        let mut matches: Vec<FuzzyMatch> = if word.is_empty() {
            inner
                .into_iter()
                .map(|completion| FuzzyMatch {
                    score: 0,
                    indices: Vec::new(),
                    completion,
                })
                .collect()
        } else {
            let pattern = Pattern::new(word, CaseMatching::Smart, Normalization::Smart, AtomKind::Fuzzy);
            let mut matcher = Matcher::new(Config::DEFAULT);
            let mut buf = Vec::new();
            inner
                .into_iter()
                .filter_map(|completion| {
                    let mut indices = Vec::new();
                    let haystack = Utf32Str::new(&completion.text, &mut buf);
                    let score = pattern.indices(haystack, &mut matcher, &mut indices)?;
                    indices.sort_unstable();
                    indices.dedup();
                    Some(FuzzyMatch {
                        score,
                        indices: indices.into_iter().map(|i| i as usize).collect(),
                        completion,
                    })
                })
                .collect()
        };
        matches.sort_by(|a, b| b.score.cmp(&a.score));

        matches
            .into_iter()
            .map(|m| {
                let display = highlight(&m.completion.text, &m.indices);
                let mut c = m.completion;
                c.start_position -= word_len as isize;
                c.display = display;
                c
            })
            .collect()
    }
}

fn highlight(text: &str, indices: &[usize]) -> FormattedText {
    let mut fragments = Vec::new();
    for (i, ch) in text.chars().enumerate() {
        let style = if indices.binary_search(&i).is_ok() {
            "class:fuzzymatch.inside.character"
        } else {
            "class:fuzzymatch.outside"
        };
        fragments.push(Fragment::new(style, ch.to_string()));
    }
    FormattedText::from_fragments(fragments)
}

impl Completer for FuzzyCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        if (self.enable_fuzzy)() {
            Box::new(self.fuzzy_completions(document, event).into_iter())
        } else {
            self.inner.get_completions(document, event)
        }
    }

    fn runs_in_background(&self) -> bool {
        self.inner.runs_in_background()
    }
}

/// Fuzzy completion over a fixed word list.
#[derive(Debug)]
pub struct FuzzyWordCompleter {
    inner: FuzzyCompleter,
}

impl FuzzyWordCompleter {
    /// Completes from `words`, matching whole whitespace-separated words.
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            inner: FuzzyCompleter::new(WordCompleter::new(words).big_word(true)).big_word(true),
        }
    }

    /// Meta text per word.
    pub fn with_meta(words: impl IntoIterator<Item = impl Into<String>>, meta: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            inner: FuzzyCompleter::new(WordCompleter::new(words).big_word(true).meta_dict(meta)).big_word(true),
        }
    }
}

impl Completer for FuzzyWordCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        self.inner.get_completions(document, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fuzzy_matches_and_ranks() {
        let completer = FuzzyWordCompleter::new(["leopard", "gorilla", "dinosaur", "cat", "bee"]);
        let doc = Document::new("oa");
        let found: Vec<Completion> = completer.get_completions(&doc, &CompleteEvent::requested()).collect();
        let texts: Vec<&str> = found.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"leopard"));
        assert!(texts.contains(&"dinosaur"));
        assert!(!texts.contains(&"cat"));
        assert!(found.iter().all(|c| c.start_position == -2));
    }

    #[test]
    fn test_empty_word_keeps_inner_order() {
        let completer = FuzzyWordCompleter::new(["b", "a"]);
        let doc = Document::new("");
        let texts: Vec<String> = completer
            .get_completions(&doc, &CompleteEvent::requested())
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["b", "a"]);
    }

    #[test]
    fn test_highlight_marks_matched_characters() {
        let ft = highlight("cat", &[0, 2]);
        let styles: Vec<&str> = ft.iter().map(|f| f.style.as_str()).collect();
        assert_eq!(
            styles,
            vec![
                "class:fuzzymatch.inside.character",
                "class:fuzzymatch.outside",
                "class:fuzzymatch.inside.character"
            ]
        );
    }

    #[test]
    fn test_disabled_passes_through() {
        let completer = FuzzyCompleter::new(WordCompleter::new(["apple", "maple"])).enable_fuzzy(|| false);
        let doc = Document::new("ap");
        let texts: Vec<String> = completer
            .get_completions(&doc, &CompleteEvent::requested())
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["apple"]);
    }
}
