//! Completion from a list of words.

use super::base::{Completer, CompleteEvent, Completion, Completions};
use crate::document::{char_len, Document};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

enum Words {
    Fixed(Vec<String>),
    Dynamic(Box<dyn Fn() -> Vec<String> + Send + Sync>),
}

/// Completes the word before the cursor from a word list.
pub struct WordCompleter {
    words: Words,
    ignore_case: bool,
    display_dict: HashMap<String, String>,
    meta_dict: HashMap<String, String>,
    big_word: bool,
    sentence: bool,
    match_middle: bool,
    pattern: Option<Regex>,
}

impl fmt::Debug for WordCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordCompleter")
            .field("ignore_case", &self.ignore_case)
            .field("sentence", &self.sentence)
            .field("match_middle", &self.match_middle)
            .finish_non_exhaustive()
    }
}

impl WordCompleter {
    /// Completes from a fixed list.
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_words(Words::Fixed(words.into_iter().map(Into::into).collect()))
    }

    /// Completes from whatever `words` returns at completion time.
    pub fn dynamic(words: impl Fn() -> Vec<String> + Send + Sync + 'static) -> Self {
        Self::with_words(Words::Dynamic(Box::new(words)))
    }

    fn with_words(words: Words) -> Self {
        Self {
            words,
            ignore_case: false,
            display_dict: HashMap::new(),
            meta_dict: HashMap::new(),
            big_word: false,
            sentence: false,
            match_middle: false,
            pattern: None,
        }
    }

    /// Case-insensitive matching.
    pub fn ignore_case(mut self, value: bool) -> Self {
        self.ignore_case = value;
        self
    }

    /// Menu text per word.
    pub fn display_dict(mut self, dict: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        self.display_dict = dict.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Meta text per word.
    pub fn meta_dict(mut self, dict: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        self.meta_dict = dict.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Treat everything up to whitespace as the word.
    pub fn big_word(mut self, value: bool) -> Self {
        self.big_word = value;
        self
    }

    /// Match against the whole text before the cursor.
    pub fn sentence(mut self, value: bool) -> Self {
        self.sentence = value;
        self
    }

    /// Match anywhere in a word instead of only as a prefix.
    pub fn match_middle(mut self, value: bool) -> Self {
        self.match_middle = value;
        self
    }

    /// Pattern deciding what the word before the cursor is.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    fn word_list(&self) -> Vec<String> {
        match &self.words {
            Words::Fixed(words) => words.clone(),
            Words::Dynamic(get) => get(),
        }
    }
}

impl Completer for WordCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, _event: &CompleteEvent) -> Completions<'a> {
        let before = if self.sentence {
            document.text_before_cursor()
        } else if let Some(pattern) = &self.pattern {
            document.get_word_before_cursor_matching(pattern)
        } else {
            document.get_word_before_cursor(self.big_word)
        };
        let start_position = -(char_len(before) as isize);
        let needle = if self.ignore_case {
            before.to_lowercase()
        } else {
            before.to_string()
        };
        let ignore_case = self.ignore_case;
        let match_middle = self.match_middle;
        let matches = move |word: &str| {
            let word = if ignore_case {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            if match_middle {
                word.contains(&needle)
            } else {
                word.starts_with(&needle)
            }
        };
        Box::new(
            self.word_list()
                .into_iter()
                .filter(move |w| matches(w))
                .map(move |w| {
                    let display = self.display_dict.get(&w).cloned().unwrap_or_else(|| w.clone());
                    let meta = self.meta_dict.get(&w).cloned().unwrap_or_default();
                    Completion::new(w, start_position)
                        .with_display(display)
                        .with_meta(meta)
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(completer: &WordCompleter, doc: &Document) -> Vec<String> {
        completer
            .get_completions(doc, &CompleteEvent::requested())
            .map(|c| c.text)
            .collect()
    }

    #[test]
    fn test_prefix_match() {
        let completer = WordCompleter::new(["apple", "apricot", "banana"]);
        assert_eq!(texts(&completer, &Document::new("ap")), vec!["apple", "apricot"]);
        let first = completer
            .get_completions(&Document::new("eat ap"), &CompleteEvent::requested())
            .next()
            .unwrap();
        assert_eq!(first.start_position, -2);
    }

    #[test]
    fn test_ignore_case_and_middle() {
        let completer = WordCompleter::new(["Apple", "pineapple"]).ignore_case(true);
        assert_eq!(texts(&completer, &Document::new("ap")), vec!["Apple"]);
        let middle = WordCompleter::new(["Apple", "pineapple"]).match_middle(true);
        assert_eq!(texts(&middle, &Document::new("pp")), vec!["Apple", "pineapple"]);
    }

    #[test]
    fn test_sentence_and_meta() {
        let completer = WordCompleter::new(["git commit", "git push"])
            .sentence(true)
            .meta_dict([("git push", "upload")]);
        let all: Vec<Completion> = completer
            .get_completions(&Document::new("git p"), &CompleteEvent::requested())
            .collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].start_position, -5);
        assert_eq!(all[0].display_meta_text(), "upload");
    }

    #[test]
    fn test_dynamic_words() {
        let completer = WordCompleter::dynamic(|| vec!["one".into(), "two".into()]);
        assert_eq!(texts(&completer, &Document::new("")), vec!["one", "two"]);
    }
}
