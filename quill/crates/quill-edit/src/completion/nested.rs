//! Completion for command trees: `show ip interface` and friends.

use super::base::{collect, Completer, CompleteEvent, Completions, SharedCompleter};
use super::word::WordCompleter;
use crate::document::{char_len, Document};
use std::fmt;
use std::sync::Arc;

/// Completes the first word from its keys, then hands the rest of the line
/// to the completer registered for that word.
#[derive(Default)]
pub struct NestedCompleter {
    options: Vec<(String, Option<SharedCompleter>)>,
    ignore_case: bool,
}

impl fmt::Debug for NestedCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedCompleter")
            .field("options", &self.options.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("ignore_case", &self.ignore_case)
            .finish()
    }
}

impl NestedCompleter {
    /// An empty tree; first words match case-insensitively.
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
            ignore_case: true,
        }
    }

    /// Case-insensitive matching of the first word.
    pub fn ignore_case(mut self, value: bool) -> Self {
        self.ignore_case = value;
        self
    }

    /// A word with nothing after it.
    pub fn leaf(mut self, word: impl Into<String>) -> Self {
        self.options.push((word.into(), None));
        self
    }

    /// A word followed by whatever `completer` completes.
    pub fn command(mut self, word: impl Into<String>, completer: impl Completer + 'static) -> Self {
        self.options.push((word.into(), Some(Arc::new(completer))));
        self
    }

    /// A word followed by one of `words`.
    pub fn words(self, word: impl Into<String>, words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let sub = words
            .into_iter()
            .fold(NestedCompleter::new(), |n, w| n.leaf(w));
        self.command(word, sub)
    }

    fn lookup(&self, word: &str) -> Option<&SharedCompleter> {
        self.options
            .iter()
            .find(|(k, _)| k == word)
            .and_then(|(_, c)| c.as_ref())
    }
}

impl Completer for NestedCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        let before = document.text_before_cursor();
        let text = before.trim_start();
        let stripped = char_len(before) - char_len(text);

        if text.contains(' ') {
            let first = text.split_whitespace().next().unwrap_or_default();
            let Some(completer) = self.lookup(first) else {
                return Box::new(std::iter::empty());
            };
            let remaining = text[first.len()..].trim_start();
            let moved = char_len(text) - char_len(remaining) + stripped;
            let sub = Document::with_cursor(remaining, document.cursor_position() - moved);
            collect(completer.get_completions(&sub, event))
        } else {
            let words = WordCompleter::new(self.options.iter().map(|(k, _)| k.clone()))
                .ignore_case(self.ignore_case);
            collect(words.get_completions(document, event))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree() -> NestedCompleter {
        NestedCompleter::new()
            .command(
                "show",
                NestedCompleter::new()
                    .words("ip", ["interface", "route"])
                    .leaf("version"),
            )
            .leaf("exit")
    }

    fn texts(text: &str) -> Vec<String> {
        tree()
            .get_completions(&Document::new(text), &CompleteEvent::requested())
            .map(|c| c.text)
            .collect()
    }

    #[test]
    fn test_first_level() {
        assert_eq!(texts("s"), vec!["show"]);
        assert_eq!(texts("E"), vec!["exit"]);
        assert_eq!(texts(""), vec!["show", "exit"]);
    }

    #[test]
    fn test_descends() {
        assert_eq!(texts("show "), vec!["ip", "version"]);
        assert_eq!(texts("  show   ip r"), vec!["route"]);
        assert!(texts("exit ").is_empty());
        assert!(texts("unknown x").is_empty());
    }
}
