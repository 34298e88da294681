//! Fish-style auto-suggestion.
//!
//! A suggestion is text shown greyed-out after the cursor that the user
//! can accept with the right arrow key.

use crate::document::Document;
use crate::history::HistoryStore;
use std::fmt;
use std::sync::Arc;

/// Text proposed for insertion after the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// The suggested text.
    pub text: String,
}

impl Suggestion {
    /// Creates a suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Proposes a suggestion for a document.
pub trait AutoSuggest: Send + Sync {
    /// Returns a suggestion, if any.
    fn get_suggestion(&self, history: &HistoryStore, document: &Document) -> Option<Suggestion>;

    /// Whether suggestions should be computed on a worker thread.
    fn runs_in_background(&self) -> bool {
        false
    }
}

/// An auto-suggester shared between the buffer and worker threads.
pub type SharedAutoSuggest = Arc<dyn AutoSuggest>;

/// Suggests the rest of the most recent history line starting with the
/// current line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoSuggestFromHistory;

impl AutoSuggest for AutoSuggestFromHistory {
    fn get_suggestion(&self, history: &HistoryStore, document: &Document) -> Option<Suggestion> {
        let text = document.text().rsplit('\n').next().unwrap_or_default();
        if text.trim().is_empty() {
            return None;
        }
        let mut found = None;
        history.find_newest(|entry| {
            found = entry
                .lines()
                .rev()
                .find_map(|line| line.strip_prefix(text))
                .map(Suggestion::new);
            found.is_some()
        });
        found
    }
}

/// Runs the wrapped suggester on a worker thread.
pub struct ThreadedAutoSuggest {
    inner: SharedAutoSuggest,
}

impl fmt::Debug for ThreadedAutoSuggest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedAutoSuggest").finish_non_exhaustive()
    }
}

impl ThreadedAutoSuggest {
    /// Wraps `inner`.
    pub fn new(inner: impl AutoSuggest + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl AutoSuggest for ThreadedAutoSuggest {
    fn get_suggestion(&self, history: &HistoryStore, document: &Document) -> Option<Suggestion> {
        self.inner.get_suggestion(history, document)
    }

    fn runs_in_background(&self) -> bool {
        true
    }
}

/// Delegates to whatever suggester a closure returns at each call.
pub struct DynamicAutoSuggest {
    get: Box<dyn Fn() -> Option<SharedAutoSuggest> + Send + Sync>,
}

impl fmt::Debug for DynamicAutoSuggest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicAutoSuggest").finish_non_exhaustive()
    }
}

impl DynamicAutoSuggest {
    /// Creates the wrapper; `None` suggests nothing.
    pub fn new(get: impl Fn() -> Option<SharedAutoSuggest> + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl AutoSuggest for DynamicAutoSuggest {
    fn get_suggestion(&self, history: &HistoryStore, document: &Document) -> Option<Suggestion> {
        (self.get)()?.get_suggestion(history, document)
    }

    fn runs_in_background(&self) -> bool {
        (self.get)().is_some_and(|s| s.runs_in_background())
    }
}

/// Suggests only while a condition holds.
pub struct ConditionalAutoSuggest {
    inner: SharedAutoSuggest,
    condition: Box<dyn Fn() -> bool + Send + Sync>,
}

impl fmt::Debug for ConditionalAutoSuggest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalAutoSuggest").finish_non_exhaustive()
    }
}

impl ConditionalAutoSuggest {
    /// Wraps `inner`, enabled while `condition` returns true.
    pub fn new(inner: impl AutoSuggest + 'static, condition: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            condition: Box::new(condition),
        }
    }
}

impl AutoSuggest for ConditionalAutoSuggest {
    fn get_suggestion(&self, history: &HistoryStore, document: &Document) -> Option<Suggestion> {
        if (self.condition)() {
            self.inner.get_suggestion(history, document)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistory;
    use pretty_assertions::assert_eq;

    fn history() -> HistoryStore {
        let store = HistoryStore::new(InMemoryHistory::with_strings([
            "git commit -m one",
            "git push origin main",
            "cargo build\ngit status",
        ]));
        store.load(|_| {});
        store
    }

    #[test]
    fn test_newest_match_wins() {
        let history = history();
        let s = AutoSuggestFromHistory.get_suggestion(&history, &Document::new("git "));
        assert_eq!(s, Some(Suggestion::new("status")));
        let s = AutoSuggestFromHistory.get_suggestion(&history, &Document::new("git c"));
        assert_eq!(s, Some(Suggestion::new("ommit -m one")));
    }

    #[test]
    fn test_uses_last_line_and_ignores_blank() {
        let history = history();
        let s = AutoSuggestFromHistory.get_suggestion(&history, &Document::new("echo\ncargo"));
        assert_eq!(s, Some(Suggestion::new(" build")));
        assert_eq!(AutoSuggestFromHistory.get_suggestion(&history, &Document::new("  ")), None);
        assert_eq!(AutoSuggestFromHistory.get_suggestion(&history, &Document::new("zzz")), None);
    }

    #[test]
    fn test_wrappers() {
        let history = history();
        let doc = Document::new("git p");
        assert!(ThreadedAutoSuggest::new(AutoSuggestFromHistory).runs_in_background());
        let off = ConditionalAutoSuggest::new(AutoSuggestFromHistory, || false);
        assert_eq!(off.get_suggestion(&history, &doc), None);
        let dynamic = DynamicAutoSuggest::new(|| Some(Arc::new(AutoSuggestFromHistory) as SharedAutoSuggest));
        assert_eq!(dynamic.get_suggestion(&history, &doc), Some(Suggestion::new("ush origin main")));
    }
}
