//! Completers built from other completers.

use super::base::{completion_does_nothing, Completer, CompleteEvent, Completions, SharedCompleter};
use crate::document::{char_len, char_slice, Document};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Drops completions that would produce a text already produced by an
/// earlier completion, or that would not change the text at all.
pub struct DeduplicateCompleter {
    inner: SharedCompleter,
}

impl fmt::Debug for DeduplicateCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeduplicateCompleter").finish_non_exhaustive()
    }
}

impl DeduplicateCompleter {
    /// Wraps `inner`.
    pub fn new(inner: impl Completer + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Wraps an already shared completer.
    pub fn from_shared(inner: SharedCompleter) -> Self {
        Self { inner }
    }
}

impl Completer for DeduplicateCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        let mut seen = HashSet::new();
        Box::new(self.inner.get_completions(document, event).filter(move |c| {
            if completion_does_nothing(document, c) {
                return false;
            }
            let before = document.text_before_cursor();
            let len = char_len(before);
            let keep = len.saturating_sub(c.start_position.unsigned_abs());
            let applied = format!("{}{}{}", char_slice(before, 0, keep), c.text, document.text_after_cursor());
            seen.insert(applied)
        }))
    }

    fn runs_in_background(&self) -> bool {
        self.inner.runs_in_background()
    }
}

/// The union of several completers. Results are interleaved: the first
/// completion of each child, then the second of each, and so on.
pub struct MergedCompleter {
    completers: Vec<SharedCompleter>,
}

impl fmt::Debug for MergedCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedCompleter")
            .field("completers", &self.completers.len())
            .finish()
    }
}

impl MergedCompleter {
    /// Merges `completers`.
    pub fn new(completers: Vec<SharedCompleter>) -> Self {
        Self { completers }
    }
}

impl Completer for MergedCompleter {
    fn get_completions<'a>(&'a self, document: &'a Document, event: &CompleteEvent) -> Completions<'a> {
        let mut iters: Vec<Completions<'a>> = self
            .completers
            .iter()
            .map(|c| c.get_completions(document, event))
            .collect();
        let mut next = 0;
        Box::new(std::iter::from_fn(move || {
            while !iters.is_empty() {
                next %= iters.len();
                if let Some(c) = iters[next].next() {
                    next += 1;
                    return Some(c);
                }
                drop(iters.remove(next));
            }
            None
        }))
    }

    fn runs_in_background(&self) -> bool {
        self.completers.iter().any(|c| c.runs_in_background())
    }
}

/// Merges `completers`, optionally deduplicating the result.
pub fn merge_completers(completers: Vec<SharedCompleter>, deduplicate: bool) -> SharedCompleter {
    let merged = MergedCompleter::new(completers);
    if deduplicate {
        Arc::new(DeduplicateCompleter::new(merged))
    } else {
        Arc::new(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::WordCompleter;
    use pretty_assertions::assert_eq;

    fn words(list: &[&str]) -> SharedCompleter {
        Arc::new(WordCompleter::new(list.iter().copied()))
    }

    fn texts(completer: &dyn Completer, text: &str) -> Vec<String> {
        let doc = Document::new(text);
        completer
            .get_completions(&doc, &CompleteEvent::requested())
            .map(|c| c.text)
            .collect()
    }

    #[test]
    fn test_merge_interleaves() {
        let merged = merge_completers(vec![words(&["a1", "a2", "a3"]), words(&["ab"])], false);
        assert_eq!(texts(merged.as_ref(), "a"), vec!["a1", "ab", "a2", "a3"]);
    }

    #[test]
    fn test_deduplicate() {
        let merged = merge_completers(vec![words(&["apple", "ap"]), words(&["apple", "apricot"])], true);
        assert_eq!(texts(merged.as_ref(), "ap"), vec!["apple", "apricot"]);
    }

    #[test]
    fn test_deterministic() {
        let merged = merge_completers(vec![words(&["x", "xy"]), words(&["xz"])], true);
        assert_eq!(texts(merged.as_ref(), "x"), texts(merged.as_ref(), "x"));
    }
}
