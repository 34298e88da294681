//! Clipboards and the kill ring.
//!
//! Kill commands (Ctrl-K, Ctrl-W, ...) store what they remove with
//! [`Clipboard::set_data`]; Ctrl-Y pastes [`Clipboard::get_data`] and
//! Alt-Y calls [`Clipboard::rotate`] to cycle to older kills.

use crate::selection::SelectionType;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Default number of kills remembered by [`InMemoryClipboard`].
pub const DEFAULT_KILL_RING_SIZE: usize = 60;

/// Text on the clipboard with the shape of the selection it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardData {
    /// Copied text.
    pub text: String,
    /// How the text was selected; decides how it is pasted.
    pub selection_type: SelectionType,
}

impl ClipboardData {
    /// Character data.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selection_type: SelectionType::Characters,
        }
    }

    /// Data with an explicit selection type.
    pub fn with_type(text: impl Into<String>, selection_type: SelectionType) -> Self {
        Self {
            text: text.into(),
            selection_type,
        }
    }
}

/// Clipboard storage.
pub trait Clipboard {
    /// Stores data, making it the current entry.
    fn set_data(&self, data: ClipboardData);

    /// Returns the current entry.
    fn get_data(&self) -> ClipboardData;

    /// Stores plain text.
    fn set_text(&self, text: &str) {
        self.set_data(ClipboardData::new(text));
    }

    /// Moves to the previous entry of the kill ring, if there is one.
    fn rotate(&self) {}
}

/// In-memory clipboard with a bounded kill ring.
pub struct InMemoryClipboard {
    ring: RefCell<VecDeque<ClipboardData>>,
    max_size: usize,
}

impl Default for InMemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryClipboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryClipboard")
            .field("entries", &self.ring.borrow().len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl InMemoryClipboard {
    /// Creates an empty clipboard remembering [`DEFAULT_KILL_RING_SIZE`] kills.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_KILL_RING_SIZE)
    }

    /// Creates an empty clipboard remembering up to `max_size` kills.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            ring: RefCell::new(VecDeque::new()),
            max_size: max_size.max(1),
        }
    }

    /// Number of remembered kills.
    pub fn len(&self) -> usize {
        self.ring.borrow().len()
    }

    /// Returns true if nothing was ever stored.
    pub fn is_empty(&self) -> bool {
        self.ring.borrow().is_empty()
    }
}

impl Clipboard for InMemoryClipboard {
    fn set_data(&self, data: ClipboardData) {
        let mut ring = self.ring.borrow_mut();
        ring.push_front(data);
        ring.truncate(self.max_size);
    }

    fn get_data(&self) -> ClipboardData {
        self.ring.borrow().front().cloned().unwrap_or_default()
    }

    fn rotate(&self) {
        let mut ring = self.ring.borrow_mut();
        if let Some(front) = ring.pop_front() {
            ring.push_back(front);
        }
    }
}

/// A clipboard that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyClipboard;

impl Clipboard for DummyClipboard {
    fn set_data(&self, _data: ClipboardData) {}

    fn get_data(&self) -> ClipboardData {
        ClipboardData::default()
    }
}

/// A clipboard chosen at each call.
pub struct DynamicClipboard {
    get: Box<dyn Fn() -> Option<Rc<dyn Clipboard>>>,
}

impl fmt::Debug for DynamicClipboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicClipboard").finish_non_exhaustive()
    }
}

impl DynamicClipboard {
    /// Creates a clipboard delegating to whatever `get` returns; `None`
    /// behaves like [`DummyClipboard`].
    pub fn new(get: impl Fn() -> Option<Rc<dyn Clipboard>> + 'static) -> Self {
        Self { get: Box::new(get) }
    }

    fn current(&self) -> Rc<dyn Clipboard> {
        (self.get)().unwrap_or_else(|| Rc::new(DummyClipboard))
    }
}

impl Clipboard for DynamicClipboard {
    fn set_data(&self, data: ClipboardData) {
        self.current().set_data(data);
    }

    fn get_data(&self) -> ClipboardData {
        self.current().get_data()
    }

    fn set_text(&self, text: &str) {
        self.current().set_text(text);
    }

    fn rotate(&self) {
        self.current().rotate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kill_ring_rotation() {
        let clipboard = InMemoryClipboard::new();
        clipboard.set_text("one");
        clipboard.set_text("two");
        clipboard.set_text("three");
        assert_eq!(clipboard.get_data().text, "three");
        clipboard.rotate();
        assert_eq!(clipboard.get_data().text, "two");
        clipboard.rotate();
        assert_eq!(clipboard.get_data().text, "one");
        clipboard.rotate();
        assert_eq!(clipboard.get_data().text, "three");
    }

    #[test]
    fn test_kill_ring_is_bounded() {
        let clipboard = InMemoryClipboard::with_max_size(2);
        for text in ["a", "b", "c"] {
            clipboard.set_text(text);
        }
        assert_eq!(clipboard.len(), 2);
        clipboard.rotate();
        assert_eq!(clipboard.get_data().text, "b");
    }

    #[test]
    fn test_dynamic_clipboard_delegates() {
        let inner: Rc<dyn Clipboard> = Rc::new(InMemoryClipboard::new());
        let shared = Rc::clone(&inner);
        let dynamic = DynamicClipboard::new(move || Some(Rc::clone(&shared)));
        dynamic.set_data(ClipboardData::with_type("line", SelectionType::Lines));
        assert_eq!(inner.get_data().selection_type, SelectionType::Lines);

        let empty = DynamicClipboard::new(|| None);
        empty.set_text("lost");
        assert_eq!(empty.get_data(), ClipboardData::default());
    }
}
