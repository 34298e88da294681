//! In-process input for tests and embedding.
//!
//! ```
//! use quill_input::{Input, PipeInput};
//! use quill_input::keys::Key;
//!
//! let mut input = PipeInput::new();
//! input.send_text("hi\r");
//! let keys: Vec<Key> = input.read_keys().into_iter().map(|k| k.key).collect();
//! assert_eq!(keys, vec![Key::Char('h'), Key::Char('i'), Key::Enter]);
//! ```

use crate::ansi_sequences::serialize_keys;
use crate::error::Result;
use crate::input::{Input, ModeGuard, Waker};
use crate::keys::{Key, KeyPress};
use crate::vt100_parser::Vt100Parser;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct PipeState {
    buffer: String,
    closed: bool,
    waker: Option<Waker>,
}

/// Input fed programmatically.
///
/// Clones share the same stream, so a test can keep one handle to send
/// text while an application reads from another.
pub struct PipeInput {
    shared: Arc<Mutex<PipeState>>,
    parser: Vt100Parser,
}

impl Default for PipeInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipeInput {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            parser: Vt100Parser::new(),
        }
    }
}

impl std::fmt::Debug for PipeInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeInput")
            .field("hash", &self.typeahead_hash())
            .finish_non_exhaustive()
    }
}

impl PipeInput {
    /// Creates an open, empty pipe.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(PipeState::default())),
            parser: Vt100Parser::new(),
        }
    }

    /// Appends terminal input.
    pub fn send_text(&self, text: &str) {
        let waker = {
            let mut state = self.shared.lock();
            state.buffer.push_str(text);
            state.waker.clone()
        };
        if let Some(waker) = waker {
            waker();
        }
    }

    /// Appends raw bytes, replacing invalid UTF-8.
    pub fn send_bytes(&self, bytes: &[u8]) {
        self.send_text(&String::from_utf8_lossy(bytes));
    }

    /// Appends the encoding of each key.
    pub fn send_keys(&self, keys: &[Key]) {
        self.send_text(&serialize_keys(keys));
    }

    /// Marks the end of input.
    pub fn close(&self) {
        let waker = {
            let mut state = self.shared.lock();
            state.closed = true;
            state.waker.clone()
        };
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Input for PipeInput {
    fn fileno(&self) -> Option<i32> {
        None
    }

    fn typeahead_hash(&self) -> String {
        format!("pipe-input-{:p}", Arc::as_ptr(&self.shared))
    }

    fn read_keys(&mut self) -> Vec<KeyPress> {
        let text = std::mem::take(&mut self.shared.lock().buffer);
        let mut keys = Vec::new();
        self.parser.feed(&text, |k| keys.push(k));
        keys
    }

    fn flush_keys(&mut self) -> Vec<KeyPress> {
        let mut keys = Vec::new();
        self.parser.flush(|k| keys.push(k));
        keys
    }

    fn has_pending(&self) -> bool {
        self.parser.has_pending()
    }

    fn attach(&mut self, waker: Waker) -> Result<()> {
        let ready = {
            let mut state = self.shared.lock();
            state.waker = Some(waker.clone());
            !state.buffer.is_empty() || state.closed
        };
        if ready {
            waker();
        }
        Ok(())
    }

    fn detach(&mut self) {
        self.shared.lock().waker = None;
    }

    fn raw_mode(&mut self) -> Result<ModeGuard> {
        Ok(ModeGuard::noop())
    }

    fn cooked_mode(&mut self) -> Result<ModeGuard> {
        Ok(ModeGuard::noop())
    }

    fn closed(&self) -> bool {
        let state = self.shared.lock();
        state.closed && state.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_clones_share_stream() {
        let sender = PipeInput::new();
        let mut reader = sender.clone();
        sender.send_keys(&[Key::Up, Key::Char('x')]);
        let keys: Vec<Key> = reader.read_keys().into_iter().map(|k| k.key).collect();
        assert_eq!(keys, vec![Key::Up, Key::Char('x')]);
        assert_eq!(sender.typeahead_hash(), reader.typeahead_hash());
        assert_ne!(PipeInput::new().typeahead_hash(), reader.typeahead_hash());
    }

    #[test]
    fn test_waker_is_called() {
        let mut input = PipeInput::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        input
            .attach(Arc::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        input.send_text("a");
        input.close();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        input.detach();
        input.send_text("b");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_attach_with_buffered_text_wakes_immediately() {
        let mut input = PipeInput::new();
        input.send_text("x");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        input
            .attach(Arc::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_escape_held_until_flush() {
        let mut input = PipeInput::new();
        input.send_text("\x1b");
        assert!(input.read_keys().is_empty());
        assert!(input.has_pending());
        let keys = input.flush_keys();
        assert_eq!(keys[0].key, Key::Escape);
    }

    #[test]
    fn test_closed_after_drained() {
        let mut input = PipeInput::new();
        input.send_text("z");
        input.close();
        assert!(!input.closed());
        input.read_keys();
        assert!(input.closed());
    }
}
