//! Typeahead storage.
//!
//! When an application exits while key presses are still queued, those keys
//! belong to whatever reads the same input next (usually the next prompt).
//! They are parked here, keyed by [`Input::typeahead_hash`](crate::input::Input::typeahead_hash).

use crate::keys::KeyPress;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;

static BUFFER: Lazy<Mutex<HashMap<String, Vec<KeyPress>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Appends unprocessed key presses for an input.
pub fn store(input_hash: &str, keys: Vec<KeyPress>) {
    if keys.is_empty() {
        return;
    }
    BUFFER
        .lock()
        .entry(input_hash.to_string())
        .or_default()
        .extend(keys);
}

/// Takes the key presses stored for an input.
pub fn take(input_hash: &str) -> Vec<KeyPress> {
    BUFFER.lock().remove(input_hash).unwrap_or_default()
}

/// Drops the key presses stored for an input.
pub fn clear(input_hash: &str) {
    BUFFER.lock().remove(input_hash);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_take() {
        store("typeahead-test", vec![KeyPress::char('a')]);
        store("typeahead-test", vec![KeyPress::char('b')]);
        store("typeahead-test", Vec::new());
        let keys = take("typeahead-test");
        assert_eq!(keys, vec![KeyPress::char('a'), KeyPress::char('b')]);
        assert!(take("typeahead-test").is_empty());
    }

    #[test]
    fn test_clear() {
        store("typeahead-clear", vec![KeyPress::char('x')]);
        clear("typeahead-clear");
        assert!(take("typeahead-clear").is_empty());
    }
}
