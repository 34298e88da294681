//! Input history.
//!
//! A [`History`] backend loads and stores strings; a [`HistoryStore`]
//! keeps the loaded strings in memory and is what buffers and
//! auto-suggesters read. Clones of a store share its contents.
//!
//! [`FileHistory`] uses a plain text format compatible with other line
//! editors:
//!
//! ```text
//!
//! # 2024-01-01 12:00:00.000000
//! +first line
//! +second line of the same entry
//! ```

use crate::error::HistoryResult;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A history backend.
pub trait History: Send + Sync {
    /// Loads stored strings, oldest first.
    fn load_history_strings(&self) -> HistoryResult<Vec<String>>;

    /// Persists one new string.
    fn store_string(&self, string: &str) -> HistoryResult<()>;

    /// Whether loading should happen on a background thread.
    fn loads_in_background(&self) -> bool {
        false
    }
}

/// History kept only in memory.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    initial: Vec<String>,
}

impl InMemoryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history pre-filled with `strings`, oldest first.
    pub fn with_strings(strings: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            initial: strings.into_iter().map(Into::into).collect(),
        }
    }
}

impl History for InMemoryHistory {
    fn load_history_strings(&self) -> HistoryResult<Vec<String>> {
        Ok(self.initial.clone())
    }

    fn store_string(&self, _string: &str) -> HistoryResult<()> {
        Ok(())
    }
}

/// History persisted to a file.
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    /// History stored at `path`. A leading `~` is expanded.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: expand_user(path.as_ref()),
        }
    }

    /// The history file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_user(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn parse_history_file(content: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut flush = |lines: &mut Vec<&str>| {
        if !lines.is_empty() {
            entries.push(lines.join("\n"));
            lines.clear();
        }
    };
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix('+') {
            lines.push(rest);
        } else {
            flush(&mut lines);
        }
    }
    flush(&mut lines);
    entries
}

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

impl History for FileHistory {
    fn load_history_strings(&self) -> HistoryResult<Vec<String>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(parse_history_file(&String::from_utf8_lossy(&bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store_string(&self, string: &str) -> HistoryResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut entry = format!("\n# {}\n", timestamp());
        for line in string.split('\n') {
            entry.push('+');
            entry.push_str(line);
            entry.push('\n');
        }
        file.write_all(entry.as_bytes())?;
        Ok(())
    }
}

/// Wraps a backend so that it loads on a background thread.
pub struct ThreadedHistory {
    inner: Box<dyn History>,
}

impl fmt::Debug for ThreadedHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedHistory").finish_non_exhaustive()
    }
}

impl ThreadedHistory {
    /// Wraps `inner`.
    pub fn new(inner: impl History + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl History for ThreadedHistory {
    fn load_history_strings(&self) -> HistoryResult<Vec<String>> {
        self.inner.load_history_strings()
    }

    fn store_string(&self, string: &str) -> HistoryResult<()> {
        self.inner.store_string(string)
    }

    fn loads_in_background(&self) -> bool {
        true
    }
}

struct StoreInner {
    backend: Box<dyn History>,
    strings: Mutex<Vec<String>>,
    loaded: AtomicBool,
    loading: AtomicBool,
}

/// Loaded history strings plus the backend they came from.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("len", &self.len())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(InMemoryHistory::new())
    }
}

impl HistoryStore {
    /// Creates a store over `backend`. Nothing is loaded yet.
    pub fn new(backend: impl History + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend: Box::new(backend),
                strings: Mutex::new(Vec::new()),
                loaded: AtomicBool::new(false),
                loading: AtomicBool::new(false),
            }),
        }
    }

    /// Whether the backend loads on a background thread.
    pub fn loads_in_background(&self) -> bool {
        self.inner.backend.loads_in_background()
    }

    /// Returns true once loading has finished.
    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.load(Ordering::Acquire)
    }

    /// Loads the backend's strings, once. Blocking backends load before
    /// this returns; background backends load on a thread. `on_loaded` is
    /// called with the number of loaded strings when they become available.
    pub fn load(&self, on_loaded: impl FnOnce(usize) + Send + 'static) {
        if self.inner.loading.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.inner.backend.loads_in_background() {
            let store = self.clone();
            let spawned = std::thread::Builder::new()
                .name("quill-history".into())
                .spawn(move || {
                    let n = store.load_now();
                    on_loaded(n);
                });
            if let Err(e) = spawned {
                tracing::warn!("failed to spawn history loader: {e}");
            }
        } else {
            let n = self.load_now();
            on_loaded(n);
        }
    }

    fn load_now(&self) -> usize {
        let loaded = match self.inner.backend.load_history_strings() {
            Ok(strings) => strings,
            Err(e) => {
                tracing::warn!("failed to load history: {e}");
                Vec::new()
            }
        };
        let n = loaded.len();
        {
            let mut strings = self.inner.strings.lock();
            // Strings appended during the load are newer.
            let appended = std::mem::replace(&mut *strings, loaded);
            strings.extend(appended);
        }
        self.inner.loaded.store(true, Ordering::Release);
        n
    }

    /// Adds a string and persists it.
    pub fn append_string(&self, string: &str) {
        self.inner.strings.lock().push(string.to_string());
        if let Err(e) = self.inner.backend.store_string(string) {
            tracing::warn!("failed to store history entry: {e}");
        }
    }

    /// All strings, oldest first.
    pub fn get_strings(&self) -> Vec<String> {
        self.inner.strings.lock().clone()
    }

    /// The most recent string.
    pub fn last(&self) -> Option<String> {
        self.inner.strings.lock().last().cloned()
    }

    /// Number of strings.
    pub fn len(&self) -> usize {
        self.inner.strings.lock().len()
    }

    /// Returns true if there are no strings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the newest string matching `predicate`, searching from the
    /// most recent.
    pub fn find_newest(&self, mut predicate: impl FnMut(&str) -> bool) -> Option<String> {
        self.inner
            .strings
            .lock()
            .iter()
            .rev()
            .find(|s| predicate(s))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_in_memory_history() {
        let store = HistoryStore::new(InMemoryHistory::with_strings(["a", "b"]));
        assert!(store.is_empty());
        store.load(|_| {});
        store.append_string("c");
        assert_eq!(store.get_strings(), vec!["a", "b", "c"]);
        assert_eq!(store.last().as_deref(), Some("c"));
    }

    #[test]
    fn test_file_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let history = FileHistory::new(&path);
        history.store_string("first").unwrap();
        history.store_string("multi\nline").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n+first\n"));
        assert!(content.contains("+multi\n+line\n"));
        assert!(content.lines().any(|l| l.starts_with("# ")));

        let loaded = FileHistory::new(&path).load_history_strings().unwrap();
        assert_eq!(loaded, vec!["first", "multi\nline"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path().join("nope"));
        assert!(history.load_history_strings().unwrap().is_empty());
    }

    #[test]
    fn test_threaded_history_loads_in_background() {
        let store = HistoryStore::new(ThreadedHistory::new(InMemoryHistory::with_strings(["old"])));
        let (tx, rx) = flume::bounded(1);
        store.load(move |n| {
            let _ = tx.send(n);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert!(store.is_loaded());
        assert_eq!(store.get_strings(), vec!["old"]);
    }

    #[test]
    fn test_strings_appended_while_loading_stay_newest() {
        let store = HistoryStore::new(InMemoryHistory::with_strings(["old"]));
        store.append_string("new");
        store.load(|_| {});
        assert_eq!(store.get_strings(), vec!["old", "new"]);
        assert_eq!(store.find_newest(|s| s.starts_with('o')).as_deref(), Some("old"));
        assert_eq!(store.find_newest(|s| s.is_empty()), None);
    }

    #[test]
    fn test_expand_user() {
        assert_eq!(expand_user(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user(Path::new("~/h")), home.join("h"));
        }
    }
}
