//! The `Input` abstraction.

use crate::error::Result;
use crate::keys::KeyPress;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use std::sync::Arc;

/// Callback an input uses to signal that keys can be read.
///
/// Called from reader threads, so it must only post a notification.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// A source of key presses.
pub trait Input: Send {
    /// The file descriptor this input reads from, if any.
    fn fileno(&self) -> Option<i32>;

    /// Identifies the underlying stream. Inputs reading from the same stream
    /// return the same value, so that typeahead is shared between them.
    fn typeahead_hash(&self) -> String;

    /// Returns the key presses parsed from input that is available now,
    /// without blocking.
    fn read_keys(&mut self) -> Vec<KeyPress>;

    /// Emits a held incomplete sequence (a lone escape) as keys.
    fn flush_keys(&mut self) -> Vec<KeyPress>;

    /// Returns true while an incomplete escape sequence is held.
    fn has_pending(&self) -> bool;

    /// Starts delivering readiness notifications to `waker`.
    fn attach(&mut self, waker: Waker) -> Result<()>;

    /// Stops readiness notifications.
    fn detach(&mut self);

    /// Puts the terminal into raw mode until the guard is dropped.
    fn raw_mode(&mut self) -> Result<ModeGuard>;

    /// Puts the terminal into cooked mode until the guard is dropped.
    fn cooked_mode(&mut self) -> Result<ModeGuard>;

    /// Returns true once the stream has reached its end.
    fn closed(&self) -> bool;
}

/// Restores a terminal mode when dropped.
#[must_use = "the mode is restored when the guard is dropped"]
pub struct ModeGuard {
    restore: Option<Box<dyn FnOnce() + Send>>,
}

impl ModeGuard {
    /// A guard that restores nothing.
    pub fn noop() -> Self {
        Self { restore: None }
    }

    /// A guard that runs `restore` on drop.
    pub fn new(restore: impl FnOnce() + Send + 'static) -> Self {
        Self {
            restore: Some(Box::new(restore)),
        }
    }
}

impl std::fmt::Debug for ModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeGuard")
            .field("active", &self.restore.is_some())
            .finish()
    }
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

/// Enables raw mode on the controlling terminal.
///
/// Only undoes what it changed: if raw mode was already on, the guard is a
/// no-op.
pub fn enter_raw_mode() -> Result<ModeGuard> {
    if is_raw_mode_enabled()? {
        return Ok(ModeGuard::noop());
    }
    enable_raw_mode()?;
    Ok(ModeGuard::new(|| {
        if let Err(err) = disable_raw_mode() {
            tracing::warn!("failed to leave raw mode: {err}");
        }
    }))
}

/// Disables raw mode until the guard is dropped.
pub fn enter_cooked_mode() -> Result<ModeGuard> {
    if !is_raw_mode_enabled()? {
        return Ok(ModeGuard::noop());
    }
    disable_raw_mode()?;
    Ok(ModeGuard::new(|| {
        if let Err(err) = enable_raw_mode() {
            tracing::warn!("failed to re-enter raw mode: {err}");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_mode_guard_restores_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        {
            let _guard = ModeGuard::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drop(ModeGuard::noop());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
