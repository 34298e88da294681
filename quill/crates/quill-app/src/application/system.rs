//! Running other programs while the application is paused.

use quill_input::{Input, Key, KeyPress};
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::time::Duration;

/// Pagers tried, in order, when `PAGER` is not set.
const FALLBACK_PAGERS: &[&str] = &["less", "more"];

/// How long a held escape waits for the rest of its sequence.
const ESCAPE_FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

/// Resolves the pager command line from `PAGER` or the first fallback
/// pager found on `PATH`.
pub fn pager_command() -> Option<Vec<String>> {
    if let Ok(value) = std::env::var("PAGER") {
        if !value.trim().is_empty() {
            match shlex::split(&value) {
                Some(argv) if !argv.is_empty() => return Some(argv),
                _ => tracing::warn!("ignoring unparsable PAGER={value:?}"),
            }
        }
    }
    FALLBACK_PAGERS
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|path| vec![path.to_string_lossy().into_owned()])
}

/// Runs `command` through the system shell with inherited stdio.
pub fn run_shell_command(command: &str) -> std::io::Result<ExitStatus> {
    tracing::debug!(%command, "running system command");
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        cmd
    };
    cmd.status()
}

/// Stops the process group with `SIGTSTP`. Returns when the shell resumes
/// the process.
#[cfg(unix)]
pub fn suspend_process_group() {
    // SAFETY: kill(2) with pid 0 signals our own process group and takes
    // no pointers.
    let rc = unsafe { libc::kill(0, libc::SIGTSTP) };
    if rc != 0 {
        tracing::warn!("failed to suspend: {}", std::io::Error::last_os_error());
    }
}

/// Suspending needs job control, which this platform lacks.
#[cfg(not(unix))]
pub fn suspend_process_group() {
    tracing::debug!("suspend to background is not supported on this platform");
}

/// Blocks until a key accepted by `accept` is typed and returns it.
/// Returns `None` when the input closes first.
///
/// The input must be detached from the event loop; it is detached again
/// on return.
pub fn wait_for_key(input: &mut dyn Input, accept: impl Fn(&KeyPress) -> bool) -> Option<KeyPress> {
    let (sender, receiver) = flume::bounded::<()>(1);
    let waker: quill_input::Waker = Arc::new(move || {
        let _ = sender.try_send(());
    });
    if let Err(e) = input.attach(waker) {
        tracing::warn!("cannot read keys: {e}");
        return None;
    }

    let found = loop {
        let mut keys = input.read_keys();
        if keys.is_empty() && input.has_pending() {
            if receiver.recv_timeout(ESCAPE_FLUSH_TIMEOUT).is_err() {
                keys = input.flush_keys();
            } else {
                continue;
            }
        }
        if let Some(key) = keys.into_iter().find(|k| accept(k)) {
            break Some(key);
        }
        if input.closed() {
            break None;
        }
        if receiver.recv().is_err() {
            break None;
        }
    };
    input.detach();
    found
}

/// Accepts Enter only.
pub(crate) fn is_enter(key: &KeyPress) -> bool {
    key.key == Key::Enter
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_input::PipeInput;
    use serial_test::serial;

    #[test]
    fn test_wait_for_key_skips_rejected_keys() {
        let mut input = PipeInput::new();
        input.send_text("ab\rc");
        let key = wait_for_key(&mut input, is_enter);
        assert_eq!(key.map(|k| k.key), Some(Key::Enter));
    }

    #[test]
    fn test_wait_for_key_returns_none_on_close() {
        let mut input = PipeInput::new();
        input.send_text("xyz");
        input.close();
        assert_eq!(wait_for_key(&mut input, is_enter), None);
    }

    #[test]
    fn test_wait_for_key_wakes_on_late_input() {
        let mut input = PipeInput::new();
        let sender = input.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            sender.send_text("y");
        });
        let key = wait_for_key(&mut input, |k| k.key == Key::Char('y'));
        handle.join().unwrap();
        assert_eq!(key.map(|k| k.key), Some(Key::Char('y')));
    }

    #[test]
    #[serial]
    fn test_pager_from_environment() {
        std::env::set_var("PAGER", "less -R");
        assert_eq!(pager_command(), Some(vec!["less".to_string(), "-R".to_string()]));
        std::env::remove_var("PAGER");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shell_command_reports_status() {
        assert!(run_shell_command("exit 0").unwrap().success());
        assert_eq!(run_shell_command("exit 3").unwrap().code(), Some(3));
    }
}
