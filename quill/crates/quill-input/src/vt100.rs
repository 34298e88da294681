//! Terminal input from a file descriptor (usually stdin).
//!
//! While attached, a reader thread waits on the descriptor with `poll(2)`,
//! reads whatever is available, decodes it as UTF-8 and wakes the owner.
//! Parsing happens on the owner's side in [`Input::read_keys`].

use crate::error::{InputError, Result};
use crate::input::{enter_cooked_mode, enter_raw_mode, Input, ModeGuard, Waker};
use crate::keys::KeyPress;
use crate::vt100_parser::Vt100Parser;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

const POLL_TIMEOUT_MS: libc::c_int = 50;

#[derive(Default)]
struct Shared {
    text: String,
    closed: bool,
}

/// VT100 input read from a terminal descriptor.
pub struct Vt100Input {
    fd: i32,
    parser: Vt100Parser,
    shared: Arc<Mutex<Shared>>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Vt100Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vt100Input")
            .field("fd", &self.fd)
            .field("attached", &self.reader.is_some())
            .finish_non_exhaustive()
    }
}

impl Vt100Input {
    /// Input from stdin.
    pub fn stdin() -> Self {
        Self::from_fd(libc::STDIN_FILENO)
    }

    /// Input from an arbitrary descriptor. The descriptor is not closed.
    pub fn from_fd(fd: i32) -> Self {
        Self {
            fd,
            parser: Vt100Parser::new(),
            shared: Arc::new(Mutex::new(Shared::default())),
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    /// Returns true if the descriptor is a terminal.
    pub fn is_tty(&self) -> bool {
        // SAFETY: isatty only inspects the descriptor.
        unsafe { libc::isatty(self.fd) == 1 }
    }
}

/// Decodes UTF-8 across read boundaries.
#[derive(Default)]
struct Utf8Decoder {
    partial: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8], out: &mut String) {
        self.partial.extend_from_slice(bytes);
        let mut rest: &[u8] = &self.partial;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + bad..];
                        }
                        None => {
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }
        let remaining = rest.to_vec();
        self.partial = remaining;
    }
}

fn reader_loop(fd: i32, shared: &Mutex<Shared>, stop: &AtomicBool, waker: &Waker) {
    let mut buf = [0u8; 1024];
    let mut decoder = Utf8Decoder::default();
    while !stop.load(Ordering::Acquire) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: pfd is a valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&mut pfd, 1, POLL_TIMEOUT_MS) };
        if ready <= 0 {
            continue;
        }
        // SAFETY: buf is valid for writes of buf.len() bytes.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted
                || err.kind() == std::io::ErrorKind::WouldBlock
            {
                continue;
            }
            tracing::warn!("input read failed: {err}");
            mark_closed(shared, waker);
            return;
        }
        if n == 0 {
            mark_closed(shared, waker);
            return;
        }
        {
            let mut state = shared.lock();
            decoder.decode(&buf[..n as usize], &mut state.text);
        }
        waker();
    }
}

fn mark_closed(shared: &Mutex<Shared>, waker: &Waker) {
    shared.lock().closed = true;
    waker();
}

impl Input for Vt100Input {
    fn fileno(&self) -> Option<i32> {
        Some(self.fd)
    }

    fn typeahead_hash(&self) -> String {
        format!("fd-{}", self.fd)
    }

    fn read_keys(&mut self) -> Vec<KeyPress> {
        let text = std::mem::take(&mut self.shared.lock().text);
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
        self.detach();
        self.stop.store(false, Ordering::Release);
        let fd = self.fd;
        let shared = Arc::clone(&self.shared);
        let stop = Arc::clone(&self.stop);
        let handle = std::thread::Builder::new()
            .name("quill-input".into())
            .spawn(move || reader_loop(fd, &shared, &stop, &waker))?;
        self.reader = Some(handle);
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(handle) = self.reader.take() {
            self.stop.store(true, Ordering::Release);
            if handle.join().is_err() {
                tracing::warn!("input reader thread panicked");
            }
        }
    }

    fn raw_mode(&mut self) -> Result<ModeGuard> {
        if !self.is_tty() {
            return Ok(ModeGuard::noop());
        }
        enter_raw_mode()
    }

    fn cooked_mode(&mut self) -> Result<ModeGuard> {
        if !self.is_tty() {
            return Ok(ModeGuard::noop());
        }
        enter_cooked_mode()
    }

    fn closed(&self) -> bool {
        let state = self.shared.lock();
        state.closed && state.text.is_empty()
    }
}

impl Drop for Vt100Input {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Creates the default input for this process: stdin.
pub fn create_input() -> Result<Box<dyn Input>> {
    let input = Vt100Input::stdin();
    if !input.is_tty() {
        tracing::debug!("stdin is not a terminal; reading it as a stream");
    }
    Ok(Box::new(input))
}

/// Creates input from stdin, failing if stdin is not a terminal.
pub fn create_tty_input() -> Result<Box<dyn Input>> {
    let input = Vt100Input::stdin();
    if input.is_tty() {
        Ok(Box::new(input))
    } else {
        Err(InputError::NotATerminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[test]
    fn test_utf8_decoder_split_sequences() {
        let mut decoder = Utf8Decoder::default();
        let mut out = String::new();
        let bytes = "é漢".as_bytes();
        decoder.decode(&bytes[..1], &mut out);
        assert_eq!(out, "");
        decoder.decode(&bytes[1..3], &mut out);
        assert_eq!(out, "é");
        decoder.decode(&bytes[3..], &mut out);
        assert_eq!(out, "é漢");
        decoder.decode(&[0xff, b'a'], &mut out);
        assert_eq!(out, "é漢\u{fffd}a");
    }

    #[test]
    fn test_reader_thread_reads_from_pipe() {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: fds has room for the two descriptors.
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let mut input = Vt100Input::from_fd(fds[0]);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        input
            .attach(Arc::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        let data = b"ok\x1b[A";
        // SAFETY: writing a valid buffer to the pipe's write end, then closing it.
        unsafe {
            assert_eq!(libc::write(fds[1], data.as_ptr().cast(), data.len()), 5);
            libc::close(fds[1]);
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut keys = Vec::new();
        while !input.closed() && Instant::now() < deadline {
            keys.extend(input.read_keys());
            std::thread::sleep(Duration::from_millis(10));
        }
        keys.extend(input.read_keys());
        input.detach();
        assert!(hits.load(Ordering::SeqCst) >= 1);
        assert_eq!(keys.len(), 3);
        assert!(input.closed());
        // SAFETY: the reader thread has been joined.
        unsafe { libc::close(fds[0]) };
    }
}
