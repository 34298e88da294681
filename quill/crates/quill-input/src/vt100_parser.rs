//! VT100 input parser.
//!
//! [`Vt100Parser`] is a character level state machine: feed it decoded input
//! and it emits [`KeyPress`] values through a callback. It never fails;
//! input it cannot make sense of comes out as the characters it consisted of.
//!
//! A lone `ESC` is ambiguous (it may start a sequence), so it is held until
//! more input arrives or [`Vt100Parser::flush`] is called. The parser keeps
//! no clock; deciding when to flush is up to the caller.

use crate::ansi_sequences::{self, BRACKETED_PASTE_END, BRACKETED_PASTE_START};
use crate::keys::{Key, KeyPress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    Ss3,
    /// X10 mouse report: three raw bytes follow `ESC [ M`.
    MouseParam { remaining: u8 },
    BracketedPaste,
}

/// Incremental VT100 input decoder.
#[derive(Debug)]
pub struct Vt100Parser {
    state: State,
    pending: String,
    paste: String,
}

impl Default for Vt100Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Vt100Parser {
    /// Creates a parser in the ground state.
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            pending: String::new(),
            paste: String::new(),
        }
    }

    /// Feeds input, emitting each completed key press.
    pub fn feed(&mut self, data: &str, mut emit: impl FnMut(KeyPress)) {
        for c in data.chars() {
            let mut next = Some(c);
            while let Some(ch) = next {
                next = self.feed_char(ch, &mut emit);
            }
        }
    }

    /// Emits whatever is pending as plain keys: a lone `ESC` becomes
    /// [`Key::Escape`]. An unfinished bracketed paste is kept.
    pub fn flush(&mut self, mut emit: impl FnMut(KeyPress)) {
        match self.state {
            State::Ground | State::BracketedPaste => {}
            _ => {
                let pending = std::mem::take(&mut self.pending);
                emit_verbatim(&pending, &mut emit);
                self.state = State::Ground;
            }
        }
    }

    /// Returns true while an escape sequence is incomplete.
    pub fn has_pending(&self) -> bool {
        !matches!(self.state, State::Ground | State::BracketedPaste)
    }

    /// Returns true while inside a bracketed paste.
    pub fn in_paste(&self) -> bool {
        self.state == State::BracketedPaste
    }

    /// Parses a complete input string, flushing at the end.
    pub fn parse_all(data: &str) -> Vec<KeyPress> {
        let mut parser = Self::new();
        let mut out = Vec::new();
        parser.feed(data, |k| out.push(k));
        parser.flush(|k| out.push(k));
        out
    }

    /// Handles one char; returns a char that must be fed again.
    fn feed_char(&mut self, c: char, emit: &mut dyn FnMut(KeyPress)) -> Option<char> {
        match self.state {
            State::Ground => {
                if c == '\x1b' {
                    self.pending.push(c);
                    self.state = State::Escape;
                } else {
                    emit(single(c));
                }
                None
            }
            State::Escape => match c {
                '[' => {
                    self.pending.push(c);
                    self.state = State::Csi;
                    None
                }
                'O' => {
                    self.pending.push(c);
                    self.state = State::Ss3;
                    None
                }
                _ => {
                    // Meta prefix: the escape stands alone.
                    self.pending.clear();
                    self.state = State::Ground;
                    emit(KeyPress::new(Key::Escape, "\x1b"));
                    Some(c)
                }
            },
            State::Csi => self.feed_csi(c, emit),
            State::Ss3 => {
                if is_control(c) {
                    return self.abandon(c, emit);
                }
                self.pending.push(c);
                self.finish_sequence(emit);
                None
            }
            State::MouseParam { remaining } => {
                self.pending.push(c);
                if remaining <= 1 {
                    let report = std::mem::take(&mut self.pending);
                    self.state = State::Ground;
                    emit(KeyPress::new(Key::Mouse, report));
                } else {
                    self.state = State::MouseParam {
                        remaining: remaining - 1,
                    };
                }
                None
            }
            State::BracketedPaste => {
                self.paste.push(c);
                if self.paste.ends_with(BRACKETED_PASTE_END) {
                    let len = self.paste.len() - BRACKETED_PASTE_END.len();
                    self.paste.truncate(len);
                    let text = std::mem::take(&mut self.paste);
                    self.state = State::Ground;
                    emit(KeyPress::with_raw(
                        Key::BracketedPaste,
                        text.clone(),
                        format!("{BRACKETED_PASTE_START}{text}{BRACKETED_PASTE_END}"),
                    ));
                }
                None
            }
        }
    }

    fn feed_csi(&mut self, c: char, emit: &mut dyn FnMut(KeyPress)) -> Option<char> {
        let at_start = self.pending == "\x1b[";
        match c {
            'M' if at_start => {
                self.pending.push(c);
                self.state = State::MouseParam { remaining: 3 };
                None
            }
            // Linux console function keys: ESC [ [ A.
            '[' if at_start => {
                self.pending.push(c);
                None
            }
            '\x20'..='\x3f' => {
                self.pending.push(c);
                None
            }
            '\x40'..='\x7e' => {
                self.pending.push(c);
                self.finish_sequence(emit);
                None
            }
            _ => self.abandon(c, emit),
        }
    }

    /// Drops an invalid sequence: its characters are emitted as typed and
    /// `c` is fed again.
    fn abandon(&mut self, c: char, emit: &mut dyn FnMut(KeyPress)) -> Option<char> {
        let pending = std::mem::take(&mut self.pending);
        self.state = State::Ground;
        emit_verbatim(&pending, emit);
        Some(c)
    }

    fn finish_sequence(&mut self, emit: &mut dyn FnMut(KeyPress)) {
        let seq = std::mem::take(&mut self.pending);
        self.state = State::Ground;

        if seq == BRACKETED_PASTE_START {
            self.paste.clear();
            self.state = State::BracketedPaste;
            return;
        }
        if let Some(keys) = ansi_sequences::lookup(&seq) {
            for (i, key) in keys.iter().enumerate() {
                let data = if i == 0 { seq.as_str() } else { "" };
                emit(KeyPress::with_raw(*key, data, seq.as_str()));
            }
            return;
        }
        if let Some(body) = seq.strip_prefix("\x1b[") {
            if is_cpr(body) {
                emit(KeyPress::new(Key::CprResponse, seq));
                return;
            }
            if is_mouse_report(body) {
                emit(KeyPress::new(Key::Mouse, seq));
                return;
            }
        }
        tracing::trace!(sequence = ?seq, "unknown escape sequence");
        emit_verbatim(&seq, emit);
    }
}

fn is_control(c: char) -> bool {
    (c as u32) < 0x20 || c == '\x7f'
}

fn single(c: char) -> KeyPress {
    if is_control(c) {
        KeyPress::new(ansi_sequences::key_for_control_char(c), c.to_string())
    } else {
        KeyPress::char(c)
    }
}

fn emit_verbatim(seq: &str, emit: &mut dyn FnMut(KeyPress)) {
    for c in seq.chars() {
        emit(single(c));
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `row;colR`
fn is_cpr(body: &str) -> bool {
    body.strip_suffix('R')
        .and_then(|p| p.split_once(';'))
        .is_some_and(|(r, c)| all_digits(r) && all_digits(c))
}

/// `<b;x;yM`, `<b;x;ym` or urxvt `b;x;yM`
fn is_mouse_report(body: &str) -> bool {
    let body = body.strip_prefix('<').unwrap_or(body);
    let Some(params) = body.strip_suffix('M').or_else(|| body.strip_suffix('m')) else {
        return false;
    };
    let parts: Vec<&str> = params.split(';').collect();
    parts.len() == 3 && parts.iter().all(|p| all_digits(p))
}

/// Parses `ESC [ row ; col R` into a zero-based `(row, col)`.
pub fn parse_cpr(data: &str) -> Option<(usize, usize)> {
    let body = data.strip_prefix("\x1b[")?.strip_suffix('R')?;
    let (row, col) = body.split_once(';')?;
    let row: usize = row.parse().ok()?;
    let col: usize = col.parse().ok()?;
    Some((row.saturating_sub(1), col.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(data: &str) -> Vec<Key> {
        Vt100Parser::parse_all(data).into_iter().map(|k| k.key).collect()
    }

    #[test]
    fn test_printable_and_control() {
        assert_eq!(
            keys("ab\r\x01\x7f\t"),
            vec![
                Key::Char('a'),
                Key::Char('b'),
                Key::Enter,
                Key::Control('a'),
                Key::Backspace,
                Key::Tab
            ]
        );
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(keys("\x1b[A\x1bOB\x1b[3~"), vec![Key::Up, Key::Down, Key::Delete]);
        assert_eq!(keys("\x1b[15~\x1b[[A"), vec![Key::F(5), Key::F(1)]);
        assert_eq!(keys("\x1b[1;5D"), vec![Key::ControlLeft]);
    }

    #[test]
    fn test_alt_sequences() {
        assert_eq!(keys("\x1bf"), vec![Key::Escape, Key::Char('f')]);
        assert_eq!(keys("\x1b\r"), vec![Key::Escape, Key::Enter]);
        assert_eq!(keys("\x1b[1;3C"), vec![Key::Escape, Key::Right]);
    }

    #[test]
    fn test_lone_escape_waits_for_flush() {
        let mut parser = Vt100Parser::new();
        let mut out = Vec::new();
        parser.feed("\x1b", |k| out.push(k));
        assert!(out.is_empty());
        assert!(parser.has_pending());
        parser.flush(|k| out.push(k));
        assert_eq!(out, vec![KeyPress::new(Key::Escape, "\x1b")]);
        assert!(!parser.has_pending());
    }

    #[test]
    fn test_sequence_split_across_feeds() {
        let mut parser = Vt100Parser::new();
        let mut out = Vec::new();
        parser.feed("\x1b[", |k| out.push(k.key));
        parser.feed("1;5", |k| out.push(k.key));
        parser.feed("C", |k| out.push(k.key));
        assert_eq!(out, vec![Key::ControlRight]);
    }

    #[test]
    fn test_unknown_sequence_is_verbatim() {
        assert_eq!(
            keys("\x1b[99z"),
            vec![
                Key::Escape,
                Key::Char('['),
                Key::Char('9'),
                Key::Char('9'),
                Key::Char('z')
            ]
        );
        // an interrupting control char ends the sequence and is parsed itself
        assert_eq!(
            keys("\x1b[1\r"),
            vec![Key::Escape, Key::Char('['), Key::Char('1'), Key::Enter]
        );
    }

    #[test]
    fn test_bracketed_paste() {
        let presses = Vt100Parser::parse_all("x\x1b[200~hello\x1b[A\r\nworld\x1b[201~y");
        assert_eq!(presses.len(), 3);
        assert_eq!(presses[1].key, Key::BracketedPaste);
        assert_eq!(presses[1].data, "hello\x1b[A\r\nworld");
        assert_eq!(presses[2].key, Key::Char('y'));
    }

    #[test]
    fn test_paste_survives_flush() {
        let mut parser = Vt100Parser::new();
        let mut out = Vec::new();
        parser.feed("\x1b[200~abc", |k| out.push(k));
        parser.flush(|k| out.push(k));
        assert!(out.is_empty());
        assert!(parser.in_paste());
        parser.feed("\x1b[201~", |k| out.push(k));
        assert_eq!(out[0].data, "abc");
    }

    #[test]
    fn test_mouse_reports() {
        let presses = Vt100Parser::parse_all("\x1b[<0;3;4M\x1b[M !!\x1b[32;1;1M");
        assert_eq!(
            presses.iter().map(|k| k.key).collect::<Vec<_>>(),
            vec![Key::Mouse, Key::Mouse, Key::Mouse]
        );
        assert_eq!(presses[0].data, "\x1b[<0;3;4M");
        assert_eq!(presses[1].data, "\x1b[M !!");
    }

    #[test]
    fn test_cpr_response() {
        let presses = Vt100Parser::parse_all("\x1b[12;40R");
        assert_eq!(presses[0].key, Key::CprResponse);
        assert_eq!(parse_cpr(&presses[0].data), Some((11, 39)));
    }

    #[test]
    fn test_serialized_keys_round_trip() {
        let input = vec![
            Key::Char('h'),
            Key::Control('x'),
            Key::Control('e'),
            Key::Up,
            Key::F(12),
            Key::ShiftLeft,
            Key::BackTab,
            Key::Enter,
            Key::Escape,
            Key::Char('f'),
            Key::PageDown,
            Key::Backspace,
            Key::ControlDelete,
        ];
        let wire = ansi_sequences::serialize_keys(&input);
        assert_eq!(keys(&wire), input);
    }
}
