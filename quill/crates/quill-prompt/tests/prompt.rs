//! Prompt sessions driven end to end through a pipe.
//!
//! Keys go into a [`PipeInput`]; the screen is drawn by a VT100 output into
//! memory so tests can look at what the user would have seen.

mod common;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use quill_app::AppError;
use quill_core::{ColorDepth, Size};
use quill_edit::completion::WordCompleter;
use quill_edit::{Document, FileHistory, HistoryStore, InMemoryHistory, ValidationError};
use quill_input::PipeInput;
use quill_output::{MemoryWriter, Vt100Output};
use quill_prompt::{PromptOptions, PromptSession};

fn session(options: PromptOptions) -> (PromptSession, PipeInput, MemoryWriter) {
    let input = PipeInput::new();
    let writer = MemoryWriter::new();
    let output =
        Vt100Output::new(writer.clone(), || Size::new(24, 80)).with_default_color_depth(ColorDepth::Depth8Bit);
    let session = PromptSession::with_io(options, Box::new(input.clone()), Box::new(output));
    (session, input, writer)
}

/// Sends each chunk as its own read, so jobs such as completion run between
/// them.
fn type_slowly(input: &PipeInput, chunks: &[&'static str]) -> JoinHandle<()> {
    let input = input.clone();
    let chunks = chunks.to_vec();
    thread::spawn(move || {
        for chunk in chunks {
            thread::sleep(Duration::from_millis(80));
            input.send_text(chunk);
        }
    })
}

mod basic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prompt_returns_typed_line() {
        let (mut session, input, writer) = session(PromptOptions::new("> "));
        input.send_text("hello\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "hello");
        assert!(writer.contents().contains("> "));
    }

    #[test]
    fn test_ctrl_c_interrupts() {
        let (mut session, input, _writer) = session(PromptOptions::new("> "));
        input.send_text("abc\x03");
        assert!(matches!(session.prompt(), Err(AppError::KeyboardInterrupt)));
    }

    #[test]
    fn test_ctrl_d_on_empty_line_is_eof() {
        let (mut session, input, _writer) = session(PromptOptions::new("> "));
        input.send_text("\x04");
        assert!(matches!(session.prompt(), Err(AppError::Eof)));
    }

    #[test]
    fn test_default_text_is_editable() {
        let (mut session, input, _writer) = session(PromptOptions::new("> ").with_default("git"));
        input.send_text(" status\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "git status");
    }

    #[test]
    fn test_accept_default_returns_immediately() {
        let options = PromptOptions::new("> ").with_default("yes").with_accept_default(true);
        let (mut session, _input, _writer) = session(options);
        assert_eq!(session.prompt().expect("prompt succeeds"), "yes");
    }

    #[test]
    fn test_password_is_masked() {
        let (mut session, input, writer) = session(PromptOptions::new("pw: ").with_password(true));
        input.send_text("secret\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "secret");
        let screen = writer.contents();
        assert!(screen.contains("******"));
        assert!(!screen.contains("secret"));
    }

    #[test]
    fn test_rprompt_and_toolbar_are_drawn() {
        let options = PromptOptions::new("> ")
            .with_rprompt("[right]")
            .with_bottom_toolbar("toolbar text");
        let (mut session, input, writer) = session(options);
        let typist = type_slowly(&input, &["x", "\r"]);
        assert_eq!(session.prompt().expect("prompt succeeds"), "x");
        typist.join().expect("typist finishes");
        let screen = writer.contents();
        assert!(common::was_shown(&screen, 80, "[right]"));
        assert!(common::was_shown(&screen, 80, "toolbar text"));
    }
}

mod history {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_remembers_previous_lines() {
        let (mut session, input, _writer) = session(PromptOptions::new("> "));
        input.send_text("first\r");
        assert_eq!(session.prompt().expect("first prompt"), "first");
        input.send_text("second\r");
        assert_eq!(session.prompt().expect("second prompt"), "second");

        // Up twice reaches the first line.
        input.send_text("\x1b[A\x1b[A\r");
        assert_eq!(session.prompt().expect("third prompt"), "first");
    }

    #[test]
    fn test_history_search_filters_by_prefix() {
        let history = HistoryStore::new(InMemoryHistory::with_strings(["git log", "ls", "git status"]));
        let options = PromptOptions::new("> ").with_history(history).with_history_search(true);
        let (mut session, input, _writer) = session(options);
        input.send_text("git\x1b[A\x1b[A\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "git log");
    }

    #[test]
    fn test_file_history_is_written() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("history");
        let options = PromptOptions::new("> ").with_history(HistoryStore::new(FileHistory::new(&path)));
        let (mut session, input, _writer) = session(options);
        input.send_text("saved line\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "saved line");
        let contents = std::fs::read_to_string(&path).expect("history file exists");
        assert!(contents.contains("+saved line"));
    }
}

mod completion {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fruit() -> PromptOptions {
        PromptOptions::new("> ").with_completer(Arc::new(WordCompleter::new(["apple", "apricot", "banana"])))
    }

    #[test]
    fn test_tab_selects_first_completion() {
        let (mut session, input, writer) = session(fruit());
        let typist = type_slowly(&input, &["ap", "\t", "\r"]);
        assert_eq!(session.prompt().expect("prompt succeeds"), "apple");
        typist.join().expect("typist finishes");
        // The menu listed both candidates and not the one that does not match.
        let screen = writer.contents();
        assert!(screen.contains("apricot"));
        assert!(!screen.contains("banana"));
    }

    #[test]
    fn test_second_tab_moves_to_next() {
        let (mut session, input, _writer) = session(fruit());
        let typist = type_slowly(&input, &["ap", "\t", "\t", "\r"]);
        assert_eq!(session.prompt().expect("prompt succeeds"), "apricot");
        typist.join().expect("typist finishes");
    }

    #[test]
    fn test_escape_restores_typed_text() {
        let (mut session, input, _writer) = session(fruit());
        let typist = type_slowly(&input, &["ap", "\t", "\t", "\x1b", "\r"]);
        assert_eq!(session.prompt().expect("prompt succeeds"), "ap");
        typist.join().expect("typist finishes");
    }
}

mod validation {
    use super::*;
    use pretty_assertions::assert_eq;

    fn digits(document: &Document) -> Result<(), ValidationError> {
        match document.text().find(|c: char| !c.is_ascii_digit()) {
            Some(index) => Err(ValidationError::new(index, "must be digits")),
            None => Ok(()),
        }
    }

    #[test]
    fn test_invalid_input_keeps_prompt_open() {
        let options = PromptOptions::new("> ").with_validator(Arc::new(digits));
        let (mut session, input, writer) = session(options);
        // Enter fails and puts the cursor on the "a"; Delete removes it.
        let typist = type_slowly(&input, &["12a\r", "\x1b[3~3\r"]);
        assert_eq!(session.prompt().expect("prompt succeeds"), "123");
        typist.join().expect("typist finishes");
        assert!(writer.contents().contains("must be digits"));
    }
}

mod multiline {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_multiline_with_continuation() {
        let options = PromptOptions::new(">>> ")
            .with_multiline(true)
            .with_prompt_continuation(". ");
        let (mut session, input, writer) = session(options);
        // Enter copies the indentation; two backspaces remove it again.
        input.send_text("def f():\r  pass\r\x7f\x7f\x1b\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "def f():\n  pass\n");
        let rows = common::final_screen(&writer.contents(), 80);
        let continued: Vec<&str> = rows.iter().map(String::as_str).filter(|row| row.starts_with('.')).collect();
        assert_eq!(continued, vec![".   pass", "."]);
    }

    #[test]
    fn test_message_lines_above_input() {
        let options = PromptOptions::new("Enter a name\n> ");
        let (mut session, input, writer) = session(options);
        input.send_text("quill\r");
        assert_eq!(session.prompt().expect("prompt succeeds"), "quill");
        assert!(writer.contents().contains("Enter a name"));
    }
}
