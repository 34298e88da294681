//! End-to-end editing through the default key bindings.
//!
//! Each test types raw terminal bytes into a [`PipeInput`], runs a one-buffer
//! application until Enter and checks the accepted text.

use std::time::Duration;

use quill_app::layout::{BufferControl, Window};
use quill_app::{AppError, Application, ApplicationOptions, KeyBindings, Layout};
use quill_core::{ColorDepth, Size};
use quill_edit::Buffer;
use quill_input::{Key, PipeInput};
use quill_output::{MemoryWriter, Vt100Output};

/// Logs go to the test writer; `RUST_LOG=quill_app=trace` shows key dispatch.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn run_with_buffer(keys: &str, buffer: Buffer) -> Result<String, AppError> {
    init_tracing();
    let input = PipeInput::new();
    let writer = MemoryWriter::new();
    let output = Vt100Output::new(writer, || Size::new(24, 80)).with_default_color_depth(ColorDepth::Depth8Bit);
    let mut app = Application::new(
        ApplicationOptions::default().with_min_redraw_interval(Duration::ZERO),
        Box::new(input.clone()),
        Box::new(output),
    );
    let buffer = app.ctx_mut().add_buffer(buffer);
    app.set_layout(Layout::new(Window::new(BufferControl::new(buffer))));

    let mut kb = KeyBindings::new();
    kb.add(Key::Enter, |event| {
        let text = event.current_buffer().map(|b| b.text().to_string()).unwrap_or_default();
        event.ctx.exit_with(text);
        Ok(())
    });
    app.add_key_bindings(kb.shared());

    input.send_text(keys);
    app.run()
}

fn run(keys: &str) -> String {
    run_with_buffer(keys, Buffer::new()).expect("run succeeds")
}

mod motion {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_typing() {
        assert_eq!(run("hello\r"), "hello");
    }

    #[test]
    fn test_beginning_of_line_then_insert() {
        // Ctrl-A, then type.
        assert_eq!(run("world\x01hello \r"), "hello world");
    }

    #[test]
    fn test_arrow_keys_move_cursor() {
        assert_eq!(run("ac\x1b[Db\r"), "abc");
    }

    #[test]
    fn test_meta_b_moves_back_a_word() {
        assert_eq!(run("one three\x1bbtwo \r"), "one two three");
    }
}

mod killing {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ctrl_w_deletes_word() {
        assert_eq!(run("hello world\x17\r"), "hello ");
    }

    #[test]
    fn test_kill_and_yank() {
        // Ctrl-A, Ctrl-K, type, Ctrl-Y.
        assert_eq!(run("abc\x01\x0bx\x19\r"), "xabc");
    }

    #[test]
    fn test_backspace() {
        assert_eq!(run("abcd\x7f\x7f\r"), "ab");
    }
}

mod undo {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ctrl_underscore_undoes_kill() {
        assert_eq!(run("abc\x17\x1f\r"), "abc");
    }
}

mod arguments {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repeat_argument() {
        // Alt-3 x inserts three x.
        assert_eq!(run("\x1b3x\r"), "xxx");
    }

    #[test]
    fn test_bracketed_paste_normalises_newlines() {
        let buffer = Buffer::new().with_multiline(true);
        let text = run_with_buffer("\x1b[200~a\r\nb\x1b[201~\r", buffer);
        assert_eq!(text.expect("run succeeds"), "a\nb");
    }
}
