//! Escape sequence output for VT100-compatible terminals.
//!
//! [`Vt100Output`] collects output in a string buffer and writes it to the
//! underlying writer on [`Output::flush`]. Cursor, erase and mode changes
//! are rendered with crossterm commands; attribute changes use a cached
//! SGR string per `(attrs, depth)` pair.

use crate::detect::{default_color_depth_from_env, terminal_size};
use crate::output::{CursorShape, Output};
use crossterm::cursor::{self, SetCursorStyle};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::terminal::{
    Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
    LeaveAlternateScreen, SetTitle,
};
use crossterm::Command;
use parking_lot::Mutex;
use quill_core::color::Color;
use quill_core::color_depth::ColorDepth;
use quill_core::geometry::Size;
use quill_core::style::Attrs;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

type SizeFn = Box<dyn Fn() -> Size + Send>;

/// Escape sequence writer.
pub struct Vt100Output<W: Write + Send> {
    writer: W,
    buffer: String,
    get_size: SizeFn,
    fileno: Option<i32>,
    default_color_depth: Option<ColorDepth>,
    enable_cpr: bool,
    enable_bell: bool,
    sgr_cache: HashMap<(Attrs, ColorDepth), String>,
}

impl<W: Write + Send> std::fmt::Debug for Vt100Output<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vt100Output")
            .field("fileno", &self.fileno)
            .field("buffered", &self.buffer.len())
            .field("default_color_depth", &self.default_color_depth)
            .finish_non_exhaustive()
    }
}

impl Vt100Output<io::Stdout> {
    /// Output to stdout, sized from the terminal.
    pub fn from_stdout() -> Self {
        let is_tty = io::stdout().is_terminal();
        let mut output = Self::new(io::stdout(), terminal_size);
        output.fileno = Some(libc::STDOUT_FILENO);
        output.enable_cpr = is_tty && std::env::var_os("QUILL_NO_CPR").is_none();
        output
    }
}

impl<W: Write + Send> Vt100Output<W> {
    /// Creates an output over `writer`, using `get_size` for the size.
    ///
    /// Cursor position requests are off; enable them with
    /// [`Vt100Output::with_cpr`].
    pub fn new(writer: W, get_size: impl Fn() -> Size + Send + 'static) -> Self {
        Self {
            writer,
            buffer: String::new(),
            get_size: Box::new(get_size),
            fileno: None,
            default_color_depth: None,
            enable_cpr: false,
            enable_bell: true,
            sgr_cache: HashMap::new(),
        }
    }

    /// Fixes the default color depth instead of deriving it from the
    /// environment.
    pub fn with_default_color_depth(mut self, depth: ColorDepth) -> Self {
        self.default_color_depth = Some(depth);
        self
    }

    /// Enables or disables cursor position requests.
    pub fn with_cpr(mut self, enable: bool) -> Self {
        self.enable_cpr = enable;
        self
    }

    /// Enables or disables the bell.
    pub fn with_bell(mut self, enable: bool) -> Self {
        self.enable_bell = enable;
        self
    }

    /// Output buffered since the last flush.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    #[inline]
    fn queue(&mut self, command: impl Command) {
        // Writing into a String cannot fail.
        let _ = command.write_ansi(&mut self.buffer);
    }

    fn sgr(attrs: &Attrs, depth: ColorDepth) -> String {
        let mut params: Vec<u8> = vec![0];
        params.extend(attrs.flags.sgr_codes());
        for (color, background) in [(attrs.fg, false), (attrs.bg, true)] {
            let color = color.downgrade(depth);
            if color != Color::Default {
                params.extend(color.sgr_params(background));
            }
        }
        let mut out = String::from("\x1b[");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let _ = write!(out, "{p}");
        }
        out.push('m');
        out
    }
}

impl<W: Write + Send> Output for Vt100Output<W> {
    fn fileno(&self) -> Option<i32> {
        self.fileno
    }

    fn write(&mut self, data: &str) {
        if data.contains('\x1b') {
            self.buffer.push_str(&data.replace('\x1b', "?"));
        } else {
            self.buffer.push_str(data);
        }
    }

    fn write_raw(&mut self, data: &str) {
        self.buffer.push_str(data);
    }

    fn set_title(&mut self, title: &str) {
        let clean: String = title.chars().filter(|c| *c != '\x1b' && *c != '\x07').collect();
        self.queue(SetTitle(clean));
    }

    fn erase_screen(&mut self) {
        self.queue(Clear(ClearType::All));
    }

    fn enter_alternate_screen(&mut self) {
        self.queue(EnterAlternateScreen);
        self.queue(cursor::MoveTo(0, 0));
    }

    fn quit_alternate_screen(&mut self) {
        self.queue(LeaveAlternateScreen);
    }

    fn enable_mouse_support(&mut self) {
        self.queue(EnableMouseCapture);
    }

    fn disable_mouse_support(&mut self) {
        self.queue(DisableMouseCapture);
    }

    fn erase_end_of_line(&mut self) {
        self.queue(Clear(ClearType::UntilNewLine));
    }

    fn erase_down(&mut self) {
        self.queue(Clear(ClearType::FromCursorDown));
    }

    fn reset_attributes(&mut self) {
        self.buffer.push_str("\x1b[0m");
    }

    fn set_attributes(&mut self, attrs: &Attrs, depth: ColorDepth) {
        let sgr = self
            .sgr_cache
            .entry((*attrs, depth))
            .or_insert_with(|| Self::sgr(attrs, depth));
        self.buffer.push_str(sgr);
    }

    fn disable_autowrap(&mut self) {
        self.queue(DisableLineWrap);
    }

    fn enable_autowrap(&mut self) {
        self.queue(EnableLineWrap);
    }

    fn goto(&mut self, row: usize, column: usize) {
        self.queue(cursor::MoveTo(clamp_u16(column), clamp_u16(row)));
    }

    fn cursor_up(&mut self, n: usize) {
        if n > 0 {
            self.queue(cursor::MoveUp(clamp_u16(n)));
        }
    }

    fn cursor_down(&mut self, n: usize) {
        if n > 0 {
            self.queue(cursor::MoveDown(clamp_u16(n)));
        }
    }

    fn cursor_left(&mut self, n: usize) {
        match n {
            0 => {}
            1 => self.buffer.push('\x08'),
            n => self.queue(cursor::MoveLeft(clamp_u16(n))),
        }
    }

    fn cursor_right(&mut self, n: usize) {
        if n > 0 {
            self.queue(cursor::MoveRight(clamp_u16(n)));
        }
    }

    fn hide_cursor(&mut self) {
        self.queue(cursor::Hide);
    }

    fn show_cursor(&mut self) {
        self.queue(cursor::Show);
    }

    fn set_cursor_shape(&mut self, shape: CursorShape) {
        let style = match shape {
            CursorShape::NeverChange => return,
            CursorShape::Block => SetCursorStyle::SteadyBlock,
            CursorShape::Beam => SetCursorStyle::SteadyBar,
            CursorShape::Underline => SetCursorStyle::SteadyUnderScore,
            CursorShape::BlinkingBlock => SetCursorStyle::BlinkingBlock,
            CursorShape::BlinkingBeam => SetCursorStyle::BlinkingBar,
            CursorShape::BlinkingUnderline => SetCursorStyle::BlinkingUnderScore,
        };
        self.queue(style);
    }

    fn reset_cursor_shape(&mut self) {
        self.queue(SetCursorStyle::DefaultUserShape);
    }

    fn ask_for_cpr(&mut self) {
        self.buffer.push_str("\x1b[6n");
    }

    fn responds_to_cpr(&self) -> bool {
        self.enable_cpr
    }

    fn get_size(&self) -> Size {
        (self.get_size)()
    }

    fn bell(&mut self) {
        if self.enable_bell {
            self.buffer.push('\x07');
        }
    }

    fn enable_bracketed_paste(&mut self) {
        self.queue(EnableBracketedPaste);
    }

    fn disable_bracketed_paste(&mut self) {
        self.queue(DisableBracketedPaste);
    }

    fn reset_cursor_key_mode(&mut self) {
        self.buffer.push_str("\x1b[?1l");
    }

    fn get_default_color_depth(&self) -> ColorDepth {
        self.default_color_depth
            .unwrap_or_else(default_color_depth_from_env)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut self.buffer);
        self.writer.write_all(data.as_bytes())?;
        self.writer.flush()
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// A clonable in-memory writer, for capturing output in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter(Arc<Mutex<Vec<u8>>>);

impl MemoryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Takes everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_core::color::AnsiColor;
    use quill_core::style::AttrFlags;

    fn output() -> (Vt100Output<MemoryWriter>, MemoryWriter) {
        let writer = MemoryWriter::new();
        let out = Vt100Output::new(writer.clone(), || Size::new(24, 80))
            .with_default_color_depth(ColorDepth::Depth8Bit);
        (out, writer)
    }

    #[test]
    fn test_nothing_written_before_flush() {
        let (mut out, writer) = output();
        out.write("hello");
        assert_eq!(writer.contents(), "");
        out.flush().unwrap();
        assert_eq!(writer.contents(), "hello");
        assert_eq!(out.buffered(), "");
    }

    #[test]
    fn test_write_escapes_control_sequences() {
        let (mut out, _) = output();
        out.write("a\x1b[2Jb");
        assert_eq!(out.buffered(), "a?[2Jb");
        out.write_raw("\x1b[2J");
        assert!(out.buffered().ends_with("\x1b[2J"));
    }

    #[test]
    fn test_cursor_movement() {
        let (mut out, _) = output();
        out.goto(2, 5);
        assert_eq!(out.buffered(), "\x1b[3;6H");
        let (mut out, _) = output();
        out.cursor_up(0);
        out.cursor_down(0);
        out.cursor_left(1);
        out.cursor_right(3);
        assert_eq!(out.buffered(), "\x08\x1b[3C");
    }

    #[test]
    fn test_erase_and_modes() {
        let (mut out, _) = output();
        out.erase_end_of_line();
        out.erase_down();
        out.disable_autowrap();
        out.enter_alternate_screen();
        out.enable_bracketed_paste();
        assert_eq!(
            out.buffered(),
            "\x1b[K\x1b[J\x1b[?7l\x1b[?1049h\x1b[1;1H\x1b[?2004h"
        );
    }

    #[test]
    fn test_set_attributes() {
        let (mut out, _) = output();
        let attrs = Attrs {
            fg: Color::Ansi(AnsiColor::Red),
            bg: Color::Rgb(0xff, 0x88, 0x00),
            flags: AttrFlags::BOLD | AttrFlags::UNDERLINE,
        };
        out.set_attributes(&attrs, ColorDepth::Depth8Bit);
        assert_eq!(out.buffered(), "\x1b[0;1;4;31;48;5;208m");

        let (mut out, _) = output();
        out.set_attributes(&attrs, ColorDepth::Depth1Bit);
        assert_eq!(out.buffered(), "\x1b[0;1;4m");

        let (mut out, _) = output();
        out.set_attributes(&Attrs::DEFAULT, ColorDepth::Depth24Bit);
        assert_eq!(out.buffered(), "\x1b[0m");
    }

    #[test]
    fn test_bell_can_be_disabled() {
        let (out, _) = output();
        let mut out = out.with_bell(false);
        out.bell();
        assert_eq!(out.buffered(), "");
    }
}
