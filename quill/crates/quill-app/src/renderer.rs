//! Frame renderer with incremental output.
//!
//! Each frame draws the layout into a fresh [`Screen`] and writes only the
//! cells that differ from the previous frame. Outside full-screen mode the
//! application renders in place below the prompt line; the renderer then
//! asks the terminal where its cursor is (a cursor position request, CPR)
//! to learn how many rows are available below it.

use crate::context::AppContext;
use crate::layout::{Layout, MouseHandler, MouseHandlers};
use quill_core::color_depth::ColorDepth;
use quill_core::formatted_text::FormattedText;
use quill_core::geometry::{Point, Size};
use quill_core::style::{Attrs, Style};
use quill_output::{CursorShape, Output};
use quill_screen::{output_screen_diff, DiffOptions, Screen, WritePosition};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// How long to wait for a cursor position response before deciding the
/// terminal does not answer them.
pub const CPR_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether the terminal answers cursor position requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CprSupport {
    /// No request answered yet.
    Unknown,
    /// A response arrived.
    Supported,
    /// A request timed out.
    NotSupported,
}

/// Draws frames of a [`Layout`] to an [`Output`].
pub struct Renderer {
    output: Box<dyn Output>,
    full_screen: bool,
    mouse_support: bool,
    cursor_shape: CursorShape,

    in_alternate_screen: bool,
    mouse_enabled: bool,
    bracketed_paste_enabled: bool,
    cursor_key_mode_reset: bool,
    cursor_shape_set: bool,

    last_screen: Option<Screen>,
    last_size: Option<Size>,
    last_style: Option<Rc<str>>,
    cursor_pos: Point,
    mouse_handlers: MouseHandlers,

    min_available_height: usize,
    cpr_support: CprSupport,
    cpr_requested_at: Option<Instant>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("full_screen", &self.full_screen)
            .field("cursor_pos", &self.cursor_pos)
            .field("last_size", &self.last_size)
            .field("min_available_height", &self.min_available_height)
            .field("cpr_support", &self.cpr_support)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Creates a renderer writing to `output`.
    pub fn new(output: Box<dyn Output>, full_screen: bool) -> Self {
        Self {
            output,
            full_screen,
            mouse_support: false,
            cursor_shape: CursorShape::NeverChange,
            in_alternate_screen: false,
            mouse_enabled: false,
            bracketed_paste_enabled: false,
            cursor_key_mode_reset: false,
            cursor_shape_set: false,
            last_screen: None,
            last_size: None,
            last_style: None,
            cursor_pos: Point::ZERO,
            mouse_handlers: MouseHandlers::new(),
            min_available_height: 0,
            cpr_support: CprSupport::Unknown,
            cpr_requested_at: None,
        }
    }

    /// Enables mouse reporting while rendering.
    pub fn with_mouse_support(mut self, enable: bool) -> Self {
        self.mouse_support = enable;
        self
    }

    /// Sets the cursor shape shown while the application runs.
    pub fn with_cursor_shape(mut self, shape: CursorShape) -> Self {
        self.cursor_shape = shape;
        self
    }

    /// The output frames are written to.
    pub fn output(&self) -> &dyn Output {
        self.output.as_ref()
    }

    /// The output, mutably.
    pub fn output_mut(&mut self) -> &mut dyn Output {
        self.output.as_mut()
    }

    /// Whether the alternate screen is used.
    pub fn full_screen(&self) -> bool {
        self.full_screen
    }

    /// The last frame drawn, if any.
    pub fn last_screen(&self) -> Option<&Screen> {
        self.last_screen.as_ref()
    }

    /// Where the cursor was left, relative to the top left of the drawing
    /// area.
    pub fn cursor_position(&self) -> Point {
        self.cursor_pos
    }

    /// The mouse handler drawn at a layout cell.
    pub fn mouse_handler_at(&self, x: usize, y: usize) -> Option<MouseHandler> {
        self.mouse_handlers.get(x, y)
    }

    fn prepare_terminal(&mut self) {
        if self.full_screen && !self.in_alternate_screen {
            self.in_alternate_screen = true;
            self.output.enter_alternate_screen();
        }
        if !self.bracketed_paste_enabled {
            self.output.enable_bracketed_paste();
            self.bracketed_paste_enabled = true;
        }
        if !self.cursor_key_mode_reset {
            self.output.reset_cursor_key_mode();
            self.cursor_key_mode_reset = true;
        }
        if self.mouse_support && !self.mouse_enabled {
            self.output.enable_mouse_support();
            self.mouse_enabled = true;
        } else if !self.mouse_support && self.mouse_enabled {
            self.output.disable_mouse_support();
            self.mouse_enabled = false;
        }
        if self.cursor_shape != CursorShape::NeverChange && !self.cursor_shape_set {
            self.output.set_cursor_shape(self.cursor_shape);
            self.cursor_shape_set = true;
        }
    }

    /// Draws one frame.
    ///
    /// With `is_done` the frame is the last one of the run: the cursor is
    /// left below the content so that whatever is printed next starts on
    /// a fresh line.
    pub fn render(
        &mut self,
        ctx: &mut AppContext,
        layout: &mut Layout,
        style: &Style,
        color_depth: ColorDepth,
        is_done: bool,
    ) {
        self.prepare_terminal();

        let size = self.output.get_size();
        let width = size.columns;
        ctx.begin_tick();

        let height = if self.full_screen {
            size.rows
        } else {
            let preferred = layout.root_mut().preferred_height(ctx, width, size.rows).preferred;
            if is_done {
                preferred.min(size.rows)
            } else {
                let last_height = self.last_screen.as_ref().map_or(0, Screen::height);
                preferred
                    .max(last_height)
                    .max(self.min_available_height)
                    .min(size.rows)
            }
        };

        if self.last_size != Some(size) {
            tracing::debug!(rows = size.rows, columns = size.columns, "terminal size changed, full redraw");
            self.last_screen = None;
        }

        let mut screen = Screen::new(width, height);
        screen.show_cursor = false;
        let mut mouse_handlers = MouseHandlers::new();
        layout.root_mut().write_to_screen(
            ctx,
            &mut screen,
            &mut mouse_handlers,
            WritePosition::new(0, 0, width, height),
            "",
            false,
            None,
        );

        let exit_style = ctx.exit_style();
        if !exit_style.is_empty() {
            screen.append_style_to_content(&exit_style);
        }

        let cursor = ctx
            .focused_window()
            .map_or(Point::ZERO, |id| screen.get_cursor_position(id));

        self.output.hide_cursor();
        let state = output_screen_diff(
            self.output.as_mut(),
            &screen,
            style,
            self.last_style.take(),
            DiffOptions {
                previous_screen: self.last_screen.as_ref(),
                previous_width: self.last_size.map_or(0, |s| s.columns),
                current_pos: self.cursor_pos,
                size,
                cursor,
                color_depth,
                full_screen: self.full_screen,
                is_done,
            },
        );
        self.cursor_pos = state.cursor;
        self.last_style = state.last_style;
        self.last_size = Some(size);
        self.mouse_handlers = mouse_handlers;

        if let Err(e) = self.output.flush() {
            tracing::warn!("failed to flush output: {e}");
        }

        ctx.size = size;
        ctx.render_counter += 1;
        ctx.window_heights = layout.window_heights();
        ctx.after_frame(screen.visible_windows().to_vec());
        self.last_screen = Some(screen);
        ctx.height_is_known = self.height_is_known();
        ctx.rows_above_layout = self.rows_above_layout();

        // The next frame of a new run starts from scratch.
        if is_done {
            self.reset(true);
        }
    }

    /// Removes the application's output from the terminal and resets the
    /// renderer, so the next frame is drawn from scratch.
    pub fn erase(&mut self, leave_alternate_screen: bool) {
        self.output.cursor_left(self.cursor_pos.x);
        self.output.cursor_up(self.cursor_pos.y);
        self.output.erase_down();
        self.output.reset_attributes();
        self.output.enable_autowrap();
        if let Err(e) = self.output.flush() {
            tracing::warn!("failed to flush output: {e}");
        }
        self.reset(leave_alternate_screen);
    }

    /// Clears the whole terminal; the next frame is drawn at the top.
    pub fn clear(&mut self) {
        self.erase(true);
        self.output.erase_screen();
        self.output.goto(0, 0);
        if let Err(e) = self.output.flush() {
            tracing::warn!("failed to flush output: {e}");
        }
        self.request_absolute_cursor_position();
    }

    /// Forgets the previous frame and restores terminal modes the renderer
    /// changed.
    pub fn reset(&mut self, leave_alternate_screen: bool) {
        self.cursor_pos = Point::ZERO;
        self.last_screen = None;
        self.last_size = None;
        self.last_style = None;
        self.mouse_handlers = MouseHandlers::new();
        self.min_available_height = 0;

        if self.in_alternate_screen && leave_alternate_screen {
            self.output.quit_alternate_screen();
            self.in_alternate_screen = false;
        }
        if self.mouse_enabled {
            self.output.disable_mouse_support();
            self.mouse_enabled = false;
        }
        if self.bracketed_paste_enabled {
            self.output.disable_bracketed_paste();
            self.bracketed_paste_enabled = false;
        }
        if self.cursor_shape_set {
            self.output.reset_cursor_shape();
            self.cursor_shape_set = false;
        }
        self.cursor_key_mode_reset = false;
        self.output.show_cursor();
        if let Err(e) = self.output.flush() {
            tracing::warn!("failed to flush output: {e}");
        }
    }

    // === Available height ===

    /// Asks the terminal for the cursor row. Only meaningful right after a
    /// reset, while the cursor sits at the start of the drawing area.
    pub fn request_absolute_cursor_position(&mut self) {
        if self.full_screen || self.cursor_pos.y != 0 {
            return;
        }
        match self.cpr_support {
            CprSupport::NotSupported => {}
            CprSupport::Supported => {
                self.output.ask_for_cpr();
                self.cpr_requested_at = Some(Instant::now());
            }
            CprSupport::Unknown => {
                if self.cpr_requested_at.is_none() && self.output.responds_to_cpr() {
                    self.output.ask_for_cpr();
                    self.cpr_requested_at = Some(Instant::now());
                }
            }
        }
        if let Err(e) = self.output.flush() {
            tracing::warn!("failed to flush output: {e}");
        }
    }

    /// Records the 1-based cursor row the terminal reported.
    pub fn report_absolute_cursor_row(&mut self, row: usize) {
        self.cpr_support = CprSupport::Supported;
        self.cpr_requested_at = None;
        let total_rows = self.output.get_size().rows;
        self.min_available_height = (total_rows + 1).saturating_sub(row);
    }

    /// Returns true while a cursor position request is unanswered.
    pub fn waiting_for_cpr(&self) -> bool {
        self.cpr_requested_at.is_some()
    }

    /// When an unanswered request times out.
    pub fn cpr_deadline(&self) -> Option<Instant> {
        self.cpr_requested_at.map(|t| t + CPR_TIMEOUT)
    }

    /// Gives up on an unanswered request once [`CPR_TIMEOUT`] passed.
    /// Returns true the first time the terminal is found not to answer.
    pub fn check_cpr_timeout(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.cpr_deadline() else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.cpr_requested_at = None;
        if self.cpr_support == CprSupport::Unknown {
            tracing::debug!("terminal does not answer cursor position requests");
            self.cpr_support = CprSupport::NotSupported;
            return true;
        }
        false
    }

    /// Whether the terminal answers cursor position requests.
    pub fn cpr_support(&self) -> CprSupport {
        self.cpr_support
    }

    /// Returns true when the rows available below the prompt are known.
    pub fn height_is_known(&self) -> bool {
        self.full_screen || self.min_available_height > 0
    }

    /// Terminal rows above the drawing area, when known.
    pub fn rows_above_layout(&self) -> Option<usize> {
        if self.in_alternate_screen {
            return Some(0);
        }
        if self.min_available_height == 0 {
            return None;
        }
        let total_rows = self.output.get_size().rows;
        let last_height = self.last_screen.as_ref().map_or(0, Screen::height);
        Some(total_rows.saturating_sub(self.min_available_height.max(last_height)))
    }
}

/// Prints formatted text at the cursor without drawing a frame.
///
/// Newlines become `\r\n` so the output works in raw mode; fragments
/// marked as zero-width escapes are written untouched.
pub fn print_formatted_text(output: &mut dyn Output, text: &FormattedText, style: &Style, color_depth: ColorDepth) {
    output.reset_attributes();
    output.enable_autowrap();
    let mut last_attrs: Option<Attrs> = None;

    for fragment in text.iter() {
        let attrs = style.attrs_for_style_str(&fragment.style);
        if last_attrs != Some(attrs) {
            if attrs == Attrs::DEFAULT {
                output.reset_attributes();
            } else {
                output.set_attributes(&attrs, color_depth);
            }
            last_attrs = Some(attrs);
        }
        if fragment.is_zero_width_escape() {
            output.write_raw(&fragment.text);
        } else {
            output.write(&fragment.text.replace('\r', "").replace('\n', "\r\n"));
        }
    }

    output.reset_attributes();
    if let Err(e) = output.flush() {
        tracing::warn!("failed to flush output: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::layout::{FormattedTextControl, HSplit, Window};
    use pretty_assertions::assert_eq;
    use quill_core::formatted_text::Fragment;
    use quill_output::{MemoryWriter, Vt100Output};

    fn output(writer: &MemoryWriter, rows: usize) -> Box<dyn Output> {
        Box::new(
            Vt100Output::new(writer.clone(), move || Size::new(rows, 20))
                .with_default_color_depth(ColorDepth::Depth8Bit)
                .with_cpr(true),
        )
    }

    fn layout(lines: &[&str]) -> Layout {
        let windows = lines
            .iter()
            .map(|l| Box::new(Window::new(FormattedTextControl::new(*l))) as crate::layout::ContainerRef)
            .collect();
        Layout::new(HSplit::new(windows))
    }

    #[test]
    fn test_first_frame_and_incremental_update() {
        let writer = MemoryWriter::new();
        let mut renderer = Renderer::new(output(&writer, 10), false);
        let mut ctx = test_context();
        let mut layout = layout(&["hello", "world"]);
        ctx.set_windows(layout.collect_windows().unwrap());

        renderer.render(&mut ctx, &mut layout, &Style::new(), ColorDepth::Depth8Bit, false);
        let first = writer.take();
        assert!(first.contains("hello"));
        assert!(first.contains("world"));
        assert!(first.contains("\x1b[?2004h"));
        assert_eq!(ctx.render_counter, 1);
        assert_eq!(ctx.visible_windows.len(), 2);
        assert_eq!(renderer.last_screen().map(Screen::height), Some(2));

        renderer.render(&mut ctx, &mut layout, &Style::new(), ColorDepth::Depth8Bit, false);
        let second = writer.take();
        assert!(!second.contains("hello"));
        assert_eq!(ctx.render_counter, 2);
    }

    #[test]
    fn test_full_screen_uses_alternate_screen() {
        let writer = MemoryWriter::new();
        let mut renderer = Renderer::new(output(&writer, 4), true);
        let mut ctx = test_context();
        let mut layout = layout(&["x"]);
        ctx.set_windows(layout.collect_windows().unwrap());

        renderer.render(&mut ctx, &mut layout, &Style::new(), ColorDepth::Depth8Bit, false);
        assert!(writer.take().contains("\x1b[?1049h"));
        assert_eq!(renderer.last_screen().map(Screen::height), Some(4));
        assert_eq!(renderer.rows_above_layout(), Some(0));
        assert!(renderer.height_is_known());

        renderer.reset(true);
        let restored = writer.take();
        assert!(restored.contains("\x1b[?1049l"));
        assert!(restored.contains("\x1b[?2004l"));
        assert!(renderer.last_screen().is_none());
    }

    #[test]
    fn test_cursor_position_report_sets_available_height() {
        let writer = MemoryWriter::new();
        let mut renderer = Renderer::new(output(&writer, 24), false);
        assert!(!renderer.height_is_known());

        renderer.request_absolute_cursor_position();
        assert!(renderer.waiting_for_cpr());
        assert!(writer.take().contains("\x1b[6n"));

        renderer.report_absolute_cursor_row(20);
        assert!(!renderer.waiting_for_cpr());
        assert_eq!(renderer.cpr_support(), CprSupport::Supported);
        assert!(renderer.height_is_known());
        assert_eq!(renderer.rows_above_layout(), Some(19));
    }

    #[test]
    fn test_unanswered_request_times_out() {
        let writer = MemoryWriter::new();
        let mut renderer = Renderer::new(output(&writer, 24), false);
        renderer.request_absolute_cursor_position();

        let now = Instant::now();
        assert!(!renderer.check_cpr_timeout(now));
        assert!(renderer.check_cpr_timeout(now + CPR_TIMEOUT + Duration::from_millis(1)));
        assert_eq!(renderer.cpr_support(), CprSupport::NotSupported);
        assert!(!renderer.height_is_known());

        // No further requests once the terminal is known not to answer.
        writer.take();
        renderer.request_absolute_cursor_position();
        assert!(!writer.take().contains("\x1b[6n"));
    }

    #[test]
    fn test_print_formatted_text() {
        let writer = MemoryWriter::new();
        let mut out = output(&writer, 5);
        let text = FormattedText::from_fragments(vec![
            Fragment::plain("a\nb"),
            Fragment::new("[ZeroWidthEscape]", "\x1b]2;t\x07"),
        ]);
        print_formatted_text(out.as_mut(), &text, &Style::new(), ColorDepth::Depth8Bit);
        let written = writer.contents();
        assert!(written.contains("a\r\nb"));
        assert!(written.contains("\x1b]2;t\x07"));
    }

    #[test]
    fn test_erase_moves_back_to_origin() {
        let writer = MemoryWriter::new();
        let mut renderer = Renderer::new(output(&writer, 10), false);
        let mut ctx = test_context();
        let mut layout = layout(&["one", "two"]);
        ctx.set_windows(layout.collect_windows().unwrap());
        renderer.render(&mut ctx, &mut layout, &Style::new(), ColorDepth::Depth8Bit, false);
        writer.take();

        renderer.erase(true);
        assert!(writer.take().contains("\x1b[J"));
        assert_eq!(renderer.cursor_position(), Point::ZERO);
        assert!(renderer.last_screen().is_none());
    }
}
