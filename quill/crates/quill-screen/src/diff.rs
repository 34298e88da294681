//! Incremental screen output.
//!
//! [`output_screen_diff`] compares a freshly drawn [`Screen`] with the one
//! drawn before it and writes only the cells that changed. The terminal's
//! autowrap is disabled while drawing, so writing into the last column never
//! scrolls; downward cursor moves are written as `\r\n` so that output in
//! non-full-screen mode pushes the terminal content up when it grows.

use crate::char::Char;
use crate::screen::Screen;
use quill_core::color_depth::ColorDepth;
use quill_core::geometry::{Point, Size};
use quill_core::style::{Attrs, Style};
use quill_output::Output;
use std::rc::Rc;

/// Inputs describing the frame being drawn.
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions<'a> {
    /// The screen drawn last time, or `None` for a full redraw.
    pub previous_screen: Option<&'a Screen>,
    /// Width of the terminal when the previous screen was drawn.
    pub previous_width: usize,
    /// Where the cursor was left after the previous frame, relative to the
    /// top left of the drawing area.
    pub current_pos: Point,
    /// Terminal size.
    pub size: Size,
    /// Where the cursor should end up.
    pub cursor: Point,
    /// Depth colors are downgraded to.
    pub color_depth: ColorDepth,
    /// Whether the alternate screen is in use.
    pub full_screen: bool,
    /// Final frame: leave the cursor below the content.
    pub is_done: bool,
}

/// What the next frame needs to know.
#[derive(Debug, Clone, Default)]
pub struct DiffState {
    /// Cursor position after drawing, relative to the drawing area.
    pub cursor: Point,
    /// Style string of the last written cell; `None` after a reset.
    pub last_style: Option<Rc<str>>,
}

struct Writer<'a> {
    output: &'a mut dyn Output,
    style: &'a Style,
    depth: ColorDepth,
    width: usize,
    pos: Point,
    last_style: Option<Rc<str>>,
    last_attrs: Option<Attrs>,
}

impl Writer<'_> {
    fn reset_attributes(&mut self) {
        self.output.reset_attributes();
        self.last_style = None;
        self.last_attrs = None;
    }

    fn move_cursor(&mut self, new: Point) {
        let Point { x, y } = self.pos;
        if new.y > y {
            self.reset_attributes();
            self.output.write_raw(&"\r\n".repeat(new.y - y));
            self.output.cursor_right(new.x);
            self.pos = new;
            return;
        }
        if new.y < y {
            self.output.cursor_up(y - new.y);
        }
        // Past the last column the terminal cursor sits in that column.
        if x >= self.width {
            self.output.write_raw("\r");
            self.output.cursor_right(new.x);
        } else if new.x < x {
            self.output.cursor_left(x - new.x);
        } else if new.x > x {
            self.output.cursor_right(new.x - x);
        }
        self.pos = new;
    }

    fn output_char(&mut self, c: &Char) {
        if self.last_style.as_deref() != Some(&*c.style) {
            let attrs = self.style.attrs_for_style_str(&c.style);
            if self.last_attrs != Some(attrs) {
                self.output.set_attributes(&attrs, self.depth);
                self.last_attrs = Some(attrs);
            }
            self.last_style = Some(Rc::clone(&c.style));
        }
        self.output.write(&c.text);
        self.pos = self.pos.with_x(self.pos.x + c.width);
    }
}

fn max_column_index(screen: &Screen, y: usize, style: &Style) -> usize {
    let Some(row) = screen.row(y) else {
        return 0;
    };
    row.iter()
        .enumerate()
        .rev()
        .find(|(_, c)| {
            !c.is_placeholder()
                && (&*c.text != " " || style.attrs_for_style_str(&c.style) != Attrs::DEFAULT)
        })
        .map_or(0, |(i, _)| i)
}

/// Writes the difference between the previous screen and `screen`.
pub fn output_screen_diff(
    output: &mut dyn Output,
    screen: &Screen,
    style: &Style,
    last_style: Option<Rc<str>>,
    options: DiffOptions<'_>,
) -> DiffState {
    let width = options.size.columns;
    let height = options.size.rows;
    let mut w = Writer {
        output,
        style,
        depth: options.color_depth,
        width,
        pos: options.current_pos,
        last_style,
        last_attrs: None,
    };
    if let Some(last) = w.last_style.clone() {
        w.last_attrs = Some(style.attrs_for_style_str(&last));
    }

    let mut previous = options.previous_screen;
    if previous.is_none() {
        w.reset_attributes();
    }
    if previous.is_none() || !options.full_screen {
        w.output.disable_autowrap();
    }

    let empty = Screen::new(width, 0);
    if options.is_done || previous.is_none() || options.previous_width != width {
        tracing::trace!(width, height, is_done = options.is_done, "repainting whole screen");
        w.move_cursor(Point::ZERO);
        w.reset_attributes();
        w.output.erase_down();
        previous = Some(&empty);
    }
    let previous = previous.unwrap_or(&empty);

    let current_height = screen.height().min(height);
    let row_count = screen.height().max(previous.height()).min(height);

    for y in 0..row_count {
        let new_max = max_column_index(screen, y, style).min(width.saturating_sub(1));
        let old_max = max_column_index(previous, y, style).min(width.saturating_sub(1));

        let mut x = 0;
        while x <= new_max {
            let new_char = screen.get(x, y);
            let old_char = previous.get(x, y);
            let char_width = new_char.width.max(1);
            if new_char.text != old_char.text || new_char.style != old_char.style {
                w.move_cursor(Point::new(x, y));
                if let Some(escape) = screen.zero_width_escape(x, y) {
                    w.output.write_raw(escape);
                }
                w.output_char(new_char);
            }
            x += char_width;
        }

        if new_max < old_max {
            w.move_cursor(Point::new(new_max + 1, y));
            w.reset_attributes();
            w.output.erase_end_of_line();
        }
    }

    // Reserve the rows the layout asked for, so the terminal scrolls even
    // when the last rows are blank.
    if current_height > previous.height() {
        w.move_cursor(Point::new(0, current_height - 1));
    }

    if options.is_done {
        w.move_cursor(Point::new(0, current_height));
        w.output.erase_down();
    } else {
        w.move_cursor(options.cursor);
    }

    if options.is_done || !options.full_screen {
        w.output.enable_autowrap();
    }
    w.reset_attributes();
    if screen.show_cursor || options.is_done {
        w.output.show_cursor();
    }

    DiffState {
        cursor: w.pos,
        last_style: w.last_style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_output::{MemoryWriter, Vt100Output};

    fn output() -> Vt100Output<MemoryWriter> {
        Vt100Output::new(MemoryWriter::new(), || Size::new(5, 10))
            .with_default_color_depth(ColorDepth::Depth8Bit)
    }

    fn opts(previous: Option<&Screen>) -> DiffOptions<'_> {
        DiffOptions {
            previous_screen: previous,
            previous_width: 10,
            current_pos: Point::ZERO,
            size: Size::new(5, 10),
            cursor: Point::ZERO,
            color_depth: ColorDepth::Depth8Bit,
            full_screen: false,
            is_done: false,
        }
    }

    fn screen_with(text: &str) -> Screen {
        let mut screen = Screen::new(10, 1);
        screen.write_str(0, 0, text, &Rc::from(""), 10);
        screen
    }

    #[test]
    fn test_first_frame_writes_everything() {
        let mut out = output();
        let screen = screen_with("hi");
        let mut options = opts(None);
        options.cursor = Point::new(2, 0);
        let state = output_screen_diff(&mut out, &screen, &Style::new(), None, options);
        let written = out.buffered().to_string();
        assert!(written.contains("hi"));
        assert!(written.contains("\x1b[J"));
        assert_eq!(state.cursor, Point::new(2, 0));
    }

    #[test]
    fn test_unchanged_cells_are_skipped() {
        let mut out = output();
        let before = screen_with("hello");
        let after = screen_with("help!");
        let mut options = opts(Some(&before));
        options.current_pos = Point::new(5, 0);
        options.cursor = Point::new(5, 0);
        output_screen_diff(&mut out, &after, &Style::new(), None, options);
        let written = out.buffered();
        assert!(written.contains("p!"));
        assert!(!written.contains("hel"));
    }

    #[test]
    fn test_shorter_line_erases_rest() {
        let mut out = output();
        let before = screen_with("hello");
        let after = screen_with("he");
        let mut options = opts(Some(&before));
        options.current_pos = Point::new(5, 0);
        output_screen_diff(&mut out, &after, &Style::new(), None, options);
        assert!(out.buffered().contains("\x1b[K"));
    }

    #[test]
    fn test_done_moves_below_content() {
        let mut out = output();
        let mut screen = screen_with("abc");
        screen.ensure_height(2);
        let mut options = opts(Some(&screen));
        options.is_done = true;
        let state = output_screen_diff(&mut out, &screen, &Style::new(), None, options);
        assert_eq!(state.cursor, Point::new(0, 2));
        assert!(out.buffered().ends_with("\x1b[?25h"));
    }

    #[test]
    fn test_last_column_is_reached_without_carriage_return() {
        let mut out = output();
        let before = screen_with("abcdefghi");
        let after = screen_with("abcdefghij");
        let mut options = opts(Some(&before));
        options.current_pos = Point::new(9, 0);
        options.cursor = Point::new(2, 0);
        let state = output_screen_diff(&mut out, &after, &Style::new(), None, options);
        let written = out.buffered().to_string();
        assert!(!written.contains("\r\x1b[9C"), "{written:?}");
        assert_eq!(written.matches('\r').count(), 1);
        assert_eq!(state.cursor, Point::new(2, 0));
    }

    #[test]
    fn test_styles_emitted_once_per_run() {
        let mut out = output();
        let mut screen = Screen::new(10, 1);
        screen.write_str(0, 0, "ab", &Rc::from("bold"), 10);
        output_screen_diff(&mut out, &screen, &Style::new(), None, opts(None));
        assert_eq!(out.buffered().matches("\x1b[0;1m").count(), 1);
    }
}
