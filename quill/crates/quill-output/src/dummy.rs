//! An output that discards everything.

use crate::output::{CursorShape, Output};
use quill_core::color_depth::ColorDepth;
use quill_core::geometry::Size;
use quill_core::style::Attrs;
use std::io;

/// Output that ignores all calls. Reports a fixed size.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyOutput {
    size: Size,
}

impl DummyOutput {
    /// Creates a dummy output reporting 80x24.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dummy output reporting `size`.
    pub fn with_size(size: Size) -> Self {
        Self { size }
    }
}

impl Output for DummyOutput {
    fn fileno(&self) -> Option<i32> {
        None
    }
    fn write(&mut self, _data: &str) {}
    fn write_raw(&mut self, _data: &str) {}
    fn set_title(&mut self, _title: &str) {}
    fn erase_screen(&mut self) {}
    fn enter_alternate_screen(&mut self) {}
    fn quit_alternate_screen(&mut self) {}
    fn enable_mouse_support(&mut self) {}
    fn disable_mouse_support(&mut self) {}
    fn erase_end_of_line(&mut self) {}
    fn erase_down(&mut self) {}
    fn reset_attributes(&mut self) {}
    fn set_attributes(&mut self, _attrs: &Attrs, _depth: ColorDepth) {}
    fn disable_autowrap(&mut self) {}
    fn enable_autowrap(&mut self) {}
    fn goto(&mut self, _row: usize, _column: usize) {}
    fn cursor_up(&mut self, _n: usize) {}
    fn cursor_down(&mut self, _n: usize) {}
    fn cursor_left(&mut self, _n: usize) {}
    fn cursor_right(&mut self, _n: usize) {}
    fn hide_cursor(&mut self) {}
    fn show_cursor(&mut self) {}
    fn set_cursor_shape(&mut self, _shape: CursorShape) {}
    fn reset_cursor_shape(&mut self) {}
    fn ask_for_cpr(&mut self) {}

    fn responds_to_cpr(&self) -> bool {
        false
    }

    fn get_size(&self) -> Size {
        self.size
    }

    fn bell(&mut self) {}
    fn enable_bracketed_paste(&mut self) {}
    fn disable_bracketed_paste(&mut self) {}
    fn reset_cursor_key_mode(&mut self) {}

    fn get_default_color_depth(&self) -> ColorDepth {
        ColorDepth::Depth1Bit
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
