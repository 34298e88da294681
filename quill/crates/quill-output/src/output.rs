//! The `Output` abstraction.

use quill_core::color_depth::ColorDepth;
use quill_core::geometry::Size;
use quill_core::style::Attrs;
use std::io;

/// Cursor shapes an output can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorShape {
    /// Leave the shape alone.
    #[default]
    NeverChange,
    /// Steady block.
    Block,
    /// Steady vertical bar.
    Beam,
    /// Steady underline.
    Underline,
    /// Blinking block.
    BlinkingBlock,
    /// Blinking vertical bar.
    BlinkingBeam,
    /// Blinking underline.
    BlinkingUnderline,
}

/// A terminal (or something pretending to be one) that receives output.
///
/// Everything except [`Output::flush`] only appends to an internal buffer;
/// nothing reaches the terminal until `flush` is called.
pub trait Output: Send {
    /// The file descriptor written to, if any.
    fn fileno(&self) -> Option<i32>;

    /// Writes text, replacing escape characters so it cannot inject
    /// control sequences.
    fn write(&mut self, data: &str);

    /// Writes text verbatim.
    fn write_raw(&mut self, data: &str);

    /// Sets the terminal title.
    fn set_title(&mut self, title: &str);

    /// Clears the terminal title.
    fn clear_title(&mut self) {
        self.set_title("");
    }

    /// Erases the whole screen. The cursor does not move.
    fn erase_screen(&mut self);

    /// Switches to the alternate screen buffer.
    fn enter_alternate_screen(&mut self);

    /// Switches back from the alternate screen buffer.
    fn quit_alternate_screen(&mut self);

    /// Enables mouse reporting.
    fn enable_mouse_support(&mut self);

    /// Disables mouse reporting.
    fn disable_mouse_support(&mut self);

    /// Erases from the cursor to the end of the line.
    fn erase_end_of_line(&mut self);

    /// Erases from the cursor to the end of the screen.
    fn erase_down(&mut self);

    /// Resets colors and decorations.
    fn reset_attributes(&mut self);

    /// Sets the attributes for following text, downgraded to `depth`.
    fn set_attributes(&mut self, attrs: &Attrs, depth: ColorDepth);

    /// Stops the terminal from wrapping at the right margin.
    fn disable_autowrap(&mut self);

    /// Re-enables wrapping at the right margin.
    fn enable_autowrap(&mut self);

    /// Moves the cursor to a zero-based row and column.
    fn goto(&mut self, row: usize, column: usize);

    /// Moves the cursor up `n` rows.
    fn cursor_up(&mut self, n: usize);

    /// Moves the cursor down `n` rows.
    fn cursor_down(&mut self, n: usize);

    /// Moves the cursor left `n` columns.
    fn cursor_left(&mut self, n: usize);

    /// Moves the cursor right `n` columns.
    fn cursor_right(&mut self, n: usize);

    /// Hides the cursor.
    fn hide_cursor(&mut self);

    /// Shows the cursor.
    fn show_cursor(&mut self);

    /// Sets the cursor shape.
    fn set_cursor_shape(&mut self, shape: CursorShape);

    /// Restores the terminal's default cursor shape.
    fn reset_cursor_shape(&mut self);

    /// Asks the terminal to report the cursor position. The answer arrives
    /// on the input side as a cursor position response key.
    fn ask_for_cpr(&mut self);

    /// Returns true if this output is expected to answer
    /// [`Output::ask_for_cpr`].
    fn responds_to_cpr(&self) -> bool;

    /// Current size of the output.
    fn get_size(&self) -> Size;

    /// Rings the bell.
    fn bell(&mut self);

    /// Enables bracketed paste.
    fn enable_bracketed_paste(&mut self);

    /// Disables bracketed paste.
    fn disable_bracketed_paste(&mut self);

    /// Puts the cursor keys back in normal (non-application) mode.
    fn reset_cursor_key_mode(&mut self);

    /// The color depth to use when nothing more specific is configured.
    fn get_default_color_depth(&self) -> ColorDepth;

    /// Writes the buffered output.
    fn flush(&mut self) -> io::Result<()>;
}
