//! The cell grid one frame is drawn into.

use crate::char::{empty_style, Char};
use quill_core::geometry::Point;
use quill_core::id::WindowId;
use quill_core::width::char_width;
use std::collections::HashMap;
use std::rc::Rc;

/// A rectangle of the screen handed to a container for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WritePosition {
    /// Left column.
    pub xpos: usize,
    /// Top row.
    pub ypos: usize,
    /// Width in cells.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
}

impl WritePosition {
    /// Creates a write position.
    #[inline]
    pub const fn new(xpos: usize, ypos: usize, width: usize, height: usize) -> Self {
        Self {
            xpos,
            ypos,
            width,
            height,
        }
    }

    /// Returns true if the point lies inside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.xpos
            && p.x < self.xpos + self.width
            && p.y >= self.ypos
            && p.y < self.ypos + self.height
    }
}

/// A two-dimensional grid of [`Char`] cells plus the cursor and menu
/// anchors reported by the windows drawn into it.
///
/// Rows are allocated as they are written; every allocated row is exactly
/// [`Screen::width`] cells wide.
#[derive(Debug, Clone)]
pub struct Screen {
    width: usize,
    height: usize,
    rows: Vec<Vec<Char>>,
    default_char: Char,
    zero_width_escapes: HashMap<(usize, usize), String>,
    cursor_positions: HashMap<WindowId, Point>,
    menu_positions: HashMap<WindowId, Point>,
    visible_windows: Vec<WindowId>,
    /// Whether the cursor should be visible after drawing.
    pub show_cursor: bool,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Screen {
    /// Creates a screen of blank cells.
    pub fn new(width: usize, initial_height: usize) -> Self {
        Self::with_default_char(width, initial_height, Char::default())
    }

    /// Creates a screen whose unwritten cells are `default_char`.
    pub fn with_default_char(width: usize, initial_height: usize, default_char: Char) -> Self {
        Self {
            width,
            height: initial_height,
            rows: Vec::new(),
            default_char,
            zero_width_escapes: HashMap::new(),
            cursor_positions: HashMap::new(),
            menu_positions: HashMap::new(),
            visible_windows: Vec::new(),
            show_cursor: true,
        }
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows that have been drawn or reserved.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Grows the height to at least `height` rows.
    pub fn ensure_height(&mut self, height: usize) {
        self.height = self.height.max(height);
    }

    fn row_mut(&mut self, y: usize) -> &mut Vec<Char> {
        if self.rows.len() <= y {
            let blank = vec![self.default_char.clone(); self.width];
            self.rows.resize(y + 1, blank);
        }
        self.height = self.height.max(y + 1);
        &mut self.rows[y]
    }

    /// The cell at a position; the default cell outside the written area.
    pub fn get(&self, x: usize, y: usize) -> &Char {
        self.rows
            .get(y)
            .and_then(|row| row.get(x))
            .unwrap_or(&self.default_char)
    }

    /// Writes a cell. Writes right of the screen are dropped.
    pub fn set(&mut self, x: usize, y: usize, c: Char) {
        if x >= self.width {
            return;
        }
        self.row_mut(y)[x] = c;
    }

    /// Returns a written row, if any.
    pub fn row(&self, y: usize) -> Option<&[Char]> {
        self.rows.get(y).map(Vec::as_slice)
    }

    /// Writes `c` with its display width at `(x, y)` and returns the width
    /// used. Zero-width characters attach to the cell on their left; a wide
    /// character that does not fit is replaced by a blank.
    pub fn write_char(&mut self, x: usize, y: usize, c: char, style: &Rc<str>) -> usize {
        if char_width(c) == 0 && !c.is_control() {
            if x > 0 && x <= self.width {
                let row = self.row_mut(y);
                let mut left = x - 1;
                while left > 0 && row[left].is_placeholder() {
                    left -= 1;
                }
                row[left].push_zero_width(c);
            }
            return 0;
        }
        let cell = Char::new(c, style);
        let width = cell.width;
        if x + width > self.width {
            if x < self.width {
                self.set(x, y, Char::blank(Rc::clone(style)));
            }
            return width;
        }
        self.set(x, y, cell);
        for dx in 1..width {
            self.set(x + dx, y, Char::placeholder());
        }
        width
    }

    /// Writes a string starting at `(x, y)`, clipped to `max_x`. Returns the
    /// column after the last written cell.
    pub fn write_str(&mut self, x: usize, y: usize, text: &str, style: &Rc<str>, max_x: usize) -> usize {
        let mut col = x;
        for c in text.chars() {
            if col >= max_x {
                break;
            }
            col += self.write_char(col, y, c, style);
        }
        col
    }

    /// Records an escape sequence to emit before the cell at `(x, y)`.
    pub fn add_zero_width_escape(&mut self, x: usize, y: usize, escape: &str) {
        self.zero_width_escapes
            .entry((y, x))
            .or_default()
            .push_str(escape);
    }

    /// Escape sequences attached to `(x, y)`.
    pub fn zero_width_escape(&self, x: usize, y: usize) -> Option<&str> {
        self.zero_width_escapes.get(&(y, x)).map(String::as_str)
    }

    /// Sets where a window wants the cursor.
    pub fn set_cursor_position(&mut self, window: WindowId, position: Point) {
        self.cursor_positions.insert(window, position);
    }

    /// Where a window wants the cursor, or the origin.
    pub fn get_cursor_position(&self, window: WindowId) -> Point {
        self.cursor_positions
            .get(&window)
            .copied()
            .unwrap_or(Point::ZERO)
    }

    /// Sets where a window wants completion menus anchored.
    pub fn set_menu_position(&mut self, window: WindowId, position: Point) {
        self.menu_positions.insert(window, position);
    }

    /// Menu anchor of a window, falling back to its cursor position.
    pub fn get_menu_position(&self, window: WindowId) -> Point {
        self.menu_positions
            .get(&window)
            .copied()
            .unwrap_or_else(|| self.get_cursor_position(window))
    }

    /// Marks a window as drawn in this frame.
    pub fn add_visible_window(&mut self, window: WindowId) {
        if !self.visible_windows.contains(&window) {
            self.visible_windows.push(window);
        }
    }

    /// Windows drawn in this frame, in drawing order.
    pub fn visible_windows(&self) -> &[WindowId] {
        &self.visible_windows
    }

    /// Adds `style` to every cell of an area, before or after the cell's own
    /// style.
    pub fn fill_area(&mut self, area: WritePosition, style: &str, after: bool) {
        if style.trim().is_empty() {
            return;
        }
        let right = (area.xpos + area.width).min(self.width);
        for y in area.ypos..area.ypos + area.height {
            let row = self.row_mut(y);
            for cell in &mut row[area.xpos.min(right)..right] {
                let merged = if after {
                    format!("{} {style}", cell.style)
                } else {
                    format!("{style} {}", cell.style)
                };
                cell.style = Rc::from(merged.trim());
            }
        }
    }

    /// Appends `style` to every written cell.
    pub fn append_style_to_content(&mut self, style: &str) {
        if style.trim().is_empty() {
            return;
        }
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                cell.style = Rc::from(format!("{} {style}", cell.style).trim());
            }
        }
    }

    /// Plain text of each row with trailing spaces removed.
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                let mut line = String::new();
                if let Some(row) = self.rows.get(y) {
                    for cell in row {
                        line.push_str(&cell.text);
                    }
                }
                line.trim_end().to_string()
            })
            .collect()
    }

    /// Resets the default char's style.
    pub fn set_default_style(&mut self, style: &str) {
        self.default_char = Char::blank(if style.is_empty() {
            empty_style()
        } else {
            Rc::from(style)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn style() -> Rc<str> {
        Rc::from("class:t")
    }

    #[test]
    fn test_rows_are_full_width() {
        let mut screen = Screen::new(10, 0);
        screen.set(3, 2, Char::new('x', &style()));
        assert_eq!(screen.height(), 3);
        assert_eq!(screen.row(2).unwrap().len(), 10);
        assert_eq!(screen.row(0).unwrap().len(), 10);
        screen.set(10, 0, Char::new('y', &style()));
        assert_eq!(screen.to_lines(), vec!["", "", "   x"]);
    }

    #[test]
    fn test_wide_chars_use_two_cells() {
        let mut screen = Screen::new(6, 1);
        let end = screen.write_str(0, 0, "a漢b", &style(), 6);
        assert_eq!(end, 4);
        assert!(screen.get(2, 0).is_placeholder());
        assert_eq!(&*screen.get(3, 0).text, "b");
        assert_eq!(screen.to_lines(), vec!["a漢b"]);
    }

    #[test]
    fn test_wide_char_at_right_edge_becomes_blank() {
        let mut screen = Screen::new(3, 1);
        screen.write_str(0, 0, "ab漢", &style(), 3);
        assert_eq!(&*screen.get(2, 0).text, " ");
    }

    #[test]
    fn test_zero_width_attaches_left() {
        let mut screen = Screen::new(5, 1);
        let end = screen.write_str(0, 0, "e\u{301}x", &style(), 5);
        assert_eq!(end, 2);
        assert_eq!(&*screen.get(0, 0).text, "e\u{301}");
        assert_eq!(&*screen.get(1, 0).text, "x");
    }

    #[test]
    fn test_cursor_and_menu_positions() {
        let mut screen = Screen::new(5, 1);
        let w = WindowId::new();
        assert_eq!(screen.get_cursor_position(w), Point::ZERO);
        screen.set_cursor_position(w, Point::new(2, 0));
        assert_eq!(screen.get_menu_position(w), Point::new(2, 0));
        screen.set_menu_position(w, Point::new(1, 0));
        assert_eq!(screen.get_menu_position(w), Point::new(1, 0));
    }

    #[test]
    fn test_fill_area() {
        let mut screen = Screen::new(4, 2);
        screen.fill_area(WritePosition::new(1, 0, 2, 1), "class:bg", false);
        assert_eq!(&*screen.get(1, 0).style, "class:bg");
        assert_eq!(&*screen.get(0, 0).style, "");
        screen.fill_area(WritePosition::new(1, 0, 1, 1), "reverse", true);
        assert_eq!(&*screen.get(1, 0).style, "class:bg reverse");
    }
}
