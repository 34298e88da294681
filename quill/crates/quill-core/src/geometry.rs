//! Geometry types measured in character cells.
//!
//! - [`Point`]: a cell position (`x` = column, `y` = row)
//! - [`Size`]: terminal or region dimensions in rows and columns

use std::fmt;

/// A cell position. Rows and columns are zero based.
///
/// ```
/// use quill_core::geometry::Point;
///
/// let p = Point::new(3, 1).offset(2, 1);
/// assert_eq!(p, Point::new(5, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Point {
    /// The column.
    pub x: usize,
    /// The row.
    pub y: usize,
}

impl Point {
    /// The origin point (0, 0).
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Creates a new point.
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns the point moved right by `dx` and down by `dy`.
    #[inline]
    pub const fn offset(self, dx: usize, dy: usize) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Returns a copy with a different column.
    #[inline]
    pub const fn with_x(self, x: usize) -> Self {
        Self { x, y: self.y }
    }

    /// Returns a copy with a different row.
    #[inline]
    pub const fn with_y(self, y: usize) -> Self {
        Self { x: self.x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of a terminal or a screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub columns: usize,
}

impl Size {
    /// Creates a new size.
    #[inline]
    pub const fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    /// Returns true when either dimension is zero.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    /// Total number of cells.
    #[inline]
    pub const fn area(self) -> usize {
        self.rows * self.columns
    }
}

impl Default for Size {
    /// The classic 24x80 terminal.
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}
