//! Text selection state.

/// Shape of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionType {
    /// Characters between the anchor and the cursor.
    #[default]
    Characters,
    /// Whole lines touched by the selection.
    Lines,
    /// A rectangle spanning the anchor's and the cursor's columns.
    Block,
}

/// An active selection. The cursor is its moving end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    /// Where the selection started, as a character index.
    pub original_cursor_position: usize,
    /// Shape of the selection.
    pub selection_type: SelectionType,
    /// Set when the selection was started by a shift+movement key, so that
    /// the next plain movement ends it.
    pub shift_mode: bool,
}

impl SelectionState {
    /// Creates a selection anchored at `original_cursor_position`.
    #[inline]
    pub const fn new(original_cursor_position: usize, selection_type: SelectionType) -> Self {
        Self {
            original_cursor_position,
            selection_type,
            shift_mode: false,
        }
    }

    /// Marks the selection as started with shift.
    pub fn enter_shift_mode(&mut self) {
        self.shift_mode = true;
    }
}
