//! Screen-cell to mouse handler map built while drawing a frame.

use crate::context::AppContext;
use quill_input::MouseEvent;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Handles a mouse event; returns false when the event was not used.
pub type MouseHandler = Rc<dyn Fn(&mut AppContext, MouseEvent) -> bool>;

/// The handler registered for each screen cell. Later registrations
/// replace earlier ones, so whatever was drawn last receives the click.
#[derive(Default, Clone)]
pub struct MouseHandlers {
    cells: HashMap<(usize, usize), MouseHandler>,
}

impl fmt::Debug for MouseHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MouseHandlers")
            .field("cells", &self.cells.len())
            .finish()
    }
}

impl MouseHandlers {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for the cells `x_min..x_max` by `y_min..y_max`.
    pub fn set_mouse_handler_for_range(
        &mut self,
        x_min: usize,
        x_max: usize,
        y_min: usize,
        y_max: usize,
        handler: &MouseHandler,
    ) {
        for y in y_min..y_max {
            for x in x_min..x_max {
                self.cells.insert((x, y), Rc::clone(handler));
            }
        }
    }

    /// The handler for a cell.
    pub fn get(&self, x: usize, y: usize) -> Option<MouseHandler> {
        self.cells.get(&(x, y)).cloned()
    }

    /// Drops all handlers.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Returns true if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_registration_wins() {
        let mut handlers = MouseHandlers::new();
        let first: MouseHandler = Rc::new(|_, _| false);
        let second: MouseHandler = Rc::new(|_, _| true);
        handlers.set_mouse_handler_for_range(0, 4, 0, 2, &first);
        handlers.set_mouse_handler_for_range(2, 3, 1, 2, &second);

        let at = |x, y| handlers.get(x, y).map(|h| Rc::ptr_eq(&h, &second));
        assert_eq!(at(2, 1), Some(true));
        assert_eq!(at(1, 1), Some(false));
        assert_eq!(at(9, 9), None);
    }
}
