//! Typed event signals.
//!
//! A [`Signal`] holds a list of callbacks that are all called, in
//! subscription order, whenever the signal fires. Handlers subscribe with
//! `+=`:
//!
//! ```
//! use quill_edit::signal::Signal;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let hits = Rc::new(Cell::new(0));
//! let mut on_change: Signal<str> = Signal::new();
//! let h = Rc::clone(&hits);
//! on_change += move |_: &str| h.set(h.get() + 1);
//! on_change.fire("x");
//! assert_eq!(hits.get(), 1);
//! ```

use std::fmt;
use std::ops::{AddAssign, SubAssign};
use std::rc::Rc;

/// A handler registered on a [`Signal`].
pub type SignalHandler<T> = Rc<dyn Fn(&T)>;

/// A list of callbacks fired with a reference to the sender.
pub struct Signal<T: ?Sized> {
    handlers: Vec<SignalHandler<T>>,
}

impl<T: ?Sized> Signal<T> {
    /// Creates a signal with no handlers.
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Adds a handler and returns it, so it can be removed later.
    pub fn subscribe(&mut self, handler: impl Fn(&T) + 'static) -> SignalHandler<T> {
        let handler: SignalHandler<T> = Rc::new(handler);
        self.handlers.push(Rc::clone(&handler));
        handler
    }

    /// Removes a handler previously returned by [`Signal::subscribe`].
    pub fn unsubscribe(&mut self, handler: &SignalHandler<T>) {
        self.handlers.retain(|h| !Rc::ptr_eq(h, handler));
    }

    /// Calls every handler.
    pub fn fire(&self, sender: &T) {
        for handler in &self.handlers {
            handler(sender);
        }
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T: ?Sized> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<T: ?Sized, F: Fn(&T) + 'static> AddAssign<F> for Signal<T> {
    fn add_assign(&mut self, handler: F) {
        self.subscribe(handler);
    }
}

impl<T: ?Sized> SubAssign<&SignalHandler<T>> for Signal<T> {
    fn sub_assign(&mut self, handler: &SignalHandler<T>) {
        self.unsubscribe(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_fires_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut signal: Signal<i32> = Signal::new();
        let l = Rc::clone(&log);
        signal += move |v: &i32| l.borrow_mut().push(("a", *v));
        let l = Rc::clone(&log);
        signal += move |v: &i32| l.borrow_mut().push(("b", *v));
        signal.fire(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let log = Rc::new(RefCell::new(0));
        let mut signal: Signal<()> = Signal::new();
        let l = Rc::clone(&log);
        let handler = signal.subscribe(move |_: &()| *l.borrow_mut() += 1);
        signal.fire(&());
        signal -= &handler;
        signal.fire(&());
        assert_eq!(*log.borrow(), 1);
        assert!(signal.is_empty());
    }
}
