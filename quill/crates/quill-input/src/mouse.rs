//! Mouse input types and report decoding.
//!
//! Mouse reports arrive from the key parser as [`Key::Mouse`](crate::keys::Key::Mouse)
//! key presses whose data holds the raw report. [`parse_mouse_event`] decodes
//! the three report encodings terminals use: X10 (`ESC [ M b x y`), SGR
//! (`ESC [ < b ; x ; y M|m`) and urxvt (`ESC [ b ; x ; y M`).

use bitflags::bitflags;
use quill_core::geometry::Point;
use std::fmt;

/// Represents a mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButton {
    /// Left mouse button (primary).
    Left,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (secondary).
    Right,
    /// No button, e.g. for moves and wheel events.
    #[default]
    None,
    /// The terminal did not say which button was released.
    Unknown,
}

impl MouseButton {
    /// Converts the low two bits of a report to a button.
    #[must_use]
    pub fn from_number(n: u32) -> Self {
        match n & 3 {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Unknown,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Middle => write!(f, "middle"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::None => write!(f, "none"),
            MouseButton::Unknown => write!(f, "unknown"),
        }
    }
}

/// The kind of mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventType {
    /// A button was released.
    MouseUp,
    /// A button was pressed down.
    MouseDown,
    /// The mouse moved, with or without a button held.
    MouseMove,
    /// The wheel was scrolled up.
    ScrollUp,
    /// The wheel was scrolled down.
    ScrollDown,
}

impl MouseEventType {
    /// Returns true for wheel events.
    #[must_use]
    pub fn is_scroll(self) -> bool {
        matches!(self, Self::ScrollUp | Self::ScrollDown)
    }
}

impl fmt::Display for MouseEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MouseUp => "up",
            Self::MouseDown => "down",
            Self::MouseMove => "move",
            Self::ScrollUp => "scroll-up",
            Self::ScrollDown => "scroll-down",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Modifier keys held during a mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseModifiers: u8 {
        /// Shift key.
        const SHIFT = 0b0000_0001;
        /// Alt/Meta key.
        const ALT = 0b0000_0010;
        /// Control key.
        const CONTROL = 0b0000_0100;
    }
}

impl MouseModifiers {
    fn from_report(code: u32) -> Self {
        let mut mods = Self::empty();
        if code & 4 != 0 {
            mods |= Self::SHIFT;
        }
        if code & 8 != 0 {
            mods |= Self::ALT;
        }
        if code & 16 != 0 {
            mods |= Self::CONTROL;
        }
        mods
    }
}

/// A decoded mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    /// Zero-based cell position, relative to the terminal.
    pub position: Point,
    /// What happened.
    pub event_type: MouseEventType,
    /// The button involved.
    pub button: MouseButton,
    /// Modifier keys.
    pub modifiers: MouseModifiers,
}

impl MouseEvent {
    /// Creates a new mouse event without modifiers.
    #[must_use]
    pub fn new(position: Point, event_type: MouseEventType, button: MouseButton) -> Self {
        Self {
            position,
            event_type,
            button,
            modifiers: MouseModifiers::empty(),
        }
    }

    /// The same event at another position.
    #[must_use]
    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Display for MouseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.button, self.event_type, self.position)
    }
}

fn decode(code: u32, x: usize, y: usize, released: bool) -> MouseEvent {
    let event_type = if code & 64 != 0 {
        if code & 1 == 0 {
            MouseEventType::ScrollUp
        } else {
            MouseEventType::ScrollDown
        }
    } else if code & 32 != 0 {
        MouseEventType::MouseMove
    } else if released || code & 3 == 3 {
        MouseEventType::MouseUp
    } else {
        MouseEventType::MouseDown
    };
    let button = match event_type {
        MouseEventType::ScrollUp | MouseEventType::ScrollDown => MouseButton::None,
        MouseEventType::MouseMove if code & 3 == 3 => MouseButton::None,
        _ => MouseButton::from_number(code),
    };
    MouseEvent {
        position: Point::new(x.saturating_sub(1), y.saturating_sub(1)),
        event_type,
        button,
        modifiers: MouseModifiers::from_report(code),
    }
}

fn parse_triplet(params: &str) -> Option<(u32, usize, usize)> {
    let mut it = params.split(';');
    let b = it.next()?.parse().ok()?;
    let x = it.next()?.parse().ok()?;
    let y = it.next()?.parse().ok()?;
    if it.next().is_some() {
        return None;
    }
    Some((b, x, y))
}

/// Decodes a raw mouse report.
///
/// Returns `None` when `data` is not a well formed report.
pub fn parse_mouse_event(data: &str) -> Option<MouseEvent> {
    if let Some(rest) = data.strip_prefix("\x1b[<") {
        // SGR: press ends in 'M', release in 'm'.
        let released = rest.ends_with('m');
        let params = rest.strip_suffix('M').or_else(|| rest.strip_suffix('m'))?;
        let (b, x, y) = parse_triplet(params)?;
        return Some(decode(b, x, y, released));
    }
    if let Some(rest) = data.strip_prefix("\x1b[M") {
        let mut chars = rest.chars().map(|c| (c as u32).saturating_sub(32));
        let (b, x, y) = (chars.next()?, chars.next()?, chars.next()?);
        if chars.next().is_some() {
            return None;
        }
        return Some(decode(b, x as usize, y as usize, false));
    }
    if let Some(rest) = data.strip_prefix("\x1b[") {
        // urxvt: same as X10 but decimal, with the 32 offset kept.
        let (b, x, y) = parse_triplet(rest.strip_suffix('M')?)?;
        return Some(decode(b.saturating_sub(32), x, y, false));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sgr_press_and_release() {
        let down = parse_mouse_event("\x1b[<0;10;5M").unwrap();
        assert_eq!(down.position, Point::new(9, 4));
        assert_eq!(down.event_type, MouseEventType::MouseDown);
        assert_eq!(down.button, MouseButton::Left);

        let up = parse_mouse_event("\x1b[<0;10;5m").unwrap();
        assert_eq!(up.event_type, MouseEventType::MouseUp);
    }

    #[test]
    fn test_sgr_scroll_and_modifiers() {
        let ev = parse_mouse_event("\x1b[<65;1;1M").unwrap();
        assert_eq!(ev.event_type, MouseEventType::ScrollDown);
        assert_eq!(ev.button, MouseButton::None);

        let ev = parse_mouse_event("\x1b[<20;3;3M").unwrap();
        assert_eq!(ev.modifiers, MouseModifiers::SHIFT | MouseModifiers::CONTROL);
    }

    #[test]
    fn test_sgr_drag() {
        let ev = parse_mouse_event("\x1b[<32;4;2M").unwrap();
        assert_eq!(ev.event_type, MouseEventType::MouseMove);
        assert_eq!(ev.button, MouseButton::Left);
    }

    #[test]
    fn test_x10() {
        let report = format!("\x1b[M{}{}{}", ' ', char::from(32 + 5), char::from(32 + 2));
        let ev = parse_mouse_event(&report).unwrap();
        assert_eq!(ev.position, Point::new(4, 1));
        assert_eq!(ev.event_type, MouseEventType::MouseDown);

        let report = format!("\x1b[M{}!!", '#');
        let ev = parse_mouse_event(&report).unwrap();
        assert_eq!(ev.event_type, MouseEventType::MouseUp);
    }

    #[test]
    fn test_urxvt() {
        let ev = parse_mouse_event("\x1b[32;7;3M").unwrap();
        assert_eq!(ev.position, Point::new(6, 2));
        assert_eq!(ev.event_type, MouseEventType::MouseDown);
    }

    #[test]
    fn test_malformed() {
        assert!(parse_mouse_event("\x1b[<0;1M").is_none());
        assert!(parse_mouse_event("hello").is_none());
    }
}
