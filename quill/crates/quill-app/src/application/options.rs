//! Application configuration.

use quill_core::color_depth::ColorDepth;
use quill_output::CursorShape;
use std::time::Duration;

/// How an [`Application`](super::Application) drives the terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationOptions {
    /// Draw on the alternate screen, using the whole terminal.
    pub full_screen: bool,
    /// Enable mouse reporting.
    pub mouse_support: bool,
    /// Remove the output when the run ends instead of leaving the final
    /// frame on screen.
    pub erase_when_done: bool,
    /// Shortest time between two frames; redraw requests arriving sooner
    /// are coalesced.
    pub min_redraw_interval: Duration,
    /// Redraw at least this often, e.g. for clocks. `None` disables.
    pub refresh_interval: Option<Duration>,
    /// How long to wait for the rest of a multi-key binding or escape
    /// sequence before resolving what was typed so far.
    pub key_press_timeout: Duration,
    /// Color depth override. `None` asks the output and the environment.
    pub color_depth: Option<ColorDepth>,
    /// Insert typed newlines as-is.
    pub paste_mode: bool,
    /// How often the terminal size is checked for changes.
    pub terminal_size_polling_interval: Duration,
    /// Cursor shape while the application runs.
    pub cursor_shape: CursorShape,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            full_screen: false,
            mouse_support: false,
            erase_when_done: false,
            min_redraw_interval: Duration::from_millis(50),
            refresh_interval: None,
            key_press_timeout: Duration::from_millis(500),
            color_depth: None,
            paste_mode: false,
            terminal_size_polling_interval: Duration::from_millis(500),
            cursor_shape: CursorShape::NeverChange,
        }
    }
}

impl ApplicationOptions {
    /// Options for a full-screen application with mouse support.
    pub fn full_screen() -> Self {
        Self {
            full_screen: true,
            mouse_support: true,
            ..Self::default()
        }
    }

    /// Sets full-screen mode.
    pub fn with_full_screen(mut self, enable: bool) -> Self {
        self.full_screen = enable;
        self
    }

    /// Sets mouse support.
    pub fn with_mouse_support(mut self, enable: bool) -> Self {
        self.mouse_support = enable;
        self
    }

    /// Sets whether the output is erased when the run ends.
    pub fn with_erase_when_done(mut self, enable: bool) -> Self {
        self.erase_when_done = enable;
        self
    }

    /// Sets the shortest time between two frames.
    pub fn with_min_redraw_interval(mut self, interval: Duration) -> Self {
        self.min_redraw_interval = interval;
        self
    }

    /// Sets the periodic redraw interval.
    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval.filter(|d| !d.is_zero());
        self
    }

    /// Sets the key press timeout.
    pub fn with_key_press_timeout(mut self, timeout: Duration) -> Self {
        self.key_press_timeout = timeout;
        self
    }

    /// Overrides the color depth.
    pub fn with_color_depth(mut self, depth: Option<ColorDepth>) -> Self {
        self.color_depth = depth;
        self
    }

    /// Sets paste mode.
    pub fn with_paste_mode(mut self, enable: bool) -> Self {
        self.paste_mode = enable;
        self
    }

    /// Sets how often the terminal size is polled.
    pub fn with_terminal_size_polling_interval(mut self, interval: Duration) -> Self {
        self.terminal_size_polling_interval = interval;
        self
    }

    /// Sets the cursor shape.
    pub fn with_cursor_shape(mut self, shape: CursorShape) -> Self {
        self.cursor_shape = shape;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = ApplicationOptions::default();
        assert!(!options.full_screen);
        assert_eq!(options.min_redraw_interval, Duration::from_millis(50));
        assert_eq!(options.key_press_timeout, Duration::from_millis(500));
        assert_eq!(options.refresh_interval, None);
    }

    #[test]
    fn test_zero_refresh_interval_disables_refresh() {
        let options = ApplicationOptions::full_screen().with_refresh_interval(Some(Duration::ZERO));
        assert!(options.full_screen);
        assert!(options.mouse_support);
        assert_eq!(options.refresh_interval, None);
    }
}
