//! Color depth and size discovery.
//!
//! Color depth precedence, highest first:
//!
//! 1. an explicit depth passed by the application
//! 2. `QUILL_COLOR_DEPTH`
//! 3. the output's default, derived from `NO_COLOR`, `CLICOLOR`, `TERM`
//!    and `COLORTERM`
//! 4. 8-bit

use crate::output::Output;
use quill_core::color_depth::{ColorDepth, COLOR_DEPTH_ENV};
use quill_core::geometry::Size;
use std::env;

/// The depth requested through `QUILL_COLOR_DEPTH`, if any.
pub fn color_depth_from_env() -> Option<ColorDepth> {
    let value = env::var(COLOR_DEPTH_ENV).ok()?;
    let depth = ColorDepth::parse(&value);
    if depth.is_none() {
        tracing::warn!("ignoring invalid {COLOR_DEPTH_ENV}={value:?}");
    }
    depth
}

/// Returns true for terminals that cannot handle escape sequences.
pub fn is_dumb_terminal(term: Option<&str>) -> bool {
    matches!(term, Some("dumb" | "unknown"))
}

/// Picks a depth from terminal environment values.
pub fn term_color_depth(
    term: Option<&str>,
    colorterm: Option<&str>,
    no_color: bool,
    clicolor: Option<&str>,
) -> ColorDepth {
    if no_color || clicolor == Some("0") || is_dumb_terminal(term) {
        return ColorDepth::Depth1Bit;
    }
    if matches!(colorterm, Some("truecolor" | "24bit")) {
        return ColorDepth::Depth24Bit;
    }
    match term {
        Some("linux" | "eterm-color") => ColorDepth::Depth4Bit,
        Some(t) if t.ends_with("-direct") => ColorDepth::Depth24Bit,
        _ => ColorDepth::Depth8Bit,
    }
}

/// [`term_color_depth`] for the current process environment.
pub fn default_color_depth_from_env() -> ColorDepth {
    let term = env::var("TERM").ok();
    let colorterm = env::var("COLORTERM").ok();
    let no_color = env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    let clicolor = env::var("CLICOLOR").ok();
    term_color_depth(
        term.as_deref(),
        colorterm.as_deref(),
        no_color,
        clicolor.as_deref(),
    )
}

/// Resolves the depth to render with.
pub fn resolve_color_depth(explicit: Option<ColorDepth>, output: &dyn Output) -> ColorDepth {
    explicit
        .or_else(color_depth_from_env)
        .unwrap_or_else(|| output.get_default_color_depth())
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok()?.trim().parse().ok().filter(|v| *v > 0)
}

/// Size of the controlling terminal.
///
/// Falls back to `LINES`/`COLUMNS`, then to 80x24, when the terminal
/// cannot be queried.
pub fn terminal_size() -> Size {
    match crossterm::terminal::size() {
        Ok((columns, rows)) if columns > 0 && rows > 0 => {
            Size::new(rows as usize, columns as usize)
        }
        _ => size_from_env(),
    }
}

/// Size from `LINES`/`COLUMNS`, defaulting each to 24 and 80.
pub fn size_from_env() -> Size {
    let default = Size::default();
    Size::new(
        env_usize("LINES").unwrap_or(default.rows),
        env_usize("COLUMNS").unwrap_or(default.columns),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyOutput;
    use serial_test::serial;

    #[test]
    fn test_term_color_depth() {
        assert_eq!(
            term_color_depth(Some("xterm-256color"), None, false, None),
            ColorDepth::Depth8Bit
        );
        assert_eq!(
            term_color_depth(Some("xterm"), Some("truecolor"), false, None),
            ColorDepth::Depth24Bit
        );
        assert_eq!(
            term_color_depth(Some("linux"), None, false, None),
            ColorDepth::Depth4Bit
        );
        assert_eq!(
            term_color_depth(Some("dumb"), Some("truecolor"), false, None),
            ColorDepth::Depth1Bit
        );
        assert_eq!(
            term_color_depth(Some("xterm"), None, true, None),
            ColorDepth::Depth1Bit
        );
        assert_eq!(
            term_color_depth(Some("xterm"), None, false, Some("0")),
            ColorDepth::Depth1Bit
        );
    }

    #[test]
    #[serial]
    fn test_resolve_precedence() {
        let output = DummyOutput::new();
        env::remove_var(COLOR_DEPTH_ENV);
        assert_eq!(resolve_color_depth(None, &output), ColorDepth::Depth1Bit);

        env::set_var(COLOR_DEPTH_ENV, "twenty_four_bit");
        assert_eq!(resolve_color_depth(None, &output), ColorDepth::Depth24Bit);
        assert_eq!(
            resolve_color_depth(Some(ColorDepth::Depth4Bit), &output),
            ColorDepth::Depth4Bit
        );

        env::set_var(COLOR_DEPTH_ENV, "lots");
        assert_eq!(resolve_color_depth(None, &output), ColorDepth::Depth1Bit);
        env::remove_var(COLOR_DEPTH_ENV);
    }

    #[test]
    #[serial]
    fn test_size_from_env() {
        env::set_var("LINES", "40");
        env::set_var("COLUMNS", "100");
        assert_eq!(size_from_env(), Size::new(40, 100));
        env::set_var("COLUMNS", "junk");
        assert_eq!(size_from_env(), Size::new(40, 80));
        env::remove_var("LINES");
        env::remove_var("COLUMNS");
        assert_eq!(size_from_env(), Size::new(24, 80));
    }
}
