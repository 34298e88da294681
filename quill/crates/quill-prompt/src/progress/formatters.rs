//! Formatters turn one counter into one cell of its progress line.
//!
//! The progress bar lays formatters out as columns: each reports a width
//! over all counters, then formats every counter into that width.

use super::counter::CounterSnapshot;
use quill_app::layout::Dimension;
use quill_core::formatted_text::explode_fragments;
use quill_core::width::str_width;
use quill_core::{Fragment, FormattedText};
use std::sync::Arc;
use std::time::Duration;

/// Formats one column of a progress line.
pub trait Formatter: Send + Sync {
    /// Text for `counter`, to be shown in `width` cells.
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText;

    /// Width of the column given all counters.
    fn width(&self, counters: &[CounterSnapshot]) -> Dimension;
}

/// Shared formatter handle.
pub type SharedFormatter = Arc<dyn Formatter>;

/// Formats a duration as `h:mm:ss`, dropping a leading `0:`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let text = format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
    match text.strip_prefix("0:") {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

fn max_width<'a>(texts: impl Iterator<Item = &'a str>) -> usize {
    texts.map(str_width).max().unwrap_or(0)
}

// === Label ===

/// The counter's label, scrolled when it does not fit a fixed width.
#[derive(Debug, Clone, Default)]
pub struct Label {
    width: Option<usize>,
    suffix: String,
}

impl Label {
    /// A label as wide as the widest counter label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the column width. Longer labels scroll.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Text appended to every label, e.g. `": "`.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

impl Formatter for Label {
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText {
        let mut label = counter.label.clone();
        if !self.suffix.is_empty() {
            label.push(Fragment::plain(self.suffix.clone()));
        }
        if label.width() <= width || width == 0 {
            return label.with_style_prefix("class:label");
        }
        // Marquee: shift by one character every 300ms.
        let chars: Vec<Fragment> = explode_fragments(&label);
        let shift = (counter.time_elapsed().as_millis() / 300) as usize % chars.len();
        let mut out = FormattedText::new();
        let mut used = 0;
        for fragment in chars.iter().cycle().skip(shift).take(chars.len()) {
            let w = str_width(&fragment.text);
            if used + w > width {
                break;
            }
            used += w;
            out.push(fragment.clone());
        }
        out.with_style_prefix("class:label")
    }

    fn width(&self, counters: &[CounterSnapshot]) -> Dimension {
        if let Some(width) = self.width {
            return Dimension::exact(width);
        }
        let widest = counters.iter().map(|c| c.label.width()).max().unwrap_or(0);
        if widest == 0 {
            Dimension::exact(0)
        } else {
            Dimension::preferred(widest + str_width(&self.suffix))
        }
    }
}

// === Text ===

/// Fixed text, the same on every line.
#[derive(Debug, Clone)]
pub struct Text {
    text: FormattedText,
}

impl Text {
    /// Fixed text in `style`.
    pub fn new(text: impl Into<String>, style: &str) -> Self {
        Self {
            text: FormattedText::styled(style, text),
        }
    }
}

impl Formatter for Text {
    fn format(&self, _counter: &CounterSnapshot, _width: usize) -> FormattedText {
        self.text.clone()
    }

    fn width(&self, _counters: &[CounterSnapshot]) -> Dimension {
        Dimension::exact(self.text.width())
    }
}

// === Percentage ===

/// `" 42.0%"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Percentage;

impl Formatter for Percentage {
    fn format(&self, counter: &CounterSnapshot, _width: usize) -> FormattedText {
        FormattedText::styled("class:percentage", format!("{:>5.1}%", counter.percentage()))
    }

    fn width(&self, _counters: &[CounterSnapshot]) -> Dimension {
        Dimension::exact(6)
    }
}

// === Bar ===

/// `[=====>    ]`. Without a total a marker bounces along the bar.
#[derive(Debug, Clone)]
pub struct Bar {
    start: String,
    end: String,
    sym_a: String,
    sym_b: String,
    sym_c: String,
    unknown: String,
}

impl Default for Bar {
    fn default() -> Self {
        Self {
            start: "[".into(),
            end: "]".into(),
            sym_a: "=".into(),
            sym_b: ">".into(),
            sym_c: " ".into(),
            unknown: "#".into(),
        }
    }
}

impl Bar {
    /// Replaces the symbols: done part, head, remaining part.
    pub fn with_symbols(mut self, done: &str, head: &str, remaining: &str) -> Self {
        self.sym_a = done.into();
        self.sym_b = head.into();
        self.sym_c = remaining.into();
        self
    }

    /// Replaces the brackets around the bar.
    pub fn with_ends(mut self, start: &str, end: &str) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    /// Replaces the marker shown while the total is unknown.
    pub fn with_unknown(mut self, unknown: &str) -> Self {
        self.unknown = unknown.into();
        self
    }
}

impl Formatter for Bar {
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText {
        let (sym_a, sym_b, sym_c, fraction) = if counter.done || counter.total.is_some() || counter.stopped {
            let fraction = if counter.done { 1.0 } else { counter.percentage() / 100.0 };
            (&self.sym_a, &self.sym_b, &self.sym_c, fraction)
        } else {
            let t = counter.time_elapsed().as_secs_f64();
            (&self.sym_c, &self.unknown, &self.sym_c, (t * 20.0 % 100.0) / 100.0)
        };
        let inner = width.saturating_sub(str_width(&self.start) + str_width(&self.end));
        let head = if fraction >= 1.0 { "" } else { sym_b.as_str() };
        let filled = ((fraction * inner as f64) as usize).min(inner);
        let remaining = inner.saturating_sub(filled + str_width(head));

        let mut text = FormattedText::new();
        text.push_str("class:bar", self.start.clone());
        text.push_str("class:bar class:bar-a", sym_a.repeat(filled));
        text.push_str("class:bar class:bar-b", head);
        text.push_str("class:bar class:bar-c", sym_c.repeat(remaining));
        text.push_str("class:bar", self.end.clone());
        text
    }

    fn width(&self, _counters: &[CounterSnapshot]) -> Dimension {
        Dimension::at_least(9)
    }
}

// === Progress ===

/// `" 50/100"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress;

impl Formatter for Progress {
    fn format(&self, counter: &CounterSnapshot, _width: usize) -> FormattedText {
        let total = counter.total.map_or_else(|| "?".to_string(), |t| t.to_string());
        let mut text = FormattedText::new();
        text.push_str("class:current", format!("{:>3}", counter.items_completed));
        text.push_str("", "/");
        text.push_str("class:total", format!("{total:>3}"));
        text
    }

    fn width(&self, counters: &[CounterSnapshot]) -> Dimension {
        let widest = counters
            .iter()
            .map(|c| c.total.map_or(1, |t| t.to_string().len()).max(3))
            .max()
            .unwrap_or(3);
        Dimension::exact(widest * 2 + 1)
    }
}

// === Time ===

/// Time since the counter started.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeElapsed;

impl Formatter for TimeElapsed {
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText {
        let text = format_duration(counter.time_elapsed());
        FormattedText::styled("class:time-elapsed", format!("{text:>width$}"))
    }

    fn width(&self, counters: &[CounterSnapshot]) -> Dimension {
        let texts: Vec<String> = counters.iter().map(|c| format_duration(c.time_elapsed())).collect();
        Dimension::exact(max_width(texts.iter().map(String::as_str)))
    }
}

const UNKNOWN_TIME: &str = "?:??:??";

/// Estimated time to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeLeft;

impl TimeLeft {
    fn text(counter: &CounterSnapshot) -> String {
        counter
            .time_left()
            .map_or_else(|| UNKNOWN_TIME.to_string(), format_duration)
    }
}

impl Formatter for TimeLeft {
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText {
        let text = Self::text(counter);
        FormattedText::styled("class:time-left", format!("{text:>width$}"))
    }

    fn width(&self, counters: &[CounterSnapshot]) -> Dimension {
        let texts: Vec<String> = counters.iter().map(Self::text).collect();
        Dimension::exact(max_width(texts.iter().map(String::as_str)).max(str_width(UNKNOWN_TIME)))
    }
}

/// Items per second since the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationsPerSecond;

impl IterationsPerSecond {
    fn text(counter: &CounterSnapshot) -> String {
        let secs = counter.time_elapsed().as_secs_f64();
        let rate = if secs > 0.0 {
            counter.items_completed as f64 / secs
        } else {
            0.0
        };
        format!("{rate:.2}")
    }
}

impl Formatter for IterationsPerSecond {
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText {
        let text = Self::text(counter);
        FormattedText::styled("class:iterations-per-second", format!("{text:>width$}"))
    }

    fn width(&self, counters: &[CounterSnapshot]) -> Dimension {
        let texts: Vec<String> = counters.iter().map(Self::text).collect();
        Dimension::exact(max_width(texts.iter().map(String::as_str)))
    }
}

// === Decoration ===

/// A rotating `/-\|` character.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinningWheel;

impl SpinningWheel {
    const CHARACTERS: [char; 4] = ['/', '-', '\\', '|'];
}

impl Formatter for SpinningWheel {
    fn format(&self, counter: &CounterSnapshot, _width: usize) -> FormattedText {
        let index = (counter.time_elapsed().as_secs_f64() * 3.0) as usize % Self::CHARACTERS.len();
        FormattedText::styled("class:spinning-wheel", Self::CHARACTERS[index].to_string())
    }

    fn width(&self, _counters: &[CounterSnapshot]) -> Dimension {
        Dimension::exact(1)
    }
}

/// Colours another formatter's output with a moving rainbow.
#[derive(Clone)]
pub struct Rainbow {
    inner: SharedFormatter,
    colors: Vec<String>,
}

impl std::fmt::Debug for Rainbow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rainbow").finish_non_exhaustive()
    }
}

/// Fully saturated colour for a hue in `0.0..1.0`.
fn hue_to_rgb(hue: f64) -> (u8, u8, u8) {
    let sector = (hue * 6.0) as usize;
    let f = hue * 6.0 - sector as f64;
    let q = (255.0 * (1.0 - f)) as u8;
    let t = (255.0 * f) as u8;
    match sector % 6 {
        0 => (255, t, 0),
        1 => (q, 255, 0),
        2 => (0, 255, t),
        3 => (0, q, 255),
        4 => (t, 0, 255),
        _ => (255, 0, q),
    }
}

impl Rainbow {
    /// Wraps `inner`.
    pub fn new(inner: impl Formatter + 'static) -> Self {
        let colors = (0..100)
            .map(|h| {
                let (r, g, b) = hue_to_rgb(f64::from(h) / 100.0);
                format!("#{r:02x}{g:02x}{b:02x}")
            })
            .collect();
        Self {
            inner: Arc::new(inner),
            colors,
        }
    }
}

impl Formatter for Rainbow {
    fn format(&self, counter: &CounterSnapshot, width: usize) -> FormattedText {
        let text = self.inner.format(counter, width);
        let shift = (counter.time_elapsed().as_secs_f64() * 3.0) as usize % self.colors.len();
        explode_fragments(&text)
            .into_iter()
            .enumerate()
            .map(|(i, f)| {
                let color = &self.colors[(i + shift) % self.colors.len()];
                Fragment::new(format!("{} {color}", f.style), f.text)
            })
            .collect()
    }

    fn width(&self, counters: &[CounterSnapshot]) -> Dimension {
        self.inner.width(counters)
    }
}

/// Label, percentage, bar, `n/total` and the time left.
pub fn default_formatters() -> Vec<SharedFormatter> {
    vec![
        Arc::new(Label::new()),
        Arc::new(Text::new(" ", "")),
        Arc::new(Percentage),
        Arc::new(Text::new(" ", "")),
        Arc::new(Bar::default()),
        Arc::new(Text::new(" ", "")),
        Arc::new(Progress),
        Arc::new(Text::new(" ", "")),
        Arc::new(Text::new("eta [", "class:time-left")),
        Arc::new(TimeLeft),
        Arc::new(Text::new("]", "class:time-left")),
        Arc::new(Text::new(" ", "")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn snapshot(completed: usize, total: Option<usize>) -> CounterSnapshot {
        CounterSnapshot {
            label: FormattedText::from("task"),
            items_completed: completed,
            total,
            start_time: Instant::now(),
            stop_time: None,
            done: false,
            stopped: false,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "00:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn test_percentage() {
        let text = Percentage.format(&snapshot(50, Some(100)), 6);
        assert_eq!(text.to_plain_text(), " 50.0%");
    }

    #[test]
    fn test_bar_half_done() {
        let text = Bar::default().format(&snapshot(5, Some(10)), 12);
        assert_eq!(text.to_plain_text(), "[=====>    ]");
    }

    #[test]
    fn test_bar_done_has_no_head() {
        let mut counter = snapshot(10, Some(10));
        counter.done = true;
        assert_eq!(Bar::default().format(&counter, 7).to_plain_text(), "[=====]");
    }

    #[test]
    fn test_progress_unknown_total() {
        let text = Progress.format(&snapshot(7, None), 7);
        assert_eq!(text.to_plain_text(), "  7/  ?");
        assert_eq!(Progress.width(&[snapshot(1, Some(1000))]), Dimension::exact(9));
    }

    #[test]
    fn test_time_left_unknown_without_progress() {
        assert_eq!(TimeLeft.format(&snapshot(0, Some(10)), 7).to_plain_text(), UNKNOWN_TIME);
    }

    #[test]
    fn test_label_scrolls_when_too_long() {
        let label = Label::new().with_width(3);
        let text = label.format(&snapshot(0, None), 3);
        assert_eq!(text.width(), 3);
        assert_eq!(label.width(&[]), Dimension::exact(3));
    }

    #[test]
    fn test_hue_to_rgb_primaries() {
        assert_eq!(hue_to_rgb(0.0), (255, 0, 0));
        assert_eq!(hue_to_rgb(2.0 / 6.0), (0, 255, 0));
        assert_eq!(hue_to_rgb(4.0 / 6.0), (0, 0, 255));
    }

    #[test]
    fn test_rainbow_keeps_text() {
        let rainbow = Rainbow::new(Text::new("abc", ""));
        let text = rainbow.format(&snapshot(0, None), 3);
        assert_eq!(text.len(), 3);
        assert_eq!(text.to_plain_text(), "abc");
        assert!(text[0].style.contains('#'));
    }
}
