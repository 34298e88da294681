//! Columns drawn left or right of a window's body.

use super::controls::{TextSource, UIContent};
use super::window::WindowRenderInfo;
use crate::context::AppContext;
use crate::filters::Filter;
use quill_core::width::str_width;
use quill_core::{FormattedText, Fragment};
use std::fmt;
use std::rc::Rc;

/// A margin of a [`Window`](super::Window).
pub trait Margin {
    /// Width of the margin. `get_ui_content` produces the body's content
    /// for margins that depend on it.
    fn get_width(&self, ctx: &AppContext, get_ui_content: &dyn Fn() -> UIContent) -> usize;

    /// Draws the margin for the frame described by `info`. Lines are
    /// separated by newlines.
    fn create_margin(&self, ctx: &AppContext, info: &WindowRenderInfo, width: usize, height: usize) -> FormattedText;
}

/// A shared margin.
pub type SharedMargin = Rc<dyn Margin>;

/// Line numbers.
#[derive(Debug, Clone)]
pub struct NumberedMargin {
    relative: Filter,
    display_tildes: Filter,
}

impl Default for NumberedMargin {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl NumberedMargin {
    /// Absolute or relative numbers, with `~` below the last line when
    /// `display_tildes` holds.
    pub fn new(relative: impl Into<Filter>, display_tildes: impl Into<Filter>) -> Self {
        Self {
            relative: relative.into(),
            display_tildes: display_tildes.into(),
        }
    }
}

impl Margin for NumberedMargin {
    fn get_width(&self, _ctx: &AppContext, get_ui_content: &dyn Fn() -> UIContent) -> usize {
        let line_count = get_ui_content().line_count;
        (line_count.to_string().len() + 1).max(3)
    }

    fn create_margin(&self, ctx: &AppContext, info: &WindowRenderInfo, width: usize, _height: usize) -> FormattedText {
        let relative = self.relative.eval(ctx);
        let current = info.cursor_position.map(|p| p.y);
        let mut result = FormattedText::new();
        let mut last_lineno = None;

        for &lineno in &info.displayed_lines {
            if last_lineno != Some(lineno) {
                if Some(lineno) == current {
                    if relative {
                        result.push(Fragment::new("class:line-number.current", format!("{}", lineno + 1)));
                    } else {
                        result.push(Fragment::new(
                            "class:line-number.current",
                            format!("{:>width$}", format!("{} ", lineno + 1)),
                        ));
                    }
                } else {
                    let shown = match (relative, current) {
                        (true, Some(current)) => lineno.abs_diff(current),
                        _ => lineno + 1,
                    };
                    result.push(Fragment::new("class:line-number", format!("{:>width$}", format!("{shown} "))));
                }
            }
            last_lineno = Some(lineno);
            result.push(Fragment::plain("\n"));
        }

        if self.display_tildes.eval(ctx) {
            for _ in info.displayed_lines.len()..info.window_height {
                result.push(Fragment::new("class:tilde", "~\n"));
            }
        }
        result
    }
}

/// A scrollbar showing which part of the content is visible.
#[derive(Debug, Clone)]
pub struct ScrollbarMargin {
    display_arrows: Filter,
    up_arrow: String,
    down_arrow: String,
}

impl Default for ScrollbarMargin {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ScrollbarMargin {
    /// A scrollbar, with arrows at both ends when `display_arrows` holds.
    pub fn new(display_arrows: impl Into<Filter>) -> Self {
        Self {
            display_arrows: display_arrows.into(),
            up_arrow: "^".to_string(),
            down_arrow: "v".to_string(),
        }
    }

    /// Replaces the arrow symbols.
    pub fn with_arrows(mut self, up: impl Into<String>, down: impl Into<String>) -> Self {
        self.up_arrow = up.into();
        self.down_arrow = down.into();
        self
    }
}

impl Margin for ScrollbarMargin {
    fn get_width(&self, _ctx: &AppContext, _get_ui_content: &dyn Fn() -> UIContent) -> usize {
        1
    }

    fn create_margin(&self, ctx: &AppContext, info: &WindowRenderInfo, _width: usize, _height: usize) -> FormattedText {
        let content_height = info.content_height;
        if content_height == 0 {
            return FormattedText::new();
        }
        let display_arrows = self.display_arrows.eval(ctx);
        let window_height = if display_arrows {
            info.window_height.saturating_sub(2)
        } else {
            info.window_height
        };

        let fraction_visible = info.displayed_lines.len() as f64 / content_height as f64;
        let fraction_above = info.vertical_scroll as f64 / content_height as f64;
        let button_height = (window_height as f64 * fraction_visible).max(1.0).min(window_height as f64) as usize;
        let button_top = (window_height as f64 * fraction_above) as usize;
        let is_button = |row: usize| button_top <= row && row <= button_top + button_height;

        let mut result = FormattedText::new();
        if display_arrows {
            result.push(Fragment::new("class:scrollbar.arrow", self.up_arrow.clone()));
            result.push(Fragment::new("class:scrollbar", "\n"));
        }
        for row in 0..window_height {
            let style = match (is_button(row), is_button(row + 1)) {
                (true, false) => "class:scrollbar.button,scrollbar.end",
                (true, true) => "class:scrollbar.button",
                (false, true) => "class:scrollbar.background,scrollbar.start",
                (false, false) => "class:scrollbar.background",
            };
            result.push(Fragment::new(style, " "));
            result.push(Fragment::plain("\n"));
        }
        if display_arrows {
            result.push(Fragment::new("class:scrollbar.arrow", self.down_arrow.clone()));
        }
        result
    }
}

/// Computes the text left of a continuation line: `(ctx, width, line
/// number, is soft wrap)`.
pub type GetContinuation = Rc<dyn Fn(&AppContext, usize, usize, bool) -> FormattedText>;

/// A prompt on the first line and continuation text on the others.
#[derive(Clone)]
pub struct PromptMargin {
    get_prompt: TextSource,
    get_continuation: Option<GetContinuation>,
}

impl fmt::Debug for PromptMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptMargin")
            .field("get_prompt", &self.get_prompt)
            .finish_non_exhaustive()
    }
}

impl PromptMargin {
    /// A margin showing `prompt` on the first line.
    pub fn new(prompt: impl Into<TextSource>) -> Self {
        Self {
            get_prompt: prompt.into(),
            get_continuation: None,
        }
    }

    /// Text for the following lines.
    pub fn with_continuation(mut self, f: impl Fn(&AppContext, usize, usize, bool) -> FormattedText + 'static) -> Self {
        self.get_continuation = Some(Rc::new(f));
        self
    }
}

impl Margin for PromptMargin {
    fn get_width(&self, ctx: &AppContext, _get_ui_content: &dyn Fn() -> UIContent) -> usize {
        str_width(&self.get_prompt.get(ctx).to_plain_text())
    }

    fn create_margin(&self, ctx: &AppContext, info: &WindowRenderInfo, width: usize, _height: usize) -> FormattedText {
        let mut fragments = self.get_prompt.get(ctx);
        if let Some(continuation) = &self.get_continuation {
            let mut last = None;
            for &lineno in info.displayed_lines.iter().skip(1) {
                fragments.push(Fragment::plain("\n"));
                fragments.extend(continuation(ctx, width, lineno, last == Some(lineno)).into_fragments());
                last = Some(lineno);
            }
        }
        fragments
    }
}

/// A margin shown only while a filter holds.
#[derive(Clone)]
pub struct ConditionalMargin {
    margin: SharedMargin,
    filter: Filter,
}

impl fmt::Debug for ConditionalMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalMargin")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl ConditionalMargin {
    /// Shows `margin` while `filter` holds.
    pub fn new(margin: impl Margin + 'static, filter: impl Into<Filter>) -> Self {
        Self {
            margin: Rc::new(margin),
            filter: filter.into(),
        }
    }
}

impl Margin for ConditionalMargin {
    fn get_width(&self, ctx: &AppContext, get_ui_content: &dyn Fn() -> UIContent) -> usize {
        if self.filter.eval(ctx) {
            self.margin.get_width(ctx, get_ui_content)
        } else {
            0
        }
    }

    fn create_margin(&self, ctx: &AppContext, info: &WindowRenderInfo, width: usize, height: usize) -> FormattedText {
        if width > 0 && self.filter.eval(ctx) {
            self.margin.create_margin(ctx, info, width, height)
        } else {
            FormattedText::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use pretty_assertions::assert_eq;
    use quill_core::Point;

    fn info(displayed_lines: Vec<usize>, window_height: usize, content_height: usize, cursor_row: usize) -> WindowRenderInfo {
        WindowRenderInfo {
            window_width: 10,
            window_height,
            vertical_scroll: displayed_lines.first().copied().unwrap_or(0),
            content_height,
            cursor_position: Some(Point::new(0, cursor_row)),
            displayed_lines,
            x_offset: 0,
            y_offset: 0,
            wrap_lines: false,
            ..WindowRenderInfo::default()
        }
    }

    fn lines(text: &FormattedText) -> Vec<String> {
        text.to_plain_text().split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_numbered_margin() {
        let ctx = test_context();
        let margin = NumberedMargin::new(false, true);
        let content = || UIContent::from_lines(vec![Vec::new(); 12]);
        assert_eq!(margin.get_width(&ctx, &content), 3);

        let text = margin.create_margin(&ctx, &info(vec![0, 1, 1], 4, 2, 1), 3, 4);
        assert_eq!(lines(&text), vec![" 1 ", " 2 ", "", "~", ""]);
    }

    #[test]
    fn test_relative_numbers() {
        let ctx = test_context();
        let margin = NumberedMargin::new(true, false);
        let text = margin.create_margin(&ctx, &info(vec![0, 1, 2], 3, 3, 1), 3, 3);
        assert_eq!(lines(&text), vec![" 1 ", "2", " 1 ", ""]);
    }

    #[test]
    fn test_scrollbar_covers_visible_part() {
        let ctx = test_context();
        let text = ScrollbarMargin::default().create_margin(&ctx, &info(vec![0, 1], 4, 8, 0), 1, 4);
        let styles: Vec<&str> = text
            .iter()
            .filter(|f| f.text == " ")
            .map(|f| f.style.as_str())
            .collect();
        assert_eq!(
            styles,
            vec![
                "class:scrollbar.button",
                "class:scrollbar.button,scrollbar.end",
                "class:scrollbar.background",
                "class:scrollbar.background",
            ]
        );
    }

    #[test]
    fn test_prompt_margin_continuation() {
        let ctx = test_context();
        let margin = PromptMargin::new(">>> ").with_continuation(|_, _, _, wrapped| {
            FormattedText::from(if wrapped { "  " } else { "..." })
        });
        assert_eq!(margin.get_width(&ctx, &UIContent::default), 4);
        let text = margin.create_margin(&ctx, &info(vec![0, 1, 1], 3, 2, 0), 4, 3);
        assert_eq!(lines(&text), vec![">>> ", "...", "  "]);
    }

    #[test]
    fn test_conditional_margin_hidden() {
        let ctx = test_context();
        let margin = ConditionalMargin::new(ScrollbarMargin::default(), false);
        assert_eq!(margin.get_width(&ctx, &UIContent::default), 0);
    }
}
