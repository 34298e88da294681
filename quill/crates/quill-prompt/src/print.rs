//! Printing formatted text without running an application.

use quill_app::renderer;
use quill_core::markup::parse_markup;
use quill_core::{default_ui_style, ColorDepth, FormattedText, MarkupError, Style};
use quill_output::{resolve_color_depth, Output};

/// Separators and styling for [`print_to`].
#[derive(Debug, Clone)]
pub struct PrintOptions {
    /// Printed between values.
    pub sep: String,
    /// Printed after the last value.
    pub end: String,
    /// Style rules layered over the default UI style.
    pub style: Option<Style>,
    /// Color depth override.
    pub color_depth: Option<ColorDepth>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            sep: " ".to_string(),
            end: "\n".to_string(),
            style: None,
            color_depth: None,
        }
    }
}

impl PrintOptions {
    /// Sets the separator.
    pub fn with_sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    /// Sets the terminator.
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = end.into();
        self
    }

    /// Sets style rules.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Overrides the color depth.
    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = Some(depth);
        self
    }
}

/// Joins `values` with the separator and appends the terminator.
fn join(values: &[FormattedText], options: &PrintOptions) -> FormattedText {
    let mut text = FormattedText::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 && !options.sep.is_empty() {
            text.push_str("", options.sep.clone());
        }
        text.extend(value.iter().cloned());
    }
    if !options.end.is_empty() {
        text.push_str("", options.end.clone());
    }
    text
}

/// Prints `values` to `output`.
pub fn print_to(output: &mut dyn Output, values: &[FormattedText], options: &PrintOptions) {
    let text = join(values, options);
    let depth = resolve_color_depth(options.color_depth, output);
    match &options.style {
        Some(style) => {
            let merged = Style::merged([default_ui_style(), style]);
            renderer::print_formatted_text(output, &text, &merged, depth);
        }
        None => renderer::print_formatted_text(output, &text, default_ui_style(), depth),
    }
}

/// Prints `values` to standard output.
pub fn print_formatted_text(values: &[FormattedText], options: &PrintOptions) {
    let mut output = quill_output::create_output();
    print_to(output.as_mut(), values, options);
}

/// Parses markup such as `<b>bold</b> <red>red</red>` and prints it to
/// standard output.
pub fn print_markup(markup: &str) -> Result<(), MarkupError> {
    let text = parse_markup(markup)?;
    print_formatted_text(&[text], &PrintOptions::default());
    Ok(())
}
