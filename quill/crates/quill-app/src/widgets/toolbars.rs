//! One-line toolbars shown at the bottom of a prompt.

use crate::context::{AppContext, BufferId};
use crate::filters::{self, Filter};
use crate::key_binding::{KeyBindings, SharedKeyBindings};
use crate::layout::containers::delegate_container;
use crate::layout::processors::{BeforeInput, SharedProcessor};
use crate::layout::{BufferControl, ConditionalContainer, Dimension, FormattedTextControl, TextSource, Window};
use quill_core::FormattedText;
use quill_edit::{Buffer, SearchDirection};
use quill_input::Key;
use std::fmt;
use std::rc::Rc;

/// Prompt shown by the system toolbar.
const SYSTEM_PROMPT: &str = "Shell command: ";

/// A toolbar showing formatted text, such as the bottom toolbar.
pub struct FormattedTextToolbar {
    window: Window,
}

impl fmt::Debug for FormattedTextToolbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormattedTextToolbar").finish_non_exhaustive()
    }
}

impl FormattedTextToolbar {
    /// A toolbar showing `text` in `style`.
    pub fn new(text: impl Into<TextSource>, style: &str) -> Self {
        let window = Window::new(FormattedTextControl::new(text))
            .with_style(style)
            .with_height(Dimension::at_least(1))
            .with_dont_extend_height(true);
        Self { window }
    }
}

impl crate::layout::Container for FormattedTextToolbar {
    delegate_container!(concrete window);
}

/// Shows the numeric argument while one is being typed.
pub struct ArgToolbar {
    inner: ConditionalContainer,
}

impl fmt::Debug for ArgToolbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgToolbar").finish_non_exhaustive()
    }
}

impl Default for ArgToolbar {
    fn default() -> Self {
        Self::new()
    }
}

fn arg_text(ctx: &AppContext) -> FormattedText {
    let arg = match ctx.key_arg() {
        Some("-") => "-1",
        Some(arg) => arg,
        None => "",
    };
    FormattedText::from_fragments(vec![
        quill_core::Fragment::new("class:arg-toolbar", "Repeat: "),
        quill_core::Fragment::new("class:arg-toolbar.text", arg),
    ])
}

impl ArgToolbar {
    /// An argument toolbar.
    pub fn new() -> Self {
        let window = Window::new(FormattedTextControl::new(TextSource::dynamic(arg_text))).with_height(1);
        Self {
            inner: ConditionalContainer::new(Box::new(window), filters::has_arg()),
        }
    }
}

impl crate::layout::Container for ArgToolbar {
    delegate_container!(concrete inner);
}

/// Shows the validation error of the focused buffer.
pub struct ValidationToolbar {
    inner: ConditionalContainer,
}

impl fmt::Debug for ValidationToolbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationToolbar").finish_non_exhaustive()
    }
}

fn validation_message(buffer: &Buffer, show_position: bool) -> Option<String> {
    let error = buffer.validation_error()?;
    if !show_position {
        return Some(error.message.clone());
    }
    let (row, column) = buffer.document().translate_index_to_position(error.cursor_position);
    Some(format!("{} (line={} column={})", error.message, row + 1, column + 1))
}

fn validation_text(ctx: &AppContext, show_position: bool) -> FormattedText {
    ctx.current_buffer()
        .and_then(|buffer| validation_message(buffer, show_position))
        .map(|text| FormattedText::styled("class:validation-toolbar", text))
        .unwrap_or_default()
}

impl ValidationToolbar {
    /// A validation toolbar; `show_position` appends the line and column
    /// of the error.
    pub fn new(show_position: bool) -> Self {
        let control = FormattedTextControl::new(TextSource::dynamic(move |ctx| validation_text(ctx, show_position)));
        let window = Window::new(control).with_height(1);
        Self {
            inner: ConditionalContainer::new(Box::new(window), filters::has_validation_error()),
        }
    }
}

impl crate::layout::Container for ValidationToolbar {
    delegate_container!(concrete inner);
}

/// The incremental search field.
///
/// Link it to a text with [`BufferControl::with_search_buffer`] using
/// [`SearchToolbar::buffer_id`]; it is visible only while that search runs.
pub struct SearchToolbar {
    buffer: BufferId,
    inner: ConditionalContainer,
}

impl fmt::Debug for SearchToolbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchToolbar")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

fn search_prompt(ctx: &AppContext, search_buffer: BufferId) -> FormattedText {
    let backward = ctx
        .current_search_state()
        .filter(|_| ctx.search_link().is_some_and(|link| link.search_buffer == search_buffer))
        .is_some_and(|(_, state)| state.direction == SearchDirection::Backward);
    let prompt = if backward { "I-search backward: " } else { "I-search: " };
    FormattedText::styled("class:search-toolbar.prompt", prompt)
}

impl SearchToolbar {
    /// Creates the search field and its buffer.
    pub fn new(ctx: &mut AppContext) -> Self {
        let buffer = ctx.add_buffer(Buffer::new().with_name("search"));
        let prompt: SharedProcessor = Rc::new(BeforeInput::new(
            TextSource::dynamic(move |ctx| search_prompt(ctx, buffer)),
            "class:search-toolbar.prompt",
        ));
        let control = BufferControl::new(buffer).with_input_processors(vec![prompt]);
        let window = Window::new(control)
            .with_height(1)
            .with_style("class:search-toolbar");
        let searching = Filter::new(move |ctx| ctx.search_link().is_some_and(|link| link.search_buffer == buffer));
        Self {
            buffer,
            inner: ConditionalContainer::new(Box::new(window), searching),
        }
    }

    /// The search field's buffer.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }
}

impl crate::layout::Container for SearchToolbar {
    delegate_container!(concrete inner);
}

/// A field for running shell commands, opened with Escape `!`.
pub struct SystemToolbar {
    buffer: BufferId,
    inner: ConditionalContainer,
}

impl fmt::Debug for SystemToolbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemToolbar")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

fn system_bindings(buffer: BufferId) -> KeyBindings {
    let mut kb = KeyBindings::new();
    for key in [Key::Escape, Key::Control('g'), Key::Control('c')] {
        kb.add(key, move |event| {
            if let Some(b) = event.ctx.buffer_mut(buffer) {
                b.reset(None, false);
            }
            event.ctx.focus_last();
            Ok(())
        });
    }
    kb.add(Key::Enter, move |event| {
        let Some(b) = event.ctx.buffer_mut(buffer) else {
            return Ok(());
        };
        let command = b.text().to_string();
        b.reset(None, true);
        event.ctx.focus_last();
        if !command.trim().is_empty() {
            event
                .ctx
                .run_system_command(command.clone(), true, format!("{SYSTEM_PROMPT}{command}\n"));
        }
        Ok(())
    });
    kb
}

impl SystemToolbar {
    /// Creates the toolbar and its buffer.
    pub fn new(ctx: &mut AppContext) -> Self {
        let buffer = ctx.add_buffer(Buffer::new().with_name("system"));
        let prompt: SharedProcessor = Rc::new(BeforeInput::new(SYSTEM_PROMPT, "class:system-toolbar"));
        let control = BufferControl::new(buffer)
            .with_input_processors(vec![prompt])
            .with_key_bindings(system_bindings(buffer).shared());
        let window = Window::new(control)
            .with_height(1)
            .with_style("class:system-toolbar.text");
        Self {
            buffer,
            inner: ConditionalContainer::new(Box::new(window), filters::has_focus(buffer)),
        }
    }

    /// The command field's buffer.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    /// Bindings that open the toolbar; register them application-wide.
    pub fn global_key_bindings(&self) -> SharedKeyBindings {
        let buffer = self.buffer;
        let mut kb = KeyBindings::new();
        kb.add_when(
            [Key::Escape, Key::Char('!')],
            !filters::has_focus(buffer) & !filters::is_done(),
            move |event| event.ctx.focus_buffer(buffer),
        );
        kb.shared()
    }
}

impl crate::layout::Container for SystemToolbar {
    delegate_container!(concrete inner);
}
