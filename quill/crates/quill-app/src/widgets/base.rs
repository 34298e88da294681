//! Basic widgets: text fields, labels, buttons, frames, padding, shadows,
//! lines and selection lists.

use crate::context::{AppContext, BufferId};
use crate::filters::Filter;
use crate::key_binding::{KeyBindings, SharedKeyBindings};
use crate::layout::containers::delegate_container;
use crate::layout::processors::{BeforeInput, PasswordProcessor, SharedProcessor};
use crate::layout::{
    BufferControl, ConditionalContainer, ConditionalMargin, Container, ContainerRef, Dimension, DimensionSource,
    DummyControl, FormattedTextControl, HSplit, MouseHandlers, NumberedMargin, ScrollbarMargin, SharedLexer,
    SharedMargin, StyleSource, TextSource, VSplit, Window, WindowAlign, SET_CURSOR_POSITION,
};
use quill_core::width::str_width;
use quill_core::{FormattedText, Fragment, WindowId};
use quill_edit::Buffer;
use quill_input::{Key, MouseEventType};
use quill_screen::{Screen, WritePosition};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Called when a button is pressed or a menu item is chosen.
pub type WidgetHandler = Rc<dyn Fn(&mut AppContext)>;

/// Box-drawing characters.
#[derive(Debug, Clone, Copy)]
pub struct Border;

impl Border {
    /// ─
    pub const HORIZONTAL: char = '─';
    /// │
    pub const VERTICAL: char = '│';
    /// ┌
    pub const TOP_LEFT: char = '┌';
    /// ┐
    pub const TOP_RIGHT: char = '┐';
    /// └
    pub const BOTTOM_LEFT: char = '└';
    /// ┘
    pub const BOTTOM_RIGHT: char = '┘';
}

fn fill(c: char, style: &str) -> Window {
    Window::new(DummyControl).with_char(c).with_style(style)
}

fn fill_cell(c: char, style: &str) -> Window {
    fill(c, style).with_width(1).with_height(1)
}

// === Text ===

/// How a [`TextArea`] shows its buffer.
#[derive(Clone)]
pub struct TextAreaOptions {
    /// Shows `*` for every character.
    pub password: bool,
    /// Lets the text area take focus.
    pub focusable: bool,
    /// Focuses the text area when clicked.
    pub focus_on_click: bool,
    /// Wraps long lines instead of scrolling horizontally.
    pub wrap_lines: bool,
    /// Shows a scrollbar on the right.
    pub scrollbar: bool,
    /// Shows line numbers on the left.
    pub line_numbers: bool,
    /// Text shown in front of the input.
    pub prompt: FormattedText,
    /// Extra style for the window.
    pub style: String,
    /// Width; the window stretches when unset.
    pub width: Option<Dimension>,
    /// Height; single-line buffers default to one row.
    pub height: Option<Dimension>,
    /// Does not grow wider than the text.
    pub dont_extend_width: bool,
    /// Does not grow taller than the text.
    pub dont_extend_height: bool,
    /// Syntax highlighting.
    pub lexer: Option<SharedLexer>,
    /// Buffer of the search field searching this text area.
    pub search_buffer: Option<BufferId>,
    /// Extra input processors, applied after the built-in ones.
    pub input_processors: Vec<SharedProcessor>,
}

impl fmt::Debug for TextAreaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextAreaOptions")
            .field("password", &self.password)
            .field("focusable", &self.focusable)
            .field("wrap_lines", &self.wrap_lines)
            .field("scrollbar", &self.scrollbar)
            .field("line_numbers", &self.line_numbers)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl Default for TextAreaOptions {
    fn default() -> Self {
        Self {
            password: false,
            focusable: true,
            focus_on_click: false,
            wrap_lines: true,
            scrollbar: false,
            line_numbers: false,
            prompt: FormattedText::default(),
            style: String::new(),
            width: None,
            height: None,
            dont_extend_width: false,
            dont_extend_height: false,
            lexer: None,
            search_buffer: None,
            input_processors: Vec::new(),
        }
    }
}

impl TextAreaOptions {
    /// Masks the input.
    pub fn with_password(mut self, password: bool) -> Self {
        self.password = password;
        self
    }

    /// Shows a scrollbar.
    pub fn with_scrollbar(mut self, scrollbar: bool) -> Self {
        self.scrollbar = scrollbar;
        self
    }

    /// Shows line numbers.
    pub fn with_line_numbers(mut self, line_numbers: bool) -> Self {
        self.line_numbers = line_numbers;
        self
    }

    /// Sets the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<FormattedText>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the window style.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Sets the height.
    pub fn with_height(mut self, height: impl Into<Dimension>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// Sets the width.
    pub fn with_width(mut self, width: impl Into<Dimension>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Links a search field.
    pub fn with_search_buffer(mut self, search_buffer: BufferId) -> Self {
        self.search_buffer = Some(search_buffer);
        self
    }

    /// Sets the lexer.
    pub fn with_lexer(mut self, lexer: SharedLexer) -> Self {
        self.lexer = Some(lexer);
        self
    }

    /// Sets whether the text area can take focus.
    pub fn with_focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }
}

/// An editable text field: a buffer shown in a window.
///
/// The buffer is handed to the [`AppContext`] and addressed by its id
/// afterwards, so the text stays readable after the widget has been moved
/// into the layout.
pub struct TextArea {
    buffer: BufferId,
    window: Window,
}

impl fmt::Debug for TextArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextArea")
            .field("buffer", &self.buffer)
            .field("window", &self.window.id())
            .finish_non_exhaustive()
    }
}

impl TextArea {
    /// A text area editing `buffer`.
    pub fn new(ctx: &mut AppContext, buffer: Buffer, options: TextAreaOptions) -> Self {
        let multiline = buffer.is_multiline();
        let buffer = ctx.add_buffer(buffer);

        let mut processors: Vec<SharedProcessor> = Vec::new();
        if !options.prompt.is_empty() {
            processors.push(Rc::new(BeforeInput::new(options.prompt.clone(), "class:text-area.prompt")));
        }
        if options.password {
            processors.push(Rc::new(PasswordProcessor::default()));
        }
        processors.extend(options.input_processors.iter().cloned());

        let mut control = BufferControl::new(buffer)
            .with_input_processors(processors)
            .with_focusable(options.focusable)
            .with_focus_on_click(options.focus_on_click);
        if let Some(lexer) = options.lexer.clone() {
            control = control.with_lexer(lexer);
        }
        if let Some(search_buffer) = options.search_buffer {
            control = control.with_search_buffer(search_buffer);
        }

        let height = options
            .height
            .unwrap_or_else(|| if multiline { Dimension::default() } else { Dimension::exact(1) });
        let mut window = Window::new(control)
            .with_height(height)
            .with_wrap_lines(options.wrap_lines)
            .with_dont_extend_width(options.dont_extend_width)
            .with_dont_extend_height(options.dont_extend_height)
            .with_style(format!("class:text-area {}", options.style).trim_end().to_string());
        if let Some(width) = options.width {
            window = window.with_width(width);
        }
        if options.line_numbers {
            window = window.with_left_margins(vec![Rc::new(NumberedMargin::new(false, false)) as SharedMargin]);
        }
        if options.scrollbar {
            window = window.with_right_margins(vec![Rc::new(ScrollbarMargin::new(true)) as SharedMargin]);
        }
        Self { buffer, window }
    }

    /// A single-line text area holding `text`.
    pub fn single_line(ctx: &mut AppContext, text: &str) -> Self {
        let mut buffer = Buffer::new();
        buffer.set_text(text);
        buffer.set_cursor_position(text.len());
        Self::new(ctx, buffer, TextAreaOptions::default())
    }

    /// The buffer's id.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    /// The window's id.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// The current text.
    pub fn text<'a>(&self, ctx: &'a AppContext) -> &'a str {
        ctx.buffer(self.buffer).map_or("", Buffer::text)
    }

    /// Replaces the text and moves the cursor to its end.
    pub fn set_text(&self, ctx: &mut AppContext, text: &str) {
        if let Some(buffer) = ctx.buffer_mut(self.buffer) {
            buffer.set_text(text);
            buffer.set_cursor_position(text.len());
        }
    }
}

impl Container for TextArea {
    delegate_container!(concrete window);
}

/// Non-editable text that is not focusable.
pub struct Label {
    window: Window,
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label").field("window", &self.window.id()).finish()
    }
}

impl Label {
    /// A label showing `text`, as wide as its longest line.
    pub fn new(text: impl Into<TextSource>) -> Self {
        let window = Window::new(FormattedTextControl::new(text))
            .with_height(Dimension::at_least(1))
            .with_dont_extend_height(true)
            .with_style("class:label");
        Self { window }
    }

    /// Adds a style after `class:label`.
    pub fn with_style(mut self, style: &str) -> Self {
        self.window = self.window.with_style(format!("class:label {style}"));
        self
    }

    /// Overrides the width.
    pub fn with_width(mut self, width: impl Into<DimensionSource>) -> Self {
        self.window = self.window.with_width(width);
        self
    }

    /// Keeps the label at its text width.
    pub fn with_dont_extend_width(mut self, dont_extend: bool) -> Self {
        self.window = self.window.with_dont_extend_width(dont_extend);
        self
    }
}

impl Container for Label {
    delegate_container!(concrete window);
}

// === Buttons ===

fn center(text: &str, width: usize) -> String {
    let text_width = str_width(text);
    if text_width >= width {
        return text.to_string();
    }
    let left = (width - text_width) / 2;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(width - text_width - left))
}

/// A clickable button, activated with Enter, Space or a click.
pub struct Button {
    window: Window,
    width: Rc<Cell<usize>>,
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("window", &self.window.id())
            .field("width", &self.width.get())
            .finish()
    }
}

impl Button {
    /// Width used unless changed with [`Button::with_width`].
    pub const DEFAULT_WIDTH: usize = 12;

    /// A button labelled `text` calling `handler`.
    pub fn new(text: impl Into<String>, handler: impl Fn(&mut AppContext) + 'static) -> Self {
        let text = text.into();
        let handler: WidgetHandler = Rc::new(handler);
        let width = Rc::new(Cell::new(Self::DEFAULT_WIDTH));

        let mut kb = KeyBindings::new();
        for key in [Key::Enter, Key::Char(' ')] {
            let handler = Rc::clone(&handler);
            kb.add(key, move |event| {
                handler(event.ctx);
                Ok(())
            });
        }

        let fragments = {
            let width = Rc::clone(&width);
            TextSource::dynamic(move |_| {
                let inner = width.get().saturating_sub(2);
                FormattedText::from_fragments(vec![
                    Fragment::new("class:button.arrow", "<"),
                    Fragment::new(SET_CURSOR_POSITION, ""),
                    Fragment::new("class:button.text", center(&text, inner)),
                    Fragment::new("class:button.arrow", ">"),
                ])
            })
        };
        let click = Rc::clone(&handler);
        let control = FormattedTextControl::new(fragments)
            .with_focusable(true)
            .with_key_bindings(kb.shared())
            .with_mouse_handler(move |ctx, event| {
                if event.event_type == MouseEventType::MouseUp {
                    click(ctx);
                    return true;
                }
                false
            });

        let window = Window::new(control)
            .with_align(WindowAlign::Center)
            .with_height(1)
            .with_width(Self::DEFAULT_WIDTH)
            .with_dont_extend_height(true);
        let id = window.id();
        let window = window.with_style(StyleSource::dynamic(move |ctx| {
            if ctx.focused_window() == Some(id) {
                "class:button.focused".to_string()
            } else {
                "class:button".to_string()
            }
        }));
        Self { window, width }
    }

    /// Sets the width, arrows included.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width.set(width);
        self.window = self.window.with_width(width);
        self
    }

    /// The window's id, for focusing the button.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }
}

impl Container for Button {
    delegate_container!(concrete window);
}

// === Decoration ===

/// A border around a container, with an optional title in the top edge.
pub struct Frame {
    inner: HSplit,
    title: Rc<RefCell<FormattedText>>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("title", &self.title.borrow().to_plain_text())
            .finish_non_exhaustive()
    }
}

impl Frame {
    /// A frame around `body`, without a title.
    pub fn new(body: ContainerRef) -> Self {
        let title = Rc::new(RefCell::new(FormattedText::default()));
        let border = "class:frame.border";

        let label_text = {
            let title = Rc::clone(&title);
            TextSource::dynamic(move |_| {
                let mut text = FormattedText::from(" ");
                text.extend(title.borrow().iter().cloned());
                text.push_str("", " ");
                text
            })
        };
        let label = Label::new(label_text)
            .with_style("class:frame.label")
            .with_dont_extend_width(true);
        let top_with_title = VSplit::new(vec![
            Box::new(fill_cell(Border::TOP_LEFT, border)),
            Box::new(fill(Border::HORIZONTAL, border)),
            Box::new(fill_cell('┤', border)),
            Box::new(label),
            Box::new(fill_cell('├', border)),
            Box::new(fill(Border::HORIZONTAL, border)),
            Box::new(fill_cell(Border::TOP_RIGHT, border)),
        ])
        .with_height(1);
        let top_without_title = VSplit::new(vec![
            Box::new(fill_cell(Border::TOP_LEFT, border)),
            Box::new(fill(Border::HORIZONTAL, border)),
            Box::new(fill_cell(Border::TOP_RIGHT, border)),
        ])
        .with_height(1);

        let has_title = {
            let title = Rc::clone(&title);
            Filter::new(move |_| !title.borrow().is_empty())
        };
        let middle = VSplit::new(vec![
            Box::new(fill(Border::VERTICAL, border).with_width(1)),
            body,
            Box::new(fill(Border::VERTICAL, border).with_width(1)),
        ]);
        let bottom = VSplit::new(vec![
            Box::new(fill_cell(Border::BOTTOM_LEFT, border)),
            Box::new(fill(Border::HORIZONTAL, border)),
            Box::new(fill_cell(Border::BOTTOM_RIGHT, border)),
        ])
        .with_height(1);

        let inner = HSplit::new(vec![
            Box::new(ConditionalContainer::new(Box::new(top_with_title), has_title.clone())),
            Box::new(ConditionalContainer::new(Box::new(top_without_title), !has_title)),
            Box::new(middle),
            Box::new(bottom),
        ])
        .with_style("class:frame");
        Self { inner, title }
    }

    /// Sets the title.
    pub fn with_title(self, title: impl Into<FormattedText>) -> Self {
        self.set_title(title);
        self
    }

    /// Changes the title; an empty title hides it.
    pub fn set_title(&self, title: impl Into<FormattedText>) {
        *self.title.borrow_mut() = title.into();
    }

    /// Adds a style after `class:frame`.
    pub fn with_style(mut self, style: &str) -> Self {
        self.inner = self.inner.with_style(format!("class:frame {style}"));
        self
    }

    /// Sets the width.
    pub fn with_width(mut self, width: impl Into<DimensionSource>) -> Self {
        self.inner = self.inner.with_width(width);
        self
    }

    /// Sets the height.
    pub fn with_height(mut self, height: impl Into<DimensionSource>) -> Self {
        self.inner = self.inner.with_height(height);
        self
    }

    /// Makes the frame modal.
    pub fn with_modal(mut self, modal: bool) -> Self {
        self.inner = self.inner.with_modal(modal);
        self
    }

    /// Bindings active while focus is inside the frame.
    pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
        self.inner = self.inner.with_key_bindings(key_bindings);
        self
    }
}

impl Container for Frame {
    delegate_container!(concrete inner);
}

fn grow(d: Dimension, amount: usize) -> Dimension {
    Dimension::new(
        Some(d.min + amount),
        Some(d.max.saturating_add(amount)),
        Some(d.preferred + amount),
        Some(d.weight),
    )
}

/// Draws a drop shadow one cell right of and below its body.
///
/// The shadow takes one extra column and row; it restyles whatever was
/// drawn there before with `class:shadow`.
pub struct Shadow {
    body: ContainerRef,
}

impl fmt::Debug for Shadow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shadow").finish_non_exhaustive()
    }
}

impl Shadow {
    /// A shadow under `body`.
    pub fn new(body: ContainerRef) -> Self {
        Self { body }
    }
}

impl Container for Shadow {
    fn reset(&mut self) {
        self.body.reset();
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        grow(self.body.preferred_width(ctx, max_available_width.saturating_sub(1)), 1)
    }

    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        grow(
            self.body
                .preferred_height(ctx, width.saturating_sub(1), max_available_height.saturating_sub(1)),
            1,
        )
    }

    fn write_to_screen(
        &mut self,
        ctx: &AppContext,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<i32>,
    ) {
        let WritePosition {
            xpos,
            ypos,
            width,
            height,
        } = write_position;
        if width < 2 || height < 2 {
            self.body
                .write_to_screen(ctx, screen, mouse_handlers, write_position, parent_style, erase_bg, z_index);
            return;
        }
        let body = WritePosition::new(xpos, ypos, width - 1, height - 1);
        self.body
            .write_to_screen(ctx, screen, mouse_handlers, body, parent_style, erase_bg, z_index);
        screen.fill_area(WritePosition::new(xpos + width - 1, ypos + 1, 1, height - 1), "class:shadow", true);
        screen.fill_area(WritePosition::new(xpos + 1, ypos + height - 1, width - 1, 1), "class:shadow", true);
    }

    fn children(&self) -> Vec<&dyn Container> {
        vec![self.body.as_ref()]
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        vec![self.body.as_mut()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Space around the body of a [`BoxWidget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Rows above.
    pub top: Dimension,
    /// Columns to the right.
    pub right: Dimension,
    /// Rows below.
    pub bottom: Dimension,
    /// Columns to the left.
    pub left: Dimension,
}

impl Default for Padding {
    /// Flexible padding that is zero unless the parent has room to spare.
    fn default() -> Self {
        Self::uniform(Dimension::preferred(0))
    }
}

impl Padding {
    /// The same padding on every side.
    pub fn uniform(d: Dimension) -> Self {
        Self {
            top: d,
            right: d,
            bottom: d,
            left: d,
        }
    }

    /// Exactly `amount` cells on every side.
    pub fn all(amount: usize) -> Self {
        Self::uniform(Dimension::exact(amount))
    }

    /// Exact padding, `vertical` rows above and below, `horizontal`
    /// columns left and right.
    pub fn symmetric(vertical: usize, horizontal: usize) -> Self {
        Self {
            top: Dimension::exact(vertical),
            right: Dimension::exact(horizontal),
            bottom: Dimension::exact(vertical),
            left: Dimension::exact(horizontal),
        }
    }
}

/// Padding around a container.
///
/// With the default flexible padding the box can grow beyond its body,
/// which lets fixed-size content sit inside splits that want to stretch.
pub struct BoxWidget {
    inner: HSplit,
}

impl fmt::Debug for BoxWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxWidget").finish_non_exhaustive()
    }
}

impl BoxWidget {
    /// `body` with flexible padding.
    pub fn new(body: ContainerRef) -> Self {
        Self::with_padding(body, Padding::default(), None)
    }

    /// `body` with the given padding, filled with `fill_char` when given.
    pub fn with_padding(body: ContainerRef, padding: Padding, fill_char: Option<char>) -> Self {
        let pad = |width: Option<Dimension>, height: Option<Dimension>| {
            let mut window = Window::new(DummyControl);
            if let Some(c) = fill_char {
                window = window.with_char(c);
            }
            if let Some(width) = width {
                window = window.with_width(width);
            }
            if let Some(height) = height {
                window = window.with_height(height);
            }
            Box::new(window) as ContainerRef
        };
        let inner = HSplit::new(vec![
            pad(None, Some(padding.top)),
            Box::new(VSplit::new(vec![
                pad(Some(padding.left), None),
                body,
                pad(Some(padding.right), None),
            ])),
            pad(None, Some(padding.bottom)),
        ]);
        Self { inner }
    }

    /// Sets the style.
    pub fn with_style(mut self, style: impl Into<StyleSource>) -> Self {
        self.inner = self.inner.with_style(style);
        self
    }

    /// Sets the width.
    pub fn with_width(mut self, width: impl Into<DimensionSource>) -> Self {
        self.inner = self.inner.with_width(width);
        self
    }

    /// Sets the height.
    pub fn with_height(mut self, height: impl Into<DimensionSource>) -> Self {
        self.inner = self.inner.with_height(height);
        self
    }

    /// Makes the box modal.
    pub fn with_modal(mut self, modal: bool) -> Self {
        self.inner = self.inner.with_modal(modal);
        self
    }

    /// Bindings active while focus is inside the box.
    pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
        self.inner = self.inner.with_key_bindings(key_bindings);
        self
    }
}

impl Container for BoxWidget {
    delegate_container!(concrete inner);
}

/// A one-row horizontal rule.
pub struct HorizontalLine {
    window: Window,
}

impl Default for HorizontalLine {
    fn default() -> Self {
        Self {
            window: fill(Border::HORIZONTAL, "class:line horizontal-line").with_height(1),
        }
    }
}

impl fmt::Debug for HorizontalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HorizontalLine").finish_non_exhaustive()
    }
}

impl HorizontalLine {
    /// A horizontal line.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Container for HorizontalLine {
    delegate_container!(concrete window);
}

/// A one-column vertical rule.
pub struct VerticalLine {
    window: Window,
}

impl Default for VerticalLine {
    fn default() -> Self {
        Self {
            window: fill(Border::VERTICAL, "class:line vertical-line").with_width(1),
        }
    }
}

impl fmt::Debug for VerticalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerticalLine").finish_non_exhaustive()
    }
}

impl VerticalLine {
    /// A vertical line.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Container for VerticalLine {
    delegate_container!(concrete window);
}

// === Selection lists ===

/// Look and behavior of a selection list.
#[derive(Debug, Clone, Copy)]
struct ListKind {
    open: &'static str,
    close: &'static str,
    container_style: &'static str,
    default_style: &'static str,
    selected_style: &'static str,
    checked_style: &'static str,
    multiple: bool,
}

const RADIO: ListKind = ListKind {
    open: "(",
    close: ")",
    container_style: "class:radio-list",
    default_style: "class:radio",
    selected_style: "class:radio-selected",
    checked_style: "class:radio-checked",
    multiple: false,
};

const CHECKBOX: ListKind = ListKind {
    open: "[",
    close: "]",
    container_style: "class:checkbox-list",
    default_style: "class:checkbox",
    selected_style: "class:checkbox-selected",
    checked_style: "class:checkbox-checked",
    multiple: true,
};

struct ListState<T> {
    values: Vec<(T, FormattedText)>,
    current_value: Option<T>,
    current_values: Vec<T>,
    selected: usize,
    multiple: bool,
}

impl<T: Clone + PartialEq> ListState<T> {
    fn toggle_selected(&mut self) {
        let Some((value, _)) = self.values.get(self.selected) else {
            return;
        };
        if !self.multiple {
            self.current_value = Some(value.clone());
        } else if let Some(i) = self.current_values.iter().position(|v| v == value) {
            self.current_values.remove(i);
        } else {
            self.current_values.push(value.clone());
        }
    }

    fn is_checked(&self, value: &T) -> bool {
        if self.multiple {
            self.current_values.contains(value)
        } else {
            self.current_value.as_ref() == Some(value)
        }
    }

    fn move_by(&mut self, delta: isize) {
        let last = self.values.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    /// Selects the next entry whose label starts with `prefix`, wrapping.
    fn find(&mut self, prefix: &str) {
        let prefix = prefix.to_lowercase();
        let count = self.values.len();
        let found = (1..=count)
            .map(|offset| (self.selected + offset) % count)
            .find(|&i| self.values[i].1.to_plain_text().to_lowercase().starts_with(&prefix));
        if let Some(i) = found {
            self.selected = i;
        }
    }
}

/// A handle on the values of a selection list that stays valid after the
/// list has been moved into the layout.
pub struct ListHandle<T>(Rc<RefCell<ListState<T>>>);

impl<T> Clone for ListHandle<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for ListHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("ListHandle")
            .field("len", &state.values.len())
            .field("selected", &state.selected)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq> ListHandle<T> {
    /// The checked value of a radio list.
    pub fn current_value(&self) -> Option<T> {
        self.0.borrow().current_value.clone()
    }

    /// The checked values of a checkbox list, in the order they were
    /// checked.
    pub fn current_values(&self) -> Vec<T> {
        self.0.borrow().current_values.clone()
    }

    /// Index of the highlighted entry.
    pub fn selected_index(&self) -> usize {
        self.0.borrow().selected
    }

    /// Checks `value` in a radio list.
    pub fn set_current_value(&self, value: T) {
        self.0.borrow_mut().current_value = Some(value);
    }

    /// Replaces the checked values of a checkbox list.
    pub fn set_current_values(&self, values: Vec<T>) {
        self.0.borrow_mut().current_values = values;
    }
}

fn list_fragments<T: Clone + PartialEq>(state: &ListState<T>, kind: ListKind) -> FormattedText {
    let mut text = FormattedText::default();
    for (i, (value, label)) in state.values.iter().enumerate() {
        let checked = state.is_checked(value);
        let selected = i == state.selected;
        let mut style = String::new();
        if checked {
            style.push_str(kind.checked_style);
        }
        if selected {
            style.push(' ');
            style.push_str(kind.selected_style);
        }
        let style = style.trim().to_string();

        text.push_str(style.clone(), kind.open);
        if selected {
            text.push_str(SET_CURSOR_POSITION, "");
        }
        text.push_str(style.clone(), if checked { "*" } else { " " });
        text.push_str(style, kind.close);
        text.push_str(kind.default_style, " ");
        text.extend(label.clone().with_style_prefix(kind.default_style).into_fragments());
        if i + 1 < state.values.len() {
            text.push_str("", "\n");
        }
    }
    text
}

fn build_list<T: Clone + PartialEq + 'static>(
    values: Vec<(T, FormattedText)>,
    kind: ListKind,
    show_scrollbar: bool,
) -> (Window, ListHandle<T>) {
    let current_value = if kind.multiple {
        None
    } else {
        values.first().map(|(v, _)| v.clone())
    };
    let state = Rc::new(RefCell::new(ListState {
        values,
        current_value,
        current_values: Vec::new(),
        selected: 0,
        multiple: kind.multiple,
    }));

    let mut kb = KeyBindings::new();
    {
        let state = Rc::clone(&state);
        kb.add(Key::Any, move |event| {
            let data = event.data().to_string();
            if !data.is_empty() && data.chars().all(|c| !c.is_control()) {
                state.borrow_mut().find(&data);
            }
            Ok(())
        });
    }
    for (key, delta) in [(Key::Up, -1), (Key::Down, 1)] {
        let state = Rc::clone(&state);
        kb.add(key, move |_| {
            state.borrow_mut().move_by(delta);
            Ok(())
        });
    }
    for (key, sign) in [(Key::PageUp, -1isize), (Key::PageDown, 1)] {
        let state = Rc::clone(&state);
        kb.add(key, move |event| {
            let page = event
                .ctx
                .focused_window()
                .and_then(|id| event.ctx.window_height(id))
                .unwrap_or(1)
                .max(1);
            state.borrow_mut().move_by(sign * page as isize);
            Ok(())
        });
    }
    for key in [Key::Enter, Key::Char(' ')] {
        let state = Rc::clone(&state);
        kb.add(key, move |_| {
            state.borrow_mut().toggle_selected();
            Ok(())
        });
    }

    let text = {
        let state = Rc::clone(&state);
        TextSource::dynamic(move |_| list_fragments(&state.borrow(), kind))
    };
    let click = Rc::clone(&state);
    let control = FormattedTextControl::new(text)
        .with_focusable(true)
        .with_key_bindings(kb.shared())
        .with_mouse_handler(move |ctx, event| {
            if event.event_type != MouseEventType::MouseUp {
                return false;
            }
            let mut state = click.borrow_mut();
            if event.position.y < state.values.len() {
                state.selected = event.position.y;
                state.toggle_selected();
                ctx.invalidate();
            }
            true
        });

    let mut window = Window::new(control)
        .with_style(kind.container_style)
        .with_dont_extend_height(true);
    if show_scrollbar {
        window = window.with_right_margins(vec![
            Rc::new(ConditionalMargin::new(ScrollbarMargin::new(true), true)) as SharedMargin
        ]);
    }
    (window, ListHandle(state))
}

/// Radio buttons; checking one unchecks the others.
pub struct RadioList<T> {
    window: Window,
    handle: ListHandle<T>,
}

impl<T> fmt::Debug for RadioList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioList").field("handle", &self.handle).finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> RadioList<T> {
    /// A radio list of `(value, label)` pairs; the first value starts
    /// checked.
    pub fn new(values: Vec<(T, FormattedText)>) -> Self {
        let (window, handle) = build_list(values, RADIO, true);
        Self { window, handle }
    }

    /// A handle for reading the checked value.
    pub fn handle(&self) -> ListHandle<T> {
        self.handle.clone()
    }

    /// The checked value.
    pub fn current_value(&self) -> Option<T> {
        self.handle.current_value()
    }
}

impl<T: 'static> Container for RadioList<T> {
    delegate_container!(concrete window);
}

/// Checkboxes; any number can be checked.
pub struct CheckboxList<T> {
    window: Window,
    handle: ListHandle<T>,
}

impl<T> fmt::Debug for CheckboxList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckboxList").field("handle", &self.handle).finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> CheckboxList<T> {
    /// A checkbox list of `(value, label)` pairs, all unchecked.
    pub fn new(values: Vec<(T, FormattedText)>) -> Self {
        let (window, handle) = build_list(values, CHECKBOX, true);
        Self { window, handle }
    }

    /// A handle for reading the checked values.
    pub fn handle(&self) -> ListHandle<T> {
        self.handle.clone()
    }

    /// The checked values.
    pub fn current_values(&self) -> Vec<T> {
        self.handle.current_values()
    }
}

impl<T: 'static> Container for CheckboxList<T> {
    delegate_container!(concrete window);
}

/// A single checkbox.
pub struct Checkbox {
    window: Window,
    handle: ListHandle<()>,
}

impl fmt::Debug for Checkbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkbox").field("checked", &self.checked()).finish_non_exhaustive()
    }
}

impl Checkbox {
    /// A checkbox labelled `text`.
    pub fn new(text: impl Into<FormattedText>, checked: bool) -> Self {
        let (window, handle) = build_list(vec![((), text.into())], CHECKBOX, false);
        let checkbox = Self { window, handle };
        checkbox.set_checked(checked);
        checkbox
    }

    /// A handle that reports the state once the checkbox is in a layout.
    pub fn handle(&self) -> CheckboxHandle {
        CheckboxHandle(self.handle.clone())
    }

    /// Whether the box is checked.
    pub fn checked(&self) -> bool {
        self.handle().checked()
    }

    /// Checks or unchecks the box.
    pub fn set_checked(&self, checked: bool) {
        self.handle().set_checked(checked);
    }
}

impl Container for Checkbox {
    delegate_container!(concrete window);
}

/// Reads and changes a [`Checkbox`] from outside the layout.
#[derive(Debug, Clone)]
pub struct CheckboxHandle(ListHandle<()>);

impl CheckboxHandle {
    /// Whether the box is checked.
    pub fn checked(&self) -> bool {
        !self.0.current_values().is_empty()
    }

    /// Checks or unchecks the box.
    pub fn set_checked(&self, checked: bool) {
        self.0.set_current_values(if checked { vec![()] } else { Vec::new() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::key_binding::{KeyBindingsBase, KeyPressEvent};
    use pretty_assertions::assert_eq;
    use quill_input::KeyPress;

    fn draw(ctx: &AppContext, container: &mut dyn Container, width: usize, height: usize) -> Vec<String> {
        let mut screen = Screen::new(width, height);
        let mut handlers = MouseHandlers::new();
        container.write_to_screen(
            ctx,
            &mut screen,
            &mut handlers,
            WritePosition::new(0, 0, width, height),
            "",
            true,
            None,
        );
        screen.to_lines().into_iter().map(|l| l.trim_end().to_string()).collect()
    }

    fn press(ctx: &mut AppContext, container: &dyn Container, key: Key) {
        let kb = container
            .children()
            .iter()
            .find_map(|c| c.as_window().and_then(|w| w.content().key_bindings()))
            .expect("control bindings");
        let binding = kb
            .bindings()
            .into_iter()
            .rev()
            .find(|b| b.keys.matches(&[key]))
            .expect("binding for key");
        let data = match key {
            Key::Char(c) => c.to_string(),
            _ => String::new(),
        };
        let mut event = KeyPressEvent::new(ctx, vec![KeyPress::new(key, data)], None);
        (binding.handler())(&mut event).unwrap();
    }

    #[test]
    fn test_frame_with_title() {
        let ctx = test_context();
        let body = Window::new(FormattedTextControl::new("body"));
        let mut frame = Frame::new(Box::new(body)).with_title("T");
        let lines = draw(&ctx, &mut frame, 12, 3);
        assert!(lines[0].starts_with('┌') && lines[0].ends_with('┐'), "{}", lines[0]);
        assert!(lines[0].contains("┤ T ├"), "{}", lines[0]);
        assert_eq!(lines[0].chars().count(), 12);
        assert_eq!(&lines[1..], ["│body      │", "└──────────┘"]);
    }

    #[test]
    fn test_frame_without_title() {
        let ctx = test_context();
        let mut frame = Frame::new(Box::new(Window::new(FormattedTextControl::new("x"))));
        assert_eq!(draw(&ctx, &mut frame, 4, 3), vec!["┌──┐", "│x │", "└──┘"]);
    }

    #[test]
    fn test_box_padding() {
        let ctx = test_context();
        let body = Window::new(FormattedTextControl::new("ab"));
        let mut boxed = BoxWidget::with_padding(Box::new(body), Padding::all(1), Some('.'));
        assert_eq!(draw(&ctx, &mut boxed, 4, 3), vec!["....", ".ab.", "...."]);
    }

    #[test]
    fn test_shadow_styles_strips() {
        let ctx = test_context();
        let mut shadow = Shadow::new(Box::new(Window::new(FormattedTextControl::new("ab\ncd"))));
        let mut screen = Screen::new(3, 3);
        let mut handlers = MouseHandlers::new();
        shadow.write_to_screen(&ctx, &mut screen, &mut handlers, WritePosition::new(0, 0, 3, 3), "", true, None);
        assert!(screen.get(2, 1).style.contains("class:shadow"));
        assert!(screen.get(1, 2).style.contains("class:shadow"));
        assert!(!screen.get(0, 0).style.contains("class:shadow"));
        assert!(!screen.get(2, 0).style.contains("class:shadow"));
    }

    #[test]
    fn test_horizontal_line() {
        let ctx = test_context();
        let mut line = HorizontalLine::new();
        assert_eq!(line.preferred_height(&ctx, 5, 10), Dimension::exact(1));
        assert_eq!(draw(&ctx, &mut line, 5, 1), vec!["─────"]);
    }

    #[test]
    fn test_split_with_centered_window_and_separator() {
        let ctx = test_context();
        let w1 = Window::new(FormattedTextControl::new("W1")).with_width(10);
        let w2 = Window::new(FormattedTextControl::new("W2"))
            .with_width(Dimension::at_least(5))
            .with_align(WindowAlign::Center);
        let mut root = HSplit::new(vec![
            Box::new(VSplit::new(vec![Box::new(w1), Box::new(w2)])),
            Box::new(HorizontalLine::new()),
        ]);
        let lines = draw(&ctx, &mut root, 80, 24);
        // W2 has the 70 columns right of W1 and centers its text in them.
        assert_eq!(lines[0], format!("{:<44}W2", "W1"));
        let separators: Vec<usize> = (0..lines.len()).filter(|&i| lines[i] == "─".repeat(80)).collect();
        assert_eq!(separators, vec![23]);
    }

    #[test]
    fn test_button_draws_centered_text() {
        let ctx = test_context();
        let mut button = Button::new("OK", |_| {}).with_width(8);
        assert_eq!(draw(&ctx, &mut button, 8, 1), vec!["<  OK  >"]);
    }

    #[test]
    fn test_button_enter_calls_handler() {
        let mut ctx = test_context();
        let pressed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pressed);
        let button = Button::new("Go", move |_| counter.set(counter.get() + 1));
        let window: &dyn Container = &button;
        let kb = window.children()[0]
            .as_window()
            .and_then(|w| w.content().key_bindings())
            .unwrap();
        for binding in kb.bindings() {
            let mut event = KeyPressEvent::new(&mut ctx, Vec::new(), None);
            (binding.handler())(&mut event).unwrap();
        }
        assert_eq!(pressed.get(), 2);
    }

    #[test]
    fn test_radio_list_selection() {
        let mut ctx = test_context();
        let mut list = RadioList::new(vec![
            ("red", FormattedText::from("Red")),
            ("green", FormattedText::from("Green")),
            ("blue", FormattedText::from("Blue")),
        ]);
        assert_eq!(list.current_value(), Some("red"));
        press(&mut ctx, &list, Key::Down);
        press(&mut ctx, &list, Key::Enter);
        assert_eq!(list.current_value(), Some("green"));
        press(&mut ctx, &list, Key::Char('b'));
        assert_eq!(list.handle().selected_index(), 2);
        let lines = draw(&ctx, &mut list, 12, 3);
        assert!(lines[0].starts_with("( ) Red"));
        assert!(lines[1].starts_with("(*) Green"));
        assert!(lines[2].starts_with("( ) Blue"));
    }

    #[test]
    fn test_checkbox_list_toggles() {
        let mut ctx = test_context();
        let list = CheckboxList::new(vec![(1, FormattedText::from("one")), (2, FormattedText::from("two"))]);
        press(&mut ctx, &list, Key::Char(' '));
        press(&mut ctx, &list, Key::Down);
        press(&mut ctx, &list, Key::Enter);
        assert_eq!(list.current_values(), vec![1, 2]);
        press(&mut ctx, &list, Key::Up);
        press(&mut ctx, &list, Key::Enter);
        assert_eq!(list.current_values(), vec![2]);
    }

    #[test]
    fn test_checkbox() {
        let ctx = test_context();
        let mut checkbox = Checkbox::new("Accept", true);
        let handle = checkbox.handle();
        assert!(handle.checked());
        assert_eq!(draw(&ctx, &mut checkbox, 12, 1), vec!["[*] Accept"]);
        handle.set_checked(false);
        assert!(!checkbox.checked());
    }

    #[test]
    fn test_text_area_text() {
        let mut ctx = test_context();
        let area = TextArea::single_line(&mut ctx, "hello");
        assert_eq!(area.text(&ctx), "hello");
        area.set_text(&mut ctx, "bye");
        assert_eq!(area.text(&ctx), "bye");
        let mut area = area;
        assert_eq!(area.preferred_height(&ctx, 10, 10), Dimension::exact(1));
    }

    #[test]
    fn test_label_width_follows_text() {
        let ctx = test_context();
        let mut label = Label::new("abc\nlonger").with_dont_extend_width(true);
        assert_eq!(label.preferred_width(&ctx, 80).preferred, 6);
    }

    #[test]
    fn test_button_cursor_sits_after_arrow() {
        let mut ctx = test_context();
        let mut button = Button::new("OK", |_| {}).with_width(8);
        ctx.focus_window(button.window_id());
        let mut screen = Screen::new(8, 1);
        let mut handlers = MouseHandlers::new();
        button.write_to_screen(
            &ctx,
            &mut screen,
            &mut handlers,
            WritePosition::new(0, 0, 8, 1),
            "",
            true,
            None,
        );
        assert_eq!(screen.get_cursor_position(button.window_id()), quill_core::Point::new(1, 0));
    }
}
