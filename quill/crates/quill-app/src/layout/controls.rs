//! Controls: what a [`Window`](super::Window) shows.
//!
//! A control produces a [`UIContent`] for a given size: a lazily evaluated
//! list of styled lines plus the cursor and menu anchors. The window takes
//! care of scrolling, wrapping and margins.

use super::dimension::UNBOUNDED;
use super::lexers::{LineLexer, SharedLexer, SimpleLexer};
use super::mouse_handlers::MouseHandler;
use super::processors::{
    default_input_processors, merge_processors, ControlState, SharedProcessor, TransformationInput,
};
use crate::context::{AppContext, BufferId};
use crate::key_binding::SharedKeyBindings;
pub use quill_core::formatted_text::{SET_CURSOR_POSITION, SET_MENU_POSITION};
use quill_core::formatted_text::{fragment_list_to_text, fragment_list_width, split_lines};
use quill_core::geometry::Point;
use quill_core::id::WindowId;
use quill_core::width::str_width;
use quill_core::{FormattedText, Fragment};
use quill_edit::SelectionType;
use quill_input::{MouseButton, MouseEventType};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Formatted text given either as a value or computed on each frame.
#[derive(Clone)]
pub enum TextSource {
    /// Fixed text.
    Static(FormattedText),
    /// Computed from application state.
    Dynamic(Rc<dyn Fn(&AppContext) -> FormattedText>),
}

impl fmt::Debug for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

impl Default for TextSource {
    fn default() -> Self {
        Self::Static(FormattedText::new())
    }
}

impl TextSource {
    /// Text computed from application state.
    pub fn dynamic(f: impl Fn(&AppContext) -> FormattedText + 'static) -> Self {
        Self::Dynamic(Rc::new(f))
    }

    /// Resolves the text for this frame.
    pub fn get(&self, ctx: &AppContext) -> FormattedText {
        match self {
            Self::Static(text) => text.clone(),
            Self::Dynamic(f) => f(ctx),
        }
    }
}

impl From<&str> for TextSource {
    fn from(text: &str) -> Self {
        Self::Static(text.into())
    }
}

impl From<String> for TextSource {
    fn from(text: String) -> Self {
        Self::Static(text.into())
    }
}

impl From<FormattedText> for TextSource {
    fn from(text: FormattedText) -> Self {
        Self::Static(text)
    }
}

/// Text put in front of each displayed line: `(ctx, line number, wrap
/// count)`. The wrap count is 0 for the first row of a line.
pub type GetLinePrefix = Rc<dyn Fn(&AppContext, usize, usize) -> FormattedText>;

type GetLine = Box<dyn Fn(usize) -> Vec<Fragment>>;

/// The content of a control for one frame.
pub struct UIContent {
    get_line: GetLine,
    /// Number of lines.
    pub line_count: usize,
    /// Cursor position in content coordinates.
    pub cursor_position: Option<Point>,
    /// Where completion menus should be anchored.
    pub menu_position: Option<Point>,
    /// Whether the terminal cursor should be shown when focused.
    pub show_cursor: bool,
    cache: RefCell<HashMap<usize, Rc<[Fragment]>>>,
}

impl fmt::Debug for UIContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UIContent")
            .field("line_count", &self.line_count)
            .field("cursor_position", &self.cursor_position)
            .field("menu_position", &self.menu_position)
            .finish_non_exhaustive()
    }
}

impl Default for UIContent {
    fn default() -> Self {
        Self::new(0, |_| Vec::new())
    }
}

impl UIContent {
    /// Content of `line_count` lines produced on demand.
    pub fn new(line_count: usize, get_line: impl Fn(usize) -> Vec<Fragment> + 'static) -> Self {
        Self {
            get_line: Box::new(get_line),
            line_count,
            cursor_position: None,
            menu_position: None,
            show_cursor: true,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Content from ready lines.
    pub fn from_lines(lines: Vec<Vec<Fragment>>) -> Self {
        let count = lines.len();
        Self::new(count, move |i| lines.get(i).cloned().unwrap_or_default())
    }

    /// Sets the cursor position.
    pub fn with_cursor_position(mut self, position: Option<Point>) -> Self {
        self.cursor_position = position;
        self
    }

    /// Sets the menu anchor.
    pub fn with_menu_position(mut self, position: Option<Point>) -> Self {
        self.menu_position = position;
        self
    }

    /// Shows or hides the cursor.
    pub fn with_show_cursor(mut self, show: bool) -> Self {
        self.show_cursor = show;
        self
    }

    /// The fragments of line `i`; empty past the end.
    pub fn get_line(&self, i: usize) -> Rc<[Fragment]> {
        if i >= self.line_count {
            return Rc::from(Vec::new());
        }
        if let Some(line) = self.cache.borrow().get(&i) {
            return Rc::clone(line);
        }
        let line: Rc<[Fragment]> = Rc::from((self.get_line)(i));
        self.cache.borrow_mut().insert(i, Rc::clone(&line));
        line
    }

    /// Rows line `lineno` takes when wrapped at `width`, counting line
    /// prefixes. `slice_stop` measures only the first characters.
    pub fn get_height_for_line(
        &self,
        ctx: &AppContext,
        lineno: usize,
        width: usize,
        get_line_prefix: Option<&GetLinePrefix>,
        slice_stop: Option<usize>,
    ) -> usize {
        if width == 0 {
            return UNBOUNDED;
        }
        let text = fragment_list_to_text(&self.get_line(lineno));
        let text: String = match slice_stop {
            Some(stop) => text.chars().take(stop).collect(),
            None => text,
        };
        let mut text_width = str_width(&text);

        let Some(prefix) = get_line_prefix else {
            return text_width.div_ceil(width).max(1);
        };
        text_width += prefix(ctx, lineno, 0).width();
        let mut height = 1;
        while text_width > width {
            height += 1;
            text_width -= width;
            let prefix_width = prefix(ctx, lineno, height - 1).width();
            if prefix_width >= width {
                return UNBOUNDED;
            }
            text_width += prefix_width;
        }
        height
    }
}

/// Content provider of a window.
pub trait UIControl {
    /// Clears per-run state.
    fn reset(&mut self) {}

    /// Width the control would like; `None` for no preference.
    fn preferred_width(&mut self, _ctx: &AppContext, _max_available_width: usize) -> Option<usize> {
        None
    }

    /// Height the control would like at `width`; `None` for no preference.
    fn preferred_height(
        &mut self,
        _ctx: &AppContext,
        _window: WindowId,
        _width: usize,
        _max_available_height: usize,
        _wrap_lines: bool,
        _get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        None
    }

    /// Whether the window showing this control can take focus.
    fn is_focusable(&self) -> bool {
        false
    }

    /// Produces the content for a `width` by `height` area.
    fn create_content(&mut self, ctx: &AppContext, window: WindowId, width: usize, height: usize) -> UIContent;

    /// Handler for mouse events inside the content, in content
    /// coordinates. Returning false lets the window handle scrolling.
    fn mouse_handler(&self, _window: WindowId) -> Option<MouseHandler> {
        None
    }

    /// Bindings active while the control's window has focus.
    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        None
    }

    /// The buffer the control edits.
    fn buffer(&self) -> Option<BufferId> {
        None
    }

    /// The buffer of the search field searching this control.
    fn search_buffer(&self) -> Option<BufferId> {
        None
    }

    /// Whether searches in this control ignore case.
    fn search_ignore_case(&self) -> bool {
        false
    }
}

/// A control without content, used to fill space.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyControl;

impl UIControl for DummyControl {
    fn create_content(&mut self, _ctx: &AppContext, _window: WindowId, _width: usize, _height: usize) -> UIContent {
        UIContent::default()
    }
}

// === Formatted text ===

fn find_marker(lines: &[Vec<Fragment>], marker: &str) -> Option<Point> {
    lines.iter().enumerate().find_map(|(y, line)| {
        let mut x = 0;
        for fragment in line {
            if fragment.style.contains(marker) {
                return Some(Point::new(x, y));
            }
            x += fragment.text.chars().count();
        }
        None
    })
}

/// Shows formatted text, static or computed per frame.
pub struct FormattedTextControl {
    text: TextSource,
    style: String,
    focusable: bool,
    show_cursor: bool,
    key_bindings: Option<SharedKeyBindings>,
    get_cursor_position: Option<Rc<dyn Fn(&AppContext) -> Option<Point>>>,
    mouse_handler: Option<MouseHandler>,
}

impl fmt::Debug for FormattedTextControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormattedTextControl")
            .field("text", &self.text)
            .field("style", &self.style)
            .field("focusable", &self.focusable)
            .finish_non_exhaustive()
    }
}

impl FormattedTextControl {
    /// A control showing `text`.
    pub fn new(text: impl Into<TextSource>) -> Self {
        Self {
            text: text.into(),
            style: String::new(),
            focusable: false,
            show_cursor: true,
            key_bindings: None,
            get_cursor_position: None,
            mouse_handler: None,
        }
    }

    /// Style prepended to every fragment.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Lets the window take focus.
    pub fn with_focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    /// Shows or hides the cursor while focused.
    pub fn with_show_cursor(mut self, show: bool) -> Self {
        self.show_cursor = show;
        self
    }

    /// Bindings active while focused.
    pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
        self.key_bindings = Some(key_bindings);
        self
    }

    /// Computes the cursor position instead of looking for the marker.
    pub fn with_cursor_position(mut self, f: impl Fn(&AppContext) -> Option<Point> + 'static) -> Self {
        self.get_cursor_position = Some(Rc::new(f));
        self
    }

    /// Handles mouse events, in content coordinates.
    pub fn with_mouse_handler(mut self, handler: impl Fn(&mut AppContext, quill_input::MouseEvent) -> bool + 'static) -> Self {
        self.mouse_handler = Some(Rc::new(handler));
        self
    }

    fn lines(&self, ctx: &AppContext) -> Vec<Vec<Fragment>> {
        let text = self.text.get(ctx);
        let text = if self.style.is_empty() {
            text
        } else {
            text.with_style_prefix(&self.style)
        };
        split_lines(&text)
    }
}

impl UIControl for FormattedTextControl {
    fn preferred_width(&mut self, ctx: &AppContext, _max_available_width: usize) -> Option<usize> {
        self.lines(ctx).iter().map(|l| fragment_list_width(l)).max()
    }

    fn preferred_height(
        &mut self,
        ctx: &AppContext,
        window: WindowId,
        width: usize,
        max_available_height: usize,
        wrap_lines: bool,
        get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        let content = self.create_content(ctx, window, width, 1);
        if !wrap_lines {
            return Some(content.line_count);
        }
        let mut height = 0;
        for i in 0..content.line_count {
            height += content.get_height_for_line(ctx, i, width, get_line_prefix, None);
            if height >= max_available_height {
                return Some(max_available_height);
            }
        }
        Some(height)
    }

    fn is_focusable(&self) -> bool {
        self.focusable
    }

    fn create_content(&mut self, ctx: &AppContext, _window: WindowId, _width: usize, _height: usize) -> UIContent {
        let lines = self.lines(ctx);
        let cursor_position = match &self.get_cursor_position {
            Some(f) => f(ctx),
            None => find_marker(&lines, SET_CURSOR_POSITION),
        };
        let menu_position = find_marker(&lines, SET_MENU_POSITION);
        UIContent::from_lines(lines)
            .with_cursor_position(cursor_position)
            .with_menu_position(menu_position)
            .with_show_cursor(self.show_cursor)
    }

    fn mouse_handler(&self, _window: WindowId) -> Option<MouseHandler> {
        self.mouse_handler.clone()
    }

    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        self.key_bindings.clone()
    }
}

// === Buffers ===

/// One processed line of a buffer control.
pub struct ProcessedLine {
    /// Styled, transformed fragments.
    pub fragments: Vec<Fragment>,
    /// Buffer column to displayed column.
    pub source_to_display: super::processors::PositionMap,
    /// Displayed column to buffer column.
    pub display_to_source: super::processors::PositionMap,
}

impl fmt::Debug for ProcessedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedLine")
            .field("fragments", &self.fragments)
            .finish_non_exhaustive()
    }
}

type GetProcessedLine = Rc<dyn Fn(usize) -> Rc<ProcessedLine>>;

/// What the mouse handler needs from the last frame.
#[derive(Default)]
struct LastRender {
    get_processed_line: Option<GetProcessedLine>,
    last_click: Cell<Option<Instant>>,
}

impl LastRender {
    fn display_to_source(&self, row: usize, x: usize) -> usize {
        self.get_processed_line
            .as_ref()
            .map_or(x, |get| (get(row).display_to_source)(x))
    }
}

const DOUBLE_CLICK: Duration = Duration::from_millis(300);

/// Shows and edits a [`Buffer`](quill_edit::Buffer) of the context.
pub struct BufferControl {
    buffer: BufferId,
    input_processors: Vec<SharedProcessor>,
    include_default_input_processors: bool,
    lexer: SharedLexer,
    preview_search: bool,
    focusable: bool,
    focus_on_click: bool,
    search_buffer: Option<BufferId>,
    search_ignore_case: bool,
    menu_position: Option<Rc<dyn Fn(&AppContext) -> Option<usize>>>,
    key_bindings: Option<SharedKeyBindings>,
    last_render: Rc<RefCell<LastRender>>,
}

impl fmt::Debug for BufferControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferControl")
            .field("buffer", &self.buffer)
            .field("input_processors", &self.input_processors.len())
            .field("search_buffer", &self.search_buffer)
            .finish_non_exhaustive()
    }
}

impl BufferControl {
    /// A control for `buffer`.
    pub fn new(buffer: BufferId) -> Self {
        Self {
            buffer,
            input_processors: Vec::new(),
            include_default_input_processors: true,
            lexer: Rc::new(SimpleLexer::default()),
            preview_search: true,
            focusable: true,
            focus_on_click: false,
            search_buffer: None,
            search_ignore_case: false,
            menu_position: None,
            key_bindings: None,
            last_render: Rc::new(RefCell::new(LastRender::default())),
        }
    }

    /// Processors run after the default ones.
    pub fn with_input_processors(mut self, processors: Vec<SharedProcessor>) -> Self {
        self.input_processors = processors;
        self
    }

    /// Skips the search and selection highlighting processors.
    pub fn without_default_input_processors(mut self) -> Self {
        self.include_default_input_processors = false;
        self
    }

    /// Highlights the text.
    pub fn with_lexer(mut self, lexer: SharedLexer) -> Self {
        self.lexer = lexer;
        self
    }

    /// Shows where an incremental search would land while typing it.
    pub fn with_preview_search(mut self, preview: bool) -> Self {
        self.preview_search = preview;
        self
    }

    /// Whether the window can take focus.
    pub fn with_focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    /// Focuses the window on click.
    pub fn with_focus_on_click(mut self, focus_on_click: bool) -> Self {
        self.focus_on_click = focus_on_click;
        self
    }

    /// Links the search field used to search this control.
    pub fn with_search_buffer(mut self, search_buffer: BufferId) -> Self {
        self.search_buffer = Some(search_buffer);
        self
    }

    /// Searches ignore case.
    pub fn with_search_ignore_case(mut self, ignore_case: bool) -> Self {
        self.search_ignore_case = ignore_case;
        self
    }

    /// Anchors menus at a computed buffer index instead of the completion
    /// start.
    pub fn with_menu_position(mut self, f: impl Fn(&AppContext) -> Option<usize> + 'static) -> Self {
        self.menu_position = Some(Rc::new(f));
        self
    }

    /// Bindings active while focused.
    pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
        self.key_bindings = Some(key_bindings);
        self
    }

    /// The buffer shown.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    fn control_state(&self, ctx: &AppContext, window: WindowId) -> Option<ControlState> {
        let buffer = ctx.buffer(self.buffer)?;
        let link = ctx
            .search_link()
            .filter(|l| l.target == self.buffer && l.target_window == window);
        let incsearch_text = link
            .and_then(|l| ctx.buffer(l.search_buffer))
            .map(|b| b.text().to_string())
            .unwrap_or_default();
        let document = match (&ctx.search_preview, link) {
            (Some(preview), Some(_)) if self.preview_search && !incsearch_text.is_empty() => preview.clone(),
            _ => buffer.document().clone(),
        };
        let search = ctx.search_state(self.buffer);
        Some(ControlState {
            document,
            search_text: search.text,
            incsearch_text,
            search_ignore_case: search.ignore_case || self.search_ignore_case,
            has_focus: ctx.focused_window() == Some(window),
            is_done: ctx.is_done(),
            key_arg: ctx.key_arg().map(str::to_string),
            suggestion: buffer.suggestion().map(|s| s.text.clone()),
        })
    }

    fn processed_lines(&self, ctx: &AppContext, state: Rc<ControlState>, width: usize, height: usize) -> GetProcessedLine {
        let mut processors = Vec::new();
        if self.include_default_input_processors {
            processors.extend(default_input_processors());
        }
        processors.extend(self.input_processors.iter().cloned());
        let processor = merge_processors(processors);
        processor.refresh(ctx);

        let lexed: LineLexer = self.lexer.lex_document(&state.document);
        let cache: RefCell<HashMap<usize, Rc<ProcessedLine>>> = RefCell::new(HashMap::new());
        Rc::new(move |lineno| {
            if let Some(line) = cache.borrow().get(&lineno) {
                return Rc::clone(line);
            }
            let fragments = lexed(lineno);
            let transformation = processor.apply_transformation(&TransformationInput {
                state: &state,
                lineno,
                source_to_display: &|i| i,
                fragments: &fragments,
                width,
                height,
            });
            let line = Rc::new(ProcessedLine {
                fragments: transformation.fragments,
                source_to_display: transformation.source_to_display,
                display_to_source: transformation.display_to_source,
            });
            cache.borrow_mut().insert(lineno, Rc::clone(&line));
            line
        })
    }
}

impl UIControl for BufferControl {
    fn reset(&mut self) {
        *self.last_render.borrow_mut() = LastRender::default();
    }

    fn preferred_height(
        &mut self,
        ctx: &AppContext,
        window: WindowId,
        width: usize,
        max_available_height: usize,
        wrap_lines: bool,
        get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        let content = self.create_content(ctx, window, width, 1);
        if !wrap_lines {
            return Some(content.line_count);
        }
        if content.line_count >= max_available_height {
            return Some(max_available_height);
        }
        let mut height = 0;
        for i in 0..content.line_count {
            height += content.get_height_for_line(ctx, i, width, get_line_prefix, None);
            if height >= max_available_height {
                return Some(max_available_height);
            }
        }
        Some(height)
    }

    fn is_focusable(&self) -> bool {
        self.focusable
    }

    fn create_content(&mut self, ctx: &AppContext, window: WindowId, width: usize, height: usize) -> UIContent {
        let Some(state) = self.control_state(ctx, window) else {
            return UIContent::default();
        };
        let state = Rc::new(state);
        let document = state.document.clone();
        let get_processed_line = self.processed_lines(ctx, Rc::clone(&state), width, height);
        self.last_render.borrow_mut().get_processed_line = Some(Rc::clone(&get_processed_line));

        let translate = {
            let get = Rc::clone(&get_processed_line);
            move |row: usize, col: usize| Point::new((get(row).source_to_display)(col), row)
        };
        let cursor = translate(document.cursor_position_row(), document.cursor_position_col());

        let menu_position = if state.has_focus {
            let buffer = ctx.buffer(self.buffer);
            let index = match &self.menu_position {
                Some(f) => f(ctx),
                None => buffer.and_then(|b| {
                    b.complete_state()
                        .map(|cs| b.cursor_position().min(cs.original_document.cursor_position()))
                }),
            };
            index.and_then(|index| {
                let (row, col) = buffer?.document().translate_index_to_position(index);
                Some(translate(row, col))
            })
        } else {
            None
        };

        let get = Rc::clone(&get_processed_line);
        // The cell after the text is a valid cursor position on every line,
        // so wrapping does not change when the cursor moves.
        UIContent::new(document.line_count(), move |i| {
            let mut fragments = get(i).fragments.clone();
            fragments.push(Fragment::plain(" "));
            fragments
        })
        .with_cursor_position(Some(cursor))
        .with_menu_position(menu_position)
    }

    fn mouse_handler(&self, window: WindowId) -> Option<MouseHandler> {
        let buffer_id = self.buffer;
        let focus_on_click = self.focus_on_click;
        let last = Rc::clone(&self.last_render);
        Some(Rc::new(move |ctx, event| {
            if ctx.focused_window() != Some(window) {
                if focus_on_click && event.event_type == MouseEventType::MouseUp {
                    ctx.focus_window(window);
                    return true;
                }
                return false;
            }
            let row = event.position.y;
            let col = last.borrow().display_to_source(row, event.position.x);
            let Some(buffer) = ctx.buffer_mut(buffer_id) else {
                return false;
            };
            let index = buffer.document().translate_row_col_to_index(row, col);
            match event.event_type {
                MouseEventType::MouseDown => {
                    buffer.exit_selection();
                    buffer.set_cursor_position(index);
                }
                MouseEventType::MouseMove if event.button != MouseButton::None => {
                    if buffer.selection().is_none() && buffer.cursor_position() != index {
                        buffer.start_selection(SelectionType::Characters);
                    }
                    buffer.set_cursor_position(index);
                }
                MouseEventType::MouseUp => {
                    if buffer.cursor_position().abs_diff(index) > 1 {
                        if buffer.selection().is_none() {
                            buffer.start_selection(SelectionType::Characters);
                        }
                        buffer.set_cursor_position(index);
                    }
                    let last = last.borrow();
                    let now = Instant::now();
                    let double_click = last
                        .last_click
                        .get()
                        .is_some_and(|t| now.duration_since(t) < DOUBLE_CLICK);
                    last.last_click.set(Some(now));
                    if double_click {
                        let (start, end) = buffer.document().find_boundaries_of_current_word(false, false, false);
                        buffer.move_cursor(start);
                        buffer.start_selection(SelectionType::Characters);
                        buffer.move_cursor(end - start);
                    }
                }
                _ => return false,
            }
            true
        }))
    }

    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        self.key_bindings.clone()
    }

    fn buffer(&self) -> Option<BufferId> {
        Some(self.buffer)
    }

    fn search_buffer(&self) -> Option<BufferId> {
        self.search_buffer
    }

    fn search_ignore_case(&self) -> bool {
        self.search_ignore_case
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::layout::processors::BeforeInput;
    use pretty_assertions::assert_eq;
    use quill_edit::{Buffer, Document};

    fn text_of(content: &UIContent, i: usize) -> String {
        fragment_list_to_text(&content.get_line(i))
    }

    #[test]
    fn test_formatted_text_lines_and_markers() {
        let ctx = test_context();
        let text = FormattedText::from(vec![("", "ab\nc"), ("[SetCursorPosition]", ""), ("", "d")]);
        let mut control = FormattedTextControl::new(text);
        let content = control.create_content(&ctx, WindowId::new(), 10, 5);
        assert_eq!(content.line_count, 2);
        assert_eq!(text_of(&content, 1), "cd");
        assert_eq!(content.cursor_position, Some(Point::new(1, 1)));
        assert_eq!(control.preferred_width(&ctx, 80), Some(2));
    }

    #[test]
    fn test_height_for_line_wraps() {
        let ctx = test_context();
        let content = UIContent::from_lines(vec![vec![Fragment::plain("abcdefghij")]]);
        assert_eq!(content.get_height_for_line(&ctx, 0, 4, None, None), 3);
        assert_eq!(content.get_height_for_line(&ctx, 0, 4, None, Some(4)), 1);

        let prefix: GetLinePrefix = Rc::new(|_, _, _| FormattedText::from("> "));
        assert_eq!(content.get_height_for_line(&ctx, 0, 6, Some(&prefix), None), 3);
    }

    #[test]
    fn test_buffer_control_cursor_follows_processors() {
        let mut ctx = test_context();
        let id = ctx.add_buffer(Buffer::new().with_document(Document::with_cursor("hello\nworld", 8)));
        let mut control = BufferControl::new(id).with_input_processors(vec![Rc::new(BeforeInput::new("$ ", ""))]);
        let content = control.create_content(&ctx, WindowId::new(), 20, 5);

        assert_eq!(content.line_count, 2);
        assert_eq!(text_of(&content, 0), "$ hello ");
        assert_eq!(text_of(&content, 1), "world ");
        assert_eq!(content.cursor_position, Some(Point::new(2, 1)));
        assert_eq!(content.menu_position, None);
    }

    #[test]
    fn test_buffer_control_preferred_height() {
        let mut ctx = test_context();
        let id = ctx.add_buffer(Buffer::new().with_document(Document::new("abcdefgh\nx")));
        let mut control = BufferControl::new(id);
        let window = WindowId::new();
        assert_eq!(control.preferred_height(&ctx, window, 5, 10, false, None), Some(2));
        // "abcdefgh " wraps to two rows at width 5.
        assert_eq!(control.preferred_height(&ctx, window, 5, 10, true, None), Some(3));
        assert_eq!(control.preferred_height(&ctx, window, 5, 2, true, None), Some(2));
    }
}
