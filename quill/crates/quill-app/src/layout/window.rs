//! The leaf container: a control drawn with scrolling, wrapping and
//! margins.

use super::containers::Container;
use super::controls::{GetLinePrefix, UIContent, UIControl};
use super::dimension::{to_dimension, Dimension, DimensionSource};
use super::margins::SharedMargin;
use super::mouse_handlers::{MouseHandler, MouseHandlers};
use crate::context::{AppContext, BufferId};
use crate::filters::Filter;
use crate::key_binding::SharedKeyBindings;
use quill_core::formatted_text::{explode_fragments, fragment_list_to_text, fragment_list_width};
use quill_core::width::str_width;
use quill_core::{FormattedText, Fragment, Point, WindowId};
use quill_input::{MouseEvent, MouseEventType};
use quill_screen::char::empty_style;
use quill_screen::{Char, Screen, WritePosition};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Horizontal alignment of the lines in a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowAlign {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Lines (or columns) kept visible around the cursor when scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOffsets {
    /// Above the cursor.
    pub top: usize,
    /// Below the cursor.
    pub bottom: usize,
    /// Left of the cursor.
    pub left: usize,
    /// Right of the cursor.
    pub right: usize,
}

impl ScrollOffsets {
    /// The same offset in all directions.
    pub fn all(amount: usize) -> Self {
        Self {
            top: amount,
            bottom: amount,
            left: amount,
            right: amount,
        }
    }
}

/// A style string given either as a value or computed on each frame.
#[derive(Clone)]
pub enum StyleSource {
    /// A fixed style.
    Static(String),
    /// Computed from application state.
    Dynamic(Rc<dyn Fn(&AppContext) -> String>),
}

impl fmt::Debug for StyleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(style) => f.debug_tuple("Static").field(style).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

impl Default for StyleSource {
    fn default() -> Self {
        Self::Static(String::new())
    }
}

impl StyleSource {
    /// A style computed from application state.
    pub fn dynamic(f: impl Fn(&AppContext) -> String + 'static) -> Self {
        Self::Dynamic(Rc::new(f))
    }

    /// Resolves the style for this frame.
    pub fn get(&self, ctx: &AppContext) -> String {
        match self {
            Self::Static(style) => style.clone(),
            Self::Dynamic(f) => f(ctx),
        }
    }
}

impl From<&str> for StyleSource {
    fn from(style: &str) -> Self {
        Self::Static(style.to_string())
    }
}

impl From<String> for StyleSource {
    fn from(style: String) -> Self {
        Self::Static(style)
    }
}

/// Where the content of a window landed during the last frame.
///
/// Margins are drawn from this, and the page navigation bindings read the
/// visible line range from it.
#[derive(Debug, Clone, Default)]
pub struct WindowRenderInfo {
    /// Width of the body, without margins.
    pub window_width: usize,
    /// Height of the window.
    pub window_height: usize,
    /// First content line drawn.
    pub vertical_scroll: usize,
    /// Columns scrolled off the left side.
    pub horizontal_scroll: usize,
    /// Number of content lines.
    pub content_height: usize,
    /// Cursor in content coordinates.
    pub cursor_position: Option<Point>,
    /// The content line shown on each window row.
    pub displayed_lines: Vec<usize>,
    /// Screen column of the body's left edge.
    pub x_offset: usize,
    /// Screen row of the window's top edge.
    pub y_offset: usize,
    /// Whether long lines wrapped.
    pub wrap_lines: bool,
    /// Scroll offsets configured on the window.
    pub scroll_offsets: ScrollOffsets,
    /// Content `(row, col)` to screen `(y, x)`.
    pub rowcol_to_yx: HashMap<(usize, usize), (usize, usize)>,
}

impl WindowRenderInfo {
    /// The cursor relative to the window's top-left corner.
    pub fn window_cursor_position(&self) -> Point {
        self.cursor_position
            .and_then(|p| self.rowcol_to_yx.get(&(p.y, p.x)))
            .map_or(Point::ZERO, |&(y, x)| {
                Point::new(x.saturating_sub(self.x_offset), y.saturating_sub(self.y_offset))
            })
    }

    /// First visible content line, optionally after the top scroll offset.
    pub fn first_visible_line(&self, after_scroll_offset: bool) -> usize {
        let skip = if after_scroll_offset { self.scroll_offsets.top } else { 0 };
        self.displayed_lines
            .get(skip)
            .or_else(|| self.displayed_lines.last())
            .copied()
            .unwrap_or(0)
    }

    /// Last visible content line, optionally before the bottom scroll
    /// offset.
    pub fn last_visible_line(&self, before_scroll_offset: bool) -> usize {
        let skip = if before_scroll_offset { self.scroll_offsets.bottom } else { 0 };
        let count = self.displayed_lines.len();
        self.displayed_lines
            .get(count.saturating_sub(1 + skip))
            .copied()
            .unwrap_or(0)
    }

    /// The line in the middle of the window.
    pub fn center_visible_line(&self) -> usize {
        let first = self.first_visible_line(true);
        first + (self.last_visible_line(true).saturating_sub(first)) / 2
    }

    /// Whether the first content line is visible.
    pub fn top_visible(&self) -> bool {
        self.vertical_scroll == 0
    }

    /// Whether the last content line is visible.
    pub fn bottom_visible(&self) -> bool {
        self.last_visible_line(false) + 1 >= self.content_height
    }

    /// Whether all content is visible.
    pub fn full_height_visible(&self) -> bool {
        self.top_visible() && self.bottom_visible()
    }
}

// === Copying content to the screen ===

/// Draws UIContent lines into a rectangle of the screen.
struct BodyWriter<'a> {
    ctx: &'a AppContext,
    screen: &'a mut Screen,
    xpos: usize,
    ypos: usize,
    width: usize,
    height: usize,
    wrap_lines: bool,
    align: WindowAlign,
    horizontal_scroll: usize,
    get_line_prefix: Option<&'a GetLinePrefix>,
    visible_line_to_row_col: BTreeMap<isize, (usize, usize)>,
    rowcol_to_yx: HashMap<(usize, usize), (usize, usize)>,
}

struct CopiedBody {
    xpos: usize,
    ypos: usize,
    /// Content `(row, first column)` of each row drawn.
    visible_line_to_row_col: BTreeMap<usize, (usize, usize)>,
    rowcol_to_yx: HashMap<(usize, usize), (usize, usize)>,
}

impl CopiedBody {
    /// Screen position of a content position. Positions past the drawn
    /// text are placed right of the last drawn column.
    fn to_screen(&self, position: Point) -> Point {
        if let Some(&(y, x)) = self.rowcol_to_yx.get(&(position.y, position.x)) {
            return Point::new(x, y);
        }
        let before = self
            .rowcol_to_yx
            .iter()
            .filter(|((row, col), _)| *row == position.y && *col < position.x)
            .max_by_key(|((_, col), _)| *col);
        if let Some(((_, col), &(y, x))) = before {
            return Point::new(x + (position.x - col), y);
        }
        let row = self
            .visible_line_to_row_col
            .iter()
            .find(|(_, (row, _))| *row == position.y)
            .map_or(0, |(y, _)| *y);
        Point::new(self.xpos, self.ypos + row)
    }
}

impl BodyWriter<'_> {
    fn copy_line(&mut self, line: &[Fragment], lineno: usize, mut x: isize, mut y: isize, is_input: bool) -> (isize, isize) {
        if is_input {
            if let Some(prefix) = self.get_line_prefix {
                let prompt = prefix(self.ctx, lineno, 0);
                (x, y) = self.copy_line(&prompt, lineno, x, y, false);
            }
        }

        let exploded;
        let mut line = line;
        let mut skipped = 0;
        if is_input && self.horizontal_scroll > 0 {
            exploded = explode_fragments(line);
            let mut remaining = self.horizontal_scroll as isize;
            let mut start = 0;
            while remaining > 0 && start < exploded.len() {
                remaining -= str_width(&exploded[start].text) as isize;
                skipped += 1;
                start += 1;
            }
            // Scrolling over half of a wide character leaves x negative.
            x -= remaining;
            line = &exploded[start..];
        }

        if is_input {
            let line_width = fragment_list_width(line);
            if line_width < self.width {
                match self.align {
                    WindowAlign::Left => {}
                    WindowAlign::Center => x += ((self.width - line_width) / 2) as isize,
                    WindowAlign::Right => x += (self.width - line_width) as isize,
                }
            }
        }

        let width = self.width as isize;
        let mut col = 0;
        let mut wrap_count = 0;
        for fragment in line {
            if fragment.is_zero_width_escape() {
                if x >= 0 && y >= 0 {
                    self.screen
                        .add_zero_width_escape(self.xpos + x as usize, self.ypos + y as usize, &fragment.text);
                }
                continue;
            }
            let style: Rc<str> = Rc::from(fragment.style.as_str());
            for c in fragment.text.chars() {
                let cell = Char::new(c, &style);
                let char_width = cell.width as isize;

                if self.wrap_lines && x + char_width > width {
                    let first_col = self.visible_line_to_row_col.get(&y).map_or(0, |(_, col)| *col);
                    self.visible_line_to_row_col
                        .insert(y + 1, (lineno, first_col + x.max(0) as usize));
                    y += 1;
                    wrap_count += 1;
                    x = 0;
                    if is_input {
                        if let Some(prefix) = self.get_line_prefix {
                            let prompt = prefix(self.ctx, lineno, wrap_count);
                            (x, y) = self.copy_line(&prompt, lineno, x, y, false);
                        }
                    }
                    if y >= self.height as isize {
                        return (x, y);
                    }
                }

                if x >= 0 && y >= 0 && x < width {
                    let (sx, sy) = (self.xpos + x as usize, self.ypos + y as usize);
                    if char_width == 0 {
                        if x > 0 {
                            self.screen.write_char(sx, sy, c, &style);
                        }
                    } else {
                        self.screen.set(sx, sy, cell);
                        for i in 1..cell_width(char_width) {
                            self.screen.set(sx + i, sy, Char::placeholder());
                        }
                    }
                    self.rowcol_to_yx.insert((lineno, col + skipped), (sy, sx));
                }
                col += 1;
                x += char_width;
            }
        }
        (x, y)
    }

    fn copy(mut self, content: &UIContent, vertical_scroll: usize, vertical_scroll_2: usize) -> CopiedBody {
        let mut y = -(vertical_scroll_2 as isize);
        let mut lineno = vertical_scroll;
        while y < self.height as isize && lineno < content.line_count {
            let line = content.get_line(lineno);
            self.visible_line_to_row_col.insert(y, (lineno, self.horizontal_scroll));
            let (_, last_y) = self.copy_line(&line, lineno, 0, y, true);
            y = last_y + 1;
            lineno += 1;
        }
        self.screen.ensure_height(self.ypos + self.height);
        CopiedBody {
            xpos: self.xpos,
            ypos: self.ypos,
            visible_line_to_row_col: self
                .visible_line_to_row_col
                .into_iter()
                .filter(|(y, _)| *y >= 0 && *y < self.height as isize)
                .map(|(y, v)| (y as usize, v))
                .collect(),
            rowcol_to_yx: self.rowcol_to_yx,
        }
    }
}

fn cell_width(width: isize) -> usize {
    width.max(0) as usize
}

/// Copies a margin's text into its column.
fn copy_margin(ctx: &AppContext, text: FormattedText, screen: &mut Screen, wp: WritePosition) {
    let content = UIContent::from_lines(text.split_lines());
    let writer = BodyWriter {
        ctx,
        screen,
        xpos: wp.xpos,
        ypos: wp.ypos,
        width: wp.width,
        height: wp.height,
        wrap_lines: false,
        align: WindowAlign::Left,
        horizontal_scroll: 0,
        get_line_prefix: None,
        visible_line_to_row_col: BTreeMap::new(),
        rowcol_to_yx: HashMap::new(),
    };
    writer.copy(&content, 0, 0);
}

// === Window ===

/// What the window's mouse fallback needs to scroll with the wheel.
#[derive(Clone)]
struct WheelScroll {
    vertical_scroll: Rc<Cell<usize>>,
    buffer: Option<BufferId>,
    content_height: usize,
    window_height: usize,
    cursor_y: usize,
    offsets: ScrollOffsets,
}

impl WheelScroll {
    fn handle(&self, ctx: &mut AppContext, event: MouseEvent) -> bool {
        let scroll = self.vertical_scroll.get();
        match event.event_type {
            MouseEventType::ScrollDown => {
                if scroll + self.window_height < self.content_height {
                    if self.cursor_y <= self.offsets.top {
                        if let Some(buffer) = self.buffer.and_then(|id| ctx.buffer_mut(id)) {
                            buffer.cursor_down(1);
                        }
                    }
                    self.vertical_scroll.set(scroll + 1);
                }
                true
            }
            MouseEventType::ScrollUp => {
                if scroll > 0 {
                    if self.cursor_y + 1 + self.offsets.bottom >= self.window_height {
                        if let Some(buffer) = self.buffer.and_then(|id| ctx.buffer_mut(id)) {
                            buffer.cursor_up(1);
                        }
                    }
                    self.vertical_scroll.set(scroll - 1);
                }
                true
            }
            _ => false,
        }
    }
}

/// Shows a [`UIControl`].
///
/// The window decides the part of the content that is visible: it keeps
/// the cursor in view (honoring the scroll offsets), wraps long lines when
/// asked, aligns lines and draws margins on both sides. Its size comes
/// from the configured dimensions merged with the control's preference.
pub struct Window {
    id: WindowId,
    content: Box<dyn UIControl>,
    width: Option<DimensionSource>,
    height: Option<DimensionSource>,
    dont_extend_width: Filter,
    dont_extend_height: Filter,
    ignore_content_width: Filter,
    ignore_content_height: Filter,
    left_margins: Vec<SharedMargin>,
    right_margins: Vec<SharedMargin>,
    scroll_offsets: ScrollOffsets,
    allow_scroll_beyond_bottom: Filter,
    wrap_lines: Filter,
    always_hide_cursor: Filter,
    align: WindowAlign,
    style: StyleSource,
    fill_char: Option<char>,
    get_line_prefix: Option<GetLinePrefix>,
    vertical_scroll: Rc<Cell<usize>>,
    vertical_scroll_2: usize,
    horizontal_scroll: usize,
    render_info: Option<WindowRenderInfo>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("align", &self.align)
            .field("vertical_scroll", &self.vertical_scroll.get())
            .finish_non_exhaustive()
    }
}

impl Window {
    /// A window showing `content`.
    pub fn new(content: impl UIControl + 'static) -> Self {
        Self::from_boxed(Box::new(content))
    }

    /// A window showing a boxed control.
    pub fn from_boxed(content: Box<dyn UIControl>) -> Self {
        Self {
            id: WindowId::new(),
            content,
            width: None,
            height: None,
            dont_extend_width: Filter::Never,
            dont_extend_height: Filter::Never,
            ignore_content_width: Filter::Never,
            ignore_content_height: Filter::Never,
            left_margins: Vec::new(),
            right_margins: Vec::new(),
            scroll_offsets: ScrollOffsets::default(),
            allow_scroll_beyond_bottom: Filter::Never,
            wrap_lines: Filter::Never,
            always_hide_cursor: Filter::Never,
            align: WindowAlign::Left,
            style: StyleSource::default(),
            fill_char: None,
            get_line_prefix: None,
            vertical_scroll: Rc::new(Cell::new(0)),
            vertical_scroll_2: 0,
            horizontal_scroll: 0,
            render_info: None,
        }
    }

    /// Sets the width.
    pub fn with_width(mut self, width: impl Into<DimensionSource>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Sets the height.
    pub fn with_height(mut self, height: impl Into<DimensionSource>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// Never grows wider than the content.
    pub fn with_dont_extend_width(mut self, filter: impl Into<Filter>) -> Self {
        self.dont_extend_width = filter.into();
        self
    }

    /// Never grows taller than the content.
    pub fn with_dont_extend_height(mut self, filter: impl Into<Filter>) -> Self {
        self.dont_extend_height = filter.into();
        self
    }

    /// Ignores the content's preferred width.
    pub fn with_ignore_content_width(mut self, filter: impl Into<Filter>) -> Self {
        self.ignore_content_width = filter.into();
        self
    }

    /// Ignores the content's preferred height.
    pub fn with_ignore_content_height(mut self, filter: impl Into<Filter>) -> Self {
        self.ignore_content_height = filter.into();
        self
    }

    /// Margins left of the body.
    pub fn with_left_margins(mut self, margins: Vec<SharedMargin>) -> Self {
        self.left_margins = margins;
        self
    }

    /// Margins right of the body.
    pub fn with_right_margins(mut self, margins: Vec<SharedMargin>) -> Self {
        self.right_margins = margins;
        self
    }

    /// Lines kept visible around the cursor.
    pub fn with_scroll_offsets(mut self, offsets: ScrollOffsets) -> Self {
        self.scroll_offsets = offsets;
        self
    }

    /// Allows scrolling the last line above the bottom edge.
    pub fn with_allow_scroll_beyond_bottom(mut self, filter: impl Into<Filter>) -> Self {
        self.allow_scroll_beyond_bottom = filter.into();
        self
    }

    /// Wraps long lines instead of scrolling horizontally.
    pub fn with_wrap_lines(mut self, filter: impl Into<Filter>) -> Self {
        self.wrap_lines = filter.into();
        self
    }

    /// Hides the cursor even when focused.
    pub fn with_always_hide_cursor(mut self, filter: impl Into<Filter>) -> Self {
        self.always_hide_cursor = filter.into();
        self
    }

    /// Aligns lines.
    pub fn with_align(mut self, align: WindowAlign) -> Self {
        self.align = align;
        self
    }

    /// Style applied to the whole window.
    pub fn with_style(mut self, style: impl Into<StyleSource>) -> Self {
        self.style = style.into();
        self
    }

    /// Fills the background with a character.
    pub fn with_char(mut self, c: char) -> Self {
        self.fill_char = Some(c);
        self
    }

    /// Text drawn in front of every line and every wrapped row.
    pub fn with_line_prefix(mut self, f: impl Fn(&AppContext, usize, usize) -> FormattedText + 'static) -> Self {
        self.get_line_prefix = Some(Rc::new(f));
        self
    }

    /// The window's identity, used for focus.
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// The control shown.
    pub fn content(&self) -> &dyn UIControl {
        self.content.as_ref()
    }

    /// The control shown.
    pub fn content_mut(&mut self) -> &mut dyn UIControl {
        self.content.as_mut()
    }

    /// What was drawn during the last frame.
    pub fn render_info(&self) -> Option<&WindowRenderInfo> {
        self.render_info.as_ref()
    }

    /// First content line drawn.
    pub fn vertical_scroll(&self) -> usize {
        self.vertical_scroll.get()
    }

    /// Scrolls to a content line; the next frame keeps the cursor visible.
    pub fn set_vertical_scroll(&mut self, scroll: usize) {
        self.vertical_scroll.set(scroll);
    }

    fn margin_widths(&mut self, ctx: &AppContext) -> (Vec<usize>, Vec<usize>) {
        let id = self.id;
        let content = RefCell::new(&mut self.content);
        let get_ui_content = || content.borrow_mut().create_content(ctx, id, 0, 0);
        let left = self
            .left_margins
            .iter()
            .map(|m| m.get_width(ctx, &get_ui_content))
            .collect();
        let right = self
            .right_margins
            .iter()
            .map(|m| m.get_width(ctx, &get_ui_content))
            .collect();
        (left, right)
    }

    fn total_margin_width(&mut self, ctx: &AppContext) -> usize {
        let (left, right) = self.margin_widths(ctx);
        left.iter().sum::<usize>() + right.iter().sum::<usize>()
    }

    /// Merges a configured dimension with the content's preference: an
    /// explicit preferred size wins, the content's preference is kept
    /// inside the configured bounds, and `dont_extend` caps the maximum.
    fn merge_dimensions(
        dimension: Dimension,
        get_preferred: impl FnOnce() -> Option<usize>,
        dont_extend: bool,
    ) -> Dimension {
        let mut preferred = if dimension.preferred_specified() {
            Some(dimension.preferred)
        } else {
            get_preferred()
        };
        if let Some(p) = preferred.as_mut() {
            if dimension.max_specified() {
                *p = (*p).min(dimension.max);
            }
            if dimension.min_specified() {
                *p = (*p).max(dimension.min);
            }
        }
        let max = match preferred {
            Some(p) if dont_extend => Some(dimension.max.min(p)),
            _ => dimension.max_specified().then_some(dimension.max),
        };
        let min = dimension.min_specified().then_some(dimension.min);
        Dimension::new(min, max, preferred, Some(dimension.weight))
    }

    // === Scrolling ===

    fn scroll(&mut self, ctx: &AppContext, content: &UIContent, width: usize, height: usize, wrap_lines: bool) {
        if wrap_lines {
            self.scroll_when_linewrapping(ctx, content, width, height);
        } else {
            self.scroll_without_linewrapping(ctx, content, width, height);
        }
    }

    fn scroll_when_linewrapping(&mut self, ctx: &AppContext, content: &UIContent, width: usize, height: usize) {
        let offsets = self.scroll_offsets;
        self.horizontal_scroll = 0;
        let cursor = content.cursor_position.unwrap_or(Point::ZERO);
        let prefix = self.get_line_prefix.as_ref();

        if width == 0 {
            self.vertical_scroll.set(cursor.y);
            self.vertical_scroll_2 = 0;
            return;
        }
        let line_height = |lineno| content.get_height_for_line(ctx, lineno, width, prefix, None);

        // A cursor line taller than the window scrolls inside the line.
        let cursor_line_height = line_height(cursor.y);
        if cursor_line_height > height.saturating_sub(offsets.top) {
            let text_before_height = content.get_height_for_line(ctx, cursor.y, width, prefix, Some(cursor.x));
            self.vertical_scroll.set(cursor.y);
            let upper = text_before_height
                .saturating_sub(1)
                .min(cursor_line_height.saturating_sub(height))
                .min(self.vertical_scroll_2);
            self.vertical_scroll_2 = upper.max(text_before_height.saturating_sub(height));
            return;
        }
        self.vertical_scroll_2 = 0;

        // Lowest scroll that keeps the cursor line above the bottom offset.
        let min_vertical_scroll = {
            let mut used = 0;
            let mut prev = cursor.y;
            let mut result = 0;
            for lineno in (0..=cursor.y).rev() {
                used += line_height(lineno);
                if used > height.saturating_sub(offsets.bottom) {
                    result = prev;
                    break;
                }
                prev = lineno;
            }
            result
        };
        // Highest scroll that keeps the cursor line below the top offset.
        let max_vertical_scroll = {
            let mut used = 0;
            let mut prev = cursor.y;
            for lineno in (0..cursor.y).rev() {
                used += line_height(lineno);
                if used > offsets.top {
                    break;
                }
                prev = lineno;
            }
            prev
        };
        // Highest scroll that still shows the last line at the bottom.
        let topmost_visible = {
            let mut used = 0;
            let mut prev = content.line_count.saturating_sub(1);
            for lineno in (0..content.line_count).rev() {
                used += line_height(lineno);
                if used > height {
                    break;
                }
                prev = lineno;
            }
            prev
        };

        let mut scroll = self.vertical_scroll.get();
        scroll = scroll.max(topmost_visible.min(min_vertical_scroll));
        scroll = scroll.min(max_vertical_scroll);
        if !self.allow_scroll_beyond_bottom.eval(ctx) {
            scroll = scroll.min(topmost_visible);
        }
        self.vertical_scroll.set(scroll);
    }

    fn scroll_without_linewrapping(&mut self, ctx: &AppContext, content: &UIContent, width: usize, height: usize) {
        let cursor = content.cursor_position.unwrap_or(Point::ZERO);
        self.vertical_scroll_2 = 0;
        if content.line_count == 0 {
            self.vertical_scroll.set(0);
            self.horizontal_scroll = 0;
            return;
        }
        let current_line_text = fragment_list_to_text(&content.get_line(cursor.y));
        let allow_beyond_bottom = self.allow_scroll_beyond_bottom.eval(ctx);

        let do_scroll = |current: usize, offset_start: usize, offset_end: usize, cursor_pos: usize, window_size: usize, content_size: usize| {
            let offset_start = offset_start.min(window_size / 2).min(cursor_pos);
            let offset_end = offset_end
                .min(window_size / 2)
                .min(content_size.saturating_sub(1 + cursor_pos));
            let mut current = current;
            if !allow_beyond_bottom && current + window_size > content_size {
                current = content_size.saturating_sub(window_size);
            }
            if current + offset_start > cursor_pos {
                current = cursor_pos.saturating_sub(offset_start);
            }
            if current + window_size < cursor_pos + 1 + offset_end {
                current = (cursor_pos + 1 + offset_end).saturating_sub(window_size);
            }
            current
        };

        let offsets = self.scroll_offsets;
        self.vertical_scroll.set(do_scroll(
            self.vertical_scroll.get(),
            offsets.top,
            offsets.bottom,
            cursor.y,
            height,
            content.line_count,
        ));

        let prefix_width = self
            .get_line_prefix
            .as_ref()
            .map_or(0, |prefix| prefix(ctx, cursor.y, 0).width());
        let text_before_cursor: String = current_line_text.chars().take(cursor.x).collect();
        self.horizontal_scroll = do_scroll(
            self.horizontal_scroll,
            offsets.left,
            offsets.right,
            str_width(&text_before_cursor),
            width.saturating_sub(prefix_width),
            str_width(&current_line_text).max(self.horizontal_scroll + width),
        );
    }

    // === Drawing ===

    fn fill_bg(&self, screen: &mut Screen, wp: WritePosition, erase_bg: bool) {
        if !erase_bg && self.fill_char.is_none() {
            return;
        }
        let cell = Char::new(self.fill_char.unwrap_or(' '), &empty_style());
        for y in wp.ypos..wp.ypos + wp.height {
            for x in wp.xpos..wp.xpos + wp.width {
                screen.set(x, y, cell.clone());
            }
        }
    }

    fn apply_style(&self, ctx: &AppContext, screen: &mut Screen, wp: WritePosition, parent_style: &str) {
        let style = format!("{parent_style} {}", self.style.get(ctx));
        screen.fill_area(wp, &style, false);
        let last_line = WritePosition::new(wp.xpos, wp.ypos + wp.height - 1, wp.width, 1);
        screen.fill_area(last_line, "class:last-line", true);
    }

    fn body_mouse_handler(&self, body: &CopiedBody, wp: WritePosition, info: &WindowRenderInfo) -> MouseHandler {
        let id = self.id;
        let yx_to_rowcol: HashMap<(usize, usize), (usize, usize)> =
            body.rowcol_to_yx.iter().map(|(rowcol, yx)| (*yx, *rowcol)).collect();
        let max_y = wp.ypos + body.visible_line_to_row_col.len().saturating_sub(1);
        let control_handler = self.content.mouse_handler(id);
        let wheel = WheelScroll {
            vertical_scroll: Rc::clone(&self.vertical_scroll),
            buffer: self.content.buffer(),
            content_height: info.content_height,
            window_height: info.window_height,
            cursor_y: info.window_cursor_position().y,
            offsets: self.scroll_offsets,
        };

        Rc::new(move |ctx: &mut AppContext, event: MouseEvent| {
            if !ctx.in_focused_modal_scope(id) {
                return false;
            }
            // Below the content, act on the last line; right of a line or
            // on the right half of a wide character, act on the cell left.
            let y = event.position.y.min(max_y);
            let position = (0..=event.position.x)
                .rev()
                .find_map(|x| yx_to_rowcol.get(&(y, x)))
                .map_or(Point::ZERO, |&(row, col)| Point::new(col, row));
            let handled = control_handler.as_ref().is_some_and(|handler| {
                handler(
                    ctx,
                    MouseEvent {
                        position,
                        ..event
                    },
                )
            });
            handled || wheel.handle(ctx, event)
        })
    }

    fn write_to_screen_at_index(
        &mut self,
        ctx: &AppContext,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        wp: WritePosition,
        parent_style: &str,
        erase_bg: bool,
    ) {
        if wp.width == 0 || wp.height == 0 {
            return;
        }
        let (left_widths, right_widths) = self.margin_widths(ctx);
        let left_total: usize = left_widths.iter().sum();
        let right_total: usize = right_widths.iter().sum();
        let body_width = wp.width.saturating_sub(left_total + right_total);

        let content = self.content.create_content(ctx, self.id, body_width, wp.height);
        let wrap_lines = self.wrap_lines.eval(ctx);
        self.scroll(ctx, &content, body_width, wp.height, wrap_lines);
        self.fill_bg(screen, wp, erase_bg);

        let writer = BodyWriter {
            ctx,
            screen: &mut *screen,
            xpos: wp.xpos + left_total,
            ypos: wp.ypos,
            width: body_width,
            height: wp.height,
            wrap_lines,
            align: self.align,
            horizontal_scroll: self.horizontal_scroll,
            get_line_prefix: self.get_line_prefix.as_ref(),
            visible_line_to_row_col: BTreeMap::new(),
            rowcol_to_yx: HashMap::new(),
        };
        let body = writer.copy(&content, self.vertical_scroll.get(), self.vertical_scroll_2);

        if let Some(cursor) = content.cursor_position {
            if ctx.focused_window() == Some(self.id) {
                screen.set_cursor_position(self.id, body.to_screen(cursor));
                screen.show_cursor = content.show_cursor && !self.always_hide_cursor.eval(ctx);
            }
        }
        if let Some(menu) = content.menu_position {
            screen.set_menu_position(self.id, body.to_screen(menu));
        }

        let info = WindowRenderInfo {
            window_width: body_width,
            window_height: wp.height,
            vertical_scroll: self.vertical_scroll.get(),
            horizontal_scroll: self.horizontal_scroll,
            content_height: content.line_count,
            cursor_position: content.cursor_position,
            displayed_lines: body.visible_line_to_row_col.values().map(|(row, _)| *row).collect(),
            x_offset: wp.xpos + left_total,
            y_offset: wp.ypos,
            wrap_lines,
            scroll_offsets: self.scroll_offsets,
            rowcol_to_yx: body.rowcol_to_yx.clone(),
        };

        let handler = self.body_mouse_handler(&body, wp, &info);
        mouse_handlers.set_mouse_handler_for_range(
            wp.xpos + left_total,
            wp.xpos + left_total + body_width,
            wp.ypos,
            wp.ypos + wp.height,
            &handler,
        );

        let mut x = wp.xpos;
        for (margin, width) in self.left_margins.iter().zip(&left_widths) {
            if *width > 0 {
                let text = margin.create_margin(ctx, &info, *width, wp.height);
                copy_margin(ctx, text, screen, WritePosition::new(x, wp.ypos, *width, wp.height));
                x += width;
            }
        }
        let mut x = wp.xpos + wp.width - right_total;
        for (margin, width) in self.right_margins.iter().zip(&right_widths) {
            let text = margin.create_margin(ctx, &info, *width, wp.height);
            copy_margin(ctx, text, screen, WritePosition::new(x, wp.ypos, *width, wp.height));
            x += width;
        }

        self.apply_style(ctx, screen, wp, parent_style);
        screen.add_visible_window(self.id);
        self.render_info = Some(info);
    }
}

impl Container for Window {
    fn reset(&mut self) {
        self.content.reset();
        self.vertical_scroll.set(0);
        self.vertical_scroll_2 = 0;
        self.horizontal_scroll = 0;
        self.render_info = None;
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        let dimension = to_dimension(self.width.as_ref(), ctx);
        let dont_extend = self.dont_extend_width.eval(ctx);
        let ignore_content = self.ignore_content_width.eval(ctx);
        Self::merge_dimensions(
            dimension,
            || {
                if ignore_content {
                    return None;
                }
                let margins = self.total_margin_width(ctx);
                self.content
                    .preferred_width(ctx, max_available_width.saturating_sub(margins))
                    .map(|w| w + margins)
            },
            dont_extend,
        )
    }

    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        let dimension = to_dimension(self.height.as_ref(), ctx);
        let dont_extend = self.dont_extend_height.eval(ctx);
        let ignore_content = self.ignore_content_height.eval(ctx);
        let wrap_lines = self.wrap_lines.eval(ctx);
        Self::merge_dimensions(
            dimension,
            || {
                if ignore_content {
                    return None;
                }
                let margins = self.total_margin_width(ctx);
                let id = self.id;
                self.content.preferred_height(
                    ctx,
                    id,
                    width.saturating_sub(margins),
                    max_available_height,
                    wrap_lines,
                    self.get_line_prefix.as_ref(),
                )
            },
            dont_extend,
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
        _z_index: Option<i32>,
    ) {
        let mut wp = write_position;
        if self.dont_extend_width.eval(ctx) {
            wp.width = wp.width.min(self.preferred_width(ctx, wp.width).preferred);
        }
        if self.dont_extend_height.eval(ctx) {
            wp.height = wp.height.min(self.preferred_height(ctx, wp.width, wp.height).preferred);
        }
        self.write_to_screen_at_index(ctx, screen, mouse_handlers, wp, parent_style, erase_bg);
    }

    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        self.content.key_bindings()
    }

    fn children(&self) -> Vec<&dyn Container> {
        Vec::new()
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        Vec::new()
    }

    fn as_window(&self) -> Option<&Window> {
        Some(self)
    }

    fn as_window_mut(&mut self) -> Option<&mut Window> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::layout::controls::{BufferControl, FormattedTextControl};
    use crate::layout::margins::NumberedMargin;
    use pretty_assertions::assert_eq;
    use quill_edit::{Buffer, Document};

    fn draw(ctx: &AppContext, window: &mut Window, width: usize, height: usize) -> Screen {
        let mut screen = Screen::new(width, height);
        let mut handlers = MouseHandlers::new();
        window.write_to_screen(
            ctx,
            &mut screen,
            &mut handlers,
            WritePosition::new(0, 0, width, height),
            "",
            true,
            None,
        );
        screen
    }

    fn rows(screen: &Screen) -> Vec<String> {
        screen.to_lines().into_iter().map(|l| l.trim_end().to_string()).collect()
    }

    #[test]
    fn test_merge_dimensions() {
        let merged = Window::merge_dimensions(Dimension::new(Some(5), Some(20), None, None), || Some(40), false);
        assert_eq!((merged.min, merged.preferred, merged.max), (5, 20, 20));

        let merged = Window::merge_dimensions(Dimension::default(), || Some(7), true);
        assert_eq!((merged.min, merged.preferred, merged.max), (0, 7, 7));

        let merged = Window::merge_dimensions(Dimension::exact(3), || Some(40), false);
        assert_eq!(merged.preferred, 3);
    }

    #[test]
    fn test_center_alignment() {
        let ctx = test_context();
        let mut window = Window::new(FormattedTextControl::new("ab")).with_align(WindowAlign::Center);
        let screen = draw(&ctx, &mut window, 10, 1);
        assert_eq!(rows(&screen), vec!["    ab"]);
    }

    #[test]
    fn test_wrapping_with_prefix() {
        let ctx = test_context();
        let mut window = Window::new(FormattedTextControl::new("abcdefg"))
            .with_wrap_lines(true)
            .with_line_prefix(|_, _, wrap_count| FormattedText::from(if wrap_count == 0 { "> " } else { ". " }));
        let screen = draw(&ctx, &mut window, 6, 3);
        assert_eq!(rows(&screen), vec!["> abcd", ". efg", ""]);
        assert_eq!(window.render_info().map(|i| i.displayed_lines.clone()), Some(vec![0, 0]));
    }

    #[test]
    fn test_scrolls_to_cursor() {
        let mut ctx = test_context();
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let id = ctx.add_buffer(Buffer::new().with_document(Document::new(text)));
        let mut window = Window::new(BufferControl::new(id));
        let screen = draw(&ctx, &mut window, 5, 3);
        assert_eq!(rows(&screen), vec!["7", "8", "9"]);
        assert_eq!(window.vertical_scroll(), 7);

        let info = window.render_info().cloned().unwrap_or_default();
        assert!(info.bottom_visible());
        assert!(!info.top_visible());
        assert_eq!(info.first_visible_line(false), 7);
    }

    #[test]
    fn test_horizontal_scroll_keeps_cursor_visible() {
        let mut ctx = test_context();
        let id = ctx.add_buffer(Buffer::new().with_document(Document::new("abcdefghij")));
        let mut window = Window::new(BufferControl::new(id));
        let screen = draw(&ctx, &mut window, 5, 1);
        // The cursor sits on the cell after the text.
        assert_eq!(rows(&screen), vec!["ghij"]);
    }

    #[test]
    fn test_numbered_margin_is_drawn() {
        let mut ctx = test_context();
        let id = ctx.add_buffer(Buffer::new().with_document(Document::new("a\nb")));
        let mut window = Window::new(BufferControl::new(id)).with_left_margins(vec![Rc::new(NumberedMargin::default())]);
        let screen = draw(&ctx, &mut window, 8, 2);
        assert_eq!(rows(&screen), vec![" 1 a", " 2 b"]);
    }

    #[test]
    fn test_dont_extend_height() {
        let ctx = test_context();
        let mut window = Window::new(FormattedTextControl::new("a\nb")).with_dont_extend_height(true);
        let height = window.preferred_height(&ctx, 10, 20);
        assert_eq!((height.preferred, height.max), (2, 2));
    }
}
