//! Completion menus: a single column with optional meta text, and a
//! multi-column grid with the selected item's meta below it.

use super::containers::{ConditionalContainer, Container, ContainerRef, HSplit};
use super::controls::{GetLinePrefix, UIContent, UIControl};
use super::dimension::Dimension;
use super::margins::{ScrollbarMargin, SharedMargin};
use super::mouse_handlers::MouseHandler;
use super::window::{ScrollOffsets, Window};
use crate::context::AppContext;
use crate::filters::{self, Filter};
use crate::key_binding::{Binding, KeyBindings, SharedKeyBindings};
use quill_core::formatted_text::{explode_fragments, fragment_list_width};
use quill_core::width::str_width;
use quill_core::{FormattedText, Fragment, Point, WindowId};
use quill_edit::{Completion, CompletionState};
use quill_input::{Key, MouseEvent, MouseEventType};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Cuts `fragments` to `max_width` cells, ending in `...` when cut.
/// Returns the fragments and their width.
fn trim_formatted_text(fragments: &[Fragment], max_width: usize) -> (Vec<Fragment>, usize) {
    let width = fragment_list_width(fragments);
    if width <= max_width {
        return (fragments.to_vec(), width);
    }
    let mut remaining = max_width.saturating_sub(3);
    let mut result = Vec::new();
    for fragment in explode_fragments(fragments) {
        let w = str_width(&fragment.text);
        if w > remaining {
            break;
        }
        remaining -= w;
        result.push(fragment);
    }
    result.push(Fragment::plain("..."));
    (result, max_width - remaining)
}

fn menu_item_fragments(completion: &Completion, is_current: bool, width: usize, space_after: bool) -> Vec<Fragment> {
    let style = if is_current {
        format!(
            "class:completion-menu.completion.current {} {}",
            completion.style, completion.selected_style
        )
    } else {
        format!("class:completion-menu.completion {}", completion.style)
    };
    let max = if space_after {
        width.saturating_sub(2)
    } else {
        width.saturating_sub(1)
    };
    let (text, text_width) = trim_formatted_text(&completion.display, max);
    let mut fragments = vec![Fragment::plain(" ")];
    fragments.extend(text);
    fragments.push(Fragment::plain(" ".repeat(width.saturating_sub(1 + text_width))));
    FormattedText::from_fragments(fragments)
        .with_style_prefix(style.trim_end())
        .into_fragments()
}

fn complete_state(ctx: &AppContext) -> Option<&CompletionState> {
    ctx.current_buffer()?
        .complete_state()
        .filter(|state| !state.completions.is_empty())
}

// === Single column ===

/// The single-column menu contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionsMenuControl;

impl CompletionsMenuControl {
    const MIN_WIDTH: usize = 7;

    fn show_meta(state: &CompletionState) -> bool {
        state.completions.iter().any(|c| !c.display_meta.is_empty())
    }

    fn menu_width(max_width: usize, state: &CompletionState) -> usize {
        let widest = state
            .completions
            .iter()
            .map(|c| str_width(&c.display_text()))
            .max()
            .unwrap_or(0);
        max_width.min(Self::MIN_WIDTH.max(widest + 2))
    }

    fn meta_width(max_width: usize, state: &CompletionState) -> usize {
        if !Self::show_meta(state) {
            return 0;
        }
        // Long lists are measured on a prefix.
        let widest = state
            .completions
            .iter()
            .take(200)
            .map(|c| str_width(&c.display_meta_text()))
            .max()
            .unwrap_or(0);
        max_width.min(widest + 2)
    }

    fn meta_fragments(completion: &Completion, is_current: bool, width: usize) -> Vec<Fragment> {
        let style = if is_current {
            "class:completion-menu.meta.completion.current"
        } else {
            "class:completion-menu.meta.completion"
        };
        let (text, text_width) = trim_formatted_text(&completion.display_meta, width.saturating_sub(2));
        let mut fragments = vec![Fragment::plain(" ")];
        fragments.extend(text);
        fragments.push(Fragment::plain(" ".repeat(width.saturating_sub(1 + text_width))));
        FormattedText::from_fragments(fragments)
            .with_style_prefix(style)
            .into_fragments()
    }
}

impl UIControl for CompletionsMenuControl {
    fn preferred_width(&mut self, ctx: &AppContext, _max_available_width: usize) -> Option<usize> {
        Some(complete_state(ctx).map_or(0, |state| {
            Self::menu_width(500, state) + Self::meta_width(500, state)
        }))
    }

    fn preferred_height(
        &mut self,
        ctx: &AppContext,
        _window: WindowId,
        _width: usize,
        _max_available_height: usize,
        _wrap_lines: bool,
        _get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        Some(complete_state(ctx).map_or(0, |state| state.completions.len()))
    }

    fn create_content(&mut self, ctx: &AppContext, _window: WindowId, width: usize, _height: usize) -> UIContent {
        let Some(state) = complete_state(ctx) else {
            return UIContent::default();
        };
        let menu_width = Self::menu_width(width, state);
        let meta_width = Self::meta_width(width.saturating_sub(menu_width), state);
        let show_meta = Self::show_meta(state);
        let completions: Rc<[Completion]> = state.completions.clone().into();
        let index = state.complete_index;

        UIContent::new(completions.len(), move |i| {
            let completion = &completions[i];
            let is_current = index == Some(i);
            let mut line = menu_item_fragments(completion, is_current, menu_width, true);
            if show_meta {
                line.extend(Self::meta_fragments(completion, is_current, meta_width));
            }
            line
        })
        .with_cursor_position(Some(Point::new(0, index.unwrap_or(0))))
    }

    fn mouse_handler(&self, _window: WindowId) -> Option<MouseHandler> {
        Some(Rc::new(|ctx: &mut AppContext, event: MouseEvent| {
            let Some(buffer) = ctx.current_buffer_mut() else {
                return false;
            };
            match event.event_type {
                MouseEventType::MouseUp => {
                    buffer.go_to_completion(Some(event.position.y));
                    buffer.accept_completion();
                }
                MouseEventType::ScrollDown => buffer.complete_next(3, true),
                MouseEventType::ScrollUp => buffer.complete_previous(3, true),
                _ => return false,
            }
            true
        }))
    }
}

/// A dropdown listing the completions of the focused buffer, with a
/// scrollbar.
///
/// Shown while the buffer has completions, the application is not done
/// and `extra_filter` holds.
pub struct CompletionsMenu {
    inner: ContainerRef,
}

impl fmt::Debug for CompletionsMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionsMenu").finish_non_exhaustive()
    }
}

impl CompletionsMenu {
    /// A menu at most `max_height` rows tall, keeping `scroll_offset` rows
    /// visible around the selection.
    pub fn new(
        max_height: Option<usize>,
        scroll_offset: usize,
        extra_filter: impl Into<Filter>,
        display_arrows: impl Into<Filter>,
    ) -> Self {
        let window = Window::new(CompletionsMenuControl)
            .with_width(Dimension::at_least(8))
            .with_height(Dimension::new(Some(1), max_height, None, None))
            .with_scroll_offsets(ScrollOffsets {
                top: scroll_offset,
                bottom: scroll_offset,
                ..ScrollOffsets::default()
            })
            .with_right_margins(vec![Rc::new(ScrollbarMargin::new(display_arrows)) as SharedMargin])
            .with_dont_extend_width(true)
            .with_style("class:completion-menu");
        let filter = extra_filter.into() & filters::has_completions() & !filters::is_done();
        Self {
            inner: Box::new(ConditionalContainer::new(Box::new(window), filter)),
        }
    }
}

impl Default for CompletionsMenu {
    fn default() -> Self {
        Self::new(None, 0, true, false)
    }
}

impl Container for CompletionsMenu {
    super::containers::delegate_container!(inner);
}

// === Multiple columns ===

/// What the last frame of the grid looked like, shared with the mouse
/// handler and the arrow key bindings.
#[derive(Debug, Default)]
struct GridState {
    scroll: usize,
    rendered_rows: usize,
    rendered_columns: usize,
    total_columns: usize,
    left_arrow: bool,
    right_arrow: bool,
    render_width: usize,
    position_to_completion: HashMap<(usize, usize), usize>,
}

/// The grid of a [`MultiColumnCompletionsMenu`].
#[derive(Debug)]
pub struct MultiColumnCompletionMenuControl {
    min_rows: usize,
    suggested_max_column_width: usize,
    state: Rc<RefCell<GridState>>,
}

impl MultiColumnCompletionMenuControl {
    /// Right padding plus room for the scroll arrows.
    const REQUIRED_MARGIN: usize = 3;

    /// A grid preferring at least `min_rows` rows.
    pub fn new(min_rows: usize, suggested_max_column_width: usize) -> Self {
        Self {
            min_rows: min_rows.max(1),
            suggested_max_column_width: suggested_max_column_width.max(1),
            state: Rc::new(RefCell::new(GridState::default())),
        }
    }

    fn column_width(state: &CompletionState) -> usize {
        state
            .completions
            .iter()
            .map(|c| str_width(&c.display_text()))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn scroll_left(grid: &RefCell<GridState>, ctx: &mut AppContext) {
        let rows = grid.borrow().rendered_rows;
        if let Some(buffer) = ctx.current_buffer_mut() {
            buffer.complete_previous(rows, true);
        }
        let mut grid = grid.borrow_mut();
        grid.scroll = grid.scroll.saturating_sub(1);
    }

    fn scroll_right(grid: &RefCell<GridState>, ctx: &mut AppContext) {
        let rows = grid.borrow().rendered_rows;
        if let Some(buffer) = ctx.current_buffer_mut() {
            buffer.complete_next(rows, true);
        }
        let mut grid = grid.borrow_mut();
        let max_scroll = grid.total_columns.saturating_sub(grid.rendered_columns);
        grid.scroll = (grid.scroll + 1).min(max_scroll);
    }

    /// Left and right move the selection by a column while the grid is
    /// visible in `window`.
    fn key_bindings_for(state: &Rc<RefCell<GridState>>, window: WindowId) -> SharedKeyBindings {
        let visible = Filter::new(move |ctx| {
            complete_state(ctx).is_some_and(|s| s.complete_index.is_some()) && ctx.is_visible(window)
        });
        let mut kb = KeyBindings::new();
        for (key, right) in [(Key::Left, false), (Key::Right, true)] {
            let grid = Rc::clone(state);
            kb.add_binding(
                Binding::new(key, move |event| {
                    let rows = grid.borrow().rendered_rows;
                    event.with_buffer(|buffer| {
                        let Some(state) = buffer.complete_state() else {
                            return;
                        };
                        let Some(index) = state.complete_index else {
                            return;
                        };
                        let target = if right {
                            index.checked_add(rows)
                        } else {
                            index.checked_sub(rows)
                        };
                        if let Some(target) = target.filter(|t| *t < state.completions.len()) {
                            buffer.go_to_completion(Some(target));
                        }
                    })
                })
                .with_filter(visible.clone()),
            );
        }
        kb.shared()
    }
}

impl UIControl for MultiColumnCompletionMenuControl {
    fn reset(&mut self) {
        self.state.borrow_mut().scroll = 0;
    }

    /// At least `min_rows` rows, otherwise as wide as possible.
    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Option<usize> {
        let Some(state) = complete_state(ctx) else {
            return Some(0);
        };
        let column_width = Self::column_width(state);
        let mut result = column_width * state.completions.len().div_ceil(self.min_rows);
        while result > column_width && result + Self::REQUIRED_MARGIN > max_available_width {
            result -= column_width;
        }
        Some(result + Self::REQUIRED_MARGIN)
    }

    fn preferred_height(
        &mut self,
        ctx: &AppContext,
        _window: WindowId,
        width: usize,
        _max_available_height: usize,
        _wrap_lines: bool,
        _get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        let Some(state) = complete_state(ctx) else {
            return Some(0);
        };
        let column_width = Self::column_width(state);
        let column_count = (width.saturating_sub(Self::REQUIRED_MARGIN) / column_width).max(1);
        Some(state.completions.len().div_ceil(column_count))
    }

    fn create_content(&mut self, ctx: &AppContext, _window: WindowId, width: usize, height: usize) -> UIContent {
        let Some(state) = complete_state(ctx) else {
            return UIContent::default();
        };
        if height == 0 {
            return UIContent::default();
        }

        let mut column_width = Self::column_width(state)
            .min(width.saturating_sub(Self::REQUIRED_MARGIN))
            .max(1);
        // Very wide entries shrink the columns to fit at least two.
        if column_width > self.suggested_max_column_width {
            column_width /= column_width / self.suggested_max_column_width;
        }
        let visible_columns = (width.saturating_sub(Self::REQUIRED_MARGIN) / column_width).max(1);
        let completions = &state.completions;
        let total_columns = completions.len().div_ceil(height);
        let row_count = completions.len().min(height);

        let mut grid = self.state.borrow_mut();
        let selected_column = state.complete_index.unwrap_or(0) / height;
        grid.scroll = selected_column.min(grid.scroll.max((selected_column + 1).saturating_sub(visible_columns)));
        let left_arrow = grid.scroll > 0;
        let right_arrow = grid.scroll + visible_columns < total_columns;
        let x_offset = usize::from(left_arrow || right_arrow);
        grid.position_to_completion.clear();

        let mut lines = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let middle_row = row == row_count / 2;
            let mut fragments = Vec::new();
            if left_arrow {
                fragments.push(Fragment::new("class:scrollbar", if middle_row { "<" } else { " " }));
            } else if right_arrow {
                fragments.push(Fragment::plain(" "));
            }
            for column in 0..visible_columns.min(total_columns - grid.scroll) {
                let index = (grid.scroll + column) * height + row;
                match completions.get(index) {
                    Some(completion) => {
                        let is_current = state.complete_index == Some(index);
                        fragments.extend(menu_item_fragments(completion, is_current, column_width, false));
                        for x in 0..column_width {
                            grid.position_to_completion
                                .insert((x_offset + column * column_width + x, row), index);
                        }
                    }
                    None => fragments.push(Fragment::new("class:completion", " ".repeat(column_width))),
                }
            }
            if left_arrow || right_arrow {
                fragments.push(Fragment::new("class:completion", " "));
            }
            if right_arrow {
                fragments.push(Fragment::new("class:scrollbar", if middle_row { ">" } else { " " }));
            } else if left_arrow {
                fragments.push(Fragment::new("class:completion", " "));
            }
            lines.push(
                FormattedText::from_fragments(fragments)
                    .with_style_prefix("class:completion-menu")
                    .into_fragments(),
            );
        }

        grid.rendered_rows = height;
        grid.rendered_columns = visible_columns;
        grid.total_columns = total_columns;
        grid.left_arrow = left_arrow;
        grid.right_arrow = right_arrow;
        grid.render_width = column_width * visible_columns + usize::from(left_arrow) + usize::from(right_arrow) + 1;
        UIContent::from_lines(lines)
    }

    fn mouse_handler(&self, _window: WindowId) -> Option<MouseHandler> {
        let grid = Rc::clone(&self.state);
        Some(Rc::new(move |ctx: &mut AppContext, event: MouseEvent| {
            match event.event_type {
                MouseEventType::ScrollDown => Self::scroll_right(&grid, ctx),
                MouseEventType::ScrollUp => Self::scroll_left(&grid, ctx),
                MouseEventType::MouseUp => {
                    let Point { x, y } = event.position;
                    let (left_arrow, right_arrow, render_width, hit) = {
                        let g = grid.borrow();
                        (g.left_arrow, g.right_arrow, g.render_width, g.position_to_completion.get(&(x, y)).copied())
                    };
                    if x == 0 && left_arrow {
                        Self::scroll_left(&grid, ctx);
                    } else if x + 1 == render_width && right_arrow {
                        Self::scroll_right(&grid, ctx);
                    } else if let Some(index) = hit {
                        let Some(buffer) = ctx.current_buffer_mut() else {
                            return false;
                        };
                        let completion = buffer
                            .complete_state()
                            .and_then(|s| s.completions.get(index))
                            .cloned();
                        if let Some(completion) = completion {
                            buffer.apply_completion(&completion);
                        }
                    }
                }
                _ => return false,
            }
            true
        }))
    }
}

/// Meta text of the selected completion, shown below the grid.
#[derive(Debug, Clone, Copy, Default)]
struct SelectedCompletionMetaControl;

impl SelectedCompletionMetaControl {
    fn fragments(ctx: &AppContext) -> Vec<Fragment> {
        let Some(current) = complete_state(ctx).and_then(CompletionState::current_completion) else {
            return Vec::new();
        };
        if current.display_meta.is_empty() {
            return Vec::new();
        }
        let mut fragments = vec![Fragment::plain(" ")];
        fragments.extend(current.display_meta.iter().cloned());
        fragments.push(Fragment::plain(" "));
        FormattedText::from_fragments(fragments)
            .with_style_prefix("class:completion-menu.multi-column-meta")
            .into_fragments()
    }
}

impl UIControl for SelectedCompletionMetaControl {
    // The widest meta text, so the grid does not reflow while the
    // selection moves.
    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Option<usize> {
        let Some(state) = complete_state(ctx) else {
            return Some(0);
        };
        if state.completions.len() >= 30 {
            return Some(max_available_width);
        }
        let widest = state
            .completions
            .iter()
            .take(100)
            .map(|c| str_width(&c.display_meta_text()))
            .max()
            .unwrap_or(0);
        Some(widest + 2)
    }

    fn preferred_height(
        &mut self,
        _ctx: &AppContext,
        _window: WindowId,
        _width: usize,
        _max_available_height: usize,
        _wrap_lines: bool,
        _get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        Some(1)
    }

    fn create_content(&mut self, ctx: &AppContext, _window: WindowId, _width: usize, _height: usize) -> UIContent {
        let fragments = Self::fragments(ctx);
        if fragments.is_empty() {
            UIContent::default()
        } else {
            UIContent::from_lines(vec![fragments])
        }
    }
}

/// Completions in columns, with the selected item's meta text below.
///
/// Left and right move between columns while the grid is shown; the
/// bindings from [`MultiColumnCompletionsMenu::key_bindings`] must be
/// registered with the application since the menu never has focus.
pub struct MultiColumnCompletionsMenu {
    inner: ContainerRef,
    key_bindings: SharedKeyBindings,
}

impl fmt::Debug for MultiColumnCompletionsMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiColumnCompletionsMenu").finish_non_exhaustive()
    }
}

impl MultiColumnCompletionsMenu {
    /// A grid of at least `min_rows` rows. Meta text is shown when
    /// `show_meta` holds and some completion has meta.
    pub fn new(
        min_rows: usize,
        suggested_max_column_width: usize,
        show_meta: impl Into<Filter>,
        extra_filter: impl Into<Filter>,
    ) -> Self {
        let full_filter = extra_filter.into() & filters::has_completions() & !filters::is_done();
        let any_meta = Filter::new(|ctx| {
            complete_state(ctx).is_some_and(|s| s.completions.iter().any(|c| !c.display_meta.is_empty()))
        });

        let control = MultiColumnCompletionMenuControl::new(min_rows, suggested_max_column_width);
        let grid = Rc::clone(&control.state);
        let window = Window::new(control)
            .with_width(Dimension::at_least(8))
            .with_height(Dimension::at_least(1));
        let key_bindings = MultiColumnCompletionMenuControl::key_bindings_for(&grid, window.id());
        let meta_window = Window::new(SelectedCompletionMetaControl);

        let inner = HSplit::new(vec![
            Box::new(ConditionalContainer::new(Box::new(window), full_filter.clone())),
            Box::new(ConditionalContainer::new(
                Box::new(meta_window),
                full_filter & show_meta.into() & any_meta,
            )),
        ]);
        Self {
            inner: Box::new(inner),
            key_bindings,
        }
    }

    /// Bindings for moving between columns.
    pub fn key_bindings(&self) -> SharedKeyBindings {
        Rc::clone(&self.key_bindings)
    }
}

impl Default for MultiColumnCompletionsMenu {
    fn default() -> Self {
        Self::new(3, 30, true, true)
    }
}

impl Container for MultiColumnCompletionsMenu {
    super::containers::delegate_container!(inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{test_context, WindowInfo};
    use pretty_assertions::assert_eq;
    use quill_core::formatted_text::fragment_list_to_text;
    use quill_edit::Buffer;

    fn completing_context(words: &[&str]) -> AppContext {
        let mut ctx = test_context();
        let buffer = ctx.add_buffer(Buffer::new());
        ctx.set_windows(vec![WindowInfo::for_buffer(WindowId::new(), buffer)]);
        let completions = words.iter().map(|w| Completion::new(*w, 0)).collect();
        ctx.buffer_mut(buffer).unwrap().set_completions(completions);
        ctx.begin_tick();
        ctx
    }

    fn line_text(content: &UIContent, i: usize) -> String {
        fragment_list_to_text(&content.get_line(i))
    }

    #[test]
    fn test_trim_formatted_text() {
        let text = FormattedText::from("abcdefghij");
        let (trimmed, width) = trim_formatted_text(&text, 6);
        assert_eq!(fragment_list_to_text(&trimmed), "abc...");
        assert_eq!(width, 6);

        let (kept, width) = trim_formatted_text(&text, 20);
        assert_eq!(fragment_list_to_text(&kept), "abcdefghij");
        assert_eq!(width, 10);
    }

    #[test]
    fn test_single_column_lines() {
        let mut ctx = completing_context(&["abc", "abd"]);
        let mut control = CompletionsMenuControl;
        let content = control.create_content(&ctx, WindowId::new(), 20, 5);
        assert_eq!(content.line_count, 2);
        assert_eq!(line_text(&content, 0), " abc   ");

        ctx.current_buffer_mut().unwrap().go_to_completion(Some(1));
        let content = control.create_content(&ctx, WindowId::new(), 20, 5);
        assert!(content.get_line(1)[0].style.contains("completion.current"));
        assert_eq!(content.cursor_position, Some(Point::new(0, 1)));
    }

    #[test]
    fn test_single_column_meta() {
        let mut ctx = test_context();
        let buffer = ctx.add_buffer(Buffer::new());
        ctx.set_windows(vec![WindowInfo::for_buffer(WindowId::new(), buffer)]);
        ctx.buffer_mut(buffer)
            .unwrap()
            .set_completions(vec![Completion::new("ls", 0).with_meta("list")]);
        let mut control = CompletionsMenuControl;
        assert_eq!(control.preferred_width(&ctx, 80), Some(7 + 6));
        let content = control.create_content(&ctx, WindowId::new(), 20, 5);
        assert_eq!(line_text(&content, 0), " ls     list ");
    }

    #[test]
    fn test_grid_layout() {
        let ctx = completing_context(&["a", "b", "c", "d", "e"]);
        let mut control = MultiColumnCompletionMenuControl::new(3, 30);
        assert_eq!(control.preferred_width(&ctx, 80), Some(7));
        assert_eq!(control.preferred_height(&ctx, WindowId::new(), 7, 10, false, None), Some(3));

        let content = control.create_content(&ctx, WindowId::new(), 20, 2);
        assert_eq!(content.line_count, 2);
        assert_eq!(line_text(&content, 0), " a c e");
        assert_eq!(line_text(&content, 1), " b d  ");
    }

    #[test]
    fn test_grid_scrolls_to_selection() {
        let mut ctx = completing_context(&["a", "b", "c", "d", "e", "f"]);
        ctx.current_buffer_mut().unwrap().go_to_completion(Some(5));
        let mut control = MultiColumnCompletionMenuControl::new(3, 30);
        // One visible column of width 2, one row per column.
        let content = control.create_content(&ctx, WindowId::new(), 5, 1);
        assert_eq!(line_text(&content, 0), "< f  ");
        assert_eq!(control.state.borrow().scroll, 5);
    }
}
