//! A menu bar with drop-down submenus.

use super::base::{Frame, Shadow, WidgetHandler};
use crate::context::AppContext;
use crate::filters::Filter;
use crate::key_binding::KeyBindings;
use crate::layout::containers::delegate_container;
use crate::layout::{
    ConditionalContainer, ContainerRef, Float, FloatContainer, FormattedTextControl, HSplit, TextSource, Window,
    SET_MENU_POSITION,
};
use quill_core::width::{pad_to_width, str_width};
use quill_core::{FormattedText, WindowId};
use quill_input::{Key, MouseEventType};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Submenus that can be open at the same time.
const MAX_DEPTH: usize = 3;

/// Text of a separator item.
const SEPARATOR: &str = "-";

/// One entry of a menu.
#[derive(Clone, Default)]
pub struct MenuItem {
    /// Label; `"-"` draws a separator.
    pub text: String,
    /// Runs when the item is chosen.
    pub handler: Option<WidgetHandler>,
    /// Submenu entries.
    pub children: Vec<MenuItem>,
    /// Shortcut hint shown right of the label.
    pub shortcut: Option<String>,
    /// Shown greyed out and skipped by the cursor.
    pub disabled: bool,
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("text", &self.text)
            .field("children", &self.children)
            .field("shortcut", &self.shortcut)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl MenuItem {
    /// An item labelled `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A separator line.
    pub fn separator() -> Self {
        Self::new(SEPARATOR)
    }

    /// Runs `handler` when chosen.
    pub fn with_handler(mut self, handler: impl Fn(&mut AppContext) + 'static) -> Self {
        self.handler = Some(Rc::new(handler));
        self
    }

    /// Sets the submenu.
    pub fn with_children(mut self, children: Vec<MenuItem>) -> Self {
        self.children = children;
        self
    }

    /// Sets the shortcut hint.
    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    /// Disables the item.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn is_separator(&self) -> bool {
        self.text == SEPARATOR
    }

    fn selectable(&self) -> bool {
        !self.disabled && !self.is_separator()
    }

    /// Width of the label plus the shortcut column.
    fn width(&self) -> usize {
        str_width(&self.text) + self.shortcut.as_deref().map_or(0, |s| str_width(s) + 1)
    }
}

// === State ===

/// Top-level items and the path of selected indices: the first entry is
/// the selected top item, each further entry selects inside the submenu
/// opened by the previous one.
struct MenuState {
    items: Vec<MenuItem>,
    selected: Vec<usize>,
}

impl MenuState {
    /// The item at `path`.
    fn item(&self, path: &[usize]) -> Option<&MenuItem> {
        let (first, rest) = path.split_first()?;
        let mut item = self.items.get(*first)?;
        for &i in rest {
            item = item.children.get(i)?;
        }
        Some(item)
    }

    /// The item under the cursor.
    fn current(&self) -> Option<&MenuItem> {
        self.item(&self.selected)
    }

    /// Entries of the submenu shown at `level`.
    fn submenu(&self, level: usize) -> &[MenuItem] {
        if self.selected.len() <= level {
            return &[];
        }
        self.item(&self.selected[..=level]).map_or(&[], |item| &item.children)
    }

    fn in_main_menu(&self) -> bool {
        self.selected.len() == 1
    }

    fn move_top(&mut self, delta: isize) {
        let count = self.items.len();
        if count == 0 {
            return;
        }
        let next = (self.selected[0] as isize + delta).rem_euclid(count as isize) as usize;
        self.selected = vec![next];
    }

    /// Opens the submenu of the current item on its first selectable
    /// entry.
    fn open(&mut self) -> bool {
        if self.selected.len() >= MAX_DEPTH + 1 {
            return false;
        }
        let Some(first) = self
            .current()
            .and_then(|item| item.children.iter().position(MenuItem::selectable))
        else {
            return false;
        };
        self.selected.push(first);
        true
    }

    /// Moves inside the open submenu, skipping separators and disabled
    /// items.
    fn move_in_submenu(&mut self, delta: isize) {
        let level = self.selected.len() - 1;
        let siblings = self.submenu(level - 1);
        let mut i = self.selected[level] as isize;
        loop {
            i += delta;
            let Some(item) = usize::try_from(i).ok().and_then(|i| siblings.get(i)) else {
                return;
            };
            if item.selectable() {
                break;
            }
        }
        self.selected[level] = i as usize;
    }

    /// Index of the first selectable entry of the open submenu.
    fn first_selectable(&self) -> Option<usize> {
        self.submenu(self.selected.len() - 2).iter().position(MenuItem::selectable)
    }
}

fn bar_text(state: &MenuState, focused: bool) -> FormattedText {
    let mut text = FormattedText::default();
    for (i, item) in state.items.iter().enumerate() {
        let selected = focused && state.selected.first() == Some(&i);
        if selected {
            text.push_str(SET_MENU_POSITION, "");
        }
        let style = if selected { "class:menu-bar.selected-item" } else { "class:menu-bar" };
        text.push_str(style, format!(" {} ", item.text));
    }
    text
}

/// Column ranges of the bar items, matching [`bar_text`].
fn bar_item_at(state: &MenuState, column: usize) -> Option<usize> {
    let mut x = 0;
    for (i, item) in state.items.iter().enumerate() {
        let width = str_width(&item.text) + 2;
        if column < x + width {
            return Some(i);
        }
        x += width;
    }
    None
}

fn submenu_text(state: &MenuState, level: usize) -> FormattedText {
    let items = state.submenu(level);
    let width = items.iter().map(MenuItem::width).max().unwrap_or(0);
    let selected = state.selected.get(level + 1).copied();
    let mut text = FormattedText::default();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            text.push_str("", "\n");
        }
        if item.is_separator() {
            text.push_str("class:menu.border", "─".repeat(width + 3));
            continue;
        }
        let style = if selected == Some(i) {
            "class:menu-bar.selected-item"
        } else if item.disabled {
            "class:menu.disabled"
        } else {
            "class:menu"
        };
        let label = match &item.shortcut {
            Some(shortcut) => {
                let gap = width.saturating_sub(str_width(&item.text) + str_width(shortcut));
                format!("{}{}{shortcut}", item.text, " ".repeat(gap))
            }
            None => pad_to_width(&item.text, width),
        };
        let arrow = if item.children.is_empty() { " " } else { "►" };
        text.push_str(style, format!(" {label}{arrow}"));
        if selected == Some(i) {
            text.push_str(SET_MENU_POSITION, "");
        }
        text.push_str(style, " ");
    }
    text
}

/// Runs the handler of the current item after leaving the menu.
fn activate(state: &Rc<RefCell<MenuState>>, ctx: &mut AppContext) {
    let handler = {
        let mut state = state.borrow_mut();
        if state.open() {
            ctx.invalidate();
            return;
        }
        match state.current() {
            Some(item) if item.selectable() => item.handler.clone(),
            _ => None,
        }
    };
    if let Some(handler) = handler {
        state.borrow_mut().selected.truncate(1);
        ctx.focus_last();
        handler(ctx);
    }
}

fn menu_bindings(state: &Rc<RefCell<MenuState>>) -> KeyBindings {
    let in_main = {
        let state = Rc::clone(state);
        Filter::new(move |_| state.borrow().in_main_menu())
    };
    let in_sub = !in_main.clone();
    let mut kb = KeyBindings::new();

    for (key, delta) in [(Key::Left, -1), (Key::Right, 1)] {
        let state = Rc::clone(state);
        kb.add_when(key, in_main.clone(), move |_| {
            state.borrow_mut().move_top(delta);
            Ok(())
        });
    }
    for key in [Key::Down, Key::Enter] {
        let state = Rc::clone(state);
        kb.add_when(key, in_main.clone(), move |event| {
            activate(&state, event.ctx);
            Ok(())
        });
    }
    for key in [Key::Escape, Key::Control('c'), Key::Control('g')] {
        kb.add_when(key, in_main.clone(), |event| {
            event.ctx.focus_last();
            Ok(())
        });
    }

    for key in [Key::Escape, Key::Control('c'), Key::Control('g')] {
        let state = Rc::clone(state);
        kb.add_when(key, in_sub.clone(), move |_| {
            state.borrow_mut().selected.pop();
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        kb.add_when(Key::Left, in_sub.clone(), move |_| {
            let mut state = state.borrow_mut();
            if state.selected.len() > 2 {
                state.selected.pop();
            } else {
                state.move_top(-1);
                state.open();
            }
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        kb.add_when(Key::Right, in_sub.clone(), move |_| {
            let mut state = state.borrow_mut();
            if !state.open() {
                state.move_top(1);
                state.open();
            }
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        kb.add_when(Key::Up, in_sub.clone(), move |_| {
            let mut state = state.borrow_mut();
            let at_top = state.selected.len() == 2 && state.first_selectable() == state.selected.last().copied();
            if at_top {
                state.selected.pop();
            } else {
                state.move_in_submenu(-1);
            }
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        kb.add_when(Key::Down, in_sub.clone(), move |_| {
            state.borrow_mut().move_in_submenu(1);
            Ok(())
        });
    }
    {
        let state = Rc::clone(state);
        kb.add_when(Key::Enter, in_sub, move |event| {
            activate(&state, event.ctx);
            Ok(())
        });
    }
    kb
}

// === Container ===

/// A menu bar above `body`; submenus drop down over the body while the
/// bar has focus.
///
/// Focus the bar with [`MenuContainer::bar_window_id`] or by clicking it.
pub struct MenuContainer {
    inner: FloatContainer,
    bar: WindowId,
    state: Rc<RefCell<MenuState>>,
}

impl fmt::Debug for MenuContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuContainer")
            .field("bar", &self.bar)
            .field("selected", &self.state.borrow().selected)
            .finish_non_exhaustive()
    }
}

impl MenuContainer {
    /// A menu bar with `items` over `body`.
    pub fn new(body: ContainerRef, items: Vec<MenuItem>) -> Self {
        let state = Rc::new(RefCell::new(MenuState { items, selected: vec![0] }));
        let bar_id: Rc<Cell<Option<WindowId>>> = Rc::new(Cell::new(None));

        let text = {
            let state = Rc::clone(&state);
            let bar_id = Rc::clone(&bar_id);
            TextSource::dynamic(move |ctx| {
                let focused = bar_id.get().is_some_and(|id| ctx.focused_window() == Some(id));
                bar_text(&state.borrow(), focused)
            })
        };
        let click = Rc::clone(&state);
        let click_bar = Rc::clone(&bar_id);
        let control = FormattedTextControl::new(text)
            .with_focusable(true)
            .with_show_cursor(false)
            .with_key_bindings(menu_bindings(&state).shared())
            .with_mouse_handler(move |ctx, event| {
                if event.event_type != MouseEventType::MouseUp {
                    return false;
                }
                let Some(i) = bar_item_at(&click.borrow(), event.position.x) else {
                    return false;
                };
                let focused = click_bar.get().is_some_and(|id| ctx.focused_window() == Some(id));
                let mut state = click.borrow_mut();
                if focused && state.selected.first() == Some(&i) {
                    drop(state);
                    ctx.focus_last();
                } else {
                    state.selected = vec![i];
                    drop(state);
                    if let Some(id) = click_bar.get() {
                        ctx.focus_window(id);
                    }
                }
                ctx.invalidate();
                true
            });
        let bar = Window::new(control).with_height(1).with_style("class:menu-bar");
        let bar_window = bar.id();
        bar_id.set(Some(bar_window));

        let mut floats = Vec::with_capacity(MAX_DEPTH);
        let mut anchor = bar_window;
        for level in 0..MAX_DEPTH {
            let window = Self::submenu_window(&state, level);
            let window_id = window.id();
            let visible = {
                let state = Rc::clone(&state);
                Filter::new(move |ctx| {
                    ctx.focused_window() == Some(bar_window) && !state.borrow().submenu(level).is_empty()
                })
            };
            let frame = Frame::new(Box::new(window)).with_style("class:menu.border");
            let content = ConditionalContainer::new(Box::new(Shadow::new(Box::new(frame))), visible);
            floats.push(
                Float::new(Box::new(content))
                    .at_cursor()
                    .with_attach_to_window(anchor)
                    .with_allow_cover_cursor(level > 0)
                    .with_z_index(1 + level as i32),
            );
            anchor = window_id;
        }

        let inner = FloatContainer::new(Box::new(HSplit::new(vec![Box::new(bar), body])), floats);
        Self {
            inner,
            bar: bar_window,
            state,
        }
    }

    fn submenu_window(state: &Rc<RefCell<MenuState>>, level: usize) -> Window {
        let text = {
            let state = Rc::clone(state);
            TextSource::dynamic(move |_| submenu_text(&state.borrow(), level))
        };
        let click = Rc::clone(state);
        let control = FormattedTextControl::new(text).with_mouse_handler(move |ctx, event| {
            if event.event_type != MouseEventType::MouseUp {
                return false;
            }
            {
                let mut state = click.borrow_mut();
                let row = event.position.y;
                match state.submenu(level).get(row) {
                    Some(item) if item.selectable() => {}
                    _ => return false,
                }
                state.selected.truncate(level + 1);
                state.selected.push(row);
            }
            activate(&click, ctx);
            true
        });
        Window::new(control).with_style("class:menu")
    }

    /// The bar's window; focus it to open the menu from the keyboard.
    pub fn bar_window_id(&self) -> WindowId {
        self.bar
    }

    /// Path of selected indices, starting at the top-level item.
    pub fn selected_path(&self) -> Vec<usize> {
        self.state.borrow().selected.clone()
    }
}

impl crate::layout::Container for MenuContainer {
    delegate_container!(concrete inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items() -> Vec<MenuItem> {
        vec![
            MenuItem::new("File").with_children(vec![
                MenuItem::new("New").with_shortcut("c-n"),
                MenuItem::separator(),
                MenuItem::new("Recent").with_children(vec![MenuItem::new("a.txt"), MenuItem::new("b.txt")]),
                MenuItem::new("Exit"),
            ]),
            MenuItem::new("Edit").with_children(vec![MenuItem::new("Undo").with_disabled(true), MenuItem::new("Copy")]),
        ]
    }

    fn state() -> MenuState {
        MenuState {
            items: items(),
            selected: vec![0],
        }
    }

    #[test]
    fn test_bar_text_marks_selection() {
        let state = state();
        assert_eq!(bar_text(&state, true).to_plain_text(), " File  Edit ");
        assert_eq!(bar_item_at(&state, 0), Some(0));
        assert_eq!(bar_item_at(&state, 6), Some(1));
        assert_eq!(bar_item_at(&state, 12), None);
    }

    #[test]
    fn test_move_top_wraps() {
        let mut state = state();
        state.move_top(-1);
        assert_eq!(state.selected, vec![1]);
        state.move_top(1);
        assert_eq!(state.selected, vec![0]);
    }

    #[test]
    fn test_open_skips_disabled() {
        let mut state = state();
        state.move_top(1);
        assert!(state.open());
        assert_eq!(state.selected, vec![1, 1]);
    }

    #[test]
    fn test_move_skips_separator() {
        let mut state = state();
        state.open();
        state.move_in_submenu(1);
        assert_eq!(state.selected, vec![0, 2]);
        assert!(state.open());
        assert_eq!(state.current().map(|i| i.text.as_str()), Some("a.txt"));
        state.move_in_submenu(-1);
        assert_eq!(state.selected, vec![0, 2, 0]);
    }

    #[test]
    fn test_submenu_text() {
        let mut state = state();
        state.open();
        let text = submenu_text(&state, 0).to_plain_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " New c-n  ");
        assert_eq!(lines[1], "──────────");
        assert_eq!(lines[2], " Recent ► ");
        assert!(submenu_text(&state, 1).is_empty());
    }

    #[test]
    fn test_activate_runs_handler() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let state = Rc::new(RefCell::new(MenuState {
            items: vec![MenuItem::new("Go").with_children(vec![MenuItem::new("Now").with_handler(move |_| flag.set(true))])],
            selected: vec![0],
        }));
        let mut ctx = crate::context::test_context();
        activate(&state, &mut ctx);
        assert_eq!(state.borrow().selected, vec![0, 0]);
        assert!(!ran.get());
        activate(&state, &mut ctx);
        assert!(ran.get());
        assert_eq!(state.borrow().selected, vec![0]);
    }
}
