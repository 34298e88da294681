//! The layout tree: containers arrange windows, windows show controls.
//!
//! Drawing happens in two passes. Containers report preferred
//! [`Dimension`]s, then divide the space they were given among their
//! children and draw them into a [`Screen`](quill_screen::Screen). Windows
//! record where they drew so mouse events and page navigation can find
//! their way back.

pub mod containers;
pub mod controls;
pub mod dimension;
pub mod lexers;
pub mod margins;
pub mod menus;
pub mod mouse_handlers;
pub mod processors;
pub mod window;

pub use containers::{
    find_window_mut, walk, window_too_small, ConditionalContainer, Container, ContainerExt, ContainerRef,
    DynamicContainer, Float, FloatContainer, HSplit, HorizontalAlign, VSplit, VerticalAlign,
};
pub use controls::{
    BufferControl, DummyControl, FormattedTextControl, TextSource, UIContent, UIControl, SET_CURSOR_POSITION,
    SET_MENU_POSITION,
};
pub use dimension::{Dimension, DimensionSource};
pub use lexers::{DynamicLexer, Lexer, RegexLexer, SharedLexer, SimpleLexer};
pub use margins::{ConditionalMargin, Margin, NumberedMargin, PromptMargin, ScrollbarMargin, SharedMargin};
pub use menus::{CompletionsMenu, MultiColumnCompletionsMenu};
pub use mouse_handlers::{MouseHandler, MouseHandlers};
pub use window::{ScrollOffsets, StyleSource, Window, WindowAlign, WindowRenderInfo};

use crate::context::{BufferId, WindowInfo};
use crate::error::{AppError, Result};
use crate::key_binding::SharedKeyBindings;
use quill_core::WindowId;
use std::collections::HashMap;
use std::fmt;

/// The root of an application's layout.
pub struct Layout {
    root: ContainerRef,
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("windows", &self.window_ids().len())
            .finish_non_exhaustive()
    }
}

impl Layout {
    /// A layout drawing `root`.
    pub fn new(root: impl Container) -> Self {
        Self { root: Box::new(root) }
    }

    /// A layout from an already boxed container.
    pub fn from_boxed(root: ContainerRef) -> Self {
        Self { root }
    }

    /// The root container.
    pub fn root(&self) -> &dyn Container {
        self.root.as_ref()
    }

    /// The root container, mutably.
    pub fn root_mut(&mut self) -> &mut dyn Container {
        self.root.as_mut()
    }

    /// Resets scroll positions and other per-run state.
    pub fn reset(&mut self) {
        self.root.reset();
    }

    /// Ids of all windows, in tree order.
    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids = Vec::new();
        walk(self.root.as_ref(), &mut |c| {
            if let Some(window) = c.as_window() {
                ids.push(window.id());
            }
        });
        ids
    }

    /// A window by id.
    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        find_window_mut(self.root.as_mut(), id)
    }

    /// The first window showing `buffer`.
    pub fn find_window_for_buffer(&self, buffer: BufferId) -> Option<WindowId> {
        let mut found = None;
        walk(self.root.as_ref(), &mut |c| {
            if found.is_none() {
                if let Some(window) = c.as_window().filter(|w| w.content().buffer() == Some(buffer)) {
                    found = Some(window.id());
                }
            }
        });
        found
    }

    /// Describes every window for focus handling and key dispatch.
    ///
    /// Each window gets the key bindings of its control and of its
    /// ancestors, inner first, up to and including the nearest modal
    /// container. Windows below the same modal container share a modal
    /// scope; windows outside any modal container have scope 0.
    pub fn collect_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows = Vec::new();
        let mut next_scope = 1;
        collect(self.root.as_ref(), &[], 0, &mut next_scope, &mut windows);
        if windows.is_empty() {
            return Err(AppError::Layout("the layout does not contain any window".into()));
        }
        Ok(windows)
    }

    /// Rows each window occupied in the last frame.
    pub(crate) fn window_heights(&self) -> HashMap<WindowId, usize> {
        let mut heights = HashMap::new();
        walk(self.root.as_ref(), &mut |c| {
            if let Some(info) = c.as_window().and_then(|w| w.render_info().map(|i| (w.id(), i))) {
                heights.insert(info.0, info.1.window_height);
            }
        });
        heights
    }
}

fn collect(
    container: &dyn Container,
    outer_bindings: &[SharedKeyBindings],
    scope: usize,
    next_scope: &mut usize,
    out: &mut Vec<WindowInfo>,
) {
    let (mut bindings, scope) = if container.is_modal() {
        let scope = *next_scope;
        *next_scope += 1;
        (Vec::new(), scope)
    } else {
        (outer_bindings.to_vec(), scope)
    };
    if let Some(kb) = container.key_bindings() {
        bindings.push(kb);
    }

    if let Some(window) = container.as_window() {
        let control = window.content();
        let mut info = WindowInfo::new(window.id());
        info.buffer = control.buffer();
        info.search_buffer = control.search_buffer();
        info.search_ignore_case = control.search_ignore_case();
        info.focusable = control.is_focusable();
        info.key_bindings = bindings.iter().rev().cloned().collect();
        info.modal_scope = scope;
        out.push(info);
    }

    for child in container.children() {
        collect(child, &bindings, scope, next_scope, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::key_binding::{KeyBindings, KeyBindingsBase};
    use pretty_assertions::assert_eq;
    use quill_edit::Buffer;
    use quill_input::Key;

    fn bindings_for(key: char) -> SharedKeyBindings {
        let mut kb = KeyBindings::new();
        kb.add(Key::Control(key), |_| Ok(()));
        kb.shared()
    }

    #[test]
    fn test_empty_layout_is_invalid() {
        let layout = Layout::new(HSplit::new(Vec::new()));
        assert!(matches!(layout.collect_windows(), Err(AppError::Layout(_))));
    }

    #[test]
    fn test_collect_windows_bindings_and_scopes() {
        let mut ctx = test_context();
        let buffer = ctx.add_buffer(Buffer::new());
        let editor = Window::new(BufferControl::new(buffer).with_key_bindings(bindings_for('a')));
        let dialog_field = Window::new(FormattedTextControl::new("ok").with_focusable(true));
        let editor_id = editor.id();
        let dialog_id = dialog_field.id();

        let dialog = HSplit::new(vec![Box::new(dialog_field)])
            .with_modal(true)
            .with_key_bindings(bindings_for('b'));
        let root = HSplit::new(vec![Box::new(editor), Box::new(dialog)]).with_key_bindings(bindings_for('c'));
        let layout = Layout::new(root);

        let windows = layout.collect_windows().unwrap();
        assert_eq!(windows.len(), 2);

        let editor_info = windows.iter().find(|w| w.id == editor_id).unwrap();
        assert_eq!(editor_info.buffer, Some(buffer));
        assert!(editor_info.focusable);
        assert_eq!(editor_info.modal_scope, 0);
        let keys: Vec<Key> = editor_info
            .key_bindings
            .iter()
            .flat_map(|kb| kb.bindings())
            .map(|b| b.keys[0])
            .collect();
        assert_eq!(keys, vec![Key::Control('a'), Key::Control('c')]);

        // The modal dialog does not see the root's bindings.
        let dialog_info = windows.iter().find(|w| w.id == dialog_id).unwrap();
        assert_ne!(dialog_info.modal_scope, 0);
        let keys: Vec<Key> = dialog_info
            .key_bindings
            .iter()
            .flat_map(|kb| kb.bindings())
            .map(|b| b.keys[0])
            .collect();
        assert_eq!(keys, vec![Key::Control('b')]);

        assert_eq!(layout.find_window_for_buffer(buffer), Some(editor_id));
        assert_eq!(layout.window_ids(), vec![editor_id, dialog_id]);
    }
}
