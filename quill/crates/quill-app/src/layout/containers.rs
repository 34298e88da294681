//! Containers arrange windows: stacked, side by side, floating, or
//! switched by application state.

use super::controls::{DummyControl, FormattedTextControl};
use super::dimension::{divide, max_layout_dimensions, sum_layout_dimensions, Dimension, DimensionSource};
use super::mouse_handlers::MouseHandlers;
use super::window::{StyleSource, Window};
use crate::context::AppContext;
use crate::filters::Filter;
use crate::key_binding::SharedKeyBindings;
use quill_core::{FormattedText, WindowId};
use quill_screen::{Screen, WritePosition};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A boxed container, as stored in the layout tree.
pub type ContainerRef = Box<dyn Container>;

/// A node of the layout tree.
///
/// Containers are sized in two passes: the parent asks for preferred
/// dimensions, divides its space, then asks every child to draw itself
/// into the rectangle it was given.
pub trait Container: Any {
    /// Clears per-run state such as scroll positions.
    fn reset(&mut self);

    /// Width constraints given at most `max_available_width` columns.
    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension;

    /// Height constraints at `width` given at most `max_available_height`
    /// rows.
    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension;

    /// Draws into `write_position`.
    ///
    /// `parent_style` is prepended to this container's style. When
    /// `erase_bg` is false, cells this container does not write keep what
    /// was drawn below (transparent floats). `z_index` is the stacking
    /// level of the enclosing float, if any.
    #[allow(clippy::too_many_arguments)]
    fn write_to_screen(
        &mut self,
        ctx: &AppContext,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<i32>,
    );

    /// Modal containers capture the focus cycle and stop key bindings of
    /// outer containers from applying.
    fn is_modal(&self) -> bool {
        false
    }

    /// Bindings active while focus is inside this container.
    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        None
    }

    /// Direct children.
    ///
    /// For leaf containers, return an empty list.
    fn children(&self) -> Vec<&dyn Container>;

    /// Direct children, mutably.
    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)>;

    /// This container as a window, if it is one.
    fn as_window(&self) -> Option<&Window> {
        None
    }

    /// This container as a window, if it is one.
    fn as_window_mut(&mut self) -> Option<&mut Window> {
        None
    }

    /// Casts to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Casts to `Any` for mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Helper trait for downcasting containers.
pub trait ContainerExt: Container {
    /// Attempts to downcast to a concrete type.
    fn downcast_ref<T: Container>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Attempts to downcast to a concrete mutable type.
    fn downcast_mut<T: Container>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}

/// Visits `container` and every descendant, parents first.
pub fn walk<'a>(container: &'a dyn Container, visit: &mut dyn FnMut(&'a dyn Container)) {
    visit(container);
    for child in container.children() {
        walk(child, visit);
    }
}

/// Finds a window by id.
pub fn find_window_mut(container: &mut dyn Container, id: WindowId) -> Option<&mut Window> {
    if container.as_window().is_some_and(|w| w.id() == id) {
        return container.as_window_mut();
    }
    container
        .children_mut()
        .into_iter()
        .find_map(|child| find_window_mut(child, id))
}

macro_rules! container_any {
    () => {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

/// Implements [`Container`] for a wrapper by forwarding to a field.
///
/// `delegate_container!(inner)` forwards to a boxed [`ContainerRef`];
/// `delegate_container!(concrete inner)` forwards to a field holding a
/// concrete container type.
macro_rules! delegate_container {
    ($field:ident) => {
        $crate::layout::containers::delegate_container!(@common $field);

        fn children(&self) -> Vec<&dyn $crate::layout::Container> {
            vec![self.$field.as_ref()]
        }

        fn children_mut(&mut self) -> Vec<&mut (dyn $crate::layout::Container + 'static)> {
            vec![self.$field.as_mut()]
        }
    };
    (concrete $field:ident) => {
        $crate::layout::containers::delegate_container!(@common $field);

        fn children(&self) -> Vec<&dyn $crate::layout::Container> {
            vec![&self.$field as &dyn $crate::layout::Container]
        }

        fn children_mut(&mut self) -> Vec<&mut (dyn $crate::layout::Container + 'static)> {
            vec![&mut self.$field as &mut (dyn $crate::layout::Container + 'static)]
        }
    };
    (@common $field:ident) => {
        fn reset(&mut self) {
            self.$field.reset();
        }

        fn preferred_width(
            &mut self,
            ctx: &$crate::context::AppContext,
            max_available_width: usize,
        ) -> $crate::layout::Dimension {
            self.$field.preferred_width(ctx, max_available_width)
        }

        fn preferred_height(
            &mut self,
            ctx: &$crate::context::AppContext,
            width: usize,
            max_available_height: usize,
        ) -> $crate::layout::Dimension {
            self.$field.preferred_height(ctx, width, max_available_height)
        }

        fn write_to_screen(
            &mut self,
            ctx: &$crate::context::AppContext,
            screen: &mut ::quill_screen::Screen,
            mouse_handlers: &mut $crate::layout::MouseHandlers,
            write_position: ::quill_screen::WritePosition,
            parent_style: &str,
            erase_bg: bool,
            z_index: Option<i32>,
        ) {
            self.$field
                .write_to_screen(ctx, screen, mouse_handlers, write_position, parent_style, erase_bg, z_index);
        }

        fn is_modal(&self) -> bool {
            self.$field.is_modal()
        }

        fn key_bindings(&self) -> Option<$crate::key_binding::SharedKeyBindings> {
            self.$field.key_bindings()
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

pub(crate) use delegate_container;

fn join_style(parent: &str, own: &str) -> String {
    if own.is_empty() {
        parent.to_string()
    } else {
        format!("{parent} {own}")
    }
}

/// The window shown when a split cannot fit its children.
pub fn window_too_small() -> Window {
    Window::new(FormattedTextControl::new(FormattedText::styled(
        "class:window-too-small",
        " Window too small... ",
    )))
}

// === Splits ===

/// Vertical placement of the children of an [`HSplit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    /// Children at the top; space left below.
    Top,
    /// Children centered.
    Center,
    /// Children at the bottom.
    Bottom,
    /// Children stretched over the whole height.
    #[default]
    Justify,
}

/// Horizontal placement of the children of a [`VSplit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    /// Children at the left.
    Left,
    /// Children centered.
    Center,
    /// Children at the right.
    Right,
    /// Children stretched over the whole width.
    #[default]
    Justify,
}

/// What occupies one slot of a split: a child, the padding after a child,
/// or the alignment filler before or after all children.
#[derive(Debug, Clone, Copy)]
enum Slot {
    LeadingFill,
    Child(usize),
    Padding(usize),
    TrailingFill,
}

/// State shared by both split directions.
struct SplitParts {
    children: Vec<ContainerRef>,
    padding: usize,
    padding_char: Option<char>,
    padding_style: String,
    padding_windows: Vec<Window>,
    leading_fill: Window,
    trailing_fill: Window,
    remaining_space: Window,
    window_too_small: Window,
    width: Option<DimensionSource>,
    height: Option<DimensionSource>,
    z_index: Option<i32>,
    modal: bool,
    key_bindings: Option<SharedKeyBindings>,
    style: StyleSource,
}

impl SplitParts {
    fn new(children: Vec<ContainerRef>) -> Self {
        Self {
            children,
            padding: 0,
            padding_char: None,
            padding_style: String::new(),
            padding_windows: Vec::new(),
            leading_fill: Window::new(DummyControl),
            trailing_fill: Window::new(DummyControl),
            remaining_space: Window::new(DummyControl),
            window_too_small: window_too_small(),
            width: None,
            height: None,
            z_index: None,
            modal: false,
            key_bindings: None,
            style: StyleSource::default(),
        }
    }

    fn slots(&self, leading: bool, trailing: bool) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(self.children.len() * 2 + 2);
        if leading {
            slots.push(Slot::LeadingFill);
        }
        for i in 0..self.children.len() {
            if i > 0 && self.padding > 0 {
                slots.push(Slot::Padding(i - 1));
            }
            slots.push(Slot::Child(i));
        }
        if trailing {
            slots.push(Slot::TrailingFill);
        }
        slots
    }

    fn sync_padding(&mut self, vertical: bool) {
        let wanted = self.children.len().saturating_sub(1);
        if self.padding == 0 || self.padding_windows.len() == wanted {
            return;
        }
        self.padding_windows = (0..wanted)
            .map(|_| {
                let window = Window::new(DummyControl).with_style(self.padding_style.as_str());
                let window = if vertical {
                    window.with_height(self.padding)
                } else {
                    window.with_width(self.padding)
                };
                match self.padding_char {
                    Some(c) => window.with_char(c),
                    None => window,
                }
            })
            .collect();
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut dyn Container {
        match slot {
            Slot::LeadingFill => &mut self.leading_fill,
            Slot::TrailingFill => &mut self.trailing_fill,
            Slot::Padding(i) => &mut self.padding_windows[i],
            Slot::Child(i) => self.children[i].as_mut(),
        }
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
    }

    fn children(&self) -> Vec<&dyn Container> {
        self.children.iter().map(AsRef::as_ref).collect()
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        self.children.iter_mut().map(AsMut::as_mut).collect()
    }
}

macro_rules! split_builders {
    () => {
        /// Cells between children.
        pub fn with_padding(mut self, padding: usize) -> Self {
            self.parts.padding = padding;
            self.parts.padding_windows.clear();
            self
        }

        /// Character filling the padding.
        pub fn with_padding_char(mut self, c: char) -> Self {
            self.parts.padding_char = Some(c);
            self.parts.padding_windows.clear();
            self
        }

        /// Style of the padding.
        pub fn with_padding_style(mut self, style: impl Into<String>) -> Self {
            self.parts.padding_style = style.into();
            self.parts.padding_windows.clear();
            self
        }

        /// Overrides the computed width.
        pub fn with_width(mut self, width: impl Into<DimensionSource>) -> Self {
            self.parts.width = Some(width.into());
            self
        }

        /// Overrides the computed height.
        pub fn with_height(mut self, height: impl Into<DimensionSource>) -> Self {
            self.parts.height = Some(height.into());
            self
        }

        /// Stacking level passed to the children.
        pub fn with_z_index(mut self, z_index: i32) -> Self {
            self.parts.z_index = Some(z_index);
            self
        }

        /// Makes the split modal.
        pub fn with_modal(mut self, modal: bool) -> Self {
            self.parts.modal = modal;
            self
        }

        /// Bindings active while focus is inside.
        pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
            self.parts.key_bindings = Some(key_bindings);
            self
        }

        /// Style applied to every child.
        pub fn with_style(mut self, style: impl Into<StyleSource>) -> Self {
            self.parts.style = style.into();
            self
        }

        /// Replaces the "window too small" message.
        pub fn with_window_too_small(mut self, window: Window) -> Self {
            self.parts.window_too_small = window;
            self
        }

        /// The children.
        pub fn children_list(&self) -> &[ContainerRef] {
            &self.parts.children
        }
    };
}

/// Children stacked vertically.
pub struct HSplit {
    parts: SplitParts,
    align: VerticalAlign,
}

impl fmt::Debug for HSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HSplit")
            .field("children", &self.parts.children.len())
            .field("align", &self.align)
            .field("padding", &self.parts.padding)
            .finish_non_exhaustive()
    }
}

impl HSplit {
    /// Stacks `children` top to bottom.
    pub fn new(children: Vec<ContainerRef>) -> Self {
        Self {
            parts: SplitParts::new(children),
            align: VerticalAlign::Justify,
        }
    }

    /// Vertical placement of the children.
    pub fn with_align(mut self, align: VerticalAlign) -> Self {
        self.align = align;
        self
    }

    split_builders!();

    fn slots(&mut self) -> Vec<Slot> {
        self.parts.sync_padding(true);
        let leading = matches!(self.align, VerticalAlign::Center | VerticalAlign::Bottom);
        let trailing = matches!(self.align, VerticalAlign::Center | VerticalAlign::Top);
        self.parts.slots(leading, trailing)
    }

    fn divide_heights(&mut self, ctx: &AppContext, wp: WritePosition) -> Option<Vec<(Slot, usize)>> {
        let slots = self.slots();
        if self.parts.children.is_empty() {
            return Some(Vec::new());
        }
        let dimensions: Vec<Dimension> = slots
            .iter()
            .map(|slot| self.parts.slot_mut(*slot).preferred_height(ctx, wp.width, wp.height))
            .collect();
        // Extra space is handed out while the application runs; the final
        // frame before exit keeps the preferred sizes.
        let sizes = divide(&dimensions, wp.height, !ctx.is_done())?;
        Some(slots.into_iter().zip(sizes).collect())
    }
}

impl Container for HSplit {
    fn reset(&mut self) {
        self.parts.reset();
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        if let Some(width) = &self.parts.width {
            return width.get(ctx);
        }
        if self.parts.children.is_empty() {
            return Dimension::default();
        }
        let dimensions: Vec<Dimension> = self
            .parts
            .children
            .iter_mut()
            .map(|c| c.preferred_width(ctx, max_available_width))
            .collect();
        max_layout_dimensions(&dimensions)
    }

    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        if let Some(height) = &self.parts.height {
            return height.get(ctx);
        }
        let slots = self.slots();
        let dimensions: Vec<Dimension> = slots
            .into_iter()
            .map(|slot| self.parts.slot_mut(slot).preferred_height(ctx, width, max_available_height))
            .collect();
        sum_layout_dimensions(&dimensions)
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
        let style = join_style(parent_style, &self.parts.style.get(ctx));
        let z_index = self.parts.z_index.or(z_index);
        let Some(sizes) = self.divide_heights(ctx, write_position) else {
            self.parts
                .window_too_small
                .write_to_screen(ctx, screen, mouse_handlers, write_position, &style, erase_bg, z_index);
            return;
        };

        let WritePosition { xpos, mut ypos, width, .. } = write_position;
        for (slot, size) in sizes {
            let wp = WritePosition::new(xpos, ypos, width, size);
            self.parts
                .slot_mut(slot)
                .write_to_screen(ctx, screen, mouse_handlers, wp, &style, erase_bg, z_index);
            ypos += size;
        }

        // Children that refused more space leave a gap to fill.
        let bottom = write_position.ypos + write_position.height;
        if ypos < bottom {
            let wp = WritePosition::new(xpos, ypos, width, bottom - ypos);
            self.parts
                .remaining_space
                .write_to_screen(ctx, screen, mouse_handlers, wp, &style, erase_bg, z_index);
        }
    }

    fn is_modal(&self) -> bool {
        self.parts.modal
    }

    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        self.parts.key_bindings.clone()
    }

    fn children(&self) -> Vec<&dyn Container> {
        self.parts.children()
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        self.parts.children_mut()
    }

    container_any!();
}

/// Children placed side by side.
pub struct VSplit {
    parts: SplitParts,
    align: HorizontalAlign,
}

impl fmt::Debug for VSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VSplit")
            .field("children", &self.parts.children.len())
            .field("align", &self.align)
            .field("padding", &self.parts.padding)
            .finish_non_exhaustive()
    }
}

impl VSplit {
    /// Places `children` left to right.
    pub fn new(children: Vec<ContainerRef>) -> Self {
        Self {
            parts: SplitParts::new(children),
            align: HorizontalAlign::Justify,
        }
    }

    /// Horizontal placement of the children.
    pub fn with_align(mut self, align: HorizontalAlign) -> Self {
        self.align = align;
        self
    }

    split_builders!();

    fn slots(&mut self) -> Vec<Slot> {
        self.parts.sync_padding(false);
        let leading = matches!(self.align, HorizontalAlign::Center | HorizontalAlign::Right);
        let trailing = matches!(self.align, HorizontalAlign::Center | HorizontalAlign::Left);
        self.parts.slots(leading, trailing)
    }

    fn divide_widths(&mut self, ctx: &AppContext, width: usize) -> Option<Vec<(Slot, usize)>> {
        let slots = self.slots();
        if self.parts.children.is_empty() {
            return Some(Vec::new());
        }
        let dimensions: Vec<Dimension> = slots
            .iter()
            .map(|slot| self.parts.slot_mut(*slot).preferred_width(ctx, width))
            .collect();
        let sizes = divide(&dimensions, width, true)?;
        Some(slots.into_iter().zip(sizes).collect())
    }
}

impl Container for VSplit {
    fn reset(&mut self) {
        self.parts.reset();
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        if let Some(width) = &self.parts.width {
            return width.get(ctx);
        }
        let slots = self.slots();
        let dimensions: Vec<Dimension> = slots
            .into_iter()
            .map(|slot| self.parts.slot_mut(slot).preferred_width(ctx, max_available_width))
            .collect();
        sum_layout_dimensions(&dimensions)
    }

    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        if let Some(height) = &self.parts.height {
            return height.get(ctx);
        }
        // Heights depend on the widths the children will actually get.
        let Some(sizes) = self.divide_widths(ctx, width) else {
            return Dimension::default();
        };
        let dimensions: Vec<Dimension> = sizes
            .into_iter()
            .map(|(slot, size)| self.parts.slot_mut(slot).preferred_height(ctx, size, max_available_height))
            .collect();
        max_layout_dimensions(&dimensions)
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
        if self.parts.children.is_empty() {
            return;
        }
        let style = join_style(parent_style, &self.parts.style.get(ctx));
        let z_index = self.parts.z_index.or(z_index);
        let Some(sizes) = self.divide_widths(ctx, write_position.width) else {
            self.parts
                .window_too_small
                .write_to_screen(ctx, screen, mouse_handlers, write_position, &style, erase_bg, z_index);
            return;
        };

        let height = write_position.height;
        let WritePosition { mut xpos, ypos, .. } = write_position;
        for (slot, size) in sizes {
            let wp = WritePosition::new(xpos, ypos, size, height);
            self.parts
                .slot_mut(slot)
                .write_to_screen(ctx, screen, mouse_handlers, wp, &style, erase_bg, z_index);
            xpos += size;
        }

        let right = write_position.xpos + write_position.width;
        if xpos < right {
            let wp = WritePosition::new(xpos, ypos, right - xpos, height);
            self.parts
                .remaining_space
                .write_to_screen(ctx, screen, mouse_handlers, wp, &style, erase_bg, z_index);
        }
    }

    fn is_modal(&self) -> bool {
        self.parts.modal
    }

    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        self.parts.key_bindings.clone()
    }

    fn children(&self) -> Vec<&dyn Container> {
        self.parts.children()
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        self.parts.children_mut()
    }

    container_any!();
}

// === Floats ===

/// A container drawn on top of a [`FloatContainer`]'s content.
///
/// Horizontal placement, in order of precedence: `left` with a width,
/// `left` and `right`, `right` with a width, next to the cursor
/// (`xcursor`), centered with a width, or the content's preferred width
/// aligned to whichever edge is given (centered otherwise). Vertical
/// placement follows the same rules with `top`, `bottom` and `ycursor`;
/// a cursor-anchored float moves above the cursor when there is more room
/// there.
pub struct Float {
    content: ContainerRef,
    left: Option<usize>,
    right: Option<usize>,
    top: Option<usize>,
    bottom: Option<usize>,
    width: Option<usize>,
    height: Option<usize>,
    xcursor: bool,
    ycursor: bool,
    attach_to_window: Option<WindowId>,
    allow_cover_cursor: bool,
    transparent: Filter,
    hide_when_covering_content: bool,
    z_index: i32,
}

impl fmt::Debug for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Float")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("top", &self.top)
            .field("bottom", &self.bottom)
            .field("xcursor", &self.xcursor)
            .field("ycursor", &self.ycursor)
            .field("z_index", &self.z_index)
            .finish_non_exhaustive()
    }
}

impl Float {
    /// A float showing `content`, centered unless positioned.
    pub fn new(content: ContainerRef) -> Self {
        Self {
            content,
            left: None,
            right: None,
            top: None,
            bottom: None,
            width: None,
            height: None,
            xcursor: false,
            ycursor: false,
            attach_to_window: None,
            allow_cover_cursor: false,
            transparent: Filter::Never,
            hide_when_covering_content: false,
            z_index: 1,
        }
    }

    /// Distance from the left edge.
    pub fn with_left(mut self, left: usize) -> Self {
        self.left = Some(left);
        self
    }

    /// Distance from the right edge.
    pub fn with_right(mut self, right: usize) -> Self {
        self.right = Some(right);
        self
    }

    /// Distance from the top edge.
    pub fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    /// Distance from the bottom edge.
    pub fn with_bottom(mut self, bottom: usize) -> Self {
        self.bottom = Some(bottom);
        self
    }

    /// Fixed width.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Fixed height.
    pub fn with_height(mut self, height: usize) -> Self {
        self.height = Some(height);
        self
    }

    /// Places the float at the cursor (or menu anchor) column and row.
    pub fn at_cursor(mut self) -> Self {
        self.xcursor = true;
        self.ycursor = true;
        self
    }

    /// Follows the cursor of this window instead of the focused one.
    pub fn with_attach_to_window(mut self, window: WindowId) -> Self {
        self.attach_to_window = Some(window);
        self
    }

    /// Lets a cursor-anchored float cover the cursor row.
    pub fn with_allow_cover_cursor(mut self, allow: bool) -> Self {
        self.allow_cover_cursor = allow;
        self
    }

    /// Leaves cells the content does not draw showing what is below.
    pub fn with_transparent(mut self, filter: impl Into<Filter>) -> Self {
        self.transparent = filter.into();
        self
    }

    /// Skips drawing when the area below already has content.
    pub fn with_hide_when_covering_content(mut self, hide: bool) -> Self {
        self.hide_when_covering_content = hide;
        self
    }

    /// Stacking level relative to the container.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// The float's content.
    pub fn content(&self) -> &dyn Container {
        self.content.as_ref()
    }

    fn horizontal(&mut self, ctx: &AppContext, wp: WritePosition, cursor_x: usize) -> (usize, usize) {
        match (self.left, self.right, self.width) {
            (Some(left), _, Some(width)) => (left, width),
            (Some(left), Some(right), None) => (left, wp.width.saturating_sub(left + right)),
            (None, Some(right), Some(width)) => (wp.width.saturating_sub(right + width), width),
            _ if self.xcursor => {
                let width = self
                    .width
                    .unwrap_or_else(|| self.content.preferred_width(ctx, wp.width).preferred.min(wp.width));
                let xpos = if cursor_x + width > wp.width {
                    wp.width.saturating_sub(width)
                } else {
                    cursor_x
                };
                (xpos, width)
            }
            (_, _, Some(width)) if width > 0 => (wp.width.saturating_sub(width) / 2, width),
            _ => {
                let width = self.content.preferred_width(ctx, wp.width).preferred;
                let xpos = match (self.left, self.right) {
                    (Some(left), _) => left,
                    (None, Some(right)) => wp.width.saturating_sub(width + right),
                    (None, None) => wp.width.saturating_sub(width) / 2,
                };
                (xpos, width.min(wp.width.saturating_sub(xpos)))
            }
        }
    }

    fn vertical(&mut self, ctx: &AppContext, wp: WritePosition, width: usize, cursor_y: usize) -> (usize, usize) {
        match (self.top, self.bottom, self.height) {
            (Some(top), _, Some(height)) => (top, height),
            (Some(top), Some(bottom), None) => (top, wp.height.saturating_sub(top + bottom)),
            (None, Some(bottom), Some(height)) => (wp.height.saturating_sub(height + bottom), height),
            _ if self.ycursor => {
                let mut ypos = cursor_y + usize::from(!self.allow_cover_cursor);
                let mut height = self
                    .height
                    .unwrap_or_else(|| self.content.preferred_height(ctx, width, wp.height).preferred);
                let below = wp.height.saturating_sub(ypos);
                if height > below {
                    if below + 1 >= ypos {
                        height = below;
                    } else {
                        height = height.min(cursor_y);
                        ypos = cursor_y - height;
                    }
                }
                (ypos, height)
            }
            (_, _, Some(height)) if height > 0 => (wp.height.saturating_sub(height) / 2, height),
            _ => {
                let height = self.content.preferred_height(ctx, width, wp.height).preferred;
                let ypos = match (self.top, self.bottom) {
                    (Some(top), _) => top,
                    (None, Some(bottom)) => wp.height.saturating_sub(height + bottom),
                    (None, None) => wp.height.saturating_sub(height) / 2,
                };
                (ypos, height.min(wp.height.saturating_sub(ypos)))
            }
        }
    }
}

/// Content with floats drawn over it.
pub struct FloatContainer {
    content: ContainerRef,
    floats: Vec<Float>,
    modal: bool,
    key_bindings: Option<SharedKeyBindings>,
    style: StyleSource,
    z_index: Option<i32>,
}

impl fmt::Debug for FloatContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatContainer")
            .field("floats", &self.floats)
            .field("modal", &self.modal)
            .finish_non_exhaustive()
    }
}

impl FloatContainer {
    /// `content` with `floats` above it.
    pub fn new(content: ContainerRef, floats: Vec<Float>) -> Self {
        Self {
            content,
            floats,
            modal: false,
            key_bindings: None,
            style: StyleSource::default(),
            z_index: None,
        }
    }

    /// Makes the container modal.
    pub fn with_modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }

    /// Bindings active while focus is inside.
    pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
        self.key_bindings = Some(key_bindings);
        self
    }

    /// Style applied to the content and floats.
    pub fn with_style(mut self, style: impl Into<StyleSource>) -> Self {
        self.style = style.into();
        self
    }

    /// Stacking level.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    /// Adds a float above the existing ones.
    pub fn push_float(&mut self, float: Float) {
        self.floats.push(float);
    }

    /// Returns true when nothing but blanks is drawn in `wp`.
    fn area_is_empty(screen: &Screen, wp: WritePosition) -> bool {
        (wp.ypos..wp.ypos + wp.height).all(|y| {
            screen
                .row(y)
                .map_or(true, |row| row.iter().skip(wp.xpos).take(wp.width).all(|c| &*c.text == " "))
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_float(
        float: &mut Float,
        ctx: &AppContext,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        wp: WritePosition,
        style: &str,
        z_index: i32,
    ) {
        // Floats drawn earlier may have moved the anchor, so it is read
        // per float.
        let anchor = float
            .attach_to_window
            .or_else(|| ctx.focused_window())
            .map_or(quill_core::Point::ZERO, |id| screen.get_menu_position(id));
        let cursor_x = anchor.x.saturating_sub(wp.xpos);
        let cursor_y = anchor.y.saturating_sub(wp.ypos);

        let (xpos, width) = float.horizontal(ctx, wp, cursor_x);
        let (ypos, height) = float.vertical(ctx, wp, width, cursor_y);
        if width == 0 || height == 0 {
            return;
        }
        let float_wp = WritePosition::new(wp.xpos + xpos, wp.ypos + ypos, width, height);
        if float.hide_when_covering_content && !Self::area_is_empty(screen, float_wp) {
            return;
        }
        let erase_bg = !float.transparent.eval(ctx);
        float
            .content
            .write_to_screen(ctx, screen, mouse_handlers, float_wp, style, erase_bg, Some(z_index));
    }
}

impl Container for FloatContainer {
    fn reset(&mut self) {
        self.content.reset();
        for float in &mut self.floats {
            float.content.reset();
        }
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        self.content.preferred_width(ctx, max_available_width)
    }

    // Floats always fit in the space of the content.
    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        self.content.preferred_height(ctx, width, max_available_height)
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
        let style = join_style(parent_style, &self.style.get(ctx));
        let z_index = self.z_index.or(z_index);
        self.content
            .write_to_screen(ctx, screen, mouse_handlers, write_position, &style, erase_bg, z_index);

        // Lower z-index first; floats following the cursor go last so the
        // window owning the cursor has been drawn.
        let mut order: Vec<usize> = (0..self.floats.len()).collect();
        order.sort_by_key(|&i| {
            let float = &self.floats[i];
            (float.xcursor || float.ycursor, float.z_index)
        });
        let base = z_index.unwrap_or(0);
        for i in order {
            let float = &mut self.floats[i];
            let float_z = base + float.z_index;
            Self::draw_float(float, ctx, screen, mouse_handlers, write_position, &style, float_z);
        }
    }

    fn is_modal(&self) -> bool {
        self.modal
    }

    fn key_bindings(&self) -> Option<SharedKeyBindings> {
        self.key_bindings.clone()
    }

    fn children(&self) -> Vec<&dyn Container> {
        std::iter::once(self.content.as_ref())
            .chain(self.floats.iter().map(|f| f.content.as_ref()))
            .collect()
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        std::iter::once(self.content.as_mut())
            .chain(self.floats.iter_mut().map(|f| f.content.as_mut()))
            .collect()
    }

    container_any!();
}

// === Switching ===

/// Shows its content only while a filter holds.
pub struct ConditionalContainer {
    content: ContainerRef,
    filter: Filter,
}

impl fmt::Debug for ConditionalContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalContainer")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl ConditionalContainer {
    /// Shows `content` while `filter` holds.
    pub fn new(content: ContainerRef, filter: impl Into<Filter>) -> Self {
        Self {
            content,
            filter: filter.into(),
        }
    }
}

impl Container for ConditionalContainer {
    fn reset(&mut self) {
        self.content.reset();
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        if self.filter.eval(ctx) {
            self.content.preferred_width(ctx, max_available_width)
        } else {
            Dimension::zero()
        }
    }

    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        if self.filter.eval(ctx) {
            self.content.preferred_height(ctx, width, max_available_height)
        } else {
            Dimension::zero()
        }
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
        if self.filter.eval(ctx) {
            self.content
                .write_to_screen(ctx, screen, mouse_handlers, write_position, parent_style, erase_bg, z_index);
        }
    }

    fn children(&self) -> Vec<&dyn Container> {
        vec![self.content.as_ref()]
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        vec![self.content.as_mut()]
    }

    container_any!();
}

/// Picks one of several containers on every frame.
///
/// All candidates stay part of the tree, so windows keep their identity
/// (and focus) while hidden; only the selected one is sized and drawn.
pub struct DynamicContainer {
    candidates: Vec<ContainerRef>,
    select: Rc<dyn Fn(&AppContext) -> Option<usize>>,
}

impl fmt::Debug for DynamicContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContainer")
            .field("candidates", &self.candidates.len())
            .finish_non_exhaustive()
    }
}

impl DynamicContainer {
    /// Chooses among `candidates` with `select`; `None` shows nothing.
    pub fn new(candidates: Vec<ContainerRef>, select: impl Fn(&AppContext) -> Option<usize> + 'static) -> Self {
        Self {
            candidates,
            select: Rc::new(select),
        }
    }

    fn current(&mut self, ctx: &AppContext) -> Option<&mut ContainerRef> {
        let index = (self.select)(ctx)?;
        self.candidates.get_mut(index)
    }
}

impl Container for DynamicContainer {
    fn reset(&mut self) {
        for candidate in &mut self.candidates {
            candidate.reset();
        }
    }

    fn preferred_width(&mut self, ctx: &AppContext, max_available_width: usize) -> Dimension {
        self.current(ctx)
            .map_or_else(Dimension::zero, |c| c.preferred_width(ctx, max_available_width))
    }

    fn preferred_height(&mut self, ctx: &AppContext, width: usize, max_available_height: usize) -> Dimension {
        self.current(ctx)
            .map_or_else(Dimension::zero, |c| c.preferred_height(ctx, width, max_available_height))
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
        if let Some(current) = self.current(ctx) {
            current.write_to_screen(ctx, screen, mouse_handlers, write_position, parent_style, erase_bg, z_index);
        }
    }

    fn children(&self) -> Vec<&dyn Container> {
        self.candidates.iter().map(AsRef::as_ref).collect()
    }

    fn children_mut(&mut self) -> Vec<&mut (dyn Container + 'static)> {
        self.candidates.iter_mut().map(AsMut::as_mut).collect()
    }

    container_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::layout::controls::FormattedTextControl;
    use crate::layout::window::WindowAlign;
    use pretty_assertions::assert_eq;

    fn text_window(text: &str) -> Window {
        Window::new(FormattedTextControl::new(text))
    }

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

    #[test]
    fn test_hsplit_stacks_children() {
        let ctx = test_context();
        let mut split = HSplit::new(vec![
            Box::new(text_window("top").with_height(1)),
            Box::new(text_window("bottom")),
        ]);
        assert_eq!(draw(&ctx, &mut split, 10, 3), vec!["top", "bottom", ""]);
        let height = split.preferred_height(&ctx, 10, 24);
        assert_eq!(height.preferred, 2);
    }

    #[test]
    fn test_hsplit_bottom_align() {
        let ctx = test_context();
        let mut split = HSplit::new(vec![Box::new(text_window("x").with_height(1))]).with_align(VerticalAlign::Bottom);
        assert_eq!(draw(&ctx, &mut split, 4, 3), vec!["", "", "x"]);
    }

    #[test]
    fn test_vsplit_padding_char() {
        let ctx = test_context();
        let mut split = VSplit::new(vec![
            Box::new(text_window("a").with_width(2)),
            Box::new(text_window("b").with_width(2)),
        ])
        .with_padding(1)
        .with_padding_char('|')
        .with_align(HorizontalAlign::Left);
        assert_eq!(draw(&ctx, &mut split, 8, 1), vec!["a |b"]);
    }

    #[test]
    fn test_vsplit_too_small() {
        let ctx = test_context();
        let mut split = VSplit::new(vec![
            Box::new(text_window("a").with_width(10)),
            Box::new(text_window("b").with_width(10)),
        ]);
        let lines = draw(&ctx, &mut split, 12, 1);
        assert_eq!(lines, vec![" Window too"]);
    }

    #[test]
    fn test_vsplit_centered_window() {
        let ctx = test_context();
        let mut split = VSplit::new(vec![
            Box::new(text_window("L").with_width(2)),
            Box::new(
                text_window("mid")
                    .with_width(Dimension::at_least(5))
                    .with_align(WindowAlign::Center),
            ),
        ]);
        // The second window gets the remaining 10 columns.
        assert_eq!(draw(&ctx, &mut split, 12, 1), vec!["L    mid"]);
    }

    #[test]
    fn test_float_positions() {
        let ctx = test_context();
        let mut container = FloatContainer::new(
            Box::new(text_window("..........\n..........\n..........")),
            vec![
                Float::new(Box::new(text_window("AB"))).with_top(1).with_right(0),
                Float::new(Box::new(text_window("C"))).with_left(0).with_bottom(0),
            ],
        );
        assert_eq!(
            draw(&ctx, &mut container, 10, 3),
            vec!["..........", "........AB", "C........."]
        );
    }

    #[test]
    fn test_hidden_float_over_content() {
        let ctx = test_context();
        let mut container = FloatContainer::new(
            Box::new(text_window("xx")),
            vec![Float::new(Box::new(text_window("F")))
                .with_left(0)
                .with_top(0)
                .with_hide_when_covering_content(true)],
        );
        assert_eq!(draw(&ctx, &mut container, 4, 1), vec!["xx"]);
    }

    #[test]
    fn test_conditional_container() {
        let ctx = test_context();
        let mut hidden = ConditionalContainer::new(Box::new(text_window("x")), false);
        assert_eq!(hidden.preferred_height(&ctx, 10, 10), Dimension::zero());
        assert_eq!(draw(&ctx, &mut hidden, 3, 1), vec![""]);
    }

    #[test]
    fn test_dynamic_container_switches() {
        let ctx = test_context();
        let mut dynamic = DynamicContainer::new(
            vec![Box::new(text_window("one")), Box::new(text_window("two"))],
            |_| Some(1),
        );
        assert_eq!(draw(&ctx, &mut dynamic, 5, 1), vec!["two"]);
        assert_eq!(dynamic.children().len(), 2);
    }

    #[test]
    fn test_find_window() {
        let window = text_window("x");
        let id = window.id();
        let mut split = HSplit::new(vec![Box::new(VSplit::new(vec![Box::new(window)]))]);
        assert!(find_window_mut(&mut split, id).is_some());

        let mut count = 0;
        walk(&split, &mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
