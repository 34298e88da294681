//! Shared state handed to key handlers, filters and controls.
//!
//! The layout tree owns containers and controls; everything they need to
//! share lives here: the buffers (addressed by [`BufferId`]), the focus
//! stack, search links, the clipboard and the queues through which
//! handlers ask the running application to do terminal-level work.

use crate::error::{AppError, HandlerResult};
use crate::key_binding::SharedKeyBindings;
use quill_core::geometry::Size;
use quill_core::id::WindowId;
use quill_core::style::Style;
use quill_core::ColorDepth;
use quill_edit::clipboard::Clipboard;
use quill_edit::{
    Buffer, InMemoryClipboard, JobOutcome, SearchDirection, SearchState, WorkerPool,
};
use quill_input::{Input, KeyPress};
use quill_output::Output;
use slotmap::SlotMap;
use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

slotmap::new_key_type! {
    /// Handle of a [`Buffer`] owned by an [`AppContext`].
    pub struct BufferId;
}

/// Events posted to the event loop, possibly from other threads.
pub(crate) enum LoopEvent {
    /// The input has keys to read.
    InputReady,
    /// A background buffer job finished.
    Job {
        buffer: BufferId,
        outcome: JobOutcome,
    },
    /// A buffer's history finished loading.
    HistoryLoaded(BufferId),
    /// Something asked for a redraw.
    Invalidate,
    /// Run a closure on the loop.
    Call(Box<dyn FnOnce(&mut AppContext) + Send>),
    /// Background work for [`AppContext::run_in_executor`] finished.
    Continue {
        token: u64,
        value: Box<dyn Any + Send>,
    },
}

impl fmt::Debug for LoopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputReady => f.write_str("InputReady"),
            Self::Job { buffer, outcome } => f
                .debug_struct("Job")
                .field("buffer", buffer)
                .field("generation", &outcome.generation())
                .finish(),
            Self::HistoryLoaded(id) => f.debug_tuple("HistoryLoaded").field(id).finish(),
            Self::Invalidate => f.write_str("Invalidate"),
            Self::Call(_) => f.write_str("Call"),
            Self::Continue { token, .. } => f.debug_struct("Continue").field("token", token).finish(),
        }
    }
}

/// A `Send` handle for posting work to a running application's loop from
/// any thread.
#[derive(Clone)]
pub struct LoopHandle {
    sender: flume::Sender<LoopEvent>,
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle").finish_non_exhaustive()
    }
}

impl LoopHandle {
    pub(crate) fn new(sender: flume::Sender<LoopEvent>) -> Self {
        Self { sender }
    }

    pub(crate) fn send(&self, event: LoopEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Requests a redraw.
    pub fn invalidate(&self) {
        self.send(LoopEvent::Invalidate);
    }

    /// Runs `f` on the loop thread. Returns false if the loop is gone.
    pub fn call(&self, f: impl FnOnce(&mut AppContext) + Send + 'static) -> bool {
        self.send(LoopEvent::Call(Box::new(f)))
    }
}

/// What ends a run.
pub(crate) enum ExitRequest {
    Value(Box<dyn Any>),
    Error(AppError),
}

#[derive(Default)]
struct ExitState {
    request: Option<ExitRequest>,
    style: String,
}

/// Cloneable handle that sets the exit value of the current run.
///
/// Accept handlers of buffers cannot see the context, so they capture one
/// of these instead.
#[derive(Clone, Default)]
pub struct ExitHandle(Rc<RefCell<ExitState>>);

impl fmt::Debug for ExitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitHandle")
            .field("is_set", &self.is_set())
            .finish()
    }
}

impl ExitHandle {
    fn set(&self, request: ExitRequest, style: &str) {
        let mut state = self.0.borrow_mut();
        if state.request.is_some() {
            tracing::warn!("exit value already set; ignoring second exit");
            return;
        }
        state.request = Some(request);
        state.style = style.to_string();
    }

    /// Ends the run with `()`.
    pub fn exit(&self) {
        self.exit_with(());
    }

    /// Ends the run with a value.
    pub fn exit_with<T: Any>(&self, value: T) {
        self.set(ExitRequest::Value(Box::new(value)), "");
    }

    /// Ends the run with an error such as [`AppError::KeyboardInterrupt`].
    /// `style` is applied to the final frame, e.g. `class:aborting`.
    pub fn exit_error(&self, error: AppError, style: &str) {
        self.set(ExitRequest::Error(error), style);
    }

    /// Returns true once an exit value or error has been set.
    pub fn is_set(&self) -> bool {
        self.0.borrow().request.is_some()
    }

    pub(crate) fn style(&self) -> String {
        self.0.borrow().style.clone()
    }

    pub(crate) fn take(&self) -> Option<ExitRequest> {
        self.0.borrow_mut().request.take()
    }

    pub(crate) fn reset(&self) {
        let mut state = self.0.borrow_mut();
        state.request = None;
        state.style.clear();
    }
}

/// Terminal access granted to code run through
/// [`AppContext::run_in_terminal`]. The application's output is erased
/// and the terminal is in cooked mode while it runs.
pub struct InTerminal<'a> {
    /// Application state.
    pub ctx: &'a mut AppContext,
    /// The terminal output.
    pub output: &'a mut dyn Output,
    /// The terminal input, detached from the loop.
    pub input: &'a mut dyn Input,
    /// The application's style.
    pub style: &'a Style,
    /// Depth colors are downgraded to.
    pub color_depth: ColorDepth,
}

impl fmt::Debug for InTerminal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InTerminal")
            .field("color_depth", &self.color_depth)
            .finish_non_exhaustive()
    }
}

impl InTerminal<'_> {
    /// Prints formatted text at the cursor.
    pub fn print_formatted_text(&mut self, text: &quill_core::FormattedText) {
        crate::renderer::print_formatted_text(self.output, text, self.style, self.color_depth);
    }

    /// Waits for a key press accepted by `accept` and returns it. Returns
    /// `None` when the input closes.
    pub fn read_key(&mut self, accept: impl Fn(&KeyPress) -> bool) -> Option<KeyPress> {
        crate::application::system::wait_for_key(self.input, accept)
    }
}

pub(crate) type TerminalFn = Box<dyn FnOnce(&mut InTerminal<'_>) -> HandlerResult>;

/// Terminal-level work requested by handlers and performed by the
/// application between key batches.
pub(crate) enum Request {
    InTerminal { func: TerminalFn, render_done: bool },
    SystemCommand {
        command: String,
        wait_for_enter: bool,
        display_before_text: String,
    },
    Suspend,
    ClearScreen,
}

/// A window of the layout as seen by focus handling and key dispatch.
#[derive(Clone)]
pub struct WindowInfo {
    /// The window.
    pub id: WindowId,
    /// Buffer shown by the window's control, if any.
    pub buffer: Option<BufferId>,
    /// Buffer of the search field linked to the control.
    pub search_buffer: Option<BufferId>,
    /// Whether searches in this window ignore case.
    pub search_ignore_case: bool,
    /// Whether the window can take focus.
    pub focusable: bool,
    /// Key bindings of the control and of the enclosing containers, inner
    /// first, up to the nearest modal container.
    pub(crate) key_bindings: Vec<SharedKeyBindings>,
    /// Index of the nearest modal container; windows with the same scope
    /// are cycled through together.
    pub(crate) modal_scope: usize,
}

impl WindowInfo {
    pub(crate) fn new(id: WindowId) -> Self {
        Self {
            id,
            buffer: None,
            search_buffer: None,
            search_ignore_case: false,
            focusable: false,
            key_bindings: Vec::new(),
            modal_scope: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_buffer(id: WindowId, buffer: BufferId) -> Self {
        Self {
            buffer: Some(buffer),
            focusable: true,
            ..Self::new(id)
        }
    }
}

impl fmt::Debug for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowInfo")
            .field("id", &self.id)
            .field("buffer", &self.buffer)
            .field("focusable", &self.focusable)
            .finish_non_exhaustive()
    }
}

/// An incremental search in progress: the search field has focus and
/// edits the target buffer's search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLink {
    /// The search field's buffer.
    pub search_buffer: BufferId,
    /// The buffer being searched.
    pub target: BufferId,
    /// The window that had focus when the search started.
    pub target_window: WindowId,
}

/// A mouse event waiting to be routed through the renderer's mouse
/// handler grid.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingMouse {
    pub event: quill_input::MouseEvent,
}

type Continuation = Box<dyn FnOnce(&mut AppContext, Box<dyn Any + Send>)>;

/// State shared by everything that runs on the event loop.
pub struct AppContext {
    buffers: SlotMap<BufferId, Buffer>,
    clipboard: Rc<dyn Clipboard>,

    pub(crate) windows: Vec<WindowInfo>,
    pub(crate) visible_windows: Vec<WindowId>,
    pub(crate) window_heights: HashMap<WindowId, usize>,
    focused: Option<WindowId>,
    focus_stack: Vec<WindowId>,

    search_link: Option<SearchLink>,
    search_states: HashMap<BufferId, SearchState>,
    pub(crate) search_preview: Option<quill_edit::Document>,

    exit: ExitHandle,
    pub(crate) is_running: bool,
    pub(crate) is_done: bool,
    invalidated: bool,
    pub(crate) render_counter: u64,

    pub(crate) key_arg: Option<String>,
    /// Whether typed newlines are inserted as-is, without auto-indent.
    pub paste_mode: bool,
    /// Set while the next key should be inserted literally.
    pub quoted_insert: bool,
    pub(crate) recording: Option<Vec<KeyPress>>,
    pub(crate) last_macro: Option<Vec<KeyPress>>,
    pub(crate) feed_front: Vec<KeyPress>,

    pub(crate) global_bindings: Vec<SharedKeyBindings>,

    pub(crate) requests: VecDeque<Request>,
    soon: VecDeque<Box<dyn FnOnce(&mut AppContext)>>,
    pre_run: Vec<Box<dyn FnOnce(&mut AppContext)>>,
    pub(crate) pending_mouse: Vec<PendingMouse>,

    pub(crate) size: Size,
    pub(crate) height_is_known: bool,
    pub(crate) rows_above_layout: Option<usize>,
    pub(crate) cpr_row: Option<usize>,
    pub(crate) bell: bool,

    errors: Vec<String>,
    cancelled: Arc<AtomicBool>,
    pub(crate) filter_memo: RefCell<HashMap<usize, bool>>,

    loop_handle: LoopHandle,
    workers: WorkerPool,
    continuations: HashMap<u64, Continuation>,
    next_token: u64,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("buffers", &self.buffers.len())
            .field("windows", &self.windows.len())
            .field("focused", &self.focused)
            .field("search_link", &self.search_link)
            .field("is_done", &self.is_done)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub(crate) fn new(loop_handle: LoopHandle) -> Self {
        Self {
            buffers: SlotMap::with_key(),
            clipboard: Rc::new(InMemoryClipboard::new()),
            windows: Vec::new(),
            visible_windows: Vec::new(),
            window_heights: HashMap::new(),
            focused: None,
            focus_stack: Vec::new(),
            search_link: None,
            search_states: HashMap::new(),
            search_preview: None,
            exit: ExitHandle::default(),
            is_running: false,
            is_done: false,
            invalidated: true,
            render_counter: 0,
            key_arg: None,
            paste_mode: false,
            quoted_insert: false,
            recording: None,
            last_macro: None,
            feed_front: Vec::new(),
            global_bindings: Vec::new(),
            requests: VecDeque::new(),
            soon: VecDeque::new(),
            pre_run: Vec::new(),
            pending_mouse: Vec::new(),
            size: Size::new(24, 80),
            height_is_known: false,
            rows_above_layout: None,
            cpr_row: None,
            bell: false,
            errors: Vec::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            filter_memo: RefCell::new(HashMap::new()),
            loop_handle,
            workers: WorkerPool::default(),
            continuations: HashMap::new(),
            next_token: 1,
        }
    }

    // Buffers

    /// Takes ownership of a buffer and returns its handle.
    pub fn add_buffer(&mut self, buffer: Buffer) -> BufferId {
        self.buffers.insert(buffer)
    }

    /// Removes a buffer.
    pub fn remove_buffer(&mut self, id: BufferId) -> Option<Buffer> {
        self.search_states.remove(&id);
        self.buffers.remove(id)
    }

    /// A buffer by handle.
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }

    /// A buffer by handle, mutably.
    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(id)
    }

    /// Finds a buffer by name.
    pub fn buffer_by_name(&self, name: &str) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|(_, b)| b.name() == name)
            .map(|(id, _)| id)
    }

    pub(crate) fn buffers_mut(&mut self) -> impl Iterator<Item = (BufferId, &mut Buffer)> {
        self.buffers.iter_mut()
    }

    pub(crate) fn buffer_ids(&self) -> Vec<BufferId> {
        self.buffers.keys().collect()
    }

    /// The handle of the buffer shown in the focused window.
    pub fn current_buffer_id(&self) -> Option<BufferId> {
        self.focused
            .and_then(|id| self.window_info(id))
            .and_then(|w| w.buffer)
    }

    /// The buffer shown in the focused window.
    pub fn current_buffer(&self) -> Option<&Buffer> {
        self.current_buffer_id().and_then(|id| self.buffers.get(id))
    }

    /// The buffer shown in the focused window, mutably.
    pub fn current_buffer_mut(&mut self) -> Option<&mut Buffer> {
        let id = self.current_buffer_id()?;
        self.buffers.get_mut(id)
    }

    // Clipboard

    /// The clipboard used by kill and yank commands.
    pub fn clipboard(&self) -> Rc<dyn Clipboard> {
        Rc::clone(&self.clipboard)
    }

    /// Replaces the clipboard.
    pub fn set_clipboard(&mut self, clipboard: Rc<dyn Clipboard>) {
        self.clipboard = clipboard;
    }

    // Focus

    pub(crate) fn window_info(&self, id: WindowId) -> Option<&WindowInfo> {
        self.windows.iter().find(|w| w.id == id)
    }

    /// All windows of the layout, in tree order.
    pub fn windows(&self) -> &[WindowInfo] {
        &self.windows
    }

    /// The focused window.
    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused
    }

    /// Rows the window occupied in the last frame.
    pub fn window_height(&self, id: WindowId) -> Option<usize> {
        self.window_heights.get(&id).copied()
    }

    /// Returns true if the window was drawn in the last frame.
    pub fn is_visible(&self, id: WindowId) -> bool {
        self.visible_windows.contains(&id)
    }

    /// Focuses a window. The previously focused window is remembered for
    /// [`AppContext::focus_last`].
    pub fn focus_window(&mut self, id: WindowId) {
        if self.focused == Some(id) {
            return;
        }
        if let Some(previous) = self.focused {
            self.focus_stack.push(previous);
        }
        tracing::trace!(window = %id, "focus");
        self.focused = Some(id);
        self.invalidate();
    }

    /// Focuses the first window showing `buffer`.
    pub fn focus_buffer(&mut self, buffer: BufferId) -> HandlerResult {
        let id = self
            .windows
            .iter()
            .find(|w| w.buffer == Some(buffer))
            .map(|w| w.id)
            .ok_or_else(|| AppError::Layout("no window shows this buffer".into()))?;
        self.focus_window(id);
        Ok(())
    }

    /// Returns true if the focused window shows `buffer`.
    pub fn has_focus(&self, buffer: BufferId) -> bool {
        self.current_buffer_id() == Some(buffer)
    }

    /// Goes back to the previously focused window that still exists.
    pub fn focus_last(&mut self) {
        while let Some(id) = self.focus_stack.pop() {
            if self.window_info(id).is_some() {
                self.focused = Some(id);
                self.invalidate();
                return;
            }
        }
    }

    fn focus_cycle(&mut self, forward: bool) {
        let scope = self
            .focused
            .and_then(|id| self.window_info(id))
            .map_or(0, |w| w.modal_scope);
        let candidates: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|w| {
                w.focusable && w.modal_scope == scope && self.visible_windows.contains(&w.id)
            })
            .map(|w| w.id)
            .collect();
        if candidates.is_empty() {
            return;
        }
        let index = self
            .focused
            .and_then(|id| candidates.iter().position(|c| *c == id));
        let next = match (index, forward) {
            (Some(i), true) => (i + 1) % candidates.len(),
            (Some(i), false) => (i + candidates.len() - 1) % candidates.len(),
            (None, true) => 0,
            (None, false) => candidates.len() - 1,
        };
        self.focus_window(candidates[next]);
    }

    /// Whether a window may receive mouse events: while a modal container
    /// holds the focus, windows outside it are inert.
    pub(crate) fn in_focused_modal_scope(&self, id: WindowId) -> bool {
        let focused_scope = self
            .focused
            .and_then(|f| self.window_info(f))
            .map_or(0, |w| w.modal_scope);
        focused_scope == 0 || self.window_info(id).is_some_and(|w| w.modal_scope == focused_scope)
    }

    /// Focuses the next visible focusable window.
    pub fn focus_next(&mut self) {
        self.focus_cycle(true);
    }

    /// Focuses the previous visible focusable window.
    pub fn focus_previous(&mut self) {
        self.focus_cycle(false);
    }

    /// Replaces the window registry. Focus moves to the first focusable
    /// window if the focused one disappeared.
    pub(crate) fn set_windows(&mut self, windows: Vec<WindowInfo>) {
        self.windows = windows;
        self.focus_stack.retain(|id| self.windows.iter().any(|w| w.id == *id));
        let focused_exists = self
            .focused
            .is_some_and(|id| self.windows.iter().any(|w| w.id == id));
        if !focused_exists {
            self.focused = self
                .windows
                .iter()
                .find(|w| w.focusable)
                .or_else(|| self.windows.first())
                .map(|w| w.id);
        }
    }

    /// After a frame: if the focused window was not drawn, return to the
    /// last focused window that was.
    pub(crate) fn after_frame(&mut self, visible: Vec<WindowId>) {
        self.visible_windows = visible;
        let Some(focused) = self.focused else {
            return;
        };
        if self.visible_windows.contains(&focused) || self.search_link.is_some() {
            return;
        }
        if let Some(pos) = self
            .focus_stack
            .iter()
            .rposition(|id| self.visible_windows.contains(id))
        {
            let id = self.focus_stack[pos];
            self.focus_stack.truncate(pos);
            self.focused = Some(id);
            self.invalidate();
        }
    }

    // Search

    /// The search in progress, if any.
    pub fn search_link(&self) -> Option<SearchLink> {
        self.search_link
    }

    /// Returns true while an incremental search is in progress.
    pub fn is_searching(&self) -> bool {
        self.search_link.is_some()
    }

    /// The last search state of a buffer.
    pub fn search_state(&self, buffer: BufferId) -> SearchState {
        self.search_states
            .get(&buffer)
            .cloned()
            .unwrap_or_else(|| SearchState::new("", SearchDirection::Forward))
    }

    /// The search state as the user currently sees it: while searching, the
    /// text of the search field.
    pub fn current_search_state(&self) -> Option<(BufferId, SearchState)> {
        let link = self.search_link?;
        let mut state = self.search_state(link.target);
        state.text = self.buffers.get(link.search_buffer)?.text().to_string();
        Some((link.target, state))
    }

    /// Starts an incremental search in the focused window, if it has a
    /// linked search field.
    pub fn start_search(&mut self, direction: SearchDirection) {
        let Some(window) = self.focused.and_then(|id| self.window_info(id)).cloned() else {
            return;
        };
        let (Some(target), Some(search_buffer)) = (window.buffer, window.search_buffer) else {
            return;
        };
        let mut state = self.search_state(target);
        state.direction = direction;
        state.ignore_case = window.search_ignore_case;
        self.search_states.insert(target, state);
        if self.focus_buffer(search_buffer).is_err() {
            tracing::debug!("search field is not part of the layout");
            return;
        }
        self.search_link = Some(SearchLink {
            search_buffer,
            target,
            target_window: window.id,
        });
        self.search_preview = None;
    }

    /// Ends the search without moving the target and focuses it again.
    pub fn stop_search(&mut self) {
        let Some(link) = self.search_link.take() else {
            return;
        };
        self.search_preview = None;
        if self.window_info(link.target_window).is_some() {
            self.focus_window(link.target_window);
        }
        if let Some(buffer) = self.buffers.get_mut(link.search_buffer) {
            buffer.reset(None, false);
        }
    }

    /// Moves the target to the next match in `direction`. Changing the
    /// direction only flips it; the next press moves.
    pub fn incremental_search(&mut self, direction: SearchDirection, count: usize) {
        let Some(link) = self.search_link else {
            return;
        };
        let text = self
            .buffers
            .get(link.search_buffer)
            .map(|b| b.text().to_string())
            .unwrap_or_default();
        let mut state = self.search_state(link.target);
        let direction_changed = state.direction != direction;
        state.text = text;
        state.direction = direction;
        self.search_states.insert(link.target, state.clone());
        if !direction_changed {
            if let Some(target) = self.buffers.get_mut(link.target) {
                target.apply_search(&state, false, count);
            }
        }
        self.search_preview = None;
    }

    /// Applies the search to the target, remembers the query in the search
    /// field's history and ends the search.
    pub fn accept_search(&mut self) {
        let Some(link) = self.search_link else {
            return;
        };
        let mut state = self.search_state(link.target);
        if let Some(search) = self.buffers.get_mut(link.search_buffer) {
            if !search.text().is_empty() {
                state.text = search.text().to_string();
            }
            search.append_to_history();
        }
        if let Some(target) = self.buffers.get_mut(link.target) {
            target.apply_search(&state, true, 1);
        }
        self.search_states.insert(link.target, state);
        self.stop_search();
    }

    /// Recomputes the preview document shown by the target while searching.
    pub(crate) fn update_search_preview(&mut self) {
        let Some((target, state)) = self.current_search_state() else {
            self.search_preview = None;
            return;
        };
        if state.text.is_empty() {
            self.search_preview = None;
            return;
        }
        self.search_preview = self
            .buffers
            .get_mut(target)
            .map(|b| b.document_for_search(&state));
    }

    // Exit

    /// A handle that ends the run; see [`ExitHandle`].
    pub fn exit_handle(&self) -> ExitHandle {
        self.exit.clone()
    }

    /// Ends the run with `()`.
    pub fn exit(&mut self) {
        self.exit.exit();
    }

    /// Ends the run with a value.
    pub fn exit_with<T: Any>(&mut self, value: T) {
        self.exit.exit_with(value);
    }

    /// Ends the run with an error, styling the final frame with `style`.
    pub fn exit_error(&mut self, error: AppError, style: &str) {
        self.exit.exit_error(error, style);
    }

    /// Returns true once the run is ending.
    pub fn is_exiting(&self) -> bool {
        self.exit.is_set()
    }

    /// Returns true while the final frame is drawn.
    pub fn is_done(&self) -> bool {
        self.is_done
    }

    /// Returns true while the application runs.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    // Redraw

    /// Requests a redraw.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub(crate) fn take_invalidated(&mut self) -> bool {
        std::mem::take(&mut self.invalidated)
    }

    /// Rings the terminal bell after the current key batch.
    pub fn bell(&mut self) {
        self.bell = true;
    }

    /// Terminal size as of the last frame.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns true when the rows available below the prompt are known.
    pub fn height_is_known(&self) -> bool {
        self.height_is_known
    }

    /// The repeat argument being typed, e.g. `"-"` or `"12"`.
    pub fn key_arg(&self) -> Option<&str> {
        self.key_arg.as_deref()
    }

    /// Clears memoised filter results; called before each key and frame.
    pub(crate) fn begin_tick(&self) {
        self.filter_memo.borrow_mut().clear();
    }

    // Work scheduling

    /// Runs `f` after the current key batch, on the loop.
    pub fn call_soon(&mut self, f: impl FnOnce(&mut AppContext) + 'static) {
        self.soon.push_back(Box::new(f));
    }

    pub(crate) fn take_soon(&mut self) -> Option<Box<dyn FnOnce(&mut AppContext)>> {
        self.soon.pop_front()
    }

    /// Runs `f` when the next run starts, before the first frame.
    pub fn add_pre_run(&mut self, f: impl FnOnce(&mut AppContext) + 'static) {
        self.pre_run.push(Box::new(f));
    }

    pub(crate) fn take_pre_run(&mut self) -> Vec<Box<dyn FnOnce(&mut AppContext)>> {
        std::mem::take(&mut self.pre_run)
    }

    /// A handle other threads can use to post work to this loop.
    pub fn loop_handle(&self) -> LoopHandle {
        self.loop_handle.clone()
    }

    /// Flag set when the application shuts down; background work should
    /// check it and stop early.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub(crate) fn cancel_background(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Drops work posted during the run that ended: deferred calls,
    /// terminal requests, executor continuations and buffer jobs.
    pub(crate) fn discard_pending(&mut self) {
        let discarded = self.soon.len() + self.requests.len() + self.continuations.len();
        if discarded > 0 {
            tracing::debug!(discarded, "discarding work left over from the run");
        }
        self.soon.clear();
        self.requests.clear();
        self.continuations.clear();
        for (_, buffer) in self.buffers_mut() {
            drop(buffer.take_jobs());
        }
    }

    pub(crate) fn reset_cancellation(&mut self) {
        if self.cancelled.load(Ordering::Acquire) {
            self.cancelled = Arc::new(AtomicBool::new(false));
        }
    }

    pub(crate) fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    /// Runs `work` on a worker thread and `then` with its result on the
    /// loop.
    pub fn run_in_executor<T: Send + 'static>(
        &mut self,
        work: impl FnOnce() -> T + Send + 'static,
        then: impl FnOnce(&mut AppContext, T) + 'static,
    ) {
        let token = self.next_token;
        self.next_token += 1;
        self.continuations.insert(
            token,
            Box::new(move |ctx, value| match value.downcast::<T>() {
                Ok(value) => then(ctx, *value),
                Err(_) => tracing::error!("executor result has an unexpected type"),
            }),
        );
        let handle = self.loop_handle.clone();
        let cancelled = self.cancellation_flag();
        let job: quill_edit::worker::Job = Box::new(move || {
            let value = work();
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            handle.send(LoopEvent::Continue {
                token,
                value: Box::new(value),
            });
        });
        if !self.workers.submit_or_spawn(job) {
            self.continuations.remove(&token);
        }
    }

    pub(crate) fn resume(&mut self, token: u64, value: Box<dyn Any + Send>) {
        if let Some(then) = self.continuations.remove(&token) {
            then(self, value);
        }
    }

    /// Runs `func` with the application hidden and the terminal in cooked
    /// mode. With `render_done` the current frame is kept on screen and the
    /// application redraws below whatever `func` printed.
    pub fn run_in_terminal(
        &mut self,
        render_done: bool,
        func: impl FnOnce(&mut InTerminal<'_>) -> HandlerResult + 'static,
    ) {
        self.requests.push_back(Request::InTerminal {
            func: Box::new(func),
            render_done,
        });
    }

    /// Runs a shell command with the application hidden, optionally waiting
    /// for Enter before coming back.
    pub fn run_system_command(
        &mut self,
        command: impl Into<String>,
        wait_for_enter: bool,
        display_before_text: impl Into<String>,
    ) {
        self.requests.push_back(Request::SystemCommand {
            command: command.into(),
            wait_for_enter,
            display_before_text: display_before_text.into(),
        });
    }

    /// Stops the process group with `SIGTSTP`; the application redraws when
    /// it is resumed.
    pub fn suspend_to_background(&mut self) {
        self.requests.push_back(Request::Suspend);
    }

    /// Clears the terminal and redraws.
    pub fn clear_screen(&mut self) {
        self.requests.push_back(Request::ClearScreen);
    }

    // Errors

    /// Records a handler failure.
    pub(crate) fn report_error(&mut self, error: &AppError) {
        self.errors.push(error.to_string());
    }

    /// Handler failures recorded during this run.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn begin_run(&mut self) {
        self.exit.reset();
        self.is_done = false;
        self.is_running = true;
        self.errors.clear();
        self.key_arg = None;
        self.quoted_insert = false;
        self.search_link = None;
        self.search_preview = None;
        self.reset_cancellation();
        self.invalidate();
    }

    pub(crate) fn exit_style(&self) -> String {
        self.exit.style()
    }

    pub(crate) fn take_exit(&self) -> Option<ExitRequest> {
        self.exit.take()
    }

    /// Bindings in effect for the focused window, lowest priority first:
    /// the application-wide registries, then the enclosing containers from
    /// the outside in, then the focused control.
    pub(crate) fn active_bindings(&self) -> Vec<Rc<crate::key_binding::Binding>> {
        let mut all: Vec<_> = self
            .global_bindings
            .iter()
            .flat_map(|kb| kb.bindings())
            .collect();
        if let Some(window) = self.focused.and_then(|id| self.window_info(id)) {
            for kb in window.key_bindings.iter().rev() {
                all.extend(kb.bindings());
            }
        }
        all
    }

    /// Feeds keys back to the key processor ahead of pending input.
    pub fn feed_keys_first(&mut self, keys: impl IntoIterator<Item = KeyPress>) {
        self.feed_front.extend(keys);
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> AppContext {
    let (sender, _receiver) = flume::unbounded();
    AppContext::new(LoopHandle::new(sender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn window(buffer: Option<BufferId>, focusable: bool) -> WindowInfo {
        WindowInfo {
            id: WindowId::new(),
            buffer,
            search_buffer: None,
            search_ignore_case: false,
            focusable,
            key_bindings: Vec::new(),
            modal_scope: 0,
        }
    }

    #[test]
    fn test_focus_defaults_to_first_focusable() {
        let mut ctx = test_context();
        let a = ctx.add_buffer(Buffer::new());
        let windows = vec![window(None, false), window(Some(a), true)];
        let second = windows[1].id;
        ctx.set_windows(windows);
        assert_eq!(ctx.focused_window(), Some(second));
        assert_eq!(ctx.current_buffer_id(), Some(a));
    }

    #[test]
    fn test_focus_next_cycles_visible_windows() {
        let mut ctx = test_context();
        let windows = vec![window(None, true), window(None, true), window(None, true)];
        let ids: Vec<WindowId> = windows.iter().map(|w| w.id).collect();
        ctx.set_windows(windows);
        ctx.visible_windows = vec![ids[0], ids[2]];
        ctx.focus_next();
        assert_eq!(ctx.focused_window(), Some(ids[2]));
        ctx.focus_next();
        assert_eq!(ctx.focused_window(), Some(ids[0]));
        ctx.focus_previous();
        assert_eq!(ctx.focused_window(), Some(ids[2]));
        ctx.focus_last();
        assert_eq!(ctx.focused_window(), Some(ids[0]));
    }

    #[test]
    fn test_search_round_trip() {
        let mut ctx = test_context();
        let target = ctx.add_buffer(
            Buffer::new().with_document(quill_edit::Document::new("one two one")),
        );
        let search = ctx.add_buffer(Buffer::new());
        let mut main = window(Some(target), true);
        main.search_buffer = Some(search);
        let main_id = main.id;
        ctx.set_windows(vec![main, window(Some(search), true)]);
        ctx.focus_window(main_id);
        ctx.buffer_mut(target).unwrap().set_cursor_position(0);

        ctx.start_search(SearchDirection::Forward);
        assert!(ctx.is_searching());
        assert_eq!(ctx.current_buffer_id(), Some(search));
        ctx.buffer_mut(search).unwrap().insert_text("one");
        ctx.update_search_preview();
        assert_eq!(ctx.search_preview.as_ref().map(|d| d.cursor_position()), Some(0));

        ctx.incremental_search(SearchDirection::Forward, 1);
        assert_eq!(ctx.buffer(target).unwrap().cursor_position(), 8);

        ctx.accept_search();
        assert!(!ctx.is_searching());
        assert_eq!(ctx.focused_window(), Some(main_id));
        assert_eq!(ctx.buffer(search).unwrap().text(), "");
        assert_eq!(ctx.search_state(target).text, "one");
    }

    #[test]
    fn test_exit_handle_keeps_first_value() {
        let ctx = test_context();
        let handle = ctx.exit_handle();
        handle.exit_with(1_u8);
        handle.exit_with(2_u8);
        match ctx.take_exit() {
            Some(ExitRequest::Value(v)) => assert_eq!(v.downcast_ref::<u8>(), Some(&1)),
            _ => panic!("expected a value"),
        }
    }
}
