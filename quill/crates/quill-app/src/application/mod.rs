//! Application event loop and lifecycle management.
//!
//! An [`Application`] owns the layout, the [`AppContext`], the renderer and
//! the input. [`Application::run`] puts the terminal in raw mode, then
//! loops on a single thread:
//!
//! 1. wait for the next posted event or timer deadline
//! 2. handle the event, then everything else already queued, in order
//! 3. fire expired timers (key flush, refresh, size polling)
//! 4. dispatch mouse events, deferred calls and terminal requests, start
//!    buffer jobs and draw a frame if something changed
//!
//! Other threads only talk to the loop by posting through a
//! [`LoopHandle`](crate::context::LoopHandle).

pub mod options;
pub mod system;
mod terminal;

pub use options::ApplicationOptions;

use crate::context::{AppContext, ExitRequest, LoopEvent, LoopHandle, PendingMouse, Request};
use crate::error::{AppError, Result};
use crate::key_binding::page_navigation::load_page_navigation_bindings;
use crate::key_binding::{load_key_bindings, KeyProcessor, SharedKeyBindings};
use crate::layout::{HSplit, Layout};
use crate::renderer::{print_formatted_text, Renderer};
use quill_core::color_depth::ColorDepth;
use quill_core::formatted_text::FormattedText;
use quill_core::geometry::{Point, Size};
use quill_core::style::{default_ui_style, Style};
use quill_input::{Input, MouseEvent};
use quill_output::{resolve_color_depth, Output};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long shutdown waits for background jobs to notice cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Application state for the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Not running.
    Idle,
    /// Inside [`Application::run`].
    Running,
    /// An exit value was set; the final frame is being drawn.
    Stopping,
}

/// Deadlines the loop wakes up for.
#[derive(Debug)]
struct Timers {
    last_render: Option<Instant>,
    redraw_pending: bool,
    last_key: Instant,
    next_refresh: Option<Instant>,
    next_size_poll: Instant,
    last_size: Size,
}

impl Timers {
    fn new(now: Instant, size: Size) -> Self {
        Self {
            last_render: None,
            redraw_pending: true,
            last_key: now,
            next_refresh: None,
            next_size_poll: now,
            last_size: size,
        }
    }
}

/// A terminal application: a layout, the state it edits and the loop that
/// drives both.
///
/// ```no_run
/// use quill_app::layout::{BufferControl, Layout, Window};
/// use quill_app::{Application, ApplicationOptions};
/// use quill_edit::Buffer;
///
/// # fn main() -> quill_app::Result<()> {
/// let mut app = Application::with_terminal(ApplicationOptions::default())?;
/// let buffer = app.ctx_mut().add_buffer(Buffer::new());
/// app.set_layout(Layout::new(Window::new(BufferControl::new(buffer))));
/// app.run::<()>()?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    ctx: AppContext,
    layout: Layout,
    style: Style,
    renderer: Renderer,
    input: Box<dyn Input>,
    options: ApplicationOptions,
    processor: KeyProcessor,
    events: flume::Receiver<LoopEvent>,
    state: AppState,
    color_depth: ColorDepth,
    timers: Timers,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("layout", &self.layout)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Creates an application reading `input` and drawing to `output`.
    ///
    /// The layout starts empty; add buffers through
    /// [`Application::ctx_mut`] and then call [`Application::set_layout`].
    pub fn new(options: ApplicationOptions, input: Box<dyn Input>, output: Box<dyn Output>) -> Self {
        let (sender, events) = flume::unbounded();
        let mut ctx = AppContext::new(LoopHandle::new(sender));
        ctx.global_bindings = vec![
            load_key_bindings(),
            Rc::new(load_page_navigation_bindings()) as SharedKeyBindings,
        ];
        ctx.paste_mode = options.paste_mode;
        let renderer = Renderer::new(output, options.full_screen)
            .with_mouse_support(options.mouse_support)
            .with_cursor_shape(options.cursor_shape);
        let size = renderer.output().get_size();
        let color_depth = resolve_color_depth(options.color_depth, renderer.output());
        Self {
            ctx,
            layout: Layout::new(HSplit::new(Vec::new())),
            style: default_ui_style().clone(),
            renderer,
            input,
            options,
            processor: KeyProcessor::new(),
            events,
            state: AppState::Idle,
            color_depth,
            timers: Timers::new(Instant::now(), size),
        }
    }

    /// Creates an application on the process's terminal.
    #[cfg(unix)]
    pub fn with_terminal(options: ApplicationOptions) -> Result<Self> {
        let input = quill_input::create_input()?;
        Ok(Self::new(options, input, quill_output::create_output()))
    }

    // === Accessors ===

    /// Shared state: buffers, focus, exit.
    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }

    /// Shared state, mutably.
    pub fn ctx_mut(&mut self) -> &mut AppContext {
        &mut self.ctx
    }

    /// The layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The layout, mutably.
    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    /// Replaces the layout. Focus moves to its first focusable window.
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        match self.layout.collect_windows() {
            Ok(windows) => self.ctx.set_windows(windows),
            Err(e) => tracing::debug!("layout not usable yet: {e}"),
        }
    }

    /// Sets the style; rules are layered over the default UI style.
    pub fn set_style(&mut self, style: &Style) {
        self.style = Style::merged([default_ui_style(), style]);
    }

    /// The effective style.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Adds application-wide key bindings. Bindings added later win.
    pub fn add_key_bindings(&mut self, key_bindings: SharedKeyBindings) {
        self.ctx.global_bindings.push(key_bindings);
    }

    /// The options the application was created with.
    pub fn options(&self) -> &ApplicationOptions {
        &self.options
    }

    /// The renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Color depth used for the current run.
    pub fn color_depth(&self) -> ColorDepth {
        self.color_depth
    }

    /// Returns the current application state.
    pub fn state(&self) -> AppState {
        self.state
    }

    /// A `Send` handle for posting work to the loop.
    pub fn loop_handle(&self) -> LoopHandle {
        self.ctx.loop_handle()
    }

    /// Prints formatted text with the application's style while no run is
    /// in progress.
    pub fn print_formatted_text(&mut self, text: &FormattedText) {
        if self.state != AppState::Idle {
            tracing::warn!("print_formatted_text called during a run; use run_in_terminal");
            return;
        }
        let depth = resolve_color_depth(self.options.color_depth, self.renderer.output());
        print_formatted_text(self.renderer.output_mut(), text, &self.style, depth);
    }

    // === Running ===

    /// Runs until a handler sets an exit value, and returns it.
    ///
    /// Exit errors such as [`AppError::KeyboardInterrupt`] are returned as
    /// `Err`. A value of another type than `T` gives
    /// [`AppError::UnexpectedResult`].
    pub fn run<T: Any>(&mut self) -> Result<T> {
        self.run_with(|_| {})
    }

    /// Like [`Application::run`], calling `pre_run` before the first frame.
    pub fn run_with<T: Any>(&mut self, pre_run: impl FnOnce(&mut AppContext)) -> Result<T> {
        if self.state != AppState::Idle || self.ctx.is_running() {
            return Err(AppError::AlreadyRunning);
        }
        let windows = self.layout.collect_windows()?;
        self.ctx.set_windows(windows);
        self.reset();
        self.ctx.begin_run();
        for f in self.ctx.take_pre_run() {
            f(&mut self.ctx);
        }
        pre_run(&mut self.ctx);

        let raw_mode = self.input.raw_mode()?;
        self.state = AppState::Running;
        tracing::debug!(full_screen = self.options.full_screen, "application started");

        let result = self.event_loop();

        // Always teardown, even on error
        self.state = AppState::Stopping;
        self.teardown();
        drop(raw_mode);
        self.state = AppState::Idle;

        result?;
        match self.ctx.take_exit() {
            Some(ExitRequest::Value(value)) => value
                .downcast::<T>()
                .map(|v| *v)
                .map_err(|_| AppError::UnexpectedResult),
            Some(ExitRequest::Error(e)) => Err(e),
            None => Err(AppError::NotRunning),
        }
    }

    fn reset(&mut self) {
        self.renderer.reset(true);
        self.processor.reset();
        self.layout.reset();
        self.ctx.paste_mode = self.options.paste_mode;
        self.color_depth = resolve_color_depth(self.options.color_depth, self.renderer.output());

        let now = Instant::now();
        self.timers = Timers::new(now, self.renderer.output().get_size());
        self.timers.next_refresh = self.options.refresh_interval.map(|i| now + i);
        self.timers.next_size_poll = now + self.options.terminal_size_polling_interval;
    }

    fn attach_input(&mut self) -> Result<()> {
        let handle = self.ctx.loop_handle();
        self.input.attach(Arc::new(move || {
            handle.send(LoopEvent::InputReady);
        }))?;
        Ok(())
    }

    fn event_loop(&mut self) -> Result<()> {
        self.attach_input()?;
        let typeahead = quill_input::typeahead::take(&self.input.typeahead_hash());
        if !typeahead.is_empty() {
            self.processor.feed_multiple(typeahead);
            self.processor.process_keys(&mut self.ctx);
        }
        self.load_histories();
        self.renderer.request_absolute_cursor_position();
        self.after_batch(Instant::now());

        while !self.ctx.is_exiting() {
            let first = match self.next_deadline() {
                Some(deadline) => match self.events.recv_deadline(deadline) {
                    Ok(event) => Some(event),
                    Err(flume::RecvTimeoutError::Timeout) => None,
                    Err(flume::RecvTimeoutError::Disconnected) => return Err(AppError::NotRunning),
                },
                None => Some(self.events.recv().map_err(|_| AppError::NotRunning)?),
            };
            if let Some(event) = first {
                self.handle_event(event);
            }
            while !self.ctx.is_exiting() {
                match self.events.try_recv() {
                    Ok(event) => self.handle_event(event),
                    Err(_) => break,
                }
            }
            let now = Instant::now();
            self.fire_timers(now);
            self.after_batch(now);
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.input.detach();
        if self.options.erase_when_done {
            self.renderer.erase(true);
        } else {
            self.redraw(true);
        }
        self.renderer.reset(true);

        let unprocessed = self.processor.empty_queue();
        quill_input::typeahead::store(&self.input.typeahead_hash(), unprocessed);
        self.ctx.cancel_background();
        if !self.ctx.workers().wait_idle(SHUTDOWN_GRACE) {
            tracing::debug!("background jobs still running after the shutdown grace period");
        }
        let stale = self.events.try_iter().count();
        if stale > 0 {
            tracing::debug!(stale, "discarding events posted during the run");
        }
        self.ctx.discard_pending();
        self.ctx.is_running = false;
        tracing::debug!("application stopped");
    }

    // === Events ===

    fn handle_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::InputReady => self.read_input(),
            LoopEvent::Job { buffer, outcome } => match self.ctx.buffer_mut(buffer) {
                Some(b) => {
                    if b.apply_outcome(outcome) {
                        self.ctx.invalidate();
                    }
                }
                None => tracing::debug!("discarding job result for a removed buffer"),
            },
            LoopEvent::HistoryLoaded(_) | LoopEvent::Invalidate => self.ctx.invalidate(),
            LoopEvent::Call(f) => f(&mut self.ctx),
            LoopEvent::Continue { token, value } => self.ctx.resume(token, value),
        }
    }

    fn read_input(&mut self) {
        let keys = self.input.read_keys();
        if !keys.is_empty() {
            tracing::trace!(count = keys.len(), "keys received");
            self.timers.last_key = Instant::now();
            self.processor.feed_multiple(keys);
            self.processor.process_keys(&mut self.ctx);
        }
        if self.input.closed() && !self.ctx.is_exiting() {
            self.processor.feed_multiple(self.input.flush_keys());
            self.processor.flush(&mut self.ctx);
            if !self.ctx.is_exiting() {
                tracing::debug!("input closed");
                self.ctx.exit_error(AppError::Eof, "");
            }
        }
    }

    fn key_flush_deadline(&self) -> Option<Instant> {
        (self.processor.is_waiting() || self.input.has_pending())
            .then(|| self.timers.last_key + self.options.key_press_timeout)
    }

    fn redraw_deadline(&self) -> Option<Instant> {
        if !self.timers.redraw_pending {
            return None;
        }
        Some(
            self.timers
                .last_render
                .map_or_else(Instant::now, |t| t + self.options.min_redraw_interval),
        )
    }

    fn next_deadline(&self) -> Option<Instant> {
        [
            self.redraw_deadline(),
            self.key_flush_deadline(),
            self.timers.next_refresh,
            Some(self.timers.next_size_poll),
            self.renderer.cpr_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn fire_timers(&mut self, now: Instant) {
        if self.key_flush_deadline().is_some_and(|d| now >= d) {
            self.processor.feed_multiple(self.input.flush_keys());
            self.processor.flush(&mut self.ctx);
            self.timers.last_key = now;
        }

        if let Some(next) = self.timers.next_refresh.filter(|n| now >= *n) {
            self.ctx.invalidate();
            self.timers.next_refresh = self.options.refresh_interval.map(|i| next.max(now) + i);
        }

        if now >= self.timers.next_size_poll {
            self.timers.next_size_poll = now + self.options.terminal_size_polling_interval;
            let size = self.renderer.output().get_size();
            if size != self.timers.last_size {
                self.timers.last_size = size;
                self.on_resize();
            }
        }

        if self.renderer.check_cpr_timeout(now) {
            self.ctx.invalidate();
        }
    }

    fn on_resize(&mut self) {
        tracing::debug!(rows = self.timers.last_size.rows, columns = self.timers.last_size.columns, "terminal resized");
        self.renderer.erase(false);
        self.renderer.request_absolute_cursor_position();
        self.ctx.invalidate();
    }

    /// Everything that follows a batch of events.
    fn after_batch(&mut self, now: Instant) {
        if let Some(row) = self.ctx.cpr_row.take() {
            self.renderer.report_absolute_cursor_row(row);
            self.ctx.invalidate();
        }
        self.dispatch_mouse();
        while let Some(f) = self.ctx.take_soon() {
            f(&mut self.ctx);
        }
        self.process_requests();
        self.dispatch_jobs();

        if std::mem::take(&mut self.ctx.bell) {
            let output = self.renderer.output_mut();
            output.bell();
            if let Err(e) = output.flush() {
                tracing::warn!("failed to flush output: {e}");
            }
        }

        if self.ctx.is_exiting() {
            return;
        }
        if self.ctx.take_invalidated() {
            self.timers.redraw_pending = true;
        }
        let redraw_due = self.timers.redraw_pending
            && self
                .timers
                .last_render
                .map_or(true, |t| now >= t + self.options.min_redraw_interval);
        if redraw_due {
            self.redraw(false);
        }
    }

    fn redraw(&mut self, is_done: bool) {
        self.ctx.is_done = is_done;
        self.renderer
            .render(&mut self.ctx, &mut self.layout, &self.style, self.color_depth, is_done);
        self.timers.last_render = Some(Instant::now());
        self.timers.redraw_pending = false;
        // Drawing can move the focus, which asks for another frame.
        if self.ctx.take_invalidated() {
            self.timers.redraw_pending = true;
        }
    }

    /// Routes mouse events to the handler drawn under them.
    fn dispatch_mouse(&mut self) {
        let pending = std::mem::take(&mut self.ctx.pending_mouse);
        for PendingMouse { event } in pending {
            let Some(rows_above) = self.ctx.rows_above_layout else {
                tracing::debug!("dropping mouse event: layout position unknown");
                continue;
            };
            let Some(y) = event.position.y.checked_sub(rows_above) else {
                continue;
            };
            let x = event.position.x;
            if let Some(handler) = self.renderer.mouse_handler_at(x, y) {
                let local = MouseEvent {
                    position: Point::new(x, y),
                    ..event
                };
                handler(&mut self.ctx, local);
                self.ctx.invalidate();
            }
        }
    }

    fn process_requests(&mut self) {
        while let Some(request) = self.ctx.requests.pop_front() {
            match request {
                Request::InTerminal { func, render_done } => self.run_in_terminal(render_done, func),
                Request::SystemCommand {
                    command,
                    wait_for_enter,
                    display_before_text,
                } => self.run_system_command(command, wait_for_enter, display_before_text),
                Request::Suspend => self.suspend_to_background(),
                Request::ClearScreen => {
                    self.renderer.clear();
                    self.ctx.invalidate();
                }
            }
        }
    }

    /// Starts the completion, suggestion and validation work buffers asked
    /// for. Background jobs post their outcome back; the others are applied
    /// right away.
    fn dispatch_jobs(&mut self) {
        // Applying an outcome can request more work, e.g. a suggestion
        // after completions arrive.
        for _ in 0..4 {
            let mut inline = Vec::new();
            let mut background = Vec::new();
            let mut bell = false;
            for (id, buffer) in self.ctx.buffers_mut() {
                bell |= buffer.take_bell();
                for job in buffer.take_jobs() {
                    if job.runs_in_background() {
                        background.push((id, job));
                    } else {
                        inline.push((id, job));
                    }
                }
            }
            self.ctx.bell |= bell;

            for (buffer, job) in background {
                let handle = self.ctx.loop_handle();
                let cancelled = self.ctx.cancellation_flag();
                let work: quill_edit::worker::Job = Box::new(move || {
                    if cancelled.load(Ordering::Acquire) {
                        return;
                    }
                    // Completers publish partial results as they go.
                    job.run_streaming(|outcome| {
                        !cancelled.load(Ordering::Acquire) && handle.send(LoopEvent::Job { buffer, outcome })
                    });
                });
                if !self.ctx.workers().submit_or_spawn(work) {
                    tracing::debug!(?buffer, "could not start background job; dropping it");
                }
            }

            if inline.is_empty() {
                break;
            }
            for (id, job) in inline {
                let outcome = job.run();
                if self.ctx.buffer_mut(id).is_some_and(|b| b.apply_outcome(outcome)) {
                    self.ctx.invalidate();
                }
            }
        }
    }

    fn load_histories(&mut self) {
        for id in self.ctx.buffer_ids() {
            let handle = self.ctx.loop_handle();
            if let Some(buffer) = self.ctx.buffer(id) {
                if buffer.history().loads_in_background() && !buffer.history().is_loaded() {
                    buffer.load_history(move |count| {
                        tracing::debug!(count, "history loaded");
                        handle.send(LoopEvent::HistoryLoaded(id));
                    });
                }
            }
        }
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        // Unwinding out of `run` skips the teardown.
        if self.state != AppState::Idle {
            self.renderer.reset(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_binding::KeyBindings;
    use crate::layout::{BufferControl, FormattedTextControl, Window};
    use pretty_assertions::assert_eq;
    use quill_edit::Buffer;
    use quill_input::{Key, PipeInput};
    use quill_output::{MemoryWriter, Vt100Output};

    fn app(input: &PipeInput, writer: &MemoryWriter) -> Application {
        let output = Vt100Output::new(writer.clone(), || Size::new(10, 40))
            .with_default_color_depth(ColorDepth::Depth8Bit);
        Application::new(
            ApplicationOptions::default().with_min_redraw_interval(std::time::Duration::ZERO),
            Box::new(input.clone()),
            Box::new(output),
        )
    }

    fn exit_on_enter() -> SharedKeyBindings {
        let mut kb = KeyBindings::new();
        kb.add(Key::Enter, |event| {
            let text = event.current_buffer().map(|b| b.text().to_string()).unwrap_or_default();
            event.ctx.exit_with(text);
            Ok(())
        });
        kb.shared()
    }

    #[test]
    fn test_run_returns_exit_value() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        let buffer = app.ctx_mut().add_buffer(Buffer::new());
        app.set_layout(Layout::new(Window::new(BufferControl::new(buffer))));
        app.add_key_bindings(exit_on_enter());

        input.send_text("hi\r");
        let result: String = app.run().unwrap();
        assert_eq!(result, "hi");
        assert_eq!(app.state(), AppState::Idle);
        assert!(writer.contents().contains("hi"));
    }

    #[test]
    fn test_closed_input_ends_with_eof() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        app.set_layout(Layout::new(Window::new(FormattedTextControl::new("x"))));
        input.close();
        assert!(matches!(app.run::<()>(), Err(AppError::Eof)));
    }

    #[test]
    fn test_wrong_exit_type() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        let buffer = app.ctx_mut().add_buffer(Buffer::new());
        app.set_layout(Layout::new(Window::new(BufferControl::new(buffer))));
        app.add_key_bindings(exit_on_enter());
        input.send_text("\r");
        assert!(matches!(app.run::<i32>(), Err(AppError::UnexpectedResult)));
    }

    #[test]
    fn test_empty_layout_is_rejected() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        assert!(matches!(app.run::<()>(), Err(AppError::Layout(_))));
    }

    #[test]
    fn test_posted_calls_run_on_the_loop() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        app.set_layout(Layout::new(Window::new(FormattedTextControl::new("x"))));

        let handle = app.loop_handle();
        let worker = std::thread::spawn(move || {
            handle.call(|ctx| ctx.exit_with(7_u32));
        });
        let value: u32 = app.run().unwrap();
        worker.join().unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_postings_do_not_leak_into_next_run() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        app.set_layout(Layout::new(Window::new(FormattedTextControl::new("x"))));
        let mut kb = KeyBindings::new();
        kb.add(Key::Char('x'), |event| {
            event.ctx.loop_handle().call(|ctx| ctx.exit_with(99_u32));
            event.ctx.exit_with(1_u32);
            Ok(())
        });
        kb.add(Key::Char('y'), |event| {
            event.ctx.exit_with(2_u32);
            Ok(())
        });
        app.add_key_bindings(kb.shared());

        input.send_text("x");
        let first: u32 = app.run().unwrap();
        assert_eq!(first, 1);

        input.send_text("y");
        let second: u32 = app.run().unwrap();
        assert_eq!(second, 2);
    }

    #[test]
    fn test_unprocessed_keys_become_typeahead() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        let buffer = app.ctx_mut().add_buffer(Buffer::new());
        app.set_layout(Layout::new(Window::new(BufferControl::new(buffer))));
        app.add_key_bindings(exit_on_enter());

        input.send_text("a\rb\r");
        let first: String = app.run().unwrap();
        assert_eq!(first, "a");

        app.ctx_mut().buffer_mut(buffer).unwrap().reset(None, false);
        let second: String = app.run().unwrap();
        assert_eq!(second, "b");
    }

    #[test]
    fn test_run_in_terminal_prints_above_the_application() {
        let input = PipeInput::new();
        let writer = MemoryWriter::new();
        let mut app = app(&input, &writer);
        app.set_layout(Layout::new(Window::new(FormattedTextControl::new("app"))));
        let mut kb = KeyBindings::new();
        kb.add(Key::Char('p'), |event| {
            event.ctx.run_in_terminal(false, |term| {
                term.print_formatted_text(&"printed\n".into());
                Ok(())
            });
            Ok(())
        });
        kb.add(Key::Char('q'), |event| {
            event.ctx.exit();
            Ok(())
        });
        app.add_key_bindings(kb.shared());

        input.send_text("pq");
        app.run::<()>().unwrap();
        let written = writer.contents();
        let printed = written.find("printed").unwrap();
        assert!(written[printed..].contains("app"));
    }
}
