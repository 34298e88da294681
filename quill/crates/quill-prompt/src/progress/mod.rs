//! Progress bars drawn by an application on a background thread.
//!
//! - [`counter`]: [`Counter`] handles and the iterator adapter
//! - [`formatters`]: the columns of a progress line
//!
//! ```no_run
//! use quill_prompt::progress::{ProgressBar, ProgressOptions};
//!
//! # fn main() -> quill_app::Result<()> {
//! let bar = ProgressBar::start(ProgressOptions::default().with_title("Downloading"))?;
//! for _chunk in bar.iter(0..100, "file.tar", None) {
//!     // work
//! }
//! bar.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! The bar's application is created on its own thread, so nothing in it
//! needs to be `Send`; the main thread only talks to it through a
//! [`LoopHandle`].

pub mod counter;
pub mod formatters;

pub use counter::{Counter, CounterIter, CounterSnapshot};
pub use formatters::{default_formatters, Formatter, SharedFormatter};

use counter::CounterData;
use parking_lot::Mutex;
use quill_app::filters::{self, Filter};
use quill_app::layout::{
    ConditionalContainer, ContainerRef, Dimension, DimensionSource, FormattedTextControl, HSplit, TextSource,
    UIContent, UIControl, VSplit, Window,
};
use quill_app::{AppError, Application, ApplicationOptions, KeyBindings, Layout, LoopHandle, Result};
use quill_core::{ColorDepth, FormattedText, Style, WindowId};
use quill_input::{Input, Key};
use quill_output::Output;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the bar redraws on its own, for the clocks.
const REFRESH_INTERVAL: Duration = Duration::from_millis(300);

// === Shared state ===

/// State shared by the bar, its counters and the drawing thread.
pub(crate) struct BarState {
    pub(crate) counters: Mutex<Vec<Arc<Mutex<CounterData>>>>,
    pub(crate) interrupted: AtomicBool,
    title: Mutex<Option<FormattedText>>,
    bottom_toolbar: Mutex<Option<FormattedText>>,
    loop_handle: Mutex<Option<LoopHandle>>,
}

impl BarState {
    pub(crate) fn invalidate(&self) {
        if let Some(handle) = &*self.loop_handle.lock() {
            handle.invalidate();
        }
    }

    fn snapshots(&self) -> Vec<CounterSnapshot> {
        self.counters.lock().iter().map(|c| c.lock().snapshot()).collect()
    }

    fn exit_loop(&self) {
        if let Some(handle) = self.loop_handle.lock().take() {
            handle.call(|ctx| ctx.exit());
        }
    }
}

// === Options ===

/// Configuration for a [`ProgressBar`].
#[derive(Clone)]
pub struct ProgressOptions {
    /// Line above the counters.
    pub title: Option<FormattedText>,
    /// Line below the counters.
    pub bottom_toolbar: Option<FormattedText>,
    /// Columns of every progress line.
    pub formatters: Vec<SharedFormatter>,
    /// Style rules layered over the default UI style.
    pub style: Option<Style>,
    /// Color depth override.
    pub color_depth: Option<ColorDepth>,
    /// Send SIGINT to the process on Ctrl-C, as well as marking the bar
    /// interrupted. On by default.
    pub raise_sigint: bool,
}

impl fmt::Debug for ProgressOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressOptions")
            .field("title", &self.title)
            .field("formatters", &self.formatters.len())
            .field("raise_sigint", &self.raise_sigint)
            .finish_non_exhaustive()
    }
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            title: None,
            bottom_toolbar: None,
            formatters: default_formatters(),
            style: None,
            color_depth: None,
            raise_sigint: true,
        }
    }
}

impl ProgressOptions {
    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<FormattedText>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the bottom toolbar.
    pub fn with_bottom_toolbar(mut self, text: impl Into<FormattedText>) -> Self {
        self.bottom_toolbar = Some(text.into());
        self
    }

    /// Replaces the formatters.
    pub fn with_formatters(mut self, formatters: Vec<SharedFormatter>) -> Self {
        self.formatters = formatters;
        self
    }

    /// Sets style rules.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Overrides the color depth.
    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = Some(depth);
        self
    }

    /// Whether Ctrl-C also sends SIGINT. Turn it off when the caller
    /// polls [`ProgressBar::interrupted`] instead.
    pub fn with_raise_sigint(mut self, raise: bool) -> Self {
        self.raise_sigint = raise;
        self
    }
}

// === Drawing ===

/// One formatter column: a line per counter.
struct ProgressControl {
    formatter: SharedFormatter,
    state: Arc<BarState>,
}

impl UIControl for ProgressControl {
    fn create_content(&mut self, _ctx: &quill_app::AppContext, _window: WindowId, width: usize, _height: usize) -> UIContent {
        let lines = self
            .state
            .snapshots()
            .iter()
            .map(|counter| self.formatter.format(counter, width).into_fragments())
            .collect();
        UIContent::from_lines(lines).with_show_cursor(false)
    }
}

fn build_layout(state: &Arc<BarState>, formatters: &[SharedFormatter]) -> ContainerRef {
    let rows = {
        let state = Arc::clone(state);
        move || {
            let n = state.counters.lock().len();
            Dimension::preferred(n).with_max(n)
        }
    };
    let columns: Vec<ContainerRef> = formatters
        .iter()
        .map(|formatter| {
            let width_state = Arc::clone(state);
            let width_formatter = Arc::clone(formatter);
            let rows = rows.clone();
            let window = Window::new(ProgressControl {
                formatter: Arc::clone(formatter),
                state: Arc::clone(state),
            })
            .with_width(DimensionSource::dynamic(move |_| {
                width_formatter.width(&width_state.snapshots())
            }))
            .with_height(DimensionSource::dynamic(move |_| rows()));
            Box::new(window) as ContainerRef
        })
        .collect();

    let title_state = Arc::clone(state);
    let has_title_state = Arc::clone(state);
    let title = ConditionalContainer::new(
        Box::new(
            Window::new(FormattedTextControl::new(TextSource::dynamic(move |_| {
                title_state.title.lock().clone().unwrap_or_default()
            })))
            .with_height(1)
            .with_style("class:title"),
        ),
        Filter::new(move |_| has_title_state.title.lock().is_some()),
    );

    let toolbar_state = Arc::clone(state);
    let has_toolbar_state = Arc::clone(state);
    let toolbar = ConditionalContainer::new(
        Box::new(
            Window::new(FormattedTextControl::new(TextSource::dynamic(move |_| {
                toolbar_state.bottom_toolbar.lock().clone().unwrap_or_default()
            })))
            .with_height(1)
            .with_style("class:bottom-toolbar"),
        ),
        !filters::is_done()
            & filters::renderer_height_is_known()
            & Filter::new(move |_| has_toolbar_state.bottom_toolbar.lock().is_some()),
    );

    Box::new(
        HSplit::new(vec![Box::new(title), Box::new(VSplit::new(columns)), Box::new(toolbar)])
            .with_style("class:progressbar"),
    )
}

fn key_bindings(state: Arc<BarState>, raise_sigint: bool) -> KeyBindings {
    let mut kb = KeyBindings::new();
    kb.add(Key::Control('l'), |event| {
        event.ctx.clear_screen();
        Ok(())
    });
    kb.add(Key::Control('c'), move |event| {
        state.interrupted.store(true, Ordering::SeqCst);
        if raise_sigint {
            raise_interrupt();
        }
        event.ctx.exit();
        Ok(())
    });
    kb
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn raise_interrupt() {
    // SAFETY: kill(2) on our own pid with a valid signal number.
    let rc = unsafe { libc::kill(libc::getpid(), libc::SIGINT) };
    if rc != 0 {
        tracing::warn!("failed to raise SIGINT: {}", std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn raise_interrupt() {}

// === Progress bar ===

/// A set of counters drawn below the cursor until [`ProgressBar::finish`].
pub struct ProgressBar {
    state: Arc<BarState>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl fmt::Debug for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBar")
            .field("counters", &self.state.counters.lock().len())
            .field("interrupted", &self.interrupted())
            .finish_non_exhaustive()
    }
}

impl ProgressBar {
    /// Starts drawing on the terminal.
    #[cfg(unix)]
    pub fn start(options: ProgressOptions) -> Result<Self> {
        let input = quill_input::create_input()?;
        Self::with_io(options, input, quill_output::create_output())
    }

    /// Starts drawing to `output`, reading keys from `input`.
    pub fn with_io(options: ProgressOptions, input: Box<dyn Input>, output: Box<dyn Output>) -> Result<Self> {
        let state = Arc::new(BarState {
            counters: Mutex::new(Vec::new()),
            interrupted: AtomicBool::new(false),
            title: Mutex::new(options.title.clone()),
            bottom_toolbar: Mutex::new(options.bottom_toolbar.clone()),
            loop_handle: Mutex::new(None),
        });
        let (ready_tx, ready_rx) = flume::bounded(1);
        let thread_state = Arc::clone(&state);

        let thread = std::thread::Builder::new()
            .name("quill-progress".into())
            .spawn(move || {
                let app_options = ApplicationOptions::default()
                    .with_refresh_interval(Some(REFRESH_INTERVAL))
                    .with_color_depth(options.color_depth);
                let mut app = Application::new(app_options, input, output);
                if let Some(style) = &options.style {
                    app.set_style(style);
                }
                app.set_layout(Layout::from_boxed(build_layout(&thread_state, &options.formatters)));
                app.add_key_bindings(key_bindings(Arc::clone(&thread_state), options.raise_sigint).shared());
                *thread_state.loop_handle.lock() = Some(app.loop_handle());
                let _ = ready_tx.send(());
                let result = app.run::<()>();
                thread_state.loop_handle.lock().take();
                if let Err(e) = &result {
                    tracing::debug!("progress bar loop ended: {e}");
                }
                result
            })?;

        if ready_rx.recv().is_err() {
            // The thread died before its loop started.
            return match thread.join() {
                Ok(Err(e)) => Err(e),
                _ => Err(AppError::Handler("progress bar thread failed to start".into())),
            };
        }
        tracing::debug!("progress bar started");
        Ok(Self {
            state,
            thread: Some(thread),
        })
    }

    /// Adds a counter. `total` is the expected number of items, if known.
    pub fn counter(&self, label: impl Into<FormattedText>, total: Option<usize>) -> Counter {
        self.add_counter(label.into(), total, false)
    }

    /// Adds a counter that disappears once done.
    pub fn transient_counter(&self, label: impl Into<FormattedText>, total: Option<usize>) -> Counter {
        self.add_counter(label.into(), total, true)
    }

    fn add_counter(&self, label: FormattedText, total: Option<usize>, remove_when_done: bool) -> Counter {
        let data = Arc::new(Mutex::new(CounterData::new(label, total, remove_when_done)));
        self.state.counters.lock().push(Arc::clone(&data));
        self.state.invalidate();
        Counter::new(data, Arc::clone(&self.state))
    }

    /// Wraps `iterable` in a new counter. Without `total`, an exact size
    /// hint is used.
    pub fn iter<I: IntoIterator>(
        &self,
        iterable: I,
        label: impl Into<FormattedText>,
        total: Option<usize>,
    ) -> CounterIter<I::IntoIter> {
        let inner = iterable.into_iter();
        let total = total.or_else(|| match inner.size_hint() {
            (lo, Some(hi)) if lo == hi => Some(lo),
            _ => None,
        });
        CounterIter::new(inner, self.counter(label, total))
    }

    /// Replaces the title.
    pub fn set_title(&self, title: Option<FormattedText>) {
        *self.state.title.lock() = title;
        self.state.invalidate();
    }

    /// Replaces the bottom toolbar.
    pub fn set_bottom_toolbar(&self, text: Option<FormattedText>) {
        *self.state.bottom_toolbar.lock() = text;
        self.state.invalidate();
    }

    /// Whether Ctrl-C was pressed.
    pub fn interrupted(&self) -> bool {
        self.state.interrupted.load(Ordering::SeqCst)
    }

    /// Stops drawing and waits for the drawing thread. Returns
    /// [`AppError::KeyboardInterrupt`] if the user pressed Ctrl-C.
    pub fn finish(mut self) -> Result<()> {
        let result = self.stop();
        if self.interrupted() {
            return Err(AppError::KeyboardInterrupt);
        }
        result
    }

    fn stop(&mut self) -> Result<()> {
        self.state.exit_loop();
        match self.thread.take().map(JoinHandle::join) {
            None => Ok(()),
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(AppError::Handler("progress bar thread panicked".into())),
        }
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::debug!("progress bar stopped with error: {e}");
        }
    }
}
