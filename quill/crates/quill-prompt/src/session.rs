//! A reusable line editor: the prompt, an input buffer and the toolbars
//! and menus around it.
//!
//! [`PromptSession`] builds one [`Application`] and keeps it between calls,
//! so history, the kill ring and the terminal state survive from one
//! [`PromptSession::prompt`] to the next.
//!
//! ```no_run
//! use quill_prompt::{PromptOptions, PromptSession};
//!
//! # fn main() -> quill_app::Result<()> {
//! let mut session = PromptSession::new(PromptOptions::new("> ").with_rprompt("[main]"))?;
//! let line = session.prompt()?;
//! # Ok(())
//! # }
//! ```

use quill_app::filters::{self, Filter};
use quill_app::key_binding::auto_suggest::load_auto_suggest_bindings;
use quill_app::key_binding::completion::load_readline_completion_bindings;
use quill_app::key_binding::open_in_editor::load_open_in_editor_bindings;
use quill_app::key_binding::{
    Binding, ConditionalKeyBindings, KeyBindings, MergedKeyBindings, SharedKeyBindings,
};
use quill_app::layout::processors::{
    AfterInput, AppendAutoSuggestion, ConditionalProcessor, PasswordProcessor, SharedProcessor, ShowArg,
};
use quill_app::layout::{
    BufferControl, CompletionsMenu, ConditionalContainer, ConditionalMargin, ContainerRef, Dimension,
    DimensionSource, Float, FloatContainer, FormattedTextControl, HSplit, MultiColumnCompletionsMenu, NumberedMargin,
    SharedLexer, SharedMargin, TextSource, Window, WindowAlign,
};
use quill_app::widgets::{ArgToolbar, SearchToolbar, SystemToolbar, ValidationToolbar};
use quill_app::{AppContext, AppError, Application, ApplicationOptions, BufferId, Layout, Result};
use quill_core::{ColorDepth, Fragment, FormattedText, Style};
use quill_edit::{Buffer, Document, HistoryStore, SharedAutoSuggest, SharedCompleter, SharedValidator};
use quill_input::{Input, Key};
use quill_output::Output;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Name of the buffer holding the input.
pub const DEFAULT_BUFFER: &str = "default";

/// Rows kept free below the input for the completion menu.
const DEFAULT_MENU_SPACE: usize = 8;

/// Text for the lines after the first: `(prompt width, line number, wrap
/// count)`.
pub type Continuation = Rc<dyn Fn(usize, usize, usize) -> FormattedText>;

/// How completions are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompleteStyle {
    /// A single-column menu next to the cursor, with a meta column.
    #[default]
    Column,
    /// A grid of candidates; Left and Right move between columns.
    MultiColumn,
    /// No menu. Tab prints the candidates above the prompt, like readline.
    ReadlineLike,
}

// === Options ===

/// Configuration for a [`PromptSession`].
///
/// Every field has a `with_` builder. The session reads the text fields
/// (message, right prompt, toolbar, placeholder) on each frame, so they can
/// also be changed between prompts through the session's setters.
#[derive(Clone)]
pub struct PromptOptions {
    /// Text in front of the input. Lines before its last newline are shown
    /// above the input.
    pub message: TextSource,
    /// Enter inserts a newline; Escape Enter accepts.
    pub multiline: bool,
    /// Show `*` instead of the typed characters.
    pub password: bool,
    /// Source of completions.
    pub completer: Option<SharedCompleter>,
    /// Ask for completions after every change, not only on Tab.
    pub complete_while_typing: bool,
    /// How completions are shown.
    pub complete_style: CompleteStyle,
    /// Checks the input before it is accepted.
    pub validator: Option<SharedValidator>,
    /// Validate after every change instead of only on accept.
    pub validate_while_typing: bool,
    /// Source of the grey suggestion after the cursor.
    pub auto_suggest: Option<SharedAutoSuggest>,
    /// Previously accepted inputs.
    pub history: HistoryStore,
    /// Up and Down only visit history entries starting with the text
    /// before the cursor.
    pub enable_history_search: bool,
    /// Highlights the input.
    pub lexer: Option<SharedLexer>,
    /// Text of the toolbar at the bottom.
    pub bottom_toolbar: Option<TextSource>,
    /// Text aligned to the right of the first line.
    pub rprompt: Option<TextSource>,
    /// Shown greyed out while the input is empty. Never returned.
    pub placeholder: Option<FormattedText>,
    /// Text in front of the lines after the first. Defaults to spaces as
    /// wide as the prompt in multiline mode.
    pub prompt_continuation: Option<Continuation>,
    /// Wrap long lines instead of scrolling horizontally.
    pub wrap_lines: bool,
    /// Show line numbers left of the input.
    pub show_line_numbers: bool,
    /// Enable mouse reporting.
    pub mouse_support: bool,
    /// Incremental search ignores case.
    pub search_ignore_case: bool,
    /// Text the input starts with.
    pub default: String,
    /// Accept the default text without waiting for input.
    pub accept_default: bool,
    /// Bindings added after the built-in ones, so they win.
    pub key_bindings: Option<SharedKeyBindings>,
    /// Style rules layered over the default UI style.
    pub style: Option<Style>,
    /// Color depth override.
    pub color_depth: Option<ColorDepth>,
    /// Suffix of the temporary file edited with Ctrl-X Ctrl-E.
    pub tempfile_suffix: String,
    /// Bind Ctrl-X Ctrl-E to editing the input in `$EDITOR`.
    pub enable_open_in_editor: bool,
    /// Bind Ctrl-Z to suspending the process.
    pub enable_suspend: bool,
    /// Bind Escape `!` to the shell command toolbar.
    pub enable_system_prompt: bool,
    /// Remove the prompt from the screen once accepted.
    pub erase_when_done: bool,
    /// Rows reserved below the input for the completion menu.
    pub reserve_space_for_menu: usize,
}

impl fmt::Debug for PromptOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptOptions")
            .field("message", &self.message)
            .field("multiline", &self.multiline)
            .field("password", &self.password)
            .field("complete_style", &self.complete_style)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            message: TextSource::default(),
            multiline: false,
            password: false,
            completer: None,
            complete_while_typing: true,
            complete_style: CompleteStyle::Column,
            validator: None,
            validate_while_typing: false,
            auto_suggest: None,
            history: HistoryStore::default(),
            enable_history_search: false,
            lexer: None,
            bottom_toolbar: None,
            rprompt: None,
            placeholder: None,
            prompt_continuation: None,
            wrap_lines: true,
            show_line_numbers: false,
            mouse_support: false,
            search_ignore_case: false,
            default: String::new(),
            accept_default: false,
            key_bindings: None,
            style: None,
            color_depth: None,
            tempfile_suffix: ".txt".to_string(),
            enable_open_in_editor: false,
            enable_suspend: false,
            enable_system_prompt: false,
            erase_when_done: false,
            reserve_space_for_menu: DEFAULT_MENU_SPACE,
        }
    }
}

impl PromptOptions {
    /// Options with the given prompt message.
    pub fn new(message: impl Into<TextSource>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Sets multiline editing.
    pub fn with_multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    /// Hides the typed characters.
    pub fn with_password(mut self, password: bool) -> Self {
        self.password = password;
        self
    }

    /// Sets the completer.
    pub fn with_completer(mut self, completer: SharedCompleter) -> Self {
        self.completer = Some(completer);
        self
    }

    /// Completes while typing, not only on Tab.
    pub fn with_complete_while_typing(mut self, enable: bool) -> Self {
        self.complete_while_typing = enable;
        self
    }

    /// Sets how completions are shown.
    pub fn with_complete_style(mut self, style: CompleteStyle) -> Self {
        self.complete_style = style;
        self
    }

    /// Sets the validator.
    pub fn with_validator(mut self, validator: SharedValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Validates after every change.
    pub fn with_validate_while_typing(mut self, enable: bool) -> Self {
        self.validate_while_typing = enable;
        self
    }

    /// Sets the suggestion source.
    pub fn with_auto_suggest(mut self, auto_suggest: SharedAutoSuggest) -> Self {
        self.auto_suggest = Some(auto_suggest);
        self
    }

    /// Sets the history.
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = history;
        self
    }

    /// Filters history navigation by the text before the cursor.
    pub fn with_history_search(mut self, enable: bool) -> Self {
        self.enable_history_search = enable;
        self
    }

    /// Sets the lexer.
    pub fn with_lexer(mut self, lexer: SharedLexer) -> Self {
        self.lexer = Some(lexer);
        self
    }

    /// Sets the bottom toolbar text.
    pub fn with_bottom_toolbar(mut self, text: impl Into<TextSource>) -> Self {
        self.bottom_toolbar = Some(text.into());
        self
    }

    /// Sets the right prompt.
    pub fn with_rprompt(mut self, text: impl Into<TextSource>) -> Self {
        self.rprompt = Some(text.into());
        self
    }

    /// Sets the placeholder.
    pub fn with_placeholder(mut self, text: impl Into<FormattedText>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    /// Uses the same text in front of every continuation line.
    pub fn with_prompt_continuation(mut self, text: impl Into<FormattedText>) -> Self {
        let text = text.into();
        self.prompt_continuation = Some(Rc::new(move |_, _, _| text.clone()));
        self
    }

    /// Computes the continuation text from `(prompt width, line number,
    /// wrap count)`.
    pub fn with_prompt_continuation_fn(mut self, f: impl Fn(usize, usize, usize) -> FormattedText + 'static) -> Self {
        self.prompt_continuation = Some(Rc::new(f));
        self
    }

    /// Wraps long lines.
    pub fn with_wrap_lines(mut self, wrap: bool) -> Self {
        self.wrap_lines = wrap;
        self
    }

    /// Shows line numbers.
    pub fn with_line_numbers(mut self, show: bool) -> Self {
        self.show_line_numbers = show;
        self
    }

    /// Enables mouse reporting.
    pub fn with_mouse_support(mut self, enable: bool) -> Self {
        self.mouse_support = enable;
        self
    }

    /// Makes incremental search ignore case.
    pub fn with_search_ignore_case(mut self, ignore: bool) -> Self {
        self.search_ignore_case = ignore;
        self
    }

    /// Sets the initial text.
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default = text.into();
        self
    }

    /// Accepts the initial text right away.
    pub fn with_accept_default(mut self, accept: bool) -> Self {
        self.accept_default = accept;
        self
    }

    /// Adds bindings on top of the built-in ones.
    pub fn with_key_bindings(mut self, key_bindings: SharedKeyBindings) -> Self {
        self.key_bindings = Some(key_bindings);
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

    /// Sets the suffix of the file opened in the editor, e.g. `.py`.
    pub fn with_tempfile_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.tempfile_suffix = suffix.into();
        self
    }

    /// Enables Ctrl-X Ctrl-E.
    pub fn with_open_in_editor(mut self, enable: bool) -> Self {
        self.enable_open_in_editor = enable;
        self
    }

    /// Enables Ctrl-Z.
    pub fn with_suspend(mut self, enable: bool) -> Self {
        self.enable_suspend = enable;
        self
    }

    /// Enables the Escape `!` shell toolbar.
    pub fn with_system_prompt(mut self, enable: bool) -> Self {
        self.enable_system_prompt = enable;
        self
    }

    /// Erases the prompt once accepted.
    pub fn with_erase_when_done(mut self, erase: bool) -> Self {
        self.erase_when_done = erase;
        self
    }

    /// Rows reserved for the completion menu; 0 reserves nothing.
    pub fn with_reserve_space_for_menu(mut self, rows: usize) -> Self {
        self.reserve_space_for_menu = rows;
        self
    }
}

// === Session state read by the layout ===

/// Values the layout and filters read on every frame.
struct Settings {
    message: RefCell<TextSource>,
    rprompt: RefCell<Option<TextSource>>,
    bottom_toolbar: RefCell<Option<TextSource>>,
    placeholder: RefCell<Option<FormattedText>>,
    continuation: RefCell<Option<Continuation>>,
    default: RefCell<String>,
    multiline: Cell<bool>,
    password: Cell<bool>,
    complete_style: Cell<CompleteStyle>,
    accept_default: Cell<bool>,
}

impl Settings {
    fn from_options(options: &PromptOptions) -> Self {
        Self {
            message: RefCell::new(options.message.clone()),
            rprompt: RefCell::new(options.rprompt.clone()),
            bottom_toolbar: RefCell::new(options.bottom_toolbar.clone()),
            placeholder: RefCell::new(options.placeholder.clone()),
            continuation: RefCell::new(options.prompt_continuation.clone()),
            default: RefCell::new(options.default.clone()),
            multiline: Cell::new(options.multiline),
            password: Cell::new(options.password),
            complete_style: Cell::new(options.complete_style),
            accept_default: Cell::new(options.accept_default),
        }
    }

    fn message(&self, ctx: &AppContext) -> FormattedText {
        self.message.borrow().get(ctx)
    }

    fn flag(self: &Rc<Self>, get: impl Fn(&Settings) -> bool + 'static) -> Filter {
        let settings = Rc::clone(self);
        Filter::new(move |_| get(&settings))
    }
}

/// Splits a prompt at its last newline: the lines shown above the input,
/// and the text on the input's first line.
fn split_message(message: &FormattedText) -> (FormattedText, FormattedText) {
    let mut above = FormattedText::new();
    let mut first_line = FormattedText::new();
    let last_newline = message
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.text.rfind('\n').map(|pos| (i, pos)))
        .last();
    let Some((index, pos)) = last_newline else {
        return (above, message.clone());
    };
    for (i, fragment) in message.iter().enumerate() {
        if i < index {
            above.push(fragment.clone());
        } else if i == index {
            above.push(Fragment::new(fragment.style.clone(), &fragment.text[..pos]));
            let rest = &fragment.text[pos + 1..];
            if !rest.is_empty() {
                first_line.push(Fragment::new(fragment.style.clone(), rest));
            }
        } else {
            first_line.push(fragment.clone());
        }
    }
    (above, first_line)
}

fn continuation_text(settings: &Settings, prompt_width: usize, lineno: usize, wrap_count: usize) -> FormattedText {
    let text = match settings.continuation.borrow().as_ref() {
        Some(f) => f(prompt_width, lineno, wrap_count),
        None if settings.multiline.get() => FormattedText::from(" ".repeat(prompt_width)),
        None => FormattedText::new(),
    };
    text.with_style_prefix("class:prompt-continuation")
}

// === Session ===

/// A line editor that can be asked for input repeatedly.
pub struct PromptSession {
    app: Application,
    buffer: BufferId,
    settings: Rc<Settings>,
}

impl fmt::Debug for PromptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptSession")
            .field("buffer", &self.buffer)
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

impl PromptSession {
    /// A session on the process's terminal.
    #[cfg(unix)]
    pub fn new(options: PromptOptions) -> Result<Self> {
        let input = quill_input::create_input()?;
        Ok(Self::with_io(options, input, quill_output::create_output()))
    }

    /// A session reading `input` and drawing to `output`.
    pub fn with_io(options: PromptOptions, input: Box<dyn Input>, output: Box<dyn Output>) -> Self {
        let app_options = ApplicationOptions::default()
            .with_mouse_support(options.mouse_support)
            .with_erase_when_done(options.erase_when_done)
            .with_color_depth(options.color_depth);
        let mut app = Application::new(app_options, input, output);
        if let Some(style) = &options.style {
            app.set_style(style);
        }
        let settings = Rc::new(Settings::from_options(&options));

        let buffer = create_buffer(&app, &options, &settings);
        let buffer = app.ctx_mut().add_buffer(buffer);
        let parts = build_layout(app.ctx_mut(), buffer, &options, &settings);

        app.set_layout(Layout::from_boxed(parts.root));
        for bindings in parts.global_bindings {
            app.add_key_bindings(bindings);
        }
        app.add_key_bindings(prompt_bindings(buffer, &options, &settings));
        if let Some(user) = &options.key_bindings {
            app.add_key_bindings(Rc::clone(user));
        }
        tracing::debug!(multiline = options.multiline, "prompt session created");

        Self { app, buffer, settings }
    }

    /// Reads a line. Ctrl-C gives [`AppError::KeyboardInterrupt`], Ctrl-D
    /// on empty input [`AppError::Eof`].
    pub fn prompt(&mut self) -> Result<String> {
        self.run()
    }

    /// Reads a line, starting from `default` instead of the configured
    /// default text.
    pub fn prompt_with_default(&mut self, default: &str) -> Result<String> {
        let previous = std::mem::replace(&mut *self.settings.default.borrow_mut(), default.to_string());
        let result = self.run();
        *self.settings.default.borrow_mut() = previous;
        result
    }

    /// Runs the session until a handler sets an exit value of type `T`.
    ///
    /// [`PromptSession::prompt`] runs for a `String`; custom bindings can
    /// exit with other types, see [`crate::ask::Confirm`].
    pub fn run<T: Any>(&mut self) -> Result<T> {
        let default = self.settings.default.borrow().clone();
        if let Some(b) = self.app.ctx_mut().buffer_mut(self.buffer) {
            let cursor = default.len();
            b.reset(Some(Document::with_cursor(default, cursor)), false);
        }
        let buffer = self.buffer;
        let accept = self.settings.accept_default.get();
        self.app.run_with(move |ctx| {
            if let Err(e) = ctx.focus_buffer(buffer) {
                tracing::debug!("prompt buffer not focusable: {e}");
            }
            if accept {
                if let Some(b) = ctx.buffer_mut(buffer) {
                    b.validate_and_handle();
                }
            }
        })
    }

    // === Changing the session between prompts ===

    /// Replaces the prompt message.
    pub fn set_message(&mut self, message: impl Into<TextSource>) {
        *self.settings.message.borrow_mut() = message.into();
    }

    /// Replaces the right prompt.
    pub fn set_rprompt(&mut self, text: Option<TextSource>) {
        *self.settings.rprompt.borrow_mut() = text;
    }

    /// Replaces the bottom toolbar.
    pub fn set_bottom_toolbar(&mut self, text: Option<TextSource>) {
        *self.settings.bottom_toolbar.borrow_mut() = text;
    }

    /// Replaces the placeholder.
    pub fn set_placeholder(&mut self, text: Option<FormattedText>) {
        *self.settings.placeholder.borrow_mut() = text;
    }

    /// Replaces the default text.
    pub fn set_default(&mut self, text: impl Into<String>) {
        *self.settings.default.borrow_mut() = text.into();
    }

    /// Switches password masking.
    pub fn set_password(&mut self, password: bool) {
        self.settings.password.set(password);
    }

    /// Switches multiline editing.
    pub fn set_multiline(&mut self, multiline: bool) {
        self.settings.multiline.set(multiline);
    }

    /// Changes how completions are shown.
    pub fn set_complete_style(&mut self, style: CompleteStyle) {
        self.settings.complete_style.set(style);
    }

    // === Access ===

    /// The input buffer.
    pub fn buffer(&self) -> Option<&Buffer> {
        self.app.ctx().buffer(self.buffer)
    }

    /// The input buffer's id.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    /// The history shared by all prompts of this session.
    pub fn history(&self) -> Option<&HistoryStore> {
        self.buffer().map(Buffer::history)
    }

    /// The underlying application.
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// The underlying application, mutably.
    pub fn app_mut(&mut self) -> &mut Application {
        &mut self.app
    }

    /// Prints formatted text between prompts.
    pub fn print_formatted_text(&mut self, text: impl Into<FormattedText>) {
        self.app.print_formatted_text(&text.into());
    }
}

fn create_buffer(app: &Application, options: &PromptOptions, settings: &Rc<Settings>) -> Buffer {
    let exit = app.ctx().exit_handle();
    let multiline = Rc::clone(settings);
    // Readline style and history search both use Tab/Up differently.
    let complete_while_typing = options.complete_while_typing
        && !options.enable_history_search
        && options.complete_style != CompleteStyle::ReadlineLike;
    Buffer::new()
        .with_name(DEFAULT_BUFFER)
        .with_history(options.history.clone())
        .with_shared_completer(options.completer.clone())
        .with_shared_validator(options.validator.clone())
        .with_auto_suggest(options.auto_suggest.clone())
        .with_complete_while_typing(complete_while_typing)
        .with_validate_while_typing(options.validate_while_typing)
        .with_history_search(options.enable_history_search)
        .with_tempfile_suffix(options.tempfile_suffix.clone())
        .with_multiline_condition(move || multiline.multiline.get())
        .with_accept_handler(move |b| {
            exit.exit_with(b.text().to_string());
            true
        })
}

// === Layout ===

struct LayoutParts {
    root: ContainerRef,
    global_bindings: Vec<SharedKeyBindings>,
}

fn build_layout(ctx: &mut AppContext, buffer: BufferId, options: &PromptOptions, settings: &Rc<Settings>) -> LayoutParts {
    let search_toolbar = SearchToolbar::new(ctx);
    let system_toolbar = SystemToolbar::new(ctx);
    let mut global_bindings = Vec::new();
    if options.enable_system_prompt {
        global_bindings.push(system_toolbar.global_key_bindings());
    }

    let not_done = !filters::is_done();
    let multiline = settings.flag(|s| s.multiline.get());
    let multi_column = settings.flag(|s| s.complete_style.get() == CompleteStyle::MultiColumn);
    let column = settings.flag(|s| s.complete_style.get() == CompleteStyle::Column);

    // Input window
    let placeholder_settings = Rc::clone(settings);
    let show_placeholder = Filter::new(move |ctx| {
        placeholder_settings.placeholder.borrow().is_some() && ctx.buffer(buffer).is_some_and(|b| b.text().is_empty())
    });
    let placeholder_text = Rc::clone(settings);
    let processors: Vec<SharedProcessor> = vec![
        Rc::new(ConditionalProcessor::new(
            AppendAutoSuggestion::default(),
            filters::has_focus(buffer) & not_done.clone(),
        )),
        Rc::new(ConditionalProcessor::new(
            PasswordProcessor::default(),
            settings.flag(|s| s.password.get()),
        )),
        Rc::new(ConditionalProcessor::new(ShowArg, !multiline.clone())),
        Rc::new(ConditionalProcessor::new(
            AfterInput::new(
                TextSource::dynamic(move |_| placeholder_text.placeholder.borrow().clone().unwrap_or_default()),
                "class:placeholder",
            ),
            show_placeholder,
        )),
    ];
    let mut control = BufferControl::new(buffer)
        .with_input_processors(processors)
        .with_search_buffer(search_toolbar.buffer_id())
        .with_search_ignore_case(options.search_ignore_case)
        .with_preview_search(true);
    if let Some(lexer) = &options.lexer {
        control = control.with_lexer(Rc::clone(lexer));
    }

    let prefix_settings = Rc::clone(settings);
    let menu_space = options.completer.is_some().then_some(options.reserve_space_for_menu);
    let margins: Vec<SharedMargin> = vec![Rc::new(ConditionalMargin::new(
        NumberedMargin::default(),
        options.show_line_numbers,
    ))];
    let input_window = Window::new(control)
        .with_left_margins(margins)
        .with_wrap_lines(options.wrap_lines)
        .with_height(DimensionSource::dynamic(move |ctx| match menu_space {
            Some(space) if space > 0 && !ctx.is_done() => Dimension::at_least(space.min(ctx.size().rows.saturating_sub(1))),
            _ => Dimension::default(),
        }))
        .with_line_prefix(move |ctx, lineno, wrap_count| {
            let (_, first_line) = split_message(&prefix_settings.message(ctx));
            if lineno == 0 && wrap_count == 0 {
                first_line.with_style_prefix("class:prompt")
            } else {
                continuation_text(&prefix_settings, first_line.width(), lineno, wrap_count)
            }
        });

    // Lines of the message above the input
    let above_settings = Rc::clone(settings);
    let has_above_settings = Rc::clone(settings);
    let above = ConditionalContainer::new(
        Box::new(
            Window::new(FormattedTextControl::new(TextSource::dynamic(move |ctx| {
                split_message(&above_settings.message(ctx)).0.with_style_prefix("class:prompt")
            })))
            .with_dont_extend_height(true),
        ),
        Filter::new(move |ctx| !split_message(&has_above_settings.message(ctx)).0.is_empty()),
    );

    // Right prompt
    let rprompt_settings = Rc::clone(settings);
    let rprompt = Window::new(FormattedTextControl::new(TextSource::dynamic(move |ctx| {
        rprompt_settings
            .rprompt
            .borrow()
            .as_ref()
            .map(|t| t.get(ctx))
            .unwrap_or_default()
    })))
    .with_align(WindowAlign::Right)
    .with_style("class:rprompt");

    let focused = filters::has_focus(buffer);
    let multi_column = MultiColumnCompletionsMenu::new(3, 30, true, focused.clone() & multi_column);
    global_bindings.push(multi_column.key_bindings());
    let main = FloatContainer::new(
        Box::new(HSplit::new(vec![Box::new(above), Box::new(input_window)])),
        vec![
            Float::new(Box::new(CompletionsMenu::new(
                Some(16),
                1,
                focused.clone() & column,
                true,
            )))
            .at_cursor()
            .with_transparent(true),
            Float::new(Box::new(multi_column))
                .at_cursor()
                .with_transparent(true),
            Float::new(Box::new(rprompt))
                .with_right(0)
                .with_top(0)
                .with_hide_when_covering_content(true),
        ],
    );

    // Toolbars
    let toolbar_settings = Rc::clone(settings);
    let has_toolbar = settings.flag(|s| s.bottom_toolbar.borrow().is_some());
    let bottom_toolbar = ConditionalContainer::new(
        Box::new(
            Window::new(
                FormattedTextControl::new(TextSource::dynamic(move |ctx| {
                    toolbar_settings
                        .bottom_toolbar
                        .borrow()
                        .as_ref()
                        .map(|t| t.get(ctx))
                        .unwrap_or_default()
                }))
                .with_style("class:bottom-toolbar.text"),
            )
            .with_style("class:bottom-toolbar")
            .with_dont_extend_height(true)
            .with_height(Dimension::at_least(1)),
        ),
        not_done.clone() & filters::renderer_height_is_known() & has_toolbar,
    );

    let children: Vec<ContainerRef> = vec![
        Box::new(main),
        Box::new(ConditionalContainer::new(Box::new(ValidationToolbar::new(false)), not_done.clone())),
        Box::new(ConditionalContainer::new(
            Box::new(system_toolbar),
            Filter::from(options.enable_system_prompt) & not_done.clone(),
        )),
        Box::new(ConditionalContainer::new(Box::new(ArgToolbar::default()), multiline)),
        Box::new(ConditionalContainer::new(Box::new(search_toolbar), not_done)),
        Box::new(bottom_toolbar),
    ];

    LayoutParts {
        root: Box::new(HSplit::new(children)),
        global_bindings,
    }
}

// === Key bindings ===

fn prompt_bindings(buffer: BufferId, options: &PromptOptions, settings: &Rc<Settings>) -> SharedKeyBindings {
    let focused = filters::has_focus(buffer);
    let mut kb = KeyBindings::new();

    kb.add_when(Key::Control('c'), focused.clone(), |event| {
        event.ctx.exit_error(AppError::KeyboardInterrupt, "class:aborting");
        Ok(())
    });

    let empty = Filter::new(move |ctx| ctx.buffer(buffer).is_some_and(|b| b.text().is_empty()));
    kb.add_when(Key::Control('d'), focused.clone() & empty, |event| {
        event.ctx.exit_error(AppError::Eof, "class:exiting");
        Ok(())
    });

    // Eager, so closing the menu does not wait for a Meta sequence.
    kb.add_binding(
        Binding::new(Key::Escape, |event| {
            event.with_buffer(Buffer::cancel_completion)
        })
        .with_filter(focused.clone() & filters::completion_is_selected())
        .eager(),
    );

    if options.enable_suspend {
        kb.add_when(Key::Control('z'), focused.clone(), |event| {
            event.ctx.suspend_to_background();
            Ok(())
        });
    }

    let mut registries: Vec<SharedKeyBindings> = vec![kb.shared()];
    let readline = settings.flag(|s| s.complete_style.get() == CompleteStyle::ReadlineLike);
    registries.push(Rc::new(ConditionalKeyBindings::new(
        load_readline_completion_bindings().shared(),
        focused.clone() & readline,
    )));
    if options.auto_suggest.is_some() {
        registries.push(Rc::new(ConditionalKeyBindings::new(
            load_auto_suggest_bindings().shared(),
            focused.clone(),
        )));
    }
    if options.enable_open_in_editor {
        registries.push(Rc::new(ConditionalKeyBindings::new(
            load_open_in_editor_bindings().shared(),
            focused,
        )));
    }
    Rc::new(MergedKeyBindings::new(registries))
}
