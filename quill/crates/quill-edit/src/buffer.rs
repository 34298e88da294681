//! The mutable editing state behind an input field.
//!
//! A [`Buffer`] owns the current [`Document`], undo/redo stacks, the
//! working copy of the history, completion state, validation state and the
//! auto-suggestion. It lives on the UI thread.
//!
//! Completion, validation and auto-suggestion are requested by editing
//! operations but not run inline. The owner collects them with
//! [`Buffer::take_jobs`], runs each [`BufferJob`] (on a worker thread if it
//! [`runs_in_background`](BufferJob::runs_in_background)) and hands the
//! [`JobOutcome`] back with [`Buffer::apply_outcome`]. Outcomes computed for
//! an older state of the buffer are discarded.

use crate::auto_suggest::{AutoSuggest, SharedAutoSuggest, Suggestion};
use crate::clipboard::ClipboardData;
use crate::completion::{
    completion_does_nothing, get_common_complete_suffix, CompleteEvent, Completer, Completion,
    CompletionState, SharedCompleter,
};
use crate::document::{char_len, char_slice, offset_position, Document, FindOptions};
use crate::editor;
use crate::error::{EditorError, ValidationError};
use crate::history::HistoryStore;
use crate::search::{SearchDirection, SearchState};
use crate::selection::{SelectionState, SelectionType};
use crate::signal::Signal;
use crate::validation::{SharedValidator, Validator};
use bitflags::bitflags;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Successive inserts closer together than this share one undo entry.
pub const DEFAULT_UNDO_COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// Upper bound on collected completions.
pub const DEFAULT_MAX_COMPLETIONS: usize = 10_000;

/// How often a background completion job publishes what it found so far.
pub const COMPLETION_CHUNK_INTERVAL: Duration = Duration::from_millis(50);

static QUOTED_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\s+|".*?"|'.*?')"#).expect("Invalid quoted words regex"));

/// A condition evaluated each time it is needed.
pub type Condition = Rc<dyn Fn() -> bool>;

/// Called on accept. Returns true to keep the text in the buffer.
pub type AcceptHandler = Rc<dyn Fn(&mut Buffer) -> bool>;

/// Result of the last validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationState {
    /// The text passed.
    Valid,
    /// The text failed; see [`Buffer::validation_error`].
    Invalid,
    /// The text changed since the last validation.
    #[default]
    Unknown,
}

/// How a requested completion should be applied once it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionOptions {
    /// Select the first candidate.
    pub select_first: bool,
    /// Select the last candidate.
    pub select_last: bool,
    /// Insert the part all candidates share.
    pub insert_common_part: bool,
    /// What triggered the request.
    pub event: CompleteEvent,
}

impl CompletionOptions {
    /// Options for an explicit request (Tab).
    pub fn requested() -> Self {
        Self {
            event: CompleteEvent::requested(),
            ..Self::default()
        }
    }

    /// Options for completion while typing.
    pub fn while_typing() -> Self {
        Self {
            event: CompleteEvent::text_inserted(),
            ..Self::default()
        }
    }

    /// Select the first candidate on arrival.
    pub fn select_first(mut self) -> Self {
        self.select_first = true;
        self
    }

    /// Select the last candidate on arrival.
    pub fn select_last(mut self) -> Self {
        self.select_last = true;
        self
    }

    /// Insert the common part on arrival.
    pub fn insert_common_part(mut self) -> Self {
        self.insert_common_part = true;
        self
    }
}

/// Work requested by a buffer. Jobs are `Send` and carry a snapshot of
/// everything they need.
pub enum BufferJob {
    /// Collect completions.
    Complete {
        /// The completer.
        completer: SharedCompleter,
        /// Snapshot of the document.
        document: Document,
        /// How to apply the result.
        options: CompletionOptions,
        /// Maximum number of candidates.
        max: usize,
        /// Buffer generation at request time.
        generation: u64,
    },
    /// Compute an auto-suggestion.
    Suggest {
        /// The suggester.
        auto_suggest: SharedAutoSuggest,
        /// History to search.
        history: HistoryStore,
        /// Snapshot of the document.
        document: Document,
        /// Buffer generation at request time.
        generation: u64,
    },
    /// Validate the text.
    Validate {
        /// The validator.
        validator: SharedValidator,
        /// Snapshot of the document.
        document: Document,
        /// Buffer generation at request time.
        generation: u64,
    },
}

impl fmt::Debug for BufferJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, generation) = match self {
            Self::Complete { generation, .. } => ("complete", generation),
            Self::Suggest { generation, .. } => ("suggest", generation),
            Self::Validate { generation, .. } => ("validate", generation),
        };
        f.debug_struct("BufferJob")
            .field("kind", &kind)
            .field("generation", generation)
            .finish()
    }
}

impl BufferJob {
    /// Whether the job should run on a worker thread.
    pub fn runs_in_background(&self) -> bool {
        match self {
            Self::Complete { completer, .. } => completer.runs_in_background(),
            Self::Suggest { auto_suggest, .. } => auto_suggest.runs_in_background(),
            Self::Validate { validator, .. } => validator.runs_in_background(),
        }
    }

    /// Runs the job.
    pub fn run(self) -> JobOutcome {
        match self {
            Self::Complete {
                completer,
                document,
                options,
                max,
                generation,
            } => {
                let completions = completer
                    .get_completions(&document, &options.event)
                    .take(max)
                    .collect();
                JobOutcome::Completions {
                    generation,
                    completions,
                    options,
                    done: true,
                }
            }
            Self::Suggest {
                auto_suggest,
                history,
                document,
                generation,
            } => JobOutcome::Suggestion {
                generation,
                suggestion: auto_suggest.get_suggestion(&history, &document),
            },
            Self::Validate {
                validator,
                document,
                generation,
            } => JobOutcome::Validation {
                generation,
                result: validator.validate(&document),
            },
        }
    }
}

impl BufferJob {
    /// Runs the job, handing outcomes to `publish` as they become
    /// available. Completion jobs publish partial batches every
    /// [`COMPLETION_CHUNK_INTERVAL`] and finish with one marked `done`;
    /// other jobs publish once. `publish` returns false to stop early.
    pub fn run_streaming(self, mut publish: impl FnMut(JobOutcome) -> bool) {
        let (completer, document, options, max, generation) = match self {
            Self::Complete {
                completer,
                document,
                options,
                max,
                generation,
            } => (completer, document, options, max, generation),
            other => {
                publish(other.run());
                return;
            }
        };
        let mut chunk = Vec::new();
        let mut last_publish = Instant::now();
        for completion in completer.get_completions(&document, &options.event).take(max) {
            chunk.push(completion);
            if last_publish.elapsed() >= COMPLETION_CHUNK_INTERVAL {
                let partial = JobOutcome::Completions {
                    generation,
                    completions: std::mem::take(&mut chunk),
                    options: options.clone(),
                    done: false,
                };
                if !publish(partial) {
                    return;
                }
                last_publish = Instant::now();
            }
        }
        publish(JobOutcome::Completions {
            generation,
            completions: chunk,
            options,
            done: true,
        });
    }
}

/// The result of a [`BufferJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Collected completions.
    Completions {
        /// Buffer generation at request time.
        generation: u64,
        /// The candidates.
        completions: Vec<Completion>,
        /// How to apply them.
        options: CompletionOptions,
        /// False for a partial batch; more follow from the same job.
        done: bool,
    },
    /// A computed suggestion.
    Suggestion {
        /// Buffer generation at request time.
        generation: u64,
        /// The suggestion, if any.
        suggestion: Option<Suggestion>,
    },
    /// A validation result.
    Validation {
        /// Buffer generation at request time.
        generation: u64,
        /// The result.
        result: Result<(), ValidationError>,
    },
}

impl JobOutcome {
    /// The buffer generation the job was started for.
    pub fn generation(&self) -> u64 {
        match self {
            Self::Completions { generation, .. }
            | Self::Suggestion { generation, .. }
            | Self::Validation { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct YankNthArgState {
    history_position: isize,
    n: isize,
    previous_inserted_word: String,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Pending: u8 {
        const VALIDATE = 1;
        const SUGGEST = 1 << 1;
        const BELL = 1 << 2;
    }
}

/// Editable text with history, undo, completion and validation.
pub struct Buffer {
    name: String,
    document: Document,
    working_lines: Vec<String>,
    working_index: usize,
    history: HistoryStore,
    history_prefix: usize,
    history_synced: bool,

    undo_stack: Vec<(String, usize)>,
    redo_stack: Vec<(String, usize)>,
    last_insert: Option<Instant>,
    undo_coalesce_window: Duration,

    complete_state: Option<CompletionState>,
    suggestion: Option<Suggestion>,
    validation_error: Option<ValidationError>,
    validation_state: ValidationState,
    preferred_column: Option<usize>,
    history_search_text: Option<String>,
    yank_nth_arg_state: Option<YankNthArgState>,
    document_before_paste: Option<Document>,

    completer: Option<SharedCompleter>,
    validator: Option<SharedValidator>,
    auto_suggest: Option<SharedAutoSuggest>,
    accept_handler: Option<AcceptHandler>,
    read_only: Condition,
    multiline: Condition,
    complete_while_typing: bool,
    validate_while_typing: bool,
    enable_history_search: bool,
    tempfile_suffix: String,
    max_number_of_completions: usize,

    generation: u64,
    pending: Pending,
    pending_completion: Option<CompletionOptions>,
    /// Generation of the completion job whose partial results are shown.
    completion_stream: Option<u64>,

    /// Fired once per change of the text.
    pub on_text_changed: Signal<Buffer>,
    /// Fired when the cursor moves.
    pub on_cursor_position_changed: Signal<Buffer>,
    /// Fired after text was inserted by typing.
    pub on_text_insert: Signal<Buffer>,
    /// Fired when a new set of completions arrived.
    pub on_completions_changed: Signal<Buffer>,
    /// Fired when a suggestion was set.
    pub on_suggestion_set: Signal<Buffer>,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("document", &self.document)
            .field("working_index", &self.working_index)
            .field("complete_state", &self.complete_state)
            .field("validation_state", &self.validation_state)
            .finish_non_exhaustive()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// An empty, editable, single-line buffer with in-memory history.
    pub fn new() -> Self {
        let mut buffer = Self {
            name: String::new(),
            document: Document::default(),
            working_lines: vec![String::new()],
            working_index: 0,
            history: HistoryStore::default(),
            history_prefix: 0,
            history_synced: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            last_insert: None,
            undo_coalesce_window: DEFAULT_UNDO_COALESCE_WINDOW,
            complete_state: None,
            suggestion: None,
            validation_error: None,
            validation_state: ValidationState::Unknown,
            preferred_column: None,
            history_search_text: None,
            yank_nth_arg_state: None,
            document_before_paste: None,
            completer: None,
            validator: None,
            auto_suggest: None,
            accept_handler: None,
            read_only: Rc::new(|| false),
            multiline: Rc::new(|| false),
            complete_while_typing: false,
            validate_while_typing: false,
            enable_history_search: false,
            tempfile_suffix: ".txt".to_string(),
            max_number_of_completions: DEFAULT_MAX_COMPLETIONS,
            generation: 0,
            pending: Pending::empty(),
            pending_completion: None,
            completion_stream: None,
            on_text_changed: Signal::new(),
            on_cursor_position_changed: Signal::new(),
            on_text_insert: Signal::new(),
            on_completions_changed: Signal::new(),
            on_suggestion_set: Signal::new(),
        };
        buffer.reset(None, false);
        buffer
    }

    // Configuration

    /// Sets the buffer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the initial document.
    pub fn with_document(mut self, document: Document) -> Self {
        self.reset(Some(document), false);
        self
    }

    /// Uses `history` and reloads the working lines from it.
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = history;
        let document = self.document.clone();
        self.reset(Some(document), false);
        self
    }

    /// Sets the completer.
    pub fn with_completer(mut self, completer: impl Completer + 'static) -> Self {
        self.completer = Some(Arc::new(completer));
        self
    }

    /// Sets an already shared completer.
    pub fn with_shared_completer(mut self, completer: Option<SharedCompleter>) -> Self {
        self.completer = completer;
        self
    }

    /// Sets the validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Sets an already shared validator.
    pub fn with_shared_validator(mut self, validator: Option<SharedValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Sets the auto-suggester.
    pub fn with_auto_suggest(mut self, auto_suggest: Option<SharedAutoSuggest>) -> Self {
        self.auto_suggest = auto_suggest;
        self
    }

    /// Sets the accept handler. It returns true to keep the text.
    pub fn with_accept_handler(mut self, handler: impl Fn(&mut Buffer) -> bool + 'static) -> Self {
        self.accept_handler = Some(Rc::new(handler));
        self
    }

    /// Makes the buffer read-only.
    pub fn with_read_only(self, read_only: bool) -> Self {
        self.with_read_only_condition(move || read_only)
    }

    /// Makes the buffer read-only while `condition` holds.
    pub fn with_read_only_condition(mut self, condition: impl Fn() -> bool + 'static) -> Self {
        self.read_only = Rc::new(condition);
        self
    }

    /// Makes Enter insert a newline.
    pub fn with_multiline(self, multiline: bool) -> Self {
        self.with_multiline_condition(move || multiline)
    }

    /// Makes Enter insert a newline while `condition` holds.
    pub fn with_multiline_condition(mut self, condition: impl Fn() -> bool + 'static) -> Self {
        self.multiline = Rc::new(condition);
        self
    }

    /// Request completions after every insert.
    pub fn with_complete_while_typing(mut self, value: bool) -> Self {
        self.complete_while_typing = value;
        self
    }

    /// Validate after every change.
    pub fn with_validate_while_typing(mut self, value: bool) -> Self {
        self.validate_while_typing = value;
        self
    }

    /// Filter history navigation by the text before the cursor.
    pub fn with_history_search(mut self, value: bool) -> Self {
        self.enable_history_search = value;
        self
    }

    /// File suffix used by [`Buffer::open_in_editor`].
    pub fn with_tempfile_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.tempfile_suffix = suffix.into();
        self
    }

    /// Undo coalescing window for successive inserts.
    pub fn with_undo_coalesce_window(mut self, window: Duration) -> Self {
        self.undo_coalesce_window = window;
        self
    }

    /// Caps the number of collected completions.
    pub fn with_max_completions(mut self, max: usize) -> Self {
        self.max_number_of_completions = max.max(1);
        self
    }

    // Accessors

    /// Buffer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current document.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The current text.
    #[inline]
    pub fn text(&self) -> &str {
        self.document.text()
    }

    /// Cursor position as a character index.
    #[inline]
    pub fn cursor_position(&self) -> usize {
        self.document.cursor_position()
    }

    /// The selection, if any.
    pub fn selection(&self) -> Option<&SelectionState> {
        self.document.selection()
    }

    /// The history store.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The completer.
    pub fn completer(&self) -> Option<&SharedCompleter> {
        self.completer.as_ref()
    }

    /// Completions being cycled through.
    pub fn complete_state(&self) -> Option<&CompletionState> {
        self.complete_state.as_ref()
    }

    /// Current suggestion.
    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    /// Last validation error.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    /// Result of the last validation.
    pub fn validation_state(&self) -> ValidationState {
        self.validation_state
    }

    /// Forgets the last validation error.
    pub fn clear_validation_error(&mut self) {
        self.validation_error = None;
        self.validation_state = ValidationState::Unknown;
    }

    /// Index into the working lines (history plus current input).
    pub fn working_index(&self) -> usize {
        self.working_index
    }

    /// Number of working lines.
    pub fn working_lines_len(&self) -> usize {
        self.working_lines.len()
    }

    /// The document as it was before the last paste, for yank-pop.
    pub fn document_before_paste(&self) -> Option<&Document> {
        self.document_before_paste.as_ref()
    }

    /// Prefix filter used by history navigation.
    pub fn history_search_text(&self) -> Option<&str> {
        self.history_search_text.as_deref()
    }

    /// Whether edits are currently refused.
    pub fn is_read_only(&self) -> bool {
        (self.read_only)()
    }

    /// Whether Enter inserts a newline.
    pub fn is_multiline(&self) -> bool {
        (self.multiline)()
    }

    /// Whether an accept handler is set.
    pub fn is_returnable(&self) -> bool {
        self.accept_handler.is_some()
    }

    /// Counter bumped on every change of text or cursor.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Undo stack depth.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Returns true and clears the flag if an operation was refused since
    /// the last call.
    pub fn take_bell(&mut self) -> bool {
        let bell = self.pending.contains(Pending::BELL);
        self.pending.remove(Pending::BELL);
        bell
    }

    // Document changes

    fn working_line(&self, index: usize) -> &str {
        if index == self.working_index {
            self.document.text()
        } else {
            &self.working_lines[index]
        }
    }

    /// Installs `document`. Returns false if the text change was refused.
    fn apply_document(&mut self, document: Document, check_read_only: bool, clear_history_search: bool) -> bool {
        let text_changed = document.text() != self.document.text();
        let cursor_changed = document.cursor_position() != self.document.cursor_position();
        if text_changed && check_read_only && self.is_read_only() {
            self.pending |= Pending::BELL;
            return false;
        }
        let selection = if text_changed {
            None
        } else {
            self.document.selection().copied()
        };
        self.document = document.with_selection(selection);
        if text_changed || cursor_changed {
            self.generation = self.generation.wrapping_add(1);
            self.last_insert = None;
        }
        if text_changed {
            self.text_changed();
            if clear_history_search {
                self.history_search_text = None;
            }
        }
        if cursor_changed {
            self.cursor_position_changed();
        }
        true
    }

    fn text_changed(&mut self) {
        self.validation_error = None;
        self.validation_state = ValidationState::Unknown;
        self.complete_state = None;
        self.completion_stream = None;
        self.yank_nth_arg_state = None;
        self.document_before_paste = None;
        self.suggestion = None;
        self.preferred_column = None;
        self.on_text_changed.fire(self);
        if self.validate_while_typing {
            self.pending |= Pending::VALIDATE;
        }
    }

    fn cursor_position_changed(&mut self) {
        self.complete_state = None;
        self.completion_stream = None;
        self.yank_nth_arg_state = None;
        self.document_before_paste = None;
        self.preferred_column = None;
        self.on_cursor_position_changed.fire(self);
    }

    /// Replaces text and cursor. The selection is kept only if the text is
    /// unchanged. Returns false if the buffer is read-only.
    pub fn set_document(&mut self, document: Document) -> bool {
        self.apply_document(document, true, true)
    }

    /// Replaces text and cursor even if the buffer is read-only.
    pub fn set_document_bypass_read_only(&mut self, document: Document) {
        self.apply_document(document, false, true);
    }

    /// Replaces the text, keeping the cursor where possible.
    pub fn set_text(&mut self, text: impl Into<Arc<str>>) -> bool {
        let cursor = self.cursor_position();
        self.set_document(Document::with_cursor(text, cursor))
    }

    /// Moves the cursor, clamped to the text.
    pub fn set_cursor_position(&mut self, position: usize) {
        let document = self.document.with_cursor_position(position);
        self.apply_document(document, false, true);
    }

    /// Moves the cursor by a signed offset.
    pub fn move_cursor(&mut self, delta: isize) {
        self.set_cursor_position(offset_position(self.cursor_position(), delta));
    }

    /// Clears everything and installs `document` (empty by default).
    pub fn reset(&mut self, document: Option<Document>, append_to_history: bool) {
        if append_to_history {
            self.append_to_history();
        }
        let document = document.unwrap_or_default();
        self.validation_error = None;
        self.validation_state = ValidationState::Unknown;
        self.preferred_column = None;
        self.complete_state = None;
        self.yank_nth_arg_state = None;
        self.document_before_paste = None;
        self.suggestion = None;
        self.history_search_text = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.last_insert = None;
        self.pending.remove(Pending::VALIDATE | Pending::SUGGEST);
        self.pending_completion = None;
        self.completion_stream = None;

        if !self.history.loads_in_background() {
            self.history.load(|_| {});
        }
        self.working_lines = self.history.get_strings();
        self.history_prefix = self.working_lines.len();
        self.history_synced = self.history.is_loaded();
        self.working_lines.push(document.text().to_string());
        self.working_index = self.working_lines.len() - 1;
        self.document = document.with_selection(None);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Starts loading the history. `on_loaded` runs once strings are
    /// available, possibly on another thread.
    pub fn load_history(&self, on_loaded: impl FnOnce(usize) + Send + 'static) {
        self.history.load(on_loaded);
    }

    fn sync_history(&mut self) {
        if self.history_synced || !self.history.is_loaded() {
            return;
        }
        self.history_synced = true;
        let mut lines = self.history.get_strings();
        let old_len = self.working_lines.len();
        lines.extend(self.working_lines.drain(self.history_prefix.min(old_len)..));
        self.working_index += lines.len() - old_len;
        self.history_prefix = self.history.len();
        self.working_lines = lines;
    }

    // Undo

    /// Records the current state on the undo stack.
    pub fn save_to_undo_stack(&mut self) {
        self.save_undo(true);
    }

    fn save_undo(&mut self, clear_redo: bool) {
        let cursor = self.document.cursor_position();
        let text = self.document.text();
        if self.undo_stack.last().is_some_and(|(last, _)| last == text) {
            if let Some(last) = self.undo_stack.last_mut() {
                last.1 = cursor;
            }
        } else {
            self.undo_stack.push((text.to_string(), cursor));
        }
        if clear_redo {
            self.redo_stack.clear();
        }
    }

    /// Restores the most recent different text.
    pub fn undo(&mut self) {
        if self.is_read_only() {
            self.pending |= Pending::BELL;
            return;
        }
        while let Some((text, position)) = self.undo_stack.pop() {
            if text != self.text() {
                self.redo_stack
                    .push((self.text().to_string(), self.cursor_position()));
                self.apply_document(Document::with_cursor(text, position), false, true);
                break;
            }
        }
    }

    /// Re-applies the last undone change.
    pub fn redo(&mut self) {
        if self.is_read_only() {
            self.pending |= Pending::BELL;
            return;
        }
        if let Some((text, position)) = self.redo_stack.pop() {
            self.save_undo(false);
            self.apply_document(Document::with_cursor(text, position), false, true);
        }
    }

    // Editing

    /// Inserts text at the cursor as if typed.
    pub fn insert_text(&mut self, data: &str) {
        self.insert_text_with(data, false, true, true);
    }

    /// Inserts text. `overwrite` replaces characters up to the end of the
    /// line; `move_cursor` places the cursor after the insert; `fire_event`
    /// triggers insert events, completion while typing and suggestions.
    pub fn insert_text_with(&mut self, data: &str, overwrite: bool, move_cursor: bool, fire_event: bool) {
        if self.is_read_only() {
            self.pending |= Pending::BELL;
            return;
        }
        let coalesce = self
            .last_insert
            .is_some_and(|at| at.elapsed() < self.undo_coalesce_window);
        if !coalesce {
            self.save_to_undo_stack();
        }
        let mut document = self.document.insert_text(data, overwrite);
        if !move_cursor {
            document = document.with_cursor_position(self.cursor_position());
        }
        self.apply_document(document, false, true);
        self.last_insert = Some(Instant::now());

        if fire_event {
            self.on_text_insert.fire(self);
            if self.complete_while_typing && self.completer.is_some() {
                self.pending_completion = Some(CompletionOptions::while_typing());
            }
            if self.auto_suggest.is_some() {
                self.pending |= Pending::SUGGEST;
            }
        }
    }

    fn edit(&mut self, document: Document) -> bool {
        if document.text() != self.text() {
            if self.is_read_only() {
                self.pending |= Pending::BELL;
                return false;
            }
            self.save_to_undo_stack();
        }
        self.apply_document(document, true, true)
    }

    /// Deletes up to `count` characters before the cursor and returns them.
    pub fn delete_before_cursor(&mut self, count: usize) -> String {
        let (document, deleted) = self.document.delete_before_cursor(count);
        if deleted.is_empty() || !self.edit(document) {
            return String::new();
        }
        deleted
    }

    /// Deletes up to `count` characters after the cursor and returns them.
    pub fn delete(&mut self, count: usize) -> String {
        let (document, deleted) = self.document.delete_after_cursor(count);
        if deleted.is_empty() || !self.edit(document) {
            return String::new();
        }
        deleted
    }

    /// Inserts a line break, copying the current indentation if asked.
    pub fn newline(&mut self, copy_margin: bool) {
        let text = if copy_margin {
            format!("\n{}", self.document.leading_whitespace_in_current_line())
        } else {
            "\n".to_string()
        };
        self.insert_text_with(&text, false, true, false);
    }

    /// Opens a new line above the current one.
    pub fn insert_line_above(&mut self, copy_margin: bool) {
        let insert = if copy_margin {
            format!("{}\n", self.document.leading_whitespace_in_current_line())
        } else {
            "\n".to_string()
        };
        self.move_cursor(self.document.get_start_of_line_position(false));
        self.insert_text_with(&insert, false, true, false);
        self.move_cursor(-1);
    }

    /// Opens a new line below the current one.
    pub fn insert_line_below(&mut self, copy_margin: bool) {
        let insert = if copy_margin {
            format!("\n{}", self.document.leading_whitespace_in_current_line())
        } else {
            "\n".to_string()
        };
        self.move_cursor(self.document.get_end_of_line_position());
        self.insert_text_with(&insert, false, true, false);
    }

    /// Joins the next line onto the current one.
    pub fn join_next_line(&mut self, separator: &str) {
        if self.document.on_last_line() {
            return;
        }
        let end = offset_position(self.cursor_position(), self.document.get_end_of_line_position());
        let doc = self.document.with_cursor_position(end);
        let (doc, _) = doc.delete_after_cursor(1);
        let text = format!(
            "{}{separator}{}",
            doc.text_before_cursor(),
            doc.text_after_cursor().trim_start_matches(' ')
        );
        self.edit(Document::with_cursor(text, end));
    }

    /// Joins the selected lines.
    pub fn join_selected_lines(&mut self, separator: &str) {
        let Some(selection) = self.selection().copied() else {
            return;
        };
        let a = selection.original_cursor_position.min(self.document.len());
        let (from, to) = (a.min(self.cursor_position()), a.max(self.cursor_position()));
        let text = self.text();
        let before = char_slice(text, 0, from);
        let after = char_slice(text, to, char_len(text));
        let lines: Vec<String> = char_slice(text, from, to)
            .lines()
            .map(|l| format!("{}{separator}", l.trim_start_matches(' ')))
            .collect();
        let joined = lines.concat();
        let head_len: usize = lines[..lines.len().saturating_sub(1)]
            .iter()
            .map(|l| char_len(l))
            .sum();
        let cursor = (char_len(before) + head_len).saturating_sub(1);
        let new_text = format!("{before}{joined}{after}");
        self.edit(Document::with_cursor(new_text, cursor));
    }

    /// Swaps the two characters before the cursor (Ctrl-T).
    pub fn swap_characters_before_cursor(&mut self) {
        let pos = self.cursor_position();
        if pos < 2 {
            return;
        }
        let text = self.text();
        let mut swapped: Vec<char> = char_slice(text, pos - 2, pos).chars().collect();
        swapped.swap(0, 1);
        let new_text = format!(
            "{}{}{}",
            char_slice(text, 0, pos - 2),
            swapped.into_iter().collect::<String>(),
            char_slice(text, pos, char_len(text))
        );
        self.edit(Document::with_cursor(new_text, pos));
    }

    /// Applies `transform` to the characters in `from..to`.
    pub fn transform_region(&mut self, from: usize, to: usize, transform: impl Fn(&str) -> String) {
        if from >= to {
            return;
        }
        let text = self.text();
        let new_text = format!(
            "{}{}{}",
            char_slice(text, 0, from),
            transform(char_slice(text, from, to)),
            char_slice(text, to, char_len(text))
        );
        let cursor = self.cursor_position();
        self.edit(Document::with_cursor(new_text, cursor));
    }

    /// Applies `transform` to the current line.
    pub fn transform_current_line(&mut self, transform: impl Fn(&str) -> String) {
        let cursor = self.cursor_position();
        let from = offset_position(cursor, self.document.get_start_of_line_position(false));
        let to = offset_position(cursor, self.document.get_end_of_line_position());
        if from == to {
            return;
        }
        self.transform_region(from, to, transform);
    }

    /// Applies `transform` to the given lines and returns the resulting
    /// text without changing the buffer.
    pub fn transform_lines(&self, rows: impl IntoIterator<Item = usize>, transform: impl Fn(&str) -> String) -> String {
        let mut lines: Vec<String> = self.text().split('\n').map(String::from).collect();
        for row in rows {
            if let Some(line) = lines.get_mut(row) {
                *line = transform(line);
            }
        }
        lines.join("\n")
    }

    // Cursor movement

    /// Moves left within the line.
    pub fn cursor_left(&mut self, count: usize) {
        self.move_cursor(self.document.get_cursor_left_position(count));
    }

    /// Moves right within the line.
    pub fn cursor_right(&mut self, count: usize) {
        self.move_cursor(self.document.get_cursor_right_position(count));
    }

    /// Moves up, keeping the preferred column.
    pub fn cursor_up(&mut self, count: usize) {
        let column = self
            .preferred_column
            .unwrap_or_else(|| self.document.cursor_position_col());
        self.move_cursor(self.document.get_cursor_up_position(count, Some(column)));
        self.preferred_column = Some(column);
    }

    /// Moves down, keeping the preferred column.
    pub fn cursor_down(&mut self, count: usize) {
        let column = self
            .preferred_column
            .unwrap_or_else(|| self.document.cursor_position_col());
        self.move_cursor(self.document.get_cursor_down_position(count, Some(column)));
        self.preferred_column = Some(column);
    }

    /// Up arrow: previous completion, previous line or older history.
    pub fn auto_up(&mut self, count: usize, go_to_start_of_line_if_history_changes: bool) {
        if self.complete_state.is_some() {
            self.complete_previous(count, false);
        } else if self.document.cursor_position_row() > 0 {
            self.cursor_up(count);
        } else if self.selection().is_none() {
            self.history_backward(count);
            if go_to_start_of_line_if_history_changes {
                self.move_cursor(self.document.get_start_of_line_position(false));
            }
        }
    }

    /// Down arrow: next completion, next line or newer history.
    pub fn auto_down(&mut self, count: usize, go_to_start_of_line_if_history_changes: bool) {
        if self.complete_state.is_some() {
            self.complete_next(count, false);
        } else if self.document.cursor_position_row() + 1 < self.document.line_count() {
            self.cursor_down(count);
        } else if self.selection().is_none() {
            self.history_forward(count);
            if go_to_start_of_line_if_history_changes {
                self.move_cursor(self.document.get_start_of_line_position(false));
            }
        }
    }

    // Selection and clipboard

    /// Starts a selection at the cursor.
    pub fn start_selection(&mut self, selection_type: SelectionType) {
        let selection = SelectionState::new(self.cursor_position(), selection_type);
        self.document = self.document.clone().with_selection(Some(selection));
    }

    /// Replaces the selection state.
    pub fn set_selection(&mut self, selection: Option<SelectionState>) {
        self.document = self.document.clone().with_selection(selection);
    }

    /// Drops the selection.
    pub fn exit_selection(&mut self) {
        self.set_selection(None);
    }

    /// Returns the selected text and clears the selection.
    pub fn copy_selection(&mut self) -> ClipboardData {
        let (_, data) = self.document.cut_selection();
        self.exit_selection();
        data
    }

    /// Removes the selected text and returns it.
    pub fn cut_selection(&mut self) -> ClipboardData {
        let (document, data) = self.document.cut_selection();
        if !self.edit(document) {
            return ClipboardData::default();
        }
        self.exit_selection();
        data
    }

    /// Pastes clipboard data `count` times at the cursor.
    pub fn paste_clipboard_data(&mut self, data: &ClipboardData, count: usize) {
        let original = self.document.clone();
        let document = self.document.paste_clipboard_data(data, count);
        if self.edit(document) {
            self.document_before_paste = Some(original);
        }
    }

    // Completion

    /// Requests completions. Nothing happens without a completer.
    pub fn start_completion(&mut self, options: CompletionOptions) {
        if self.completer.is_some() {
            self.pending_completion = Some(options);
        }
    }

    /// Selects the next candidate. Past the last one the original text is
    /// shown, then the first again.
    pub fn complete_next(&mut self, count: usize, disable_wrap_around: bool) {
        let Some(state) = &self.complete_state else {
            return;
        };
        let len = state.completions.len();
        let index = match state.complete_index {
            None => Some(0),
            Some(i) if i + 1 == len => {
                if disable_wrap_around {
                    return;
                }
                None
            }
            Some(i) => Some((i + count.max(1)).min(len - 1)),
        };
        self.go_to_completion(index);
    }

    /// Selects the previous candidate, wrapping like [`Buffer::complete_next`].
    pub fn complete_previous(&mut self, count: usize, disable_wrap_around: bool) {
        let Some(state) = &self.complete_state else {
            return;
        };
        let index = match state.complete_index {
            Some(0) => {
                if disable_wrap_around {
                    return;
                }
                None
            }
            None => state.completions.len().checked_sub(1),
            Some(i) => Some(i.saturating_sub(count.max(1))),
        };
        self.go_to_completion(index);
    }

    /// Restores the original text and leaves completion.
    pub fn cancel_completion(&mut self) {
        if self.complete_state.is_some() {
            self.go_to_completion(None);
            self.complete_state = None;
        }
    }

    /// Keeps the text of the selected candidate and leaves completion.
    pub fn accept_completion(&mut self) {
        self.complete_state = None;
    }

    /// Shows candidate `index` (or the original text) in the buffer.
    pub fn go_to_completion(&mut self, index: Option<usize>) {
        let Some(mut state) = self.complete_state.take() else {
            return;
        };
        let stream = self.completion_stream;
        state.go_to_index(index);
        let (text, cursor) = state.new_text_and_position();
        self.apply_document(Document::with_cursor(text, cursor), true, true);
        self.complete_state = Some(state);
        self.completion_stream = stream;
    }

    /// Commits `completion` and leaves completion.
    pub fn apply_completion(&mut self, completion: &Completion) {
        if self.complete_state.is_some() {
            self.go_to_completion(None);
        }
        self.complete_state = None;
        let (document, _) = self
            .document
            .delete_before_cursor(completion.start_position.unsigned_abs());
        self.edit(document.insert_text(&completion.text, false));
    }

    /// Installs completions directly, as if they had just arrived.
    pub fn set_completions(&mut self, completions: Vec<Completion>) {
        self.complete_state = Some(CompletionState::new(self.document.clone(), completions));
        self.on_completions_changed.fire(self);
    }

    fn completions_arrived(&mut self, mut completions: Vec<Completion>, options: CompletionOptions) {
        if completions.len() == 1 && completion_does_nothing(&self.document, &completions[0]) {
            completions.clear();
        }
        if completions.is_empty() {
            self.complete_state = None;
            return;
        }
        let document = self.document.clone();
        self.set_completions(completions.clone());

        if options.select_first {
            self.go_to_completion(Some(0));
        } else if options.select_last {
            self.go_to_completion(Some(completions.len() - 1));
        } else if options.insert_common_part {
            let common = get_common_complete_suffix(&document, &completions);
            if common.is_empty() {
                if completions.len() == 1 {
                    self.go_to_completion(Some(0));
                }
            } else {
                self.insert_text_with(&common, false, true, false);
                if completions.len() > 1 {
                    let shift = char_len(&common);
                    let shifted = completions
                        .iter()
                        .map(|c| c.new_completion_from_position(shift))
                        .collect();
                    self.set_completions(shifted);
                } else {
                    self.complete_state = None;
                }
            }
        }
    }

    // Jobs

    /// Hands out the work requested since the last call.
    pub fn take_jobs(&mut self) -> Vec<BufferJob> {
        let mut jobs = Vec::new();
        if let Some(options) = self.pending_completion.take() {
            if let (Some(completer), None) = (&self.completer, &self.complete_state) {
                jobs.push(BufferJob::Complete {
                    completer: Arc::clone(completer),
                    document: self.document.clone(),
                    options,
                    max: self.max_number_of_completions,
                    generation: self.generation,
                });
            }
        }
        if self.pending.contains(Pending::SUGGEST) {
            self.pending.remove(Pending::SUGGEST);
            if let (Some(auto_suggest), None) = (&self.auto_suggest, &self.suggestion) {
                jobs.push(BufferJob::Suggest {
                    auto_suggest: Arc::clone(auto_suggest),
                    history: self.history.clone(),
                    document: self.document.clone(),
                    generation: self.generation,
                });
            }
        }
        if self.pending.contains(Pending::VALIDATE) {
            self.pending.remove(Pending::VALIDATE);
            if let Some(validator) = &self.validator {
                if self.validation_state == ValidationState::Unknown {
                    jobs.push(BufferJob::Validate {
                        validator: Arc::clone(validator),
                        document: self.document.clone(),
                        generation: self.generation,
                    });
                }
            }
        }
        jobs
    }

    /// Applies a job result. Returns false if it was stale.
    pub fn apply_outcome(&mut self, outcome: JobOutcome) -> bool {
        let outcome = match outcome {
            JobOutcome::Completions {
                generation,
                completions,
                options,
                done,
            } => return self.completions_received(generation, completions, options, done),
            other => other,
        };
        if outcome.generation() != self.generation {
            tracing::trace!(
                buffer = %self.name,
                stale = outcome.generation(),
                current = self.generation,
                "discarding stale job outcome"
            );
            return false;
        }
        match outcome {
            JobOutcome::Completions { .. } => {}
            JobOutcome::Suggestion { suggestion, .. } => {
                self.suggestion = suggestion;
                self.on_suggestion_set.fire(self);
            }
            JobOutcome::Validation { result, .. } => {
                if self.validation_state == ValidationState::Unknown {
                    self.set_validation_result(result);
                }
            }
        }
        true
    }

    /// Shows completions as they arrive from a job. Partial batches fill
    /// the menu without selecting anything; the last batch applies the
    /// selection options, unless the user already moved through the list.
    fn completions_received(
        &mut self,
        generation: u64,
        completions: Vec<Completion>,
        options: CompletionOptions,
        done: bool,
    ) -> bool {
        // Selecting a candidate changes the generation but keeps the state.
        let streaming = self.completion_stream == Some(generation) && self.complete_state.is_some();
        if generation != self.generation && !streaming {
            tracing::trace!(
                buffer = %self.name,
                stale = generation,
                current = self.generation,
                "discarding stale completions"
            );
            if self.completion_stream == Some(generation) {
                self.completion_stream = None;
            }
            return false;
        }

        if !streaming {
            if self.complete_state.is_some() {
                return true;
            }
            if done {
                self.completion_stream = None;
                self.completions_arrived(completions, options);
            } else if !completions.is_empty() {
                self.completion_stream = Some(generation);
                self.set_completions(completions);
            }
            return true;
        }

        if let Some(state) = &mut self.complete_state {
            state.completions.extend(completions);
        }
        self.on_completions_changed.fire(self);
        if done {
            self.completion_stream = None;
            if generation == self.generation {
                if let Some(state) = self.complete_state.take() {
                    self.completions_arrived(state.completions, options);
                }
            }
        }
        true
    }

    /// Runs every pending job on the calling thread.
    pub fn run_pending_jobs(&mut self) {
        loop {
            let jobs = self.take_jobs();
            if jobs.is_empty() {
                break;
            }
            for job in jobs {
                let outcome = job.run();
                self.apply_outcome(outcome);
            }
        }
    }

    // Suggestion

    /// Accepts the current suggestion, inserting it at the cursor.
    pub fn accept_suggestion(&mut self) -> bool {
        match self.suggestion.take() {
            Some(suggestion) => {
                self.insert_text(&suggestion.text);
                true
            }
            None => false,
        }
    }

    // Validation

    fn set_validation_result(&mut self, result: Result<(), ValidationError>) {
        match result {
            Ok(()) => {
                self.validation_state = ValidationState::Valid;
                self.validation_error = None;
            }
            Err(e) => {
                self.validation_state = ValidationState::Invalid;
                self.validation_error = Some(e);
            }
        }
    }

    /// Validates the text, reusing the last result if the text did not
    /// change. On failure the cursor moves to the error if `set_cursor`.
    pub fn validate(&mut self, set_cursor: bool) -> bool {
        if self.validation_state != ValidationState::Unknown {
            return self.validation_state == ValidationState::Valid;
        }
        let result = match &self.validator {
            Some(validator) => validator.validate(&self.document),
            None => Ok(()),
        };
        if let Err(e) = &result {
            tracing::debug!(buffer = %self.name, error = %e, "validation failed");
            if set_cursor {
                let position = e.cursor_position.min(self.document.len());
                self.set_cursor_position(position);
            }
        }
        let valid = result.is_ok();
        self.set_validation_result(result);
        valid
    }

    /// Validates; if valid, calls the accept handler, appends to history and
    /// resets unless the handler asked to keep the text.
    pub fn validate_and_handle(&mut self) {
        if !self.validate(true) {
            return;
        }
        let keep_text = match self.accept_handler.clone() {
            Some(handler) => handler(self),
            None => false,
        };
        self.append_to_history();
        if !keep_text {
            self.reset(None, false);
        }
    }

    // History

    /// Appends the text to the history unless it is empty or repeats the
    /// last entry.
    pub fn append_to_history(&mut self) {
        let text = self.text();
        if text.is_empty() {
            return;
        }
        if self.history.last().as_deref() != Some(text) {
            self.history.append_string(text);
        }
    }

    fn set_history_search(&mut self) {
        if self.enable_history_search {
            if self.history_search_text.is_none() {
                self.history_search_text = Some(self.document.text_before_cursor().to_string());
            }
        } else {
            self.history_search_text = None;
        }
    }

    fn history_matches(&self, index: usize) -> bool {
        self.history_search_text
            .as_deref()
            .map_or(true, |prefix| self.working_line(index).starts_with(prefix))
    }

    fn set_working_index(&mut self, index: usize) {
        if index == self.working_index || index >= self.working_lines.len() {
            return;
        }
        self.working_lines[self.working_index] = self.text().to_string();
        self.working_index = index;
        let text = self.working_lines[index].clone();
        self.apply_document(Document::with_cursor(text, 0), false, false);
    }

    /// Moves to an older history entry.
    pub fn history_backward(&mut self, count: usize) {
        self.sync_history();
        self.set_history_search();
        let mut remaining = count.max(1);
        let mut found = None;
        for i in (0..self.working_index).rev() {
            if self.history_matches(i) {
                found = Some(i);
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
        }
        if let Some(i) = found {
            self.set_working_index(i);
            self.set_cursor_position(self.document.len());
        }
    }

    /// Moves to a newer history entry.
    pub fn history_forward(&mut self, count: usize) {
        self.sync_history();
        self.set_history_search();
        let mut remaining = count.max(1);
        let mut found = None;
        for i in self.working_index + 1..self.working_lines.len() {
            if self.history_matches(i) {
                found = Some(i);
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
        }
        if let Some(i) = found {
            self.set_working_index(i);
            self.set_cursor_position(0);
            self.move_cursor(self.document.get_end_of_line_position());
        }
    }

    /// Jumps to a working line.
    pub fn go_to_history(&mut self, index: usize) {
        self.sync_history();
        if index < self.working_lines.len() {
            self.set_working_index(index);
            self.set_cursor_position(self.document.len());
        }
    }

    /// Inserts the n-th word of an older history entry (Alt-Ctrl-Y).
    /// Repeated calls walk further back, replacing the inserted word.
    /// Negative `n` counts from the end.
    pub fn yank_nth_arg(&mut self, n: Option<isize>) {
        self.yank_arg(n, false);
    }

    /// Inserts the last word of an older history entry (Alt-.).
    pub fn yank_last_arg(&mut self, n: Option<isize>) {
        self.yank_arg(n, true);
    }

    fn yank_arg(&mut self, n: Option<isize>, last: bool) {
        let history = self.history.get_strings();
        if history.is_empty() {
            return;
        }
        let mut state = self.yank_nth_arg_state.take().unwrap_or(YankNthArgState {
            history_position: 0,
            n: if last { -1 } else { 1 },
            previous_inserted_word: String::new(),
        });
        if let Some(n) = n {
            state.n = n;
        }
        let len = history.len() as isize;
        let mut position = state.history_position - 1;
        if -position > len {
            position = -1;
        }
        let line = &history[(len + position) as usize];
        let words = split_quoted_words(line);
        let index = if state.n < 0 {
            words.len() as isize + state.n
        } else {
            state.n
        };
        let word = usize::try_from(index)
            .ok()
            .and_then(|i| words.get(i))
            .cloned()
            .unwrap_or_default();

        if !state.previous_inserted_word.is_empty() {
            self.delete_before_cursor(char_len(&state.previous_inserted_word));
        }
        self.insert_text_with(&word, false, true, false);
        state.previous_inserted_word = word;
        state.history_position = position;
        self.yank_nth_arg_state = Some(state);
    }

    // Search

    fn search_once(&self, state: &SearchState, index: usize, document: &Document, include_current_position: bool) -> Option<(usize, Document)> {
        let options = FindOptions::default().ignore_case(state.ignore_case);
        let n = self.working_lines.len();
        match state.direction {
            SearchDirection::Forward => {
                let opts = options.include_current_position(include_current_position);
                if let Some(offset) = document.find(&state.text, opts) {
                    let at = offset_position(document.cursor_position(), offset);
                    return Some((index, document.with_cursor_position(at)));
                }
                for step in 1..=n {
                    let i = (index + step) % n;
                    let candidate = Document::with_cursor(self.working_line(i), 0);
                    let opts = options.include_current_position(true);
                    if let Some(offset) = candidate.find(&state.text, opts) {
                        let at = offset_position(0, offset);
                        return Some((i, candidate.with_cursor_position(at)));
                    }
                }
            }
            SearchDirection::Backward => {
                if let Some(offset) = document.find_backwards(&state.text, options) {
                    let at = offset_position(document.cursor_position(), offset);
                    return Some((index, document.with_cursor_position(at)));
                }
                for step in 1..=n {
                    let i = (index + n - step) % n;
                    let candidate = Document::new(self.working_line(i));
                    if let Some(offset) = candidate.find_backwards(&state.text, options) {
                        let at = offset_position(candidate.len(), offset);
                        return Some((i, candidate.with_cursor_position(at)));
                    }
                }
            }
        }
        None
    }

    fn search(&mut self, state: &SearchState, include_current_position: bool, count: usize) -> Option<(usize, usize)> {
        if state.text.is_empty() {
            return None;
        }
        self.sync_history();
        let mut index = self.working_index;
        let mut document = self.document.clone();
        for _ in 0..count.max(1) {
            let (i, d) = self.search_once(state, index, &document, include_current_position)?;
            index = i;
            document = d;
        }
        Some((index, document.cursor_position()))
    }

    /// What the buffer would show if the search were applied; used to
    /// preview incremental search.
    pub fn document_for_search(&mut self, state: &SearchState) -> Document {
        match self.search(state, true, 1) {
            None => self.document.clone(),
            Some((index, cursor)) => {
                let selection = if index == self.working_index {
                    self.selection().copied()
                } else {
                    None
                };
                Document::with_cursor(self.working_line(index).to_string(), cursor).with_selection(selection)
            }
        }
    }

    /// Cursor position of the search result, or the current cursor.
    pub fn get_search_position(&mut self, state: &SearchState, include_current_position: bool, count: usize) -> usize {
        self.search(state, include_current_position, count)
            .map_or(self.cursor_position(), |(_, cursor)| cursor)
    }

    /// Moves to the search result.
    pub fn apply_search(&mut self, state: &SearchState, include_current_position: bool, count: usize) {
        if let Some((index, cursor)) = self.search(state, include_current_position, count) {
            self.set_working_index(index);
            self.set_cursor_position(cursor);
        }
    }

    // External editor

    /// Edits the text in `$VISUAL`/`$EDITOR`. The terminal must already be
    /// released by the caller.
    pub fn open_in_editor(&mut self, validate_and_handle: bool) -> Result<(), EditorError> {
        if self.is_read_only() {
            return Err(EditorError::ReadOnly);
        }
        let edited = editor::edit_text(self.text(), &self.tempfile_suffix)?;
        let len = char_len(&edited);
        self.edit(Document::with_cursor(edited, len));
        if validate_and_handle {
            self.validate_and_handle();
        }
        Ok(())
    }
}

fn split_quoted_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut last = 0;
    for m in QUOTED_WORDS.find_iter(line) {
        words.push(&line[last..m.start()]);
        words.push(m.as_str());
        last = m.end();
    }
    words.push(&line[last..]);
    words
        .into_iter()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{Completions, WordCompleter};
    use crate::history::InMemoryHistory;
    use crate::validation::from_callable;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn buffer() -> Buffer {
        Buffer::new().with_undo_coalesce_window(Duration::ZERO)
    }

    fn with_history(lines: &[&str]) -> Buffer {
        let store = HistoryStore::new(InMemoryHistory::with_strings(lines.iter().copied()));
        buffer().with_history(store)
    }

    fn type_text(b: &mut Buffer, text: &str) {
        for ch in text.chars() {
            b.insert_text(&ch.to_string());
        }
    }

    #[test]
    fn test_insert_and_delete() {
        let mut b = buffer();
        type_text(&mut b, "hello");
        assert_eq!(b.text(), "hello");
        assert_eq!(b.cursor_position(), 5);
        assert_eq!(b.delete_before_cursor(2), "lo");
        b.set_cursor_position(0);
        assert_eq!(b.delete(1), "h");
        assert_eq!(b.text(), "el");
        assert_eq!(b.delete_before_cursor(1), "");
    }

    #[test]
    fn test_undo_redo() {
        let mut b = buffer();
        type_text(&mut b, "ab");
        b.delete_before_cursor(1);
        assert_eq!(b.text(), "a");
        b.undo();
        assert_eq!(b.text(), "ab");
        b.undo();
        assert_eq!(b.text(), "a");
        b.undo();
        assert_eq!(b.text(), "");
        b.redo();
        assert_eq!(b.text(), "a");
        b.redo();
        assert_eq!(b.text(), "ab");
    }

    #[test]
    fn test_typing_coalesces_into_one_undo_entry() {
        let mut b = Buffer::new().with_undo_coalesce_window(Duration::from_secs(60));
        type_text(&mut b, "hello");
        b.cursor_left(2);
        b.insert_text("X");
        assert_eq!(b.text(), "helXlo");
        b.undo();
        assert_eq!(b.text(), "hello");
        b.undo();
        assert_eq!(b.text(), "");
    }

    #[test]
    fn test_undo_restores_single_edit() {
        let mut b = buffer().with_document(Document::with_cursor("one two", 3));
        for op in 0..4 {
            let before = b.document().clone();
            match op {
                0 => b.insert_text("!"),
                1 => {
                    b.delete_before_cursor(2);
                }
                2 => b.newline(true),
                _ => b.swap_characters_before_cursor(),
            }
            b.undo();
            assert_eq!(b.text(), before.text());
            assert_eq!(b.cursor_position(), before.cursor_position());
        }
    }

    #[test]
    fn test_read_only_refuses_edits() {
        let mut b = buffer().with_document(Document::new("fixed")).with_read_only(true);
        b.insert_text("x");
        assert_eq!(b.text(), "fixed");
        assert!(b.take_bell());
        assert!(!b.take_bell());
        assert!(!b.set_text("other"));
        b.cursor_left(1);
        assert_eq!(b.cursor_position(), 4);
        assert!(matches!(b.open_in_editor(false), Err(EditorError::ReadOnly)));
    }

    #[test]
    fn test_text_changed_fires_once_per_change() {
        let changes = Rc::new(Cell::new(0));
        let moves = Rc::new(Cell::new(0));
        let mut b = buffer();
        let c = Rc::clone(&changes);
        b.on_text_changed += move |_: &Buffer| c.set(c.get() + 1);
        let m = Rc::clone(&moves);
        b.on_cursor_position_changed += move |_: &Buffer| m.set(m.get() + 1);

        type_text(&mut b, "abc");
        assert_eq!(changes.get(), 3);
        b.cursor_left(1);
        assert_eq!(changes.get(), 3);
        assert_eq!(moves.get(), 4);
        b.set_text("abc");
        assert_eq!(changes.get(), 3);
        b.delete(0);
        assert_eq!(changes.get(), 3);
    }

    #[test]
    fn test_tab_cycles_and_escape_restores() {
        let mut b = buffer().with_completer(WordCompleter::new(["apple", "apricot", "banana"]));
        type_text(&mut b, "ap");
        b.start_completion(CompletionOptions::requested().select_first());
        b.run_pending_jobs();
        let shown: Vec<String> = b
            .complete_state()
            .unwrap()
            .completions
            .iter()
            .map(Completion::display_text)
            .collect();
        assert_eq!(shown, vec!["apple", "apricot"]);
        assert_eq!(b.text(), "apple");
        b.complete_next(1, false);
        assert_eq!(b.text(), "apricot");
        b.complete_next(1, false);
        assert_eq!(b.text(), "ap");
        b.complete_next(1, false);
        assert_eq!(b.text(), "apple");
        b.complete_previous(1, false);
        assert_eq!(b.text(), "ap");
        b.complete_previous(1, false);
        assert_eq!(b.text(), "apricot");
        b.cancel_completion();
        assert_eq!(b.text(), "ap");
        assert!(b.complete_state().is_none());
    }

    #[test]
    fn test_completion_state_matches_text() {
        let mut b = buffer()
            .with_completer(WordCompleter::new(["apple", "apricot"]))
            .with_document(Document::with_cursor("x ap y", 4));
        b.start_completion(CompletionOptions::requested().select_last());
        b.run_pending_jobs();
        let state = b.complete_state().unwrap().clone();
        assert_eq!(state.new_text_and_position(), (b.text().to_string(), b.cursor_position()));
        assert_eq!(b.text(), "x apricot y");
        b.insert_text("!");
        assert!(b.complete_state().is_none());
    }

    #[test]
    fn test_insert_common_part() {
        let mut b = buffer().with_completer(WordCompleter::new(["application", "apple"]));
        type_text(&mut b, "a");
        b.start_completion(CompletionOptions::requested().insert_common_part());
        b.run_pending_jobs();
        assert_eq!(b.text(), "appl");
        let state = b.complete_state().unwrap();
        assert_eq!(state.complete_index, None);
        let texts: Vec<&str> = state.completions.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ication", "e"]);
        b.complete_next(1, false);
        assert_eq!(b.text(), "application");
    }

    #[test]
    fn test_single_useless_completion_is_dropped() {
        let mut b = buffer().with_completer(WordCompleter::new(["apple"]));
        type_text(&mut b, "apple");
        b.start_completion(CompletionOptions::requested().select_first());
        b.run_pending_jobs();
        assert!(b.complete_state().is_none());
    }

    #[test]
    fn test_stale_completions_are_discarded() {
        let mut b = buffer().with_completer(WordCompleter::new(["apple"]));
        type_text(&mut b, "a");
        b.start_completion(CompletionOptions::requested().select_first());
        let jobs = b.take_jobs();
        assert_eq!(jobs.len(), 1);
        type_text(&mut b, "p");
        let outcome = jobs.into_iter().next().unwrap().run();
        assert!(!b.apply_outcome(outcome));
        assert!(b.complete_state().is_none());
        assert_eq!(b.text(), "ap");
    }

    struct SlowCompleter;

    impl Completer for SlowCompleter {
        fn get_completions<'a>(&'a self, _document: &'a Document, _event: &CompleteEvent) -> Completions<'a> {
            Box::new(["apple", "apricot", "avocado"].into_iter().map(|word| {
                std::thread::sleep(COMPLETION_CHUNK_INTERVAL + Duration::from_millis(10));
                Completion::new(word, -1)
            }))
        }
    }

    fn streamed_outcomes(b: &mut Buffer) -> Vec<JobOutcome> {
        let job = b.take_jobs().into_iter().next().unwrap();
        let mut outcomes = Vec::new();
        job.run_streaming(|outcome| {
            outcomes.push(outcome);
            true
        });
        outcomes
    }

    #[test]
    fn test_completions_stream_in_batches() {
        let mut b = buffer().with_completer(SlowCompleter);
        type_text(&mut b, "a");
        b.start_completion(CompletionOptions::requested().select_first());
        let mut outcomes = streamed_outcomes(&mut b).into_iter();

        let first = outcomes.next().unwrap();
        assert!(matches!(first, JobOutcome::Completions { done: false, .. }));
        assert!(b.apply_outcome(first));
        let state = b.complete_state().unwrap();
        assert_eq!(state.completions.len(), 1);
        assert_eq!(state.complete_index, None);
        assert_eq!(b.text(), "a");

        for outcome in outcomes {
            assert!(b.apply_outcome(outcome));
        }
        let state = b.complete_state().unwrap();
        assert_eq!(state.completions.len(), 3);
        assert_eq!(state.complete_index, Some(0));
        assert_eq!(b.text(), "apple");
    }

    #[test]
    fn test_streamed_completions_keep_user_selection() {
        let mut b = buffer().with_completer(SlowCompleter);
        type_text(&mut b, "a");
        b.start_completion(CompletionOptions::requested().select_last());
        let mut outcomes = streamed_outcomes(&mut b).into_iter();
        assert!(b.apply_outcome(outcomes.next().unwrap()));
        b.complete_next(1, false);
        assert_eq!(b.text(), "apple");

        for outcome in outcomes {
            assert!(b.apply_outcome(outcome));
        }
        let state = b.complete_state().unwrap();
        assert_eq!(state.completions.len(), 3);
        assert_eq!(state.complete_index, Some(0));
        assert_eq!(b.text(), "apple");
    }

    #[test]
    fn test_stream_stops_when_publish_refuses() {
        let mut b = buffer().with_completer(SlowCompleter);
        type_text(&mut b, "a");
        b.start_completion(CompletionOptions::requested());
        let job = b.take_jobs().into_iter().next().unwrap();
        let mut calls = 0;
        job.run_streaming(|_| {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_complete_while_typing() {
        let mut b = buffer()
            .with_completer(WordCompleter::new(["apple", "apricot"]))
            .with_complete_while_typing(true);
        type_text(&mut b, "apr");
        b.run_pending_jobs();
        let state = b.complete_state().unwrap();
        assert_eq!(state.completions.len(), 1);
        assert_eq!(state.complete_index, None);
        assert_eq!(b.text(), "apr");
    }

    #[test]
    fn test_apply_completion() {
        let mut b = buffer().with_document(Document::new("say ap"));
        b.apply_completion(&Completion::new("apple", -2));
        assert_eq!(b.text(), "say apple");
        assert_eq!(b.cursor_position(), 9);
        b.undo();
        assert_eq!(b.text(), "say ap");
    }

    #[test]
    fn test_validation_moves_cursor() {
        let accepted = Rc::new(Cell::new(0));
        let a = Rc::clone(&accepted);
        let mut b = buffer()
            .with_validator(|doc: &Document| match doc.text().chars().position(|c| !c.is_ascii_digit()) {
                Some(i) => Err(ValidationError::new(i, "must be digits")),
                None => Ok(()),
            })
            .with_accept_handler(move |_| {
                a.set(a.get() + 1);
                false
            });
        type_text(&mut b, "12a");
        b.validate_and_handle();
        assert_eq!(accepted.get(), 0);
        assert_eq!(b.validation_state(), ValidationState::Invalid);
        assert_eq!(b.validation_error().unwrap().message, "must be digits");
        assert_eq!(b.cursor_position(), 2);

        b.delete(1);
        b.insert_text("3");
        assert_eq!(b.validation_state(), ValidationState::Unknown);
        b.validate_and_handle();
        assert_eq!(accepted.get(), 1);
        assert_eq!(b.text(), "");
        assert_eq!(b.history().last().as_deref(), Some("123"));
    }

    #[test]
    fn test_accept_handler_can_keep_text() {
        let mut b = buffer().with_accept_handler(|_| true);
        type_text(&mut b, "stay");
        b.validate_and_handle();
        assert_eq!(b.text(), "stay");
        b.validate_and_handle();
        assert_eq!(b.history().get_strings(), vec!["stay"]);
    }

    #[test]
    fn test_validate_while_typing() {
        let mut b = buffer()
            .with_validator(from_callable(|t| t.len() < 3, "too long", true))
            .with_validate_while_typing(true);
        type_text(&mut b, "ab");
        b.run_pending_jobs();
        assert_eq!(b.validation_state(), ValidationState::Valid);
        type_text(&mut b, "c");
        b.run_pending_jobs();
        assert_eq!(b.validation_state(), ValidationState::Invalid);
        assert_eq!(b.cursor_position(), 3);
    }

    #[test]
    fn test_history_navigation() {
        let mut b = with_history(&["first", "second"]);
        type_text(&mut b, "draft");
        b.history_backward(1);
        assert_eq!(b.text(), "second");
        assert_eq!(b.cursor_position(), 6);
        b.history_backward(1);
        assert_eq!(b.text(), "first");
        b.history_backward(1);
        assert_eq!(b.text(), "first");
        b.history_forward(2);
        assert_eq!(b.text(), "draft");
    }

    #[test]
    fn test_history_edits_are_kept_while_navigating() {
        let mut b = with_history(&["old"]);
        b.history_backward(1);
        b.insert_text("er");
        b.history_forward(1);
        assert_eq!(b.text(), "");
        b.history_backward(1);
        assert_eq!(b.text(), "older");
    }

    #[test]
    fn test_history_search_prefix() {
        let mut b = with_history(&["git commit", "ls", "git push", "cd"]).with_history_search(true);
        type_text(&mut b, "git");
        b.history_backward(1);
        assert_eq!(b.text(), "git push");
        b.history_backward(1);
        assert_eq!(b.text(), "git commit");
        b.history_forward(1);
        assert_eq!(b.text(), "git push");
    }

    #[test]
    fn test_auto_up_down() {
        let mut b = with_history(&["prev"]).with_document(Document::new("a\nbc"));
        b.auto_up(1, false);
        assert_eq!(b.document().cursor_position_row(), 0);
        b.auto_up(1, false);
        assert_eq!(b.text(), "prev");
        b.auto_down(1, false);
        assert_eq!(b.text(), "a\nbc");
    }

    #[test]
    fn test_preferred_column() {
        let mut b = buffer().with_document(Document::with_cursor("abcdef\nx\nabcdef", 5));
        b.cursor_down(1);
        assert_eq!(b.document().cursor_position_col(), 1);
        b.cursor_down(1);
        assert_eq!(b.document().cursor_position_col(), 5);
    }

    #[test]
    fn test_incremental_search_wraps_history() {
        let mut b = with_history(&["alpha", "beta"]);
        type_text(&mut b, "gamma");
        let backward = SearchState::new("alp", SearchDirection::Backward);
        let preview = b.document_for_search(&backward);
        assert_eq!(preview.text(), "alpha");
        assert_eq!(preview.cursor_position(), 0);
        b.apply_search(&backward, true, 1);
        assert_eq!(b.text(), "alpha");
        assert_eq!(b.working_index(), 0);

        let forward = SearchState::new("amm", SearchDirection::Forward);
        b.apply_search(&forward, false, 1);
        assert_eq!(b.text(), "gamma");
        assert_eq!(b.cursor_position(), 1);

        let missing = SearchState::new("zzz", SearchDirection::Forward);
        assert_eq!(b.get_search_position(&missing, true, 1), 1);
    }

    #[test]
    fn test_search_ignore_case() {
        let mut b = buffer().with_document(Document::with_cursor("Hello World", 0));
        let state = SearchState::new("world", SearchDirection::Forward).with_ignore_case(true);
        assert_eq!(b.get_search_position(&state, true, 1), 6);
    }

    #[test]
    fn test_yank_last_arg_cycles() {
        let mut b = with_history(&["echo one", "ls \"my dir\" -l"]);
        b.yank_last_arg(None);
        assert_eq!(b.text(), "-l");
        b.yank_last_arg(None);
        assert_eq!(b.text(), "one");
        b.yank_nth_arg(Some(1));
        assert_eq!(b.text(), "\"my dir\"");
    }

    #[test]
    fn test_split_quoted_words() {
        assert_eq!(split_quoted_words("a 'b c'  d"), vec!["a", "'b c'", "d"]);
    }

    #[test]
    fn test_cut_copy_paste() {
        let mut b = buffer().with_document(Document::with_cursor("hello world", 0));
        b.start_selection(SelectionType::Characters);
        b.set_cursor_position(5);
        assert!(b.selection().is_some());
        let copied = b.copy_selection();
        assert_eq!(copied.text, "hello");
        assert!(b.selection().is_none());

        b.start_selection(SelectionType::Characters);
        b.set_cursor_position(11);
        let cut = b.cut_selection();
        assert_eq!(cut.text, " world");
        assert_eq!(b.text(), "hello");

        b.set_cursor_position(0);
        b.paste_clipboard_data(&cut, 2);
        assert_eq!(b.text(), " world worldhello");
        assert_eq!(b.document_before_paste().unwrap().text(), "hello");
    }

    #[test]
    fn test_join_and_swap() {
        let mut b = buffer().with_document(Document::with_cursor("one\n   two", 1));
        b.join_next_line(" ");
        assert_eq!(b.text(), "one two");
        assert_eq!(b.cursor_position(), 3);
        b.swap_characters_before_cursor();
        assert_eq!(b.text(), "oen two");

        let mut b = buffer().with_document(Document::with_cursor("a\n b\n c", 0));
        b.start_selection(SelectionType::Lines);
        b.set_cursor_position(7);
        b.join_selected_lines(" ");
        assert_eq!(b.text(), "a b c ");
    }

    #[test]
    fn test_line_insertion() {
        let mut b = buffer().with_document(Document::with_cursor("  x", 3));
        b.insert_line_below(true);
        assert_eq!(b.text(), "  x\n  ");
        b.set_cursor_position(1);
        b.insert_line_above(false);
        assert_eq!(b.text(), "\n  x\n  ");
        assert_eq!(b.cursor_position(), 0);
    }

    #[test]
    fn test_transform() {
        let mut b = buffer().with_document(Document::with_cursor("ab\ncd", 4));
        b.transform_current_line(str::to_uppercase);
        assert_eq!(b.text(), "ab\nCD");
        b.transform_region(0, 1, |s| s.repeat(2));
        assert_eq!(b.text(), "aab\nCD");
        assert_eq!(b.transform_lines([0], |s| format!("> {s}")), "> aab\nCD");
    }

    #[test]
    fn test_auto_suggest_job() {
        use crate::auto_suggest::AutoSuggestFromHistory;
        let mut b = with_history(&["cargo build --release"])
            .with_auto_suggest(Some(Arc::new(AutoSuggestFromHistory)));
        type_text(&mut b, "cargo b");
        b.run_pending_jobs();
        assert_eq!(b.suggestion().unwrap().text, "uild --release");
        assert!(b.accept_suggestion());
        assert_eq!(b.text(), "cargo build --release");
    }

    #[test]
    fn test_background_history_synced_lazily() {
        use crate::history::ThreadedHistory;
        let store = HistoryStore::new(ThreadedHistory::new(InMemoryHistory::with_strings(["loaded"])));
        let mut b = buffer().with_history(store);
        let (tx, rx) = flume::bounded(1);
        b.load_history(move |n| {
            let _ = tx.send(n);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        type_text(&mut b, "x");
        b.history_backward(1);
        assert_eq!(b.text(), "loaded");
        b.history_forward(1);
        assert_eq!(b.text(), "x");
    }
}
