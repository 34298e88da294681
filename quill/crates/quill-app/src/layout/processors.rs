//! Line transformations applied by a [`BufferControl`](super::BufferControl)
//! before its text reaches the screen.
//!
//! A processor receives one line as fragments and returns new fragments
//! plus two position maps, so the cursor and mouse clicks can be
//! translated between buffer columns and displayed columns. Processors run
//! lazily, once per displayed line, after [`Processor::refresh`] gave them
//! a chance to read application state for the frame.

use super::controls::TextSource;
use crate::context::AppContext;
use crate::filters::Filter;
use quill_core::formatted_text::{explode_fragments, fragment_list_len, fragment_list_to_text};
use quill_core::{FormattedText, Fragment};
use quill_edit::Document;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Maps a column from one coordinate space to another.
pub type PositionMap = Rc<dyn Fn(usize) -> usize>;

fn identity() -> PositionMap {
    Rc::new(|i| i)
}

/// What processors see of the control being drawn.
#[derive(Debug, Clone)]
pub struct ControlState {
    /// The document shown, possibly a search preview.
    pub document: Document,
    /// The last search applied to the buffer.
    pub search_text: String,
    /// Text of the search field while this control is being searched.
    pub incsearch_text: String,
    /// Whether searches ignore case.
    pub search_ignore_case: bool,
    /// Whether the window showing the control has focus.
    pub has_focus: bool,
    /// Whether the application is finishing.
    pub is_done: bool,
    /// The pending repeat argument.
    pub key_arg: Option<String>,
    /// The auto-suggestion for the buffer.
    pub suggestion: Option<String>,
}

impl ControlState {
    /// State for a plain document with nothing else going on.
    pub fn for_document(document: Document) -> Self {
        Self {
            document,
            search_text: String::new(),
            incsearch_text: String::new(),
            search_ignore_case: false,
            has_focus: true,
            is_done: false,
            key_arg: None,
            suggestion: None,
        }
    }
}

/// Input of [`Processor::apply_transformation`].
pub struct TransformationInput<'a> {
    /// The control's state for this frame.
    pub state: &'a ControlState,
    /// Line number in the document.
    pub lineno: usize,
    /// Maps buffer columns to columns of `fragments`.
    pub source_to_display: &'a dyn Fn(usize) -> usize,
    /// The line as transformed by the preceding processors.
    pub fragments: &'a [Fragment],
    /// Width of the control.
    pub width: usize,
    /// Height of the control.
    pub height: usize,
}

impl fmt::Debug for TransformationInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationInput")
            .field("lineno", &self.lineno)
            .field("fragments", &self.fragments)
            .finish_non_exhaustive()
    }
}

/// Output of a processor.
pub struct Transformation {
    /// The transformed line.
    pub fragments: Vec<Fragment>,
    /// Maps input columns to output columns.
    pub source_to_display: PositionMap,
    /// Maps output columns back to input columns.
    pub display_to_source: PositionMap,
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformation")
            .field("fragments", &self.fragments)
            .finish_non_exhaustive()
    }
}

impl Transformation {
    /// Fragments that keep every column where it was.
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self {
            fragments,
            source_to_display: identity(),
            display_to_source: identity(),
        }
    }

    /// Fragments with explicit column maps.
    pub fn with_maps(fragments: Vec<Fragment>, source_to_display: PositionMap, display_to_source: PositionMap) -> Self {
        Self {
            fragments,
            source_to_display,
            display_to_source,
        }
    }
}

/// A per-line transformation of a buffer control's text.
pub trait Processor {
    /// Transforms one line.
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation;

    /// Reads whatever application state the processor needs for the next
    /// frame. Called once before the frame's lines are transformed.
    fn refresh(&self, _ctx: &AppContext) {}
}

/// A shared processor.
pub type SharedProcessor = Rc<dyn Processor>;

// === Merging ===

/// Runs processors in order, chaining their position maps.
pub struct MergedProcessor {
    processors: Vec<SharedProcessor>,
}

impl fmt::Debug for MergedProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedProcessor")
            .field("processors", &self.processors.len())
            .finish()
    }
}

impl Processor for MergedProcessor {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let mut to_display: Vec<PositionMap> = Vec::new();
        let mut to_source: Vec<PositionMap> = Vec::new();
        let mut fragments = ti.fragments.to_vec();

        for processor in &self.processors {
            let chained = |i: usize| to_display.iter().fold((ti.source_to_display)(i), |i, f| f(i));
            let transformation = processor.apply_transformation(&TransformationInput {
                state: ti.state,
                lineno: ti.lineno,
                source_to_display: &chained,
                fragments: &fragments,
                width: ti.width,
                height: ti.height,
            });
            fragments = transformation.fragments;
            to_display.push(transformation.source_to_display);
            to_source.push(transformation.display_to_source);
        }

        Transformation::with_maps(
            fragments,
            Rc::new(move |i| to_display.iter().fold(i, |i, f| f(i))),
            Rc::new(move |i| to_source.iter().rev().fold(i, |i, f| f(i))),
        )
    }

    fn refresh(&self, ctx: &AppContext) {
        for processor in &self.processors {
            processor.refresh(ctx);
        }
    }
}

/// Combines processors into one.
pub fn merge_processors(processors: Vec<SharedProcessor>) -> SharedProcessor {
    match <[SharedProcessor; 1]>::try_from(processors) {
        Ok([only]) => only,
        Err(processors) => Rc::new(MergedProcessor { processors }),
    }
}

// === Highlighting ===

fn push_style(fragment: &mut Fragment, style: &str) {
    fragment.style = format!("{} {style} ", fragment.style);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchSource {
    Applied,
    Incremental,
}

/// Highlights matches of a search.
///
/// The plain variant shows the last applied search (`class:search`,
/// `class:search.current` under the cursor); the incremental variant shows
/// what is typed in the search field (`class:incsearch`).
#[derive(Debug, Clone, Copy)]
pub struct HighlightSearchProcessor {
    source: SearchSource,
}

impl Default for HighlightSearchProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightSearchProcessor {
    /// Highlights the last applied search.
    pub fn new() -> Self {
        Self {
            source: SearchSource::Applied,
        }
    }

    /// Highlights the search being typed.
    pub fn incremental() -> Self {
        Self {
            source: SearchSource::Incremental,
        }
    }

    fn class_names(&self) -> (&'static str, &'static str) {
        match self.source {
            SearchSource::Applied => ("class:search", "class:search.current"),
            SearchSource::Incremental => ("class:incsearch", "class:incsearch.current"),
        }
    }
}

/// Character ranges of the matches of `needle` in `haystack`.
fn match_ranges(haystack: &str, needle: &str, ignore_case: bool) -> Vec<(usize, usize)> {
    let pattern = format!("{}{}", if ignore_case { "(?i)" } else { "" }, regex::escape(needle));
    let Ok(re) = regex::Regex::new(&pattern) else {
        return Vec::new();
    };
    re.find_iter(haystack)
        .map(|m| {
            let start = haystack[..m.start()].chars().count();
            (start, start + m.as_str().chars().count())
        })
        .collect()
}

impl Processor for HighlightSearchProcessor {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let state = ti.state;
        let text = match self.source {
            SearchSource::Applied => &state.search_text,
            SearchSource::Incremental => &state.incsearch_text,
        };
        if text.is_empty() || state.is_done {
            return Transformation::new(ti.fragments.to_vec());
        }

        let line_text = fragment_list_to_text(ti.fragments);
        let mut fragments = explode_fragments(ti.fragments);
        let cursor_column = (state.document.cursor_position_row() == ti.lineno)
            .then(|| (ti.source_to_display)(state.document.cursor_position_col()));
        let (class, current_class) = self.class_names();

        for (start, end) in match_ranges(&line_text, text, state.search_ignore_case) {
            let on_cursor = cursor_column.is_some_and(|c| start <= c && c < end);
            let style = if on_cursor { current_class } else { class };
            for fragment in fragments.iter_mut().skip(start).take(end - start) {
                push_style(fragment, style);
            }
        }
        Transformation::new(fragments)
    }
}

/// Highlights the selected part of each line with `class:selected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighlightSelectionProcessor;

impl Processor for HighlightSelectionProcessor {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let Some((from, to)) = ti.state.document.selection_range_at_line(ti.lineno) else {
            return Transformation::new(ti.fragments.to_vec());
        };
        let from = (ti.source_to_display)(from);
        let to = (ti.source_to_display)(to);
        let mut fragments = explode_fragments(ti.fragments);

        if from == 0 && to == 0 && fragments.is_empty() {
            // Make the selection visible on empty lines.
            return Transformation::new(vec![Fragment::new(" class:selected ", " ")]);
        }
        for i in from..to {
            if let Some(fragment) = fragments.get_mut(i) {
                push_style(fragment, "class:selected");
            } else if i == fragments.len() {
                fragments.push(Fragment::new(" class:selected ", " "));
            }
        }
        Transformation::new(fragments)
    }
}

// === Decoration ===

/// Replaces every character with `char`.
#[derive(Debug, Clone, Copy)]
pub struct PasswordProcessor {
    /// The mask character.
    pub char: char,
}

impl Default for PasswordProcessor {
    fn default() -> Self {
        Self { char: '*' }
    }
}

impl Processor for PasswordProcessor {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let fragments = ti
            .fragments
            .iter()
            .map(|f| {
                if f.is_zero_width_escape() {
                    f.clone()
                } else {
                    Fragment::new(f.style.clone(), self.char.to_string().repeat(f.text.chars().count()))
                }
            })
            .collect();
        Transformation::new(fragments)
    }
}

/// Inserts text in front of the first line.
pub struct BeforeInput {
    text: TextSource,
    style: String,
    resolved: RefCell<FormattedText>,
}

impl fmt::Debug for BeforeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeInput")
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl BeforeInput {
    /// Inserts `text` styled with `style`.
    pub fn new(text: impl Into<TextSource>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
            resolved: RefCell::new(FormattedText::new()),
        }
    }
}

fn prefix_first_line(ti: &TransformationInput<'_>, before: Vec<Fragment>) -> Transformation {
    if ti.lineno != 0 {
        return Transformation::new(ti.fragments.to_vec());
    }
    let shift = fragment_list_len(&before);
    let mut fragments = before;
    fragments.extend_from_slice(ti.fragments);
    Transformation::with_maps(
        fragments,
        Rc::new(move |i| i + shift),
        Rc::new(move |i| i.saturating_sub(shift)),
    )
}

impl Processor for BeforeInput {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        prefix_first_line(ti, self.resolved.borrow().to_vec())
    }

    fn refresh(&self, ctx: &AppContext) {
        *self.resolved.borrow_mut() = self.text.get(ctx).with_style_prefix(&self.style);
    }
}

/// Appends text after the last line.
pub struct AfterInput {
    text: TextSource,
    style: String,
    resolved: RefCell<FormattedText>,
}

impl fmt::Debug for AfterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterInput")
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl AfterInput {
    /// Appends `text` styled with `style`.
    pub fn new(text: impl Into<TextSource>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
            resolved: RefCell::new(FormattedText::new()),
        }
    }
}

impl Processor for AfterInput {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let mut fragments = ti.fragments.to_vec();
        if ti.lineno + 1 == ti.state.document.line_count() {
            fragments.extend(self.resolved.borrow().iter().cloned());
        }
        Transformation::new(fragments)
    }

    fn refresh(&self, ctx: &AppContext) {
        *self.resolved.borrow_mut() = self.text.get(ctx).with_style_prefix(&self.style);
    }
}

/// Shows the pending repeat argument, `(arg: 4) `, in front of the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowArg;

impl Processor for ShowArg {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let before = match &ti.state.key_arg {
            Some(arg) => vec![
                Fragment::new("class:prompt.arg", "(arg: "),
                Fragment::new("class:prompt.arg.text", arg.clone()),
                Fragment::new("class:prompt.arg", ") "),
            ],
            None => Vec::new(),
        };
        prefix_first_line(ti, before)
    }
}

/// Shows the auto-suggestion after the input when the cursor is at the end.
#[derive(Debug, Clone)]
pub struct AppendAutoSuggestion {
    style: String,
}

impl Default for AppendAutoSuggestion {
    fn default() -> Self {
        Self {
            style: "class:auto-suggestion".into(),
        }
    }
}

impl AppendAutoSuggestion {
    /// Shows the suggestion with a custom style.
    pub fn with_style(style: impl Into<String>) -> Self {
        Self { style: style.into() }
    }
}

impl Processor for AppendAutoSuggestion {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let mut fragments = ti.fragments.to_vec();
        let document = &ti.state.document;
        if ti.lineno + 1 == document.line_count() && document.is_cursor_at_the_end() {
            if let Some(suggestion) = &ti.state.suggestion {
                fragments.push(Fragment::new(self.style.clone(), suggestion.clone()));
            }
        }
        Transformation::new(fragments)
    }
}

/// Expands tabs to the next tab stop: `char1` followed by `char2` padding.
#[derive(Debug, Clone)]
pub struct TabsProcessor {
    /// Columns between tab stops.
    pub tabstop: usize,
    /// First cell of an expanded tab.
    pub char1: char,
    /// Remaining cells of an expanded tab.
    pub char2: char,
    /// Style of the expansion.
    pub style: String,
}

impl Default for TabsProcessor {
    fn default() -> Self {
        Self {
            tabstop: 4,
            char1: '|',
            char2: '\u{2508}',
            style: "class:tab".into(),
        }
    }
}

impl Processor for TabsProcessor {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        let tabstop = self.tabstop.max(1);
        let chars = explode_fragments(ti.fragments);
        let mut positions = Vec::with_capacity(chars.len() + 2);
        let mut fragments = Vec::with_capacity(chars.len());
        let mut pos = 0;

        for fragment in chars {
            positions.push(pos);
            if fragment.text == "\t" {
                let count = tabstop - pos % tabstop;
                fragments.push(Fragment::new(self.style.clone(), self.char1.to_string()));
                fragments.push(Fragment::new(self.style.clone(), self.char2.to_string().repeat(count - 1)));
                pos += count;
            } else {
                fragments.push(fragment);
                pos += 1;
            }
        }
        positions.push(pos);
        // The cursor may sit right after the line.
        positions.push(pos + 1);

        let char_count = positions.len() - 2;
        let reversed: HashMap<usize, usize> = positions.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        Transformation::with_maps(
            fragments,
            Rc::new(move |i| positions.get(i).copied().unwrap_or(pos + i - char_count)),
            Rc::new(move |display| {
                (0..=display)
                    .rev()
                    .find_map(|d| reversed.get(&d).copied())
                    .unwrap_or(0)
            }),
        )
    }
}

/// Applies a processor only while a filter holds.
pub struct ConditionalProcessor {
    processor: SharedProcessor,
    filter: Filter,
    enabled: Cell<bool>,
}

impl fmt::Debug for ConditionalProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalProcessor")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl ConditionalProcessor {
    /// Wraps `processor`.
    pub fn new(processor: impl Processor + 'static, filter: Filter) -> Self {
        Self::from_shared(Rc::new(processor), filter)
    }

    /// Wraps a shared processor.
    pub fn from_shared(processor: SharedProcessor, filter: Filter) -> Self {
        Self {
            processor,
            filter,
            enabled: Cell::new(false),
        }
    }
}

impl Processor for ConditionalProcessor {
    fn apply_transformation(&self, ti: &TransformationInput<'_>) -> Transformation {
        if self.enabled.get() {
            self.processor.apply_transformation(ti)
        } else {
            Transformation::new(ti.fragments.to_vec())
        }
    }

    fn refresh(&self, ctx: &AppContext) {
        let enabled = self.filter.eval(ctx);
        self.enabled.set(enabled);
        if enabled {
            self.processor.refresh(ctx);
        }
    }
}

/// The processors every buffer control runs before its own.
pub fn default_input_processors() -> Vec<SharedProcessor> {
    vec![
        Rc::new(HighlightSearchProcessor::new()),
        Rc::new(HighlightSearchProcessor::incremental()),
        Rc::new(HighlightSelectionProcessor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use pretty_assertions::assert_eq;
    use quill_edit::{SelectionState, SelectionType};

    fn run(processor: &dyn Processor, state: &ControlState, lineno: usize) -> Transformation {
        let line = state.document.lines()[lineno].to_string();
        let fragments = vec![Fragment::plain(line)];
        processor.apply_transformation(&TransformationInput {
            state,
            lineno,
            source_to_display: &|i| i,
            fragments: &fragments,
            width: 80,
            height: 24,
        })
    }

    fn styles(t: &Transformation) -> Vec<String> {
        t.fragments.iter().map(|f| f.style.trim().to_string()).collect()
    }

    #[test]
    fn test_before_input_shifts_first_line() {
        let ctx = test_context();
        let processor = BeforeInput::new(">> ", "class:p");
        processor.refresh(&ctx);
        let state = ControlState::for_document(Document::new("ab\ncd"));

        let first = run(&processor, &state, 0);
        assert_eq!(fragment_list_to_text(&first.fragments), ">> ab");
        assert_eq!((first.source_to_display)(1), 4);
        assert_eq!((first.display_to_source)(4), 1);

        let second = run(&processor, &state, 1);
        assert_eq!((second.source_to_display)(1), 1);
    }

    #[test]
    fn test_search_highlight_marks_current_match() {
        let mut state = ControlState::for_document(Document::with_cursor("abcab", 3));
        state.search_text = "ab".into();
        let t = run(&HighlightSearchProcessor::new(), &state, 0);
        assert_eq!(
            styles(&t),
            vec!["class:search", "class:search", "", "class:search.current", "class:search.current"]
        );
    }

    #[test]
    fn test_search_highlight_ignore_case() {
        let mut state = ControlState::for_document(Document::with_cursor("xAB", 0));
        state.incsearch_text = "ab".into();
        state.search_ignore_case = true;
        let t = run(&HighlightSearchProcessor::incremental(), &state, 0);
        assert_eq!(styles(&t), vec!["", "class:incsearch", "class:incsearch"]);
    }

    #[test]
    fn test_selection_highlight() {
        let selection = SelectionState::new(1, SelectionType::Characters);
        let document = Document::with_cursor("abcd", 3).with_selection(Some(selection));
        let t = run(&HighlightSelectionProcessor, &ControlState::for_document(document), 0);
        assert_eq!(styles(&t), vec!["", "class:selected", "class:selected", ""]);
    }

    #[test]
    fn test_password_masks_text() {
        let t = run(&PasswordProcessor::default(), &ControlState::for_document(Document::new("secret")), 0);
        assert_eq!(fragment_list_to_text(&t.fragments), "******");
    }

    #[test]
    fn test_tabs_expand_to_tab_stop() {
        let t = run(&TabsProcessor::default(), &ControlState::for_document(Document::new("a\tb")), 0);
        assert_eq!(fragment_list_to_text(&t.fragments), "a|\u{2508}\u{2508}b");
        assert_eq!((t.source_to_display)(2), 4);
        assert_eq!((t.display_to_source)(3), 1);
        assert_eq!((t.display_to_source)(4), 2);
    }

    #[test]
    fn test_suggestion_only_at_end() {
        let mut state = ControlState::for_document(Document::new("git"));
        state.suggestion = Some(" status".into());
        let t = run(&AppendAutoSuggestion::default(), &state, 0);
        assert_eq!(fragment_list_to_text(&t.fragments), "git status");

        state.document = Document::with_cursor("git", 1);
        let t = run(&AppendAutoSuggestion::default(), &state, 0);
        assert_eq!(fragment_list_to_text(&t.fragments), "git");
    }

    #[test]
    fn test_merged_maps_compose() {
        let ctx = test_context();
        let merged = merge_processors(vec![
            Rc::new(BeforeInput::new("> ", "")),
            Rc::new(TabsProcessor::default()),
        ]);
        merged.refresh(&ctx);
        let t = run(merged.as_ref(), &ControlState::for_document(Document::new("\tx")), 0);
        assert_eq!(fragment_list_to_text(&t.fragments), "> |\u{2508}x");
        assert_eq!((t.source_to_display)(1), 4);
        assert_eq!((t.display_to_source)(4), 1);
    }

    #[test]
    fn test_conditional_follows_filter() {
        let ctx = test_context();
        let processor = ConditionalProcessor::new(PasswordProcessor::default(), Filter::Never);
        processor.refresh(&ctx);
        let t = run(&processor, &ControlState::for_document(Document::new("abc")), 0);
        assert_eq!(fragment_list_to_text(&t.fragments), "abc");
    }
}
