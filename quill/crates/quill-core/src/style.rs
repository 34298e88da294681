//! The style engine.
//!
//! Style strings are whitespace separated tokens:
//!
//! - `class:name` (or `class:a,b`) attaches style classes; dotted names such
//!   as `completion-menu.completion` also attach every prefix
//! - `fg:color`, `bg:color`, or a bare color for the foreground
//! - `bold`, `italic`, `underline`, `blink`, `reverse`, `hidden`, `strike`,
//!   `dim` and their `no`-prefixed negations
//! - `noinherit` resets everything accumulated so far
//!
//! A [`Style`] is an ordered list of `(selector, style string)` rules. When
//! a fragment's style string names classes, every rule whose selector is
//! satisfied by the classes seen so far is applied at that point; inline
//! tokens apply where they appear, so tokens further right win.
//!
//! ```
//! use quill_core::color::Color;
//! use quill_core::style::Style;
//!
//! let style = Style::from_rules([("prompt", "bold #ff0000"), ("prompt.arg", "italic")]).unwrap();
//! let attrs = style.attrs_for_style_str("class:prompt.arg");
//! assert!(attrs.bold() && attrs.italic());
//! assert_eq!(attrs.fg, Color::Rgb(255, 0, 0));
//! ```

use crate::color::Color;
use crate::error::{StyleError, StyleResult};
use bitflags::bitflags;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;

bitflags! {
    /// Text decoration attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        /// Bold/bright text.
        const BOLD      = 0b0000_0001;
        /// Dim/faint text.
        const DIM       = 0b0000_0010;
        /// Italic text.
        const ITALIC    = 0b0000_0100;
        /// Underlined text.
        const UNDERLINE = 0b0000_1000;
        /// Blinking text.
        const BLINK     = 0b0001_0000;
        /// Reverse video.
        const REVERSE   = 0b0010_0000;
        /// Hidden text.
        const HIDDEN    = 0b0100_0000;
        /// Strikethrough text.
        const STRIKE    = 0b1000_0000;
    }
}

impl AttrFlags {
    /// SGR codes enabling these attributes, in ascending order.
    pub fn sgr_codes(self) -> SmallVec<[u8; 8]> {
        let table = [
            (Self::BOLD, 1),
            (Self::DIM, 2),
            (Self::ITALIC, 3),
            (Self::UNDERLINE, 4),
            (Self::BLINK, 5),
            (Self::REVERSE, 7),
            (Self::HIDDEN, 8),
            (Self::STRIKE, 9),
        ];
        table
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, code)| code)
            .collect()
    }

    fn from_token(name: &str) -> Option<Self> {
        match name {
            "bold" => Some(Self::BOLD),
            "dim" => Some(Self::DIM),
            "italic" => Some(Self::ITALIC),
            "underline" => Some(Self::UNDERLINE),
            "blink" => Some(Self::BLINK),
            "reverse" => Some(Self::REVERSE),
            "hidden" => Some(Self::HIDDEN),
            "strike" => Some(Self::STRIKE),
            _ => None,
        }
    }
}

/// Fully resolved attributes of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attrs {
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Decorations.
    pub flags: AttrFlags,
}

impl Attrs {
    /// Terminal defaults with no decoration.
    pub const DEFAULT: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
        flags: AttrFlags::empty(),
    };

    /// Returns whether bold is set.
    #[inline]
    pub fn bold(&self) -> bool {
        self.flags.contains(AttrFlags::BOLD)
    }

    /// Returns whether italic is set.
    #[inline]
    pub fn italic(&self) -> bool {
        self.flags.contains(AttrFlags::ITALIC)
    }

    /// Returns whether underline is set.
    #[inline]
    pub fn underline(&self) -> bool {
        self.flags.contains(AttrFlags::UNDERLINE)
    }

    /// Returns whether reverse video is set.
    #[inline]
    pub fn reverse(&self) -> bool {
        self.flags.contains(AttrFlags::REVERSE)
    }

    /// Returns whether the text is hidden.
    #[inline]
    pub fn hidden(&self) -> bool {
        self.flags.contains(AttrFlags::HIDDEN)
    }
}

/// Partially specified attributes; the unit of merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttrsPatch {
    /// Foreground, when specified.
    pub fg: Option<Color>,
    /// Background, when specified.
    pub bg: Option<Color>,
    /// Decorations switched on.
    pub set: AttrFlags,
    /// Decorations switched off.
    pub unset: AttrFlags,
}

impl AttrsPatch {
    /// A patch that resets everything to terminal defaults.
    pub const RESET: Self = Self {
        fg: Some(Color::Default),
        bg: Some(Color::Default),
        set: AttrFlags::empty(),
        unset: AttrFlags::all(),
    };

    /// Layers `over` on top of `self`; values in `over` win.
    pub fn merge(self, over: Self) -> Self {
        Self {
            fg: over.fg.or(self.fg),
            bg: over.bg.or(self.bg),
            set: (self.set - over.unset) | over.set,
            unset: (self.unset - over.set) | over.unset,
        }
    }

    /// Applies this patch to resolved attributes.
    pub fn apply(self, base: Attrs) -> Attrs {
        Attrs {
            fg: self.fg.unwrap_or(base.fg),
            bg: self.bg.unwrap_or(base.bg),
            flags: (base.flags - self.unset) | self.set,
        }
    }

    /// Parses a single inline token (anything but `class:`).
    ///
    /// Returns `Ok(None)` for tokens that carry no attributes, such as the
    /// bracketed markers used by controls (`[SetCursorPosition]`).
    pub fn parse_token(token: &str) -> StyleResult<Option<Self>> {
        let lower = token.to_ascii_lowercase();
        if lower.starts_with('[') || lower.is_empty() {
            return Ok(None);
        }
        if matches!(lower.as_str(), "roman" | "sans" | "mono") || lower.starts_with("border:") {
            return Ok(None);
        }
        if lower == "noinherit" {
            return Ok(Some(Self::RESET));
        }
        if let Some(flag) = AttrFlags::from_token(&lower) {
            return Ok(Some(Self {
                set: flag,
                ..Self::default()
            }));
        }
        if let Some(flag) = lower.strip_prefix("no").and_then(AttrFlags::from_token) {
            return Ok(Some(Self {
                unset: flag,
                ..Self::default()
            }));
        }
        if let Some(color) = lower.strip_prefix("bg:") {
            return Ok(Some(Self {
                bg: Some(parse_color_or_empty(color)?),
                ..Self::default()
            }));
        }
        let color = lower.strip_prefix("fg:").unwrap_or(&lower);
        match Color::parse(color) {
            Ok(color) => Ok(Some(Self {
                fg: Some(color),
                ..Self::default()
            })),
            Err(_) => Err(StyleError::UnknownToken(token.to_string())),
        }
    }
}

fn parse_color_or_empty(color: &str) -> StyleResult<Color> {
    if color.is_empty() {
        return Ok(Color::Default);
    }
    Ok(Color::parse(color)?)
}

/// Parses an inline style string (no classes) into one patch.
pub fn parse_style_str(style: &str) -> StyleResult<AttrsPatch> {
    let mut patch = AttrsPatch::default();
    for token in style.split_whitespace() {
        if token.starts_with("class:") {
            continue;
        }
        if let Some(p) = AttrsPatch::parse_token(token)? {
            patch = patch.merge(p);
        }
    }
    Ok(patch)
}

/// Expands `a.b.c` into `a`, `a.b`, `a.b.c`.
fn expand_class_name(name: &str) -> SmallVec<[String; 4]> {
    let mut out = SmallVec::new();
    let mut prefix = String::new();
    for (i, part) in name.split('.').enumerate() {
        if i > 0 {
            prefix.push('.');
        }
        prefix.push_str(part);
        out.push(prefix.clone());
    }
    out
}

#[derive(Debug, Clone)]
struct StyleRule {
    classes: SmallVec<[String; 2]>,
    patch: AttrsPatch,
}

/// An ordered set of class rules with a cache of resolved style strings.
pub struct Style {
    rules: Vec<StyleRule>,
    cache: Mutex<HashMap<String, Attrs>>,
}

impl Style {
    /// An empty style; every style string resolves to inline tokens only.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Builds a style from `(selector, style string)` rules.
    ///
    /// Selectors are whitespace separated class names that must all be
    /// present; the empty selector applies to everything.
    pub fn from_rules<I, S, T>(rules: I) -> StyleResult<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut style = Self::new();
        for (selector, value) in rules {
            style.push_rule(selector.as_ref(), value.as_ref())?;
        }
        Ok(style)
    }

    /// Appends a rule, builder style.
    pub fn with_rule(mut self, selector: &str, style: &str) -> StyleResult<Self> {
        self.push_rule(selector, style)?;
        Ok(self)
    }

    fn push_rule(&mut self, selector: &str, style: &str) -> StyleResult<()> {
        let classes = selector
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        let patch = parse_style_str(style)?;
        self.rules.push(StyleRule { classes, patch });
        self.cache.get_mut().clear();
        Ok(())
    }

    /// Concatenates the rules of several styles; later styles win.
    pub fn merged<'a>(styles: impl IntoIterator<Item = &'a Style>) -> Self {
        let rules = styles
            .into_iter()
            .flat_map(|s| s.rules.iter().cloned())
            .collect();
        Self {
            rules,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when the style has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolves a fragment style string against the rules.
    ///
    /// Unknown inline tokens are ignored here; use [`parse_style_str`] to
    /// validate user input up front.
    pub fn attrs_for_style_str(&self, style_str: &str) -> Attrs {
        if let Some(attrs) = self.cache.lock().get(style_str) {
            return *attrs;
        }
        let attrs = self.compute(style_str);
        self.cache.lock().insert(style_str.to_string(), attrs);
        attrs
    }

    fn compute(&self, style_str: &str) -> Attrs {
        let mut patch = AttrsPatch::default();
        for rule in self.rules.iter().filter(|r| r.classes.is_empty()) {
            patch = patch.merge(rule.patch);
        }

        let mut class_names: HashSet<String> = HashSet::new();
        for token in style_str.split_whitespace() {
            if let Some(classes) = token.strip_prefix("class:") {
                for name in classes.split(',').filter(|n| !n.is_empty()) {
                    for new_name in expand_class_name(&name.to_ascii_lowercase()) {
                        for rule in &self.rules {
                            let matches = rule.classes.iter().any(|c| *c == new_name)
                                && rule
                                    .classes
                                    .iter()
                                    .all(|c| *c == new_name || class_names.contains(c));
                            if matches {
                                patch = patch.merge(rule.patch);
                            }
                        }
                        class_names.insert(new_name);
                    }
                }
            } else if let Ok(Some(inline)) = AttrsPatch::parse_token(token) {
                patch = patch.merge(inline);
            }
        }
        patch.apply(Attrs::DEFAULT)
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Style {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Style")
            .field("rules", &self.rules.len())
            .finish()
    }
}

const DEFAULT_UI_RULES: &[(&str, &str)] = &[
    // Search highlighting
    ("search", "bg:ansibrightyellow ansiblack"),
    ("search.current", ""),
    ("incsearch", ""),
    ("incsearch.current", "reverse"),
    ("selected", "reverse"),
    ("cursor-column", "bg:#dddddd"),
    ("cursor-line", "underline"),
    ("matching-bracket.other", "#000000 bg:#aacccc"),
    ("matching-bracket.cursor", "#ff8888 bg:#880000"),
    // Margins
    ("line-number", "#888888"),
    ("line-number.current", "bold"),
    ("tilde", "#8888ff"),
    // Prompt and toolbars
    ("prompt", ""),
    ("prompt.arg", "noinherit"),
    ("prompt.search", "noinherit"),
    ("search-toolbar", "bold"),
    ("search-toolbar.text", "nobold"),
    ("system-toolbar", "bold"),
    ("system-toolbar.text", "nobold"),
    ("arg-toolbar", "bold"),
    ("arg-toolbar.text", "nobold"),
    ("validation-toolbar", "bg:#550000 #ffffff"),
    ("window-too-small", "bg:#550000 #ffffff"),
    ("bottom-toolbar", "reverse"),
    ("placeholder", "#888888"),
    ("auto-suggestion", "#666666"),
    ("trailing-whitespace", "#999999"),
    ("tab", "#999999"),
    ("aborting", "#888888 bg:default noreverse noitalic nounderline noblink"),
    ("exiting", "#888888 bg:default noreverse noitalic nounderline noblink"),
    ("control-character", "ansiblue"),
    // Completion menus
    ("completion-menu", "bg:#bbbbbb #000000"),
    ("completion-menu.completion", ""),
    ("completion-menu.completion.current", "fg:#888888 bg:#ffffff reverse"),
    ("completion-menu.meta.completion", "bg:#999999 #000000"),
    ("completion-menu.meta.completion.current", "bg:#aaaaaa #000000"),
    ("completion-menu.multi-column-meta", "bg:#aaaaaa #000000"),
    ("completion-menu.completion fuzzymatch.outside", "fg:#444444"),
    ("completion-menu.completion fuzzymatch.inside", "bold"),
    ("completion-menu.completion fuzzymatch.inside.character", "underline"),
    ("completion-menu.completion.current fuzzymatch.outside", "fg:default"),
    ("completion-menu.completion.current fuzzymatch.inside", "nobold"),
    ("readline-like-completions.completion fuzzymatch.outside", "#888888"),
    ("readline-like-completions.completion fuzzymatch.inside.character", "underline"),
    ("scrollbar.background", "bg:#aaaaaa"),
    ("scrollbar.button", "bg:#444444"),
    ("scrollbar.arrow", "noinherit bold"),
    // Widgets
    ("frame.label", "bold"),
    ("shadow", "bg:#222222"),
    ("button.arrow", "bold"),
    ("button.focused", "bg:#aa0000 #ffffff"),
    ("checkbox-selected", "bold"),
    ("radio-selected", "bold"),
    ("menu-bar", "bg:#aaaaaa #000000"),
    ("menu-bar.selected-item", "bg:#ffffff #000000"),
    ("menu", "bg:#888888 #ffffff"),
    ("menu.border", "#aaaaaa"),
    ("menu.border shadow", "#444444"),
    ("dialog", "bg:#4444ff"),
    ("dialog.body", "bg:#ffffff #000000"),
    ("dialog shadow", "bg:#000088"),
    ("text-area.placeholder", "#888888"),
    // Progress bars
    ("progress-bar", "bg:#000088"),
    ("progress-bar.used", "bg:#ff0000"),
    ("progressbar title", "underline"),
    ("progressbar label", "ansiblue"),
    ("progressbar percentage", "ansigreen"),
    ("progressbar bar-a", "bold ansigreen"),
    ("progressbar bar-b", "bold ansigreen"),
    ("progressbar bar-c", "ansibrightblack"),
    ("progressbar current", "ansigreen"),
    ("progressbar total", "ansigreen"),
    ("progressbar time-elapsed", "ansicyan"),
    ("progressbar time-left", "ansicyan"),
    ("progressbar iterations-per-second", "ansicyan"),
    ("progressbar spinning-wheel", "bold"),
];

static DEFAULT_UI_STYLE: Lazy<Style> = Lazy::new(|| {
    let mut style = Style::new();
    for (selector, value) in DEFAULT_UI_RULES {
        if let Err(err) = style.push_rule(selector, value) {
            debug_assert!(false, "invalid built-in style rule {selector}: {err}");
        }
    }
    style
});

/// The built-in rules for every class used by layouts and widgets.
pub fn default_ui_style() -> &'static Style {
    &DEFAULT_UI_STYLE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::AnsiColor;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inline_tokens() {
        let style = Style::new();
        let attrs = style.attrs_for_style_str("bold fg:ansired bg:#000000");
        assert!(attrs.bold());
        assert_eq!(attrs.fg, Color::Ansi(AnsiColor::Red));
        assert_eq!(attrs.bg, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn test_right_most_token_wins() {
        let style = Style::new();
        let attrs = style.attrs_for_style_str("bold nobold ansired ansiblue");
        assert!(!attrs.bold());
        assert_eq!(attrs.fg, Color::Ansi(AnsiColor::Blue));
    }

    #[test]
    fn test_class_cascade_and_dotted_names() {
        let style = Style::from_rules([
            ("menu", "bg:ansiblue"),
            ("menu.item", "ansiwhite"),
            ("menu.item.current", "reverse"),
        ])
        .unwrap();
        let attrs = style.attrs_for_style_str("class:menu.item.current");
        assert_eq!(attrs.bg, Color::Ansi(AnsiColor::Blue));
        assert_eq!(attrs.fg, Color::Ansi(AnsiColor::White));
        assert!(attrs.reverse());
    }

    #[test]
    fn test_multi_class_selector_requires_all() {
        let style = Style::from_rules([("dialog shadow", "bg:ansired")]).unwrap();
        assert_eq!(style.attrs_for_style_str("class:shadow").bg, Color::Default);
        assert_eq!(
            style.attrs_for_style_str("class:dialog class:shadow").bg,
            Color::Ansi(AnsiColor::Red)
        );
        assert_eq!(
            style.attrs_for_style_str("class:shadow,dialog").bg,
            Color::Ansi(AnsiColor::Red)
        );
    }

    #[test]
    fn test_inline_overrides_class_to_its_left() {
        let style = Style::from_rules([("a", "ansired")]).unwrap();
        assert_eq!(
            style.attrs_for_style_str("class:a ansigreen").fg,
            Color::Ansi(AnsiColor::Green)
        );
        assert_eq!(
            style.attrs_for_style_str("ansigreen class:a").fg,
            Color::Ansi(AnsiColor::Red)
        );
    }

    #[test]
    fn test_noinherit_resets() {
        let style = Style::from_rules([("", "bold ansired")]).unwrap();
        let attrs = style.attrs_for_style_str("noinherit italic");
        assert!(!attrs.bold());
        assert!(attrs.italic());
        assert_eq!(attrs.fg, Color::Default);
    }

    #[test]
    fn test_strict_parse_reports_unknown_tokens() {
        assert!(matches!(
            Style::from_rules([("x", "boldish")]),
            Err(StyleError::UnknownToken(_))
        ));
        assert!(matches!(
            parse_style_str("bg:#12"),
            Err(StyleError::Color(_))
        ));
        assert!(parse_style_str("[SetCursorPosition] bold").is_ok());
    }

    #[test]
    fn test_merged_styles_later_wins() {
        let a = Style::from_rules([("x", "ansired")]).unwrap();
        let b = Style::from_rules([("x", "ansigreen")]).unwrap();
        let merged = Style::merged([&a, &b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.attrs_for_style_str("class:x").fg,
            Color::Ansi(AnsiColor::Green)
        );
    }

    #[test]
    fn test_cache_returns_same_result() {
        let style = default_ui_style();
        let first = style.attrs_for_style_str("class:validation-toolbar");
        let second = style.attrs_for_style_str("class:validation-toolbar");
        assert_eq!(first, second);
        assert_eq!(first.bg, Color::Rgb(0x55, 0, 0));
    }

    #[test]
    fn test_sgr_codes_order() {
        let flags = AttrFlags::UNDERLINE | AttrFlags::BOLD | AttrFlags::STRIKE;
        assert_eq!(flags.sgr_codes().as_slice(), &[1, 4, 9]);
    }
}
