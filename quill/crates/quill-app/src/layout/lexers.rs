//! Syntax highlighting for buffer controls.

use quill_core::Fragment;
use quill_edit::Document;
use regex::Regex;
use std::fmt;
use std::rc::Rc;

/// Returns the styled fragments of one line.
pub type LineLexer = Box<dyn Fn(usize) -> Vec<Fragment>>;

/// Turns a document into styled lines.
pub trait Lexer {
    /// Prepares a document; the returned closure styles one line by number.
    fn lex_document(&self, document: &Document) -> LineLexer;
}

/// A shared lexer.
pub type SharedLexer = Rc<dyn Lexer>;

fn document_lines(document: &Document) -> Rc<Vec<String>> {
    Rc::new(document.lines().into_iter().map(str::to_string).collect())
}

/// Styles every line with one style.
#[derive(Debug, Clone, Default)]
pub struct SimpleLexer {
    style: String,
}

impl SimpleLexer {
    /// A lexer applying `style`.
    pub fn new(style: impl Into<String>) -> Self {
        Self { style: style.into() }
    }
}

impl Lexer for SimpleLexer {
    fn lex_document(&self, document: &Document) -> LineLexer {
        let lines = document_lines(document);
        let style = self.style.clone();
        Box::new(move |i| {
            lines
                .get(i)
                .map(|line| vec![Fragment::new(style.clone(), line.clone())])
                .unwrap_or_default()
        })
    }
}

/// Styles tokens matched by regular expressions.
///
/// At each position the leftmost match wins; between matches starting at
/// the same column, the rule added first wins. Unmatched text gets the
/// default style.
#[derive(Clone, Default)]
pub struct RegexLexer {
    rules: Vec<(Regex, String)>,
    default_style: String,
}

impl fmt::Debug for RegexLexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexLexer")
            .field("rules", &self.rules.iter().map(|(r, s)| (r.as_str(), s)).collect::<Vec<_>>())
            .field("default_style", &self.default_style)
            .finish()
    }
}

impl RegexLexer {
    /// A lexer without rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token rule.
    pub fn rule(mut self, pattern: &str, style: impl Into<String>) -> Result<Self, regex::Error> {
        self.rules.push((Regex::new(pattern)?, style.into()));
        Ok(self)
    }

    /// Style for text no rule matches.
    pub fn with_default_style(mut self, style: impl Into<String>) -> Self {
        self.default_style = style.into();
        self
    }

    fn lex_line(&self, line: &str) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        let mut plain_start = 0;
        let mut pos = 0;
        while pos < line.len() {
            let best = self
                .rules
                .iter()
                .filter_map(|(re, style)| re.find_at(line, pos).map(|m| (m, style)))
                .filter(|(m, _)| !m.is_empty())
                .min_by_key(|(m, _)| m.start());
            let Some((m, style)) = best else {
                break;
            };
            if m.start() > plain_start {
                fragments.push(Fragment::new(self.default_style.clone(), &line[plain_start..m.start()]));
            }
            fragments.push(Fragment::new(style.clone(), m.as_str()));
            pos = m.end();
            plain_start = pos;
        }
        if plain_start < line.len() {
            fragments.push(Fragment::new(self.default_style.clone(), &line[plain_start..]));
        }
        fragments
    }
}

impl Lexer for RegexLexer {
    fn lex_document(&self, document: &Document) -> LineLexer {
        let lines = document_lines(document);
        let lexer = self.clone();
        Box::new(move |i| lines.get(i).map(|line| lexer.lex_line(line)).unwrap_or_default())
    }
}

/// Delegates to a lexer chosen at draw time; plain text when there is none.
#[derive(Clone)]
pub struct DynamicLexer {
    get: Rc<dyn Fn() -> Option<SharedLexer>>,
}

impl fmt::Debug for DynamicLexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLexer").finish_non_exhaustive()
    }
}

impl DynamicLexer {
    /// Wraps a lexer lookup.
    pub fn new(get: impl Fn() -> Option<SharedLexer> + 'static) -> Self {
        Self { get: Rc::new(get) }
    }
}

impl Lexer for DynamicLexer {
    fn lex_document(&self, document: &Document) -> LineLexer {
        match (self.get)() {
            Some(lexer) => lexer.lex_document(document),
            None => SimpleLexer::default().lex_document(document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(fragments: &[Fragment]) -> Vec<(&str, &str)> {
        fragments.iter().map(|f| (f.style.as_str(), f.text.as_str())).collect()
    }

    #[test]
    fn test_simple_lexer() {
        let lex = SimpleLexer::new("class:x").lex_document(&Document::new("a\nb"));
        assert_eq!(pairs(&lex(1)), vec![("class:x", "b")]);
        assert!(lex(5).is_empty());
    }

    #[test]
    fn test_regex_lexer_styles_tokens() {
        let lexer = RegexLexer::new()
            .rule(r"\d+", "class:number")
            .and_then(|l| l.rule(r"let|fn", "class:keyword"))
            .unwrap();
        let lex = lexer.lex_document(&Document::new("let x = 42;"));
        assert_eq!(
            pairs(&lex(0)),
            vec![("class:keyword", "let"), ("", " x = "), ("class:number", "42"), ("", ";")]
        );
    }

    #[test]
    fn test_dynamic_lexer_falls_back_to_plain() {
        let lex = DynamicLexer::new(|| None).lex_document(&Document::new("abc"));
        assert_eq!(pairs(&lex(0)), vec![("", "abc")]);
    }
}
