//! A small tag markup for formatted text.
//!
//! ```
//! use quill_core::markup::parse_markup;
//!
//! let text = parse_markup("<b>Hello</b> <red>world</red> &lt;3").unwrap();
//! assert_eq!(text.to_plain_text(), "Hello world <3");
//! assert_eq!(text[0].style, "class:b bold");
//! ```
//!
//! Every tag adds `class:<tag>` to the text it encloses. In addition:
//!
//! - `b`/`strong`, `i`/`em`, `u`, `s`/`strike` add the matching attribute
//! - a tag named after a color (`<red>`, `<ansiblue>`) sets the foreground
//! - `fg`, `bg` and `color` attributes set colors, on any tag
//! - `<style>` adds no class, only its attributes

use crate::color::Color;
use crate::error::MarkupError;
use crate::formatted_text::{Fragment, FormattedText};

/// Parses markup into formatted text.
pub fn parse_markup(input: &str) -> Result<FormattedText, MarkupError> {
    let mut out = FormattedText::new();
    let mut stack: Vec<(String, String)> = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => {
                let end = rest
                    .find('>')
                    .ok_or_else(|| MarkupError::InvalidTag(rest.to_string()))?;
                let tag = &rest[1..end];
                rest = &rest[end + 1..];
                if let Some(name) = tag.strip_prefix('/') {
                    let name = name.trim();
                    match stack.pop() {
                        Some((open, _)) if open == name => {}
                        _ => return Err(MarkupError::UnexpectedClose(name.to_string())),
                    }
                } else {
                    let self_closing = tag.ends_with('/');
                    let tag = tag.trim_end_matches('/');
                    let (name, style) = parse_open_tag(tag)?;
                    if !self_closing {
                        stack.push((name, style));
                    }
                }
            }
            Some(pos) => {
                push_text(&mut out, &stack, &rest[..pos]);
                rest = &rest[pos..];
            }
            None => {
                push_text(&mut out, &stack, rest);
                rest = "";
            }
        }
    }

    if let Some((name, _)) = stack.pop() {
        return Err(MarkupError::Unclosed(name));
    }
    Ok(out)
}

fn push_text(out: &mut FormattedText, stack: &[(String, String)], raw: &str) {
    if raw.is_empty() {
        return;
    }
    let style = stack
        .iter()
        .map(|(_, style)| style.as_str())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    out.push(Fragment::new(style, unescape(raw)));
}

fn parse_open_tag(tag: &str) -> Result<(String, String), MarkupError> {
    let tag = tag.trim();
    let (name, attrs) = match tag.find(char::is_whitespace) {
        Some(pos) => (&tag[..pos], &tag[pos..]),
        None => (tag, ""),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.') {
        return Err(MarkupError::InvalidTag(tag.to_string()));
    }

    let mut parts: Vec<String> = Vec::new();
    if name != "style" {
        parts.push(format!("class:{name}"));
    }
    match name {
        "b" | "strong" => parts.push("bold".into()),
        "i" | "em" => parts.push("italic".into()),
        "u" => parts.push("underline".into()),
        "s" | "strike" => parts.push("strike".into()),
        "reverse" | "blink" | "hidden" => parts.push(name.into()),
        other if Color::parse(other).is_ok() => parts.push(format!("fg:{other}")),
        _ => {}
    }

    for (key, value) in parse_attributes(attrs)? {
        let value = value.replace(' ', "");
        match key.as_str() {
            "fg" | "color" => parts.push(format!("fg:{value}")),
            "bg" => parts.push(format!("bg:{value}")),
            _ => {}
        }
    }
    Ok((name.to_string(), parts.join(" ")))
}

fn parse_attributes(mut rest: &str) -> Result<Vec<(String, String)>, MarkupError> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(attrs);
        }
        let eq = rest
            .find('=')
            .ok_or_else(|| MarkupError::InvalidTag(rest.to_string()))?;
        let key = rest[..eq].trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'');
        let value;
        if let Some(q) = quote {
            let close = rest[1..]
                .find(q)
                .ok_or_else(|| MarkupError::InvalidTag(rest.to_string()))?;
            value = rest[1..=close].to_string();
            rest = &rest[close + 2..];
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            value = rest[..end].to_string();
            rest = &rest[end..];
        }
        attrs.push((key, unescape(&value)));
    }
}

/// Replaces the five XML entities.
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escapes text for embedding in markup.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_tags() {
        let text = parse_markup("<b>a<i>b</i></b>c").unwrap();
        assert_eq!(text[0], Fragment::new("class:b bold", "a"));
        assert_eq!(
            text[1],
            Fragment::new("class:b bold class:i italic", "b")
        );
        assert_eq!(text[2], Fragment::new("", "c"));
    }

    #[test]
    fn test_color_tags_and_style_attributes() {
        let text = parse_markup("<red>x</red><style fg=\"ansiblue\" bg='#000'>y</style>").unwrap();
        assert_eq!(text[0].style, "class:red fg:red");
        assert_eq!(text[1].style, "fg:ansiblue bg:#000");
    }

    #[test]
    fn test_entities() {
        let text = parse_markup("a &amp; b &lt;c&gt;").unwrap();
        assert_eq!(text.to_plain_text(), "a & b <c>");
        assert_eq!(escape("<a & b>"), "&lt;a &amp; b&gt;");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_markup("<b>x</i>"),
            Err(MarkupError::UnexpectedClose("i".into()))
        );
        assert_eq!(parse_markup("<b>x"), Err(MarkupError::Unclosed("b".into())));
        assert!(matches!(parse_markup("<b"), Err(MarkupError::InvalidTag(_))));
    }

    #[test]
    fn test_self_closing_tag_adds_nothing() {
        let text = parse_markup("a<br/>b").unwrap();
        assert_eq!(text.to_plain_text(), "ab");
    }
}
