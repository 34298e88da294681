//! One-shot questions: [`prompt`], [`confirm`] and the configurable
//! [`Question`].
//!
//! A question shows its default in brackets, converts the answer to a
//! [`ValueType`] and asks again until the answer converts and validates.
//! Ctrl-C and Ctrl-D end the question with [`AppError::Abort`].

use crate::session::{PromptOptions, PromptSession};
use quill_app::{AppError, KeyBindings, Result};
use quill_core::FormattedText;
use quill_input::{Input, Key};
use quill_output::Output;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Message of the [`AppError::Abort`] raised when the user cancels.
pub const ABORTED: &str = "You've aborted input";

/// Suffix after the question text unless configured otherwise.
pub const DEFAULT_SUFFIX: &str = ":> ";

// === Values ===

/// The type an answer is converted to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueType {
    /// The text as typed.
    #[default]
    Text,
    /// A signed integer.
    Integer,
    /// A floating point number.
    Float,
    /// `yes`/`no` and the usual spellings.
    Bool,
    /// One of a fixed set of strings.
    Choice(Vec<String>),
}

/// A converted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// See [`ValueType::Text`].
    Text(String),
    /// See [`ValueType::Integer`].
    Integer(i64),
    /// See [`ValueType::Float`].
    Float(f64),
    /// See [`ValueType::Bool`].
    Bool(bool),
    /// See [`ValueType::Choice`].
    Choice(String),
}

impl Value {
    /// The value as text; numbers and booleans are formatted.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// The integer, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The number, if this is an integer or a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Choice(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// An answer that does not convert to the requested type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Not an integer.
    #[error("'{0}' is not a valid integer.")]
    Integer(String),
    /// Not a number.
    #[error("'{0}' is not a valid floating point value.")]
    Float(String),
    /// Not a boolean spelling.
    #[error("'{0}' is not a valid boolean.")]
    Bool(String),
    /// Not one of the choices.
    #[error("'{value}' is not one of {choices}.")]
    Choice {
        /// The answer.
        value: String,
        /// The choices, quoted and comma separated.
        choices: String,
    },
}

impl ValueType {
    /// Converts an answer. Surrounding whitespace is ignored for everything
    /// but [`ValueType::Text`].
    pub fn convert(&self, text: &str) -> std::result::Result<Value, ConversionError> {
        let trimmed = text.trim();
        match self {
            Self::Text => Ok(Value::Text(text.to_string())),
            Self::Integer => trimmed
                .parse()
                .map(Value::Integer)
                .map_err(|_| ConversionError::Integer(text.to_string())),
            Self::Float => trimmed
                .parse()
                .map(Value::Float)
                .map_err(|_| ConversionError::Float(text.to_string())),
            Self::Bool => match trimmed.to_lowercase().as_str() {
                "1" | "true" | "t" | "yes" | "y" | "on" => Ok(Value::Bool(true)),
                "0" | "false" | "f" | "no" | "n" | "off" => Ok(Value::Bool(false)),
                _ => Err(ConversionError::Bool(text.to_string())),
            },
            Self::Choice(choices) => {
                if choices.iter().any(|c| c == trimmed) {
                    Ok(Value::Choice(trimmed.to_string()))
                } else {
                    Err(ConversionError::Choice {
                        value: text.to_string(),
                        choices: choices.iter().map(|c| format!("'{c}'")).collect::<Vec<_>>().join(", "),
                    })
                }
            }
        }
    }
}

// === Question ===

type ValueCheck = Rc<dyn Fn(&Value) -> std::result::Result<(), String>>;

/// A question asked until it gets a usable answer.
///
/// ```no_run
/// use quill_prompt::ask::{Question, ValueType};
///
/// # fn main() -> quill_app::Result<()> {
/// let port = Question::new("Port").with_type(ValueType::Integer).with_default("8080").ask()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Question {
    text: String,
    default: Option<String>,
    hide: bool,
    confirmation: bool,
    value_type: ValueType,
    suffix: String,
    show_default: bool,
    show_choices: bool,
    validator: Option<ValueCheck>,
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("text", &self.text)
            .field("default", &self.default)
            .field("hide", &self.hide)
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}

impl Question {
    /// A question with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            default: None,
            hide: false,
            confirmation: false,
            value_type: ValueType::Text,
            suffix: DEFAULT_SUFFIX.to_string(),
            show_default: true,
            show_choices: true,
            validator: None,
        }
    }

    /// Answer used when the input is empty.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Hides the typed characters.
    pub fn with_hide(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }

    /// Asks a second time and requires both answers to match.
    pub fn with_confirmation(mut self, confirmation: bool) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Sets the type the answer is converted to.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Replaces the `":> "` suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Shows or hides `[default]` in the prompt.
    pub fn show_default(mut self, show: bool) -> Self {
        self.show_default = show;
        self
    }

    /// Shows or hides `(a, b)` for choice questions.
    pub fn show_choices(mut self, show: bool) -> Self {
        self.show_choices = show;
        self
    }

    /// Checks converted answers; `Err` holds the message shown to the user.
    pub fn with_validator(mut self, check: impl Fn(&Value) -> std::result::Result<(), String> + 'static) -> Self {
        self.validator = Some(Rc::new(check));
        self
    }

    /// The prompt as displayed, e.g. `Colour (red, blue) [red]:> `.
    pub fn prompt_text(&self) -> String {
        let mut text = self.text.clone();
        if let (true, ValueType::Choice(choices)) = (self.show_choices, &self.value_type) {
            text.push_str(&format!(" ({})", choices.join(", ")));
        }
        if let (true, Some(default)) = (self.show_default, &self.default) {
            if !default.is_empty() {
                text.push_str(&format!(" [{default}]"));
            }
        }
        text.push_str(&self.suffix);
        text
    }

    /// Asks on the terminal.
    #[cfg(unix)]
    pub fn ask(&self) -> Result<Value> {
        let input = quill_input::create_input()?;
        self.ask_with(input, quill_output::create_output())
    }

    /// Asks reading `input` and drawing to `output`.
    pub fn ask_with(&self, input: Box<dyn Input>, output: Box<dyn Output>) -> Result<Value> {
        let options = PromptOptions::new(self.prompt_text()).with_password(self.hide);
        let mut session = PromptSession::with_io(options, input, output);
        self.ask_in(&mut session)
    }

    fn ask_in(&self, session: &mut PromptSession) -> Result<Value> {
        loop {
            session.set_message(self.prompt_text());
            let Some(text) = self.read(session)? else {
                continue;
            };
            let value = match self.check(&text) {
                Ok(value) => value,
                Err(message) => {
                    self.report(session, &message);
                    continue;
                }
            };
            if !self.confirmation {
                return Ok(value);
            }
            session.set_message("Repeat for confirmation: ");
            let Some(repeated) = self.read(session)? else {
                continue;
            };
            if repeated == text {
                return Ok(value);
            }
            session.print_formatted_text("ERROR: The two entered values do not match\n");
        }
    }

    /// One answer, with the default filled in; `None` asks again.
    fn read(&self, session: &mut PromptSession) -> Result<Option<String>> {
        let text = session.prompt().map_err(|e| match e {
            AppError::KeyboardInterrupt | AppError::Eof => AppError::Abort(ABORTED.to_string()),
            other => other,
        })?;
        if !text.is_empty() {
            return Ok(Some(text));
        }
        Ok(self.default.clone())
    }

    fn check(&self, text: &str) -> std::result::Result<Value, String> {
        let value = self.value_type.convert(text).map_err(|e| e.to_string())?;
        if let Some(validator) = &self.validator {
            validator(&value)?;
        }
        Ok(value)
    }

    fn report(&self, session: &mut PromptSession, message: &str) {
        // Echoing the rejected value would reveal hidden input.
        let line = if self.hide {
            "ERROR: the value you entered was invalid\n".to_string()
        } else {
            format!("Error: {message}\n")
        };
        session.print_formatted_text(FormattedText::styled("class:validation-toolbar", line));
    }
}

/// Asks for a line of text on the terminal.
#[cfg(unix)]
pub fn prompt(text: &str) -> Result<String> {
    Question::new(text).ask().map(|v| v.as_text())
}

// === Confirm ===

/// A yes/no question answered with a single key.
#[derive(Debug, Clone)]
pub struct Confirm {
    message: String,
    suffix: String,
    default: Option<bool>,
}

impl Confirm {
    /// A question with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suffix: " (y/n) ".to_string(),
            default: None,
        }
    }

    /// Answer given by Enter; without one, Enter does nothing.
    pub fn with_default(mut self, default: bool) -> Self {
        self.default = Some(default);
        self
    }

    /// Replaces the `" (y/n) "` suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Asks on the terminal.
    #[cfg(unix)]
    pub fn ask(&self) -> Result<bool> {
        let input = quill_input::create_input()?;
        self.ask_with(input, quill_output::create_output())
    }

    /// Asks reading `input` and drawing to `output`.
    pub fn ask_with(&self, input: Box<dyn Input>, output: Box<dyn Output>) -> Result<bool> {
        let options = PromptOptions::new(format!("{}{}", self.message, self.suffix))
            .with_key_bindings(self.key_bindings().shared());
        let mut session = PromptSession::with_io(options, input, output);
        session.run::<bool>()
    }

    fn key_bindings(&self) -> KeyBindings {
        let mut kb = KeyBindings::new();
        for (key, answer) in [('y', true), ('Y', true), ('n', false), ('N', false)] {
            kb.add(key, move |event| {
                if let Some(b) = event.current_buffer_mut() {
                    b.set_text(if answer { "y" } else { "n" });
                }
                event.ctx.exit_with(answer);
                Ok(())
            });
        }
        let default = self.default;
        kb.add(Key::Enter, move |event| {
            if let Some(answer) = default {
                event.ctx.exit_with(answer);
            }
            Ok(())
        });
        // Any other key is ignored.
        kb.add(Key::Any, |_| Ok(()));
        kb
    }
}

/// Asks a yes/no question on the terminal.
#[cfg(unix)]
pub fn confirm(message: &str) -> Result<bool> {
    Confirm::new(message).ask()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_convert_integer() {
        assert_eq!(ValueType::Integer.convert(" 42 "), Ok(Value::Integer(42)));
        assert_eq!(
            ValueType::Integer.convert("4x").unwrap_err().to_string(),
            "'4x' is not a valid integer."
        );
    }

    #[test]
    fn test_convert_bool_spellings() {
        for yes in ["y", "YES", "on", "1", "True"] {
            assert_eq!(ValueType::Bool.convert(yes), Ok(Value::Bool(true)), "{yes}");
        }
        for no in ["n", "off", "0", "False"] {
            assert_eq!(ValueType::Bool.convert(no), Ok(Value::Bool(false)), "{no}");
        }
        assert!(ValueType::Bool.convert("maybe").is_err());
    }

    #[test]
    fn test_convert_choice() {
        let colours = ValueType::Choice(vec!["red".into(), "blue".into()]);
        assert_eq!(colours.convert("blue"), Ok(Value::Choice("blue".into())));
        assert_eq!(
            colours.convert("green").unwrap_err().to_string(),
            "'green' is not one of 'red', 'blue'."
        );
    }

    #[test]
    fn test_text_keeps_whitespace() {
        assert_eq!(ValueType::Text.convert(" a "), Ok(Value::Text(" a ".into())));
    }

    #[test]
    fn test_prompt_text() {
        let q = Question::new("Colour")
            .with_type(ValueType::Choice(vec!["red".into(), "blue".into()]))
            .with_default("red");
        assert_eq!(q.prompt_text(), "Colour (red, blue) [red]:> ");
        assert_eq!(q.show_default(false).show_choices(false).prompt_text(), "Colour:> ");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::Bool(true).as_integer(), None);
        assert_eq!(Value::Float(1.5).as_text(), "1.5");
    }

    #[test]
    fn test_check_runs_validator_after_conversion() {
        let q = Question::new("Port")
            .with_type(ValueType::Integer)
            .with_validator(|v| match v.as_integer() {
                Some(n) if (1..=65535).contains(&n) => Ok(()),
                _ => Err("out of range".to_string()),
            });
        assert_eq!(q.check("80"), Ok(Value::Integer(80)));
        assert_eq!(q.check("0"), Err("out of range".to_string()));
        assert_eq!(q.check("x"), Err("'x' is not a valid integer.".to_string()));
    }
}
