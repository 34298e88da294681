//! Input validation.
//!
//! A [`Validator`] accepts or rejects a document. Any
//! `Fn(&Document) -> Result<(), ValidationError>` is a validator; for the
//! common "predicate on the text" case use [`from_callable`].

use crate::document::Document;
use crate::error::ValidationError;
use std::fmt;
use std::sync::Arc;

/// Accepts or rejects input.
pub trait Validator: Send + Sync {
    /// Returns an error describing why `document` is not acceptable.
    fn validate(&self, document: &Document) -> Result<(), ValidationError>;

    /// Whether validation should run on a worker thread.
    fn runs_in_background(&self) -> bool {
        false
    }
}

/// A validator shared between the buffer and worker threads.
pub type SharedValidator = Arc<dyn Validator>;

impl<F> Validator for F
where
    F: Fn(&Document) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        self(document)
    }
}

/// Validator built from a predicate on the text.
pub struct FnValidator {
    func: Box<dyn Fn(&str) -> bool + Send + Sync>,
    error_message: String,
    move_cursor_to_end: bool,
}

impl fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("error_message", &self.error_message)
            .field("move_cursor_to_end", &self.move_cursor_to_end)
            .finish_non_exhaustive()
    }
}

impl Validator for FnValidator {
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        if (self.func)(document.text()) {
            return Ok(());
        }
        let index = if self.move_cursor_to_end { document.len() } else { 0 };
        Err(ValidationError::new(index, self.error_message.clone()))
    }
}

/// A validator that rejects text for which `func` returns false, showing
/// `error_message`. The cursor moves to the end of the input on error if
/// `move_cursor_to_end` is set, otherwise to the start.
pub fn from_callable(
    func: impl Fn(&str) -> bool + Send + Sync + 'static,
    error_message: impl Into<String>,
    move_cursor_to_end: bool,
) -> FnValidator {
    FnValidator {
        func: Box::new(func),
        error_message: error_message.into(),
        move_cursor_to_end,
    }
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyValidator;

impl Validator for DummyValidator {
    fn validate(&self, _document: &Document) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Runs the wrapped validator on a worker thread.
pub struct ThreadedValidator {
    inner: SharedValidator,
}

impl fmt::Debug for ThreadedValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedValidator").finish_non_exhaustive()
    }
}

impl ThreadedValidator {
    /// Wraps `inner`.
    pub fn new(inner: impl Validator + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl Validator for ThreadedValidator {
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        self.inner.validate(document)
    }

    fn runs_in_background(&self) -> bool {
        true
    }
}

/// Delegates to whatever validator a closure returns at each call.
pub struct DynamicValidator {
    get: Box<dyn Fn() -> Option<SharedValidator> + Send + Sync>,
}

impl fmt::Debug for DynamicValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicValidator").finish_non_exhaustive()
    }
}

impl DynamicValidator {
    /// Creates the wrapper; `None` accepts everything.
    pub fn new(get: impl Fn() -> Option<SharedValidator> + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl Validator for DynamicValidator {
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        (self.get)().map_or(Ok(()), |v| v.validate(document))
    }

    fn runs_in_background(&self) -> bool {
        (self.get)().is_some_and(|v| v.runs_in_background())
    }
}

/// Validates only while a condition holds.
pub struct ConditionalValidator {
    inner: SharedValidator,
    condition: Box<dyn Fn() -> bool + Send + Sync>,
}

impl fmt::Debug for ConditionalValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalValidator").finish_non_exhaustive()
    }
}

impl ConditionalValidator {
    /// Wraps `inner`, enabled while `condition` returns true.
    pub fn new(inner: impl Validator + 'static, condition: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            condition: Box::new(condition),
        }
    }
}

impl Validator for ConditionalValidator {
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        if (self.condition)() {
            self.inner.validate(document)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_callable() {
        let digits = from_callable(|t| t.chars().all(|c| c.is_ascii_digit()), "digits only", true);
        assert!(digits.validate(&Document::new("123")).is_ok());
        let err = digits.validate(&Document::new("12a")).unwrap_err();
        assert_eq!(err, ValidationError::new(3, "digits only"));

        let at_start = from_callable(|t| !t.is_empty(), "empty", false);
        assert_eq!(at_start.validate(&Document::new("")).unwrap_err().cursor_position, 0);
    }

    #[test]
    fn test_closure_validator() {
        let first_non_digit = |doc: &Document| match doc.text().chars().position(|c| !c.is_ascii_digit()) {
            Some(i) => Err(ValidationError::new(i, "not a number")),
            None => Ok(()),
        };
        assert_eq!(first_non_digit.validate(&Document::new("12a")).unwrap_err().cursor_position, 2);
    }

    #[test]
    fn test_wrappers() {
        let reject = |_: &Document| -> Result<(), ValidationError> { Err(ValidationError::new(0, "no")) };
        let off = ConditionalValidator::new(reject, || false);
        assert!(off.validate(&Document::new("x")).is_ok());

        let dynamic = DynamicValidator::new(|| None);
        assert!(dynamic.validate(&Document::new("x")).is_ok());
        assert!(!dynamic.runs_in_background());

        let threaded = ThreadedValidator::new(reject);
        assert!(threaded.runs_in_background());
        assert!(threaded.validate(&Document::new("x")).is_err());
    }
}
