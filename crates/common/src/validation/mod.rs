// Validation Module - declarative per-field rules checked before any network call
use std::fmt;

use serde::Serialize;

mod object;
mod validators;

pub use object::ObjectValidator;
pub use validators::{IntegerValidator, ListValidator, StringValidator};

/// Type alias for validation results
pub type ValidationResult<T> = Result<T, ValidationException>;

/// Rule name reported when a required value is absent
pub const RULE_REQUIRED: &str = "required";

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field path, e.g. `vin` or `parts[2]`
    pub field: String,
    /// Human readable message
    pub message: String,
    /// Offending value rendered as text, absent when the value itself was
    /// missing
    pub value: Option<String>,
    /// Name of the rule that failed (`required`, `min_length`, `pattern`, ...)
    pub rule: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        value: Option<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), message: message.into(), value, rule: rule.into() }
    }

    /// Error for a required field with no value
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{field} is required");
        Self { field, message, value: None, rule: RULE_REQUIRED.to_string() }
    }

    /// Re-root this error under a parent field
    pub(crate) fn nested_under(mut self, parent: &str) -> Self {
        if !parent.is_empty() {
            self.field = format!("{parent}.{}", self.field);
        }
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregate of every rule that failed during one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationException {
    pub errors: Vec<ValidationError>,
}

impl ValidationException {
    /// Wrap a set of errors
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// `Ok(())` for an empty set, otherwise the aggregated exception
    pub fn check(errors: Vec<ValidationError>) -> ValidationResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::new(errors))
        }
    }

    /// Get error count
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Get errors for a specific field
    pub fn field_errors(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }
}

impl fmt::Display for ValidationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "Validation error with no specific field errors"),
            [single] => write!(f, "Validation failed: {single}"),
            many => {
                write!(f, "Validation failed with {} errors: ", many.len())?;
                for (i, error) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationException {}

/// A reusable rule set for one kind of value
///
/// `value` is `None` when the field is absent. A required validator reports a
/// single `required` error for an absent value and skips its other rules; an
/// optional validator reports nothing.
pub trait Validator<T: ?Sized> {
    /// Check `value` and return every failed rule
    fn validate(&self, value: Option<&T>, field: &str) -> Vec<ValidationError>;

    /// Check `value` and fail once with all errors aggregated
    fn validate_and_throw(&self, value: Option<&T>, field: &str) -> ValidationResult<()> {
        ValidationException::check(self.validate(value, field))
    }
}
