// Field Validators - Reusable validation components
use std::fmt::Display;

use super::{ValidationError, Validator};

/// Type alias for a boxed item validator (clippy::type_complexity)
type BoxedItemValidator<T> = Box<dyn Validator<T> + Send + Sync>;

/// String validator with length, pattern and allowed-value constraints
///
/// An empty string counts as absent, so a required validator rejects `""`
/// with a single `required` error.
#[derive(Debug, Clone, Default)]
pub struct StringValidator {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<regex::Regex>,
    allowed: Option<Vec<String>>,
}

impl StringValidator {
    /// Create a new string validator with no constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject absent or empty values
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set minimum length in characters
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Set maximum length in characters
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Set pattern to match
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(regex::Regex::new(pattern)?);
        Ok(self)
    }

    /// Restrict to a fixed set of values
    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

impl Validator<str> for StringValidator {
    fn validate(&self, value: Option<&str>, field: &str) -> Vec<ValidationError> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ if self.required => return vec![ValidationError::required(field)],
            _ => return Vec::new(),
        };

        let mut errors = Vec::new();
        let shown = || Some(value.to_string());
        let len = value.chars().count();

        if let Some(min) = self.min_length {
            if len < min {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must be at least {min} characters"),
                    shown(),
                    "min_length",
                ));
            }
        }

        if let Some(max) = self.max_length {
            if len > max {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must not exceed {max} characters"),
                    shown(),
                    "max_length",
                ));
            }
        }

        if let Some(ref pattern) = self.pattern {
            if !pattern.is_match(value) {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must match pattern: {}", pattern.as_str()),
                    shown(),
                    "pattern",
                ));
            }
        }

        if let Some(ref allowed) = self.allowed {
            if !allowed.iter().any(|a| a == value) {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must be one of: {}", allowed.join(", ")),
                    shown(),
                    "allowed_values",
                ));
            }
        }

        errors
    }
}

/// Range and allowed-value validator for integers
#[derive(Debug, Clone)]
pub struct IntegerValidator<N = i64> {
    required: bool,
    min: Option<N>,
    max: Option<N>,
    allowed: Option<Vec<N>>,
}

impl<N> Default for IntegerValidator<N> {
    fn default() -> Self {
        Self { required: false, min: None, max: None, allowed: None }
    }
}

impl<N> IntegerValidator<N>
where
    N: PartialOrd + Display + Copy,
{
    /// Create a new integer validator with no constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject absent values
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set minimum value
    pub fn min(mut self, min: N) -> Self {
        self.min = Some(min);
        self
    }

    /// Set maximum value
    pub fn max(mut self, max: N) -> Self {
        self.max = Some(max);
        self
    }

    /// Set both min and max
    pub fn between(self, min: N, max: N) -> Self {
        self.min(min).max(max)
    }

    /// Restrict to a fixed set of values
    pub fn allowed_values(mut self, values: impl IntoIterator<Item = N>) -> Self {
        self.allowed = Some(values.into_iter().collect());
        self
    }
}

impl<N> Validator<N> for IntegerValidator<N>
where
    N: PartialOrd + Display + Copy,
{
    fn validate(&self, value: Option<&N>, field: &str) -> Vec<ValidationError> {
        let Some(&value) = value else {
            return if self.required { vec![ValidationError::required(field)] } else { Vec::new() };
        };

        let mut errors = Vec::new();

        if let Some(min) = self.min {
            if value < min {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must be at least {min}"),
                    Some(value.to_string()),
                    "min",
                ));
            }
        }

        if let Some(max) = self.max {
            if value > max {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must not exceed {max}"),
                    Some(value.to_string()),
                    "max",
                ));
            }
        }

        if let Some(ref allowed) = self.allowed {
            if !allowed.iter().any(|a| *a == value) {
                let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must be one of: {}", listed.join(", ")),
                    Some(value.to_string()),
                    "allowed_values",
                ));
            }
        }

        errors
    }
}

/// List validator with length bounds and an optional per-item validator
///
/// Item errors are reported under `field[index]`. Every item is checked.
pub struct ListValidator<T: ?Sized> {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    item_validator: Option<BoxedItemValidator<T>>,
}

impl<T: ?Sized> std::fmt::Debug for ListValidator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListValidator")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("item_validator", &self.item_validator.as_ref().map(|_| "<dyn Validator>"))
            .finish()
    }
}

impl<T: ?Sized> Default for ListValidator<T> {
    fn default() -> Self {
        Self { required: false, min_length: None, max_length: None, item_validator: None }
    }
}

impl<T: ?Sized> ListValidator<T> {
    /// Create a new list validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject absent lists
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set minimum number of items
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Set maximum number of items
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Validate each item with `validator`
    ///
    /// # Example
    ///
    /// ```
    /// use groupvan_common::validation::{ListValidator, StringValidator, Validator};
    ///
    /// let skus: ListValidator<str> =
    ///     ListValidator::new().min_length(1).item_validator(StringValidator::new().max_length(4));
    /// let items = ["AB12".to_string(), "TOO-LONG".to_string()];
    /// let errors = skus.validate_items(Some(&items), "skus");
    /// assert_eq!(errors[0].field, "skus[1]");
    /// ```
    pub fn item_validator<V>(mut self, validator: V) -> Self
    where
        V: Validator<T> + Send + Sync + 'static,
    {
        self.item_validator = Some(Box::new(validator));
        self
    }

    /// Validate any slice whose items borrow as `T`
    pub fn validate_items<I>(&self, value: Option<&[I]>, field: &str) -> Vec<ValidationError>
    where
        I: std::borrow::Borrow<T>,
    {
        let Some(items) = value else {
            return if self.required { vec![ValidationError::required(field)] } else { Vec::new() };
        };

        let mut errors = Vec::new();
        let len = items.len();

        if let Some(min) = self.min_length {
            if len < min {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must contain at least {min} items"),
                    Some(len.to_string()),
                    "min_length",
                ));
            }
        }

        if let Some(max) = self.max_length {
            if len > max {
                errors.push(ValidationError::new(
                    field,
                    format!("{field} must not contain more than {max} items"),
                    Some(len.to_string()),
                    "max_length",
                ));
            }
        }

        if let Some(ref validator) = self.item_validator {
            for (index, item) in items.iter().enumerate() {
                let item_field = format!("{field}[{index}]");
                errors.extend(validator.validate(Some(item.borrow()), &item_field));
            }
        }

        errors
    }
}

/// Any slice whose items borrow as `T`, so `ListValidator<str>` accepts a
/// `Vec<String>` field
impl<T, I> Validator<[I]> for ListValidator<T>
where
    T: ?Sized,
    I: std::borrow::Borrow<T>,
{
    fn validate(&self, value: Option<&[I]>, field: &str) -> Vec<ValidationError> {
        self.validate_items(value, field)
    }
}
