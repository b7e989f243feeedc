//! Record-level validation
//!
//! [`ObjectValidator`] runs a named validator against each field of a
//! record and returns the union of every error. Fields are never
//! short-circuited against each other, so a caller sees the complete error
//! set in one pass.

use super::{ValidationError, ValidationResult, Validator, ValidationException};

type FieldCheck<R> = Box<dyn Fn(&R) -> Vec<ValidationError> + Send + Sync>;

/// Validates a record field by field
pub struct ObjectValidator<R> {
    fields: Vec<(String, FieldCheck<R>)>,
}

impl<R> std::fmt::Debug for ObjectValidator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ObjectValidator").field("fields", &names).finish()
    }
}

impl<R> Default for ObjectValidator<R> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<R: 'static> ObjectValidator<R> {
    /// Create an empty object validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field: `accessor` extracts the value (or `None` when
    /// absent) and `validator` checks it
    ///
    /// ```
    /// use groupvan_common::validation::{IntegerValidator, ObjectValidator, StringValidator};
    ///
    /// struct Query { vin: Option<String>, limit: i64 }
    ///
    /// let validator = ObjectValidator::new()
    ///     .field("vin", |q: &Query| q.vin.as_deref(), StringValidator::new().required())
    ///     .field("limit", |q: &Query| Some(&q.limit), IntegerValidator::new().between(1, 100));
    ///
    /// let errors = validator.validate(&Query { vin: None, limit: 500 });
    /// assert_eq!(errors.len(), 2);
    /// ```
    pub fn field<T, A, V>(mut self, name: impl Into<String>, accessor: A, validator: V) -> Self
    where
        T: ?Sized + 'static,
        A: for<'a> Fn(&'a R) -> Option<&'a T> + Send + Sync + 'static,
        V: Validator<T> + Send + Sync + 'static,
    {
        let name = name.into();
        let field_name = name.clone();
        let check: FieldCheck<R> =
            Box::new(move |record: &R| validator.validate(accessor(record), &field_name));
        self.fields.push((name, check));
        self
    }

    /// Names of the registered fields, in registration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Run every field validator and collect all errors
    pub fn validate(&self, record: &R) -> Vec<ValidationError> {
        self.fields.iter().flat_map(|(_, check)| check(record)).collect()
    }

    /// Run every field validator and fail once with the aggregate
    pub fn validate_and_throw(&self, record: &R) -> ValidationResult<()> {
        ValidationException::check(self.validate(record))
    }
}

/// Nested records report their errors as `parent.child`
impl<R: 'static> Validator<R> for ObjectValidator<R> {
    fn validate(&self, value: Option<&R>, field: &str) -> Vec<ValidationError> {
        match value {
            Some(record) => ObjectValidator::validate(self, record)
                .into_iter()
                .map(|e| e.nested_under(field))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{IntegerValidator, ListValidator, StringValidator};

    struct Address {
        zip: String,
    }

    struct Order {
        po_number: Option<String>,
        quantity: i64,
        skus: Vec<String>,
        ship_to: Option<Address>,
    }

    fn order_validator() -> ObjectValidator<Order> {
        ObjectValidator::new()
            .field("po_number", |o: &Order| o.po_number.as_deref(), StringValidator::new().required())
            .field("quantity", |o: &Order| Some(&o.quantity), IntegerValidator::new().between(1, 99))
            .field(
                "skus",
                |o: &Order| Some(o.skus.as_slice()),
                ListValidator::<String>::new().min_length(1),
            )
            .field(
                "ship_to",
                |o: &Order| o.ship_to.as_ref(),
                ObjectValidator::new().field(
                    "zip",
                    |a: &Address| Some(a.zip.as_str()),
                    StringValidator::new().pattern(r"^\d{5}$").unwrap(),
                ),
            )
    }

    #[test]
    fn collects_errors_from_every_field() {
        let order = Order {
            po_number: None,
            quantity: 0,
            skus: Vec::new(),
            ship_to: Some(Address { zip: "ABCDE".into() }),
        };

        let errors = order_validator().validate(&order);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["po_number", "quantity", "skus", "ship_to.zip"]);
    }

    #[test]
    fn valid_record_passes() {
        let order = Order {
            po_number: Some("PO-1".into()),
            quantity: 3,
            skus: vec!["X1".into()],
            ship_to: None,
        };
        assert!(order_validator().validate_and_throw(&order).is_ok());
    }

    #[test]
    fn field_names_preserve_order() {
        let validator = order_validator();
        let names: Vec<&str> = validator.field_names().collect();
        assert_eq!(names, vec!["po_number", "quantity", "skus", "ship_to"]);
    }
}
