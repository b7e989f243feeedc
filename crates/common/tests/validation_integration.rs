//! Integration tests for validation module
//!
//! Exercises record-level validation the way request builders use it:
//! every field checked, every failure reported, nothing short-circuited
//! across fields.

use groupvan_common::error::{ErrorClassification, GroupVanError};
use groupvan_common::validation::{
    IntegerValidator, ListValidator, ObjectValidator, StringValidator, Validator,
};

#[derive(Debug, Default)]
struct CatalogQuery {
    vin: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    sort: Option<String>,
    part_numbers: Vec<String>,
}

fn catalog_query_validator() -> ObjectValidator<CatalogQuery> {
    ObjectValidator::new()
        .field(
            "vin",
            |q: &CatalogQuery| q.vin.as_deref(),
            StringValidator::new()
                .required()
                .min_length(17)
                .max_length(17)
                .pattern("^[A-HJ-NPR-Z0-9]+$")
                .expect("valid VIN pattern"),
        )
        .field("limit", |q: &CatalogQuery| q.limit.as_ref(), IntegerValidator::new().between(1, 100))
        .field("offset", |q: &CatalogQuery| q.offset.as_ref(), IntegerValidator::new().min(0))
        .field(
            "sort",
            |q: &CatalogQuery| q.sort.as_deref(),
            StringValidator::new().allowed_values(["name", "updated_at"]),
        )
        .field(
            "part_numbers",
            |q: &CatalogQuery| Some(q.part_numbers.as_slice()),
            ListValidator::<str>::new()
                .max_length(3)
                .item_validator(StringValidator::new().required().max_length(12)),
        )
}

/// Validates `ObjectValidator::validate` behavior for the three invalid
/// fields scenario.
///
/// Assertions:
/// - Three invalid fields produce exactly three errors in one call.
/// - Errors are reported in field registration order.
#[test]
fn test_three_invalid_fields_yield_three_errors() {
    let query = CatalogQuery {
        vin: Some("1HGCM82633A004352".into()),
        limit: Some(0),
        offset: Some(-5),
        sort: Some("price".into()),
        part_numbers: Vec::new(),
    };

    let errors = catalog_query_validator().validate(&query);

    assert_eq!(errors.len(), 3, "unexpected errors: {errors:?}");
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["limit", "offset", "sort"]);
}

/// Validates `ObjectValidator::validate` behavior for the required field
/// scenario.
///
/// Assertions:
/// - A missing required field yields exactly one `required` error.
/// - Other fields are still checked.
#[test]
fn test_required_absent_only_short_circuits_its_own_field() {
    let query = CatalogQuery { limit: Some(1000), ..CatalogQuery::default() };

    let errors = catalog_query_validator().validate(&query);

    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].field, "vin");
    assert_eq!(errors[0].rule, "required");
    assert!(errors[0].value.is_none());
    assert_eq!(errors[1].field, "limit");
    assert_eq!(errors[1].value.as_deref(), Some("1000"));
}

/// Validates `ObjectValidator::validate_and_throw` behavior for the
/// aggregation scenario.
///
/// Assertions:
/// - The exception carries every error.
/// - Converting into `GroupVanError` yields a non-retryable validation error.
#[test]
fn test_validate_and_throw_aggregates() {
    let query = CatalogQuery {
        vin: Some("short".into()),
        part_numbers: vec!["A".into(), "B".into(), "C".into(), "WAY-TOO-LONG-PART".into()],
        ..CatalogQuery::default()
    };

    let exception = catalog_query_validator()
        .validate_and_throw(&query)
        .expect_err("query should be rejected");

    // vin fails min_length and pattern (lowercase), part_numbers fails
    // max_length and one item
    assert_eq!(exception.error_count(), 4);
    assert_eq!(exception.field_errors("vin").len(), 2);
    assert_eq!(exception.field_errors("part_numbers[3]").len(), 1);

    let err: GroupVanError = exception.into();
    assert_eq!(err.label(), "validation");
    assert!(!err.is_retryable());
}

/// Validates `StringValidator` behavior when used standalone.
///
/// Assertions:
/// - `validate_and_throw` succeeds for a good value and fails for a bad one.
#[test]
fn test_standalone_validator_and_throw() {
    let key_id = StringValidator::new().required().max_length(8);
    assert!(key_id.validate_and_throw(Some("KEY-01"), "key_id").is_ok());

    let err = key_id.validate_and_throw(Some("KEY-0123456"), "key_id").expect_err("too long");
    assert_eq!(err.errors[0].rule, "max_length");
}

/// Validates `ValidationError` serialization for the structured log scenario.
///
/// Assertions:
/// - All four attributes are present in the JSON form.
#[test]
fn test_errors_serialize_for_logs() {
    let errors = catalog_query_validator().validate(&CatalogQuery::default());
    let json = serde_json::to_value(&errors).expect("serializable");
    assert_eq!(json[0]["field"], "vin");
    assert_eq!(json[0]["rule"], "required");
    assert!(json[0]["value"].is_null());
    assert_eq!(json[0]["message"], "vin is required");
}
