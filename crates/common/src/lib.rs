//! Shared building blocks for the GroupVAN client crates.
//!
//! # Feature Tiers
//!
//! - `foundation`: error taxonomy, `GroupVanResult`, validators
//! - `runtime`: retry policy and clock abstraction (default)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod validation;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{
    AuthErrorKind, ErrorClassification, ErrorSeverity, GroupVanError, GroupVanResult,
    NetworkErrorKind, ResultExt,
};
#[cfg(feature = "runtime")]
pub use resilience::{ClassifiedRetryPolicy, RetryConfig, RetryDecision, RetryPolicy};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
#[cfg(feature = "foundation")]
pub use validation::{
    IntegerValidator, ListValidator, ObjectValidator, StringValidator, ValidationError,
    ValidationException, Validator,
};
