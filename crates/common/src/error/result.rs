//! Result alias and combinators
//!
//! Every fallible operation in the client core returns
//! [`GroupVanResult<T>`]. `map` and `map_err` come from `std`; `fold` is the
//! one combinator callers routinely reach for that `std` lacks.

use super::GroupVanError;

/// Result type used across the GroupVAN client core
pub type GroupVanResult<T> = Result<T, GroupVanError>;

/// Extra combinators for [`GroupVanResult`]
pub trait ResultExt<T> {
    /// Collapse both arms into a single value
    ///
    /// Exactly one of the two closures is invoked.
    fn fold<R>(self, on_success: impl FnOnce(T) -> R, on_failure: impl FnOnce(GroupVanError) -> R)
        -> R;

    /// True when this is a failure of the given label
    fn is_failure_of(&self, label: &str) -> bool;
}

impl<T> ResultExt<T> for GroupVanResult<T> {
    fn fold<R>(
        self,
        on_success: impl FnOnce(T) -> R,
        on_failure: impl FnOnce(GroupVanError) -> R,
    ) -> R {
        match self {
            Ok(value) => on_success(value),
            Err(err) => on_failure(err),
        }
    }

    fn is_failure_of(&self, label: &str) -> bool {
        matches!(self, Err(err) if err.label() == label)
    }
}
