//! Resilience patterns for transient failures
//!
//! Only retry with exponential backoff is needed by the request pipeline.
//! The policy is generic over any error implementing
//! [`ErrorClassification`](crate::error::ErrorClassification).

pub mod retry;

pub use retry::{
    BackoffStrategy, ClassifiedRetryPolicy, RetryConfig, RetryConfigBuilder, RetryDecision,
    RetryPolicy,
};
