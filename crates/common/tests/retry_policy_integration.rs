//! Integration tests for the retry policy
//!
//! Walks a simulated sequence of failures through `ClassifiedRetryPolicy`
//! and checks the number of attempts and the schedule of delays.

use std::time::Duration;

use groupvan_common::error::{GroupVanError, NetworkErrorKind};
use groupvan_common::resilience::{
    ClassifiedRetryPolicy, RetryConfig, RetryDecision, RetryPolicy,
};

/// Drive the policy until it stops, returning the delays it asked for
fn simulate(policy: &ClassifiedRetryPolicy, mut next_error: impl FnMut() -> GroupVanError) -> Vec<Duration> {
    let mut delays = Vec::new();
    let mut attempt = 0;
    loop {
        let error = next_error();
        let decision = policy.should_retry(&error, attempt);
        match policy.config().delay_for(&decision, attempt) {
            Some(delay) => delays.push(delay),
            None => return delays,
        }
        attempt += 1;
    }
}

/// Validates `ClassifiedRetryPolicy` behavior for the always-503 scenario.
///
/// Assertions:
/// - Exactly `max_retries` delays, so `max_retries + 1` attempts.
/// - Delays follow 1s, 2s, 4s.
#[test]
fn test_always_503_retries_three_times() {
    let policy = ClassifiedRetryPolicy::default();
    let delays = simulate(&policy, || GroupVanError::from_status(503, "https://x", "", None));
    assert_eq!(
        delays,
        vec![Duration::from_millis(1000), Duration::from_millis(2000), Duration::from_millis(4000)]
    );
}

/// Validates `ClassifiedRetryPolicy` behavior for non-retryable errors.
///
/// Assertions:
/// - 400, 401 and 403 stop on the first attempt.
#[test]
fn test_client_errors_never_retry() {
    let policy = ClassifiedRetryPolicy::default();
    for status in [400, 401, 403, 404] {
        let delays = simulate(&policy, || GroupVanError::from_status(status, "https://x", "", None));
        assert!(delays.is_empty(), "status {status} should not retry");
    }
}

/// Validates `ClassifiedRetryPolicy` behavior for 429 with and without
/// `Retry-After`.
///
/// Assertions:
/// - A server-provided delay replaces the backoff.
/// - Without one the backoff schedule applies.
#[test]
fn test_rate_limit_delay_source() {
    let policy = ClassifiedRetryPolicy::default();
    let err = GroupVanError::rate_limited(Some(5), "slow down");
    assert_eq!(policy.should_retry(&err, 1), RetryDecision::RetryAfter(Duration::from_secs(5)));

    let delays = simulate(&policy, || GroupVanError::rate_limited(None, "slow down"));
    assert_eq!(delays.len(), 3);
    assert_eq!(delays[1], Duration::from_secs(2));
}

/// Validates `RetryConfig::builder` behavior for a custom schedule.
///
/// Assertions:
/// - Custom retry count and base delay are honoured.
#[test]
fn test_custom_schedule() {
    let config = RetryConfig::builder()
        .max_retries(2)
        .exponential_backoff(Duration::from_millis(250), 3.0, Duration::from_secs(10))
        .build()
        .expect("valid config");
    let policy = ClassifiedRetryPolicy::new(config);

    let delays = simulate(&policy, || GroupVanError::network(NetworkErrorKind::Connection, "reset"));
    assert_eq!(delays, vec![Duration::from_millis(250), Duration::from_millis(750)]);
}

/// Validates `RetryConfig::disabled` behavior.
///
/// Assertions:
/// - No retries are scheduled for a retryable error.
#[test]
fn test_disabled_config() {
    let policy = ClassifiedRetryPolicy::new(RetryConfig::disabled());
    let delays = simulate(&policy, || GroupVanError::network(NetworkErrorKind::Timeout, "slow"));
    assert!(delays.is_empty());
}
