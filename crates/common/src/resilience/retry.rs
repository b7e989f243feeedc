//! Retry policy and backoff schedule
//!
//! This module decides *whether* and *when* a failed attempt is retried. The
//! async loop that actually sleeps and re-sends lives in the request
//! pipeline; keeping the decision here makes it testable without a runtime.
//!
//! Attempts are counted from zero: the delay before retry `k` (the
//! `k + 1`-th send) is `initial_delay * multiplier^k`, capped at
//! `max_delay`. With the defaults this yields 1s, 2s, 4s.

use std::time::Duration;

use tracing::debug;

use crate::error::{ErrorClassification, GroupVanError, GroupVanResult};

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried and optionally provide a custom
    /// delay
    ///
    /// `attempt` is the zero-based index of the attempt that just failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a server-provided delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: initial_delay * multiplier^attempt
    Exponential { initial_delay: Duration, multiplier: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Calculate the delay that precedes retry number `attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { initial_delay, multiplier, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * multiplier.powi(exponent);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total sends are `max_retries + 1`
    pub max_retries: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Use the server's `Retry-After` instead of the backoff when present
    pub honor_retry_after: bool,
    /// Upper bound applied to a server-provided delay
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffStrategy::default(),
            honor_retry_after: true,
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Configuration that never retries
    pub fn disabled() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Validate the configuration
    pub fn validate(&self) -> GroupVanResult<()> {
        if let BackoffStrategy::Exponential { multiplier, .. } = &self.backoff {
            if *multiplier < 1.0 || !multiplier.is_finite() {
                return Err(GroupVanError::config_field(
                    "retry.multiplier",
                    "exponential multiplier must be a finite number >= 1",
                ));
            }
        }
        Ok(())
    }

    /// Delay to wait for a given decision, `None` when the call must stop
    pub fn delay_for(&self, decision: &RetryDecision, attempt: u32) -> Option<Duration> {
        match decision {
            RetryDecision::Retry => Some(self.backoff.calculate_delay(attempt)),
            RetryDecision::RetryAfter(delay) => Some((*delay).min(self.max_retry_after)),
            RetryDecision::Stop => None,
        }
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, multiplier, max_delay };
        self
    }

    pub fn honor_retry_after(mut self, honor: bool) -> Self {
        self.config.honor_retry_after = honor;
        self
    }

    pub fn max_retry_after(mut self, cap: Duration) -> Self {
        self.config.max_retry_after = cap;
        self
    }

    pub fn build(self) -> GroupVanResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Retries whatever the error classifies as retryable, up to `max_retries`
#[derive(Debug, Clone, Default)]
pub struct ClassifiedRetryPolicy {
    config: RetryConfig,
}

impl ClassifiedRetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<E: ErrorClassification> RetryPolicy<E> for ClassifiedRetryPolicy {
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        if attempt >= self.config.max_retries {
            debug!(attempt, max_retries = self.config.max_retries, "retry budget exhausted");
            return RetryDecision::Stop;
        }

        if !error.is_retryable() {
            return RetryDecision::Stop;
        }

        match error.retry_after() {
            Some(delay) if self.config.honor_retry_after => RetryDecision::RetryAfter(delay),
            _ => RetryDecision::Retry,
        }
    }
}
