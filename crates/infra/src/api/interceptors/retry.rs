//! Retry stage
//!
//! Re-runs everything below it (auth, error mapping, transport) while the
//! policy allows. Attempts of one call are strictly sequential and share the
//! correlation id.

use async_trait::async_trait;
use groupvan_common::error::{ErrorClassification, GroupVanResult};
use groupvan_common::resilience::{ClassifiedRetryPolicy, RetryConfig, RetryDecision, RetryPolicy};
use tracing::{debug, warn};

use crate::api::pipeline::{Interceptor, Next};
use crate::api::request::{ApiRequest, ApiResponse};

#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    policy: ClassifiedRetryPolicy,
}

impl RetryInterceptor {
    pub fn new(config: RetryConfig) -> Self {
        Self { policy: ClassifiedRetryPolicy::new(config) }
    }

    pub fn config(&self) -> &RetryConfig {
        self.policy.config()
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse> {
        let mut attempt = 0;
        loop {
            let mut this_attempt = request.clone();
            this_attempt.attempt = attempt;

            let err = match next.run(this_attempt).await {
                Ok(mut response) => {
                    response.attempts = attempt + 1;
                    return Ok(response);
                }
                Err(err) => err,
            };

            let decision = self.policy.should_retry(&err, attempt);
            let Some(delay) = self.config().delay_for(&decision, attempt) else {
                debug!(attempt = attempt + 1, error = %err, "not retrying");
                return Err(err);
            };

            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                server_delay = matches!(decision, RetryDecision::RetryAfter(_)),
                error = %err,
                severity = %err.severity(),
                "retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
