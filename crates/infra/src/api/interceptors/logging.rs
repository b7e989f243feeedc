//! Logging stage
//!
//! One span per logical call carrying method, URL and correlation id.
//! Bodies are emitted only at TRACE, and never for requests flagged
//! `sensitive` (token exchanges). Header values are never emitted; the
//! authorization header is marked sensitive on the request itself.

use std::time::Instant;

use async_trait::async_trait;
use groupvan_common::error::{ErrorClassification, ErrorSeverity, GroupVanResult};
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use crate::api::pipeline::{Interceptor, Next};
use crate::api::request::{ApiRequest, ApiResponse};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse> {
        let span = info_span!(
            "api_request",
            method = %request.method,
            url = %request.url,
            correlation_id = %request.correlation_id,
        );

        async move {
            let log_bodies = !request.sensitive;
            debug!(bytes = request.body_len(), "request started");
            if let Some(body) = request.body.as_ref().filter(|_| log_bodies) {
                trace!(body = %String::from_utf8_lossy(body), "request body");
            }

            let started = Instant::now();
            let result = next.run(request).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => {
                    info!(
                        status = response.status,
                        attempts = response.attempts,
                        duration_ms,
                        bytes = response.body.len(),
                        cache = %response.provenance,
                        "request completed"
                    );
                    if log_bodies {
                        trace!(body = %String::from_utf8_lossy(&response.body), "response body");
                    }
                }
                Err(err) => match err.severity() {
                    ErrorSeverity::Info => info!(duration_ms, error = %err, "request ended"),
                    ErrorSeverity::Warning => warn!(duration_ms, error = %err, "request failed"),
                    ErrorSeverity::Error | ErrorSeverity::Critical => {
                        error!(duration_ms, error = %err, label = err.label(), "request failed");
                    }
                },
            }
            result
        }
        .instrument(span)
        .await
    }
}
