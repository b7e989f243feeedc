//! Error-mapping stage
//!
//! Sits directly above the transport. Transport failures already arrive as
//! `Network` errors; this stage turns non-2xx responses into the matching
//! taxonomy error so the stages above can classify them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_domain::constants::HEADER_RETRY_AFTER;

use crate::api::pipeline::{Interceptor, Next};
use crate::api::request::{ApiRequest, ApiResponse};

/// Longest body excerpt carried into an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorMappingInterceptor;

/// `Retry-After` as whole seconds: delta-seconds or an HTTP date
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let secs = (at.with_timezone(&Utc) - now).num_seconds();
    Some(u64::try_from(secs).unwrap_or(0))
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

pub fn map_response(response: ApiResponse) -> GroupVanResult<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .header(HEADER_RETRY_AFTER)
        .and_then(|value| parse_retry_after(value, Utc::now()));
    Err(GroupVanError::from_status(
        response.status,
        &response.request.url,
        &body_excerpt(&response.body),
        retry_after,
    ))
}

#[async_trait]
impl Interceptor for ErrorMappingInterceptor {
    fn name(&self) -> &'static str {
        "error_mapping"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> GroupVanResult<ApiResponse> {
        map_response(next.run(request).await?)
    }
}
