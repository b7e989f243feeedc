//! Fixtures shared by the pipeline unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use groupvan_common::error::GroupVanResult;
use groupvan_domain::{CacheProvenance, HttpMethod, RequestMetadata};
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use url::Url;

use super::pipeline::Transport;
use super::request::{ApiRequest, ApiResponse};

pub(crate) fn request(path: &str) -> ApiRequest {
    let url = Url::parse("https://api.test.local").and_then(|base| base.join(path));
    ApiRequest::new(HttpMethod::Get, url.unwrap())
}

pub(crate) fn response(request: &ApiRequest, status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status,
        headers: HeaderMap::new(),
        body: Bytes::from(body.to_string()),
        request: RequestMetadata {
            method: request.method,
            url: request.url.to_string(),
            headers: groupvan_domain::redact_headers(request.header_pairs()),
            sent_at: Utc::now(),
            attempt: request.attempt,
            correlation_id: request.correlation_id,
            body_bytes: request.body_len(),
        },
        received_at: Utc::now(),
        duration: Duration::from_millis(1),
        attempts: 1,
        provenance: CacheProvenance::Network,
    }
}

pub(crate) fn ok_response(request: &ApiRequest, body: &str) -> ApiResponse {
    response(request, 200, body)
}

/// Plays back scripted statuses, repeating the last one, and records every
/// request it sees
pub(crate) struct ScriptedTransport {
    statuses: Mutex<VecDeque<u16>>,
    last: u16,
    pub(crate) calls: AtomicU32,
    pub(crate) seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            last: statuses.last().copied().unwrap_or(200),
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> GroupVanResult<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.clone());
        let status = self.statuses.lock().pop_front().unwrap_or(self.last);
        Ok(response(request, status, r#"{"ok":true}"#))
    }
}
