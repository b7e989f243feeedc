//! Values flowing through the request pipeline

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_domain::{CacheProvenance, HttpMethod, RequestMetadata, ResponseMetadata};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Per-call options for [`ApiClient::request`](super::ApiClient::request)
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    /// Serve and store GET responses in the response cache
    pub use_cache: bool,
    /// Attach a bearer token (default `true`)
    pub authenticated: bool,
    /// Reuse a caller-chosen correlation id instead of minting one
    pub correlation_id: Option<Uuid>,
    /// Cancelling resolves this call with `Cancelled`
    pub cancel: Option<CancellationToken>,
    /// Bodies carry credentials; never write them to the log
    pub sensitive: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            use_cache: false,
            authenticated: true,
            correlation_id: None,
            cancel: None,
            sensitive: false,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> GroupVanResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn cached(mut self) -> Self {
        self.use_cache = true;
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Keep request and response bodies out of the log
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// One logical call as seen by pipeline stages
///
/// Stages receive it by value; the retry stage clones it per attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Nil until the correlation stage assigns one
    pub correlation_id: Uuid,
    /// Zero-based attempt index, set by the retry stage
    pub attempt: u32,
    pub use_cache: bool,
    pub authenticated: bool,
    /// Bodies must not be logged
    pub sensitive: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            correlation_id: Uuid::nil(),
            attempt: 0,
            use_cache: false,
            authenticated: true,
            sensitive: false,
        }
    }

    /// Set a header, replacing any existing value
    pub fn set_header(&mut self, name: &str, value: &str) -> GroupVanResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| GroupVanError::config(format!("invalid header name '{name}': {err}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|err| GroupVanError::config(format!("invalid value for header '{name}': {err}")))?;
        if name == reqwest::header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }

    /// Headers as `(name, value)` pairs for metadata redaction
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        header_pairs(&self.headers)
    }
}

pub(crate) fn header_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers.iter().filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
}

/// Raw response as produced by the transport, before decoding
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Snapshot of the attempt that produced this response
    pub request: RequestMetadata,
    pub received_at: DateTime<Utc>,
    pub duration: Duration,
    /// Sends made for the logical call, filled in by the retry stage
    pub attempts: u32,
    pub provenance: CacheProvenance,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            status: self.status,
            headers: groupvan_domain::redact_headers(header_pairs(&self.headers)),
            received_at: self.received_at,
            duration: self.duration,
            attempts: self.attempts,
            correlation_id: self.request.correlation_id,
            body_bytes: self.body.len(),
            provenance: self.provenance,
        }
    }
}
