use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_domain::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_RECEIVE_TIMEOUT_SECS, DEFAULT_SEND_TIMEOUT_SECS,
    USER_AGENT,
};
use groupvan_domain::{CacheProvenance, HttpMethod, RequestMetadata, TimeoutConfig};
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::api::pipeline::Transport;
use crate::api::request::{ApiRequest, ApiResponse};
use crate::errors::InfraError;

/// reqwest-backed transport: one network send per call, no retries
///
/// Timeouts are per attempt. Requests without a body (GET, HEAD, OPTIONS)
/// are bounded by the receive timeout alone; requests with a body also get
/// the send budget.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
    receive_timeout: Duration,
    send_timeout: Duration,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> GroupVanResult<Self> {
        Self::builder().build()
    }

    /// Transport using the timeouts from client configuration
    pub fn from_timeouts(timeouts: &TimeoutConfig) -> GroupVanResult<Self> {
        Self::builder()
            .connect_timeout(timeouts.connect())
            .receive_timeout(timeouts.receive())
            .send_timeout(timeouts.send())
            .build()
    }

    /// Per-attempt budget for `method`
    pub fn timeout_for(&self, method: HttpMethod) -> Duration {
        if method.is_bodiless() {
            self.receive_timeout
        } else {
            self.receive_timeout.saturating_add(self.send_timeout)
        }
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> GroupVanResult<ApiResponse> {
        let metadata = RequestMetadata {
            method: request.method,
            url: request.url.to_string(),
            headers: groupvan_domain::redact_headers(request.header_pairs()),
            sent_at: Utc::now(),
            attempt: request.attempt,
            correlation_id: request.correlation_id,
            body_bytes: request.body_len(),
        };

        let mut builder = self
            .client
            .request(reqwest_method(request.method), request.url.clone())
            .headers(request.headers.clone())
            .timeout(self.timeout_for(request.method));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        debug!(attempt = request.attempt + 1, method = %request.method, url = %request.url, "sending HTTP request");
        let started = Instant::now();

        let response = builder.send().await.map_err(|err| {
            debug!(attempt = request.attempt + 1, error = %err, "HTTP request failed");
            GroupVanError::from(InfraError::from(err))
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|err| GroupVanError::from(InfraError::from(err)))?;
        let duration = started.elapsed();

        debug!(
            attempt = request.attempt + 1,
            status,
            duration_ms = duration.as_millis() as u64,
            bytes = body.len(),
            "received HTTP response"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
            request: metadata,
            received_at: Utc::now(),
            duration,
            attempts: 1,
            provenance: CacheProvenance::Network,
        })
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    receive_timeout: Duration,
    send_timeout: Duration,
    user_agent: String,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            receive_timeout: Duration::from_secs(DEFAULT_RECEIVE_TIMEOUT_SECS),
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
            default_headers: None,
        }
    }
}

impl HttpTransportBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Extra budget for uploading a request body
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> GroupVanResult<HttpTransport> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent)
            .no_proxy();

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| GroupVanError::from(InfraError::from(err)))?;

        Ok(HttpTransport {
            client,
            receive_timeout: self.receive_timeout,
            send_timeout: self.send_timeout,
        })
    }
}
