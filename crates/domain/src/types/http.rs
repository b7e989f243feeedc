//! Request/response metadata carried alongside every decoded payload

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::REDACTED;
use crate::impl_wire_name_conversions;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET, HEAD and OPTIONS never carry a body, so they get no send timeout
    pub fn is_bodiless(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a response came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheProvenance {
    #[default]
    Network,
    Cache,
}

impl_wire_name_conversions!(CacheProvenance {
    Network => "network",
    Cache => "cache",
});

/// Header names whose values are replaced before metadata is retained
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "proxy-authorization"];

/// Copy headers, masking credentials
pub fn redact_headers<'a, I>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            let value =
                if SENSITIVE_HEADERS.contains(&lower.as_str()) { REDACTED } else { value };
            (lower, value.to_string())
        })
        .collect()
}

/// Snapshot of one outgoing attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestMetadata {
    pub method: HttpMethod,
    pub url: String,
    /// Lowercased names, credentials redacted
    pub headers: BTreeMap<String, String>,
    pub sent_at: DateTime<Utc>,
    /// Zero-based attempt index within the logical call
    pub attempt: u32,
    pub correlation_id: Uuid,
    pub body_bytes: usize,
}

/// Snapshot of the response that completed a logical call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseMetadata {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub received_at: DateTime<Utc>,
    pub duration: Duration,
    /// Total sends for the logical call, including the successful one
    pub attempts: u32,
    pub correlation_id: Uuid,
    pub body_bytes: usize,
    pub provenance: CacheProvenance,
}

/// Decoded payload plus diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct GroupVanResponse<T> {
    pub data: T,
    pub request: RequestMetadata,
    pub response: ResponseMetadata,
}

impl<T> GroupVanResponse<T> {
    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn correlation_id(&self) -> Uuid {
        self.response.correlation_id
    }

    pub fn is_from_cache(&self) -> bool {
        self.response.provenance == CacheProvenance::Cache
    }

    /// Transform the payload, keeping the metadata
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GroupVanResponse<U> {
        GroupVanResponse { data: f(self.data), request: self.request, response: self.response }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
