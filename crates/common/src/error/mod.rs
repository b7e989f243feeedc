//! Error taxonomy for the GroupVAN client core
//!
//! Every failure that can leave the request pipeline or the auth manager is
//! one of the [`GroupVanError`] variants below. The variant decides whether
//! the pipeline retries the call, how loudly it is logged, and which label
//! appears in structured logs.
//!
//! | Variant | Trigger | Retried |
//! |---------|---------|---------|
//! | `Network` | connection error, DNS failure, transport timeout | yes |
//! | `Http` (5xx, 408) | server side failure | yes |
//! | `Http` (other 4xx) | client side failure | no |
//! | `Authentication` | 401, 403, sign-in or refresh failure | no |
//! | `RateLimit` | 429, honours `Retry-After` | yes |
//! | `Validation` | local input validation, never reaches the network | no |
//! | `Configuration` | missing or invalid construction-time config | no |
//! | `Data` | response body fails to decode | no |
//! | `Storage` | token storage backend failure | no |
//! | `Cancelled` | caller cancelled the request | no |
//! | `NotInitialized` | global accessor used before `init` | no |
//!
//! ## ErrorClassification Trait
//!
//! [`ErrorClassification`] is the interface the retry policy and the logging
//! stage consume. It is implemented for [`GroupVanError`] and can be
//! implemented by any error that wraps it.
//!
//! ```rust
//! use groupvan_common::error::{ErrorClassification, GroupVanError};
//!
//! let err = GroupVanError::from_status(503, "https://api.groupvan.com/v3/catalogs", "", None);
//! assert!(err.is_retryable());
//!
//! let err = GroupVanError::from_status(404, "https://api.groupvan.com/v3/catalogs/1", "", None);
//! assert!(!err.is_retryable());
//! ```

mod result;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub use result::{GroupVanResult, ResultExt};

use crate::validation::ValidationException;

/// Why an authentication step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Sign-in rejected the supplied credentials (HTTP 400/401 on sign-in)
    InvalidCredentials,
    /// The API rejected the bearer token (HTTP 401)
    InvalidToken,
    /// The token expired and could not be refreshed
    ExpiredToken,
    /// The token is valid but lacks permission (HTTP 403)
    InsufficientPermissions,
    /// No session is active
    NotAuthenticated,
}

impl AuthErrorKind {
    /// Stable identifier used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::InsufficientPermissions => "insufficient_permissions",
            Self::NotAuthenticated => "not_authenticated",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// TCP/TLS connection could not be established or was reset
    Connection,
    /// Host name did not resolve
    Dns,
    /// Connect or receive timeout elapsed
    Timeout,
    /// Any other transport failure (malformed response, body stream error)
    Other,
}

impl NetworkErrorKind {
    /// Stable identifier used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Dns => "dns",
            Self::Timeout => "timeout",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy shared by the whole client core
#[derive(Debug, Clone, Error)]
pub enum GroupVanError {
    /// Transport failure before an HTTP status was received
    #[error("Network error ({kind}): {message}")]
    Network { kind: NetworkErrorKind, message: String },

    /// Non-success HTTP status that has no more specific variant
    #[error("HTTP {status} from {url}: {message}")]
    Http { status: u16, url: String, message: String },

    /// Authentication or authorization failure
    #[error("Authentication failed ({kind}): {message}")]
    Authentication { kind: AuthErrorKind, message: String },

    /// HTTP 429
    #[error("Rate limit exceeded: {message}")]
    RateLimit { retry_after_seconds: Option<u64>, message: String },

    /// Local input validation failure
    #[error(transparent)]
    Validation(#[from] ValidationException),

    /// Missing or invalid construction-time configuration
    #[error("{}", match field {
        Some(field) => format!("Configuration error in field '{field}': {message}"),
        None => format!("Configuration error: {message}"),
    })]
    Configuration { message: String, field: Option<String> },

    /// Response body could not be decoded
    #[error("Data error: {message}")]
    Data { message: String },

    /// Token storage backend failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// The process-wide instance was used before initialization
    #[error("GroupVAN client is not initialized; call GroupVan::initialize first")]
    NotInitialized,
}

impl GroupVanError {
    /// Create a network error
    pub fn network<S: Into<String>>(kind: NetworkErrorKind, message: S) -> Self {
        Self::Network { kind, message: message.into() }
    }

    /// Create an HTTP status error
    pub fn http<U: Into<String>, S: Into<String>>(status: u16, url: U, message: S) -> Self {
        Self::Http { status, url: url.into(), message: message.into() }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(kind: AuthErrorKind, message: S) -> Self {
        Self::Authentication { kind, message: message.into() }
    }

    /// Create a rate limit error
    pub fn rate_limited<S: Into<String>>(retry_after_seconds: Option<u64>, message: S) -> Self {
        Self::RateLimit { retry_after_seconds, message: message.into() }
    }

    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Configuration { message: message.into(), field: Some(field.into()) }
    }

    /// Create a decoding error
    pub fn data<S: Into<String>>(message: S) -> Self {
        Self::Data { message: message.into() }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage { message: message.into() }
    }

    /// Map a non-success HTTP status into the taxonomy
    ///
    /// `retry_after_seconds` is the parsed `Retry-After` header, only
    /// meaningful for 429.
    pub fn from_status(
        status: u16,
        url: &str,
        body: &str,
        retry_after_seconds: Option<u64>,
    ) -> Self {
        let message = if body.is_empty() {
            format!("{url} returned status {status}")
        } else {
            format!("{url} returned status {status}: {body}")
        };

        match status {
            401 => {
                let kind = if body.to_ascii_lowercase().contains("expired") {
                    AuthErrorKind::ExpiredToken
                } else {
                    AuthErrorKind::InvalidToken
                };
                Self::auth(kind, message)
            }
            403 => Self::auth(AuthErrorKind::InsufficientPermissions, message),
            429 => Self::rate_limited(retry_after_seconds, message),
            _ => Self::http(status, url, message),
        }
    }

    /// HTTP status carried by this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimit { .. } => Some(429),
            Self::Authentication { kind: AuthErrorKind::InsufficientPermissions, .. } => Some(403),
            Self::Authentication {
                kind: AuthErrorKind::InvalidToken | AuthErrorKind::ExpiredToken,
                ..
            } => Some(401),
            _ => None,
        }
    }

    /// Authentication failure kind, if this is an authentication error
    pub fn auth_kind(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Authentication { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for a rejected bearer token (401), the one case that warrants a
    /// forced refresh
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self.auth_kind(),
            Some(AuthErrorKind::InvalidToken | AuthErrorKind::ExpiredToken)
        )
    }

    /// Stable label suitable for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Http { .. } => "http",
            Self::Authentication { .. } => "authentication",
            Self::RateLimit { .. } => "rate_limit",
            Self::Validation(_) => "validation",
            Self::Configuration { .. } => "configuration",
            Self::Data { .. } => "data",
            Self::Storage { .. } => "storage",
            Self::Cancelled => "cancelled",
            Self::NotInitialized => "not_initialized",
        }
    }
}

impl ErrorClassification for GroupVanError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimit { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled => ErrorSeverity::Info,
            Self::Network { .. } | Self::RateLimit { .. } => ErrorSeverity::Warning,
            Self::Http { status, .. } if *status < 500 => ErrorSeverity::Warning,
            Self::NotInitialized => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after_seconds: Some(secs), .. } => {
                Some(Duration::from_secs(*secs))
            }
            _ => None,
        }
    }
}

/// Error classification trait for consistent error handling across modules
///
/// The retry stage only consults `is_retryable` and `retry_after`; the
/// logging stage uses `severity` to pick a level.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again: transport failures, 5xx/408 responses, rate limiting.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when the server named a delay (for example
    /// via `Retry-After`), `None` when the backoff schedule applies.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// Standard conversions from common error types
impl From<serde_json::Error> for GroupVanError {
    fn from(err: serde_json::Error) -> Self {
        Self::data(format!("JSON: {err}"))
    }
}

impl From<std::io::Error> for GroupVanError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}
