//! Protocol constants
//!
//! Centralized location for wire-level names and defaults shared by the
//! auth manager, the request pipeline and the token issuer.

// API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groupvan.com/v3";
pub const DEFAULT_SIGN_IN_PATH: &str = "/auth/token";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_REVOKE_PATH: &str = "/auth/revoke";

// HTTP conventions
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CORRELATION_ID: &str = "X-Correlation-ID";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";
pub const BEARER_PREFIX: &str = "Bearer ";
pub const REDACTED: &str = "<redacted>";

// JWT wire format
pub const JWT_AUDIENCE: &str = "groupvan";
pub const JWT_VERSION_HEADER: &str = "gv-ver";
pub const JWT_VERSION: &str = "GV-JWT-V1";
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 300;

// Token lifecycle
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 300;
/// Used when a grant carries neither `expires_in` nor a decodable `exp`
pub const FALLBACK_ACCESS_TOKEN_TTL_SECS: u64 = 3600;

// Retry / backoff
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

// Transport timeouts (per attempt)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;

// Response cache
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 1000;

// Token storage
pub const DEFAULT_KEYRING_SERVICE: &str = "groupvan";
pub const DEFAULT_KEYRING_ACCOUNT: &str = "default";

pub const USER_AGENT: &str = concat!("groupvan-rust/", env!("CARGO_PKG_VERSION"));
