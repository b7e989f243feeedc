//! Client configuration
//!
//! Construction-time settings only. Nothing here changes after the client is
//! built. Every section has defaults so a config file only needs the keys it
//! overrides:
//!
//! ```toml
//! base_url = "https://api.groupvan.com/v3"
//!
//! [retry]
//! max_retries = 5
//!
//! [jwt]
//! developer_id = "dev-123"
//! key_id = "key-1"
//! private_key_path = "/etc/groupvan/private.pem"
//! mode = "direct"
//!
//! [storage]
//! backend = "file"
//! path = "/var/lib/groupvan/tokens.json"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY_MS, DEFAULT_BASE_URL, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_KEYRING_ACCOUNT,
    DEFAULT_KEYRING_SERVICE, DEFAULT_MAX_DELAY_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_RECEIVE_TIMEOUT_SECS, DEFAULT_REFRESH_PATH, DEFAULT_REFRESH_SKEW_SECS,
    DEFAULT_REVOKE_PATH, DEFAULT_SEND_TIMEOUT_SECS, DEFAULT_SIGN_IN_PATH,
    DEFAULT_TOKEN_LIFETIME_SECS,
};
use crate::impl_wire_name_conversions;

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: TimeoutConfig,
    pub retry: RetrySettings,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    /// Present when this process mints its own client assertions
    pub jwt: Option<JwtConfig>,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: TimeoutConfig::default(),
            retry: RetrySettings::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
            jwt: None,
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Per-attempt transport timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub receive_secs: u64,
    /// Only applied to methods that send a body
    pub send_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn receive(&self) -> Duration {
        Duration::from_secs(self.receive_secs)
    }

    pub fn send(&self) -> Duration {
        Duration::from_secs(self.send_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            receive_secs: DEFAULT_RECEIVE_TIMEOUT_SECS,
            send_secs: DEFAULT_SEND_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_secs: u64,
    pub honor_retry_after: bool,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_secs: DEFAULT_MAX_DELAY_SECS,
            honor_retry_after: true,
        }
    }
}

/// GET response cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Off by default; individual requests still have to opt in
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Refresh this long before the access token expires
    pub refresh_skew_secs: u64,
    pub sign_in_path: String,
    pub refresh_path: String,
    pub revoke_path: String,
    /// Run a background task that refreshes ahead of expiry
    pub auto_refresh: bool,
}

impl AuthConfig {
    pub fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_skew_secs: DEFAULT_REFRESH_SKEW_SECS,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            revoke_path: DEFAULT_REVOKE_PATH.to_string(),
            auto_refresh: false,
        }
    }
}

/// Server-side token issuance settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtConfig {
    pub developer_id: String,
    pub key_id: String,
    pub private_key_path: PathBuf,
    #[serde(default = "default_token_lifetime")]
    pub lifetime_secs: u64,
    #[serde(default)]
    pub mode: JwtMode,
}

/// How issued client assertions reach the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JwtMode {
    /// Traded at the token endpoint for a session
    #[default]
    Exchange,
    /// Sent as the bearer token of every request
    Direct,
}

impl_wire_name_conversions!(JwtMode {
    Exchange => "exchange",
    Direct => "direct",
});

fn default_token_lifetime() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

/// Which token storage backend to construct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    File { path: PathBuf },
    Keyring {
        #[serde(default = "default_keyring_service")]
        service: String,
        #[serde(default = "default_keyring_account")]
        account: String,
    },
}

fn default_keyring_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}

fn default_keyring_account() -> String {
    DEFAULT_KEYRING_ACCOUNT.to_string()
}

/// Log output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_wire_name_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `groupvan_infra=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}
