//! Configuration loader
//!
//! Builds a [`ClientConfig`] from files and the environment.
//!
//! ## Loading Strategy
//! 1. Read `.env` from the working directory if present (`dotenvy`)
//! 2. Load the file named by `GROUPVAN_CONFIG`, else the first found
//!    config file, else start from defaults
//! 3. Apply `GROUPVAN_*` environment overrides on top
//! 4. [`validate`] the result
//!
//! ## Environment Variables
//! - `GROUPVAN_CONFIG`: Explicit config file path
//! - `GROUPVAN_BASE_URL`: API base URL
//! - `GROUPVAN_MAX_RETRIES`: Retry budget per call
//! - `GROUPVAN_TIMEOUT_SECS`: Receive and send timeout
//! - `GROUPVAN_CACHE_ENABLED`: Response cache on/off (true/false)
//! - `GROUPVAN_CACHE_TTL_SECS`: Response cache TTL
//! - `GROUPVAN_DEVELOPER_ID`, `GROUPVAN_KEY_ID`, `GROUPVAN_PRIVATE_KEY_PATH`:
//!   JWT issuer identity; all three are needed unless the file supplies the
//!   rest
//! - `GROUPVAN_JWT_MODE`: `exchange` or `direct`; needs a JWT identity
//! - `GROUPVAN_LOG_LEVEL`: `EnvFilter` directive
//! - `GROUPVAN_LOG_FORMAT`: `pretty` or `json`
//!
//! Empty values count as unset.
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./groupvan.toml` or `./groupvan.json` (current working directory)
//! 2. `../groupvan.toml` or `../groupvan.json` (parent directory)
//! 3. Relative to executable location

use std::path::{Path, PathBuf};

use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_domain::{ClientConfig, JwtConfig, JwtMode, LogFormat};
use url::Url;

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 2] = ["groupvan.toml", "groupvan.json"];

/// Load configuration with the full fallback strategy
///
/// # Errors
/// Returns `GroupVanError::Configuration` if:
/// - An explicitly named config file is missing or invalid
/// - An environment override has an invalid value
/// - The merged configuration fails [`validate`]
pub fn load() -> GroupVanResult<ClientConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let config = match env_var("GROUPVAN_CONFIG") {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match find_config_file() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::debug!("No config file found, starting from defaults");
                ClientConfig::default()
            }
        },
    };

    let config = apply_env_overrides(config)?;
    validate(&config)?;
    tracing::info!(base_url = %config.base_url, "Configuration loaded");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. Supports TOML and
/// JSON, detected by file extension. Missing sections take their defaults.
///
/// # Errors
/// Returns `GroupVanError::Configuration` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> GroupVanResult<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GroupVanError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            GroupVanError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GroupVanError::config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by the extension of `path` (`.toml` or `.json`).
///
/// # Errors
/// Returns `GroupVanError::Configuration` if format is invalid or parsing
/// fails.
pub fn parse_config(contents: &str, path: &Path) -> GroupVanResult<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GroupVanError::config(format!("Invalid JSON format: {e}"))),
        _ => Err(GroupVanError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Overlay `GROUPVAN_*` environment variables onto `config`
///
/// # Errors
/// Returns `GroupVanError::Configuration` naming the field for unparsable
/// numbers or formats, or a partial JWT identity.
pub fn apply_env_overrides(mut config: ClientConfig) -> GroupVanResult<ClientConfig> {
    if let Some(base_url) = env_var("GROUPVAN_BASE_URL") {
        config.base_url = base_url;
    }
    if let Some(retries) = env_parse::<u32>("GROUPVAN_MAX_RETRIES", "retry.max_retries")? {
        config.retry.max_retries = retries;
    }
    if let Some(secs) = env_parse::<u64>("GROUPVAN_TIMEOUT_SECS", "timeouts.receive_secs")? {
        config.timeouts.receive_secs = secs;
        config.timeouts.send_secs = secs;
    }
    if let Some(enabled) = env_bool("GROUPVAN_CACHE_ENABLED") {
        config.cache.enabled = enabled;
    }
    if let Some(ttl) = env_parse::<u64>("GROUPVAN_CACHE_TTL_SECS", "cache.ttl_secs")? {
        config.cache.ttl_secs = ttl;
    }
    if let Some(level) = env_var("GROUPVAN_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env_var("GROUPVAN_LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .map_err(|e| GroupVanError::config_field("logging.format", e))?;
    }

    config.jwt = merge_jwt_env(config.jwt.take())?;
    if let Some(mode) = env_var("GROUPVAN_JWT_MODE") {
        let mode =
            mode.parse::<JwtMode>().map_err(|e| GroupVanError::config_field("jwt.mode", e))?;
        let jwt = config
            .jwt
            .as_mut()
            .ok_or_else(|| GroupVanError::config_field("jwt.mode", "no JWT identity configured"))?;
        jwt.mode = mode;
    }
    Ok(config)
}

fn merge_jwt_env(existing: Option<JwtConfig>) -> GroupVanResult<Option<JwtConfig>> {
    let developer_id = env_var("GROUPVAN_DEVELOPER_ID");
    let key_id = env_var("GROUPVAN_KEY_ID");
    let key_path = env_var("GROUPVAN_PRIVATE_KEY_PATH").map(PathBuf::from);

    if developer_id.is_none() && key_id.is_none() && key_path.is_none() {
        return Ok(existing);
    }

    let (base_developer, base_key, base_path, lifetime_secs, mode) = match existing {
        Some(jwt) => (
            Some(jwt.developer_id),
            Some(jwt.key_id),
            Some(jwt.private_key_path),
            jwt.lifetime_secs,
            jwt.mode,
        ),
        None => (
            None,
            None,
            None,
            groupvan_domain::constants::DEFAULT_TOKEN_LIFETIME_SECS,
            JwtMode::default(),
        ),
    };

    let missing = |field: &str, var: &str| {
        GroupVanError::config_field(field, format!("{var} is required when any JWT variable is set"))
    };

    Ok(Some(JwtConfig {
        developer_id: developer_id
            .or(base_developer)
            .ok_or_else(|| missing("jwt.developer_id", "GROUPVAN_DEVELOPER_ID"))?,
        key_id: key_id.or(base_key).ok_or_else(|| missing("jwt.key_id", "GROUPVAN_KEY_ID"))?,
        private_key_path: key_path
            .or(base_path)
            .ok_or_else(|| missing("jwt.private_key_path", "GROUPVAN_PRIVATE_KEY_PATH"))?,
        lifetime_secs,
        mode,
    }))
}

/// Check the merged configuration for values no client could use
///
/// # Errors
/// The first offending field as `GroupVanError::Configuration`.
pub fn validate(config: &ClientConfig) -> GroupVanResult<()> {
    if config.base_url.trim().is_empty() {
        return Err(GroupVanError::config_field("base_url", "must not be empty"));
    }
    let url = Url::parse(&config.base_url).map_err(|e| GroupVanError::from(InfraError::from(e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GroupVanError::config_field(
            "base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if config.retry.multiplier <= 0.0 {
        return Err(GroupVanError::config_field("retry.multiplier", "must be greater than zero"));
    }
    if config.cache.enabled && config.cache.max_entries == 0 {
        return Err(GroupVanError::config_field("cache.max_entries", "must be at least 1"));
    }

    if let Some(jwt) = &config.jwt {
        if jwt.developer_id.trim().is_empty() {
            return Err(GroupVanError::config_field("jwt.developer_id", "must not be empty"));
        }
        if jwt.key_id.trim().is_empty() {
            return Err(GroupVanError::config_field("jwt.key_id", "must not be empty"));
        }
        if !jwt.private_key_path.is_file() {
            return Err(GroupVanError::config_field(
                "jwt.private_key_path",
                format!("key file not found: {}", jwt.private_key_path.display()),
            ));
        }
    }

    Ok(())
}

/// Non-empty environment variable
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, field: &str) -> GroupVanResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| GroupVanError::config_field(field, format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str) -> Option<bool> {
    env_var(key).map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        let cases = [("1", true), ("TRUE", true), ("on", true), ("no", false), ("0", false)];
        for (value, expected) in cases {
            std::env::set_var("GROUPVAN_TEST_BOOL", value);
            assert_eq!(env_bool("GROUPVAN_TEST_BOOL"), Some(expected), "value {value}");
        }

        std::env::set_var("GROUPVAN_TEST_BOOL", "");
        assert_eq!(env_bool("GROUPVAN_TEST_BOOL"), None);
        std::env::remove_var("GROUPVAN_TEST_BOOL");
        assert_eq!(env_bool("GROUPVAN_TEST_BOOL"), None);
    }

    #[test]
    fn test_invalid_number_names_field() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("GROUPVAN_MAX_RETRIES", "lots");
        let err = apply_env_overrides(ClientConfig::default()).unwrap_err();
        std::env::remove_var("GROUPVAN_MAX_RETRIES");

        assert!(matches!(
            err,
            GroupVanError::Configuration { field: Some(ref f), .. } if f == "retry.max_retries"
        ));
    }

    #[test]
    fn test_partial_jwt_identity_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("GROUPVAN_DEVELOPER_ID", "dev-1");
        let err = apply_env_overrides(ClientConfig::default()).unwrap_err();
        std::env::remove_var("GROUPVAN_DEVELOPER_ID");

        assert!(matches!(
            err,
            GroupVanError::Configuration { field: Some(ref f), .. } if f == "jwt.key_id"
        ));
    }

    #[test]
    fn test_jwt_mode_override() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("GROUPVAN_JWT_MODE", "direct");
        let without_identity = apply_env_overrides(ClientConfig::default());
        let config = ClientConfig {
            jwt: Some(JwtConfig {
                developer_id: "dev".into(),
                key_id: "k".into(),
                private_key_path: PathBuf::from("/k.pem"),
                lifetime_secs: 300,
                mode: JwtMode::Exchange,
            }),
            ..ClientConfig::default()
        };
        let with_identity = apply_env_overrides(config);
        std::env::remove_var("GROUPVAN_JWT_MODE");

        assert!(matches!(
            without_identity,
            Err(GroupVanError::Configuration { field: Some(ref f), .. }) if f == "jwt.mode"
        ));
        assert_eq!(with_identity.unwrap().jwt.map(|jwt| jwt.mode), Some(JwtMode::Direct));
    }

    #[test]
    fn test_parse_config_toml_fills_defaults() {
        let toml_content = r#"
base_url = "https://staging.groupvan.test/v3"

[retry]
max_retries = 5
"#;

        let config = parse_config(toml_content, Path::new("groupvan.toml")).unwrap();
        assert_eq!(config.base_url, "https://staging.groupvan.test/v3");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.timeouts, ClientConfig::default().timeouts);
    }

    #[test]
    fn test_parse_config_json_storage_backend() {
        let json_content = r#"{ "storage": { "backend": "file", "path": "/tmp/tokens.json" } }"#;

        let config = parse_config(json_content, Path::new("groupvan.json")).unwrap();
        assert_eq!(
            config.storage,
            groupvan_domain::StorageConfig::File { path: PathBuf::from("/tmp/tokens.json") }
        );
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("groupvan.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_validate_rejects_bad_scheme_and_multiplier() {
        let mut config =
            ClientConfig { base_url: "ftp://api.groupvan.com".into(), ..ClientConfig::default() };
        assert!(validate(&config).is_err());

        config.base_url = "https://api.groupvan.com/v3".into();
        assert!(validate(&config).is_ok());

        config.retry.multiplier = 0.0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            GroupVanError::Configuration { field: Some(ref f), .. } if f == "retry.multiplier"
        ));
    }

    #[test]
    fn test_validate_requires_existing_key_file() {
        let config = ClientConfig {
            jwt: Some(JwtConfig {
                developer_id: "dev".into(),
                key_id: "k".into(),
                private_key_path: PathBuf::from("/nonexistent/key.pem"),
                lifetime_secs: 300,
                mode: JwtMode::Exchange,
            }),
            ..ClientConfig::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            GroupVanError::Configuration { field: Some(ref f), .. } if f == "jwt.private_key_path"
        ));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/groupvan.toml")));
        assert_eq!(result.unwrap_err().label(), "configuration");
    }
}
