//! Conversions from external infrastructure errors into the client taxonomy.

use std::error::Error as StdError;

use groupvan_common::error::{GroupVanError, NetworkErrorKind};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the taxonomy error.
#[derive(Debug)]
pub struct InfraError(pub GroupVanError);

impl From<InfraError> for GroupVanError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<GroupVanError> for InfraError {
    fn from(value: GroupVanError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoGroupVanError {
    fn into_groupvan(self) -> GroupVanError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → GroupVanError */
/* -------------------------------------------------------------------------- */

/// True when any error in the source chain mentions name resolution
fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        let text = err.to_string().to_ascii_lowercase();
        if text.contains("dns") || text.contains("failed to lookup address") {
            return true;
        }
        current = err.source();
    }
    false
}

impl IntoGroupVanError for HttpError {
    fn into_groupvan(self) -> GroupVanError {
        let url = self.url().map(ToString::to_string).unwrap_or_default();

        if self.is_timeout() {
            return GroupVanError::network(
                NetworkErrorKind::Timeout,
                format!("HTTP request to {url} timed out"),
            );
        }

        if self.is_builder() {
            return GroupVanError::config(format!("invalid HTTP request: {self}"));
        }

        if self.is_connect() {
            let kind = if is_dns_failure(&self) {
                NetworkErrorKind::Dns
            } else {
                NetworkErrorKind::Connection
            };
            return GroupVanError::network(kind, format!("HTTP connection failure for {url}"));
        }

        if let Some(status) = self.status() {
            return GroupVanError::from_status(status.as_u16(), &url, "", None);
        }

        GroupVanError::network(NetworkErrorKind::Other, self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_groupvan())
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → GroupVanError */
/* -------------------------------------------------------------------------- */

impl IntoGroupVanError for KeyringError {
    fn into_groupvan(self) -> GroupVanError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => GroupVanError::storage("keychain entry not found"),
            BadEncoding(_) => GroupVanError::storage("credential in keychain is not valid UTF-8"),
            TooLong(name, limit) => GroupVanError::storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => {
                GroupVanError::storage(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            Ambiguous(entries) => GroupVanError::storage(format!(
                "multiple keychain entries matched request ({} results)",
                entries.len()
            )),
            PlatformFailure(err) => GroupVanError::storage(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                GroupVanError::storage(format!("unable to access secure storage: {err}"))
            }
            _ => GroupVanError::storage(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_groupvan())
    }
}

/* -------------------------------------------------------------------------- */
/* jsonwebtoken::Error → GroupVanError */
/* -------------------------------------------------------------------------- */

impl IntoGroupVanError for JwtError {
    fn into_groupvan(self) -> GroupVanError {
        match self.kind() {
            JwtErrorKind::InvalidRsaKey(_) | JwtErrorKind::InvalidKeyFormat => {
                GroupVanError::config_field("jwt.private_key_path", "not a valid RSA PEM key")
            }
            JwtErrorKind::InvalidAlgorithm | JwtErrorKind::InvalidAlgorithmName => {
                GroupVanError::config(format!("unsupported JWT algorithm: {self}"))
            }
            JwtErrorKind::ExpiredSignature => GroupVanError::auth(
                groupvan_common::error::AuthErrorKind::ExpiredToken,
                "JWT has expired",
            ),
            JwtErrorKind::InvalidSignature
            | JwtErrorKind::InvalidAudience
            | JwtErrorKind::InvalidIssuer
            | JwtErrorKind::InvalidToken
            | JwtErrorKind::ImmatureSignature
            | JwtErrorKind::MissingRequiredClaim(_) => GroupVanError::auth(
                groupvan_common::error::AuthErrorKind::InvalidToken,
                format!("JWT rejected: {self}"),
            ),
            _ => GroupVanError::data(format!("JWT encoding error: {self}")),
        }
    }
}

impl From<JwtError> for InfraError {
    fn from(value: JwtError) -> Self {
        InfraError(value.into_groupvan())
    }
}

/* -------------------------------------------------------------------------- */
/* config parsing errors → GroupVanError */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(GroupVanError::config(format!("Invalid TOML format: {value}")))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(GroupVanError::config_field("base_url", format!("invalid URL: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
