//! RS256 token issuer
//!
//! Token layout:
//!
//! ```text
//! header  {"alg":"RS256","typ":"JWT","kid":<key id>,"gv-ver":"GV-JWT-V1"}
//! claims  {"aud":"groupvan","iss":<developer id>,"kid":<key id>,"iat":..,"exp":..}
//! ```
//!
//! The header is assembled by hand because it carries the non-standard
//! `gv-ver` member.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use groupvan_common::error::{AuthErrorKind, GroupVanError, GroupVanResult};
use groupvan_common::time::{Clock, SystemClock};
use groupvan_domain::constants::{BEARER_PREFIX, JWT_AUDIENCE, JWT_VERSION};
use groupvan_domain::JwtConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::InfraError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
    pub kid: String,
    #[serde(rename = "gv-ver")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub aud: String,
    pub iss: String,
    pub kid: String,
    pub iat: i64,
    pub exp: i64,
}

/// A token whose signature, algorithm and audience have been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub header: JwtHeader,
    pub claims: JwtClaims,
}

fn jwt_error(err: jsonwebtoken::errors::Error) -> GroupVanError {
    InfraError::from(err).into()
}

fn malformed(message: impl Into<String>) -> GroupVanError {
    GroupVanError::auth(AuthErrorKind::InvalidToken, message)
}

/// Decode the header segment without verifying anything
pub fn decode_header(token: &str) -> GroupVanResult<JwtHeader> {
    let segment = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| malformed("empty token"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| malformed(format!("header is not base64url: {err}")))?;
    serde_json::from_slice(&bytes).map_err(|err| malformed(format!("header is not JSON: {err}")))
}

/// Mints client-assertion tokens with a developer's RSA key
pub struct JwtIssuer {
    developer_id: String,
    key_id: String,
    key: EncodingKey,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("developer_id", &self.developer_id)
            .field("key_id", &self.key_id)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl JwtIssuer {
    /// Load the PEM key named by `config`
    ///
    /// # Errors
    /// `Configuration` when the key file is unreadable or not an RSA key.
    pub fn new(config: &JwtConfig) -> GroupVanResult<Self> {
        let pem = std::fs::read(&config.private_key_path).map_err(|err| {
            GroupVanError::config_field(
                "jwt.private_key_path",
                format!("cannot read {}: {err}", config.private_key_path.display()),
            )
        })?;
        Self::from_pem(
            &config.developer_id,
            &config.key_id,
            &pem,
            Duration::from_secs(config.lifetime_secs),
        )
    }

    pub fn from_pem(
        developer_id: &str,
        key_id: &str,
        pem: &[u8],
        lifetime: Duration,
    ) -> GroupVanResult<Self> {
        if developer_id.is_empty() {
            return Err(GroupVanError::config_field("jwt.developer_id", "must not be empty"));
        }
        if key_id.is_empty() {
            return Err(GroupVanError::config_field("jwt.key_id", "must not be empty"));
        }
        let key = EncodingKey::from_rsa_pem(pem).map_err(jwt_error)?;
        Ok(Self {
            developer_id: developer_id.to_string(),
            key_id: key_id.to_string(),
            key,
            lifetime,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for `iat`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token valid for the configured lifetime
    pub fn issue(&self) -> GroupVanResult<String> {
        self.issue_with_lifetime(self.lifetime)
    }

    /// Issue a token with `exp = iat + expires_in`
    pub fn issue_with_lifetime(&self, expires_in: Duration) -> GroupVanResult<String> {
        self.mint(expires_in).map(|(token, _)| token)
    }

    /// Seconds since the epoch on the issuer's clock
    pub(crate) fn now(&self) -> i64 {
        self.clock.unix_seconds()
    }

    #[instrument(skip(self), fields(kid = %self.key_id))]
    pub(crate) fn mint(&self, expires_in: Duration) -> GroupVanResult<(String, JwtClaims)> {
        let iat = self.clock.unix_seconds();
        let header = JwtHeader {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
            kid: self.key_id.clone(),
            version: JWT_VERSION.to_string(),
        };
        let claims = JwtClaims {
            aud: JWT_AUDIENCE.to_string(),
            iss: self.developer_id.clone(),
            kid: self.key_id.clone(),
            iat,
            exp: iat.saturating_add(i64::try_from(expires_in.as_secs()).unwrap_or(i64::MAX)),
        };

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature =
            jsonwebtoken::crypto::sign(message.as_bytes(), &self.key, Algorithm::RS256)
                .map_err(jwt_error)?;

        debug!(iat, exp = claims.exp, "client assertion issued");
        Ok((format!("{message}.{signature}"), claims))
    }

    /// `Bearer <token>` for a freshly issued token
    pub fn authorization_header(&self) -> GroupVanResult<String> {
        Ok(format!("{BEARER_PREFIX}{}", self.issue()?))
    }

    /// Check signature, algorithm, audience and expiry against `public_pem`
    ///
    /// # Errors
    /// `Authentication(InvalidToken)` for a bad signature or audience,
    /// `Authentication(ExpiredToken)` past `exp`, `Configuration` for an
    /// unusable public key.
    pub fn verify(token: &str, public_pem: &[u8]) -> GroupVanResult<VerifiedToken> {
        let key = DecodingKey::from_rsa_pem(public_pem).map_err(jwt_error)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[JWT_AUDIENCE]);

        let data = jsonwebtoken::decode::<JwtClaims>(token, &key, &validation).map_err(jwt_error)?;
        Ok(VerifiedToken { header: decode_header(token)?, claims: data.claims })
    }
}
