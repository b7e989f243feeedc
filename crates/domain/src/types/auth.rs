//! Authentication types
//!
//! Token values are secrets: every type here that holds one implements
//! `Debug` by hand so the value never reaches a log line.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;

/// Claims carried by an access token
///
/// All fields are optional because tokens minted by different deployments
/// carry different subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Developer / client id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Bearer token with its absolute expiry
///
/// Immutable once issued. A refresh produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
    claims: TokenClaims,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>, claims: TokenClaims) -> Self {
        Self { value: value.into(), expires_at, claims }
    }

    /// The raw bearer string
    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// True when `now` is inside the refresh window (`expires_at - skew`)
    pub fn needs_refresh(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::MAX);
        match self.expires_at.checked_sub_signed(skew) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    /// Time until the refresh window opens, zero if it already has
    pub fn time_until_refresh(&self, now: DateTime<Utc>, skew: Duration) -> Duration {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::MAX);
        self.expires_at
            .checked_sub_signed(skew)
            .and_then(|deadline| (deadline - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &crate::constants::REDACTED)
            .field("expires_at", &self.expires_at)
            .field("claims", &self.claims)
            .finish()
    }
}

/// Credential used to mint new access tokens
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&crate::constants::REDACTED).finish()
    }
}

/// The persisted form of a session, as handed to token storage
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds; absent for tokens whose expiry is read from the `exp`
    /// claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token, expires_at: None }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at.timestamp());
        self
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &crate::constants::REDACTED)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| crate::constants::REDACTED))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Successful response body of the sign-in and refresh endpoints
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &crate::constants::REDACTED)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| crate::constants::REDACTED))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// What the caller presents to sign in
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Interactive user credentials
    Password { username: String, password: String },
    /// A signed JWT minted with the developer's private key
    ClientAssertion { assertion: String },
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password { username: username.into(), password: password.into() }
    }

    pub fn client_assertion(assertion: impl Into<String>) -> Self {
        Self::ClientAssertion { assertion: assertion.into() }
    }

    /// Name of the grant, used in logs
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::ClientAssertion { .. } => "client_assertion",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &crate::constants::REDACTED)
                .finish(),
            Self::ClientAssertion { .. } => f
                .debug_struct("ClientAssertion")
                .field("assertion", &crate::constants::REDACTED)
                .finish(),
        }
    }
}

/// Options for ending a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOutOptions {
    /// Also call the remote revoke endpoint
    pub revoke_remote: bool,
}

impl SignOutOptions {
    pub fn revoke() -> Self {
        Self { revoke_remote: true }
    }
}

/// The live authentication state of one auth manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    Authenticated { access_token: AccessToken },
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        match self {
            Self::Authenticated { access_token } => Some(access_token),
            Self::Unauthenticated => None,
        }
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        self.access_token().map(AccessToken::claims)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token().map(AccessToken::expires_at)
    }
}

/// Discriminant of [`AuthEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl_wire_name_conversions!(AuthEventKind {
    SignedIn => "signed_in",
    SignedOut => "signed_out",
    TokenRefreshed => "token_refreshed",
});

/// Auth-state transition broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { claims: TokenClaims, expires_at: DateTime<Utc> },
    SignedOut,
    TokenRefreshed { expires_at: DateTime<Utc> },
}

impl AuthEvent {
    pub fn kind(&self) -> AuthEventKind {
        match self {
            Self::SignedIn { .. } => AuthEventKind::SignedIn,
            Self::SignedOut => AuthEventKind::SignedOut,
            Self::TokenRefreshed { .. } => AuthEventKind::TokenRefreshed,
        }
    }
}
