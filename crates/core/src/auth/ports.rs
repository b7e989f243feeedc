//! Port interfaces for authentication
//!
//! The auth manager only talks to the outside world through these traits.
//! Storage backends and the HTTP auth endpoint live in `groupvan-infra`.

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_domain::{Credentials, RefreshToken, TokenGrant, TokenPair};

/// Persists the current token pair
///
/// Implementations must be safe under sequential calls. No cross-process
/// atomicity is assumed.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Replace the stored pair
    async fn store_tokens(&self, tokens: &TokenPair) -> GroupVanResult<()>;

    /// Read the stored pair, `None` when nothing is stored
    async fn get_tokens(&self) -> GroupVanResult<Option<TokenPair>>;

    /// Remove the stored pair; clearing empty storage is not an error
    async fn clear_tokens(&self) -> GroupVanResult<()>;
}

/// Remote token endpoint
#[async_trait]
pub trait AuthEndpoint: Send + Sync {
    /// Exchange credentials for a token grant
    async fn sign_in(&self, credentials: &Credentials) -> GroupVanResult<TokenGrant>;

    /// Mint a new access token from a refresh token
    async fn refresh(&self, refresh_token: &RefreshToken) -> GroupVanResult<TokenGrant>;

    /// Invalidate a session server-side
    async fn revoke(&self, tokens: &TokenPair) -> GroupVanResult<()>;
}

/// Supplies bearer tokens to the request pipeline
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A token valid for at least the refresh skew, refreshing if needed
    async fn access_token(&self) -> GroupVanResult<String>;

    /// Called once after the API answered 401 to `rejected`
    ///
    /// Returns a different token, or an authentication error.
    async fn refresh_after_rejection(&self, rejected: &str) -> GroupVanResult<String>;
}
