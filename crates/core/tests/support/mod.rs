//! Shared test helpers for `groupvan-core` integration tests.
//!
//! A scripted auth endpoint that counts calls, so tests can focus on the
//! manager's behaviour instead of boilerplate.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_common::time::MockClock;
use groupvan_core::auth::{AuthEndpoint, AuthManager, MemoryTokenStorage, TokenStorage};
use groupvan_domain::{Credentials, RefreshToken, TokenGrant, TokenPair};

pub const EPOCH: u64 = 1_700_000_000;
pub const PASSWORD: &str = "correct-horse";

/// Auth endpoint double with call counters and a configurable refresh delay
pub struct FakeAuthEndpoint {
    pub sign_in_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub fail_revoke: AtomicBool,
    pub refresh_delay: Duration,
    pub expires_in: u64,
}

impl Default for FakeAuthEndpoint {
    fn default() -> Self {
        Self {
            sign_in_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            fail_revoke: AtomicBool::new(false),
            refresh_delay: Duration::ZERO,
            expires_in: 3600,
        }
    }
}

impl FakeAuthEndpoint {
    pub fn with_refresh_delay(delay: Duration) -> Self {
        Self { refresh_delay: delay, ..Self::default() }
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revokes(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthEndpoint for FakeAuthEndpoint {
    async fn sign_in(&self, credentials: &Credentials) -> GroupVanResult<TokenGrant> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        match credentials {
            Credentials::Password { password, .. } if password == PASSWORD => Ok(TokenGrant {
                access_token: "access-0".into(),
                refresh_token: Some("refresh-0".into()),
                expires_in: Some(self.expires_in),
                token_type: Some("Bearer".into()),
            }),
            _ => Err(GroupVanError::from_status(401, "/auth/token", "invalid credentials", None)),
        }
    }

    async fn refresh(&self, refresh_token: &RefreshToken) -> GroupVanResult<TokenGrant> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(GroupVanError::from_status(401, "/auth/refresh", "refresh token revoked", None));
        }
        assert!(refresh_token.secret().starts_with("refresh-"));
        Ok(TokenGrant {
            access_token: format!("access-{n}"),
            refresh_token: Some(format!("refresh-{n}")),
            expires_in: Some(self.expires_in),
            token_type: Some("Bearer".into()),
        })
    }

    async fn revoke(&self, _tokens: &TokenPair) -> GroupVanResult<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(GroupVanError::http(500, "/auth/revoke", "revoke unavailable"));
        }
        Ok(())
    }
}

/// Manager wired to `endpoint`, fresh in-memory storage and a mock clock
pub fn manager_with(
    endpoint: Arc<FakeAuthEndpoint>,
) -> (AuthManager, Arc<MemoryTokenStorage>, MockClock) {
    let storage = Arc::new(MemoryTokenStorage::new());
    let clock = MockClock::at_unix(EPOCH);
    let manager = AuthManager::builder(endpoint, storage.clone())
        .clock(Arc::new(clock.clone()))
        .build();
    (manager, storage, clock)
}

pub fn good_credentials() -> Credentials {
    Credentials::password("parts@shop.example", PASSWORD)
}

/// In-memory storage whose writes take `store_delay`
pub struct SlowStorage {
    pub inner: MemoryTokenStorage,
    pub store_delay: Duration,
}

impl SlowStorage {
    pub fn new(store_delay: Duration) -> Self {
        Self { inner: MemoryTokenStorage::new(), store_delay }
    }
}

#[async_trait]
impl TokenStorage for SlowStorage {
    async fn store_tokens(&self, tokens: &TokenPair) -> GroupVanResult<()> {
        tokio::time::sleep(self.store_delay).await;
        self.inner.store_tokens(tokens).await
    }

    async fn get_tokens(&self) -> GroupVanResult<Option<TokenPair>> {
        self.inner.get_tokens().await
    }

    async fn clear_tokens(&self) -> GroupVanResult<()> {
        self.inner.clear_tokens().await
    }
}
