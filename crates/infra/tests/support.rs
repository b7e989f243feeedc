//! Shared helpers for `groupvan-infra` integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use groupvan_common::error::{AuthErrorKind, GroupVanError, GroupVanResult};
use groupvan_common::resilience::RetryConfig;
use groupvan_core::auth::AccessTokenProvider;
use groupvan_domain::ClientConfig;
use groupvan_infra::api::ApiClient;
use parking_lot::Mutex;
use wiremock::MockServer;

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).expect("fixture should exist")
}

/// Millisecond backoff so retry tests stay fast on a real clock
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_retries(max_retries)
        .exponential_backoff(Duration::from_millis(10), 2.0, Duration::from_millis(50))
        .build()
        .expect("retry config should be valid")
}

/// Route `tracing` output through the test harness; `RUST_LOG` selects levels
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig { base_url: format!("{}/v3", server.uri()), ..ClientConfig::default() }
}

/// Client against `server` with fast retries and no token provider
pub fn anonymous_client(server: &MockServer, max_retries: u32) -> ApiClient {
    init_test_tracing();
    ApiClient::builder()
        .config(config_for(server))
        .retry(fast_retry(max_retries))
        .build()
        .expect("client should build")
}

pub fn client_with_auth(
    server: &MockServer,
    provider: Arc<dyn AccessTokenProvider>,
) -> ApiClient {
    init_test_tracing();
    ApiClient::builder()
        .config(config_for(server))
        .retry(fast_retry(3))
        .auth(provider)
        .build()
        .expect("client should build")
}

/// Hands out `initial` until a rejection, then `refreshed`
pub struct RotatingTokenProvider {
    current: Mutex<String>,
    refreshed: String,
    pub refreshes: AtomicU32,
    /// Refresh fails instead of rotating
    pub refresh_fails: bool,
}

impl RotatingTokenProvider {
    pub fn new(initial: &str, refreshed: &str) -> Self {
        Self {
            current: Mutex::new(initial.to_string()),
            refreshed: refreshed.to_string(),
            refreshes: AtomicU32::new(0),
            refresh_fails: false,
        }
    }

    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenProvider for RotatingTokenProvider {
    async fn access_token(&self) -> GroupVanResult<String> {
        Ok(self.current.lock().clone())
    }

    async fn refresh_after_rejection(&self, _rejected: &str) -> GroupVanResult<String> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails {
            return Err(GroupVanError::auth(AuthErrorKind::NotAuthenticated, "session ended"));
        }
        let mut current = self.current.lock();
        *current = self.refreshed.clone();
        Ok(current.clone())
    }
}
