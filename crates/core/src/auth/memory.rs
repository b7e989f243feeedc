//! In-process token storage
//!
//! Tokens live only as long as the process. Default backend when nothing
//! persistent is configured, and the double used by tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use groupvan_common::error::GroupVanResult;
use groupvan_domain::TokenPair;
use parking_lot::RwLock;

use super::ports::TokenStorage;

#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: RwLock<Option<TokenPair>>,
    clears: AtomicUsize,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded storage, as if a previous session had persisted `tokens`
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self { tokens: RwLock::new(Some(tokens)), clears: AtomicUsize::new(0) }
    }

    /// Synchronous peek, for diagnostics and tests
    pub fn snapshot(&self) -> Option<TokenPair> {
        self.tokens.read().clone()
    }

    /// How many times `clear_tokens` has been called
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn store_tokens(&self, tokens: &TokenPair) -> GroupVanResult<()> {
        *self.tokens.write() = Some(tokens.clone());
        Ok(())
    }

    async fn get_tokens(&self) -> GroupVanResult<Option<TokenPair>> {
        Ok(self.tokens.read().clone())
    }

    async fn clear_tokens(&self) -> GroupVanResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.tokens.write() = None;
        Ok(())
    }
}
