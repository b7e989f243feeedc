//! Platform credential store backend
//!
//! The whole token pair is stored as one JSON secret under
//! `(service, account)`. `keyring` calls block, so they run on the blocking
//! pool.

use std::sync::Arc;

use async_trait::async_trait;
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_core::auth::TokenStorage;
use groupvan_domain::TokenPair;
use keyring::Entry;
use tracing::debug;

use crate::errors::InfraError;

pub struct KeyringTokenStorage {
    entry: Arc<Entry>,
    service: String,
    account: String,
}

impl std::fmt::Debug for KeyringTokenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringTokenStorage")
            .field("service", &self.service)
            .field("account", &self.account)
            .finish()
    }
}

fn keyring_error(err: keyring::Error) -> GroupVanError {
    InfraError::from(err).into()
}

impl KeyringTokenStorage {
    pub fn new(service: &str, account: &str) -> GroupVanResult<Self> {
        let entry = Entry::new(service, account).map_err(keyring_error)?;
        Ok(Self { entry: Arc::new(entry), service: service.to_string(), account: account.to_string() })
    }

    async fn blocking<T, F>(&self, op: F) -> GroupVanResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Entry) -> GroupVanResult<T> + Send + 'static,
    {
        let entry = Arc::clone(&self.entry);
        tokio::task::spawn_blocking(move || op(&entry))
            .await
            .map_err(|err| GroupVanError::storage(format!("keychain task failed: {err}")))?
    }
}

#[async_trait]
impl TokenStorage for KeyringTokenStorage {
    async fn store_tokens(&self, tokens: &TokenPair) -> GroupVanResult<()> {
        let secret = serde_json::to_string(tokens)?;
        self.blocking(move |entry| entry.set_password(&secret).map_err(keyring_error)).await?;
        debug!(service = %self.service, "tokens stored in keychain");
        Ok(())
    }

    async fn get_tokens(&self) -> GroupVanResult<Option<TokenPair>> {
        let secret = self
            .blocking(|entry| match entry.get_password() {
                Ok(secret) => Ok(Some(secret)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(err) => Err(keyring_error(err)),
            })
            .await?;

        match secret {
            Some(secret) => serde_json::from_str(&secret).map(Some).map_err(|err| {
                GroupVanError::storage(format!("keychain entry is not a token pair: {err}"))
            }),
            None => Ok(None),
        }
    }

    async fn clear_tokens(&self) -> GroupVanResult<()> {
        self.blocking(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(keyring_error(err)),
        })
        .await
    }
}
