//! Token storage backends
//!
//! - [`FileTokenStorage`]: JSON file, owner-only permissions on Unix
//! - [`KeyringTokenStorage`]: platform credential store via `keyring`
//! - `MemoryTokenStorage` (from `groupvan-core`): process lifetime only

pub mod file;
pub mod keychain;

use std::sync::Arc;

use groupvan_common::error::GroupVanResult;
use groupvan_core::auth::{MemoryTokenStorage, TokenStorage};
use groupvan_domain::StorageConfig;
use tracing::debug;

pub use self::file::FileTokenStorage;
pub use self::keychain::KeyringTokenStorage;

/// Construct the backend named by `config`
pub fn build_storage(config: &StorageConfig) -> GroupVanResult<Arc<dyn TokenStorage>> {
    let storage: Arc<dyn TokenStorage> = match config {
        StorageConfig::Memory => Arc::new(MemoryTokenStorage::new()),
        StorageConfig::File { path } => Arc::new(FileTokenStorage::new(path.clone())),
        StorageConfig::Keyring { service, account } => {
            Arc::new(KeyringTokenStorage::new(service, account)?)
        }
    };
    debug!(backend = ?config, "token storage constructed");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use groupvan_domain::TokenPair;

    use super::*;

    #[tokio::test]
    async fn memory_backend_round_trips() {
        let storage = build_storage(&StorageConfig::Memory).unwrap();
        storage.store_tokens(&TokenPair::new("a", None)).await.unwrap();
        assert_eq!(storage.get_tokens().await.unwrap().unwrap().access_token, "a");
    }

    #[tokio::test]
    async fn file_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let storage = build_storage(&StorageConfig::File { path: path.clone() }).unwrap();

        storage.store_tokens(&TokenPair::new("a", Some("r".into()))).await.unwrap();
        assert!(path.exists());
    }
}
