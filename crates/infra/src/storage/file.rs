//! JSON-file token storage

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_core::auth::TokenStorage;
use groupvan_domain::TokenPair;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Persists the token pair as JSON at a fixed path
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Open `path` as a fresh file that only the owner can read
///
/// A leftover temp file from an interrupted write is removed first, since
/// the creation mode only applies to newly created files.
async fn create_private(path: &Path) -> std::io::Result<fs::File> {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn store_tokens(&self, tokens: &TokenPair) -> GroupVanResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(tokens)?;
        let temp = self.temp_path();
        let mut file = create_private(&temp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), "tokens written");
        Ok(())
    }

    async fn get_tokens(&self) -> GroupVanResult<Option<TokenPair>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "token file is corrupt");
            GroupVanError::storage(format!("token file {} is corrupt: {err}", self.path.display()))
        })
    }

    async fn clear_tokens(&self) -> GroupVanResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("absent.json"));
        assert!(storage.get_tokens().await.unwrap().is_none());
        storage.clear_tokens().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = FileTokenStorage::new(&path).get_tokens().await.unwrap_err();
        assert_eq!(err.label(), "storage");
    }

    #[tokio::test]
    async fn temp_file_does_not_linger() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("tokens.json"));
        storage.store_tokens(&TokenPair::new("a", None)).await.unwrap();

        assert!(!storage.temp_path().exists());
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("tokens.json"));
        storage.store_tokens(&TokenPair::new("a", None)).await.unwrap();

        let mode = std::fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_world_readable_temp_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("tokens.json"));
        std::fs::write(storage.temp_path(), b"partial").unwrap();
        std::fs::set_permissions(storage.temp_path(), std::fs::Permissions::from_mode(0o644))
            .unwrap();

        storage.store_tokens(&TokenPair::new("a", Some("r".into()))).await.unwrap();

        let mode = std::fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.get_tokens().await.unwrap().unwrap().access_token, "a");
    }
}
