//! Process-wide handle
//!
//! Optional convenience over passing a [`GroupVan`] around. Nothing here
//! constructs a default client: [`GroupVan::instance`] fails with
//! `NotInitialized` until [`GroupVan::initialize`] succeeds.

use groupvan_common::error::{GroupVanError, GroupVanResult};
use groupvan_domain::ClientConfig;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::GroupVan;

static INSTANCE: Lazy<RwLock<Option<GroupVan>>> = Lazy::new(|| RwLock::new(None));

impl GroupVan {
    /// Initialize and install the process-wide handle
    ///
    /// A previously installed handle is disposed and replaced.
    pub async fn initialize(config: ClientConfig) -> GroupVanResult<GroupVan> {
        let handle = GroupVan::init(config).await?;
        let previous = INSTANCE.write().replace(handle.clone());
        if let Some(previous) = previous {
            debug!("replacing process-wide GroupVAN handle");
            previous.dispose();
        }
        Ok(handle)
    }

    /// The process-wide handle
    ///
    /// # Errors
    /// `NotInitialized` before [`initialize`](Self::initialize) or after
    /// [`shutdown`](Self::shutdown).
    pub fn instance() -> GroupVanResult<GroupVan> {
        INSTANCE.read().clone().ok_or(GroupVanError::NotInitialized)
    }

    /// Dispose and remove the process-wide handle, if any
    pub fn shutdown() {
        if let Some(handle) = INSTANCE.write().take() {
            handle.dispose();
        }
    }
}
