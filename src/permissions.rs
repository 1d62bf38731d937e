//! Role and permission metadata, fetched once per client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::Result;
use crate::protocol::RoleId;

/// A role as described by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
    pub display: String,
}

/// A permission as described by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PermissionInfo {
    pub name: String,
    /// Bit of the grants mask this permission occupies.
    pub mask: u64,
    /// Lowest role granted this permission by default.
    pub min_role: RoleId,
}

/// Body of `GET /data/permissions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PermissionsMetadata {
    pub roles: Vec<RoleInfo>,
    pub permissions: Vec<PermissionInfo>,
}

/// Memoized [`PermissionsMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionsCache {
    loaded: bool,
    roles: BTreeMap<RoleId, RoleInfo>,
    permissions: Vec<PermissionInfo>,
}

impl PermissionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Store fetched metadata. Roles are keyed by id; a later duplicate wins.
    pub fn apply(&mut self, metadata: PermissionsMetadata) {
        for role in metadata.roles {
            self.roles.insert(role.id, role);
        }
        self.permissions = metadata.permissions;
        self.loaded = true;
    }

    pub fn role(&self, id: RoleId) -> Option<&RoleInfo> {
        self.roles.get(&id)
    }

    pub fn roles(&self) -> &BTreeMap<RoleId, RoleInfo> {
        &self.roles
    }

    pub fn permissions(&self) -> &[PermissionInfo] {
        &self.permissions
    }
}

/// Fetch and apply permissions metadata unless it is already loaded.
///
/// The lock is not held across the fetch, so callers racing before the first
/// fetch completes each issue their own request; applying twice is harmless.
///
/// # Errors
///
/// Propagates the API error; the cache stays unloaded.
pub async fn ensure_loaded(cache: &Mutex<PermissionsCache>, api: &dyn ApiClient) -> Result<()> {
    if cache.lock().await.is_loaded() {
        return Ok(());
    }
    debug!("fetching permissions metadata");
    let metadata = api.fetch_permissions().await?;
    cache.lock().await.apply(metadata);
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::OttError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApi {
        fetches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ApiClient for CountingApi {
        async fn claim_username(&self, _username: &str) -> Result<()> {
            Ok(())
        }

        async fn fetch_permissions(&self) -> Result<PermissionsMetadata> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(OttError::Http("503 Service Unavailable".into()));
            }
            Ok(serde_json::from_str(
                r#"{
                    "roles": [
                        {"id": 0, "name": "unregistered", "display": "Unregistered User"},
                        {"id": 1, "name": "registered", "display": "Registered User"},
                        {"id": 1, "name": "registered", "display": "Member"}
                    ],
                    "permissions": [
                        {"name": "playback.play-pause", "mask": 1, "minRole": 0},
                        {"name": "manage-queue.add", "mask": 4, "minRole": 0}
                    ]
                }"#,
            )
            .unwrap())
        }
    }

    #[tokio::test]
    async fn sequential_calls_fetch_once() {
        let api = CountingApi {
            fetches: AtomicUsize::new(0),
            fail: false,
        };
        let cache = Mutex::new(PermissionsCache::new());

        ensure_loaded(&cache, &api).await.unwrap();
        ensure_loaded(&cache, &api).await.unwrap();

        assert_eq!(api.fetches.load(Ordering::SeqCst), 1);
        let cache = cache.lock().await;
        assert!(cache.is_loaded());
        assert_eq!(cache.roles().len(), 2);
        assert_eq!(cache.role(1).unwrap().display, "Member");
        assert_eq!(cache.permissions().len(), 2);
        assert_eq!(cache.permissions()[1].name, "manage-queue.add");
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_unloaded() {
        let api = CountingApi {
            fetches: AtomicUsize::new(0),
            fail: true,
        };
        let cache = Mutex::new(PermissionsCache::new());

        assert!(ensure_loaded(&cache, &api).await.is_err());
        assert!(!cache.lock().await.is_loaded());

        // A later call retries.
        assert!(ensure_loaded(&cache, &api).await.is_err());
        assert_eq!(api.fetches.load(Ordering::SeqCst), 2);
    }
}
