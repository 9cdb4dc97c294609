//! Per-user effective permission cache.
//!
//! Permissions are loaded on first use and memoized by user id. The
//! permission record is created with default flags the first time a user is
//! seen. Anything that changes a user's record or override must call
//! [`PermissionCache::invalidate`] so the next request reloads it.

use std::collections::HashMap;

use storyplan_core::permissions::{EffectivePermissions, PermissionFlags};
use storyplan_core::types::DbId;
use storyplan_db::models::permission::CreatePermission;
use storyplan_db::store::{AnalyticsStore, PermissionStore, Store, StoreError};
use tokio::sync::RwLock;

pub struct PermissionCache {
    entries: RwLock<HashMap<DbId, EffectivePermissions>>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached permissions for `user_id`, loading them on a miss.
    pub async fn get_or_load(
        &self,
        user_id: DbId,
        email: &str,
        is_admin: bool,
        store: &dyn Store,
    ) -> Result<EffectivePermissions, StoreError> {
        if let Some(hit) = self.entries.read().await.get(&user_id) {
            return Ok(hit.clone());
        }

        let resolved = load(user_id, email, is_admin, store).await?;
        self.entries.write().await.insert(user_id, resolved.clone());
        tracing::debug!(user_id, is_admin, "Loaded effective permissions");
        Ok(resolved)
    }

    pub async fn invalidate(&self, user_id: DbId) {
        self.entries.write().await.remove(&user_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve permissions straight from the store, creating the record with
/// default flags if the user has none yet.
pub async fn load(
    user_id: DbId,
    email: &str,
    is_admin: bool,
    store: &dyn Store,
) -> Result<EffectivePermissions, StoreError> {
    let record = match store.find_permission(user_id).await? {
        Some(record) => record,
        None => {
            store
                .create_permission(&CreatePermission {
                    user_id,
                    email: email.to_string(),
                    flags: PermissionFlags::default(),
                })
                .await?
        }
    };
    let access_override = store.find_override(user_id).await?;

    Ok(EffectivePermissions::resolve(
        user_id,
        is_admin,
        &record.flags(),
        access_override.map(|o| o.flags()).as_ref(),
    ))
}
