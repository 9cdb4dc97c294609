//! Per-user permission record model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyplan_core::permissions::PermissionFlags;
use storyplan_core::types::{DbId, Timestamp};

/// A row from the `user_permissions` table. One per user, created lazily.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserPermission {
    pub user_id: DbId,
    pub email: String,
    pub can_create_plans: bool,
    pub can_view_projects: bool,
    /// Empty means every brand.
    pub allowed_brand_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserPermission {
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            can_create_plans: self.can_create_plans,
            can_view_projects: self.can_view_projects,
            allowed_brand_ids: self.allowed_brand_ids.clone(),
        }
    }
}

/// DTO for creating a permission record.
#[derive(Debug, Clone)]
pub struct CreatePermission {
    pub user_id: DbId,
    pub email: String,
    pub flags: PermissionFlags,
}

/// DTO for updating a permission record. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePermission {
    pub can_create_plans: Option<bool>,
    pub can_view_projects: Option<bool>,
    pub allowed_brand_ids: Option<Vec<DbId>>,
}
