//! Admin-set access override model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyplan_core::permissions::OverrideFlags;
use storyplan_core::types::{DbId, Timestamp};

/// A row from the `access_overrides` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccessOverride {
    pub user_id: DbId,
    pub email: String,
    pub can_create_plans: Option<bool>,
    pub can_view_projects: Option<bool>,
    pub note: Option<String>,
    pub updated_at: Timestamp,
}

impl AccessOverride {
    pub fn flags(&self) -> OverrideFlags {
        OverrideFlags {
            can_create_plans: self.can_create_plans,
            can_view_projects: self.can_view_projects,
        }
    }
}

/// DTO for creating or replacing a user's override.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertAccessOverride {
    #[serde(skip)]
    pub email: String,
    pub can_create_plans: Option<bool>,
    pub can_view_projects: Option<bool>,
    pub note: Option<String>,
}
