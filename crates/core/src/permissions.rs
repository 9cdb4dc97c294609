//! Permission resolution.
//!
//! A user's effective permissions come from three places: the admin
//! allow-list (admins can do everything), their stored permission record,
//! and an optional admin-set access override whose `Some` fields win over
//! the record.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Default for `can_create_plans` on a lazily created permission record.
pub const DEFAULT_CAN_CREATE_PLANS: bool = true;

/// Default for `can_view_projects` on a lazily created permission record.
pub const DEFAULT_CAN_VIEW_PROJECTS: bool = true;

/// The flags stored in a permission record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    pub can_create_plans: bool,
    pub can_view_projects: bool,
    /// Brands the user may see. Empty means every brand.
    #[serde(default)]
    pub allowed_brand_ids: Vec<DbId>,
}

impl Default for PermissionFlags {
    fn default() -> Self {
        Self {
            can_create_plans: DEFAULT_CAN_CREATE_PLANS,
            can_view_projects: DEFAULT_CAN_VIEW_PROJECTS,
            allowed_brand_ids: Vec::new(),
        }
    }
}

/// Admin-set values that replace the record's flags when `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideFlags {
    pub can_create_plans: Option<bool>,
    pub can_view_projects: Option<bool>,
}

/// What a signed-in user is allowed to do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermissions {
    pub user_id: DbId,
    pub is_admin: bool,
    pub can_create_plans: bool,
    pub can_view_projects: bool,
    pub allowed_brand_ids: Vec<DbId>,
}

impl EffectivePermissions {
    pub fn resolve(
        user_id: DbId,
        is_admin: bool,
        record: &PermissionFlags,
        access_override: Option<&OverrideFlags>,
    ) -> Self {
        if is_admin {
            return Self {
                user_id,
                is_admin,
                can_create_plans: true,
                can_view_projects: true,
                allowed_brand_ids: Vec::new(),
            };
        }
        let ov = access_override.cloned().unwrap_or_default();
        Self {
            user_id,
            is_admin,
            can_create_plans: ov.can_create_plans.unwrap_or(record.can_create_plans),
            can_view_projects: ov.can_view_projects.unwrap_or(record.can_view_projects),
            allowed_brand_ids: record.allowed_brand_ids.clone(),
        }
    }

    pub fn can_view_brand(&self, brand_id: DbId) -> bool {
        if self.is_admin {
            return true;
        }
        self.can_view_projects
            && (self.allowed_brand_ids.is_empty() || self.allowed_brand_ids.contains(&brand_id))
    }

    /// Whether a plan with the given brand and creator is visible.
    ///
    /// Unassigned plans are visible to anyone who can view projects; users
    /// who cannot only see the unassigned plans they created themselves.
    pub fn can_view_plan(&self, brand_id: Option<DbId>, created_by: Option<DbId>) -> bool {
        match brand_id {
            Some(id) => self.can_view_brand(id),
            None => {
                self.is_admin || self.can_view_projects || created_by == Some(self.user_id)
            }
        }
    }

    pub fn require_create(&self) -> Result<(), CoreError> {
        if self.can_create_plans {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "You do not have permission to create or edit plans".into(),
            ))
        }
    }

    pub fn require_brand(&self, brand_id: DbId) -> Result<(), CoreError> {
        if self.can_view_brand(brand_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "You do not have access to brand {brand_id}"
            )))
        }
    }

    pub fn require_plan(
        &self,
        brand_id: Option<DbId>,
        created_by: Option<DbId>,
    ) -> Result<(), CoreError> {
        if self.can_view_plan(brand_id, created_by) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "You do not have access to this plan".into(),
            ))
        }
    }
}
