//! Storage backends.
//!
//! Handlers never talk to a database directly; they hold an
//! `Arc<dyn Store>`. [`PgStore`] delegates to the Postgres repositories and
//! [`LocalStore`] keeps everything in a single JSON document. Which one runs
//! is a deployment-time choice.
//!
//! "Not found" is never an error here: lookups return `Ok(None)` and
//! mutations return `Ok(None)` / `Ok(false)` when the target is missing.

use async_trait::async_trait;
use storyplan_core::storyboard::PlanDocument;
use storyplan_core::types::{DbId, Timestamp};
use storyplan_core::writer::PlanWriter;

use crate::models::access_override::{AccessOverride, UpsertAccessOverride};
use crate::models::brand::{Brand, BrandWithCount, CreateBrand, UpdateBrand};
use crate::models::permission::{CreatePermission, UpdatePermission, UserPermission};
use crate::models::plan::{CreatePlan, Plan, PlanFilter, UpdatePlan};
use crate::models::session::{CreateSession, UserSession};
use crate::models::user::{CreateUser, User};
use crate::models::visit::{CreateVisit, Visit};

pub mod local;
pub mod pg;

pub use local::LocalStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Local store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local store document is invalid: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A uniqueness rule was violated (local backend; Postgres reports
    /// these as `Database` errors).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write through [`StoreWriter`] targeted a row that no longer exists.
    #[error("{entity} {id} no longer exists")]
    NotFound { entity: &'static str, id: DbId },
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BrandStore: Send + Sync {
    /// All brands ordered by `sort_order`, then creation time.
    async fn list_brands(&self) -> Result<Vec<BrandWithCount>, StoreError>;
    async fn find_brand(&self, id: DbId) -> Result<Option<Brand>, StoreError>;
    async fn create_brand(&self, input: &CreateBrand) -> Result<Brand, StoreError>;
    async fn update_brand(&self, id: DbId, input: &UpdateBrand)
        -> Result<Option<Brand>, StoreError>;
    /// Reassign the brand's plans to the unassigned group and delete it.
    /// Returns the number of plans moved.
    async fn delete_brand(&self, id: DbId) -> Result<Option<u64>, StoreError>;
    /// Renumber brands with `ids` first, in order, and the unlisted ones after
    /// them in their previous order. Returns the full reordered list.
    async fn reorder_brands(&self, ids: &[DbId]) -> Result<Vec<BrandWithCount>, StoreError>;
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Plans matching `filter`, most recently updated first.
    async fn list_plans(&self, filter: PlanFilter) -> Result<Vec<Plan>, StoreError>;
    async fn find_plan(&self, id: DbId) -> Result<Option<Plan>, StoreError>;
    async fn create_plan(&self, input: &CreatePlan) -> Result<Plan, StoreError>;
    async fn update_plan(&self, id: DbId, input: &UpdatePlan) -> Result<Option<Plan>, StoreError>;
    /// Overwrite a plan's editable content in one write.
    async fn save_plan_document(
        &self,
        id: DbId,
        document: &PlanDocument,
    ) -> Result<Option<Plan>, StoreError>;
    async fn delete_plan(&self, id: DbId) -> Result<bool, StoreError>;
    async fn set_plan_completed(&self, id: DbId, completed: bool) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: DbId) -> Result<Option<User>, StoreError>;
    /// Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Returns the new failure count.
    async fn increment_failed_login(&self, id: DbId) -> Result<i32, StoreError>;
    async fn lock_account(&self, id: DbId, until: Timestamp) -> Result<(), StoreError>;
    async fn record_successful_login(&self, id: DbId) -> Result<(), StoreError>;

    async fn create_session(&self, input: &CreateSession) -> Result<UserSession, StoreError>;
    /// An unrevoked, unexpired session with this refresh token hash.
    async fn find_active_session(&self, token_hash: &str)
        -> Result<Option<UserSession>, StoreError>;
    /// Revoke `old_id` and create its replacement in one step. `None` when
    /// `old_id` is no longer active, i.e. its refresh token was already used.
    async fn rotate_session(
        &self,
        old_id: DbId,
        next: &CreateSession,
    ) -> Result<Option<UserSession>, StoreError>;
    async fn revoke_all_sessions(&self, user_id: DbId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn find_permission(&self, user_id: DbId) -> Result<Option<UserPermission>, StoreError>;
    /// Create a record, or return the existing one unchanged.
    async fn create_permission(
        &self,
        input: &CreatePermission,
    ) -> Result<UserPermission, StoreError>;
    async fn update_permission(
        &self,
        user_id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<UserPermission>, StoreError>;
    async fn list_permissions(&self) -> Result<Vec<UserPermission>, StoreError>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn record_visit(&self, input: &CreateVisit) -> Result<Visit, StoreError>;
    /// One page of visits, newest first.
    async fn list_visits(&self, limit: i64, offset: i64) -> Result<Vec<Visit>, StoreError>;
    /// Every visit, oldest first.
    async fn all_visits(&self) -> Result<Vec<Visit>, StoreError>;

    async fn find_override(&self, user_id: DbId) -> Result<Option<AccessOverride>, StoreError>;
    async fn upsert_override(
        &self,
        user_id: DbId,
        input: &UpsertAccessOverride,
    ) -> Result<AccessOverride, StoreError>;
    async fn delete_override(&self, user_id: DbId) -> Result<bool, StoreError>;
    async fn list_overrides(&self) -> Result<Vec<AccessOverride>, StoreError>;
}

#[async_trait]
pub trait Store: BrandStore + PlanStore + AccountStore + PermissionStore + AnalyticsStore {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// `"postgres"` or `"local"`, for logs and the health endpoint.
    fn backend_name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Writer adapter
// ---------------------------------------------------------------------------

/// Commits editor saves and completion changes to a [`Store`].
pub struct StoreWriter<'a>(pub &'a dyn Store);

#[async_trait]
impl PlanWriter for StoreWriter<'_> {
    type Error = StoreError;

    async fn write_document(&self, plan_id: DbId, document: &PlanDocument) -> Result<(), StoreError> {
        match self.0.save_plan_document(plan_id, document).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { entity: "Plan", id: plan_id }),
        }
    }

    async fn write_completion(&self, plan_id: DbId, completed: bool) -> Result<(), StoreError> {
        if self.0.set_plan_completed(plan_id, completed).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound { entity: "Plan", id: plan_id })
        }
    }
}
