//! Postgres backend: a thin delegation layer over the repositories.

use async_trait::async_trait;
use storyplan_core::storyboard::PlanDocument;
use storyplan_core::types::{DbId, Timestamp};

use super::{AccountStore, AnalyticsStore, BrandStore, PermissionStore, PlanStore, Store, StoreError};
use crate::models::access_override::{AccessOverride, UpsertAccessOverride};
use crate::models::brand::{Brand, BrandWithCount, CreateBrand, UpdateBrand};
use crate::models::permission::{CreatePermission, UpdatePermission, UserPermission};
use crate::models::plan::{CreatePlan, Plan, PlanFilter, UpdatePlan};
use crate::models::session::{CreateSession, UserSession};
use crate::models::user::{CreateUser, User};
use crate::models::visit::{CreateVisit, Visit};
use crate::repositories::{
    AccessOverrideRepo, BrandRepo, PermissionRepo, PlanRepo, SessionRepo, UserRepo, VisitRepo,
};
use crate::DbPool;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BrandStore for PgStore {
    async fn list_brands(&self) -> Result<Vec<BrandWithCount>, StoreError> {
        Ok(BrandRepo::list_with_counts(&self.pool).await?)
    }

    async fn find_brand(&self, id: DbId) -> Result<Option<Brand>, StoreError> {
        Ok(BrandRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_brand(&self, input: &CreateBrand) -> Result<Brand, StoreError> {
        Ok(BrandRepo::create(&self.pool, input).await?)
    }

    async fn update_brand(
        &self,
        id: DbId,
        input: &UpdateBrand,
    ) -> Result<Option<Brand>, StoreError> {
        Ok(BrandRepo::update(&self.pool, id, input).await?)
    }

    async fn delete_brand(&self, id: DbId) -> Result<Option<u64>, StoreError> {
        Ok(BrandRepo::delete_reassigning_plans(&self.pool, id).await?)
    }

    async fn reorder_brands(&self, ids: &[DbId]) -> Result<Vec<BrandWithCount>, StoreError> {
        BrandRepo::reorder(&self.pool, ids).await?;
        Ok(BrandRepo::list_with_counts(&self.pool).await?)
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn list_plans(&self, filter: PlanFilter) -> Result<Vec<Plan>, StoreError> {
        Ok(PlanRepo::list(&self.pool, filter).await?)
    }

    async fn find_plan(&self, id: DbId) -> Result<Option<Plan>, StoreError> {
        Ok(PlanRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_plan(&self, input: &CreatePlan) -> Result<Plan, StoreError> {
        Ok(PlanRepo::create(&self.pool, input).await?)
    }

    async fn update_plan(&self, id: DbId, input: &UpdatePlan) -> Result<Option<Plan>, StoreError> {
        Ok(PlanRepo::update(&self.pool, id, input).await?)
    }

    async fn save_plan_document(
        &self,
        id: DbId,
        document: &PlanDocument,
    ) -> Result<Option<Plan>, StoreError> {
        Ok(PlanRepo::save_document(&self.pool, id, document).await?)
    }

    async fn delete_plan(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(PlanRepo::delete(&self.pool, id).await?)
    }

    async fn set_plan_completed(&self, id: DbId, completed: bool) -> Result<bool, StoreError> {
        Ok(PlanRepo::set_completed(&self.pool, id, completed).await?)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn find_user(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(UserRepo::list(&self.pool).await?)
    }

    async fn increment_failed_login(&self, id: DbId) -> Result<i32, StoreError> {
        Ok(UserRepo::increment_failed_login(&self.pool, id).await?)
    }

    async fn lock_account(&self, id: DbId, until: Timestamp) -> Result<(), StoreError> {
        Ok(UserRepo::lock_account(&self.pool, id, until).await?)
    }

    async fn record_successful_login(&self, id: DbId) -> Result<(), StoreError> {
        Ok(UserRepo::record_successful_login(&self.pool, id).await?)
    }

    async fn create_session(&self, input: &CreateSession) -> Result<UserSession, StoreError> {
        Ok(SessionRepo::create(&self.pool, input).await?)
    }

    async fn find_active_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserSession>, StoreError> {
        Ok(SessionRepo::find_by_refresh_token_hash(&self.pool, token_hash).await?)
    }

    async fn rotate_session(
        &self,
        old_id: DbId,
        next: &CreateSession,
    ) -> Result<Option<UserSession>, StoreError> {
        Ok(SessionRepo::rotate(&self.pool, old_id, next).await?)
    }

    async fn revoke_all_sessions(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(SessionRepo::revoke_all_for_user(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl PermissionStore for PgStore {
    async fn find_permission(&self, user_id: DbId) -> Result<Option<UserPermission>, StoreError> {
        Ok(PermissionRepo::find_by_user(&self.pool, user_id).await?)
    }

    async fn create_permission(
        &self,
        input: &CreatePermission,
    ) -> Result<UserPermission, StoreError> {
        Ok(PermissionRepo::create(&self.pool, input).await?)
    }

    async fn update_permission(
        &self,
        user_id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<UserPermission>, StoreError> {
        Ok(PermissionRepo::update(&self.pool, user_id, input).await?)
    }

    async fn list_permissions(&self) -> Result<Vec<UserPermission>, StoreError> {
        Ok(PermissionRepo::list(&self.pool).await?)
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn record_visit(&self, input: &CreateVisit) -> Result<Visit, StoreError> {
        Ok(VisitRepo::create(&self.pool, input).await?)
    }

    async fn list_visits(&self, limit: i64, offset: i64) -> Result<Vec<Visit>, StoreError> {
        Ok(VisitRepo::list(&self.pool, limit, offset).await?)
    }

    async fn all_visits(&self) -> Result<Vec<Visit>, StoreError> {
        Ok(VisitRepo::list_all(&self.pool).await?)
    }

    async fn find_override(&self, user_id: DbId) -> Result<Option<AccessOverride>, StoreError> {
        Ok(AccessOverrideRepo::find_by_user(&self.pool, user_id).await?)
    }

    async fn upsert_override(
        &self,
        user_id: DbId,
        input: &UpsertAccessOverride,
    ) -> Result<AccessOverride, StoreError> {
        Ok(AccessOverrideRepo::upsert(&self.pool, user_id, input).await?)
    }

    async fn delete_override(&self, user_id: DbId) -> Result<bool, StoreError> {
        Ok(AccessOverrideRepo::delete(&self.pool, user_id).await?)
    }

    async fn list_overrides(&self) -> Result<Vec<AccessOverride>, StoreError> {
        Ok(AccessOverrideRepo::list(&self.pool).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
