//! Repository for the `user_permissions` table.

use sqlx::PgPool;
use storyplan_core::types::DbId;

use crate::models::permission::{CreatePermission, UpdatePermission, UserPermission};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "user_id, email, can_create_plans, can_view_projects, \
                        allowed_brand_ids, created_at, updated_at";

/// Provides CRUD operations for permission records.
pub struct PermissionRepo;

impl PermissionRepo {
    /// Insert a permission record. If one was created concurrently, the
    /// existing row is returned unchanged.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePermission,
    ) -> Result<UserPermission, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_permissions
                (user_id, email, can_create_plans, can_view_projects, allowed_brand_ids)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPermission>(&query)
            .bind(input.user_id)
            .bind(&input.email)
            .bind(input.flags.can_create_plans)
            .bind(input.flags.can_view_projects)
            .bind(&input.flags.allowed_brand_ids)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserPermission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_permissions WHERE user_id = $1");
        sqlx::query_as::<_, UserPermission>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<UserPermission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_permissions ORDER BY user_id");
        sqlx::query_as::<_, UserPermission>(&query)
            .fetch_all(pool)
            .await
    }

    /// Update a permission record. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if the user has no record yet.
    pub async fn update(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<UserPermission>, sqlx::Error> {
        let query = format!(
            "UPDATE user_permissions SET
                can_create_plans = COALESCE($2, can_create_plans),
                can_view_projects = COALESCE($3, can_view_projects),
                allowed_brand_ids = COALESCE($4, allowed_brand_ids)
             WHERE user_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPermission>(&query)
            .bind(user_id)
            .bind(input.can_create_plans)
            .bind(input.can_view_projects)
            .bind(&input.allowed_brand_ids)
            .fetch_optional(pool)
            .await
    }
}
