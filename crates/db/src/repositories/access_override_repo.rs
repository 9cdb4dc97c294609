//! Repository for the `access_overrides` table.

use sqlx::PgPool;
use storyplan_core::types::DbId;

use crate::models::access_override::{AccessOverride, UpsertAccessOverride};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "user_id, email, can_create_plans, can_view_projects, note, updated_at";

/// Provides CRUD operations for admin access overrides.
pub struct AccessOverrideRepo;

impl AccessOverrideRepo {
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<AccessOverride>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM access_overrides WHERE user_id = $1");
        sqlx::query_as::<_, AccessOverride>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<AccessOverride>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM access_overrides ORDER BY user_id");
        sqlx::query_as::<_, AccessOverride>(&query)
            .fetch_all(pool)
            .await
    }

    /// Create or fully replace the override for `user_id`.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertAccessOverride,
    ) -> Result<AccessOverride, sqlx::Error> {
        let query = format!(
            "INSERT INTO access_overrides (user_id, email, can_create_plans, can_view_projects, note)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id) DO UPDATE SET
                email = EXCLUDED.email,
                can_create_plans = EXCLUDED.can_create_plans,
                can_view_projects = EXCLUDED.can_view_projects,
                note = EXCLUDED.note,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessOverride>(&query)
            .bind(user_id)
            .bind(&input.email)
            .bind(input.can_create_plans)
            .bind(input.can_view_projects)
            .bind(&input.note)
            .fetch_one(pool)
            .await
    }

    /// Remove a user's override. Returns `true` if one existed.
    pub async fn delete(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM access_overrides WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
