//! Repository for the `plans` table.

use sqlx::types::Json;
use sqlx::PgPool;
use storyplan_core::storyboard::PlanDocument;
use storyplan_core::types::DbId;

use crate::models::plan::{CreatePlan, Plan, PlanFilter, PlanRow, UpdatePlan};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, brand_id, title, items, row_heights, row_order, metadata, \
                        legacy_sections, is_completed, created_by, created_at, updated_at";

/// Provides CRUD operations for plans.
pub struct PlanRepo;

impl PlanRepo {
    /// Insert a new plan with an empty storyboard.
    pub async fn create(pool: &PgPool, input: &CreatePlan) -> Result<Plan, sqlx::Error> {
        let query = format!(
            "INSERT INTO plans (title, brand_id, metadata, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PlanRow>(&query)
            .bind(&input.title)
            .bind(input.brand_id)
            .bind(Json(&input.metadata))
            .bind(input.created_by)
            .fetch_one(pool)
            .await
            .map(Plan::from)
    }

    /// Find a plan by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM plans WHERE id = $1");
        let row = sqlx::query_as::<_, PlanRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    /// List plans matching `filter`, most recently updated first.
    pub async fn list(pool: &PgPool, filter: PlanFilter) -> Result<Vec<Plan>, sqlx::Error> {
        let rows = match filter {
            PlanFilter::All => {
                let query = format!("SELECT {COLUMNS} FROM plans ORDER BY updated_at DESC");
                sqlx::query_as::<_, PlanRow>(&query).fetch_all(pool).await?
            }
            PlanFilter::Brand(brand_id) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM plans WHERE brand_id = $1 ORDER BY updated_at DESC"
                );
                sqlx::query_as::<_, PlanRow>(&query)
                    .bind(brand_id)
                    .fetch_all(pool)
                    .await?
            }
            PlanFilter::Unassigned => {
                let query = format!(
                    "SELECT {COLUMNS} FROM plans WHERE brand_id IS NULL ORDER BY updated_at DESC"
                );
                sqlx::query_as::<_, PlanRow>(&query).fetch_all(pool).await?
            }
        };
        Ok(rows.into_iter().map(Plan::from).collect())
    }

    /// Update plan-level fields. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePlan,
    ) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!(
            "UPDATE plans SET
                title = COALESCE($2, title),
                brand_id = CASE WHEN $3 THEN $4 ELSE brand_id END,
                metadata = COALESCE($5, metadata),
                is_completed = COALESCE($6, is_completed)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlanRow>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.brand_id.is_some())
            .bind(input.brand_id.flatten())
            .bind(input.metadata.as_ref().map(Json))
            .bind(input.is_completed)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    /// Overwrite the editable content of a plan and drop its legacy sections.
    pub async fn save_document(
        pool: &PgPool,
        id: DbId,
        doc: &PlanDocument,
    ) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!(
            "UPDATE plans SET
                title = $2,
                brand_id = $3,
                items = $4,
                row_heights = $5,
                row_order = $6,
                metadata = $7,
                legacy_sections = '[]'::jsonb
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlanRow>(&query)
            .bind(id)
            .bind(&doc.title)
            .bind(doc.brand_id)
            .bind(Json(&doc.items))
            .bind(Json(&doc.row_heights))
            .bind(Json(&doc.row_order))
            .bind(Json(&doc.metadata))
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    /// Set the completion flag. Returns `true` if the plan exists.
    pub async fn set_completed(
        pool: &PgPool,
        id: DbId,
        completed: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE plans SET is_completed = $2 WHERE id = $1")
            .bind(id)
            .bind(completed)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete a plan by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
