//! Repository for the `brands` table.

use sqlx::PgPool;
use storyplan_core::types::DbId;

use crate::models::brand::{Brand, BrandWithCount, CreateBrand, UpdateBrand};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, logo, sort_order, created_at, updated_at";

/// Brand columns plus the number of plans filed under each brand.
const COLUMNS_WITH_COUNT: &str = "b.id, b.name, b.logo, b.sort_order, b.created_at, b.updated_at, \
     (SELECT COUNT(*) FROM plans p WHERE p.brand_id = b.id) AS plan_count";

/// Provides CRUD operations for brands.
pub struct BrandRepo;

impl BrandRepo {
    /// Insert a new brand at the end of the display order.
    pub async fn create(pool: &PgPool, input: &CreateBrand) -> Result<Brand, sqlx::Error> {
        let query = format!(
            "INSERT INTO brands (name, logo, sort_order)
             VALUES ($1, $2, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM brands))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Brand>(&query)
            .bind(&input.name)
            .bind(&input.logo)
            .fetch_one(pool)
            .await
    }

    /// Find a brand by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Brand>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM brands WHERE id = $1");
        sqlx::query_as::<_, Brand>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all brands in display order, with plan counts.
    pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<BrandWithCount>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS_WITH_COUNT} FROM brands b ORDER BY b.sort_order, b.created_at"
        );
        sqlx::query_as::<_, BrandWithCount>(&query)
            .fetch_all(pool)
            .await
    }

    /// Update a brand. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateBrand,
    ) -> Result<Option<Brand>, sqlx::Error> {
        let query = format!(
            "UPDATE brands SET
                name = COALESCE($2, name),
                logo = CASE WHEN $3 THEN $4 ELSE logo END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Brand>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.logo.is_some())
            .bind(input.logo.clone().flatten())
            .fetch_optional(pool)
            .await
    }

    /// Move every plan of the brand to the unassigned group, then delete the
    /// brand, in one transaction.
    ///
    /// Returns the number of reassigned plans, or `None` if the brand does
    /// not exist.
    pub async fn delete_reassigning_plans(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let reassigned = sqlx::query("UPDATE plans SET brand_id = NULL WHERE brand_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;
        Ok(Some(reassigned))
    }

    /// Renumber every brand: the listed ids first, in the given order, then
    /// the rest in their previous order. Unknown ids are ignored, and a
    /// repeated id keeps its first position.
    pub async fn reorder(pool: &PgPool, ids: &[DbId]) -> Result<(), sqlx::Error> {
        sqlx::query(
            "WITH listed AS (
                 SELECT id, MIN(ord) AS ord
                 FROM UNNEST($1::BIGINT[]) WITH ORDINALITY AS t(id, ord)
                 GROUP BY id
             ),
             ranked AS (
                 SELECT b.id,
                        (ROW_NUMBER() OVER (
                            ORDER BY l.ord NULLS LAST, b.sort_order, b.created_at, b.id
                        ) - 1)::INTEGER AS pos
                 FROM brands b
                 LEFT JOIN listed l ON l.id = b.id
             )
             UPDATE brands SET sort_order = ranked.pos
             FROM ranked
             WHERE brands.id = ranked.id AND brands.sort_order <> ranked.pos",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(())
    }
}
