//! Repository for the append-only `visit_logs` table.

use sqlx::PgPool;

use crate::models::visit::{CreateVisit, Visit};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, visitor_id, user_email, page, visited_at";

/// Provides insert and read operations for visit logs.
pub struct VisitRepo;

impl VisitRepo {
    pub async fn create(pool: &PgPool, input: &CreateVisit) -> Result<Visit, sqlx::Error> {
        let query = format!(
            "INSERT INTO visit_logs (visitor_id, user_email, page)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Visit>(&query)
            .bind(&input.visitor_id)
            .bind(&input.user_email)
            .bind(&input.page)
            .fetch_one(pool)
            .await
    }

    /// One page of visits, newest first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Visit>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM visit_logs ORDER BY visited_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Visit>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Every visit, oldest first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Visit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM visit_logs ORDER BY visited_at, id");
        sqlx::query_as::<_, Visit>(&query).fetch_all(pool).await
    }
}
