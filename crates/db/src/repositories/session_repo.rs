//! Refresh-token sessions (`user_sessions`).
//!
//! A session is live while it is unrevoked and unexpired. Refreshing rotates
//! it: the presented session is revoked and its successor inserted in the
//! same transaction, so a refresh token can be redeemed at most once.

use sqlx::PgPool;
use storyplan_core::types::DbId;

use crate::models::session::{CreateSession, UserSession};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, is_revoked, created_at";

const INSERT: &str = "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at)
                      VALUES ($1, $2, $3)";

pub struct SessionRepo;

impl SessionRepo {
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        sqlx::query_as::<_, UserSession>(&format!("{INSERT} RETURNING {COLUMNS}"))
            .bind(input.user_id)
            .bind(&input.refresh_token_hash)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// The live session holding this refresh token hash, if any.
    pub async fn find_by_refresh_token_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE refresh_token_hash = $1 AND NOT is_revoked AND expires_at > NOW()"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Revoke `old_id` and insert `next`. Returns `None`, inserting nothing,
    /// when `old_id` was not live; a concurrent refresh with the same token
    /// loses on the row lock.
    pub async fn rotate(
        pool: &PgPool,
        old_id: DbId,
        next: &CreateSession,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true
             WHERE id = $1 AND NOT is_revoked AND expires_at > NOW()",
        )
        .bind(old_id)
        .execute(&mut *tx)
        .await?;
        if revoked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let session = sqlx::query_as::<_, UserSession>(&format!("{INSERT} RETURNING {COLUMNS}"))
            .bind(next.user_id)
            .bind(&next.refresh_token_hash)
            .bind(next.expires_at)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(session))
    }

    /// Revoke every live session of a user. Returns how many were revoked.
    pub async fn revoke_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET is_revoked = true WHERE user_id = $1 AND NOT is_revoked",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
