//! User session model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyplan_core::types::{DbId, Timestamp};

/// A user session row from the `user_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new user session.
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}
