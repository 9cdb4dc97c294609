//! Visit log entry model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyplan_core::analytics::VisitRecord;
use storyplan_core::types::{DbId, Timestamp};

/// A row from the append-only `visit_logs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Visit {
    pub id: DbId,
    pub visitor_id: String,
    pub user_email: Option<String>,
    pub page: String,
    pub visited_at: Timestamp,
}

impl Visit {
    pub fn record(&self) -> VisitRecord {
        VisitRecord {
            visitor_id: self.visitor_id.clone(),
            user_email: self.user_email.clone(),
            page: self.page.clone(),
            visited_at: self.visited_at,
        }
    }
}

/// DTO for appending a visit.
#[derive(Debug, Clone)]
pub struct CreateVisit {
    pub visitor_id: String,
    pub user_email: Option<String>,
    pub page: String,
}
