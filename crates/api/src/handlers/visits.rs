//! Handler for recording page visits.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use storyplan_core::analytics::MAX_PAGE_ID_LEN;
use storyplan_core::error::CoreError;
use storyplan_db::models::visit::{CreateVisit, Visit};
use storyplan_db::store::AnalyticsStore;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_VISITOR_ID_LEN: usize = 100;

/// Request body for `POST /visits`.
#[derive(Debug, Deserialize)]
pub struct RecordVisitRequest {
    /// Client-generated id that survives sign-out, for unique-visitor counts.
    pub visitor_id: String,
    pub page: String,
}

fn required(field: &str, value: &str, max: usize) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// POST /api/v1/visits
pub async fn record(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<RecordVisitRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Visit>>)> {
    let visit = state
        .store
        .record_visit(&CreateVisit {
            visitor_id: required("visitor_id", &input.visitor_id, MAX_VISITOR_ID_LEN)?,
            user_email: Some(user.email),
            page: required("page", &input.page, MAX_PAGE_ID_LEN)?,
        })
        .await?;
    tracing::debug!(visit_id = visit.id, page = %visit.page, "Visit recorded");
    Ok((StatusCode::CREATED, Json(DataResponse { data: visit })))
}
