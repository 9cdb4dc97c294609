//! Handlers for the `/plans` resource: CRUD, bulk completion, and export.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use storyplan_core::completion::{CompletionSaveReport, CompletionTracker};
use storyplan_core::error::CoreError;
use storyplan_core::export::{export_filename, plan_text_report, plan_workbook, ExportFormat, PlanExport};
use storyplan_core::permissions::EffectivePermissions;
use storyplan_core::search::{filter_and_sort, SortOrder};
use storyplan_core::storyboard::validate_title;
use storyplan_core::types::DbId;
use storyplan_db::models::plan::{CreatePlan, Plan, PlanFilter, PlanSummary, UpdatePlan};
use storyplan_db::store::{BrandStore, PlanStore, StoreWriter};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::Authorized;
use crate::query::ExportParams;
use crate::response::{attachment, DataResponse};
use crate::state::AppState;

/// Query parameters for `GET /plans`.
///
/// `unassigned=true` wins over `brand_id`.
#[derive(Debug, Default, Deserialize)]
pub struct PlanListParams {
    pub brand_id: Option<DbId>,
    #[serde(default)]
    pub unassigned: bool,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Request body for `POST /plans/completion`.
#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub changes: Vec<CompletionChange>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChange {
    pub plan_id: DbId,
    pub is_completed: bool,
}

// ---------------------------------------------------------------------------
// Shared lookups
// ---------------------------------------------------------------------------

/// Load a plan the caller is allowed to see.
pub(crate) async fn visible_plan(
    state: &AppState,
    permissions: &EffectivePermissions,
    id: DbId,
) -> AppResult<Plan> {
    let plan = state
        .store
        .find_plan(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Plan", id }))?;
    permissions.require_plan(plan.brand_id, plan.created_by)?;
    Ok(plan)
}

/// Check that a plan may be filed under `brand_id`.
pub(crate) async fn check_target_brand(
    state: &AppState,
    permissions: &EffectivePermissions,
    brand_id: Option<DbId>,
) -> AppResult<()> {
    let Some(id) = brand_id else {
        return Ok(());
    };
    permissions.require_brand(id)?;
    if state.store.find_brand(id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound { entity: "Brand", id }));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/plans
pub async fn list(
    State(state): State<AppState>,
    Authorized { permissions, .. }: Authorized,
    Query(params): Query<PlanListParams>,
) -> AppResult<Json<DataResponse<Vec<PlanSummary>>>> {
    let filter = match (params.unassigned, params.brand_id) {
        (true, _) => PlanFilter::Unassigned,
        (false, Some(brand_id)) => {
            permissions.require_brand(brand_id)?;
            PlanFilter::Brand(brand_id)
        }
        (false, None) => PlanFilter::All,
    };

    let visible: Vec<Plan> = state
        .store
        .list_plans(filter)
        .await?
        .into_iter()
        .filter(|p| permissions.can_view_plan(p.brand_id, p.created_by))
        .collect();
    let plans: Vec<PlanSummary> = filter_and_sort(visible, params.q.as_deref(), params.sort)
        .iter()
        .map(Plan::summary)
        .collect();

    tracing::debug!(user_id = permissions.user_id, ?filter, count = plans.len(), "Listed plans");
    Ok(Json(DataResponse { data: plans }))
}

/// GET /api/v1/plans/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Authorized { permissions, .. }: Authorized,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Plan>>> {
    let plan = visible_plan(&state, &permissions, id).await?;
    Ok(Json(DataResponse { data: plan }))
}

/// POST /api/v1/plans
pub async fn create(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Json(mut input): Json<CreatePlan>,
) -> AppResult<(StatusCode, Json<DataResponse<Plan>>)> {
    permissions.require_create()?;
    validate_title(&input.title)?;
    check_target_brand(&state, &permissions, input.brand_id).await?;

    input.title = input.title.trim().to_string();
    input.created_by = Some(user.user_id);
    let plan = state.store.create_plan(&input).await?;

    tracing::info!(plan_id = plan.id, brand_id = ?plan.brand_id, user_id = user.user_id, "Plan created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: plan })))
}

/// PUT /api/v1/plans/{id}
///
/// Updates plan-level fields only. Storyboard content is saved through an
/// editor session.
pub async fn update(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdatePlan>,
) -> AppResult<Json<DataResponse<Plan>>> {
    permissions.require_create()?;
    visible_plan(&state, &permissions, id).await?;

    if let Some(title) = &input.title {
        validate_title(title)?;
        input.title = Some(title.trim().to_string());
    }
    if let Some(brand_id) = input.brand_id {
        check_target_brand(&state, &permissions, brand_id).await?;
    }

    let plan = state
        .store
        .update_plan(id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Plan", id }))?;
    tracing::info!(plan_id = id, user_id = user.user_id, "Plan updated");
    Ok(Json(DataResponse { data: plan }))
}

/// DELETE /api/v1/plans/{id}
///
/// Also closes any open editors on the plan.
pub async fn delete(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    permissions.require_create()?;
    visible_plan(&state, &permissions, id).await?;

    if !state.store.delete_plan(id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Plan", id }));
    }
    let closed = state.editors.close_plan(id).await;
    tracing::info!(plan_id = id, user_id = user.user_id, closed_editors = closed, "Plan deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/plans/completion
///
/// Apply a batch of completion toggles. Changes that match the stored value
/// are dropped; the rest are written one at a time. A failed write stops the
/// batch and the error is returned; earlier writes stay applied.
pub async fn save_completion(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Json(input): Json<CompletionRequest>,
) -> AppResult<Json<DataResponse<CompletionSaveReport>>> {
    permissions.require_create()?;

    let mut tracker = CompletionTracker::new();
    for change in &input.changes {
        let plan = visible_plan(&state, &permissions, change.plan_id).await?;
        tracker.set(plan.id, plan.is_completed, change.is_completed);
    }
    let pending = tracker.len();

    let writer = StoreWriter(state.store.as_ref());
    match tracker.save_all(&writer).await {
        Ok(report) => {
            tracing::info!(user_id = user.user_id, saved = report.saved.len(), "Completion saved");
            Ok(Json(DataResponse { data: report }))
        }
        Err((report, err)) => {
            tracing::warn!(
                user_id = user.user_id,
                saved = report.saved.len(),
                pending,
                error = %err,
                "Completion save stopped early"
            );
            Err(err.into())
        }
    }
}

/// GET /api/v1/plans/{id}/export?format=xlsx|txt
pub async fn export(
    State(state): State<AppState>,
    Authorized { permissions, .. }: Authorized,
    Path(id): Path<DbId>,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let plan = visible_plan(&state, &permissions, id).await?;
    let brand = match plan.brand_id {
        Some(brand_id) => state.store.find_brand(brand_id).await?,
        None => None,
    };
    let document = plan.document();
    let export = PlanExport {
        plan_id: plan.id,
        document: &document,
        brand_name: brand.as_ref().map(|b| b.name.as_str()),
        is_completed: plan.is_completed,
        created_at: plan.created_at,
        updated_at: plan.updated_at,
    };

    let body = match params.format {
        ExportFormat::Xlsx => plan_workbook(&export).to_xlsx()?,
        ExportFormat::Txt => plan_text_report(&export).into_bytes(),
    };
    tracing::info!(plan_id = id, format = ?params.format, bytes = body.len(), "Plan exported");
    Ok(attachment(
        &export_filename(&plan.title, params.format),
        params.format.content_type(),
        body,
    ))
}
