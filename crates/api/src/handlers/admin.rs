//! Admin-only handlers: visit analytics, user permissions, access
//! overrides, and spreadsheet exports.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use storyplan_core::analytics::{summarize, VisitRecord, VisitSummary};
use storyplan_core::error::CoreError;
use storyplan_core::export::{
    export_filename, users_text_report, users_workbook, visits_text_report, visits_workbook,
    ExportFormat, UserExportRow,
};
use storyplan_core::permissions::{EffectivePermissions, PermissionFlags};
use storyplan_core::search::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use storyplan_core::types::DbId;
use storyplan_db::models::access_override::{AccessOverride, UpsertAccessOverride};
use storyplan_db::models::permission::{CreatePermission, UpdatePermission, UserPermission};
use storyplan_db::models::user::{User, UserResponse};
use storyplan_db::models::visit::Visit;
use storyplan_db::store::{AccountStore, AnalyticsStore, PermissionStore};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::{ExportParams, PaginationParams};
use crate::response::{attachment, DataResponse};
use crate::state::AppState;

/// One row of `GET /admin/users`.
#[derive(Debug, Serialize)]
pub struct AdminUserView {
    pub user: UserResponse,
    pub permissions: EffectivePermissions,
    pub access_override: Option<AccessOverride>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}

/// Every user with their effective permissions, without creating any
/// missing permission records.
async fn resolve_users(state: &AppState) -> AppResult<Vec<AdminUserView>> {
    let users = state.store.list_users().await?;
    let records: HashMap<DbId, UserPermission> = state
        .store
        .list_permissions()
        .await?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();
    let mut overrides: HashMap<DbId, AccessOverride> = state
        .store
        .list_overrides()
        .await?
        .into_iter()
        .map(|o| (o.user_id, o))
        .collect();

    Ok(users
        .iter()
        .map(|user| {
            let is_admin = state.is_admin_email(&user.email);
            let flags = records
                .get(&user.id)
                .map(UserPermission::flags)
                .unwrap_or_default();
            let access_override = overrides.remove(&user.id);
            AdminUserView {
                user: UserResponse::from_user(user, is_admin),
                permissions: EffectivePermissions::resolve(
                    user.id,
                    is_admin,
                    &flags,
                    access_override.as_ref().map(AccessOverride::flags).as_ref(),
                ),
                access_override,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Visits
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/visits?limit=&offset=
pub async fn list_visits(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Visit>>>> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);
    let visits = state.store.list_visits(limit, offset).await?;
    Ok(Json(DataResponse { data: visits }))
}

/// GET /api/v1/admin/visits/summary
pub async fn visit_summary(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<VisitSummary>>> {
    let records: Vec<VisitRecord> = state
        .store
        .all_visits()
        .await?
        .iter()
        .map(Visit::record)
        .collect();
    Ok(Json(DataResponse {
        data: summarize(&records),
    }))
}

// ---------------------------------------------------------------------------
// Users and permissions
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<AdminUserView>>>> {
    Ok(Json(DataResponse {
        data: resolve_users(&state).await?,
    }))
}

/// PUT /api/v1/admin/users/{id}/permissions
pub async fn update_permissions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
    Json(input): Json<UpdatePermission>,
) -> AppResult<Json<DataResponse<UserPermission>>> {
    let user = find_user(&state, user_id).await?;
    state
        .store
        .create_permission(&CreatePermission {
            user_id,
            email: user.email.clone(),
            flags: PermissionFlags::default(),
        })
        .await?;

    let updated = state
        .store
        .update_permission(user_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Permission record",
            id: user_id,
        }))?;
    state.permissions.invalidate(user_id).await;

    tracing::info!(user_id, admin_id = admin.user_id, "User permissions updated");
    Ok(Json(DataResponse { data: updated }))
}

/// GET /api/v1/admin/users/{id}/override
pub async fn get_override(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Option<AccessOverride>>>> {
    find_user(&state, user_id).await?;
    let access_override = state.store.find_override(user_id).await?;
    Ok(Json(DataResponse {
        data: access_override,
    }))
}

/// PUT /api/v1/admin/users/{id}/override
pub async fn put_override(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
    Json(mut input): Json<UpsertAccessOverride>,
) -> AppResult<Json<DataResponse<AccessOverride>>> {
    let user = find_user(&state, user_id).await?;
    input.email = user.email;
    let saved = state.store.upsert_override(user_id, &input).await?;
    state.permissions.invalidate(user_id).await;

    tracing::info!(user_id, admin_id = admin.user_id, "Access override saved");
    Ok(Json(DataResponse { data: saved }))
}

/// DELETE /api/v1/admin/users/{id}/override
pub async fn delete_override(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.store.delete_override(user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Access override",
            id: user_id,
        }));
    }
    state.permissions.invalidate(user_id).await;
    tracing::info!(user_id, admin_id = admin.user_id, "Access override removed");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/export/users?format=xlsx|txt
pub async fn export_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let rows: Vec<UserExportRow> = resolve_users(&state)
        .await?
        .into_iter()
        .map(|view| UserExportRow {
            id: view.user.id,
            email: view.user.email,
            is_admin: view.user.is_admin,
            is_active: view.user.is_active,
            can_create_plans: view.permissions.can_create_plans,
            can_view_projects: view.permissions.can_view_projects,
            allowed_brand_ids: view.permissions.allowed_brand_ids,
            last_login_at: view.user.last_login_at,
            created_at: view.user.created_at,
        })
        .collect();

    let body = match params.format {
        ExportFormat::Xlsx => users_workbook(&rows).to_xlsx()?,
        ExportFormat::Txt => users_text_report(&rows).into_bytes(),
    };
    tracing::info!(users = rows.len(), format = ?params.format, "Users exported");
    Ok(attachment(
        &export_filename("users", params.format),
        params.format.content_type(),
        body,
    ))
}

/// GET /api/v1/admin/export/visits?format=xlsx|txt
pub async fn export_visits(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let records: Vec<VisitRecord> = state
        .store
        .all_visits()
        .await?
        .iter()
        .map(Visit::record)
        .collect();

    let body = match params.format {
        ExportFormat::Xlsx => visits_workbook(&records).to_xlsx()?,
        ExportFormat::Txt => visits_text_report(&records).into_bytes(),
    };
    tracing::info!(visits = records.len(), format = ?params.format, "Visits exported");
    Ok(attachment(
        &export_filename("visits", params.format),
        params.format.content_type(),
        body,
    ))
}
