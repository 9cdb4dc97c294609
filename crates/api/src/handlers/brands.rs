//! Handlers for the `/brands` resource.
//!
//! Everyone signed in can list the brands they are allowed to see; only
//! admins can change them.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use storyplan_core::error::CoreError;
use storyplan_core::search::{filter_and_sort, matches_query, normalize_query, SortOrder};
use storyplan_core::types::DbId;
use storyplan_core::upload::validate_image;
use storyplan_db::models::brand::{Brand, BrandWithCount, CreateBrand, UpdateBrand};
use storyplan_db::store::BrandStore;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{Authorized, RequireAdmin};
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_BRAND_NAME_LEN: usize = 100;

/// Query parameters for `GET /brands`. Without `sort`, brands keep their
/// manual order.
#[derive(Debug, Deserialize)]
pub struct BrandListParams {
    pub q: Option<String>,
    pub sort: Option<SortOrder>,
}

/// Request body for `PUT /brands/order`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct DeleteBrandResponse {
    /// Plans moved to the unassigned group.
    pub reassigned_plans: u64,
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Brand name must not be empty".into()));
    }
    if name.chars().count() > MAX_BRAND_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Brand name must be at most {MAX_BRAND_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn brand_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Brand", id })
}

/// GET /api/v1/brands
pub async fn list(
    State(state): State<AppState>,
    Authorized { permissions, .. }: Authorized,
    Query(params): Query<BrandListParams>,
) -> AppResult<Json<DataResponse<Vec<BrandWithCount>>>> {
    let visible: Vec<BrandWithCount> = state
        .store
        .list_brands()
        .await?
        .into_iter()
        .filter(|b| permissions.can_view_brand(b.brand.id))
        .collect();

    let brands = match params.sort {
        Some(sort) => filter_and_sort(visible, params.q.as_deref(), sort),
        None => match normalize_query(params.q.as_deref()) {
            Some(q) => visible.into_iter().filter(|b| matches_query(b, &q)).collect(),
            None => visible,
        },
    };
    tracing::debug!(user_id = permissions.user_id, count = brands.len(), "Listed brands");
    Ok(Json(DataResponse { data: brands }))
}

/// GET /api/v1/brands/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Authorized { permissions, .. }: Authorized,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Brand>>> {
    permissions.require_brand(id)?;
    let brand = state
        .store
        .find_brand(id)
        .await?
        .ok_or_else(|| brand_not_found(id))?;
    Ok(Json(DataResponse { data: brand }))
}

/// POST /api/v1/brands
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(mut input): Json<CreateBrand>,
) -> AppResult<(StatusCode, Json<DataResponse<Brand>>)> {
    validate_name(&input.name)?;
    input.name = input.name.trim().to_string();
    if let Some(logo) = &input.logo {
        validate_image("logo", logo)?;
    }

    let brand = state.store.create_brand(&input).await?;
    tracing::info!(brand_id = brand.id, user_id = admin.user_id, "Brand created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: brand })))
}

/// PUT /api/v1/brands/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateBrand>,
) -> AppResult<Json<DataResponse<Brand>>> {
    if let Some(name) = &input.name {
        validate_name(name)?;
        input.name = Some(name.trim().to_string());
    }
    if let Some(Some(logo)) = &input.logo {
        validate_image("logo", logo)?;
    }

    let brand = state
        .store
        .update_brand(id, &input)
        .await?
        .ok_or_else(|| brand_not_found(id))?;
    tracing::info!(brand_id = id, user_id = admin.user_id, "Brand updated");
    Ok(Json(DataResponse { data: brand }))
}

/// DELETE /api/v1/brands/{id}
///
/// The brand's plans are kept and moved to the unassigned group, in the
/// store and in every open editor.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DeleteBrandResponse>>> {
    let reassigned_plans = state
        .store
        .delete_brand(id)
        .await?
        .ok_or_else(|| brand_not_found(id))?;
    let unassigned_editors = state.editors.forget_brand(id).await;
    tracing::info!(
        brand_id = id,
        reassigned_plans,
        unassigned_editors,
        user_id = admin.user_id,
        "Brand deleted"
    );
    Ok(Json(DataResponse {
        data: DeleteBrandResponse { reassigned_plans },
    }))
}

/// PUT /api/v1/brands/order
///
/// Listed brands take the first positions in the given order; unlisted
/// brands follow in their previous order.
pub async fn reorder(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ReorderRequest>,
) -> AppResult<Json<DataResponse<Vec<BrandWithCount>>>> {
    let mut seen = HashSet::new();
    if let Some(dup) = input.ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::BadRequest(format!("Brand {dup} is listed twice")));
    }

    let brands = state.store.reorder_brands(&input.ids).await?;
    tracing::info!(count = input.ids.len(), user_id = admin.user_id, "Brands reordered");
    Ok(Json(DataResponse { data: brands }))
}
