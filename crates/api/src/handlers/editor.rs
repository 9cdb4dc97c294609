//! Handlers for server-held storyboard editor sessions.
//!
//! `POST /plans/{id}/editor` opens a session on a plan. Every edit goes to
//! the session's working copy; nothing reaches the store until
//! `POST /editor/{session_id}/save`. Each response carries the working
//! document and whether it differs from the last saved snapshot.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use storyplan_core::editor::{EditorView, FileUpload, ItemTextPatch, StoryboardEditor};
use storyplan_core::error::CoreError;
use storyplan_core::storyboard::{PlanMetadata, RowKind};
use storyplan_core::types::DbId;
use storyplan_db::models::double_option;
use storyplan_db::store::StoreWriter;

use super::plans::{check_target_brand, visible_plan};
use crate::editor_sessions::SharedSession;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::Authorized;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SessionView<'a> {
    pub session_id: DbId,
    #[serde(flatten)]
    pub view: EditorView<'a>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemRequest {
    /// Insert position; appends when absent.
    pub at: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MoveItemRequest {
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachFileRequest {
    /// Target slot; the first free slot when absent.
    pub slot: Option<usize>,
    #[serde(flatten)]
    pub file: FileUpload,
}

#[derive(Debug, Deserialize)]
pub struct MoveRowRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct RowOrderRequest {
    pub order: Vec<RowKind>,
}

#[derive(Debug, Deserialize)]
pub struct RowHeightRequest {
    pub height: u32,
}

/// Plan-level edits. `brand_id: null` moves the plan to the unassigned group.
#[derive(Debug, Default, Deserialize)]
pub struct PlanFieldsRequest {
    pub title: Option<String>,
    pub metadata: Option<PlanMetadata>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand_id: Option<Option<DbId>>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn render(session_id: DbId, editor: &StoryboardEditor) -> Response {
    Json(DataResponse {
        data: SessionView {
            session_id,
            view: editor.view(),
        },
    })
    .into_response()
}

async fn session(state: &AppState, session_id: DbId, user_id: DbId) -> AppResult<SharedSession> {
    state
        .editors
        .get(session_id, user_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Editor session",
            id: session_id,
        }))
}

/// Run `edit` against the session's editor and render the result.
async fn edit<F>(state: &AppState, session_id: DbId, user: &AuthUser, apply: F) -> AppResult<Response>
where
    F: FnOnce(&mut StoryboardEditor) -> Result<(), CoreError>,
{
    let shared = session(state, session_id, user.user_id).await?;
    let mut guard = shared.lock().await;
    apply(&mut guard.editor)?;
    Ok(render(session_id, &guard.editor))
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/plans/{id}/editor
///
/// 409 when the user is at an editor cap and every session that would make
/// room still has unsaved changes.
pub async fn open(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Path(plan_id): Path<DbId>,
) -> AppResult<(StatusCode, Response)> {
    let plan = visible_plan(&state, &permissions, plan_id).await?;
    let editor = StoryboardEditor::open(plan.id, plan.document());
    let session_id = state.editors.open(user.user_id, editor).await?;
    tracing::info!(session_id, plan_id, user_id = user.user_id, "Editor opened");

    let shared = session(&state, session_id, user.user_id).await?;
    let guard = shared.lock().await;
    Ok((StatusCode::CREATED, render(session_id, &guard.editor)))
}

/// GET /api/v1/editor/{session_id}
pub async fn view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<DbId>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |_| Ok(())).await
}

/// DELETE /api/v1/editor/{session_id}
///
/// Unsaved changes are dropped.
pub async fn close(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.editors.close(session_id, user.user_id).await {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Editor session",
            id: session_id,
        }));
    }
    tracing::info!(session_id, user_id = user.user_id, "Editor closed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/editor/{session_id}/save
///
/// Commit the working copy with a single store write.
pub async fn save(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Path(session_id): Path<DbId>,
) -> AppResult<Response> {
    permissions.require_create()?;
    let shared = session(&state, session_id, user.user_id).await?;
    let mut guard = shared.lock().await;

    let plan_id = guard.editor.plan_id();
    // The plan may have moved out of reach since the session was opened.
    visible_plan(&state, &permissions, plan_id).await?;
    check_target_brand(&state, &permissions, guard.editor.document().brand_id).await?;

    if guard.editor.has_unsaved_changes() {
        guard
            .editor
            .save(&StoreWriter(state.store.as_ref()))
            .await?;
        tracing::info!(session_id, plan_id, user_id = user.user_id, "Storyboard saved");
    }
    Ok(render(session_id, &guard.editor))
}

/// POST /api/v1/editor/{session_id}/discard
pub async fn discard(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<DbId>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.discard();
        Ok(())
    })
    .await
}

// ---------------------------------------------------------------------------
// Plan fields
// ---------------------------------------------------------------------------

/// PATCH /api/v1/editor/{session_id}/plan
pub async fn update_plan_fields(
    State(state): State<AppState>,
    Authorized { user, permissions }: Authorized,
    Path(session_id): Path<DbId>,
    Json(input): Json<PlanFieldsRequest>,
) -> AppResult<Response> {
    if let Some(brand_id) = input.brand_id {
        check_target_brand(&state, &permissions, brand_id).await?;
    }
    edit(&state, session_id, &user, |editor| {
        if let Some(title) = &input.title {
            editor.set_title(title)?;
        }
        if let Some(metadata) = input.metadata {
            editor.set_metadata(metadata);
        }
        if let Some(brand_id) = input.brand_id {
            editor.set_brand(brand_id);
        }
        Ok(())
    })
    .await
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// POST /api/v1/editor/{session_id}/items
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<DbId>,
    Json(input): Json<AddItemRequest>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.add_item(input.at).map(|_| ())
    })
    .await
}

/// PUT /api/v1/editor/{session_id}/items/{item_id}
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id)): Path<(DbId, String)>,
    Json(patch): Json<ItemTextPatch>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.update_item(&item_id, patch)
    })
    .await
}

/// DELETE /api/v1/editor/{session_id}/items/{item_id}
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id)): Path<(DbId, String)>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.remove_item(&item_id).map(|_| ())
    })
    .await
}

/// POST /api/v1/editor/{session_id}/items/{item_id}/move
pub async fn move_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id)): Path<(DbId, String)>,
    Json(input): Json<MoveItemRequest>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.move_item(&item_id, input.to)
    })
    .await
}

/// PUT /api/v1/editor/{session_id}/items/{item_id}/image
pub async fn set_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id)): Path<(DbId, String)>,
    Json(input): Json<ImageRequest>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.set_image(&item_id, input.data)
    })
    .await
}

/// DELETE /api/v1/editor/{session_id}/items/{item_id}/image
pub async fn clear_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id)): Path<(DbId, String)>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| editor.clear_image(&item_id)).await
}

/// POST /api/v1/editor/{session_id}/items/{item_id}/files
pub async fn attach_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id)): Path<(DbId, String)>,
    Json(input): Json<AttachFileRequest>,
) -> AppResult<Response> {
    let now = chrono::Utc::now();
    edit(&state, session_id, &user, |editor| {
        let slot = editor.attach_file(&item_id, input.slot, input.file, now)?;
        tracing::debug!(session_id, item_id = %item_id, slot, "File attached");
        Ok(())
    })
    .await
}

/// DELETE /api/v1/editor/{session_id}/items/{item_id}/files/{slot}
pub async fn detach_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, item_id, slot)): Path<(DbId, String, usize)>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.detach_file(&item_id, slot).map(|_| ())
    })
    .await
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// POST /api/v1/editor/{session_id}/rows/move
pub async fn move_row(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<DbId>,
    Json(input): Json<MoveRowRequest>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.move_row(input.from, input.to)
    })
    .await
}

/// PUT /api/v1/editor/{session_id}/rows/order
pub async fn set_row_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<DbId>,
    Json(input): Json<RowOrderRequest>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.set_row_order(input.order)
    })
    .await
}

/// PUT /api/v1/editor/{session_id}/rows/{kind}/height
pub async fn resize_row(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, kind)): Path<(DbId, RowKind)>,
    Json(input): Json<RowHeightRequest>,
) -> AppResult<Response> {
    edit(&state, session_id, &user, |editor| {
        editor.resize_row(kind, input.height)
    })
    .await
}
