//! Route definitions for editor sessions.

use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::handlers::editor;
use crate::state::AppState;

/// Routes mounted at `/editor`. Sessions are opened via
/// `POST /plans/{id}/editor`.
///
/// ```text
/// GET    /{sid}                               -> view
/// DELETE /{sid}                               -> close
/// POST   /{sid}/save                          -> save
/// POST   /{sid}/discard                       -> discard
/// PATCH  /{sid}/plan                          -> title, metadata, brand
/// POST   /{sid}/items                         -> add_item
/// PUT    /{sid}/items/{item_id}               -> update_item
/// DELETE /{sid}/items/{item_id}               -> remove_item
/// POST   /{sid}/items/{item_id}/move          -> move_item
/// PUT    /{sid}/items/{item_id}/image         -> set_image
/// DELETE /{sid}/items/{item_id}/image         -> clear_image
/// POST   /{sid}/items/{item_id}/files         -> attach_file
/// DELETE /{sid}/items/{item_id}/files/{slot}  -> detach_file
/// POST   /{sid}/rows/move                     -> move_row
/// PUT    /{sid}/rows/order                    -> set_row_order
/// PUT    /{sid}/rows/{kind}/height            -> resize_row
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{sid}", get(editor::view).delete(editor::close))
        .route("/{sid}/save", post(editor::save))
        .route("/{sid}/discard", post(editor::discard))
        .route("/{sid}/plan", patch(editor::update_plan_fields))
        .route("/{sid}/items", post(editor::add_item))
        .route(
            "/{sid}/items/{item_id}",
            put(editor::update_item).delete(editor::remove_item),
        )
        .route("/{sid}/items/{item_id}/move", post(editor::move_item))
        .route(
            "/{sid}/items/{item_id}/image",
            put(editor::set_image).delete(editor::clear_image),
        )
        .route("/{sid}/items/{item_id}/files", post(editor::attach_file))
        .route(
            "/{sid}/items/{item_id}/files/{slot}",
            delete(editor::detach_file),
        )
        .route("/{sid}/rows/move", post(editor::move_row))
        .route("/{sid}/rows/order", put(editor::set_row_order))
        .route("/{sid}/rows/{kind}/height", put(editor::resize_row))
}
