//! Route definitions for the `/plans` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{editor, plans};
use crate::state::AppState;

/// Routes mounted at `/plans`.
///
/// ```text
/// GET    /               -> list (?brand_id=&unassigned=&q=&sort=)
/// POST   /               -> create
/// POST   /completion     -> save_completion
/// GET    /{id}           -> get_by_id
/// PUT    /{id}           -> update
/// DELETE /{id}           -> delete
/// GET    /{id}/export    -> export (?format=xlsx|txt)
/// POST   /{id}/editor    -> open an editor session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(plans::list).post(plans::create))
        .route("/completion", post(plans::save_completion))
        .route(
            "/{id}",
            get(plans::get_by_id)
                .put(plans::update)
                .delete(plans::delete),
        )
        .route("/{id}/export", get(plans::export))
        .route("/{id}/editor", post(editor::open))
}
