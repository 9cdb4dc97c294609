//! Route definitions for the `/brands` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::brands;
use crate::state::AppState;

/// Routes mounted at `/brands`.
///
/// ```text
/// GET    /          -> list (?q=&sort=)
/// POST   /          -> create (admin)
/// PUT    /order     -> reorder (admin)
/// GET    /{id}      -> get_by_id
/// PUT    /{id}      -> update (admin)
/// DELETE /{id}      -> delete (admin, plans become unassigned)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(brands::list).post(brands::create))
        .route("/order", put(brands::reorder))
        .route(
            "/{id}",
            get(brands::get_by_id)
                .put(brands::update)
                .delete(brands::delete),
        )
}
