//! Route definitions for the `/admin` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every route requires an admin.
///
/// ```text
/// GET    /visits                       -> list_visits (?limit=&offset=)
/// GET    /visits/summary               -> visit_summary
/// GET    /users                        -> list_users
/// PUT    /users/{id}/permissions       -> update_permissions
/// GET    /users/{id}/override          -> get_override
/// PUT    /users/{id}/override          -> put_override
/// DELETE /users/{id}/override          -> delete_override
/// GET    /export/users                 -> export_users (?format=xlsx|txt)
/// GET    /export/visits                -> export_visits (?format=xlsx|txt)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/visits", get(admin::list_visits))
        .route("/visits/summary", get(admin::visit_summary))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/permissions", put(admin::update_permissions))
        .route(
            "/users/{id}/override",
            get(admin::get_override)
                .put(admin::put_override)
                .delete(admin::delete_override),
        )
        .route("/export/users", get(admin::export_users))
        .route("/export/visits", get(admin::export_visits))
}
