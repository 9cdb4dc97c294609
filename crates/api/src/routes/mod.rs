pub mod admin;
pub mod auth;
pub mod brands;
pub mod editor;
pub mod health;
pub mod plans;
pub mod visits;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/sign-up                        sign up (public)
/// /auth/sign-in                        sign in (public)
/// /auth/refresh                        refresh tokens (public)
/// /auth/sign-out                       sign out
/// /auth/me                             current user + permissions
/// /auth/permissions/refresh            reload permissions
///
/// /brands                              list, create (admin)
/// /brands/order                        reorder (admin)
/// /brands/{id}                         get, update (admin), delete (admin)
///
/// /plans                               list, create
/// /plans/completion                    bulk completion save
/// /plans/{id}                          get, update, delete
/// /plans/{id}/export                   xlsx / txt download
/// /plans/{id}/editor                   open editor session
///
/// /editor/{sid}/...                    editor session operations
///
/// /visits                              record a page visit
///
/// /admin/visits                        visit log (admin)
/// /admin/visits/summary                visit aggregates (admin)
/// /admin/users                         users + effective permissions (admin)
/// /admin/users/{id}/permissions        update permission record (admin)
/// /admin/users/{id}/override           get, put, delete override (admin)
/// /admin/export/users                  users download (admin)
/// /admin/export/visits                 visits download (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/brands", brands::router())
        .nest("/plans", plans::router())
        .nest("/editor", editor::router())
        .nest("/visits", visits::router())
        .nest("/admin", admin::router())
}
