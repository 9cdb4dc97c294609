//! Authorization extractors.
//!
//! Each extractor wraps [`AuthUser`]. Use these in route handlers to enforce
//! authorization at the type level.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use storyplan_core::error::CoreError;
use storyplan_core::permissions::EffectivePermissions;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires an admin. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// An authenticated user together with their effective permissions,
/// served from the permission cache.
///
/// ```ignore
/// async fn create(Authorized { user, permissions }: Authorized) -> AppResult<Json<()>> {
///     permissions.require_create()?;
///     Ok(Json(()))
/// }
/// ```
pub struct Authorized {
    pub user: AuthUser,
    pub permissions: EffectivePermissions,
}

impl FromRequestParts<AppState> for Authorized {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let permissions = state
            .permissions
            .get_or_load(user.user_id, &user.email, user.is_admin, state.store.as_ref())
            .await?;
        Ok(Authorized { user, permissions })
    }
}
