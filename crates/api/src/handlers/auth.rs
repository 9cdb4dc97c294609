//! Handlers for the `/auth` resource (sign-up, sign-in, refresh, sign-out,
//! current user, permission refresh).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use storyplan_core::error::CoreError;
use storyplan_core::permissions::EffectivePermissions;
use storyplan_db::models::session::CreateSession;
use storyplan_db::models::user::{normalize_email, CreateUser, User, UserResponse};
use storyplan_db::store::AccountStore;
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum consecutive failed sign-in attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/sign-up`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

/// Request body for `POST /auth/sign-in`.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by sign-up, sign-in and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// `GET /auth/me` payload.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub permissions: EffectivePermissions,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/sign-up
///
/// Create an account and sign it in. Returns 201 with tokens.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let email = normalize_email(&input.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = state
        .store
        .create_user(&CreateUser {
            email,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = user.id, "User signed up");

    let response = start_session(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/sign-in
///
/// Authenticate with email + password. Returns access and refresh tokens.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignInRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Find user by email.
    let user = state
        .store
        .find_user_by_email(&normalize_email(&input.email))
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    // 2. Check if the account is active.
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 3. Check if the account is temporarily locked.
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    // 4. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        // 5. On failure: increment counter, lock if threshold reached.
        let failures = state.store.increment_failed_login(user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            state.store.lock_account(user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed sign-ins");
        }

        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    // 6. On success: reset failed count, set last_login_at.
    state.store.record_successful_login(user.id).await?;

    // 7. Start from fresh permissions for the new session.
    state.permissions.invalidate(user.id).await;

    let response = start_session(&state, &user).await?;
    tracing::info!(user_id = user.id, is_admin = response.user.is_admin, "User signed in");
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);
    let session = state
        .store
        .find_active_session(&token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    let user = state
        .store
        .find_user(session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let (response, next) = issue_tokens(&state, &user)?;
    if state.store.rotate_session(session.id, &next).await?.is_none() {
        tracing::warn!(user_id = user.id, session_id = session.id, "Refresh token reused");
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        )));
    }
    Ok(Json(response))
}

/// POST /api/v1/auth/sign-out
///
/// Revoke all sessions for the authenticated user, forget their cached
/// permissions and close their open editors. Returns 204 No Content.
pub async fn sign_out(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    let revoked = state.store.revoke_all_sessions(auth_user.user_id).await?;
    state.permissions.invalidate(auth_user.user_id).await;
    let closed = state.editors.close_user(auth_user.user_id).await;
    tracing::info!(
        user_id = auth_user.user_id,
        revoked,
        closed_editors = closed,
        "User signed out"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    let user = find_user(&state, &auth_user).await?;
    let permissions = state
        .permissions
        .get_or_load(user.id, &user.email, auth_user.is_admin, state.store.as_ref())
        .await?;

    Ok(Json(DataResponse {
        data: MeResponse {
            user: UserResponse::from_user(&user, auth_user.is_admin),
            permissions,
        },
    }))
}

/// POST /api/v1/auth/permissions/refresh
///
/// Drop the cached permissions and reload them from the store.
pub async fn refresh_permissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<EffectivePermissions>>> {
    state.permissions.invalidate(auth_user.user_id).await;
    let permissions = state
        .permissions
        .get_or_load(
            auth_user.user_id,
            &auth_user.email,
            auth_user.is_admin,
            state.store.as_ref(),
        )
        .await?;
    Ok(Json(DataResponse { data: permissions }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, auth_user: &AuthUser) -> AppResult<User> {
    state
        .store
        .find_user(auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))
}

/// Mint an access token and a refresh token for `user`. Returns the response
/// body and the session row that must be stored for the refresh token.
///
/// Admin status is decided here, from the current allow-list, and carried in
/// the access token until it expires.
fn issue_tokens(state: &AppState, user: &User) -> AppResult<(AuthResponse, CreateSession)> {
    let jwt = &state.config.jwt;
    let is_admin = state.is_admin_email(&user.email);

    let access_token = generate_access_token(user.id, &user.email, is_admin, jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let (refresh_token, refresh_token_hash) = generate_refresh_token();

    let session = CreateSession {
        user_id: user.id,
        refresh_token_hash,
        expires_at: jwt.refresh_expires_at(),
    };
    let response = AuthResponse {
        access_token,
        refresh_token,
        expires_in: jwt.access_token_expiry_mins * 60,
        user: UserResponse::from_user(user, is_admin),
    };
    Ok((response, session))
}

/// Issue tokens and open a fresh session (sign-up and sign-in).
async fn start_session(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let (response, session) = issue_tokens(state, user)?;
    state.store.create_session(&session).await?;
    Ok(response)
}
