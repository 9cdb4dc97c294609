//! Shared helpers for API integration tests.
//!
//! Every test gets a fresh in-memory [`LocalStore`], so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use storyplan_api::auth::jwt::JwtConfig;
use storyplan_api::auth::password::hash_password;
use storyplan_api::config::{ServerConfig, StorageBackend};
use storyplan_api::editor_sessions::EditorLimits;
use storyplan_api::router::build_app_router;
use storyplan_api::state::AppState;
use storyplan_db::models::user::{CreateUser, User};
use storyplan_db::store::{AccountStore, LocalStore};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "director@studio.test";
pub const PASSWORD: &str = "storyboard-pass-1";

/// Build a test `ServerConfig` with safe defaults and one allow-listed admin.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        storage: StorageBackend::Local {
            path: "unused.json".into(),
        },
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        editor_limits: EditorLimits::default(),
    }
}

/// Build the full application router over an empty in-memory store.
///
/// The returned state shares the router's store, permission cache and
/// editor registry, for direct setup and assertions.
pub fn build_test_app() -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(Arc::new(LocalStore::in_memory()), config.clone());
    (build_app_router(state.clone(), &config), state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Create a user directly in the store with [`PASSWORD`].
pub async fn create_user(state: &AppState, email: &str) -> User {
    let password_hash = hash_password(PASSWORD).expect("hashing should succeed");
    state
        .store
        .create_user(&CreateUser {
            email: email.to_string(),
            password_hash,
        })
        .await
        .expect("user creation should succeed")
}

/// Sign in through the API and return the access token.
pub async fn sign_in(app: Router, email: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/sign-in", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK, "sign-in of {email}");
    body_json(response).await["access_token"]
        .as_str()
        .expect("access_token should be a string")
        .to_string()
}

/// Create a user and sign them in. Returns `(user, access_token)`.
pub async fn user_with_token(app: &Router, state: &AppState, email: &str) -> (User, String) {
    let user = create_user(state, email).await;
    let token = sign_in(app.clone(), email).await;
    (user, token)
}
