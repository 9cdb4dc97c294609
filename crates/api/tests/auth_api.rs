//! HTTP-level integration tests for sign-up, sign-in, token refresh,
//! sign-out, and account lockout.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_user, get, get_auth, post_auth, post_json, sign_in,
    ADMIN_EMAIL, PASSWORD,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Sign-up
// ---------------------------------------------------------------------------

/// Sign-up returns 201 with tokens and a non-admin user.
#[tokio::test]
async fn sign_up_returns_tokens() {
    let (app, _state) = build_test_app();

    let body = json!({ "email": "Writer@Studio.test", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/sign-up", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["expires_in"], 15 * 60);
    assert_eq!(json["user"]["email"], "writer@studio.test");
    assert_eq!(json["user"]["is_admin"], false);
    assert!(json["user"].get("password_hash").is_none());
}

/// A second sign-up with the same email (any case) is a 409.
#[tokio::test]
async fn duplicate_sign_up_is_conflict() {
    let (app, state) = build_test_app();
    create_user(&state, "taken@studio.test").await;

    let body = json!({ "email": "TAKEN@studio.test", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/sign-up", body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

/// Malformed emails and short passwords are rejected with 400.
#[tokio::test]
async fn sign_up_validates_input() {
    let (app, _state) = build_test_app();

    let bad_email = json!({ "email": "not-an-email", "password": PASSWORD });
    let response = post_json(app.clone(), "/api/v1/auth/sign-up", bad_email).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let short = json!({ "email": "ok@studio.test", "password": "short" });
    let response = post_json(app, "/api/v1/auth/sign-up", short).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Sign-in and admin status
// ---------------------------------------------------------------------------

/// Allow-listed emails are admins; matching ignores case.
#[tokio::test]
async fn admin_allow_list_sets_is_admin() {
    let (app, state) = build_test_app();
    create_user(&state, ADMIN_EMAIL).await;

    let body = json!({ "email": ADMIN_EMAIL.to_uppercase(), "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/sign-in", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"]["is_admin"], true);
}

/// A wrong password is a 401 with a message.
#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, state) = build_test_app();
    create_user(&state, "a@studio.test").await;

    let body = json!({ "email": "a@studio.test", "password": "incorrect-password" });
    let response = post_json(app, "/api/v1/auth/sign-in", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert!(json["error"].is_string());
}

/// Five consecutive failures lock the account, even for the right password.
#[tokio::test]
async fn repeated_failures_lock_account() {
    let (app, state) = build_test_app();
    create_user(&state, "locked@studio.test").await;

    for _ in 0..5 {
        let body = json!({ "email": "locked@studio.test", "password": "nope-nope-nope" });
        let response = post_json(app.clone(), "/api/v1/auth/sign-in", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let body = json!({ "email": "locked@studio.test", "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/sign-in", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Tokens and sessions
// ---------------------------------------------------------------------------

/// Requests without a token are rejected.
#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _state) = build_test_app();
    let response = get(app, "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// `/auth/me` returns the user and their default permissions.
#[tokio::test]
async fn me_includes_default_permissions() {
    let (app, state) = build_test_app();
    let user = create_user(&state, "me@studio.test").await;
    let token = sign_in(app.clone(), "me@studio.test").await;

    let response = get_auth(app, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["id"], user.id);
    assert_eq!(json["data"]["permissions"]["can_create_plans"], true);
    assert_eq!(json["data"]["permissions"]["can_view_projects"], true);
    assert_eq!(json["data"]["permissions"]["allowed_brand_ids"], json!([]));
}

/// A refresh token works once; the rotated-out token is rejected.
#[tokio::test]
async fn refresh_rotates_tokens() {
    let (app, state) = build_test_app();
    create_user(&state, "r@studio.test").await;

    let body = json!({ "email": "r@studio.test", "password": PASSWORD });
    let signed_in = body_json(post_json(app.clone(), "/api/v1/auth/sign-in", body).await).await;
    let refresh_token = signed_in["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], signed_in["refresh_token"]);

    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Sign-out revokes every refresh token for the user.
#[tokio::test]
async fn sign_out_revokes_sessions() {
    let (app, state) = build_test_app();
    create_user(&state, "out@studio.test").await;

    let body = json!({ "email": "out@studio.test", "password": PASSWORD });
    let signed_in = body_json(post_json(app.clone(), "/api/v1/auth/sign-in", body).await).await;
    let access = signed_in["access_token"].as_str().unwrap();

    let response = post_auth(app.clone(), "/api/v1/auth/sign-out", access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": signed_in["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
