//! Integration tests for brands, plans, completion saves, and plan exports,
//! including permission filtering.

mod common;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::Router;
use common::{
    body_bytes, body_json, build_test_app, delete_auth, get_auth, post_json_auth, put_json_auth,
    user_with_token, ADMIN_EMAIL,
};
use serde_json::{json, Value};
use storyplan_core::upload::MAX_UPLOAD_BYTES;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_brand(app: &Router, admin: &str, name: &str) -> i64 {
    let response =
        post_json_auth(app.clone(), "/api/v1/brands", json!({ "name": name }), admin).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_plan(app: &Router, token: &str, title: &str, brand_id: Option<i64>) -> i64 {
    let body = json!({ "title": title, "brand_id": brand_id });
    let response = post_json_auth(app.clone(), "/api/v1/plans", body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED, "create plan {title}");
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn list(app: &Router, token: &str, uri: &str) -> Vec<Value> {
    let response = get_auth(app.clone(), uri, token).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    body_json(response).await["data"].as_array().unwrap().clone()
}

fn titles(plans: &[Value]) -> Vec<&str> {
    plans.iter().map(|p| p["title"].as_str().unwrap()).collect()
}

async fn set_permissions(app: &Router, admin: &str, user_id: i64, body: Value) {
    let uri = format!("/api/v1/admin/users/{user_id}/permissions");
    let response = put_json_auth(app.clone(), &uri, body, admin).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Brands
// ---------------------------------------------------------------------------

/// Only admins can create brands.
#[tokio::test]
async fn brand_create_requires_admin() {
    let (app, state) = build_test_app();
    let (_, token) = user_with_token(&app, &state, "writer@studio.test").await;

    let response =
        post_json_auth(app, "/api/v1/brands", json!({ "name": "Acme" }), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Blank brand names are rejected.
#[tokio::test]
async fn brand_name_must_not_be_blank() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;

    let response = post_json_auth(app, "/api/v1/brands", json!({ "name": "  " }), &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Deleting a brand keeps its plans and moves them to the unassigned group.
#[tokio::test]
async fn deleting_brand_reassigns_plans() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    let brand = create_brand(&app, &admin, "Acme").await;
    let plan = create_plan(&app, &admin, "Launch teaser", Some(brand)).await;

    let response = delete_auth(app.clone(), &format!("/api/v1/brands/{brand}"), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["reassigned_plans"], 1);

    let unassigned = list(&app, &admin, "/api/v1/plans?unassigned=true").await;
    assert_eq!(unassigned.len(), 1);
    assert_eq!(unassigned[0]["id"], plan);
    assert_eq!(unassigned[0]["brand_id"], Value::Null);

    let response = get_auth(app, &format!("/api/v1/brands/{brand}"), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Reordering sets each brand's position and the list follows it.
#[tokio::test]
async fn reorder_changes_list_order() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    let a = create_brand(&app, &admin, "Alpha").await;
    let b = create_brand(&app, &admin, "Beta").await;
    let c = create_brand(&app, &admin, "Gamma").await;

    let response =
        put_json_auth(app.clone(), "/api/v1/brands/order", json!({ "ids": [c, a, b] }), &admin)
            .await;
    assert_eq!(response.status(), StatusCode::OK);

    let brands = list(&app, &admin, "/api/v1/brands").await;
    let ids: Vec<i64> = brands.iter().map(|b| b["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![c, a, b]);

    let response =
        put_json_auth(app, "/api/v1/brands/order", json!({ "ids": [a, a] }), &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Logos over the upload cap are rejected with 413 before anything is stored.
#[tokio::test]
async fn oversized_logo_is_rejected() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;

    // Every 4 base64 chars decode to 3 bytes.
    let chars = ((MAX_UPLOAD_BYTES as usize + 1) / 3 + 1) * 4;
    let body = json!({ "name": "Huge", "logo": "A".repeat(chars) });
    let response = post_json_auth(app.clone(), "/api/v1/brands", body, &admin).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "FILE_TOO_LARGE");

    assert!(list(&app, &admin, "/api/v1/brands").await.is_empty());
}

/// Brand search matches names case-insensitively.
#[tokio::test]
async fn brand_search_filters_by_name() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    create_brand(&app, &admin, "Northwind Coffee").await;
    create_brand(&app, &admin, "Contoso").await;

    let found = list(&app, &admin, "/api/v1/brands?q=COFFEE").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Northwind Coffee");
    assert_eq!(found[0]["plan_count"], 0);
}

// ---------------------------------------------------------------------------
// Plans and permissions
// ---------------------------------------------------------------------------

/// Plan search covers title and metadata; sort=title_asc orders by title.
#[tokio::test]
async fn plan_search_and_sort() {
    let (app, state) = build_test_app();
    let (_, token) = user_with_token(&app, &state, "writer@studio.test").await;
    create_plan(&app, &token, "Winter sale", None).await;
    create_plan(&app, &token, "autumn recap", None).await;
    let body = json!({
        "title": "Spring drop",
        "brand_id": null,
        "metadata": { "concept": "Cherry blossom reveal" }
    });
    let response = post_json_auth(app.clone(), "/api/v1/plans", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let sorted = list(&app, &token, "/api/v1/plans?sort=title_asc").await;
    assert_eq!(titles(&sorted), vec!["autumn recap", "Spring drop", "Winter sale"]);
    assert_eq!(sorted[0]["item_count"], 0);

    let found = list(&app, &token, "/api/v1/plans?q=blossom").await;
    assert_eq!(titles(&found), vec!["Spring drop"]);
}

/// Users without create permission cannot create, edit or delete plans.
#[tokio::test]
async fn create_permission_is_enforced() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    let (user, token) = user_with_token(&app, &state, "viewer@studio.test").await;
    let plan = create_plan(&app, &admin, "Admin plan", None).await;

    set_permissions(&app, &admin, user.id, json!({ "can_create_plans": false })).await;

    let response =
        post_json_auth(app.clone(), "/api/v1/plans", json!({ "title": "Mine" }), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(app.clone(), &format!("/api/v1/plans/{plan}"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Viewing is still allowed.
    let response = get_auth(app, &format!("/api/v1/plans/{plan}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// An allow list limits brands and their plans; unassigned plans stay visible.
#[tokio::test]
async fn allowed_brands_limit_visibility() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    let (user, token) = user_with_token(&app, &state, "scoped@studio.test").await;
    let open = create_brand(&app, &admin, "Open").await;
    let closed = create_brand(&app, &admin, "Closed").await;
    create_plan(&app, &admin, "Open plan", Some(open)).await;
    let hidden = create_plan(&app, &admin, "Closed plan", Some(closed)).await;
    create_plan(&app, &admin, "Loose plan", None).await;

    set_permissions(&app, &admin, user.id, json!({ "allowed_brand_ids": [open] })).await;

    let brands = list(&app, &token, "/api/v1/brands").await;
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0]["id"], open);

    let mut visible = titles(&list(&app, &token, "/api/v1/plans").await)
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    visible.sort();
    assert_eq!(visible, vec!["Loose plan", "Open plan"]);

    let response = get_auth(app.clone(), &format!("/api/v1/plans/{hidden}"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app.clone(), &format!("/api/v1/plans?brand_id={closed}"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = json!({ "title": "Sneaky", "brand_id": closed });
    let response = post_json_auth(app, "/api/v1/plans", body, &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Without project view, a user sees no brands and only their own
/// unassigned plans.
#[tokio::test]
async fn no_project_view_shows_only_own_unassigned_plans() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    let (user, token) = user_with_token(&app, &state, "solo@studio.test").await;
    let brand = create_brand(&app, &admin, "Acme").await;
    create_plan(&app, &admin, "Branded", Some(brand)).await;
    create_plan(&app, &admin, "Someone else's", None).await;
    create_plan(&app, &token, "My draft", None).await;

    set_permissions(&app, &admin, user.id, json!({ "can_view_projects": false })).await;

    assert!(list(&app, &token, "/api/v1/brands").await.is_empty());
    let plans = list(&app, &token, "/api/v1/plans").await;
    assert_eq!(titles(&plans), vec!["My draft"]);
}

/// Updating a plan with `brand_id: null` moves it to the unassigned group.
#[tokio::test]
async fn update_can_unassign_plan() {
    let (app, state) = build_test_app();
    let (_, admin) = user_with_token(&app, &state, ADMIN_EMAIL).await;
    let brand = create_brand(&app, &admin, "Acme").await;
    let plan = create_plan(&app, &admin, "Teaser", Some(brand)).await;

    let uri = format!("/api/v1/plans/{plan}");
    let response = put_json_auth(
        app.clone(),
        &uri,
        json!({ "brand_id": null, "title": "Teaser v2" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["brand_id"], Value::Null);
    assert_eq!(json["data"]["title"], "Teaser v2");

    let response = put_json_auth(app, &uri, json!({ "brand_id": 9999 }), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// A completion batch writes only real changes and reports them.
#[tokio::test]
async fn completion_batch_saves_changes() {
    let (app, state) = build_test_app();
    let (_, token) = user_with_token(&app, &state, "writer@studio.test").await;
    let a = create_plan(&app, &token, "A", None).await;
    let b = create_plan(&app, &token, "B", None).await;

    let body = json!({ "changes": [
        { "plan_id": b, "is_completed": true },
        { "plan_id": a, "is_completed": false },
    ]});
    let response = post_json_auth(app.clone(), "/api/v1/plans/completion", body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["saved"], json!([b]));

    let response = get_auth(app, &format!("/api/v1/plans/{b}"), &token).await;
    assert_eq!(body_json(response).await["data"]["is_completed"], true);
}

/// A batch naming a missing plan is rejected.
#[tokio::test]
async fn completion_with_missing_plan_is_404() {
    let (app, state) = build_test_app();
    let (_, token) = user_with_token(&app, &state, "writer@studio.test").await;

    let body = json!({ "changes": [{ "plan_id": 424242, "is_completed": true }] });
    let response = post_json_auth(app, "/api/v1/plans/completion", body, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Plan export defaults to an xlsx attachment.
#[tokio::test]
async fn plan_export_xlsx_download() {
    let (app, state) = build_test_app();
    let (_, token) = user_with_token(&app, &state, "writer@studio.test").await;
    let plan = create_plan(&app, &token, "Launch teaser", None).await;

    let response = get_auth(app, &format!("/api/v1/plans/{plan}/export"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"Launch_teaser.xlsx\""
    );
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK", "xlsx files are zip archives");
}

/// `format=txt` returns a readable report.
#[tokio::test]
async fn plan_export_text_report() {
    let (app, state) = build_test_app();
    let (_, token) = user_with_token(&app, &state, "writer@studio.test").await;
    let plan = create_plan(&app, &token, "Launch teaser", None).await;

    let response = get_auth(app, &format!("/api/v1/plans/{plan}/export?format=txt"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.starts_with("Launch teaser\n"));
    assert!(text.contains("Brand: Unassigned"));
}
