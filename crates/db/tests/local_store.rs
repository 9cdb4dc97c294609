//! Integration tests for the JSON-file backend.
//!
//! Exercises the `Store` trait surface through `LocalStore`:
//! - Brand deletion moving plans to the unassigned group
//! - Brand reordering
//! - Persistence across reopen
//! - Uniqueness and session rules
//! - Editor and completion writes through `StoreWriter`

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use storyplan_core::completion::CompletionTracker;
use storyplan_core::editor::StoryboardEditor;
use storyplan_core::permissions::PermissionFlags;
use storyplan_db::models::brand::{CreateBrand, UpdateBrand};
use storyplan_db::models::permission::{CreatePermission, UpdatePermission};
use storyplan_db::models::plan::{CreatePlan, PlanFilter, UpdatePlan};
use storyplan_db::models::session::CreateSession;
use storyplan_db::models::user::CreateUser;
use storyplan_db::models::visit::CreateVisit;
use storyplan_db::store::{
    AccountStore, AnalyticsStore, BrandStore, LocalStore, PermissionStore, PlanStore, Store,
    StoreError, StoreWriter,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_brand(name: &str) -> CreateBrand {
    CreateBrand {
        name: name.to_string(),
        logo: None,
    }
}

fn new_plan(title: &str, brand_id: Option<i64>) -> CreatePlan {
    CreatePlan {
        title: title.to_string(),
        brand_id,
        metadata: Default::default(),
        created_by: None,
    }
}

// ---------------------------------------------------------------------------
// Brands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_a_brand_unassigns_its_plans() {
    let store = LocalStore::in_memory();
    let acme = store.create_brand(&new_brand("Acme")).await.unwrap();
    let other = store.create_brand(&new_brand("Other")).await.unwrap();
    let p1 = store.create_plan(&new_plan("One", Some(acme.id))).await.unwrap();
    let p2 = store.create_plan(&new_plan("Two", Some(acme.id))).await.unwrap();
    let p3 = store.create_plan(&new_plan("Three", Some(other.id))).await.unwrap();

    let moved = store.delete_brand(acme.id).await.unwrap();

    assert_eq!(moved, Some(2));
    assert!(store.find_brand(acme.id).await.unwrap().is_none());
    let unassigned: Vec<i64> = store
        .list_plans(PlanFilter::Unassigned)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert!(unassigned.contains(&p1.id));
    assert!(unassigned.contains(&p2.id));
    assert!(!unassigned.contains(&p3.id));
    assert_eq!(
        store.find_plan(p3.id).await.unwrap().unwrap().brand_id,
        Some(other.id)
    );
}

#[tokio::test]
async fn deleting_a_missing_brand_is_none() {
    let store = LocalStore::in_memory();
    assert_eq!(store.delete_brand(404).await.unwrap(), None);
}

#[tokio::test]
async fn brands_list_in_sort_order_with_counts() {
    let store = LocalStore::in_memory();
    let a = store.create_brand(&new_brand("A")).await.unwrap();
    let b = store.create_brand(&new_brand("B")).await.unwrap();
    let c = store.create_brand(&new_brand("C")).await.unwrap();
    store.create_plan(&new_plan("p", Some(b.id))).await.unwrap();

    let reordered = store.reorder_brands(&[c.id, a.id, b.id]).await.unwrap();

    let ids: Vec<i64> = reordered.iter().map(|x| x.brand.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);
    assert_eq!(reordered[2].plan_count, 1);
    assert_eq!(reordered[0].brand.sort_order, 0);
}

#[tokio::test]
async fn partial_reorder_puts_unlisted_brands_after_listed_ones() {
    let store = LocalStore::in_memory();
    let a = store.create_brand(&new_brand("Alpha")).await.unwrap();
    let b = store.create_brand(&new_brand("Beta")).await.unwrap();
    let c = store.create_brand(&new_brand("Gamma")).await.unwrap();
    let d = store.create_brand(&new_brand("Delta")).await.unwrap();

    let reordered = store.reorder_brands(&[d.id, 999, b.id]).await.unwrap();

    let ids: Vec<i64> = reordered.iter().map(|x| x.brand.id).collect();
    assert_eq!(ids, vec![d.id, b.id, a.id, c.id]);
    let orders: Vec<i32> = reordered.iter().map(|x| x.brand.sort_order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn brand_logo_can_be_cleared() {
    let store = LocalStore::in_memory();
    let brand = store
        .create_brand(&CreateBrand {
            name: "Logo".into(),
            logo: Some("data:image/png;base64,AAAA".into()),
        })
        .await
        .unwrap();

    let renamed = store
        .update_brand(brand.id, &UpdateBrand { name: Some("Renamed".into()), logo: None })
        .await
        .unwrap()
        .unwrap();
    assert!(renamed.logo.is_some(), "absent logo leaves it alone");

    let cleared = store
        .update_brand(brand.id, &UpdateBrand { name: None, logo: Some(None) })
        .await
        .unwrap()
        .unwrap();
    assert!(cleared.logo.is_none());
    assert_eq!(cleared.name, "Renamed");
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_plan_can_unassign() {
    let store = LocalStore::in_memory();
    let brand = store.create_brand(&new_brand("B")).await.unwrap();
    let plan = store.create_plan(&new_plan("p", Some(brand.id))).await.unwrap();

    let updated = store
        .update_plan(plan.id, &UpdatePlan { brand_id: Some(None), ..Default::default() })
        .await
        .unwrap()
        .unwrap();
    assert!(updated.brand_id.is_none());
    assert!(store.update_plan(999, &UpdatePlan::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn editor_save_goes_through_the_store() {
    let store = LocalStore::in_memory();
    let plan = store.create_plan(&new_plan("Draft", None)).await.unwrap();
    let mut editor = StoryboardEditor::open(plan.id, plan.document());
    editor.add_item(None).unwrap();
    editor.set_title("Final").unwrap();

    editor.save(&StoreWriter(&store)).await.unwrap();

    let stored = store.find_plan(plan.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.items.len(), 1);
    assert!(!editor.has_unsaved_changes());
}

#[tokio::test]
async fn completion_save_all_writes_every_pending_plan() {
    let store = LocalStore::in_memory();
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(store.create_plan(&new_plan(&format!("p{i}"), None)).await.unwrap().id);
    }
    let mut tracker = CompletionTracker::new();
    for id in &ids {
        tracker.set(*id, false, true);
    }

    let report = tracker.save_all(&StoreWriter(&store)).await.unwrap();

    assert_eq!(report.saved.len(), 3);
    assert!(tracker.is_empty());
    for id in ids {
        assert!(store.find_plan(id).await.unwrap().unwrap().is_completed);
    }
}

#[tokio::test]
async fn completion_for_missing_plan_fails_and_stays_pending() {
    let store = LocalStore::in_memory();
    let mut tracker = CompletionTracker::new();
    tracker.set(12345, false, true);

    let (report, err) = tracker.save_all(&StoreWriter(&store)).await.unwrap_err();

    assert!(report.saved.is_empty());
    assert_matches!(err, StoreError::NotFound { id: 12345, .. });
    assert!(tracker.is_pending(12345));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");

    {
        let store = LocalStore::open(&path).await.unwrap();
        let brand = store.create_brand(&new_brand("Persisted")).await.unwrap();
        store.create_plan(&new_plan("Kept", Some(brand.id))).await.unwrap();
    }

    let reopened = LocalStore::open(&path).await.unwrap();
    let brands = reopened.list_brands().await.unwrap();
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0].plan_count, 1);
    assert!(!path.with_extension("json.tmp").exists());

    // Ids keep counting after a reopen.
    let next = reopened.create_brand(&new_brand("Next")).await.unwrap();
    assert!(next.id > brands[0].brand.id);
}

#[tokio::test]
async fn legacy_plans_load_as_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    let now = Utc::now().to_rfc3339();
    let doc = serde_json::json!({
        "last_id": 1,
        "plans": [{
            "id": 1,
            "brand_id": null,
            "title": "Old",
            "legacy_sections": [
                { "title": "0:00", "content": "Open on product" },
                { "title": "0:05", "content": "Call to action" }
            ],
            "is_completed": false,
            "created_by": null,
            "created_at": now,
            "updated_at": now
        }]
    });
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let store = LocalStore::open(&path).await.unwrap();
    let plan = store.find_plan(1).await.unwrap().unwrap();
    assert_eq!(plan.items.len(), 2);
    assert_eq!(plan.items[1].narration, "Call to action");
    let again = store.find_plan(1).await.unwrap().unwrap();
    assert_eq!(again.items, plan.items, "legacy item ids must not change between reads");

    let saved = store
        .save_plan_document(1, &plan.document())
        .await
        .unwrap()
        .unwrap();
    assert!(saved.legacy_sections.is_empty());
    assert_eq!(saved.items.len(), 2);
}

#[tokio::test]
async fn corrupt_file_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, b"{ not json").unwrap();
    assert_matches!(LocalStore::open(&path).await, Err(StoreError::Serialization(_)));
}

// ---------------------------------------------------------------------------
// Accounts, permissions, analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn emails_are_unique_case_insensitively() {
    let store = LocalStore::in_memory();
    store
        .create_user(&CreateUser { email: "Ann@Example.com".into(), password_hash: "h".into() })
        .await
        .unwrap();

    let dup = store
        .create_user(&CreateUser { email: "ann@example.COM".into(), password_hash: "h".into() })
        .await;
    assert_matches!(dup, Err(StoreError::Conflict(_)));
    assert!(store.find_user_by_email("ANN@example.com").await.unwrap().is_some());
}

#[tokio::test]
async fn revoked_and_expired_sessions_are_inactive() {
    let store = LocalStore::in_memory();
    let user = store
        .create_user(&CreateUser { email: "s@x.com".into(), password_hash: "h".into() })
        .await
        .unwrap();
    store
        .create_session(&CreateSession {
            user_id: user.id,
            refresh_token_hash: "live".into(),
            expires_at: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();
    store
        .create_session(&CreateSession {
            user_id: user.id,
            refresh_token_hash: "stale".into(),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    assert!(store.find_active_session("live").await.unwrap().is_some());
    assert!(store.find_active_session("stale").await.unwrap().is_none());

    assert_eq!(store.revoke_all_sessions(user.id).await.unwrap(), 2);
    assert!(store.find_active_session("live").await.unwrap().is_none());
}

#[tokio::test]
async fn sessions_rotate_once() {
    let store = LocalStore::in_memory();
    let user = store
        .create_user(&CreateUser { email: "r@x.com".into(), password_hash: "h".into() })
        .await
        .unwrap();
    let session = |hash: &str| CreateSession {
        user_id: user.id,
        refresh_token_hash: hash.into(),
        expires_at: Utc::now() + Duration::days(1),
    };
    let first = store.create_session(&session("first")).await.unwrap();

    let second = store.rotate_session(first.id, &session("second")).await.unwrap();
    assert_matches!(second, Some(s) if s.refresh_token_hash == "second");
    assert!(store.find_active_session("first").await.unwrap().is_none());
    assert!(store.find_active_session("second").await.unwrap().is_some());

    // Rotating the same session again is a reuse and creates nothing.
    assert!(store.rotate_session(first.id, &session("third")).await.unwrap().is_none());
    assert!(store.find_active_session("third").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_logins_count_up_and_reset() {
    let store = LocalStore::in_memory();
    let user = store
        .create_user(&CreateUser { email: "f@x.com".into(), password_hash: "h".into() })
        .await
        .unwrap();
    assert_eq!(store.increment_failed_login(user.id).await.unwrap(), 1);
    assert_eq!(store.increment_failed_login(user.id).await.unwrap(), 2);
    store.record_successful_login(user.id).await.unwrap();
    let user = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.failed_login_count, 0);
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
async fn permission_create_is_idempotent() {
    let store = LocalStore::in_memory();
    let input = CreatePermission {
        user_id: 7,
        email: "p@x.com".into(),
        flags: PermissionFlags::default(),
    };
    store.create_permission(&input).await.unwrap();
    store
        .update_permission(7, &UpdatePermission { can_view_projects: Some(false), ..Default::default() })
        .await
        .unwrap();

    let again = store.create_permission(&input).await.unwrap();
    assert!(!again.can_view_projects, "existing record is returned unchanged");
    assert_eq!(store.list_permissions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn visits_page_newest_first() {
    let store = LocalStore::in_memory();
    for page in ["a", "b", "c"] {
        store
            .record_visit(&CreateVisit {
                visitor_id: "v".into(),
                user_email: None,
                page: page.into(),
            })
            .await
            .unwrap();
    }
    let first = store.list_visits(2, 0).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].page, "c");
    let rest = store.list_visits(2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].page, "a");
    assert_eq!(store.all_visits().await.unwrap()[0].page, "a");
}

fn visit(page: &str) -> CreateVisit {
    CreateVisit {
        visitor_id: "v".into(),
        user_email: None,
        page: page.into(),
    }
}

#[tokio::test]
async fn visits_append_to_their_own_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let store = LocalStore::open(&path).await.unwrap();
        store.create_brand(&new_brand("Only")).await.unwrap();
        store.record_visit(&visit("home")).await.unwrap();
        store.record_visit(&visit("plans")).await.unwrap();
    }

    let document = std::fs::read_to_string(&path).unwrap();
    assert!(!document.contains("visits"));
    let log = std::fs::read_to_string(path.with_extension("visits.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);

    let reopened = LocalStore::open(&path).await.unwrap();
    let visits = reopened.all_visits().await.unwrap();
    let pages: Vec<&str> = visits.iter().map(|v| v.page.as_str()).collect();
    assert_eq!(pages, vec!["home", "plans"]);
    let next = reopened.record_visit(&visit("again")).await.unwrap();
    assert_eq!(next.id, visits[1].id + 1);
}

#[tokio::test]
async fn torn_last_visit_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    {
        let store = LocalStore::open(&path).await.unwrap();
        store.record_visit(&visit("home")).await.unwrap();
    }
    let log_path = path.with_extension("visits.jsonl");
    let mut log = std::fs::read_to_string(&log_path).unwrap();
    log.push_str("{\"id\":2,\"visi");
    std::fs::write(&log_path, log).unwrap();

    let reopened = LocalStore::open(&path).await.unwrap();
    assert_eq!(reopened.all_visits().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_write_rolls_back_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = LocalStore::open(&path).await.unwrap();
    let kept = store.create_brand(&new_brand("Kept")).await.unwrap();

    // A directory where the temp file goes makes the next write fail.
    let tmp = path.with_extension("json.tmp");
    std::fs::create_dir(&tmp).unwrap();
    assert_matches!(
        store.create_brand(&new_brand("Lost")).await,
        Err(StoreError::Io(_))
    );
    let brands = store.list_brands().await.unwrap();
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0].brand.id, kept.id);

    std::fs::remove_dir(&tmp).unwrap();
    let next = store.create_brand(&new_brand("Next")).await.unwrap();
    assert_eq!(next.id, kept.id + 1);
    assert_eq!(LocalStore::open(&path).await.unwrap().list_brands().await.unwrap().len(), 2);
}

#[tokio::test]
async fn backend_reports_its_name() {
    let store = LocalStore::in_memory();
    store.health_check().await.unwrap();
    assert_eq!(store.backend_name(), "local");
}
