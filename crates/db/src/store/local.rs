//! File-backed JSON backend.
//!
//! Everything except visits is one [`LocalData`] document held behind a
//! `tokio::sync::RwLock`. A mutation is applied in place and the document is
//! then written to disk (temp file + rename). If that write fails the
//! in-memory state is rolled back by reloading the last committed file, so
//! memory never runs ahead of disk.
//!
//! Visits are append-only and arrive on every page view, so they live in a
//! JSON-lines log next to the document (`<name>.visits.jsonl`). Recording one
//! appends a single line instead of rewriting the document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use storyplan_core::storyboard::PlanDocument;
use storyplan_core::types::{DbId, Timestamp};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::{AccountStore, AnalyticsStore, BrandStore, PermissionStore, PlanStore, Store, StoreError};
use crate::models::access_override::{AccessOverride, UpsertAccessOverride};
use crate::models::brand::{Brand, BrandWithCount, CreateBrand, UpdateBrand};
use crate::models::permission::{CreatePermission, UpdatePermission, UserPermission};
use crate::models::plan::{CreatePlan, Plan, PlanFilter, UpdatePlan};
use crate::models::session::{CreateSession, UserSession};
use crate::models::user::{normalize_email, CreateUser, User};
use crate::models::visit::{CreateVisit, Visit};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalData {
    /// Last id handed out. Shared by every collection except visits.
    #[serde(default)]
    last_id: DbId,
    #[serde(default)]
    brands: Vec<Brand>,
    #[serde(default)]
    plans: Vec<Plan>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    sessions: Vec<UserSession>,
    #[serde(default)]
    permissions: Vec<UserPermission>,
    #[serde(default)]
    overrides: Vec<AccessOverride>,
}

impl LocalData {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn brands_with_counts(&self) -> Vec<BrandWithCount> {
        let mut out: Vec<BrandWithCount> = self
            .brands
            .iter()
            .map(|b| BrandWithCount {
                brand: b.clone(),
                plan_count: self.plans.iter().filter(|p| p.brand_id == Some(b.id)).count() as i64,
            })
            .collect();
        out.sort_by(|a, b| {
            a.brand
                .sort_order
                .cmp(&b.brand.sort_order)
                .then(a.brand.created_at.cmp(&b.brand.created_at))
                .then(a.brand.id.cmp(&b.brand.id))
        });
        out
    }

    fn plan_mut(&mut self, id: DbId) -> Option<&mut Plan> {
        self.plans.iter_mut().find(|p| p.id == id)
    }

    fn user_mut(&mut self, id: DbId) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

/// The visit log that belongs to the document at `path`.
fn visit_log_path(path: &Path) -> PathBuf {
    path.with_extension("visits.jsonl")
}

async fn load_document(path: &Path) -> Result<LocalData, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(LocalData::default()),
        Err(e) => Err(e.into()),
    }
}

/// Read the visit log. A torn last line (a crash mid-append) is skipped.
async fn load_visits(path: &Path) -> Result<Vec<Visit>, StoreError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut visits = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        match serde_json::from_str(line) {
            Ok(visit) => visits.push(visit),
            Err(e) if index + 1 == lines.len() => {
                tracing::warn!(error = %e, path = %path.display(), "Skipping torn visit log line");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(visits)
}

#[derive(Debug)]
pub struct LocalStore {
    /// `None` keeps everything in memory only.
    path: Option<PathBuf>,
    data: RwLock<LocalData>,
    visits: RwLock<Vec<Visit>>,
}

impl LocalStore {
    /// Open (or start) the document at `path` and its visit log. Missing
    /// files are an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = load_document(&path).await?;
        let visits = load_visits(&visit_log_path(&path)).await?;
        tracing::info!(path = %path.display(), visits = visits.len(), "Opened local store");
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            visits: RwLock::new(visits),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(LocalData::default()),
            visits: RwLock::new(Vec::new()),
        }
    }

    async fn persist(path: &Path, data: &LocalData) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(data)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Apply `f` to the document and write it out.
    ///
    /// `f` must return any error before it changes anything; an error from
    /// `f` leaves the document as it found it and nothing is written.
    async fn mutate<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut LocalData) -> Result<T, StoreError> + Send,
    {
        let mut guard = self.data.write().await;
        let out = f(&mut *guard)?;
        let Some(path) = &self.path else {
            return Ok(out);
        };
        if let Err(e) = Self::persist(path, &*guard).await {
            match load_document(path).await {
                Ok(committed) => *guard = committed,
                Err(reload) => {
                    tracing::error!(error = %reload, "Local store rollback failed; memory is ahead of disk");
                }
            }
            return Err(e);
        }
        Ok(out)
    }

    async fn append_visit(path: &Path, visit: &Visit) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_vec(visit)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Brands
// ---------------------------------------------------------------------------

#[async_trait]
impl BrandStore for LocalStore {
    async fn list_brands(&self) -> Result<Vec<BrandWithCount>, StoreError> {
        Ok(self.data.read().await.brands_with_counts())
    }

    async fn find_brand(&self, id: DbId) -> Result<Option<Brand>, StoreError> {
        Ok(self.data.read().await.brands.iter().find(|b| b.id == id).cloned())
    }

    async fn create_brand(&self, input: &CreateBrand) -> Result<Brand, StoreError> {
        self.mutate(|data| {
            let now = Utc::now();
            let sort_order = data.brands.iter().map(|b| b.sort_order + 1).max().unwrap_or(0);
            let brand = Brand {
                id: data.next_id(),
                name: input.name.clone(),
                logo: input.logo.clone(),
                sort_order,
                created_at: now,
                updated_at: now,
            };
            data.brands.push(brand.clone());
            Ok(brand)
        })
        .await
    }

    async fn update_brand(
        &self,
        id: DbId,
        input: &UpdateBrand,
    ) -> Result<Option<Brand>, StoreError> {
        self.mutate(|data| {
            let Some(brand) = data.brands.iter_mut().find(|b| b.id == id) else {
                return Ok(None);
            };
            if let Some(name) = &input.name {
                brand.name = name.clone();
            }
            if let Some(logo) = &input.logo {
                brand.logo = logo.clone();
            }
            brand.updated_at = Utc::now();
            Ok(Some(brand.clone()))
        })
        .await
    }

    async fn delete_brand(&self, id: DbId) -> Result<Option<u64>, StoreError> {
        self.mutate(|data| {
            let Some(index) = data.brands.iter().position(|b| b.id == id) else {
                return Ok(None);
            };
            let now = Utc::now();
            let mut reassigned = 0;
            for plan in data.plans.iter_mut().filter(|p| p.brand_id == Some(id)) {
                plan.brand_id = None;
                plan.updated_at = now;
                reassigned += 1;
            }
            data.brands.remove(index);
            Ok(Some(reassigned))
        })
        .await
    }

    async fn reorder_brands(&self, ids: &[DbId]) -> Result<Vec<BrandWithCount>, StoreError> {
        self.mutate(|data| {
            let mut order: Vec<DbId> = Vec::with_capacity(data.brands.len());
            for id in ids {
                if !order.contains(id) && data.brands.iter().any(|b| b.id == *id) {
                    order.push(*id);
                }
            }
            let rest: Vec<DbId> = data
                .brands_with_counts()
                .into_iter()
                .map(|b| b.brand.id)
                .filter(|id| !order.contains(id))
                .collect();
            order.extend(rest);

            let now = Utc::now();
            for (index, id) in order.iter().enumerate() {
                if let Some(brand) = data.brands.iter_mut().find(|b| b.id == *id) {
                    if brand.sort_order != index as i32 {
                        brand.sort_order = index as i32;
                        brand.updated_at = now;
                    }
                }
            }
            Ok(data.brands_with_counts())
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[async_trait]
impl PlanStore for LocalStore {
    async fn list_plans(&self, filter: PlanFilter) -> Result<Vec<Plan>, StoreError> {
        let data = self.data.read().await;
        let mut plans: Vec<Plan> = data
            .plans
            .iter()
            .filter(|p| match filter {
                PlanFilter::All => true,
                PlanFilter::Brand(id) => p.brand_id == Some(id),
                PlanFilter::Unassigned => p.brand_id.is_none(),
            })
            .cloned()
            .map(Plan::upgraded)
            .collect();
        plans.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(plans)
    }

    async fn find_plan(&self, id: DbId) -> Result<Option<Plan>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .plans
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(Plan::upgraded))
    }

    async fn create_plan(&self, input: &CreatePlan) -> Result<Plan, StoreError> {
        self.mutate(|data| {
            let now = Utc::now();
            let plan = Plan {
                id: data.next_id(),
                brand_id: input.brand_id,
                title: input.title.clone(),
                items: Vec::new(),
                row_heights: Default::default(),
                row_order: Default::default(),
                metadata: input.metadata.clone(),
                legacy_sections: Vec::new(),
                is_completed: false,
                created_by: input.created_by,
                created_at: now,
                updated_at: now,
            };
            data.plans.push(plan.clone());
            Ok(plan)
        })
        .await
    }

    async fn update_plan(&self, id: DbId, input: &UpdatePlan) -> Result<Option<Plan>, StoreError> {
        self.mutate(|data| {
            let Some(plan) = data.plan_mut(id) else {
                return Ok(None);
            };
            if let Some(title) = &input.title {
                plan.title = title.clone();
            }
            if let Some(brand_id) = input.brand_id {
                plan.brand_id = brand_id;
            }
            if let Some(metadata) = &input.metadata {
                plan.metadata = metadata.clone();
            }
            if let Some(completed) = input.is_completed {
                plan.is_completed = completed;
            }
            plan.updated_at = Utc::now();
            Ok(Some(plan.clone().upgraded()))
        })
        .await
    }

    async fn save_plan_document(
        &self,
        id: DbId,
        document: &PlanDocument,
    ) -> Result<Option<Plan>, StoreError> {
        self.mutate(|data| {
            let Some(plan) = data.plan_mut(id) else {
                return Ok(None);
            };
            plan.title = document.title.clone();
            plan.brand_id = document.brand_id;
            plan.items = document.items.clone();
            plan.row_heights = document.row_heights.clone();
            plan.row_order = document.row_order.clone();
            plan.metadata = document.metadata.clone();
            plan.legacy_sections.clear();
            plan.updated_at = Utc::now();
            Ok(Some(plan.clone()))
        })
        .await
    }

    async fn delete_plan(&self, id: DbId) -> Result<bool, StoreError> {
        self.mutate(|data| {
            let before = data.plans.len();
            data.plans.retain(|p| p.id != id);
            Ok(data.plans.len() < before)
        })
        .await
    }

    async fn set_plan_completed(&self, id: DbId, completed: bool) -> Result<bool, StoreError> {
        self.mutate(|data| {
            let Some(plan) = data.plan_mut(id) else {
                return Ok(false);
            };
            plan.is_completed = completed;
            plan.updated_at = Utc::now();
            Ok(true)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[async_trait]
impl AccountStore for LocalStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        let email = normalize_email(&input.email);
        self.mutate(|data| {
            if data.users.iter().any(|u| u.email == email) {
                return Err(StoreError::Conflict(format!("email {email} is already registered")));
            }
            let now = Utc::now();
            let user = User {
                id: data.next_id(),
                email,
                password_hash: input.password_hash.clone(),
                is_active: true,
                last_login_at: None,
                failed_login_count: 0,
                locked_until: None,
                created_at: now,
                updated_at: now,
            };
            data.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn find_user(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.data.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .data
            .read()
            .await
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.data.read().await.users.clone();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn increment_failed_login(&self, id: DbId) -> Result<i32, StoreError> {
        self.mutate(|data| {
            let user = data
                .user_mut(id)
                .ok_or(StoreError::NotFound { entity: "User", id })?;
            user.failed_login_count += 1;
            user.updated_at = Utc::now();
            Ok(user.failed_login_count)
        })
        .await
    }

    async fn lock_account(&self, id: DbId, until: Timestamp) -> Result<(), StoreError> {
        self.mutate(|data| {
            if let Some(user) = data.user_mut(id) {
                user.locked_until = Some(until);
                user.updated_at = Utc::now();
            }
            Ok(())
        })
        .await
    }

    async fn record_successful_login(&self, id: DbId) -> Result<(), StoreError> {
        self.mutate(|data| {
            if let Some(user) = data.user_mut(id) {
                let now = Utc::now();
                user.failed_login_count = 0;
                user.locked_until = None;
                user.last_login_at = Some(now);
                user.updated_at = now;
            }
            Ok(())
        })
        .await
    }

    async fn create_session(&self, input: &CreateSession) -> Result<UserSession, StoreError> {
        self.mutate(|data| {
            let session = UserSession {
                id: data.next_id(),
                user_id: input.user_id,
                refresh_token_hash: input.refresh_token_hash.clone(),
                expires_at: input.expires_at,
                is_revoked: false,
                created_at: Utc::now(),
            };
            data.sessions.push(session.clone());
            Ok(session)
        })
        .await
    }

    async fn find_active_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserSession>, StoreError> {
        let now = Utc::now();
        Ok(self
            .data
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.refresh_token_hash == token_hash && !s.is_revoked && s.expires_at > now)
            .cloned())
    }

    async fn rotate_session(
        &self,
        old_id: DbId,
        next: &CreateSession,
    ) -> Result<Option<UserSession>, StoreError> {
        self.mutate(|data| {
            let now = Utc::now();
            let Some(old) = data
                .sessions
                .iter_mut()
                .find(|s| s.id == old_id && !s.is_revoked && s.expires_at > now)
            else {
                return Ok(None);
            };
            old.is_revoked = true;

            let session = UserSession {
                id: data.next_id(),
                user_id: next.user_id,
                refresh_token_hash: next.refresh_token_hash.clone(),
                expires_at: next.expires_at,
                is_revoked: false,
                created_at: now,
            };
            data.sessions.push(session.clone());
            Ok(Some(session))
        })
        .await
    }

    async fn revoke_all_sessions(&self, user_id: DbId) -> Result<u64, StoreError> {
        self.mutate(|data| {
            let mut revoked = 0;
            for session in data
                .sessions
                .iter_mut()
                .filter(|s| s.user_id == user_id && !s.is_revoked)
            {
                session.is_revoked = true;
                revoked += 1;
            }
            Ok(revoked)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[async_trait]
impl PermissionStore for LocalStore {
    async fn find_permission(&self, user_id: DbId) -> Result<Option<UserPermission>, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .permissions
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn create_permission(
        &self,
        input: &CreatePermission,
    ) -> Result<UserPermission, StoreError> {
        self.mutate(|data| {
            if let Some(existing) = data.permissions.iter().find(|p| p.user_id == input.user_id) {
                return Ok(existing.clone());
            }
            let now = Utc::now();
            let record = UserPermission {
                user_id: input.user_id,
                email: input.email.clone(),
                can_create_plans: input.flags.can_create_plans,
                can_view_projects: input.flags.can_view_projects,
                allowed_brand_ids: input.flags.allowed_brand_ids.clone(),
                created_at: now,
                updated_at: now,
            };
            data.permissions.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn update_permission(
        &self,
        user_id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<UserPermission>, StoreError> {
        self.mutate(|data| {
            let Some(record) = data.permissions.iter_mut().find(|p| p.user_id == user_id) else {
                return Ok(None);
            };
            if let Some(v) = input.can_create_plans {
                record.can_create_plans = v;
            }
            if let Some(v) = input.can_view_projects {
                record.can_view_projects = v;
            }
            if let Some(ids) = &input.allowed_brand_ids {
                record.allowed_brand_ids = ids.clone();
            }
            record.updated_at = Utc::now();
            Ok(Some(record.clone()))
        })
        .await
    }

    async fn list_permissions(&self) -> Result<Vec<UserPermission>, StoreError> {
        let mut records = self.data.read().await.permissions.clone();
        records.sort_by_key(|p| p.user_id);
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[async_trait]
impl AnalyticsStore for LocalStore {
    async fn record_visit(&self, input: &CreateVisit) -> Result<Visit, StoreError> {
        let mut visits = self.visits.write().await;
        let visit = Visit {
            id: visits.last().map_or(1, |v| v.id + 1),
            visitor_id: input.visitor_id.clone(),
            user_email: input.user_email.clone(),
            page: input.page.clone(),
            visited_at: Utc::now(),
        };
        if let Some(path) = &self.path {
            Self::append_visit(&visit_log_path(path), &visit).await?;
        }
        visits.push(visit.clone());
        Ok(visit)
    }

    async fn list_visits(&self, limit: i64, offset: i64) -> Result<Vec<Visit>, StoreError> {
        let visits = self.visits.read().await;
        Ok(visits
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn all_visits(&self) -> Result<Vec<Visit>, StoreError> {
        Ok(self.visits.read().await.clone())
    }

    async fn find_override(&self, user_id: DbId) -> Result<Option<AccessOverride>, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .overrides
            .iter()
            .find(|o| o.user_id == user_id)
            .cloned())
    }

    async fn upsert_override(
        &self,
        user_id: DbId,
        input: &UpsertAccessOverride,
    ) -> Result<AccessOverride, StoreError> {
        self.mutate(|data| {
            let record = AccessOverride {
                user_id,
                email: input.email.clone(),
                can_create_plans: input.can_create_plans,
                can_view_projects: input.can_view_projects,
                note: input.note.clone(),
                updated_at: Utc::now(),
            };
            data.overrides.retain(|o| o.user_id != user_id);
            data.overrides.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn delete_override(&self, user_id: DbId) -> Result<bool, StoreError> {
        self.mutate(|data| {
            let before = data.overrides.len();
            data.overrides.retain(|o| o.user_id != user_id);
            Ok(data.overrides.len() < before)
        })
        .await
    }

    async fn list_overrides(&self) -> Result<Vec<AccessOverride>, StoreError> {
        let mut records = self.data.read().await.overrides.clone();
        records.sort_by_key(|o| o.user_id);
        Ok(records)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        let _guard = self.data.read().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
