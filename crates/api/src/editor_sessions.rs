//! Registry of open storyboard editors.
//!
//! Each session owns one [`StoryboardEditor`] for one user. Sessions live in
//! memory only; a restart drops unsaved work, the same as closing the
//! browser tab would. Each session sits behind its own mutex so a save can
//! hold it across the store write without blocking other sessions.
//!
//! Sessions are bounded two ways. A user may hold at most
//! [`EditorLimits::max_per_user`] sessions in total and
//! [`EditorLimits::max_per_plan`] on any one plan; opening past either cap
//! first evicts that user's least recently used session without unsaved
//! changes. Sessions untouched for [`EditorLimits::idle_ttl`] are dropped
//! by [`EditorSessions::sweep_idle`], which the background sweeper runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use storyplan_core::editor::StoryboardEditor;
use storyplan_core::error::CoreError;
use storyplan_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, RwLock};

/// Default idle lifetime of an editor session, in minutes.
pub const DEFAULT_IDLE_TTL_MINS: i64 = 120;

/// Default number of sessions one user may hold open.
pub const DEFAULT_MAX_PER_USER: usize = 8;

/// Sessions one user may hold on the same plan (one per browser tab).
pub const DEFAULT_MAX_PER_PLAN: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct EditorLimits {
    pub idle_ttl: chrono::Duration,
    pub max_per_user: usize,
    pub max_per_plan: usize,
}

impl Default for EditorLimits {
    fn default() -> Self {
        Self {
            idle_ttl: chrono::Duration::minutes(DEFAULT_IDLE_TTL_MINS),
            max_per_user: DEFAULT_MAX_PER_USER,
            max_per_plan: DEFAULT_MAX_PER_PLAN,
        }
    }
}

#[derive(Debug)]
pub struct EditorSession {
    pub user_id: DbId,
    pub editor: StoryboardEditor,
    /// Last time the owner reached this session.
    pub last_touched: Timestamp,
}

pub type SharedSession = Arc<Mutex<EditorSession>>;

/// One of a user's sessions, as seen when deciding what to evict.
struct Held {
    id: DbId,
    plan_id: DbId,
    last_touched: Timestamp,
    dirty: bool,
}

/// The least recently used clean session among `held`.
fn evictable<'a>(held: impl Iterator<Item = &'a Held>) -> Option<DbId> {
    held.filter(|h| !h.dirty)
        .min_by_key(|h| h.last_touched)
        .map(|h| h.id)
}

pub struct EditorSessions {
    limits: EditorLimits,
    next_id: AtomicI64,
    sessions: RwLock<HashMap<DbId, SharedSession>>,
}

impl EditorSessions {
    pub fn new(limits: EditorLimits) -> Self {
        Self {
            limits,
            next_id: AtomicI64::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn limits(&self) -> EditorLimits {
        self.limits
    }

    /// Register an editor and return its session id.
    ///
    /// Fails with `Conflict` when the user is at a cap and every session
    /// that would have to go still has unsaved changes.
    pub async fn open(&self, user_id: DbId, editor: StoryboardEditor) -> Result<DbId, CoreError> {
        let plan_id = editor.plan_id();
        let mut sessions = self.sessions.write().await;

        let mut held = Vec::new();
        for (id, session) in sessions.iter() {
            let guard = session.lock().await;
            if guard.user_id == user_id {
                held.push(Held {
                    id: *id,
                    plan_id: guard.editor.plan_id(),
                    last_touched: guard.last_touched,
                    dirty: guard.editor.has_unsaved_changes(),
                });
            }
        }

        let on_plan = held.iter().filter(|h| h.plan_id == plan_id).count();
        let victim = if on_plan >= self.limits.max_per_plan {
            Some(evictable(held.iter().filter(|h| h.plan_id == plan_id)))
        } else if held.len() >= self.limits.max_per_user {
            Some(evictable(held.iter()))
        } else {
            None
        };
        match victim {
            Some(Some(victim)) => {
                sessions.remove(&victim);
                tracing::debug!(session_id = victim, user_id, "Evicted editor session");
            }
            Some(None) => {
                return Err(CoreError::Conflict(
                    "Too many open editors with unsaved changes; save or close one first".into(),
                ));
            }
            None => {}
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = EditorSession {
            user_id,
            editor,
            last_touched: Utc::now(),
        };
        sessions.insert(id, Arc::new(Mutex::new(session)));
        Ok(id)
    }

    /// The session `id`, if it exists and belongs to `user_id`. Reaching a
    /// session counts as activity.
    pub async fn get(&self, id: DbId, user_id: DbId) -> Option<SharedSession> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        {
            let mut guard = session.lock().await;
            if guard.user_id != user_id {
                return None;
            }
            guard.last_touched = Utc::now();
        }
        Some(session)
    }

    /// Close session `id` if `user_id` owns it.
    pub async fn close(&self, id: DbId, user_id: DbId) -> bool {
        if self.get(id, user_id).await.is_none() {
            return false;
        }
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drop every session editing `plan_id`. Returns how many were closed.
    pub async fn close_plan(&self, plan_id: DbId) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut doomed = Vec::new();
        for (id, session) in sessions.iter() {
            if session.lock().await.editor.plan_id() == plan_id {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            sessions.remove(id);
        }
        doomed.len()
    }

    /// Drop every session owned by `user_id`.
    pub async fn close_user(&self, user_id: DbId) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut doomed = Vec::new();
        for (id, session) in sessions.iter() {
            if session.lock().await.user_id == user_id {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            sessions.remove(id);
        }
        doomed.len()
    }

    /// Unassign the deleted brand `brand_id` in every open editor. Returns
    /// how many sessions pointed at it.
    pub async fn forget_brand(&self, brand_id: DbId) -> usize {
        let sessions = self.sessions.read().await;
        let mut touched = 0;
        for session in sessions.values() {
            if session.lock().await.editor.forget_brand(brand_id) {
                touched += 1;
            }
        }
        touched
    }

    /// Drop sessions untouched since `now - idle_ttl`. A session whose lock
    /// is held is in use and stays. Returns how many were dropped.
    pub async fn sweep_idle(&self, now: Timestamp) -> usize {
        let cutoff = now - self.limits.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let mut doomed = Vec::new();
        let mut unsaved = 0;
        for (id, session) in sessions.iter() {
            let Ok(guard) = session.try_lock() else {
                continue;
            };
            if guard.last_touched < cutoff {
                doomed.push(*id);
                if guard.editor.has_unsaved_changes() {
                    unsaved += 1;
                }
            }
        }
        for id in &doomed {
            sessions.remove(id);
        }
        if unsaved > 0 {
            tracing::warn!(unsaved, "Dropped idle editor sessions with unsaved changes");
        }
        doomed.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for EditorSessions {
    fn default() -> Self {
        Self::new(EditorLimits::default())
    }
}
