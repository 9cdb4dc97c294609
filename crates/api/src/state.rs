use std::sync::Arc;

use storyplan_db::store::Store;

use crate::auth::permissions::PermissionCache;
use crate::config::ServerConfig;
use crate::editor_sessions::EditorSessions;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Storage backend chosen at startup.
    pub store: Arc<dyn Store>,
    /// Server configuration (admin allow-list, JWT settings).
    pub config: Arc<ServerConfig>,
    /// Memoized effective permissions per user.
    pub permissions: Arc<PermissionCache>,
    /// Open storyboard editors, keyed by session id.
    pub editors: Arc<EditorSessions>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: ServerConfig) -> Self {
        let editors = EditorSessions::new(config.editor_limits);
        Self {
            store,
            config: Arc::new(config),
            permissions: Arc::new(PermissionCache::new()),
            editors: Arc::new(editors),
        }
    }

    /// Whether `email` is on the admin allow-list.
    pub fn is_admin_email(&self, email: &str) -> bool {
        storyplan_core::roles::is_admin_email(email, &self.config.admin_emails)
    }
}
