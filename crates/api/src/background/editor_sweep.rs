//! Periodic eviction of idle editor sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::editor_sessions::EditorSessions;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a task that drops editor sessions idle past their configured TTL.
///
/// Runs until aborted through the returned `JoinHandle`.
pub fn start_editor_sweep(editors: Arc<EditorSessions>) -> tokio::task::JoinHandle<()> {
    tracing::info!(
        idle_ttl_mins = editors.limits().idle_ttl.num_minutes(),
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Editor sweep started"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);

        loop {
            interval.tick().await;
            let dropped = editors.sweep_idle(Utc::now()).await;
            if dropped > 0 {
                tracing::info!(dropped, "Editor sweep: closed idle sessions");
            } else {
                tracing::debug!("Editor sweep: nothing idle");
            }
        }
    })
}
