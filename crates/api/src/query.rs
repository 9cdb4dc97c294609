//! Shared query parameter types for API handlers.

use serde::Deserialize;
use storyplan_core::export::ExportFormat;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the handler via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `?format=xlsx|txt` on export endpoints. Defaults to `xlsx`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
}
