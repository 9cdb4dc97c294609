//! List-view search, sorting and pagination helpers.
//!
//! Plan and brand collections are small, so search runs over the loaded
//! records instead of in SQL. Any record type opts in by implementing
//! [`Searchable`].

use serde::Deserialize;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default number of rows per page for paginated listings.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Maximum number of rows per page for paginated listings.
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    UpdatedDesc,
    CreatedDesc,
    TitleAsc,
}

/// A record that list views can search and sort.
pub trait Searchable {
    /// Text fields matched against the query.
    fn haystacks(&self) -> Vec<&str>;
    /// Field used by [`SortOrder::TitleAsc`].
    fn sort_title(&self) -> &str;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
}

/// Trim and lowercase a query. Blank queries become `None`.
pub fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty())
}

/// Case-insensitive substring match. Every whitespace-separated term must
/// appear in at least one haystack.
pub fn matches_query<S: Searchable + ?Sized>(record: &S, normalized: &str) -> bool {
    let haystacks: Vec<String> = record.haystacks().iter().map(|h| h.to_lowercase()).collect();
    normalized
        .split_whitespace()
        .all(|term| haystacks.iter().any(|h| h.contains(term)))
}

/// Filter `records` by `query` and sort them.
pub fn filter_and_sort<T: Searchable>(
    records: Vec<T>,
    query: Option<&str>,
    sort: SortOrder,
) -> Vec<T> {
    let mut out: Vec<T> = match normalize_query(query) {
        Some(q) => records.into_iter().filter(|r| matches_query(r, &q)).collect(),
        None => records,
    };
    match sort {
        SortOrder::UpdatedDesc => out.sort_by(|a, b| b.updated_at().cmp(&a.updated_at())),
        SortOrder::CreatedDesc => out.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
        SortOrder::TitleAsc => out.sort_by(|a, b| {
            a.sort_title()
                .to_lowercase()
                .cmp(&b.sort_title().to_lowercase())
        }),
    }
    out
}
