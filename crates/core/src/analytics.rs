//! Visit-log aggregation for the admin dashboard.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Maximum length of a page identifier in a visit log entry.
pub const MAX_PAGE_ID_LEN: usize = 200;

/// One page view, as aggregated here. Persistence adds the row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub visitor_id: String,
    pub user_email: Option<String>,
    pub page: String,
    pub visited_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitSummary {
    pub total_visits: u64,
    pub unique_visitors: u64,
    /// Most visited first; ties broken by page name.
    pub by_page: Vec<CountEntry>,
    /// Visits per signed-in email; anonymous visits are not listed.
    pub by_user: Vec<CountEntry>,
    /// Oldest day first.
    pub by_day: Vec<DayCount>,
}

fn ranked(counts: HashMap<String, u64>) -> Vec<CountEntry> {
    let mut out: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry { key, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    out
}

pub fn summarize(visits: &[VisitRecord]) -> VisitSummary {
    let mut visitors: HashSet<&str> = HashSet::new();
    let mut by_page: HashMap<String, u64> = HashMap::new();
    let mut by_user: HashMap<String, u64> = HashMap::new();
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for visit in visits {
        visitors.insert(&visit.visitor_id);
        *by_page.entry(visit.page.clone()).or_default() += 1;
        if let Some(email) = &visit.user_email {
            *by_user.entry(email.clone()).or_default() += 1;
        }
        *by_day.entry(visit.visited_at.date_naive()).or_default() += 1;
    }

    VisitSummary {
        total_visits: visits.len() as u64,
        unique_visitors: visitors.len() as u64,
        by_page: ranked(by_page),
        by_user: ranked(by_user),
        by_day: by_day
            .into_iter()
            .map(|(date, count)| DayCount { date, count })
            .collect(),
    }
}
