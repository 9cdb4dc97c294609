//! Spreadsheet and plain-text exports.
//!
//! Every export is first built as a [`Workbook`] of plain string tables, which
//! is what tests inspect, and then rendered either to `.xlsx` bytes with
//! `rust_xlsxwriter` or to a human-readable text report.

use std::fmt::Write as _;

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, XlsxError};
use serde::Deserialize;

use crate::analytics::{summarize, VisitRecord};
use crate::error::CoreError;
use crate::storyboard::{PlanDocument, RowKind, StoryboardItem};
use crate::types::{DbId, Timestamp};

/// Excel's per-cell string limit.
const MAX_CELL_CHARS: usize = 32_767;

/// Excel's sheet name limit.
const MAX_SHEET_NAME_CHARS: usize = 31;

pub const STORYBOARD_SHEET: &str = "Storyboard";
pub const PLAN_INFO_SHEET: &str = "Plan Info";
pub const USERS_SHEET: &str = "Users";
pub const VISITS_SHEET: &str = "Visits";
pub const VISITS_BY_PAGE_SHEET: &str = "By Page";

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Txt,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Txt => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Txt => "text/plain; charset=utf-8",
        }
    }
}

/// Build a download file name from a free-text stem.
///
/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn export_filename(stem: &str, format: ExportFormat) -> String {
    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = if cleaned.is_empty() { "export".to_string() } else { cleaned };
    format!("{cleaned}.{}", format.extension())
}

// ---------------------------------------------------------------------------
// Table model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Render to `.xlsx` bytes. Header rows are bold.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, CoreError> {
        self.render_xlsx()
            .map_err(|e| CoreError::Internal(format!("spreadsheet export failed: {e}")))
    }

    fn render_xlsx(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = XlsxWorkbook::new();
        let bold = Format::new().set_bold();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sanitize_sheet_name(&sheet.name))?;
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, truncate_cell(header), &bold)?;
            }
            for (row, cells) in sheet.rows.iter().enumerate() {
                for (col, cell) in cells.iter().enumerate() {
                    worksheet.write_string(row as u32 + 1, col as u16, truncate_cell(cell))?;
                }
            }
        }
        workbook.save_to_buffer()
    }
}

/// Make a name acceptable as an Excel sheet name.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

fn truncate_cell(value: &str) -> String {
    value.chars().take(MAX_CELL_CHARS).collect()
}

fn fmt_ts(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Everything a plan export needs besides the document itself.
#[derive(Debug, Clone)]
pub struct PlanExport<'a> {
    pub plan_id: DbId,
    pub document: &'a PlanDocument,
    pub brand_name: Option<&'a str>,
    pub is_completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn cell_for(item: &StoryboardItem, kind: RowKind) -> String {
    match kind {
        RowKind::Image => if item.image.is_some() { "[image]" } else { "" }.to_string(),
        RowKind::Files => item
            .attached_files()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        text => item.text(text).unwrap_or_default().to_string(),
    }
}

/// Storyboard sheet (one row per item, columns in the plan's row order) plus
/// a metadata sheet.
pub fn plan_workbook(plan: &PlanExport<'_>) -> Workbook {
    let doc = plan.document;
    let mut headers = vec!["#".to_string()];
    headers.extend(doc.row_order.iter().map(|k| k.label().to_string()));

    let rows = doc
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut row = vec![(i + 1).to_string()];
            row.extend(doc.row_order.iter().map(|k| cell_for(item, k)));
            row
        })
        .collect();
    let storyboard = Sheet {
        name: STORYBOARD_SHEET.to_string(),
        headers,
        rows,
    };

    let mut info = Sheet::new(PLAN_INFO_SHEET, &["Field", "Value"]);
    info.rows.push(vec!["Plan ID".into(), plan.plan_id.to_string()]);
    info.rows.push(vec!["Title".into(), doc.title.clone()]);
    info.rows.push(vec![
        "Brand".into(),
        plan.brand_name.unwrap_or("Unassigned").to_string(),
    ]);
    for (label, value) in doc.metadata.fields() {
        info.rows.push(vec![label.to_string(), value.to_string()]);
    }
    info.rows.push(vec!["Completed".into(), yes_no(plan.is_completed)]);
    info.rows.push(vec!["Items".into(), doc.items.len().to_string()]);
    info.rows.push(vec!["Created".into(), fmt_ts(plan.created_at)]);
    info.rows.push(vec!["Updated".into(), fmt_ts(plan.updated_at)]);

    Workbook {
        sheets: vec![storyboard, info],
    }
}

pub fn plan_text_report(plan: &PlanExport<'_>) -> String {
    let doc = plan.document;
    let mut out = String::new();
    let _ = writeln!(out, "{}", doc.title);
    let _ = writeln!(out, "{}", "=".repeat(doc.title.chars().count().max(3)));
    let _ = writeln!(out, "Brand: {}", plan.brand_name.unwrap_or("Unassigned"));
    for (label, value) in doc.metadata.fields() {
        if !value.is_empty() {
            let _ = writeln!(out, "{label}: {value}");
        }
    }
    let _ = writeln!(out, "Completed: {}", yes_no(plan.is_completed));
    let _ = writeln!(out, "Updated: {}", fmt_ts(plan.updated_at));

    for (i, item) in doc.items.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Scene {}", i + 1);
        let _ = writeln!(out, "--------");
        for kind in doc.row_order.iter() {
            let value = cell_for(item, kind);
            if !value.is_empty() {
                let _ = writeln!(out, "  {}: {}", kind.label(), value);
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UserExportRow {
    pub id: DbId,
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub can_create_plans: bool,
    pub can_view_projects: bool,
    pub allowed_brand_ids: Vec<DbId>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

fn allowed_brands_cell(ids: &[DbId]) -> String {
    if ids.is_empty() {
        "all".to_string()
    } else {
        ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
    }
}

pub fn users_workbook(users: &[UserExportRow]) -> Workbook {
    let mut sheet = Sheet::new(
        USERS_SHEET,
        &[
            "ID",
            "Email",
            "Admin",
            "Active",
            "Can Create Plans",
            "Can View Projects",
            "Allowed Brands",
            "Last Login",
            "Created",
        ],
    );
    for u in users {
        sheet.rows.push(vec![
            u.id.to_string(),
            u.email.clone(),
            yes_no(u.is_admin),
            yes_no(u.is_active),
            yes_no(u.can_create_plans),
            yes_no(u.can_view_projects),
            allowed_brands_cell(&u.allowed_brand_ids),
            u.last_login_at.map(fmt_ts).unwrap_or_default(),
            fmt_ts(u.created_at),
        ]);
    }
    Workbook { sheets: vec![sheet] }
}

pub fn users_text_report(users: &[UserExportRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Users ({})", users.len());
    let _ = writeln!(out, "==========");
    for u in users {
        let _ = writeln!(
            out,
            "{} <{}> admin={} active={} create={} view={} brands={}",
            u.id,
            u.email,
            yes_no(u.is_admin),
            yes_no(u.is_active),
            yes_no(u.can_create_plans),
            yes_no(u.can_view_projects),
            allowed_brands_cell(&u.allowed_brand_ids),
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Visits
// ---------------------------------------------------------------------------

pub fn visits_workbook(visits: &[VisitRecord]) -> Workbook {
    let mut log = Sheet::new(VISITS_SHEET, &["Visited At", "Visitor", "Email", "Page"]);
    for v in visits {
        log.rows.push(vec![
            fmt_ts(v.visited_at),
            v.visitor_id.clone(),
            v.user_email.clone().unwrap_or_default(),
            v.page.clone(),
        ]);
    }

    let mut by_page = Sheet::new(VISITS_BY_PAGE_SHEET, &["Page", "Visits"]);
    for entry in summarize(visits).by_page {
        by_page.rows.push(vec![entry.key, entry.count.to_string()]);
    }

    Workbook {
        sheets: vec![log, by_page],
    }
}

pub fn visits_text_report(visits: &[VisitRecord]) -> String {
    let summary = summarize(visits);
    let mut out = String::new();
    let _ = writeln!(out, "Visits: {}", summary.total_visits);
    let _ = writeln!(out, "Unique visitors: {}", summary.unique_visitors);
    let _ = writeln!(out);
    let _ = writeln!(out, "By page:");
    for entry in &summary.by_page {
        let _ = writeln!(out, "  {:<30} {}", entry.key, entry.count);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Log:");
    for v in visits {
        let _ = writeln!(
            out,
            "  {}  {}  {}  {}",
            fmt_ts(v.visited_at),
            v.visitor_id,
            v.user_email.as_deref().unwrap_or("-"),
            v.page
        );
    }
    out
}
