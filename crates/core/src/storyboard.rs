//! Storyboard document model.
//!
//! A plan's editable content is a [`PlanDocument`]: an ordered list of
//! [`StoryboardItem`] columns rendered against a fixed set of [`RowKind`]
//! rows. The row display order ([`RowOrder`]) is always a permutation of
//! every row kind; the only ways to build one are validating constructors
//! and permutation-preserving moves.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Number of attachment slots on every storyboard item.
pub const FILE_SLOTS: usize = 3;

/// Row height used when a plan has no override for a row (pixels).
pub const DEFAULT_ROW_HEIGHT: u32 = 120;

/// Smallest allowed row height override (pixels).
pub const MIN_ROW_HEIGHT: u32 = 40;

/// Largest allowed row height override (pixels).
pub const MAX_ROW_HEIGHT: u32 = 800;

/// Maximum number of storyboard items in one plan.
pub const MAX_ITEMS_PER_PLAN: usize = 200;

/// Maximum length of a plan title.
pub const MAX_TITLE_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Row kinds
// ---------------------------------------------------------------------------

/// One row of the storyboard grid. Every item has a cell in every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Image,
    Timeline,
    Effect,
    Narration,
    Note,
    Files,
}

impl RowKind {
    /// All row kinds in their default display order.
    pub const ALL: [RowKind; 6] = [
        RowKind::Image,
        RowKind::Timeline,
        RowKind::Effect,
        RowKind::Narration,
        RowKind::Note,
        RowKind::Files,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Timeline => "timeline",
            Self::Effect => "effect",
            Self::Narration => "narration",
            Self::Note => "note",
            Self::Files => "files",
        }
    }

    /// Column header used by exports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Timeline => "Timeline",
            Self::Effect => "Effect",
            Self::Narration => "Narration",
            Self::Note => "Note",
            Self::Files => "Files",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RowKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown row kind '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Row order
// ---------------------------------------------------------------------------

/// Display order of the storyboard rows. Always a permutation of [`RowKind::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowOrder(Vec<RowKind>);

impl Default for RowOrder {
    fn default() -> Self {
        Self(RowKind::ALL.to_vec())
    }
}

impl RowOrder {
    /// Build an order from a caller-supplied list, rejecting anything that is
    /// not a permutation of every row kind.
    pub fn try_from_vec(kinds: Vec<RowKind>) -> Result<Self, CoreError> {
        if kinds.len() != RowKind::ALL.len() {
            return Err(CoreError::Validation(format!(
                "row order must list all {} rows exactly once, got {}",
                RowKind::ALL.len(),
                kinds.len()
            )));
        }
        for kind in RowKind::ALL {
            if !kinds.contains(&kind) {
                return Err(CoreError::Validation(format!(
                    "row order is missing '{kind}'"
                )));
            }
        }
        Ok(Self(kinds))
    }

    /// Build an order from possibly damaged stored data: duplicates are
    /// dropped and omitted kinds are appended in default order.
    pub fn repaired(kinds: impl IntoIterator<Item = RowKind>) -> Self {
        let mut out: Vec<RowKind> = Vec::with_capacity(RowKind::ALL.len());
        for kind in kinds {
            if !out.contains(&kind) {
                out.push(kind);
            }
        }
        for kind in RowKind::ALL {
            if !out.contains(&kind) {
                out.push(kind);
            }
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[RowKind] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = RowKind> + '_ {
        self.0.iter().copied()
    }

    pub fn position_of(&self, kind: RowKind) -> usize {
        // A permutation always contains every kind.
        self.0.iter().position(|k| *k == kind).unwrap_or(0)
    }

    /// Move the row at `from` to index `to`, shifting the rows in between.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        let len = self.0.len();
        if from >= len || to >= len {
            return Err(CoreError::Validation(format!(
                "row index out of range (from {from}, to {to}, rows {len})"
            )));
        }
        let kind = self.0.remove(from);
        self.0.insert(to, kind);
        Ok(())
    }

    /// Move a row identified by kind to index `to`.
    pub fn move_kind(&mut self, kind: RowKind, to: usize) -> Result<(), CoreError> {
        let from = self.position_of(kind);
        self.move_row(from, to)
    }
}

impl<'de> Deserialize<'de> for RowOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::repaired(raw.iter().filter_map(|s| s.parse().ok())))
    }
}

// ---------------------------------------------------------------------------
// Row heights
// ---------------------------------------------------------------------------

/// Per-row display height overrides. Rows without an entry use
/// [`DEFAULT_ROW_HEIGHT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowHeights(BTreeMap<RowKind, u32>);

impl RowHeights {
    pub fn get(&self, kind: RowKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(DEFAULT_ROW_HEIGHT)
    }

    /// Set a row's height. Setting the default height removes the override so
    /// that equivalent documents compare equal.
    pub fn set(&mut self, kind: RowKind, height: u32) -> Result<(), CoreError> {
        if !(MIN_ROW_HEIGHT..=MAX_ROW_HEIGHT).contains(&height) {
            return Err(CoreError::Validation(format!(
                "row height must be between {MIN_ROW_HEIGHT} and {MAX_ROW_HEIGHT}, got {height}"
            )));
        }
        if height == DEFAULT_ROW_HEIGHT {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, height);
        }
        Ok(())
    }

    pub fn overrides(&self) -> impl Iterator<Item = (RowKind, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stored heights are repaired rather than rejected: unknown rows and
/// non-numeric values are dropped, out-of-range heights are clamped, and
/// default heights are removed.
impl<'de> Deserialize<'de> for RowHeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut heights = BTreeMap::new();
        for (key, value) in raw {
            let (Ok(kind), Some(height)) = (key.parse::<RowKind>(), value.as_f64()) else {
                continue;
            };
            let height = height
                .round()
                .clamp(f64::from(MIN_ROW_HEIGHT), f64::from(MAX_ROW_HEIGHT)) as u32;
            if height != DEFAULT_ROW_HEIGHT {
                heights.insert(kind, height);
            }
        }
        Ok(Self(heights))
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A small file attached to one storyboard item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    pub name: String,
    /// Base64 payload or `data:` URL.
    pub data: String,
    /// Decoded size in bytes.
    pub size: u64,
    pub uploaded_at: Timestamp,
}

/// One scene/column of a storyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardItem {
    pub id: String,
    /// Index of this item in its plan. Kept in sync by [`PlanDocument::renumber`].
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub narration: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub files: [Option<AttachedFile>; FILE_SLOTS],
}

impl StoryboardItem {
    /// A blank item with a fresh id.
    pub fn new(position: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            position,
            image: None,
            timeline: String::new(),
            effect: String::new(),
            narration: String::new(),
            note: String::new(),
            files: Default::default(),
        }
    }

    /// Text content of a text row. `None` for the image and files rows.
    pub fn text(&self, kind: RowKind) -> Option<&str> {
        match kind {
            RowKind::Timeline => Some(&self.timeline),
            RowKind::Effect => Some(&self.effect),
            RowKind::Narration => Some(&self.narration),
            RowKind::Note => Some(&self.note),
            RowKind::Image | RowKind::Files => None,
        }
    }

    pub fn attached_files(&self) -> impl Iterator<Item = &AttachedFile> {
        self.files.iter().flatten()
    }
}

// ---------------------------------------------------------------------------
// Plan metadata and document
// ---------------------------------------------------------------------------

/// Free-text fields shown above the storyboard grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub memo: String,
}

impl PlanMetadata {
    /// `(label, value)` pairs in display order.
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("Concept", &self.concept),
            ("Platform", &self.platform),
            ("Duration", &self.duration),
            ("Memo", &self.memo),
        ]
    }
}

/// The editable part of a plan. Equality is structural, which is what the
/// editor uses to detect unsaved changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub title: String,
    pub brand_id: Option<DbId>,
    #[serde(default)]
    pub items: Vec<StoryboardItem>,
    #[serde(default)]
    pub row_heights: RowHeights,
    #[serde(default)]
    pub row_order: RowOrder,
    #[serde(default)]
    pub metadata: PlanMetadata,
}

impl PlanDocument {
    pub fn new(title: impl Into<String>, brand_id: Option<DbId>) -> Self {
        Self {
            title: title.into(),
            brand_id,
            ..Self::default()
        }
    }

    /// Reset every item's `position` to its index.
    pub fn renumber(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.position = i as u32;
        }
    }

    pub fn item_index(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Replace the item list with the upgraded form of legacy sections when
    /// the document has no items of its own. Returns `true` if it did.
    pub fn upgrade_legacy(&mut self, sections: &[LegacySection]) -> bool {
        if !self.items.is_empty() || sections.is_empty() {
            return false;
        }
        self.items = sections
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_item(i as u32))
            .collect();
        true
    }
}

/// Validate a plan title.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Legacy sections
// ---------------------------------------------------------------------------

/// Older plans stored free-form sections instead of storyboard items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl LegacySection {
    /// The item for the section at `position`. Its id depends only on the
    /// position, so a legacy plan read twice has the same item ids.
    fn to_item(&self, position: u32) -> StoryboardItem {
        StoryboardItem {
            id: format!("legacy-{position}"),
            timeline: self.title.clone(),
            narration: self.content.clone(),
            image: self.image.clone(),
            ..StoryboardItem::new(position)
        }
    }
}
