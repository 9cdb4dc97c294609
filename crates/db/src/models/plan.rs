//! Plan (storyboard) entity model and DTOs.
//!
//! The storyboard content lives in JSONB columns. [`PlanRow`] is the raw
//! row; [`Plan`] is the unwrapped entity every store hands out.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use storyplan_core::search::Searchable;
use storyplan_core::storyboard::{
    LegacySection, PlanDocument, PlanMetadata, RowHeights, RowOrder, StoryboardItem,
};
use storyplan_core::types::{DbId, Timestamp};

use super::double_option;

/// A raw row from the `plans` table.
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: DbId,
    pub brand_id: Option<DbId>,
    pub title: String,
    pub items: Json<Vec<StoryboardItem>>,
    pub row_heights: Json<RowHeights>,
    pub row_order: Json<RowOrder>,
    pub metadata: Json<PlanMetadata>,
    pub legacy_sections: Json<Vec<LegacySection>>,
    pub is_completed: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: DbId,
    pub brand_id: Option<DbId>,
    pub title: String,
    #[serde(default)]
    pub items: Vec<StoryboardItem>,
    #[serde(default)]
    pub row_heights: RowHeights,
    #[serde(default)]
    pub row_order: RowOrder,
    #[serde(default)]
    pub metadata: PlanMetadata,
    /// Pre-storyboard content. Cleared by the first document save.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_sections: Vec<LegacySection>,
    pub is_completed: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Plan {
            id: row.id,
            brand_id: row.brand_id,
            title: row.title,
            items: row.items.0,
            row_heights: row.row_heights.0,
            row_order: row.row_order.0,
            metadata: row.metadata.0,
            legacy_sections: row.legacy_sections.0,
            is_completed: row.is_completed,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .upgraded()
    }
}

impl Plan {
    /// Fill an item-less plan from its legacy sections. The stored sections
    /// are left alone until the plan is saved in the new shape.
    pub fn upgraded(mut self) -> Self {
        let mut doc = self.document_unchecked();
        if doc.upgrade_legacy(&self.legacy_sections) {
            self.items = doc.items;
        }
        self
    }

    fn document_unchecked(&self) -> PlanDocument {
        PlanDocument {
            title: self.title.clone(),
            brand_id: self.brand_id,
            items: self.items.clone(),
            row_heights: self.row_heights.clone(),
            row_order: self.row_order.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// The editable part of the plan.
    pub fn document(&self) -> PlanDocument {
        let mut doc = self.document_unchecked();
        doc.renumber();
        doc
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            id: self.id,
            brand_id: self.brand_id,
            title: self.title.clone(),
            metadata: self.metadata.clone(),
            item_count: self.items.len(),
            is_completed: self.is_completed,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// List-view projection of a plan, without the storyboard payload.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub id: DbId,
    pub brand_id: Option<DbId>,
    pub title: String,
    pub metadata: PlanMetadata,
    pub item_count: usize,
    pub is_completed: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Which plans a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFilter {
    All,
    Brand(DbId),
    Unassigned,
}

/// DTO for creating a new plan. The storyboard starts empty.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlan {
    pub title: String,
    pub brand_id: Option<DbId>,
    #[serde(default)]
    pub metadata: PlanMetadata,
    /// Set by the server from the signed-in user.
    #[serde(skip)]
    pub created_by: Option<DbId>,
}

/// DTO for updating plan-level fields. `brand_id: null` moves the plan to
/// the unassigned group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlan {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand_id: Option<Option<DbId>>,
    pub metadata: Option<PlanMetadata>,
    pub is_completed: Option<bool>,
}

impl Searchable for Plan {
    fn haystacks(&self) -> Vec<&str> {
        let mut out = vec![self.title.as_str()];
        out.extend(self.metadata.fields().into_iter().map(|(_, v)| v));
        out
    }

    fn sort_title(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn plan_with_sections(sections: Vec<LegacySection>) -> Plan {
        Plan {
            id: 1,
            brand_id: None,
            title: "Old plan".into(),
            items: Vec::new(),
            row_heights: RowHeights::default(),
            row_order: RowOrder::default(),
            metadata: PlanMetadata::default(),
            legacy_sections: sections,
            is_completed: false,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn legacy_sections_become_items_on_load() {
        let plan = plan_with_sections(vec![LegacySection {
            title: "Intro".into(),
            content: "Say hi".into(),
            image: None,
        }])
        .upgraded();
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].timeline, "Intro");
        assert_eq!(plan.document().items[0].narration, "Say hi");
    }

    #[test]
    fn search_covers_metadata() {
        let mut plan = plan_with_sections(Vec::new());
        plan.metadata.platform = "YouTube Shorts".into();
        assert!(storyplan_core::search::matches_query(&plan, "shorts"));
    }
}
