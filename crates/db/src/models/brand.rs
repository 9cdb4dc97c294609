//! Brand (project folder) entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyplan_core::search::Searchable;
use storyplan_core::types::{DbId, Timestamp};

use super::double_option;

/// A brand row from the `brands` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Brand {
    pub id: DbId,
    pub name: String,
    /// Logo image as a base64 data URL.
    pub logo: Option<String>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A brand with the number of plans filed under it, for list views.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BrandWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub brand: Brand,
    pub plan_count: i64,
}

/// DTO for creating a new brand. New brands go to the end of the list.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBrand {
    pub name: String,
    pub logo: Option<String>,
}

/// DTO for updating a brand. `logo: null` removes the logo.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBrand {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo: Option<Option<String>>,
}

impl Searchable for Brand {
    fn haystacks(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn sort_title(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

impl Searchable for BrandWithCount {
    fn haystacks(&self) -> Vec<&str> {
        self.brand.haystacks()
    }

    fn sort_title(&self) -> &str {
        self.brand.sort_title()
    }

    fn created_at(&self) -> Timestamp {
        self.brand.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.brand.updated_at
    }
}
