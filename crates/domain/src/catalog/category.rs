use chrono::{DateTime, Utc};
use common::CategoryId;
use serde::{Deserialize, Serialize};

use super::{optional_text, required_text, resolve_slug};
use crate::error::ValidationError;

/// A product category as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: None,
            is_active: true,
            sort_order: 0,
        }
    }

    /// Validates the draft and fills in the slug.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = required_text("name", &self.name, 100)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;

        Ok(Self {
            name,
            slug: Some(slug),
            description: optional_text(self.description),
            is_active: self.is_active,
            sort_order: self.sort_order,
        })
    }

    /// Returns the slug of a validated draft.
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}
