use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{new_id, Record};

/// Color classes assigned to a category created without one.
pub const DEFAULT_CATEGORY_COLOR: &str =
    "bg-blue-100 text-blue-800 dark:bg-blue-900 dark:text-blue-300";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Category {
    pub fn new(data: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name: data.name,
            color: data
                .color
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: CategoryPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        self.updated_at = now;
    }
}

impl Record for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
