use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{new_id, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Many-to-many link between a note and a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTag {
    pub note_id: String,
    pub tag_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Tag {
    pub fn new(data: NewTag, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name: data.name,
            color: data.color,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: TagPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        self.updated_at = now;
    }
}

impl Record for Tag {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl NoteTag {
    pub fn new(note_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            tag_id: tag_id.into(),
        }
    }
}
