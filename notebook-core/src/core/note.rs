use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{new_id, Record};

/// Title given to notes that are loaded or saved without one.
pub const UNTITLED: &str = "Untitled";

/// Whether a note holds a document or acts as a folder for other notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Doc,
    Folder,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Folder => "folder",
        }
    }

    /// Parses a stored value; anything unrecognised is treated as a document.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("folder") => Self::Folder,
            _ => Self::Doc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub kind: NoteKind,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Input for [`NoteStore::create`](crate::NoteStore::create).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub category_id: Option<String>,
    pub kind: NoteKind,
    pub parent_id: Option<String>,
}

/// Partial update for a note. `None` leaves a field untouched; the nested
/// options allow clearing nullable fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Option<String>>,
    pub reminder: Option<Option<DateTime<Utc>>>,
    pub kind: Option<NoteKind>,
    pub parent_id: Option<Option<String>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

impl Note {
    /// Builds a new note with a random id and both timestamps set to `now`.
    pub fn new(data: NewNote, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: data.title,
            content: data.content,
            category_id: data.category_id,
            created_at: now,
            updated_at: now,
            reminder: None,
            kind: data.kind,
            parent_id: data.parent_id,
        }
    }

    /// Merges `patch` into this note and stamps `updated_at`.
    pub fn apply(&mut self, patch: NotePatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(reminder) = patch.reminder {
            self.reminder = reminder;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        self.updated_at = now;
    }

    /// Fills in the defaults expected of a note read back from storage.
    pub fn normalized(mut self) -> Self {
        if self.title.is_empty() {
            self.title = UNTITLED.to_string();
        }
        self
    }
}

impl Record for Note {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(now: DateTime<Utc>) -> Note {
        Note::new(
            NewNote {
                title: "Groceries".to_string(),
                content: "milk".to_string(),
                category_id: Some("cat-1".to_string()),
                ..NewNote::default()
            },
            now,
        )
    }

    #[test]
    fn test_new_note_stamps_both_dates() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let note = sample(now);
        assert_eq!(note.created_at, now);
        assert_eq!(note.updated_at, now);
        assert_eq!(note.kind, NoteKind::Doc);
        assert!(!note.id.is_empty());
    }

    #[test]
    fn test_apply_patch_keeps_untouched_fields() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let later = now + chrono::Duration::minutes(5);
        let mut note = sample(now);
        note.apply(
            NotePatch {
                category_id: Some(None),
                ..NotePatch::title("Shopping")
            },
            later,
        );
        assert_eq!(note.title, "Shopping");
        assert_eq!(note.content, "milk");
        assert_eq!(note.category_id, None);
        assert_eq!(note.created_at, now);
        assert_eq!(note.updated_at, later);
    }

    #[test]
    fn test_serializes_camel_case_with_type_field() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let json = serde_json::to_value(sample(now)).unwrap();
        assert_eq!(json["categoryId"], "cat-1");
        assert_eq!(json["type"], "doc");
        assert_eq!(json["createdAt"], "2024-03-01T08:00:00Z");
        assert!(json.get("reminder").is_none());
    }

    #[test]
    fn test_deserializes_minimal_legacy_note() {
        let json = r#"{
            "id": "n1",
            "title": "",
            "createdAt": "2024-03-01T08:00:00.000Z",
            "updatedAt": "2024-03-01T08:00:00.000Z"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.content, "");
        assert_eq!(note.kind, NoteKind::Doc);
        assert_eq!(note.category_id, None);
        assert_eq!(note.normalized().title, UNTITLED);
    }

    #[test]
    fn test_note_kind_parse_defaults_to_doc() {
        assert_eq!(NoteKind::parse(Some("folder")), NoteKind::Folder);
        assert_eq!(NoteKind::parse(Some("weird")), NoteKind::Doc);
        assert_eq!(NoteKind::parse(None), NoteKind::Doc);
    }
}
