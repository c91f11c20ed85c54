//! JSON export/import of a whole notebook, and one-shot backend migration.

use serde::{Deserialize, Serialize};

use crate::{Category, Note, NoteTag, NotebookError, Result, StorageBackend, Tag};

/// Document written by [`export_data`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub categories: Vec<Category>,
    pub notes: Vec<Note>,
    pub tags: Vec<Tag>,
    pub note_tags: Vec<NoteTag>,
}

/// Document accepted by [`import_data`]. Every collection is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportDocument {
    categories: Option<Vec<Category>>,
    notes: Option<Vec<Note>>,
    tags: Option<Vec<Tag>>,
    note_tags: Option<Vec<NoteTag>>,
}

/// Serializes all four collections of `backend` as pretty-printed JSON.
pub fn export_data(backend: &dyn StorageBackend) -> Result<String> {
    let data = ExportData {
        categories: backend.get_all_categories()?,
        notes: backend.get_all_notes()?,
        tags: backend.get_all_tags()?,
        note_tags: backend.get_all_note_tags()?,
    };
    log::info!(
        "Exporting {} categories, {} notes, {} tags",
        data.categories.len(),
        data.notes.len(),
        data.tags.len()
    );
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Overwrites every collection present in `json`; absent ones are left as is.
///
/// # Errors
///
/// Any parse or write failure is logged and reported as
/// [`NotebookError::ImportFailed`]. Nothing is written when parsing fails.
pub fn import_data(backend: &dyn StorageBackend, json: &str) -> Result<()> {
    write_document(backend, json).map_err(|e| {
        log::error!("Import failed: {e}");
        NotebookError::ImportFailed
    })
}

fn write_document(backend: &dyn StorageBackend, json: &str) -> Result<()> {
    let doc: ImportDocument = serde_json::from_str(json)?;
    if let Some(categories) = doc.categories {
        backend.save_categories(&categories)?;
    }
    if let Some(notes) = doc.notes {
        backend.save_notes(&notes)?;
    }
    if let Some(tags) = doc.tags {
        backend.save_tags(&tags)?;
    }
    if let Some(note_tags) = doc.note_tags {
        backend.save_note_tags(&note_tags)?;
    }
    Ok(())
}

/// Copies all four collections from `old` into `new`.
///
/// Returns `false` when `old` holds nothing or any step fails.
pub fn migrate_from_legacy(old: &dyn StorageBackend, new: &dyn StorageBackend) -> bool {
    let copy = || -> Result<bool> {
        let data = ExportData {
            categories: old.get_all_categories()?,
            notes: old.get_all_notes()?,
            tags: old.get_all_tags()?,
            note_tags: old.get_all_note_tags()?,
        };
        if data == ExportData::default() {
            return Ok(false);
        }
        new.save_categories(&data.categories)?;
        new.save_notes(&data.notes)?;
        new.save_tags(&data.tags)?;
        new.save_note_tags(&data.note_tags)?;
        log::info!(
            "Migrated {} notes from {} to {} storage",
            data.notes.len(),
            old.mode_name(),
            new.mode_name()
        );
        Ok(true)
    };
    copy().unwrap_or_else(|e| {
        log::error!("Migration failed: {e}");
        false
    })
}
