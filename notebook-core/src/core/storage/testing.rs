//! Backend doubles for store tests.

use super::{MemoryStorage, StorageBackend};
use crate::{Category, Note, NoteTag, NotebookError, Result, Tag};

/// Wraps a [`MemoryStorage`] and fails every read and/or write on demand.
#[derive(Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    reads_ok: bool,
}

impl FailingStorage {
    /// Reads and writes both fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads succeed from the wrapped memory backend, writes fail.
    pub fn read_only(inner: MemoryStorage) -> Self {
        Self {
            inner,
            reads_ok: true,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryStorage) -> Result<T>) -> Result<T> {
        if self.reads_ok {
            f(&self.inner)
        } else {
            Err(NotebookError::InvalidConfig("disk gone".to_string()))
        }
    }

    fn write(&self) -> Result<()> {
        Err(NotebookError::InvalidConfig("disk full".to_string()))
    }
}

impl StorageBackend for FailingStorage {
    fn mode_name(&self) -> &'static str {
        "failing"
    }
    fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.read(|m| m.get_all_categories())
    }
    fn save_categories(&self, _: &[Category]) -> Result<()> {
        self.write()
    }
    fn get_all_notes(&self) -> Result<Vec<Note>> {
        self.read(|m| m.get_all_notes())
    }
    fn save_notes(&self, _: &[Note]) -> Result<()> {
        self.write()
    }
    fn save_one_note(&self, _: &Note) -> Result<()> {
        self.write()
    }
    fn get_note_by_id(&self, id: &str) -> Result<Option<Note>> {
        self.read(|m| m.get_note_by_id(id))
    }
    fn get_all_tags(&self) -> Result<Vec<Tag>> {
        self.read(|m| m.get_all_tags())
    }
    fn save_tags(&self, _: &[Tag]) -> Result<()> {
        self.write()
    }
    fn get_all_note_tags(&self) -> Result<Vec<NoteTag>> {
        self.read(|m| m.get_all_note_tags())
    }
    fn save_note_tags(&self, _: &[NoteTag]) -> Result<()> {
        self.write()
    }
}
