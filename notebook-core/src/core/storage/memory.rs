use std::sync::{Mutex, MutexGuard, PoisonError};

use super::StorageBackend;
use crate::{Category, Note, NoteTag, Result, Tag};

#[derive(Default)]
struct Collections {
    categories: Vec<Category>,
    notes: Vec<Note>,
    tags: Vec<Tag>,
    note_tags: Vec<NoteTag>,
}

/// Preview-mode backend: saves replace the held arrays, reads return copies.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<Collections>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Collections> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn mode_name(&self) -> &'static str {
        "memory"
    }

    fn get_all_categories(&self) -> Result<Vec<Category>> {
        Ok(self.data().categories.clone())
    }

    fn save_categories(&self, categories: &[Category]) -> Result<()> {
        self.data().categories = categories.to_vec();
        Ok(())
    }

    fn get_all_notes(&self) -> Result<Vec<Note>> {
        Ok(self
            .data()
            .notes
            .iter()
            .cloned()
            .map(Note::normalized)
            .collect())
    }

    fn save_notes(&self, notes: &[Note]) -> Result<()> {
        self.data().notes = notes.to_vec();
        Ok(())
    }

    fn save_one_note(&self, note: &Note) -> Result<()> {
        let mut data = self.data();
        match data.notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note.clone(),
            None => data.notes.push(note.clone()),
        }
        Ok(())
    }

    fn get_note_by_id(&self, id: &str) -> Result<Option<Note>> {
        Ok(self
            .data()
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .map(Note::normalized))
    }

    fn get_all_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.data().tags.clone())
    }

    fn save_tags(&self, tags: &[Tag]) -> Result<()> {
        self.data().tags = tags.to_vec();
        Ok(())
    }

    fn get_all_note_tags(&self) -> Result<Vec<NoteTag>> {
        Ok(self.data().note_tags.clone())
    }

    fn save_note_tags(&self, note_tags: &[NoteTag]) -> Result<()> {
        self.data().note_tags = note_tags.to_vec();
        Ok(())
    }
}
