//! In-memory note collection mirrored to the storage backend, plus the link
//! to the reminder worker.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::core::reminder::ReminderHandle;
use crate::core::store::{Collection, Snapshot};
use crate::{NewNote, Note, NotePatch, Result, StorageBackend};

/// Handle to the note collection. Clones share the same state and the same
/// reminder worker.
#[derive(Clone)]
pub struct NoteStore {
    inner: Arc<Collection<Note>>,
    backend: Arc<dyn StorageBackend>,
    reminders: Arc<Mutex<Option<ReminderHandle>>>,
}

impl NoteStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner: Arc::new(Collection::new()),
            backend,
            reminders: Arc::new(Mutex::new(None)),
        }
    }

    pub fn notes(&self) -> Vec<Note> {
        self.inner.items()
    }

    pub fn get(&self, id: &str) -> Option<Note> {
        self.inner.find(|n| n.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.error()
    }

    pub fn clear_error(&self) {
        self.inner.clear_error();
    }

    /// Replaces the collection without touching the backend.
    pub fn init(&self, notes: Vec<Note>) {
        self.inner.init(notes);
    }

    /// Reloads the collection from the backend and brings the pending
    /// reminders in line with it.
    pub fn load(&self) -> bool {
        let previous = self.notes();
        let backend = Arc::clone(&self.backend);
        let loaded = self
            .inner
            .load("Failed to load notes", || backend.get_all_notes());
        if loaded {
            self.reschedule(&previous, &self.notes());
        }
        loaded
    }

    /// Attaches the reminder worker and schedules every reminder still in the
    /// future.
    pub fn init_reminder_worker(&self, handle: ReminderHandle) {
        let now = Utc::now();
        let mut scheduled = 0usize;
        for note in self.notes() {
            if let Some(at) = note.reminder.filter(|at| *at > now) {
                handle.set(&note.id, &note.title, at.timestamp_millis());
                scheduled += 1;
            }
        }
        log::debug!("Scheduled {scheduled} pending reminders");
        *self.reminder_slot() = Some(handle);
    }

    /// Appends a new note and returns its id.
    pub fn create(&self, data: NewNote) -> String {
        let note = Note::new(data, Utc::now());
        let id = note.id.clone();
        let ((), snapshot) = self.inner.mutate(|items| items.push(note));
        self.save(&snapshot, "Failed to save new note");
        id
    }

    /// Applies `patch` to note `id`. Returns `false` if no such note exists.
    pub fn update(&self, id: &str, patch: NotePatch) -> bool {
        let now = Utc::now();
        let (found, snapshot) = self.inner.mutate(|items| {
            match items.iter_mut().find(|n| n.id == id) {
                Some(note) => {
                    note.apply(patch, now);
                    true
                }
                None => false,
            }
        });
        if found {
            self.save(&snapshot, "Failed to save updated note");
        }
        found
    }

    /// Removes note `id` and cancels its reminder.
    pub fn delete(&self, id: &str) -> bool {
        let (removed, snapshot) = self.inner.mutate(|items| {
            let before = items.len();
            items.retain(|n| n.id != id);
            items.len() != before
        });
        if !removed {
            return false;
        }
        self.save(&snapshot, "Failed to save notes after delete");
        if let Some(handle) = self.reminder_slot().as_ref() {
            handle.clear(id);
        }
        true
    }

    /// Stores `at` as the reminder of note `id` and schedules it.
    pub fn set_reminder(&self, id: &str, at: DateTime<Utc>) -> bool {
        let patch = NotePatch {
            reminder: Some(Some(at)),
            ..NotePatch::default()
        };
        if !self.update(id, patch) {
            return false;
        }
        if let (Some(handle), Some(note)) = (self.reminder_slot().as_ref(), self.get(id)) {
            handle.set(id, &note.title, at.timestamp_millis());
        }
        true
    }

    /// Removes the reminder of note `id` and cancels its timer.
    pub fn clear_reminder(&self, id: &str) -> bool {
        let patch = NotePatch {
            reminder: Some(None),
            ..NotePatch::default()
        };
        if !self.update(id, patch) {
            return false;
        }
        if let Some(handle) = self.reminder_slot().as_ref() {
            handle.clear(id);
        }
        true
    }

    /// Returns note `id` with its content.
    ///
    /// A cached note with non-empty content is returned as is. Otherwise the
    /// row is read from the backend and the cached copy is refreshed.
    pub fn load_note_content(&self, id: &str) -> Option<Note> {
        if let Some(note) = self.get(id).filter(|n| !n.content.is_empty()) {
            return Some(note);
        }
        match self.backend.get_note_by_id(id) {
            Ok(Some(note)) => {
                let mut state = self.inner.lock();
                if let Some(cached) = state.items.iter_mut().find(|n| n.id == id) {
                    cached.content = note.content.clone();
                }
                Some(note)
            }
            Ok(None) => None,
            Err(e) => {
                self.inner.fail("Failed to load note content", &e);
                None
            }
        }
    }

    /// Replaces the collection and persists it, returning any backend error.
    ///
    /// Once persisted, reminders of notes that are gone or whose reminder
    /// changed are cancelled, and new future reminders are scheduled.
    pub fn replace_all(&self, notes: Vec<Note>) -> Result<()> {
        let (previous, snapshot) = self.inner.mutate(|items| std::mem::replace(items, notes));
        self.inner
            .persist(&snapshot, |items| self.backend.save_notes(items))?;
        self.reschedule(&previous, snapshot.items());
        Ok(())
    }

    fn save(&self, snapshot: &Snapshot<Note>, context: &str) {
        if let Err(e) = self
            .inner
            .persist(snapshot, |items| self.backend.save_notes(items))
        {
            self.inner.fail(context, &e);
        }
    }

    fn reschedule(&self, previous: &[Note], current: &[Note]) {
        let slot = self.reminder_slot();
        let Some(handle) = slot.as_ref() else {
            return;
        };
        let reminder_of = |notes: &[Note], id: &str| {
            notes.iter().find(|n| n.id == id).and_then(|n| n.reminder)
        };
        for old in previous.iter().filter(|n| n.reminder.is_some()) {
            if reminder_of(current, &old.id) != old.reminder {
                handle.clear(&old.id);
            }
        }
        let now = Utc::now();
        for note in current {
            match note.reminder {
                Some(at) if at > now && reminder_of(previous, &note.id) != Some(at) => {
                    handle.set(&note.id, &note.title, at.timestamp_millis());
                }
                _ => {}
            }
        }
    }

    fn reminder_slot(&self) -> std::sync::MutexGuard<'_, Option<ReminderHandle>> {
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reminder::{Notifier, ReminderWorker};
    use crate::core::storage::testing::FailingStorage;
    use crate::MemoryStorage;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, note_id: &str, _title: &str, _body: &str) {
            self.fired.lock().unwrap().push(note_id.to_string());
        }
    }

    fn new_note(title: &str, content: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: content.to_string(),
            ..NewNote::default()
        }
    }

    #[test]
    fn test_create_and_update() {
        let backend = Arc::new(MemoryStorage::new());
        let store = NoteStore::new(backend.clone());
        let id = store.create(new_note("Draft", "body"));

        assert!(store.update(&id, NotePatch::content("new body")));
        let saved = backend.get_note_by_id(&id).unwrap().unwrap();
        assert_eq!(saved.content, "new body");
        assert_eq!(saved.title, "Draft");
        assert!(saved.updated_at >= saved.created_at);
        assert!(!store.update("missing", NotePatch::title("x")));
    }

    #[test]
    fn test_delete_persists_remaining() {
        let backend = Arc::new(MemoryStorage::new());
        let store = NoteStore::new(backend.clone());
        let a = store.create(new_note("A", ""));
        let b = store.create(new_note("B", ""));
        assert!(store.delete(&a));
        assert!(!store.delete(&a));
        let saved = backend.get_all_notes().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, b);
    }

    #[test]
    fn test_load_note_content_reads_backend_when_cache_is_empty() {
        let backend = Arc::new(MemoryStorage::new());
        let full = Note::new(new_note("Big", "lots of text"), Utc::now());
        backend.save_notes(std::slice::from_ref(&full)).unwrap();

        let store = NoteStore::new(backend.clone());
        let mut stub = full.clone();
        stub.content.clear();
        store.init(vec![stub]);

        let loaded = store.load_note_content(&full.id).unwrap();
        assert_eq!(loaded.content, "lots of text");
        assert_eq!(store.get(&full.id).unwrap().content, "lots of text");
        assert!(store.load_note_content("missing").is_none());
    }

    #[test]
    fn test_load_note_content_prefers_cache() {
        let store = NoteStore::new(Arc::new(FailingStorage::new()));
        let note = Note::new(new_note("Cached", "here"), Utc::now());
        store.init(vec![note.clone()]);
        assert_eq!(store.load_note_content(&note.id).unwrap(), note);
        assert!(store.error().is_none());
    }

    #[test]
    fn test_update_failure_keeps_memory_change() {
        let store = NoteStore::new(Arc::new(FailingStorage::new()));
        let note = Note::new(new_note("Old", ""), Utc::now());
        store.init(vec![note.clone()]);
        assert!(store.update(&note.id, NotePatch::title("New")));
        assert_eq!(store.get(&note.id).unwrap().title, "New");
        assert!(store.error().is_some());
    }

    #[test]
    fn test_reminder_fires_and_delete_clears_it() {
        let recorder = Arc::new(Recorder::default());
        let worker = ReminderWorker::spawn(recorder.clone()).unwrap();
        let store = NoteStore::new(Arc::new(MemoryStorage::new()));
        store.init_reminder_worker(worker.handle());

        let kept = store.create(new_note("Kept", ""));
        let dropped = store.create(new_note("Dropped", ""));
        let soon = Utc::now() + chrono::Duration::milliseconds(80);
        assert!(store.set_reminder(&kept, soon));
        assert!(store.set_reminder(&dropped, soon));
        assert!(store.delete(&dropped));

        std::thread::sleep(Duration::from_millis(300));
        drop(worker);
        assert_eq!(*recorder.fired.lock().unwrap(), vec![kept.clone()]);
        assert_eq!(store.get(&kept).unwrap().reminder, Some(soon));
    }

    #[test]
    fn test_init_reminder_worker_schedules_future_reminders_only() {
        let recorder = Arc::new(Recorder::default());
        let worker = ReminderWorker::spawn(recorder.clone()).unwrap();
        let store = NoteStore::new(Arc::new(MemoryStorage::new()));

        let mut past = Note::new(new_note("Past", ""), Utc::now());
        past.reminder = Some(Utc::now() - chrono::Duration::minutes(1));
        let mut future = Note::new(new_note("Future", ""), Utc::now());
        future.reminder = Some(Utc::now() + chrono::Duration::milliseconds(60));
        store.init(vec![past, future.clone()]);
        store.init_reminder_worker(worker.handle());

        std::thread::sleep(Duration::from_millis(300));
        drop(worker);
        assert_eq!(*recorder.fired.lock().unwrap(), vec![future.id]);
    }

    #[test]
    fn test_replace_all_cancels_reminders_of_removed_notes() {
        let recorder = Arc::new(Recorder::default());
        let worker = ReminderWorker::spawn(recorder.clone()).unwrap();
        let store = NoteStore::new(Arc::new(MemoryStorage::new()));
        store.init_reminder_worker(worker.handle());

        let gone = store.create(new_note("Gone", ""));
        let cleared = store.create(new_note("Cleared", ""));
        let soon = Utc::now() + chrono::Duration::milliseconds(150);
        store.set_reminder(&gone, soon);
        store.set_reminder(&cleared, soon);

        let mut incoming = Note::new(new_note("Incoming", ""), Utc::now());
        incoming.reminder = Some(soon);
        let mut kept = store.get(&cleared).unwrap();
        kept.reminder = None;
        store.replace_all(vec![kept, incoming.clone()]).unwrap();

        std::thread::sleep(Duration::from_millis(400));
        drop(worker);
        assert_eq!(*recorder.fired.lock().unwrap(), vec![incoming.id]);
    }

    #[test]
    fn test_reload_cancels_reminders_of_notes_no_longer_stored() {
        let recorder = Arc::new(Recorder::default());
        let worker = ReminderWorker::spawn(recorder.clone()).unwrap();
        let backend = Arc::new(MemoryStorage::new());
        let store = NoteStore::new(backend.clone());
        store.init_reminder_worker(worker.handle());

        let id = store.create(new_note("Imported away", ""));
        store.set_reminder(&id, Utc::now() + chrono::Duration::milliseconds(150));
        backend.save_notes(&[]).unwrap();
        assert!(store.load());

        std::thread::sleep(Duration::from_millis(400));
        drop(worker);
        assert!(recorder.fired.lock().unwrap().is_empty());
    }

    #[test]
    fn test_replace_all_failure_keeps_reminders() {
        let recorder = Arc::new(Recorder::default());
        let worker = ReminderWorker::spawn(recorder.clone()).unwrap();
        let store = NoteStore::new(Arc::new(FailingStorage::new()));

        let mut note = Note::new(new_note("Pending", ""), Utc::now());
        note.reminder = Some(Utc::now() + chrono::Duration::milliseconds(150));
        store.init(vec![note.clone()]);
        store.init_reminder_worker(worker.handle());
        assert!(store.replace_all(vec![]).is_err());

        std::thread::sleep(Duration::from_millis(400));
        drop(worker);
        assert_eq!(*recorder.fired.lock().unwrap(), vec![note.id]);
    }
}
