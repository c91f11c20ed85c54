//! [`Notebook`], the object that owns one open notebook and everything
//! attached to it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::export;
use crate::core::local_store::default_local_store_path;
use crate::core::reminder::{LogNotifier, Notifier, ReminderWorker};
use crate::core::storage::{open_backend, StorageMode};
use crate::core::sync::{CloudSync, SyncPayload, SyncStrategy};
use crate::{
    CategoryStore, ConfigStore, LocalStore, NewCategory, NewNote, NoteStore, Result,
    StorageBackend, TabManager, TagStore,
};

/// Local-store key holding the selected category id.
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategoryId";

/// Where the session key/value store lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocalStoreLocation {
    /// [`default_local_store_path`].
    #[default]
    Default,
    File(PathBuf),
    InMemory,
}

pub struct NotebookOptions {
    /// Storage to use; `None` picks one with [`StorageMode::detect`].
    pub storage: Option<StorageMode>,
    pub local_store: LocalStoreLocation,
    pub sync_strategy: SyncStrategy,
    /// Receives fired reminders; `None` starts no reminder worker.
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            storage: None,
            local_store: LocalStoreLocation::Default,
            sync_strategy: SyncStrategy::default(),
            notifier: Some(Arc::new(LogNotifier)),
        }
    }
}

impl NotebookOptions {
    /// Nothing touches the disk and no reminder worker runs.
    pub fn ephemeral() -> Self {
        Self {
            storage: Some(StorageMode::InMemory),
            local_store: LocalStoreLocation::InMemory,
            notifier: None,
            ..Self::default()
        }
    }
}

/// An open notebook: storage backend, stores, tabs, config and cloud sync.
///
/// Constructed with [`Notebook::open`]; call [`Notebook::init`] afterwards to
/// load the stores from storage.
pub struct Notebook {
    mode: StorageMode,
    backend: Arc<dyn StorageBackend>,
    local: Arc<LocalStore>,
    config: ConfigStore,
    categories: CategoryStore,
    notes: NoteStore,
    tags: TagStore,
    tabs: TabManager,
    cloud: CloudSync,
    reminders: Option<ReminderWorker>,
}

impl Notebook {
    /// Opens the storage and builds every component. Stores start empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be opened.
    pub fn open(options: NotebookOptions) -> Result<Self> {
        let local = Arc::new(match options.local_store {
            LocalStoreLocation::Default => LocalStore::open(default_local_store_path()),
            LocalStoreLocation::File(path) => LocalStore::open(path),
            LocalStoreLocation::InMemory => LocalStore::in_memory(),
        });
        let config = ConfigStore::load(Arc::clone(&local));
        let mode = options
            .storage
            .unwrap_or_else(|| StorageMode::detect(config.config()));
        let backend = open_backend(&mode)?;
        log::info!("Notebook opened with {} storage", backend.mode_name());

        let mut cloud = CloudSync::new(Arc::clone(&local));
        cloud.set_strategy(options.sync_strategy);

        let reminders = match options.notifier {
            Some(notifier) => match ReminderWorker::spawn(notifier) {
                Ok(worker) => Some(worker),
                Err(e) => {
                    log::error!("Failed to start reminder worker: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            categories: CategoryStore::new(Arc::clone(&backend)),
            notes: NoteStore::new(Arc::clone(&backend)),
            tags: TagStore::new(Arc::clone(&backend)),
            tabs: TabManager::restore(Arc::clone(&local)),
            mode,
            backend,
            local,
            config,
            cloud,
            reminders,
        })
    }

    /// Loads all stores and schedules pending reminders.
    ///
    /// Load failures are logged and recorded on the stores and never abort.
    pub fn init(&mut self) {
        let categories_ok = self.categories.load();
        let notes_ok = self.notes.load();
        let tags_ok = self.tags.load();
        if !(categories_ok && notes_ok && tags_ok) {
            log::warn!("Notebook started with incomplete data");
        }
        if notes_ok {
            let notes = &self.notes;
            self.tabs.retain_notes(|id| notes.get(id).is_some());
        }
        self.attach_reminders();
    }

    pub fn storage_mode(&self) -> &StorageMode {
        &self.mode
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    pub fn tabs(&self) -> &TabManager {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabManager {
        &mut self.tabs
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn cloud(&self) -> &CloudSync {
        &self.cloud
    }

    pub fn cloud_mut(&mut self) -> &mut CloudSync {
        &mut self.cloud
    }

    pub fn export_data(&self) -> Result<String> {
        export::export_data(self.backend.as_ref())
    }

    /// Imports `json` into storage, then reloads every store.
    pub fn import_data(&mut self, json: &str) -> Result<()> {
        export::import_data(self.backend.as_ref(), json)?;
        self.init();
        Ok(())
    }

    /// Syncs categories and notes with the configured WebDAV server and
    /// replaces both collections with the result.
    ///
    /// If the result cannot be stored, both stores are reloaded from storage
    /// so memory matches what was actually written.
    pub fn sync(&mut self) -> Result<SyncPayload> {
        let local = SyncPayload {
            categories: self.categories.categories(),
            notes: self.notes.notes(),
        };
        let result = self.cloud.sync(local)?;
        if let Err(e) = self.apply_sync_result(&result) {
            log::error!("Failed to store sync result, reloading from storage: {e}");
            self.categories.load();
            self.notes.load();
            return Err(e);
        }
        let notes = &self.notes;
        self.tabs.retain_notes(|id| notes.get(id).is_some());
        log::info!(
            "Sync finished with {} categories and {} notes",
            result.categories.len(),
            result.notes.len()
        );
        Ok(result)
    }

    fn apply_sync_result(&self, result: &SyncPayload) -> Result<()> {
        self.categories.replace_all(result.categories.clone())?;
        self.notes.replace_all(result.notes.clone())
    }

    pub fn selected_category(&self) -> Option<String> {
        self.local.get(SELECTED_CATEGORY_KEY)
    }

    /// Selects `category_id`, or clears the selection for `None`.
    pub fn select_category(&self, category_id: Option<&str>) -> Result<()> {
        match category_id {
            Some(id) => self.local.set(SELECTED_CATEGORY_KEY, &id),
            None => self.local.remove(SELECTED_CATEGORY_KEY),
        }
    }

    /// Clears the selection when no note belongs to the selected category.
    /// Returns `true` if it was cleared.
    pub fn reconcile_selection(&self) -> bool {
        let Some(selected) = self.selected_category() else {
            return false;
        };
        let in_use = self
            .notes
            .notes()
            .iter()
            .any(|n| n.category_id.as_deref() == Some(selected.as_str()));
        if in_use {
            return false;
        }
        if let Err(e) = self.select_category(None) {
            log::warn!("Failed to clear selected category: {e}");
        }
        true
    }

    /// Creates a category from a trimmed, non-empty `name` and selects it.
    pub fn create_category(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let id = self.categories.create(NewCategory {
            name: name.to_string(),
            color: None,
        });
        if let Err(e) = self.select_category(Some(&id)) {
            log::warn!("Failed to select new category: {e}");
        }
        Some(id)
    }

    /// Removes a category. Its notes keep their `category_id`.
    pub fn delete_category(&self, id: &str) -> bool {
        self.categories.delete(id)
    }

    /// Creates an empty note in the selected category and opens it in a tab.
    /// Returns the note id.
    pub fn create_note_in_selected(&mut self, title: &str) -> String {
        let id = self.notes.create(NewNote {
            title: title.to_string(),
            category_id: self.selected_category(),
            ..NewNote::default()
        });
        self.tabs.add_tab(&id, title);
        id
    }

    /// Opens note `id` in a tab. Returns the tab id, or `None` for an unknown note.
    pub fn open_note(&mut self, id: &str) -> Option<String> {
        let note = self.notes.get(id)?;
        Some(self.tabs.add_tab(id, &note.title))
    }

    /// Deletes note `id` and closes its tab.
    pub fn delete_note(&mut self, id: &str) -> bool {
        if let Some(tab_id) = self.tabs.get_tab_by_note_id(id).map(|t| t.id.clone()) {
            self.tabs.close_tab(&tab_id);
        }
        self.notes.delete(id)
    }

    fn attach_reminders(&self) {
        if let Some(worker) = &self.reminders {
            self.notes.init_reminder_worker(worker.handle());
        }
    }
}
