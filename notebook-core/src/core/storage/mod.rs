//! Persistence backends for the four notebook collections.
//!
//! A [`StorageBackend`] mirrors whole collections: every `save_*` call leaves
//! the backend holding exactly the records passed in. Two implementations
//! exist:
//!
//! - [`SqliteStorage`]: the embedded database used by the desktop shell.
//! - [`MemoryStorage`]: the non-persistent preview mode.
//!
//! The mode is chosen once, when the [`Notebook`](crate::Notebook) is opened,
//! via [`StorageMode`].

mod memory;
mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{AppConfig, Category, Note, NoteTag, Result, Tag};

/// File name of the embedded database inside the data directory.
pub const DB_FILE_NAME: &str = "notebook.db";

/// Environment variable that forces the in-memory preview mode.
pub const PREVIEW_ENV_VAR: &str = "NOTEBOOK_PREVIEW";

/// Whole-collection persistence used by the stores.
pub trait StorageBackend: Send + Sync {
    /// Short name of the backend, used in log lines.
    fn mode_name(&self) -> &'static str;

    fn get_all_categories(&self) -> Result<Vec<Category>>;
    fn save_categories(&self, categories: &[Category]) -> Result<()>;

    /// Returns every note, normalized (see [`Note::normalized`]).
    fn get_all_notes(&self) -> Result<Vec<Note>>;
    fn save_notes(&self, notes: &[Note]) -> Result<()>;
    /// Inserts or replaces a single note, leaving all others untouched.
    fn save_one_note(&self, note: &Note) -> Result<()>;
    fn get_note_by_id(&self, id: &str) -> Result<Option<Note>>;

    fn get_all_tags(&self) -> Result<Vec<Tag>>;
    fn save_tags(&self, tags: &[Tag]) -> Result<()>;

    fn get_all_note_tags(&self) -> Result<Vec<NoteTag>>;
    fn save_note_tags(&self, note_tags: &[NoteTag]) -> Result<()>;
}

/// Where the notebook keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// SQLite database file at `path`.
    Embedded { path: PathBuf },
    /// Process-local arrays; nothing survives a restart.
    InMemory,
}

impl StorageMode {
    /// Picks the mode for this process: in-memory when [`PREVIEW_ENV_VAR`] is
    /// set, otherwise an embedded database under the configured data path.
    pub fn detect(config: &AppConfig) -> Self {
        if std::env::var_os(PREVIEW_ENV_VAR).is_some() {
            log::info!("{PREVIEW_ENV_VAR} set, running with in-memory storage");
            return Self::InMemory;
        }
        Self::Embedded {
            path: resolve_db_path(&config.data_path),
        }
    }
}

/// Resolves the database file for `data_path`.
///
/// A non-empty `data_path` is created if needed and the database lives inside
/// it. If it is empty or cannot be created, the platform data directory is used.
pub fn resolve_db_path(data_path: &str) -> PathBuf {
    let trimmed = data_path.trim();
    if !trimmed.is_empty() {
        match std::fs::create_dir_all(trimmed) {
            Ok(()) => return Path::new(trimmed).join(DB_FILE_NAME),
            Err(e) => {
                log::warn!("Cannot use data path '{trimmed}', falling back to default: {e}");
            }
        }
    }
    default_db_path()
}

/// Returns `<platform data dir>/notebook/notebook.db`.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notebook")
        .join(DB_FILE_NAME)
}

/// Opens the backend for `mode`, creating the database and its parent
/// directory when needed.
///
/// # Errors
///
/// Returns [`crate::NotebookError::Io`] if the parent directory cannot be
/// created, or [`crate::NotebookError::Database`] if SQLite fails to open or
/// initialise the schema.
pub fn open_backend(mode: &StorageMode) -> Result<Arc<dyn StorageBackend>> {
    match mode {
        StorageMode::InMemory => Ok(Arc::new(MemoryStorage::new())),
        StorageMode::Embedded { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let storage = SqliteStorage::open(path)?;
            log::info!("Opened notebook database at {}", path.display());
            Ok(Arc::new(storage))
        }
    }
}
