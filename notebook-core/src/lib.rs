//! Core library for Notebook, a local-first note-taking application with
//! categories, tags, open-note tabs, reminders and WebDAV sync.
//!
//! The primary entry point is [`Notebook`], which owns the storage backend
//! and the category, note and tag stores built on it. Storage is either an
//! embedded SQLite database ([`SqliteStorage`]) or process memory
//! ([`MemoryStorage`]).
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    autosave::{AutosaveOptions, Autosaver},
    category::{Category, CategoryPatch, NewCategory, DEFAULT_CATEGORY_COLOR},
    category_store::CategoryStore,
    config::{AppConfig, AppConfigPatch, CodeTheme, ConfigStore, Theme},
    error::{NotebookError, Result},
    export::{export_data, import_data, migrate_from_legacy, ExportData},
    local_store::LocalStore,
    logging::{default_log_dir, default_log_level, init_logging},
    note::{NewNote, Note, NoteKind, NotePatch},
    note_store::NoteStore,
    notebook::{LocalStoreLocation, Notebook, NotebookOptions},
    record::Record,
    reminder::{LogNotifier, Notifier, ReminderHandle, ReminderMessage, ReminderWorker},
    search::{filter_notes, search_notes},
    storage::{MemoryStorage, SqliteStorage, StorageBackend, StorageMode},
    sync::{
        CloudSync, RemoteStore, SyncData, SyncPayload, SyncState, SyncStrategy, WebDavClient,
        WebDavConfig,
    },
    tabs::{Tab, TabManager, TabSession},
    tag::{NewTag, NoteTag, Tag, TagPatch},
    tag_store::TagStore,
};
