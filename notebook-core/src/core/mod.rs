//! Internal domain modules for the Notebook core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod autosave;
pub mod category;
pub mod category_store;
pub mod config;
pub mod error;
pub mod export;
pub mod local_store;
pub mod logging;
pub mod note;
pub mod note_store;
pub mod notebook;
pub mod record;
pub mod reminder;
pub mod search;
pub mod sequencer;
pub mod storage;
pub(crate) mod store;
pub mod sync;
pub mod tabs;
pub mod tag;
pub mod tag_store;

#[doc(inline)]
pub use autosave::{AutosaveOptions, Autosaver};
#[doc(inline)]
pub use category::{Category, CategoryPatch, NewCategory, DEFAULT_CATEGORY_COLOR};
#[doc(inline)]
pub use category_store::CategoryStore;
#[doc(inline)]
pub use config::{AppConfig, AppConfigPatch, CodeTheme, ConfigStore, Theme};
#[doc(inline)]
pub use error::{NotebookError, Result};
#[doc(inline)]
pub use export::{export_data, import_data, migrate_from_legacy, ExportData};
#[doc(inline)]
pub use local_store::LocalStore;
#[doc(inline)]
pub use note::{NewNote, Note, NoteKind, NotePatch};
#[doc(inline)]
pub use note_store::NoteStore;
#[doc(inline)]
pub use notebook::{LocalStoreLocation, Notebook, NotebookOptions};
#[doc(inline)]
pub use record::Record;
#[doc(inline)]
pub use reminder::{LogNotifier, Notifier, ReminderHandle, ReminderMessage, ReminderWorker};
#[doc(inline)]
pub use search::{filter_notes, search_notes};
#[doc(inline)]
pub use storage::{MemoryStorage, SqliteStorage, StorageBackend, StorageMode};
#[doc(inline)]
pub use sync::{CloudSync, RemoteStore, SyncData, SyncPayload, SyncState, SyncStrategy, WebDavClient, WebDavConfig};
#[doc(inline)]
pub use tabs::{Tab, TabManager, TabSession};
#[doc(inline)]
pub use tag::{NewTag, NoteTag, Tag, TagPatch};
#[doc(inline)]
pub use tag_store::TagStore;
