//! Last-write-wins cloud sync of categories and notes over WebDAV.
//!
//! The whole dataset lives in one remote file, [`SYNC_FILE_PATH`]. By default
//! [`CloudSync::sync`] keeps either the local or the remote side as a whole,
//! comparing the newest local `updatedAt` against the remote `lastSyncTime`.
//! [`SyncStrategy::PerRecord`] merges record by record instead.

mod webdav;

pub use webdav::{RemoteStore, WebDavClient, WebDavConfig};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::record::{latest_update, Record};
use crate::{Category, LocalStore, Note, NotebookError, Result};

/// Local-store key holding the cached [`WebDavConfig`].
pub const WEBDAV_CONFIG_KEY: &str = "webdav_config";
/// Remote directory holding the sync file.
pub const SYNC_DIR: &str = "/notebook/";
/// Remote path of the sync file.
pub const SYNC_FILE_PATH: &str = "/notebook/data.json";

/// Contents of the remote sync file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncData {
    pub categories: Vec<Category>,
    pub notes: Vec<Note>,
    /// Epoch milliseconds at upload time.
    pub last_sync_time: i64,
}

/// The categories and notes exchanged by a sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPayload {
    pub categories: Vec<Category>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Configured,
    Synced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Keep the local dataset if its newest change is strictly later than the
    /// remote upload time, otherwise take the remote dataset.
    #[default]
    WholeDataset,
    /// Keep the later side of every record, ties going to the remote.
    PerRecord,
}

pub struct CloudSync {
    local: Arc<LocalStore>,
    remote: Option<Box<dyn RemoteStore>>,
    state: SyncState,
    strategy: SyncStrategy,
}

impl CloudSync {
    /// Creates the service, reconnecting with cached credentials if present.
    pub fn new(local: Arc<LocalStore>) -> Self {
        let mut sync = Self {
            local,
            remote: None,
            state: SyncState::Uninitialized,
            strategy: SyncStrategy::default(),
        };
        if let Some(config) = sync.local.get::<WebDavConfig>(WEBDAV_CONFIG_KEY) {
            if let Err(e) = sync.init_client(config) {
                log::warn!("Ignoring cached WebDAV config: {e}");
            }
        }
        sync
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn strategy(&self) -> SyncStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: SyncStrategy) {
        self.strategy = strategy;
    }

    /// The cached server config, if any.
    pub fn config(&self) -> Option<WebDavConfig> {
        self.local.get(WEBDAV_CONFIG_KEY)
    }

    /// Creates a WebDAV client for `config` and caches the credentials.
    pub fn init_client(&mut self, config: WebDavConfig) -> Result<()> {
        let client = WebDavClient::new(&config)?;
        self.local.set(WEBDAV_CONFIG_KEY, &config)?;
        log::info!("WebDAV client configured for {}", config.url);
        self.attach_remote(Box::new(client));
        Ok(())
    }

    /// Uses `remote` as the transport without touching cached credentials.
    pub fn attach_remote(&mut self, remote: Box<dyn RemoteStore>) {
        self.remote = Some(remote);
        self.state = SyncState::Configured;
    }

    /// Lists the remote root. Every failure, including a missing client,
    /// yields `false`.
    pub fn test_connection(&self) -> bool {
        let Some(remote) = self.remote.as_deref() else {
            return false;
        };
        match remote.list_dir("/") {
            Ok(_) => true,
            Err(e) => {
                log::error!("WebDAV connection test failed: {e}");
                false
            }
        }
    }

    /// Writes `categories` and `notes` to the sync file, stamped with now.
    pub fn upload(&self, categories: &[Category], notes: &[Note]) -> Result<()> {
        let remote = self.remote()?;
        self.ensure_sync_dir(remote)?;
        let data = SyncDataRef {
            categories,
            notes,
            last_sync_time: Utc::now().timestamp_millis(),
        };
        let body = serde_json::to_string_pretty(&data)?;
        remote.put(SYNC_FILE_PATH, &body).map_err(|e| {
            log::error!("Failed to upload sync data: {e}");
            e
        })
    }

    /// Reads the sync file; `None` when nothing has been uploaded yet.
    pub fn download(&self) -> Result<Option<SyncData>> {
        let remote = self.remote()?;
        let Some(body) = remote.get(SYNC_FILE_PATH).map_err(|e| {
            log::error!("Failed to download sync data: {e}");
            e
        })?
        else {
            return Ok(None);
        };
        let data: SyncData = serde_json::from_str(&body)?;
        Ok(Some(data))
    }

    /// Reconciles `local` with the remote file and returns the data to keep.
    pub fn sync(&mut self, local: SyncPayload) -> Result<SyncPayload> {
        let result = match self.download()? {
            None => {
                log::info!("No remote data, uploading local notebook");
                self.upload(&local.categories, &local.notes)?;
                local
            }
            Some(remote) => match self.strategy {
                SyncStrategy::WholeDataset => self.sync_whole(local, remote)?,
                SyncStrategy::PerRecord => {
                    let merged = SyncPayload {
                        categories: merge_by_id(&local.categories, &remote.categories),
                        notes: merge_by_id(&local.notes, &remote.notes),
                    };
                    self.upload(&merged.categories, &merged.notes)?;
                    merged
                }
            },
        };
        self.state = SyncState::Synced;
        Ok(result)
    }

    /// Drops the client and forgets the cached credentials.
    pub fn disconnect(&mut self) {
        self.remote = None;
        self.state = SyncState::Uninitialized;
        if let Err(e) = self.local.remove(WEBDAV_CONFIG_KEY) {
            log::warn!("Failed to remove cached WebDAV config: {e}");
        }
    }

    fn sync_whole(&self, local: SyncPayload, remote: SyncData) -> Result<SyncPayload> {
        let local_last_modified = latest_update(&local.notes)
            .into_iter()
            .chain(latest_update(&local.categories))
            .max();
        match local_last_modified {
            Some(at) if at.timestamp_millis() > remote.last_sync_time => {
                log::info!("Local notebook is newer, uploading");
                self.upload(&local.categories, &local.notes)?;
                Ok(local)
            }
            _ => {
                log::info!("Remote notebook is newer, taking remote data");
                Ok(SyncPayload {
                    categories: remote.categories,
                    notes: remote.notes,
                })
            }
        }
    }

    fn remote(&self) -> Result<&dyn RemoteStore> {
        self.remote.as_deref().ok_or(NotebookError::SyncNotConfigured)
    }

    fn ensure_sync_dir(&self, remote: &dyn RemoteStore) -> Result<()> {
        if !remote.exists(SYNC_DIR)? {
            remote.create_dir(SYNC_DIR)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncDataRef<'a> {
    categories: &'a [Category],
    notes: &'a [Note],
    last_sync_time: i64,
}

/// Merges two collections by id. Remote order is kept, a local record replaces
/// its remote twin only when strictly newer, and local-only records are
/// appended.
fn merge_by_id<R: Record>(local: &[R], remote: &[R]) -> Vec<R> {
    let local_by_id: HashMap<&str, &R> = local.iter().map(|r| (r.id(), r)).collect();
    let mut merged: Vec<R> = remote
        .iter()
        .map(|theirs| match local_by_id.get(theirs.id()) {
            Some(ours) if ours.updated_at() > theirs.updated_at() => (*ours).clone(),
            _ => theirs.clone(),
        })
        .collect();
    let remote_ids: Vec<&str> = remote.iter().map(|r| r.id()).collect();
    merged.extend(
        local
            .iter()
            .filter(|r| !remote_ids.contains(&r.id()))
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewCategory, NewNote};
    use chrono::{DateTime, TimeZone};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDav {
        files: Mutex<HashMap<String, String>>,
        dirs: Mutex<Vec<String>>,
        offline: bool,
    }

    impl RemoteStore for Arc<FakeDav> {
        fn list_dir(&self, path: &str) -> Result<Vec<String>> {
            if self.offline {
                return Err(NotebookError::HttpStatus {
                    status: 503,
                    path: path.to_string(),
                });
            }
            Ok(vec![path.to_string()])
        }
        fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.dirs.lock().unwrap().iter().any(|d| d == path))
        }
        fn create_dir(&self, path: &str) -> Result<()> {
            self.dirs.lock().unwrap().push(path.to_string());
            Ok(())
        }
        fn put(&self, path: &str, body: &str) -> Result<()> {
            assert!(self.exists(SYNC_DIR)?, "directory must exist before PUT");
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), body.to_string());
            Ok(())
        }
        fn get(&self, path: &str) -> Result<Option<String>> {
            Ok(self.files.lock().unwrap().get(path).cloned())
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn note(title: &str, updated: DateTime<Utc>) -> Note {
        Note::new(
            NewNote {
                title: title.to_string(),
                ..NewNote::default()
            },
            updated,
        )
    }

    fn service(fake: &Arc<FakeDav>) -> CloudSync {
        let mut sync = CloudSync::new(Arc::new(LocalStore::in_memory()));
        sync.attach_remote(Box::new(Arc::clone(fake)));
        sync
    }

    fn put_remote(fake: &FakeDav, data: &SyncData) {
        fake.files.lock().unwrap().insert(
            SYNC_FILE_PATH.to_string(),
            serde_json::to_string(data).unwrap(),
        );
    }

    #[test]
    fn test_unconfigured_calls_fail() {
        let mut sync = CloudSync::new(Arc::new(LocalStore::in_memory()));
        assert_eq!(sync.state(), SyncState::Uninitialized);
        assert!(!sync.test_connection());
        assert!(matches!(sync.download(), Err(NotebookError::SyncNotConfigured)));
        assert!(sync.sync(SyncPayload::default()).is_err());
    }

    #[test]
    fn test_connection_failure_is_false() {
        let fake = Arc::new(FakeDav {
            offline: true,
            ..FakeDav::default()
        });
        assert!(!service(&fake).test_connection());
        assert!(service(&Arc::new(FakeDav::default())).test_connection());
    }

    #[test]
    fn test_empty_remote_uploads_local() {
        let fake = Arc::new(FakeDav::default());
        let mut sync = service(&fake);
        let local = SyncPayload {
            categories: vec![Category::new(
                NewCategory {
                    name: "Work".to_string(),
                    color: None,
                },
                at(1),
            )],
            notes: vec![note("a", at(2))],
        };

        let result = sync.sync(local.clone()).unwrap();
        assert_eq!(result, local);
        assert_eq!(sync.state(), SyncState::Synced);
        assert_eq!(*fake.dirs.lock().unwrap(), vec![SYNC_DIR.to_string()]);

        let uploaded = sync.download().unwrap().unwrap();
        assert_eq!(uploaded.notes, local.notes);
        assert_eq!(uploaded.categories, local.categories);
    }

    #[test]
    fn test_newer_remote_wins() {
        let fake = Arc::new(FakeDav::default());
        let remote = SyncData {
            categories: vec![],
            notes: vec![note("remote", at(5))],
            last_sync_time: at(10).timestamp_millis(),
        };
        put_remote(&fake, &remote);
        let mut sync = service(&fake);

        let result = sync
            .sync(SyncPayload {
                categories: vec![],
                notes: vec![note("local", at(9))],
            })
            .unwrap();
        assert_eq!(result.notes, remote.notes);
    }

    #[test]
    fn test_tie_goes_to_remote_and_newer_local_uploads() {
        let fake = Arc::new(FakeDav::default());
        put_remote(
            &fake,
            &SyncData {
                categories: vec![],
                notes: vec![note("remote", at(1))],
                last_sync_time: at(10).timestamp_millis(),
            },
        );
        let mut sync = service(&fake);

        let tie = sync
            .sync(SyncPayload {
                categories: vec![],
                notes: vec![note("local", at(10))],
            })
            .unwrap();
        assert_eq!(tie.notes[0].title, "remote");

        let newer = SyncPayload {
            categories: vec![],
            notes: vec![note("local", at(11))],
        };
        assert_eq!(sync.sync(newer.clone()).unwrap(), newer);
        assert_eq!(sync.download().unwrap().unwrap().notes, newer.notes);
    }

    #[test]
    fn test_empty_local_takes_remote() {
        let fake = Arc::new(FakeDav::default());
        let remote = SyncData {
            categories: vec![],
            notes: vec![note("remote", at(1))],
            last_sync_time: 0,
        };
        put_remote(&fake, &remote);
        let result = service(&fake).sync(SyncPayload::default()).unwrap();
        assert_eq!(result.notes, remote.notes);
    }

    #[test]
    fn test_per_record_merge_keeps_newer_side() {
        let fake = Arc::new(FakeDav::default());
        let shared_old = note("shared", at(1));
        let mut shared_new = shared_old.clone();
        shared_new.title = "shared edited".to_string();
        shared_new.updated_at = at(3);
        let remote_only = note("remote only", at(2));
        let local_only = note("local only", at(2));
        put_remote(
            &fake,
            &SyncData {
                categories: vec![],
                notes: vec![shared_old, remote_only.clone()],
                last_sync_time: at(50).timestamp_millis(),
            },
        );

        let mut sync = service(&fake);
        sync.set_strategy(SyncStrategy::PerRecord);
        let result = sync
            .sync(SyncPayload {
                categories: vec![],
                notes: vec![shared_new.clone(), local_only.clone()],
            })
            .unwrap();
        assert_eq!(result.notes, vec![shared_new, remote_only, local_only]);
        assert_eq!(sync.download().unwrap().unwrap().notes, result.notes);
    }

    #[test]
    fn test_merge_tie_keeps_remote() {
        let ours = note("ours", at(4));
        let mut theirs = ours.clone();
        theirs.title = "theirs".to_string();
        let merged = merge_by_id(&[ours], &[theirs.clone()]);
        assert_eq!(merged, vec![theirs]);
    }

    #[test]
    fn test_credentials_cached_and_cleared() {
        let local = Arc::new(LocalStore::in_memory());
        let config = WebDavConfig {
            url: "https://dav.example.com".to_string(),
            username: "me".to_string(),
            password: "pw".to_string(),
        };
        let mut sync = CloudSync::new(Arc::clone(&local));
        sync.init_client(config.clone()).unwrap();
        assert_eq!(sync.state(), SyncState::Configured);

        let restored = CloudSync::new(Arc::clone(&local));
        assert_eq!(restored.state(), SyncState::Configured);
        assert_eq!(restored.config(), Some(config));

        sync.disconnect();
        assert_eq!(sync.state(), SyncState::Uninitialized);
        assert!(!local.contains(WEBDAV_CONFIG_KEY));
    }
}
