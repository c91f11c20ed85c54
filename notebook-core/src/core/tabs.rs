//! Open-note tabs and the active tab, cached in the local store for session restore.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::LocalStore;

/// Local store key holding the [`TabSession`].
pub const TABS_KEY: &str = "tabs-storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub note_id: String,
    pub title: String,
}

/// Persisted shape of the tab manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSession {
    pub tabs: Vec<Tab>,
    pub active_tab_id: Option<String>,
}

/// Ordered list of open tabs plus the active-tab pointer.
///
/// Tabs keep append order. Every mutation is written to the local store; a
/// failed write is logged and the in-memory state is kept.
pub struct TabManager {
    local: Arc<LocalStore>,
    session: TabSession,
}

impl TabManager {
    /// Restores the previous session from the local store, if any.
    pub fn restore(local: Arc<LocalStore>) -> Self {
        let session = local.get(TABS_KEY).unwrap_or_default();
        Self { local, session }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.session.tabs
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.session.active_tab_id.as_deref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        let id = self.active_tab_id()?;
        self.session.tabs.iter().find(|t| t.id == id)
    }

    pub fn get_tab_by_note_id(&self, note_id: &str) -> Option<&Tab> {
        self.session.tabs.iter().find(|t| t.note_id == note_id)
    }

    /// Opens a tab for `note_id` and makes it active.
    ///
    /// An existing tab for the same note is activated instead of adding a
    /// second one. Returns the id of the active tab.
    pub fn add_tab(&mut self, note_id: &str, title: &str) -> String {
        if let Some(existing) = self.get_tab_by_note_id(note_id) {
            let id = existing.id.clone();
            self.session.active_tab_id = Some(id.clone());
            self.persist();
            return id;
        }

        let id = self.next_tab_id();
        self.session.tabs.push(Tab {
            id: id.clone(),
            note_id: note_id.to_string(),
            title: title.to_string(),
        });
        self.session.active_tab_id = Some(id.clone());
        self.persist();
        id
    }

    /// Closes `tab_id`. If it was active, the tab to its right becomes active,
    /// else the one to its left, else none. Unknown ids are ignored.
    pub fn close_tab(&mut self, tab_id: &str) {
        let Some(index) = self.session.tabs.iter().position(|t| t.id == tab_id) else {
            return;
        };

        if self.active_tab_id() == Some(tab_id) {
            let tabs = &self.session.tabs;
            self.session.active_tab_id = tabs
                .get(index + 1)
                .or_else(|| index.checked_sub(1).and_then(|i| tabs.get(i)))
                .map(|t| t.id.clone());
        }
        self.session.tabs.remove(index);
        self.persist();
    }

    /// Keeps only `tab_id` and activates it. Unknown ids are ignored.
    pub fn close_other_tabs(&mut self, tab_id: &str) {
        let Some(keep) = self.session.tabs.iter().find(|t| t.id == tab_id).cloned() else {
            return;
        };
        self.session = TabSession {
            tabs: vec![keep],
            active_tab_id: Some(tab_id.to_string()),
        };
        self.persist();
    }

    pub fn close_all_tabs(&mut self) {
        self.session = TabSession::default();
        self.persist();
    }

    pub fn activate_tab(&mut self, tab_id: &str) {
        self.session.active_tab_id = Some(tab_id.to_string());
        self.persist();
    }

    pub fn update_tab_title(&mut self, tab_id: &str, title: &str) {
        if let Some(tab) = self.session.tabs.iter_mut().find(|t| t.id == tab_id) {
            tab.title = title.to_string();
            self.persist();
        }
    }

    /// Drops tabs whose note no longer exists.
    pub fn retain_notes<F: Fn(&str) -> bool>(&mut self, note_exists: F) {
        let stale: Vec<String> = self
            .session
            .tabs
            .iter()
            .filter(|t| !note_exists(&t.note_id))
            .map(|t| t.id.clone())
            .collect();
        for id in stale {
            self.close_tab(&id);
        }
    }

    /// `tab-<epoch millis>`, suffixed when two tabs open within the same millisecond.
    fn next_tab_id(&self) -> String {
        let base = format!("tab-{}", chrono::Utc::now().timestamp_millis());
        let taken = |id: &str| self.session.tabs.iter().any(|t| t.id == id);
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn persist(&self) {
        if let Err(e) = self.local.set(TABS_KEY, &self.session) {
            log::warn!("Failed to persist tab session: {e}");
        }
    }
}
