//! Shared state container behind the category, note and tag stores.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::sequencer::{Commit, SaveSequencer};
use crate::{NotebookError, Result};

pub(crate) struct StoreState<R> {
    pub items: Vec<R>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<R> Default for StoreState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error: None,
        }
    }
}

/// A collection snapshot paired with the token it was taken under.
pub(crate) struct Snapshot<R> {
    token: u64,
    items: Vec<R>,
}

impl<R> Snapshot<R> {
    pub fn items(&self) -> &[R] {
        &self.items
    }
}

pub(crate) struct Collection<R> {
    state: Mutex<StoreState<R>>,
    sequencer: SaveSequencer,
}

impl<R: Clone> Collection<R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            sequencer: SaveSequencer::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, StoreState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn items(&self) -> Vec<R> {
        self.lock().items.clone()
    }

    pub fn find<P: Fn(&R) -> bool>(&self, predicate: P) -> Option<R> {
        self.lock().items.iter().find(|r| predicate(r)).cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Replaces the items without persisting and clears loading/error flags.
    pub fn init(&self, items: Vec<R>) {
        let mut state = self.lock();
        state.items = items;
        state.is_loading = false;
        state.error = None;
    }

    /// Applies `f` to the items and snapshots the result under a fresh token.
    pub fn mutate<T, F>(&self, f: F) -> (T, Snapshot<R>)
    where
        F: FnOnce(&mut Vec<R>) -> T,
    {
        let mut state = self.lock();
        let out = f(&mut state.items);
        let snapshot = Snapshot {
            token: self.sequencer.issue(),
            items: state.items.clone(),
        };
        (out, snapshot)
    }

    /// Writes `snapshot` with `save` unless a newer snapshot already landed.
    pub fn persist<F>(&self, snapshot: &Snapshot<R>, save: F) -> Result<Commit>
    where
        F: FnOnce(&[R]) -> Result<()>,
    {
        self.sequencer
            .commit(snapshot.token, || save(&snapshot.items))
    }

    /// Records `err` as the store's error message.
    pub fn fail(&self, context: &str, err: &NotebookError) {
        log::error!("{context}: {err}");
        self.lock().error = Some(err.to_string());
    }

    /// Runs a backend read, tracking `is_loading` and recording failures.
    pub fn load<F>(&self, context: &str, read: F) -> bool
    where
        F: FnOnce() -> Result<Vec<R>>,
    {
        {
            let mut state = self.lock();
            state.is_loading = true;
            state.error = None;
        }
        match read() {
            Ok(items) => {
                let mut state = self.lock();
                state.items = items;
                state.is_loading = false;
                true
            }
            Err(e) => {
                self.fail(context, &e);
                self.lock().is_loading = false;
                false
            }
        }
    }
}
