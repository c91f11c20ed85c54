//! Operation tokens that let a newer collection snapshot supersede an older one.
//!
//! A store takes a token while it holds its state lock and clones the
//! collection, then persists outside the lock via [`SaveSequencer::commit`].
//! Tokens are issued in snapshot order, so a snapshot whose token is older
//! than the last committed one is stale and is skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::Result;

/// Outcome of [`SaveSequencer::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Written,
    Superseded,
}

#[derive(Debug, Default)]
pub struct SaveSequencer {
    next: AtomicU64,
    committed: Mutex<u64>,
}

impl SaveSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next token. Call while the snapshot is being taken.
    pub fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs `persist` unless a newer token has already been committed.
    ///
    /// Commits for one sequencer are serialized. A failing `persist` does not
    /// advance the committed token.
    pub fn commit<F>(&self, token: u64, persist: F) -> Result<Commit>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut committed = self.committed.lock().unwrap_or_else(PoisonError::into_inner);
        if token <= *committed {
            log::debug!("Skipping superseded save (token {token}, committed {committed})");
            return Ok(Commit::Superseded);
        }
        persist()?;
        *committed = token;
        Ok(Commit::Written)
    }

    pub fn last_committed(&self) -> u64 {
        *self.committed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotebookError;

    #[test]
    fn test_tokens_increase() {
        let seq = SaveSequencer::new();
        assert_eq!(seq.issue(), 1);
        assert_eq!(seq.issue(), 2);
    }

    #[test]
    fn test_older_snapshot_is_skipped_after_newer_commit() {
        let seq = SaveSequencer::new();
        let old = seq.issue();
        let new = seq.issue();

        assert_eq!(seq.commit(new, || Ok(())).unwrap(), Commit::Written);
        let mut ran = false;
        let outcome = seq
            .commit(old, || {
                ran = true;
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, Commit::Superseded);
        assert!(!ran);
        assert_eq!(seq.last_committed(), new);
    }

    #[test]
    fn test_failed_persist_does_not_advance() {
        let seq = SaveSequencer::new();
        let token = seq.issue();
        let err = seq
            .commit(token, || Err(NotebookError::ImportFailed))
            .unwrap_err();
        assert!(matches!(err, NotebookError::ImportFailed));
        assert_eq!(seq.last_committed(), 0);
    }
}
