//! Per-user sync overlap guard
//!
//! Two sync runs for the same user racing each other could both observe a
//! task without a correlation id and both create an event for it. The
//! guard enforces at-most-one in-flight reconciliation per user; runs for
//! different users are independent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks which users currently have a sync run in flight.
#[derive(Debug, Default)]
pub struct SyncGuard {
    active: Mutex<HashSet<String>>,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to begin a run for `user_id`. Returns `None` when a run is
    /// already in flight; the permit releases the slot on drop.
    pub fn try_acquire(self: &Arc<Self>, user_id: &str) -> Option<SyncPermit> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(user_id.to_string()) {
            return None;
        }
        Some(SyncPermit { guard: Arc::clone(self), user_id: user_id.to_string() })
    }
}

/// Held for the duration of one user's reconciliation run.
#[derive(Debug)]
pub struct SyncPermit {
    guard: Arc<SyncGuard>,
    user_id: String,
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        let mut active = self.guard.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.remove(&self.user_id);
    }
}
