//! Operation state store.
//!
//! Keyed by operation id. Each entry owns its own mutex, so updates to one id never wait on
//! another id's updates; the outer map lock is only taken to look up, insert, or drop entries.
//! No lock is ever held across an `.await`.
//!
//! Submitting an id again replaces its entry with a fresh one. The replaced entry's backoff
//! handle is cancelled so a superseded sequence cannot keep retrying in the background.

use crate::sleeper::BackoffHandle;
use crate::state::RetryState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// One operation id's live state plus the handle that can stop its backoff waits.
#[derive(Debug)]
pub(crate) struct OperationEntry {
    state: Mutex<RetryState>,
    backoff: BackoffHandle,
}

impl OperationEntry {
    fn new(operation_id: &str) -> Self {
        Self { state: Mutex::new(RetryState::new(operation_id)), backoff: BackoffHandle::new() }
    }

    /// Apply `f` to this entry's state atomically.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut RetryState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    pub(crate) fn snapshot(&self) -> RetryState {
        self.update(|state| state.clone())
    }

    pub(crate) fn backoff(&self) -> &BackoffHandle {
        &self.backoff
    }

    /// Stop further attempts: cancel the pending wait and close the state.
    pub(crate) fn cancel(&self) {
        self.backoff.cancel();
        self.update(RetryState::close);
    }
}

/// Closes an attempt sequence's state when the sequence's future goes away.
///
/// Sequences that resolve normally are already closed. One whose future was dropped while
/// attempting or waiting would otherwise stay `can_retry` with a stale `next_retry_in`.
pub(crate) struct CloseOnDrop(pub(crate) Arc<OperationEntry>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        let abandoned = self.0.update(|state| {
            let open = state.can_retry;
            state.close();
            open.then(|| state.operation_id.clone())
        });
        if let Some(operation_id) = abandoned {
            debug!(
                target: "rebound::store",
                operation_id = %operation_id,
                "retry sequence dropped before resolving"
            );
        }
    }
}

/// In-memory, process-local store of `RetryState` per operation id.
#[derive(Debug, Clone, Default)]
pub struct OperationStore {
    inner: Arc<RwLock<HashMap<String, Arc<OperationEntry>>>>,
}

impl OperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh history for `operation_id`, discarding any previous one.
    pub(crate) fn begin(&self, operation_id: &str) -> Arc<OperationEntry> {
        let entry = Arc::new(OperationEntry::new(operation_id));
        let replaced = {
            let mut map = self.inner.write().unwrap_or_else(|p| p.into_inner());
            map.insert(operation_id.to_string(), entry.clone())
        };
        if let Some(previous) = replaced {
            debug!(
                target: "rebound::store",
                operation_id = %operation_id,
                previous_attempts = previous.snapshot().attempts.len(),
                "retry history reset"
            );
            previous.backoff().cancel();
        }
        entry
    }

    fn entry(&self, operation_id: &str) -> Option<Arc<OperationEntry>> {
        let map = self.inner.read().unwrap_or_else(|p| p.into_inner());
        map.get(operation_id).cloned()
    }

    /// Snapshot of one operation's state.
    pub fn get(&self, operation_id: &str) -> Option<RetryState> {
        self.entry(operation_id).map(|entry| entry.snapshot())
    }

    /// Cancel the pending backoff for `operation_id` and close its state.
    /// Returns `false` if the id is unknown.
    pub fn cancel(&self, operation_id: &str) -> bool {
        match self.entry(operation_id) {
            Some(entry) => {
                entry.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending backoff and drop all entries.
    pub fn clear(&self) {
        let drained: Vec<Arc<OperationEntry>> = {
            let mut map = self.inner.write().unwrap_or_else(|p| p.into_inner());
            map.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &drained {
            entry.backoff().cancel();
        }
        debug!(target: "rebound::store", cleared = drained.len(), "retry history cleared");
    }

    /// Snapshot of every state, sorted by operation id.
    pub fn snapshot(&self) -> Vec<RetryState> {
        let entries: Vec<Arc<OperationEntry>> = {
            let map = self.inner.read().unwrap_or_else(|p| p.into_inner());
            map.values().cloned().collect()
        };
        let mut states: Vec<RetryState> = entries.iter().map(|e| e.snapshot()).collect();
        states.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
        states
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).is_empty()
    }
}
