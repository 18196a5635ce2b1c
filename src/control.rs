//! Manual retry, cancellation, and read-only observation.
//!
//! Control operations act on one executor's state store:
//! - `manual_retry` re-runs an operation whose last sequence still allows retrying. The re-run
//!   goes through `execute_as`, so the id's history is discarded and the full attempt budget is
//!   granted again rather than a single extra try.
//! - `cancel_retry` stops scheduling: it wakes a pending backoff wait and closes the state. An
//!   operation call already in flight is left to finish; its result is still reported to the
//!   caller of `execute`, but no further attempt follows.
//! - `clear_all_history` cancels every pending wait and empties the store.
//!
//! Presentation layers get a [`RetryMonitor`], which can read state and metrics but has no
//! way to change them.

use crate::error::RetryError;
use crate::executor::RetryExecutor;
use crate::metrics::{MetricsAggregator, PerformanceMetrics};
use crate::state::RetryState;
use crate::store::OperationStore;
use crate::telemetry::RetryEvent;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info};

impl<S> RetryExecutor<S> {
    /// Snapshot of one operation's state, or `None` if the id is unknown.
    pub fn retry_info(&self, operation_id: &str) -> Option<RetryState> {
        self.store.get(operation_id)
    }

    /// Snapshot of the global metrics.
    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    /// Read-only view sharing this executor's store and metrics.
    pub fn monitor(&self) -> RetryMonitor {
        RetryMonitor { store: self.store.clone(), metrics: self.metrics.clone() }
    }

    /// Stop further attempts for `operation_id`. Returns `false` if the id is unknown.
    pub fn cancel_retry(&self, operation_id: &str) -> bool {
        let found = self.store.cancel(operation_id);
        if found {
            info!(target: "rebound::control", operation_id = %operation_id, "retry cancelled");
        } else {
            debug!(target: "rebound::control", operation_id = %operation_id, "cancel for unknown id");
        }
        found
    }

    /// Cancel every pending wait and forget all retry history. Metrics are kept.
    pub fn clear_all_history(&self) {
        self.store.clear();
    }

    /// Zero the global metrics.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }
}

impl<S> RetryExecutor<S>
where
    S: tower::Service<RetryEvent, Response = ()> + Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    /// Re-run `operation` for an id whose state still allows retrying.
    ///
    /// Returns `None` without calling `operation` when the id is unknown or its state has
    /// `can_retry == false` (succeeded, exhausted, non-retryable, or cancelled).
    pub async fn manual_retry<T, E, Fut, Op>(
        &self,
        operation_id: &str,
        operation: Op,
    ) -> Option<Result<T, RetryError<E>>>
    where
        T: Send,
        E: Display + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        let permitted = self.store.get(operation_id).is_some_and(|state| state.can_retry);
        if !permitted {
            debug!(target: "rebound::control", operation_id = %operation_id, "manual retry refused");
            return None;
        }
        info!(target: "rebound::control", operation_id = %operation_id, "manual retry");
        Some(self.execute_as(operation_id, operation).await)
    }
}

/// Read-only handle onto an executor's retry state and metrics.
#[derive(Debug, Clone)]
pub struct RetryMonitor {
    store: OperationStore,
    metrics: MetricsAggregator,
}

impl RetryMonitor {
    pub fn retry_info(&self, operation_id: &str) -> Option<RetryState> {
        self.store.get(operation_id)
    }

    /// Every known state, sorted by operation id.
    pub fn states(&self) -> Vec<RetryState> {
        self.store.snapshot()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }
}
