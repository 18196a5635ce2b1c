//! Process-wide performance metrics.
//!
//! One outcome is recorded per terminal result (success or final failure), never per attempt.
//! The aggregator keeps exact counters (outcome count, success count, summed `Duration`) and
//! derives `success_rate` and `average_response_time_ms` from them on read. That makes the
//! running values identical to a recomputation over the full outcome history, with no drift
//! from repeated floating-point re-weighting.

use crate::classify::{classify, ErrorCategory};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Read-only snapshot of the global metrics.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PerformanceMetrics {
    /// Terminal outcomes recorded, not attempts.
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// In `[0, 1]`; `0.0` before any outcome.
    pub success_rate: f64,
    /// Mean wall-clock time from first attempt to terminal resolution.
    pub average_response_time_ms: f64,
    /// Terminal failures only.
    pub error_categories: BTreeMap<ErrorCategory, u64>,
}

#[derive(Debug, Default)]
struct Tally {
    total: u64,
    successes: u64,
    total_duration: Duration,
    categories: BTreeMap<ErrorCategory, u64>,
}

impl Tally {
    fn snapshot(&self) -> PerformanceMetrics {
        let (success_rate, average_response_time_ms) = if self.total == 0 {
            (0.0, 0.0)
        } else {
            let total = self.total as f64;
            (
                self.successes as f64 / total,
                self.total_duration.as_secs_f64() * 1000.0 / total,
            )
        };
        PerformanceMetrics {
            total_requests: self.total,
            successful_requests: self.successes,
            failed_requests: self.total - self.successes,
            success_rate,
            average_response_time_ms,
            error_categories: self.categories.clone(),
        }
    }
}

/// Shared aggregator; clones observe and update the same counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    inner: Arc<Mutex<Tally>>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one terminal outcome. Failures are classified from `error_message` (an absent
    /// message counts as `Unknown`); the category is returned for failures.
    pub fn record_outcome(
        &self,
        success: bool,
        duration: Duration,
        error_message: Option<&str>,
    ) -> Option<ErrorCategory> {
        let category = (!success).then(|| classify(error_message.unwrap_or_default()));
        let mut tally = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        tally.total += 1;
        if success {
            tally.successes += 1;
        }
        tally.total_duration = tally.total_duration.saturating_add(duration);
        if let Some(category) = category {
            *tally.categories.entry(category).or_insert(0) += 1;
        }
        category
    }

    pub fn record_success(&self, duration: Duration) {
        self.record_outcome(true, duration, None);
    }

    pub fn record_failure(&self, duration: Duration, error_message: &str) -> ErrorCategory {
        self.record_outcome(false, duration, Some(error_message)).unwrap_or(ErrorCategory::Unknown)
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).snapshot()
    }

    /// Zero every counter.
    pub fn reset(&self) {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = Tally::default();
    }
}
