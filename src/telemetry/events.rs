use crate::classify::ErrorCategory;
use std::fmt;
use std::time::Duration;

/// Events emitted by the retry executor.
///
/// Every attempt sequence emits `AttemptStarted` per attempt, `BackoffScheduled` per wait, and
/// exactly one of `Succeeded`, `Failed` or `Cancelled` at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// An attempt is about to call the operation.
    AttemptStarted {
        operation_id: String,
        /// 1-based
        attempt: usize,
    },
    /// A failed attempt will be followed by another one after `delay`.
    BackoffScheduled { operation_id: String, attempt: usize, delay: Duration },
    /// Terminal success.
    Succeeded {
        operation_id: String,
        attempts: usize,
        /// From the first attempt's start to resolution.
        total_duration: Duration,
    },
    /// Terminal failure (non-retryable error or attempts exhausted).
    Failed {
        operation_id: String,
        attempts: usize,
        category: ErrorCategory,
        total_duration: Duration,
    },
    /// The sequence was cancelled; no outcome is recorded in the metrics.
    Cancelled { operation_id: String, attempts: usize },
}

impl RetryEvent {
    pub fn operation_id(&self) -> &str {
        match self {
            RetryEvent::AttemptStarted { operation_id, .. }
            | RetryEvent::BackoffScheduled { operation_id, .. }
            | RetryEvent::Succeeded { operation_id, .. }
            | RetryEvent::Failed { operation_id, .. }
            | RetryEvent::Cancelled { operation_id, .. } => operation_id,
        }
    }

    /// Whether this event ends an attempt sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryEvent::Succeeded { .. } | RetryEvent::Failed { .. } | RetryEvent::Cancelled { .. }
        )
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::AttemptStarted { operation_id: id, attempt } => {
                write!(f, "AttemptStarted(id={id}, attempt={attempt})")
            }
            RetryEvent::BackoffScheduled { operation_id: id, attempt, delay } => write!(
                f,
                "BackoffScheduled(id={id}, after_attempt={attempt}, delay={}ms)",
                delay.as_millis()
            ),
            RetryEvent::Succeeded { operation_id: id, attempts, total_duration } => write!(
                f,
                "Succeeded(id={id}, attempts={attempts}, duration={}ms)",
                total_duration.as_millis()
            ),
            RetryEvent::Failed { operation_id: id, attempts, category, total_duration } => write!(
                f,
                "Failed(id={id}, attempts={attempts}, category={category}, duration={}ms)",
                total_duration.as_millis()
            ),
            RetryEvent::Cancelled { operation_id: id, attempts } => {
                write!(f, "Cancelled(id={id}, attempts={attempts})")
            }
        }
    }
}
