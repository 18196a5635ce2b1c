//! Per-operation retry history.
//!
//! `RetryState` values handed out by the store and monitor are snapshots: mutating one has no
//! effect on the engine.

use std::time::{Duration, SystemTime};

/// One try of one operation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attempt {
    /// 1-based position in the sequence.
    pub attempt_number: usize,
    pub started_at: SystemTime,
    /// `None` until the attempt resolves.
    pub duration: Option<Duration>,
    pub error_message: Option<String>,
    pub succeeded: bool,
}

impl Attempt {
    fn started(attempt_number: usize) -> Self {
        Self {
            attempt_number,
            started_at: SystemTime::now(),
            duration: None,
            error_message: None,
            succeeded: false,
        }
    }

    /// Whether the attempt has resolved either way.
    pub fn is_resolved(&self) -> bool {
        self.duration.is_some()
    }
}

/// Retry history for one operation id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RetryState {
    pub operation_id: String,
    /// Chronological; never longer than `max_attempts`.
    pub attempts: Vec<Attempt>,
    /// True only while attempt 2+ is in flight.
    pub is_retrying: bool,
    /// Set while a backoff wait is pending.
    pub next_retry_in: Option<Duration>,
    /// Cleared for good on success, exhaustion, a final error, or cancellation.
    pub can_retry: bool,
}

impl RetryState {
    pub(crate) fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            attempts: Vec::new(),
            is_retrying: false,
            next_retry_in: None,
            can_retry: true,
        }
    }

    /// The most recent attempt, if any.
    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// Whether any attempt in this sequence succeeded.
    pub fn succeeded(&self) -> bool {
        self.attempts.iter().any(|a| a.succeeded)
    }

    pub(crate) fn begin_attempt(&mut self, attempt_number: usize) {
        self.attempts.push(Attempt::started(attempt_number));
        self.is_retrying = attempt_number > 1;
        self.next_retry_in = None;
    }

    pub(crate) fn resolve_success(&mut self, duration: Duration) {
        if let Some(attempt) = self.attempts.last_mut() {
            attempt.duration = Some(duration);
            attempt.succeeded = true;
        }
        self.is_retrying = false;
        self.can_retry = false;
    }

    pub(crate) fn resolve_failure(&mut self, duration: Duration, message: String) {
        if let Some(attempt) = self.attempts.last_mut() {
            attempt.duration = Some(duration);
            attempt.error_message = Some(message);
            attempt.succeeded = false;
        }
        self.is_retrying = false;
    }

    pub(crate) fn schedule_retry(&mut self, delay: Duration) {
        self.next_retry_in = Some(delay);
    }

    pub(crate) fn close(&mut self) {
        self.is_retrying = false;
        self.next_retry_in = None;
        self.can_retry = false;
    }
}
