//! Backoff suspension.
//!
//! [`Sleeper`] decides how a delay elapses (tokio timers in production, instant or recording
//! sleepers in tests). [`BackoffHandle`] makes a wait cancellable: the executor parks on
//! `wait`, and `cancel` from any other task wakes it early with [`WakeReason::Cancelled`].
//! Cancelling only pre-empts the timer; it never touches an operation call already in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Abstraction for sleeping/waiting.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper using tokio timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Completes every wait immediately; backoff is computed and recorded but never slept.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(std::future::ready(()))
    }
}

/// Records every backoff delay it is asked for, in order, and completes immediately.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested delays, oldest first.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(duration);
        Box::pin(std::future::ready(()))
    }
}

/// Why a backoff wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    Elapsed,
    Cancelled,
}

/// Cancellable handle for the backoff waits of one attempt sequence.
///
/// Once cancelled, the handle stays cancelled: the current wait ends immediately and every
/// later wait returns `Cancelled` without sleeping.
#[derive(Debug, Clone, Default)]
pub struct BackoffHandle {
    token: CancellationToken,
}

impl BackoffHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-empt the pending wait, if any, and refuse future ones.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sleep for `delay` via `sleeper`, unless cancelled first.
    pub async fn wait(&self, sleeper: &dyn Sleeper, delay: Duration) -> WakeReason {
        if self.token.is_cancelled() {
            return WakeReason::Cancelled;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => WakeReason::Cancelled,
            _ = sleeper.sleep(delay) => WakeReason::Elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn instant_sleeper_doesnt_sleep() {
        let sleeper = InstantSleeper;
        let start = std::time::Instant::now();
        sleeper.sleep(Duration::from_secs(10)).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn tracking_sleeper_records_calls() {
        let sleeper = TrackingSleeper::new();

        sleeper.sleep(Duration::from_millis(100)).await;
        sleeper.sleep(Duration::from_millis(200)).await;

        assert_eq!(sleeper.call_count(), 2);
        assert_eq!(sleeper.calls(), vec![Duration::from_millis(100), Duration::from_millis(200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_waits_for_the_delay() {
        let sleeper = TokioSleeper;
        let start = tokio::time::Instant::now();
        sleeper.sleep(Duration::from_millis(50)).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_elapses_without_cancel() {
        let handle = BackoffHandle::new();
        let reason = handle.wait(&TokioSleeper, Duration::from_millis(200)).await;
        assert_eq!(reason, WakeReason::Elapsed);
        assert!(!handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_preempts_pending_wait() {
        let handle = BackoffHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move {
            waiter.wait(&TokioSleeper, Duration::from_secs(3600)).await
        });

        tokio::task::yield_now().await;
        handle.cancel();

        let reason = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("wait should end promptly")
            .expect("task should not panic");
        assert_eq!(reason, WakeReason::Cancelled);
    }

    #[tokio::test]
    async fn cancelled_handle_skips_later_waits() {
        let sleeper = TrackingSleeper::new();
        let handle = BackoffHandle::new();
        handle.cancel();
        assert_eq!(handle.wait(&sleeper, Duration::from_secs(1)).await, WakeReason::Cancelled);
        assert_eq!(sleeper.call_count(), 0, "no sleep should be scheduled");
    }
}
