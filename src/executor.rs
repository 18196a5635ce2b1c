//! Retry executor.
//!
//! Runs a caller-supplied async operation with bounded retries.
//!
//! Per operation id the executor walks
//! `Idle → Attempting → (Success | AwaitingBackoff → Attempting) → Terminal`:
//! - every submission (re)initializes the id's `RetryState` and starts again at attempt 1;
//! - after each failure the classifier decides whether another attempt is allowed;
//! - backoff waits go through the `Sleeper` and can be cancelled from the control surface;
//! - exactly one terminal outcome per sequence is recorded in the metrics.
//!
//! Invariants:
//! - Attempts for one id never exceed `max_attempts` and never overlap.
//! - A terminal failure returns the last attempt's error untouched.
//! - Cancelled sequences record no metrics outcome.
//!
//! ```rust
//! use rebound::{InstantSleeper, RetryConfig, RetryExecutor};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let executor = RetryExecutor::builder()
//!     .config(RetryConfig::default())
//!     .with_sleeper(InstantSleeper)
//!     .build();
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let result = executor
//!     .execute_as("fetch-profile", || {
//!         let calls = calls.clone();
//!         async move {
//!             if calls.fetch_add(1, Ordering::SeqCst) == 0 {
//!                 Err("503 service unavailable".to_string())
//!             } else {
//!                 Ok("profile")
//!             }
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(result.unwrap(), "profile");
//! assert_eq!(executor.retry_info("fetch-profile").unwrap().attempts.len(), 2);
//! # });
//! ```

use crate::backoff::compute_delay;
use crate::classify::should_retry;
use crate::config::RetryConfig;
use crate::error::RetryError;
use crate::jitter::{RandomSource, ThreadRandom};
use crate::metrics::MetricsAggregator;
use crate::sleeper::{Sleeper, TokioSleeper, WakeReason};
use crate::store::{CloseOnDrop, OperationStore};
use crate::telemetry::{deliver, NullSink, RetryEvent, TelemetrySink};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Executes operations with retries, tracking per-id state and global metrics.
///
/// Cheap to clone; clones share the state store and metrics.
#[derive(Clone)]
pub struct RetryExecutor<S = NullSink> {
    pub(crate) config: RetryConfig,
    random: Arc<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
    pub(crate) store: OperationStore,
    pub(crate) metrics: MetricsAggregator,
    sink: S,
}

impl<S> std::fmt::Debug for RetryExecutor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .field("random", &self.random)
            .field("sleeper", &self.sleeper)
            .field("operations", &self.store.len())
            .field("sink", &"<sink>")
            .finish()
    }
}

impl RetryExecutor<NullSink> {
    /// Executor with the given config and production defaults.
    pub fn new(config: RetryConfig) -> Self {
        RetryExecutorBuilder::new().config(config).build()
    }

    pub fn builder() -> RetryExecutorBuilder<NullSink> {
        RetryExecutorBuilder::new()
    }
}

impl Default for RetryExecutor<NullSink> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<S> RetryExecutor<S> {
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S> RetryExecutor<S>
where
    S: tower::Service<RetryEvent, Response = ()> + Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    /// Execute `operation` under a freshly generated operation id.
    pub async fn execute<T, E, Fut, Op>(&self, operation: Op) -> Result<T, RetryError<E>>
    where
        T: Send,
        E: Display + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        let operation_id = format!("op-{}", uuid::Uuid::new_v4());
        self.execute_as(operation_id, operation).await
    }

    /// Execute `operation` under `operation_id`, discarding any earlier history for that id.
    pub async fn execute_as<T, E, Fut, Op>(
        &self,
        operation_id: impl Into<String>,
        mut operation: Op,
    ) -> Result<T, RetryError<E>>
    where
        T: Send,
        E: Display + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        let operation_id = operation_id.into();
        let entry = self.store.begin(&operation_id);
        let _close_on_drop = CloseOnDrop(entry.clone());
        let started = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            entry.update(|state| state.begin_attempt(attempt));
            debug!(
                target: "rebound::executor",
                operation_id = %operation_id,
                attempt,
                "attempt started"
            );
            self.emit(RetryEvent::AttemptStarted { operation_id: operation_id.clone(), attempt })
                .await;

            let attempt_started = Instant::now();
            let outcome = operation().await;
            let attempt_elapsed = attempt_started.elapsed();

            let err = match outcome {
                Ok(value) => {
                    entry.update(|state| state.resolve_success(attempt_elapsed));
                    let total_duration = started.elapsed();
                    self.metrics.record_success(total_duration);
                    if attempt > 1 {
                        info!(
                            target: "rebound::executor",
                            operation_id = %operation_id,
                            attempts = attempt,
                            elapsed_ms = total_duration.as_millis() as u64,
                            "operation succeeded after retry"
                        );
                    }
                    self.emit(RetryEvent::Succeeded {
                        operation_id: operation_id.clone(),
                        attempts: attempt,
                        total_duration,
                    })
                    .await;
                    return Ok(value);
                }
                Err(err) => err,
            };

            let message = err.to_string();
            entry.update(|state| state.resolve_failure(attempt_elapsed, message.clone()));

            if !should_retry(&message, attempt, &self.config) {
                entry.update(|state| state.can_retry = false);
                let total_duration = started.elapsed();
                let category = self.metrics.record_failure(total_duration, &message);
                warn!(
                    target: "rebound::executor",
                    operation_id = %operation_id,
                    attempts = attempt,
                    category = %category,
                    elapsed_ms = total_duration.as_millis() as u64,
                    error = %message,
                    "operation failed"
                );
                self.emit(RetryEvent::Failed {
                    operation_id: operation_id.clone(),
                    attempts: attempt,
                    category,
                    total_duration,
                })
                .await;
                return Err(RetryError::Inner(err));
            }

            // cancelled while the attempt was in flight: schedule nothing
            let wake = if entry.backoff().is_cancelled() {
                WakeReason::Cancelled
            } else {
                let delay = compute_delay(attempt, &self.config, self.random.as_ref());
                entry.update(|state| state.schedule_retry(delay));
                debug!(
                    target: "rebound::executor",
                    operation_id = %operation_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "retry scheduled"
                );
                self.emit(RetryEvent::BackoffScheduled {
                    operation_id: operation_id.clone(),
                    attempt,
                    delay,
                })
                .await;
                entry.backoff().wait(self.sleeper.as_ref(), delay).await
            };

            if wake == WakeReason::Cancelled {
                entry.update(|state| state.close());
                warn!(
                    target: "rebound::executor",
                    operation_id = %operation_id,
                    attempts = attempt,
                    "retry cancelled"
                );
                self.emit(RetryEvent::Cancelled {
                    operation_id: operation_id.clone(),
                    attempts: attempt,
                })
                .await;
                return Err(RetryError::Cancelled {
                    operation_id,
                    attempts: attempt,
                    last_error: err,
                });
            }
        }
    }

    async fn emit(&self, event: RetryEvent) {
        deliver(&self.sink, event).await;
    }
}

/// Builder for `RetryExecutor`.
pub struct RetryExecutorBuilder<S = NullSink> {
    config: RetryConfig,
    random: Arc<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
    store: OperationStore,
    metrics: MetricsAggregator,
    sink: S,
}

impl RetryExecutorBuilder<NullSink> {
    /// Create a builder with defaults: default config, thread RNG, tokio timers, no telemetry.
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
            random: Arc::new(ThreadRandom),
            sleeper: Arc::new(TokioSleeper),
            store: OperationStore::new(),
            metrics: MetricsAggregator::new(),
            sink: NullSink,
        }
    }
}

impl Default for RetryExecutorBuilder<NullSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RetryExecutorBuilder<S> {
    pub fn config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide the randomness used for jitter.
    pub fn with_random<R>(mut self, random: R) -> Self
    where
        R: RandomSource + 'static,
    {
        self.random = Arc::new(random);
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<Z>(mut self, sleeper: Z) -> Self
    where
        Z: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Share metrics with other executors instead of starting from zero.
    pub fn with_metrics(mut self, metrics: MetricsAggregator) -> Self {
        self.metrics = metrics;
        self
    }

    /// Share a state store with other executors.
    pub fn with_store(mut self, store: OperationStore) -> Self {
        self.store = store;
        self
    }

    /// Route retry events to `sink`.
    pub fn with_sink<T>(self, sink: T) -> RetryExecutorBuilder<T>
    where
        T: TelemetrySink,
    {
        RetryExecutorBuilder {
            config: self.config,
            random: self.random,
            sleeper: self.sleeper,
            store: self.store,
            metrics: self.metrics,
            sink,
        }
    }

    pub fn build(self) -> RetryExecutor<S> {
        RetryExecutor {
            config: self.config,
            random: self.random,
            sleeper: self.sleeper,
            store: self.store,
            metrics: self.metrics,
            sink: self.sink,
        }
    }
}
