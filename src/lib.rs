#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Rebound
//!
//! Adaptive retry execution for async Rust: run an unreliable operation with bounded retries,
//! exponential backoff with jitter, per-operation state tracking, cancellation, and running
//! performance metrics.
//!
//! ## Features
//!
//! - **Bounded retries** with exponential backoff, a delay ceiling, and symmetric jitter
//! - **Error classification** from error messages (timeout, network, auth, rate limit, 5xx, 4xx)
//! - **Per-operation state** (attempt history, pending delay, retry eligibility) keyed by id
//! - **Cancellation** of pending backoff waits, per id or all at once
//! - **Metrics** over terminal outcomes: success rate, mean response time, failure categories
//! - **Injectable seams** for randomness, sleeping, and telemetry sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use rebound::{RetryConfig, RetryExecutor};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = RetryExecutor::new(
//!         RetryConfig::builder()
//!             .max_attempts(3)
//!             .base_delay(Duration::from_millis(10))
//!             .build()
//!             .unwrap(),
//!     );
//!
//!     let result = executor
//!         .execute_as("load-dashboard", || async {
//!             // Your async operation here
//!             Ok::<_, std::io::Error>(())
//!         })
//!         .await;
//!
//!     assert!(result.is_ok());
//!     assert_eq!(executor.metrics().total_requests, 1);
//! }
//! ```

pub mod backoff;
pub mod classify;
pub mod config;
pub mod control;
pub mod error;
pub mod executor;
pub mod jitter;
pub mod metrics;
pub mod prelude;
pub mod sleeper;
pub mod state;
pub mod store;
pub mod telemetry;

// Re-exports
pub use backoff::{compute_delay, exponential_term};
pub use classify::{classify, should_retry, ErrorCategory};
pub use config::{ConfigError, RetryConfig, RetryConfigBuilder};
pub use control::RetryMonitor;
pub use error::RetryError;
pub use executor::{RetryExecutor, RetryExecutorBuilder};
pub use jitter::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use metrics::{MetricsAggregator, PerformanceMetrics};
pub use sleeper::{BackoffHandle, InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper, WakeReason};
pub use state::{Attempt, RetryState};
pub use store::OperationStore;
