//! Convenient re-exports for common Rebound types.
pub use crate::{
    classify::ErrorCategory,
    config::{ConfigError, RetryConfig},
    control::RetryMonitor,
    error::RetryError,
    executor::RetryExecutor,
    jitter::{RandomSource, SeededRandom, ThreadRandom},
    metrics::PerformanceMetrics,
    sleeper::{Sleeper, TokioSleeper},
    state::{Attempt, RetryState},
    telemetry::{LogSink, MemorySink, NullSink, RetryEvent},
};
