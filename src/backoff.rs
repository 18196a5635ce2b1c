//! Backoff calculator.
//!
//! Attempt semantics: `attempt` is the 1-based number of the attempt that just failed, so the
//! wait after the first failure is `compute_delay(1, ..)` and equals `base_delay` before jitter.
//!
//! - Exponential term: `base_delay * multiplier^(attempt - 1)`, capped at `max_delay`.
//! - Jitter: uniform perturbation in `[-0.5, +0.5] * jitter_ratio * term` (see [`crate::jitter`]).
//! - The result is never negative and never exceeds `max_delay * (1 + jitter_ratio / 2)`.
//!
//! ```rust
//! use rebound::backoff::{compute_delay, exponential_term};
//! use rebound::jitter::FixedRandom;
//! use rebound::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig::default();
//! assert_eq!(exponential_term(1, &config), Duration::from_millis(1000));
//! assert_eq!(exponential_term(3, &config), Duration::from_millis(4000));
//! assert_eq!(exponential_term(10, &config), Duration::from_millis(10_000)); // capped
//!
//! let centered = FixedRandom::new(0.5);
//! assert_eq!(compute_delay(2, &config, &centered), Duration::from_millis(2000));
//! ```

use crate::config::RetryConfig;
use crate::jitter::{apply_jitter, RandomSource};
use std::time::Duration;

fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

// Rounds to the nearest nanosecond; out-of-range values fall back to the cap.
fn from_millis_f64(millis: f64, fallback: Duration) -> Duration {
    let nanos = (millis * 1_000_000.0).round();
    if !nanos.is_finite() || nanos < 0.0 || nanos >= u64::MAX as f64 {
        return fallback;
    }
    Duration::from_nanos(nanos as u64)
}

fn exponential_millis(attempt: usize, config: &RetryConfig) -> f64 {
    // powi takes i32; anything past that has long since hit the cap
    let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
    let base = as_millis_f64(config.base_delay());
    let cap = as_millis_f64(config.max_delay());
    let term = base * config.backoff_multiplier().powi(exponent);
    if term.is_nan() {
        return cap;
    }
    term.min(cap)
}

/// The unjittered delay for `attempt`, capped at `max_delay`.
pub fn exponential_term(attempt: usize, config: &RetryConfig) -> Duration {
    from_millis_f64(exponential_millis(attempt, config), config.max_delay())
}

/// Delay to wait after `attempt` failed, with jitter drawn from `random`.
pub fn compute_delay(attempt: usize, config: &RetryConfig, random: &dyn RandomSource) -> Duration {
    let term = exponential_millis(attempt, config);
    let jittered = apply_jitter(term, config.jitter_ratio(), random);
    from_millis_f64(jittered, config.max_delay())
}
