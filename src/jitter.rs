//! Jitter and the randomness seam behind it.
//!
//! Jitter spreads retries from many concurrent callers so they don't hit a recovering
//! service in lockstep. A delay `d` is perturbed by a uniform value in
//! `[-0.5, +0.5) * ratio * d`, so the result stays within `d * (1 ± ratio/2)`.
//!
//! Randomness is injected through [`RandomSource`]:
//! - `ThreadRandom`: `rand`'s thread-local RNG; the production default.
//! - `SeededRandom`: reproducible `StdRng` stream for tests and simulations.
//! - `FixedRandom`: always returns the same sample; handy for pinning exact delays.
//!
//! ```rust
//! use rebound::jitter::{apply_jitter, FixedRandom};
//!
//! // A sample of 0.5 sits in the middle of the range, i.e. no perturbation.
//! assert_eq!(apply_jitter(1000.0, 0.1, &FixedRandom::new(0.5)), 1000.0);
//! // The smallest sample pulls the delay down by ratio/2.
//! assert_eq!(apply_jitter(1000.0, 0.1, &FixedRandom::new(0.0)), 950.0);
//! ```

use rand::rngs::StdRng;
use rand::{rng, Rng, SeedableRng};
use std::sync::Mutex;

/// Source of uniform samples in `[0, 1)`.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    fn next_unit(&self) -> f64;
}

/// Production source backed by `rand::rng()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rng().random::<f64>()
    }
}

/// Deterministic source seeded once; successive calls walk the same stream.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random::<f64>()
    }
}

/// Source that returns the same sample forever. Values are clamped into `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(f64);

impl FixedRandom {
    pub fn new(sample: f64) -> Self {
        let sample = if sample.is_finite() { sample } else { 0.5 };
        Self(sample.clamp(0.0, 1.0 - f64::EPSILON))
    }
}

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// Perturb `delay_ms` by `[-0.5, +0.5) * ratio * delay_ms`, floored at zero.
pub fn apply_jitter(delay_ms: f64, ratio: f64, random: &dyn RandomSource) -> f64 {
    if ratio <= 0.0 || delay_ms <= 0.0 {
        return delay_ms.max(0.0);
    }
    let offset = (random.next_unit() - 0.5) * ratio * delay_ms;
    (delay_ms + offset).max(0.0)
}
