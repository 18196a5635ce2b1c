//! Retry configuration.
//!
//! `RetryConfig` is immutable once built; every executor owns one. Defaults:
//!
//! | option | default |
//! |---|---|
//! | `max_attempts` | 3 |
//! | `base_delay` | 1000 ms |
//! | `max_delay` | 10000 ms |
//! | `backoff_multiplier` | 2.0 |
//! | `jitter_ratio` | 0.1 |
//!
//! ```rust
//! use rebound::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig::builder()
//!     .max_attempts(5)
//!     .base_delay(Duration::from_millis(250))
//!     .max_delay(Duration::from_secs(4))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_attempts(), 5);
//! assert_eq!(config.backoff_multiplier(), 2.0);
//! ```

use std::time::Duration;

/// Errors produced while building a `RetryConfig`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `max_attempts` must be at least 1.
    #[error("max_attempts must be > 0 (got {0})")]
    InvalidMaxAttempts(usize),
    /// `jitter_ratio` must be a finite value in `[0, 1]`.
    #[error("jitter_ratio must be within [0, 1] (got {0})")]
    InvalidJitterRatio(f64),
    /// `backoff_multiplier` must be finite and >= 1.
    #[error("backoff_multiplier must be finite and >= 1.0 (got {0})")]
    InvalidMultiplier(f64),
    /// `max_delay` is below `base_delay`.
    #[error("max_delay ({max:?}) must be >= base_delay ({base:?})")]
    MaxLessThanBase { base: Duration, max: Duration },
}

/// Immutable retry configuration supplied at executor construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "UncheckedConfig"))]
pub struct RetryConfig {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    jitter_ratio: f64,
}

// Deserialized configs go through the same validation as the builder.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct UncheckedConfig {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    jitter_ratio: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<UncheckedConfig> for RetryConfig {
    type Error = ConfigError;

    fn try_from(raw: UncheckedConfig) -> Result<Self, Self::Error> {
        let config = RetryConfig {
            max_attempts: raw.max_attempts,
            base_delay: raw.base_delay,
            max_delay: raw.max_delay,
            backoff_multiplier: raw.backoff_multiplier,
            jitter_ratio: raw.jitter_ratio,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            jitter_ratio: 0.1,
        }
    }
}

impl RetryConfig {
    /// Start a builder seeded with the defaults.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Total attempts allowed per sequence (initial try + retries).
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Ceiling applied to the exponential term.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Exponential growth factor.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Fraction of each delay that is randomized.
    pub fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    /// Check the invariants `build()` enforces. Useful after deserializing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(self.max_attempts));
        }
        if !self.jitter_ratio.is_finite() || !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(ConfigError::InvalidJitterRatio(self.jitter_ratio));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier(self.backoff_multiplier));
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::MaxLessThanBase {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

/// Builder for `RetryConfig`.
#[derive(Debug, Clone)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Create a builder with the documented defaults.
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the initial backoff.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Set the backoff ceiling.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Set the exponential growth factor.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    /// Set the jitter ratio; `0.0` disables jitter.
    pub fn jitter_ratio(mut self, ratio: f64) -> Self {
        self.config.jitter_ratio = ratio;
        self
    }

    /// Build the configuration, validating inputs.
    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
