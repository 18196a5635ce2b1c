//! Error classifier.
//!
//! Failures are categorized from their rendered message alone; the engine never looks at error
//! types. Matching is case-insensitive and follows a fixed precedence:
//!
//! 1. `Timeout`: "timeout", "timed out"
//! 2. `Network`: "network", "connection refused/reset", "econnrefused", "fetch failed"
//! 3. `Auth`: status 401/403, "unauthorized", "forbidden"
//! 4. `RateLimit`: status 429, "rate limit", "too many requests"
//! 5. `ServerError`: any 5xx status, "server error", "service unavailable", "bad gateway"
//! 6. `ClientError`: any other 4xx status, "bad request", "not found"
//! 7. `Unknown`: everything else
//!
//! Status codes are recognised as runs of exactly three digits, whatever surrounds them, so
//! `"HTTP 503"`, `"HTTP403"` and `"E429_limit"` all match while `"request id 15034"` does not.
//!
//! Retry eligibility: `Auth` and `ClientError` are final; every other category is retried while
//! attempts remain. `Unknown` is retried on purpose so transient oddities are not dropped.

use crate::config::RetryConfig;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run pattern compiles"));

/// Category assigned to a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorCategory {
    Timeout,
    Network,
    Auth,
    RateLimit,
    ServerError,
    ClientError,
    Unknown,
}

impl ErrorCategory {
    /// Stable snake_case label, used for logs and metrics keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Whether this category is eligible for another attempt, ignoring the attempt budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::Auth | ErrorCategory::ClientError)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn status_codes(message: &str) -> impl Iterator<Item = u16> + '_ {
    DIGIT_RUN
        .find_iter(message)
        .filter(|run| run.len() == 3)
        .filter_map(|run| run.as_str().parse::<u16>().ok())
        .filter(|code| (400..600).contains(code))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Categorize an error message.
pub fn classify(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    let codes: Vec<u16> = status_codes(&lower).collect();
    let has_code = |pred: fn(u16) -> bool| codes.iter().copied().any(pred);

    if contains_any(&lower, &["timeout", "timed out"]) {
        return ErrorCategory::Timeout;
    }
    if contains_any(
        &lower,
        &["network", "connection refused", "connection reset", "econnrefused", "fetch failed"],
    ) {
        return ErrorCategory::Network;
    }
    if has_code(|c| c == 401 || c == 403) || contains_any(&lower, &["unauthorized", "forbidden"]) {
        return ErrorCategory::Auth;
    }
    if has_code(|c| c == 429) || contains_any(&lower, &["rate limit", "too many requests"]) {
        return ErrorCategory::RateLimit;
    }
    if has_code(|c| (500..600).contains(&c))
        || contains_any(&lower, &["server error", "service unavailable", "bad gateway"])
    {
        return ErrorCategory::ServerError;
    }
    if has_code(|c| (400..500).contains(&c)) || contains_any(&lower, &["bad request", "not found"])
    {
        return ErrorCategory::ClientError;
    }
    ErrorCategory::Unknown
}

/// Decide whether attempt `attempt` (1-based) that failed with `message` may be followed by
/// another attempt.
pub fn should_retry(message: &str, attempt: usize, config: &RetryConfig) -> bool {
    if attempt >= config.max_attempts() {
        return false;
    }
    classify(message).is_retryable()
}
