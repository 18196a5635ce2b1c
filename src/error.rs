//! Error types for the retry executor.
//!
//! Terminal failures surface the operation's own error untouched inside `RetryError::Inner`.
//! Errors from earlier attempts are kept only as messages in the attempt history.

/// Error returned by `RetryExecutor::execute` and friends.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError<E> {
    /// The final attempt failed, either because attempts ran out or because the error was not
    /// retryable. Holds exactly the error that attempt produced.
    #[error("{0}")]
    Inner(E),
    /// The sequence was cancelled before another attempt could be scheduled.
    #[error("operation '{operation_id}' cancelled after {attempts} attempt(s); last error: {last_error}")]
    Cancelled { operation_id: String, attempts: usize, last_error: E },
}

impl<E> RetryError<E> {
    /// Check if the sequence was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Get the inner error if this is a terminal failure.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Cancelled { .. } => None,
        }
    }

    /// Borrow the inner error if this is a terminal failure.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Cancelled { .. } => None,
        }
    }

    /// The error of the last attempt that ran, whichever way the sequence ended.
    pub fn last_error(&self) -> &E {
        match self {
            Self::Inner(e) => e,
            Self::Cancelled { last_error, .. } => last_error,
        }
    }

    /// Consume into the last attempt's error.
    pub fn into_last_error(self) -> E {
        match self {
            Self::Inner(e) => e,
            Self::Cancelled { last_error, .. } => last_error,
        }
    }
}
