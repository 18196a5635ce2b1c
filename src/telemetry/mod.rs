//! Telemetry for retry execution.
//!
//! The executor emits a structured [`RetryEvent`] at each step of an attempt sequence. Events
//! flow into a [`TelemetrySink`], which is any `tower::Service<RetryEvent>`, so sinks compose
//! with ordinary tower combinators. A failing sink never changes a retry outcome.
//!
//! ```rust
//! use rebound::telemetry::RetryEvent;
//! use std::time::Duration;
//!
//! let event = RetryEvent::BackoffScheduled {
//!     operation_id: "op-1".into(),
//!     attempt: 1,
//!     delay: Duration::from_millis(950),
//! };
//! assert_eq!(event.operation_id(), "op-1");
//! ```

pub mod events;
pub mod sinks;

pub use events::RetryEvent;
pub use sinks::{LogSink, MemorySink, NullSink, TelemetrySink};
pub(crate) use sinks::deliver;
