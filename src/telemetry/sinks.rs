//! Event sinks.
//!
//! Any `tower::Service<RetryEvent, Response = ()>` that is `Clone + Send + Sync` can receive
//! events. Delivery is one `oneshot` per event; a sink that errors loses that event and the
//! loss is logged at debug level.

use super::events::RetryEvent;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};

/// Services that can be handed to [`RetryExecutorBuilder::with_sink`](crate::RetryExecutorBuilder::with_sink).
pub trait TelemetrySink: Service<RetryEvent, Response = ()> + Clone + Send + Sync + 'static {}

impl<T> TelemetrySink for T where T: Service<RetryEvent, Response = ()> + Clone + Send + Sync + 'static
{}

pub(crate) async fn deliver<S>(sink: &S, event: RetryEvent)
where
    S: Service<RetryEvent, Response = ()> + Clone,
    S::Error: std::fmt::Display,
{
    let operation_id = event.operation_id().to_string();
    if let Err(err) = sink.clone().oneshot(event).await {
        debug!(
            target: "rebound::telemetry",
            operation_id = %operation_id,
            error = %err,
            "telemetry event dropped"
        );
    }
}

/// Discards every event. The executor's default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl Service<RetryEvent> for NullSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: RetryEvent) -> Self::Future {
        ready(Ok(()))
    }
}

/// Writes each event to `tracing` under target `rebound::telemetry`.
///
/// Terminal failures and cancellations log at `warn`, everything else at `info`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl Service<RetryEvent> for LogSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RetryEvent) -> Self::Future {
        let operation_id = event.operation_id();
        match &event {
            RetryEvent::Failed { .. } | RetryEvent::Cancelled { .. } => {
                warn!(target: "rebound::telemetry", operation_id = %operation_id, "{event}")
            }
            _ => info!(target: "rebound::telemetry", operation_id = %operation_id, "{event}"),
        }
        ready(Ok(()))
    }
}

#[derive(Debug, Default)]
struct Journal {
    events: VecDeque<RetryEvent>,
    // sequence number of `events[0]`
    first_seq: u64,
    by_id: HashMap<String, VecDeque<u64>>,
    evicted: u64,
}

impl Journal {
    fn push(&mut self, event: RetryEvent, capacity: usize) {
        if self.events.len() >= capacity {
            if let Some(oldest) = self.events.pop_front() {
                let id = oldest.operation_id();
                let emptied = match self.by_id.get_mut(id) {
                    Some(seqs) => {
                        seqs.pop_front();
                        seqs.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    self.by_id.remove(id);
                }
                self.first_seq += 1;
                self.evicted += 1;
            }
        }
        let seq = self.first_seq + self.events.len() as u64;
        self.by_id.entry(event.operation_id().to_string()).or_default().push_back(seq);
        self.events.push_back(event);
    }

    fn for_id(&self, operation_id: &str) -> Vec<RetryEvent> {
        let Some(seqs) = self.by_id.get(operation_id) else {
            return Vec::new();
        };
        seqs.iter()
            .filter_map(|seq| self.events.get((seq - self.first_seq) as usize))
            .cloned()
            .collect()
    }
}

/// Keeps the most recent `capacity` events in memory, indexed by operation id.
///
/// Once full, each new event evicts the oldest one. Clones share the same buffer.
#[derive(Clone, Debug)]
pub struct MemorySink {
    journal: Arc<Mutex<Journal>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { journal: Arc::new(Mutex::new(Journal::default())), capacity: capacity.max(1) }
    }

    fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> Vec<RetryEvent> {
        self.journal().events.iter().cloned().collect()
    }

    /// Retained events for one operation id, oldest first.
    pub fn events_for(&self, operation_id: &str) -> Vec<RetryEvent> {
        self.journal().for_id(operation_id)
    }

    pub fn len(&self) -> usize {
        self.journal().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal().events.is_empty()
    }

    /// Events dropped to make room since creation.
    pub fn evicted(&self) -> u64 {
        self.journal().evicted
    }

    /// Drop retained events; the eviction count is kept.
    pub fn clear(&self) {
        let mut journal = self.journal();
        let evicted = journal.evicted;
        *journal = Journal { evicted, ..Journal::default() };
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<RetryEvent> for MemorySink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RetryEvent) -> Self::Future {
        self.journal().push(event, self.capacity);
        ready(Ok(()))
    }
}
