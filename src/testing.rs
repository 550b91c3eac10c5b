//! In-memory implementations of every seam, for tests.
//!
//! Backends support fault injection (`fail_with` / `recover`), an optional
//! artificial latency, and expose what they received so tests can assert on
//! side effects without Redis, PostgreSQL or Kafka.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use opentelemetry::Context;

use crate::backends::{BackendError, Backends, CounterStore, QueuePublisher, RecordStore};
use crate::observability::tracing::{random_trace_id, trace_id_of};
use crate::observability::{
    LogSink, MetricsRegistry, ProcessedLog, Span, SpanStatus, TraceId, Tracer,
};
use crate::workflow::{AccessRecord, QueueMessage};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared fault switch and latency for a fake backend.
#[derive(Debug, Default)]
struct Behaviour {
    fault: Mutex<Option<String>>,
    delay_ms: AtomicU64,
}

impl Behaviour {
    async fn apply(&self) -> Result<(), BackendError> {
        let delay = self.delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let fault = lock(&self.fault).clone();
        match fault {
            Some(message) => Err(BackendError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

macro_rules! fault_controls {
    ($ty:ty) => {
        impl $ty {
            /// Make every subsequent call fail with `message`.
            pub fn fail_with(&self, message: impl Into<String>) {
                *lock(&self.behaviour.fault) = Some(message.into());
            }

            /// Clear an injected fault.
            pub fn recover(&self) {
                *lock(&self.behaviour.fault) = None;
            }

            /// Delay every call by `delay`.
            pub fn set_delay(&self, delay: Duration) {
                self.behaviour
                    .delay_ms
                    .store(delay.as_millis() as u64, Ordering::Relaxed);
            }

            /// Number of readiness probes received.
            pub fn probe_count(&self) -> usize {
                self.probes.load(Ordering::SeqCst)
            }
        }
    };
}

/// Counter kept in a map.
#[derive(Debug, Default)]
pub struct MemoryCounter {
    values: Mutex<HashMap<String, i64>>,
    behaviour: Behaviour,
    probes: AtomicUsize,
}

fault_controls!(MemoryCounter);

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key` (0 when never incremented).
    pub fn value(&self, key: &str) -> i64 {
        lock(&self.values).get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CounterStore for MemoryCounter {
    async fn increment(&self, key: &str) -> Result<i64, BackendError> {
        self.behaviour.apply().await?;
        let mut values = lock(&self.values);
        let value = values.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.behaviour.apply().await
    }
}

/// Record store kept in a vector.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AccessRecord>>,
    behaviour: Behaviour,
    probes: AtomicUsize,
}

fault_controls!(MemoryStore);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AccessRecord> {
        lock(&self.records).clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_access(&self, record: &AccessRecord) -> Result<(), BackendError> {
        self.behaviour.apply().await?;
        lock(&self.records).push(*record);
        Ok(())
    }

    async fn probe(&self) -> Result<(), BackendError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.behaviour.apply().await
    }
}

/// Queue keeping published bodies.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    bodies: Mutex<Vec<String>>,
    behaviour: Behaviour,
    probes: AtomicUsize,
}

fault_controls!(MemoryQueue);

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw published bodies, in publish order.
    pub fn bodies(&self) -> Vec<String> {
        lock(&self.bodies).clone()
    }

    /// Published bodies decoded as workflow messages. Bodies that are not
    /// valid messages are skipped.
    pub fn messages(&self) -> Vec<QueueMessage> {
        lock(&self.bodies)
            .iter()
            .filter_map(|b| serde_json::from_str(b).ok())
            .collect()
    }
}

#[async_trait]
impl QueuePublisher for MemoryQueue {
    async fn publish(&self, body: &str) -> Result<(), BackendError> {
        self.behaviour.apply().await?;
        lock(&self.bodies).push(body.to_string());
        Ok(())
    }

    async fn fetch_metadata(&self) -> Result<(), BackendError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.behaviour.apply().await
    }
}

/// The three fakes, kept concrete so tests can drive them.
#[derive(Clone, Default)]
pub struct TestBackends {
    pub counter: Arc<MemoryCounter>,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
}

impl TestBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object handles for the orchestrator and aggregator.
    pub fn handles(&self) -> Backends {
        Backends {
            counter: self.counter.clone(),
            store: self.store.clone(),
            queue: self.queue.clone(),
        }
    }
}

/// Everything a span went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    pub name: &'static str,
    pub trace_id: TraceId,
    pub parent: Option<TraceId>,
    /// `(kind, message)` pairs.
    pub exceptions: Vec<(String, String)>,
    pub status: SpanStatus,
    pub end_count: usize,
}

/// Tracer that records span lifecycles.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanRecord> {
        lock(&self.spans).clone()
    }
}

impl Tracer for RecordingTracer {
    fn start(&self, name: &'static str, parent: Option<&Context>) -> Box<dyn Span> {
        let trace_id = parent.map_or_else(random_trace_id, trace_id_of);
        let mut spans = lock(&self.spans);
        spans.push(SpanRecord {
            name,
            trace_id,
            parent: parent.map(trace_id_of),
            exceptions: Vec::new(),
            status: SpanStatus::Unset,
            end_count: 0,
        });
        Box::new(RecordedSpan {
            index: spans.len() - 1,
            trace_id,
            spans: self.spans.clone(),
        })
    }
}

struct RecordedSpan {
    index: usize,
    trace_id: TraceId,
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl RecordedSpan {
    fn update(&self, f: impl FnOnce(&mut SpanRecord)) {
        if let Some(record) = lock(&self.spans).get_mut(self.index) {
            f(record);
        }
    }
}

impl Span for RecordedSpan {
    fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    fn record_exception(&mut self, kind: &str, error: &dyn std::error::Error) {
        let entry = (kind.to_string(), error.to_string());
        self.update(|r| r.exceptions.push(entry));
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.update(|r| r.status = status);
    }

    fn end(&mut self) {
        self.update(|r| r.end_count += 1);
    }
}

/// Log sink keeping entries in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<ProcessedLog>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ProcessedLog> {
        lock(&self.entries).clone()
    }
}

impl LogSink for MemoryLogSink {
    fn emit(&self, entry: &ProcessedLog) {
        lock(&self.entries).push(entry.clone());
    }
}

/// Registry returning a fixed body.
#[derive(Debug, Default)]
pub struct StaticMetrics {
    body: String,
    collections: AtomicUsize,
}

impl StaticMetrics {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            collections: AtomicUsize::new(0),
        }
    }

    pub fn collections(&self) -> usize {
        self.collections.load(Ordering::SeqCst)
    }
}

impl MetricsRegistry for StaticMetrics {
    fn collect(&self) {
        self.collections.fetch_add(1, Ordering::SeqCst);
    }

    fn serialize_exposition(&self) -> String {
        self.body.clone()
    }
}
