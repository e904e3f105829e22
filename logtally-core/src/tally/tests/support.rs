use crate::store::{CountingStore, MemoryStore, StoreError, join_key};
use crate::tail::{EventSource, FileEvent, TailError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{self, SubscriberExt};
use tracing_subscriber::Layer;

pub fn at(date: (i32, u32, u32), h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

/// Records every increment; reads are served by an inner memory store.
#[derive(Default)]
pub struct RecordingStore {
    pub increments: Mutex<Vec<Vec<String>>>,
    pub inner: MemoryStore,
}

impl RecordingStore {
    pub fn recorded(&self) -> Vec<Vec<String>> {
        self.increments.lock().unwrap().clone()
    }
}

#[async_trait]
impl CountingStore for RecordingStore {
    async fn increment(&self, parts: &[&str]) -> Result<(), StoreError> {
        self.increments
            .lock()
            .unwrap()
            .push(parts.iter().map(|p| p.to_string()).collect());
        self.inner.increment(parts).await
    }

    async fn get(&self, parts: &[&str]) -> Result<u64, StoreError> {
        self.inner.get(parts).await
    }
}

/// Every operation fails with a backend error, as an unreachable server would.
pub struct UnreachableStore;

#[async_trait]
impl CountingStore for UnreachableStore {
    async fn increment(&self, parts: &[&str]) -> Result<(), StoreError> {
        Err(StoreError::backend(join_key(parts, " "), "connection refused"))
    }

    async fn get(&self, parts: &[&str]) -> Result<u64, StoreError> {
        Err(StoreError::backend(join_key(parts, " "), "connection refused"))
    }
}

/// Reads of keys containing `broken` fail; everything else goes to the memory store.
#[derive(Default)]
pub struct FlakyReadStore {
    pub inner: MemoryStore,
    pub broken: String,
}

#[async_trait]
impl CountingStore for FlakyReadStore {
    async fn increment(&self, parts: &[&str]) -> Result<(), StoreError> {
        self.inner.increment(parts).await
    }

    async fn get(&self, parts: &[&str]) -> Result<u64, StoreError> {
        let key = join_key(parts, " ");
        if key.contains(&self.broken) {
            return Err(StoreError::backend(key, "read timed out"));
        }
        self.inner.get(parts).await
    }
}

/// Output sink whose every write fails.
pub struct BrokenSink;

impl AsyncWrite for BrokenSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Event source that accepts registration and then never delivers an event.
#[derive(Default)]
pub struct QuietSource;

#[async_trait]
impl EventSource for QuietSource {
    fn register(&mut self, _path: &Path) -> Result<(), TailError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<FileEvent, TailError>> {
        std::future::pending().await
    }
}

/// Event source whose subscription is already gone.
pub struct ClosedSource;

#[async_trait]
impl EventSource for ClosedSource {
    fn register(&mut self, _path: &Path) -> Result<(), TailError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<FileEvent, TailError>> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Collects events emitted on the current thread while the guard is alive.
#[derive(Clone, Default)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    /// Install as the thread's default subscriber. Pair with a current-thread runtime.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
        let mut fields = Vec::new();
        event.record(&mut FieldVisitor {
            fields: &mut fields,
        });

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

struct FieldVisitor<'a> {
    fields: &'a mut Vec<(String, String)>,
}

impl Visit for FieldVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .push((field.name().to_string(), format!("{value:?}")));
    }
}
