use crate::tail::{EventSource, FileEvent, TailError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Event source fed by the test instead of the filesystem.
pub struct ScriptedSource {
    events: mpsc::UnboundedReceiver<FileEvent>,
    registrations: Arc<AtomicUsize>,
}

/// The test's end of a `ScriptedSource`. Dropping it closes the subscription.
pub struct Script {
    events: mpsc::UnboundedSender<FileEvent>,
    registrations: Arc<AtomicUsize>,
}

pub fn scripted() -> (ScriptedSource, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    let registrations = Arc::new(AtomicUsize::new(0));
    (
        ScriptedSource {
            events: rx,
            registrations: registrations.clone(),
        },
        Script {
            events: tx,
            registrations,
        },
    )
}

impl Script {
    pub fn send(&self, event: FileEvent) {
        self.events.send(event).unwrap();
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn register(&mut self, _path: &Path) -> Result<(), TailError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<FileEvent, TailError>> {
        self.events.recv().await.map(Ok)
    }
}

/// Poll `cond` until it holds, failing the test after a few seconds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
