use crate::tail::error::TailError;
use crate::tail::state::FileEvent;
use async_trait::async_trait;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Subscription to filesystem notifications for one path.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Start watching `path`, dropping any earlier subscription together with
    /// the events it had queued.
    fn register(&mut self, path: &Path) -> Result<(), TailError>;

    /// Wait for the next event that matters to the tailer.
    ///
    /// `None` means the subscription is gone and no event will ever arrive.
    async fn next_event(&mut self) -> Option<Result<FileEvent, TailError>>;
}

/// `EventSource` backed by the platform watcher (inotify, FSEvents, ...).
pub struct NotifySource {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    events: Option<mpsc::UnboundedReceiver<notify::Result<Event>>>,
}

impl Default for NotifySource {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifySource {
    pub fn new() -> Self {
        Self {
            path: PathBuf::new(),
            watcher: None,
            events: None,
        }
    }
}

#[async_trait]
impl EventSource for NotifySource {
    fn register(&mut self, path: &Path) -> Result<(), TailError> {
        self.watcher = None;
        self.events = None;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(|source| TailError::Watch {
            path: path.to_path_buf(),
            source,
        })?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| TailError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "filesystem subscription registered");

        self.path = path.to_path_buf();
        self.watcher = Some(watcher);
        self.events = Some(rx);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<FileEvent, TailError>> {
        let events = self.events.as_mut()?;

        loop {
            match events.recv().await? {
                Ok(event) => {
                    if let Some(file_event) = classify_event_kind(&event.kind) {
                        return Some(Ok(file_event));
                    }
                }
                Err(source) => {
                    return Some(Err(TailError::Watch {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
        }
    }
}

/// Map a platform event to what it means for the tailer. Reads, opens and
/// other noise map to `None`.
pub fn classify_event_kind(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Remove(_) => Some(FileEvent::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FileEvent::Renamed),
        EventKind::Modify(_) | EventKind::Create(_) => Some(FileEvent::Written),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(FileEvent::Written),
        _ => None,
    }
}
