use crate::conf::types::TailConfig;
use crate::tail::error::TailError;
use crate::tail::reader::{LineReader, PathStatus};
use crate::tail::state::{FileEvent, TailState};
use crate::tail::watch::EventSource;
use crate::tally::Ingestor;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives the read loop for one log path and feeds every line to the ingestor.
pub struct Tailer<E> {
    path: PathBuf,
    source: E,
    reopen_timeout: Duration,
    reopen_backoff: Duration,
}

impl<E: EventSource> Tailer<E> {
    pub fn new(path: impl Into<PathBuf>, source: E, cfg: &TailConfig) -> Self {
        Self {
            path: path.into(),
            source,
            reopen_timeout: cfg.reopen_timeout(),
            reopen_backoff: cfg.reopen_backoff(),
        }
    }

    /// Tail until cancelled or until a fatal error.
    ///
    /// Fatal: failing to open or watch the file, a read error, a closed
    /// subscription, and a failed store write reported by the ingestor.
    /// Malformed lines are not fatal; the ingestor skips them.
    pub async fn run(mut self, ingestor: &Ingestor, cancel: CancellationToken) -> Result<(), TailError> {
        let reader = self.open().await?;
        self.follow(reader, ingestor, cancel).await
    }

    /// Open the file and subscribe to its notifications without reading anything.
    pub async fn open(&mut self) -> Result<LineReader, TailError> {
        let reader = LineReader::open(&self.path)
            .await
            .map_err(|source| TailError::Open {
                path: self.path.clone(),
                source,
            })?;
        self.source.register(&self.path)?;
        Ok(reader)
    }

    /// Read from a handle returned by `open` until cancelled or until a fatal error.
    pub async fn follow(
        mut self,
        mut reader: LineReader,
        ingestor: &Ingestor,
        cancel: CancellationToken,
    ) -> Result<(), TailError> {
        tracing::info!(path = %self.path.display(), "tailing log file");

        let result = self.drive(&mut reader, ingestor, &cancel).await;

        let stats = ingestor.stats();
        tracing::info!(
            path = %self.path.display(),
            lines = stats.lines(),
            malformed = stats.malformed(),
            counted = stats.counted(),
            "tailer stopped"
        );

        result
    }

    async fn drive(
        &mut self,
        reader: &mut LineReader,
        ingestor: &Ingestor,
        cancel: &CancellationToken,
    ) -> Result<(), TailError> {
        let mut state = TailState::Reading;

        loop {
            state = match state {
                TailState::Reading => {
                    self.drain(reader, ingestor, cancel).await?;
                    if cancel.is_cancelled() {
                        return Ok(());
                    }
                    state.on_drained()
                }

                TailState::AwaitingEvent => {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        next = self.source.next_event() => next,
                    };

                    let event = match next {
                        Some(Ok(event)) => self.confirm(event, reader).await?,
                        Some(Err(e)) => return Err(e),
                        None => {
                            return Err(TailError::WatchClosed {
                                path: self.path.clone(),
                            });
                        }
                    };

                    if event.invalidates_handle() {
                        tracing::info!(path = %self.path.display(), ?event, "log file rotated; reopening");
                    }
                    state.on_event(event)
                }

                TailState::Reopening => {
                    // Whatever the old handle still holds was written before the rotation.
                    self.drain(reader, ingestor, cancel).await?;
                    if let Some(line) = reader.take_partial() {
                        ingestor.ingest_line(&line).await?;
                    }

                    match self.reopen(cancel).await? {
                        Some(fresh) => *reader = fresh,
                        None => return Ok(()),
                    }
                    state.on_reopened()
                }
            };
        }
    }

    async fn drain(
        &self,
        reader: &mut LineReader,
        ingestor: &Ingestor,
        cancel: &CancellationToken,
    ) -> Result<(), TailError> {
        while !cancel.is_cancelled() {
            let next = reader.next_line().await.map_err(|source| TailError::Read {
                path: self.path.clone(),
                source,
            })?;

            let Some(line) = next else {
                break;
            };
            ingestor.ingest_line(&line).await?;
        }
        Ok(())
    }

    /// A write-type notification can hide a rotation: unlinking a file we hold
    /// open, or a copy-truncate, only shows up as a change. Check the path.
    async fn confirm(&self, event: FileEvent, reader: &LineReader) -> Result<FileEvent, TailError> {
        if event != FileEvent::Written {
            return Ok(event);
        }

        let status = reader
            .path_status(&self.path)
            .await
            .map_err(|source| TailError::Stat {
                path: self.path.clone(),
                source,
            })?;

        Ok(match status {
            PathStatus::Unchanged => FileEvent::Written,
            PathStatus::Missing => FileEvent::Removed,
            PathStatus::Replaced => FileEvent::Renamed,
            PathStatus::Truncated => FileEvent::Truncated,
        })
    }

    /// Open the path again and re-register the subscription.
    ///
    /// A missing path is retried until `reopen_timeout` runs out, which covers
    /// rotation schemes that rename first and create the new file a moment
    /// later. Returns `None` when cancelled while waiting.
    async fn reopen(&mut self, cancel: &CancellationToken) -> Result<Option<LineReader>, TailError> {
        let deadline = Instant::now() + self.reopen_timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match LineReader::open(&self.path).await {
                Ok(reader) => {
                    self.source.register(&self.path)?;
                    tracing::info!(path = %self.path.display(), attempts, "log file reopened");
                    return Ok(Some(reader));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound && Instant::now() < deadline => {
                    tracing::debug!(path = %self.path.display(), attempts, "log file missing; retrying");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(self.reopen_backoff) => {}
                    }
                }
                Err(source) => {
                    return Err(TailError::Open {
                        path: self.path.clone(),
                        source,
                    });
                }
            }
        }
    }
}
