use crate::harness::init_test_tracing;
use chrono::NaiveDateTime;
use logtally_core::clock::FixedClock;
use logtally_core::conf::TallyConfig;
use logtally_core::store::MemoryStore;
use logtally_core::tail::{NotifySource, Tailer};
use logtally_core::tally::{Ingestor, PipelineError, WindowAggregator, run_pipeline};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(10);

/// A log file in its own temporary directory, with the rotation moves a log
/// shipper would make.
pub struct LogFile {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl LogFile {
    pub fn create(lines: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("service.log");
        let file = Self { dir, path };
        file.append(lines);
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, lines: &[&str]) {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .expect("failed to open log file for append");
        for line in lines {
            writeln!(f, "{line}").expect("failed to append line");
        }
    }

    /// logrotate's default: move the file aside, start a new one.
    pub fn rotate(&self, fresh: &[&str]) -> PathBuf {
        let rotated = self.dir.path().join("service.log.1");
        fs::rename(&self.path, &rotated).expect("failed to rename log file");
        self.append(fresh);
        rotated
    }

    /// copytruncate: empty the file in place.
    pub fn truncate(&self) {
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .expect("failed to truncate log file");
    }

    pub fn remove(&self) {
        fs::remove_file(&self.path).expect("failed to remove log file");
    }
}

/// The full tail -> count -> report pipeline against a real file, the
/// platform watcher and an in-memory store. Reports are captured instead of
/// going to stdout.
pub struct TestPipeline {
    store: Arc<MemoryStore>,
    ingestor: Arc<Ingestor>,
    clock: Arc<FixedClock>,
    reports: Lines<BufReader<DuplexStream>>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), PipelineError>>,
}

impl TestPipeline {
    pub fn start(log: &LogFile, cfg: &TallyConfig, now: NaiveDateTime) -> Self {
        init_test_tracing();

        let store = Arc::new(MemoryStore::with_delimiter(&cfg.store.key_delimiter));
        let ingestor = Arc::new(Ingestor::new(store.clone()));
        let clock = Arc::new(FixedClock::new(now));
        let aggregator = Arc::new(WindowAggregator::new(
            store.clone(),
            clock.clone(),
            &cfg.aggregate,
        ));
        let tailer = Tailer::new(log.path(), NotifySource::new(), &cfg.tail);

        let (writer, reader) = tokio::io::duplex(64 * 1024);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_pipeline(
            tailer,
            ingestor.clone(),
            aggregator,
            writer,
            cancel.clone(),
        ));

        Self {
            store,
            ingestor,
            clock,
            reports: BufReader::new(reader).lines(),
            cancel,
            task,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn clock(&self) -> &FixedClock {
        &self.clock
    }

    pub fn counted(&self) -> u64 {
        self.ingestor.stats().counted()
    }

    pub fn lines_seen(&self) -> u64 {
        self.ingestor.stats().lines()
    }

    /// Poll until `n` lines have been counted (or panic).
    pub async fn wait_counted(&self, n: u64) {
        let deadline = tokio::time::Instant::now() + WAIT;

        while self.counted() != n {
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "expected {n} counted lines, have {} (seen {})",
                    self.counted(),
                    self.lines_seen()
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Read report lines until one equals `expected` (or panic).
    pub async fn wait_for_report_line(&mut self, expected: &str) {
        let found = tokio::time::timeout(WAIT, async {
            while let Ok(Some(line)) = self.reports.next_line().await {
                if line == expected {
                    return true;
                }
            }
            false
        })
        .await;

        assert!(
            matches!(found, Ok(true)),
            "report line never appeared: {expected}"
        );
    }

    /// Cancel and wait for both tasks.
    pub async fn stop(self) -> Result<(), PipelineError> {
        self.cancel.cancel();
        self.task.await.expect("pipeline task panicked")
    }

    /// Wait for the pipeline to end on its own.
    pub async fn finished(self) -> Result<(), PipelineError> {
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("pipeline did not stop")
            .expect("pipeline task panicked")
    }
}
