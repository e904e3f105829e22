use super::support::{BrokenSink, EventCapture, FlakyReadStore, UnreachableStore, at};
use crate::clock::{Clock, FixedClock};
use crate::conf::types::AggregateConfig;
use crate::store::{CountingStore, MemoryStore};
use crate::tally::{AggregateError, AggregationWindow, ServiceSummary, WindowAggregator};
use pretty_assertions::assert_eq;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::Level;

const DAY: (i32, u32, u32) = (2025, 1, 2);

fn config(services: &[&str], levels: &[&str], window_minutes: u32) -> AggregateConfig {
    AggregateConfig {
        services: services.iter().map(|s| s.to_string()).collect(),
        levels: levels.iter().map(|s| s.to_string()).collect(),
        window_minutes,
        ..AggregateConfig::default()
    }
}

fn aggregator(
    store: Arc<dyn CountingStore>,
    now: chrono::NaiveDateTime,
    cfg: &AggregateConfig,
) -> WindowAggregator {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
    WindowAggregator::new(store, clock, cfg)
}

#[test]
fn window_ends_at_now_truncated_to_the_minute() {
    let window = AggregationWindow::ending_at(at(DAY, 15, 50, 37), 60);

    assert_eq!(window.start, at(DAY, 14, 50, 0));
    assert_eq!(window.end, at(DAY, 15, 50, 0));
    assert_eq!(window.len_minutes(), 60);
}

#[test]
fn window_minutes_include_start_and_exclude_end() {
    let window = AggregationWindow::ending_at(at(DAY, 15, 50, 0), 3);

    let minutes: Vec<_> = window.minutes().collect();

    assert_eq!(
        minutes,
        vec![at(DAY, 15, 47, 0), at(DAY, 15, 48, 0), at(DAY, 15, 49, 0)]
    );
}

#[tokio::test]
async fn counts_outside_the_window_are_ignored() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "14:05", "IngestorService", "ERROR"], 1);
    store.set(&["2025-01-02", "15:45", "IngestorService", "ERROR"], 3);
    let cfg = config(&["IngestorService"], &["ERROR"], 60);
    let agg = aggregator(store, at(DAY, 15, 50, 0), &cfg);

    // Act
    let summaries = agg.summarize().await;

    // Assert
    assert_eq!(
        summaries,
        vec![ServiceSummary {
            service: "IngestorService".into(),
            counts: vec![3],
        }]
    );
}

#[tokio::test]
async fn window_start_is_counted_and_window_end_is_not() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "14:50", "Api", "ERROR"], 5);
    store.set(&["2025-01-02", "15:50", "Api", "ERROR"], 100);
    let cfg = config(&["Api"], &["ERROR"], 60);
    let agg = aggregator(store, at(DAY, 15, 50, 59), &cfg);

    // Act
    let summaries = agg.summarize().await;

    // Assert
    assert_eq!(summaries[0].counts, vec![5]);
}

#[tokio::test]
async fn window_spanning_midnight_reads_both_dates() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "23:55", "Api", "WARN"], 2);
    store.set(&["2025-01-03", "00:05", "Api", "WARN"], 4);
    let cfg = config(&["Api"], &["WARN"], 30);
    let agg = aggregator(store, at((2025, 1, 3), 0, 10, 0), &cfg);

    // Act
    let summaries = agg.summarize().await;

    // Assert
    assert_eq!(summaries[0].counts, vec![6]);
}

#[tokio::test]
async fn no_counts_at_all_yields_zeros() {
    let cfg = config(&["IngestorService", "ProcessorService"], &["ERROR", "WARN", "INFO"], 300);
    let agg = aggregator(Arc::new(MemoryStore::new()), at(DAY, 15, 50, 0), &cfg);

    let report = agg.report().await;

    assert_eq!(
        report,
        "IngestorService: ERROR 0, WARN 0, INFO 0\n\
         ProcessorService: ERROR 0, WARN 0, INFO 0\n"
    );
}

#[tokio::test]
async fn output_order_follows_configuration_not_data() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "15:40", "Alpha", "INFO"], 9);
    store.set(&["2025-01-02", "15:41", "Alpha", "ERROR"], 1);
    store.set(&["2025-01-02", "15:42", "Zeta", "WARN"], 4);
    store.set(&["2025-01-02", "15:43", "Mid", "DEBUG"], 2);
    store.set(&["2025-01-02", "15:44", "Unlisted", "ERROR"], 50);
    let cfg = config(&["Zeta", "Alpha", "Mid"], &["WARN", "ERROR", "INFO", "DEBUG"], 60);
    let agg = aggregator(store, at(DAY, 15, 50, 0), &cfg);

    // Act
    let report = agg.report().await;

    // Assert
    assert_eq!(
        report,
        "Zeta: WARN 4, ERROR 0, INFO 0, DEBUG 0\n\
         Alpha: WARN 0, ERROR 1, INFO 9, DEBUG 0\n\
         Mid: WARN 0, ERROR 0, INFO 0, DEBUG 2\n"
    );
}

#[tokio::test]
async fn repeated_ticks_with_unchanged_inputs_are_identical() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "15:10", "IngestorService", "ERROR"], 3);
    store.set(&["2025-01-02", "15:20", "ProcessorService", "INFO"], 8);
    let agg = aggregator(store, at(DAY, 15, 50, 0), &AggregateConfig::default());

    // Act
    let first = agg.report().await;
    let second = agg.report().await;

    // Assert
    assert_eq!(first, second);
    assert_eq!(
        first,
        "IngestorService: ERROR 3, WARN 0, INFO 0\n\
         ProcessorService: ERROR 0, WARN 0, INFO 8\n"
    );
}

#[tokio::test]
async fn moving_clock_moves_the_window() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "15:00", "Api", "ERROR"], 1);
    let cfg = config(&["Api"], &["ERROR"], 10);
    let clock = Arc::new(FixedClock::new(at(DAY, 15, 5, 0)));
    let agg = WindowAggregator::new(store, clock.clone(), &cfg);

    // Act
    let before = agg.summarize().await;
    clock.advance(chrono::Duration::minutes(10));
    let after = agg.summarize().await;

    // Assert
    assert_eq!(before[0].counts, vec![1]);
    assert_eq!(after[0].counts, vec![0]);
}

#[tokio::test]
async fn failed_reads_count_as_zero_and_do_not_abort() {
    // Arrange
    let store = Arc::new(FlakyReadStore {
        broken: "WARN".into(),
        ..Default::default()
    });
    store.inner.set(&["2025-01-02", "15:30", "Api", "ERROR"], 2);
    store.inner.set(&["2025-01-02", "15:30", "Api", "WARN"], 7);
    let cfg = config(&["Api"], &["ERROR", "WARN"], 60);
    let agg = aggregator(store, at(DAY, 15, 50, 0), &cfg);

    // Act
    let report = agg.report().await;

    // Assert
    assert_eq!(report, "Api: ERROR 2, WARN 0\n");
}

#[tokio::test]
async fn failed_reads_are_reported_in_one_warning_per_tick() {
    // Arrange
    let (capture, _guard) = EventCapture::install();
    let store = Arc::new(FlakyReadStore {
        broken: "WARN".into(),
        ..Default::default()
    });
    let cfg = config(&["Api"], &["ERROR", "WARN"], 60);
    let agg = aggregator(store, at(DAY, 15, 50, 0), &cfg);

    // Act
    agg.summarize().await;

    // Assert
    let warnings = capture.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(warnings[0].field("failed_reads"), Some("60"));
}

#[tokio::test]
async fn absent_keys_are_not_reported_as_failures() {
    let (capture, _guard) = EventCapture::install();
    let agg = aggregator(
        Arc::new(MemoryStore::new()),
        at(DAY, 15, 50, 0),
        &AggregateConfig::default(),
    );

    agg.summarize().await;

    assert!(capture.at_level(Level::WARN).is_empty());
    assert!(capture.at_level(Level::DEBUG).is_empty());
}

#[tokio::test]
async fn unreachable_store_reports_zeros() {
    let cfg = config(&["Api"], &["ERROR", "WARN"], 5);
    let agg = aggregator(Arc::new(UnreachableStore), at(DAY, 15, 50, 0), &cfg);

    let report = agg.report().await;

    assert_eq!(report, "Api: ERROR 0, WARN 0\n");
}

#[tokio::test]
async fn run_writes_a_report_right_away_and_stops_on_cancel() {
    // Arrange
    let store = Arc::new(MemoryStore::new());
    store.set(&["2025-01-02", "15:45", "IngestorService", "ERROR"], 3);
    let mut cfg = AggregateConfig::default();
    cfg.interval_seconds = 3600;
    let agg = Arc::new(aggregator(store, at(DAY, 15, 50, 0), &cfg));
    let (mut writer, reader) = tokio::io::duplex(4096);
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let agg = agg.clone();
        let cancel = cancel.clone();
        async move { agg.run(&mut writer, cancel).await }
    });

    // Act
    let mut lines = BufReader::new(reader).lines();
    let first = lines.next_line().await.unwrap().unwrap();
    let second = lines.next_line().await.unwrap().unwrap();
    cancel.cancel();
    let result = task.await.unwrap();

    // Assert
    assert_eq!(first, "IngestorService: ERROR 3, WARN 0, INFO 0");
    assert_eq!(second, "ProcessorService: ERROR 0, WARN 0, INFO 0");
    assert!(result.is_ok());
}

#[tokio::test]
async fn failing_output_sink_ends_the_loop_with_an_error() {
    let agg = aggregator(
        Arc::new(MemoryStore::new()),
        at(DAY, 15, 50, 0),
        &AggregateConfig::default(),
    );

    let err = agg
        .run(&mut BrokenSink, CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        AggregateError::Output(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
    }
}
