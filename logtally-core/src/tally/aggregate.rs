use crate::clock::Clock;
use crate::conf::types::AggregateConfig;
use crate::store::CountingStore;
use crate::tally::render::render_report;
use crate::tally::types::{AggregationWindow, BucketKey, ServiceSummary};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Periodically rebuilds per-service, per-level totals from per-minute counters.
pub struct WindowAggregator {
    store: Arc<dyn CountingStore>,
    clock: Arc<dyn Clock>,
    services: Vec<String>,
    levels: Vec<String>,
    window_minutes: u32,
    interval: Duration,
}

impl WindowAggregator {
    pub fn new(
        store: Arc<dyn CountingStore>,
        clock: Arc<dyn Clock>,
        cfg: &AggregateConfig,
    ) -> Self {
        Self {
            store,
            clock,
            services: cfg.services.clone(),
            levels: cfg.levels.clone(),
            window_minutes: cfg.window_minutes,
            interval: cfg.interval(),
        }
    }

    /// The window a tick starting right now would cover.
    pub fn window(&self) -> AggregationWindow {
        AggregationWindow::ending_at(self.clock.now(), self.window_minutes)
    }

    /// Totals for every configured service, in configured order.
    ///
    /// A failed read counts as zero. Absent keys are expected; other failures
    /// are tallied and reported once per call.
    pub async fn summarize(&self) -> Vec<ServiceSummary> {
        let window = self.window();
        let mut failed_reads = 0u64;
        let mut summaries = Vec::with_capacity(self.services.len());

        for service in &self.services {
            let mut summary = ServiceSummary::new(service.as_str(), self.levels.len());

            for (idx, level) in self.levels.iter().enumerate() {
                let keys: Vec<BucketKey> = window
                    .minutes()
                    .map(|minute| BucketKey::for_minute(minute, service, level))
                    .collect();
                let parts: Vec<[&str; 4]> = keys.iter().map(BucketKey::parts).collect();
                let refs: Vec<&[&str]> = parts.iter().map(|p| p.as_slice()).collect();

                for result in self.store.get_many(&refs).await {
                    match result {
                        Ok(count) => {
                            summary.counts[idx] = summary.counts[idx].saturating_add(count)
                        }
                        Err(e) if e.is_not_found() => {}
                        Err(e) => {
                            failed_reads += 1;
                            tracing::debug!(error = %e, "counting store read failed; counting as 0");
                        }
                    }
                }
            }

            summaries.push(summary);
        }

        if failed_reads > 0 {
            tracing::warn!(
                failed_reads,
                window_start = %window.start,
                window_end = %window.end,
                "counting store reads failed; reported totals may be understated"
            );
        }

        summaries
    }

    /// One tick's worth of output.
    pub async fn report(&self) -> String {
        let summaries = self.summarize().await;
        render_report(&self.levels, &summaries)
    }

    /// Write a report every interval until `cancel` fires.
    ///
    /// The first report is written immediately. Only a failing output sink
    /// ends the loop with an error.
    pub async fn run<W>(&self, out: &mut W, cancel: CancellationToken) -> Result<(), AggregateError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            window_minutes = self.window_minutes,
            services = self.services.len(),
            levels = self.levels.len(),
            "window aggregator started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("window aggregator shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let report = self.report().await;
                    out.write_all(report.as_bytes()).await?;
                    out.flush().await?;
                }
            }
        }
    }
}
