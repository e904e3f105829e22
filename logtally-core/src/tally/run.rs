use crate::tail::{EventSource, TailError, Tailer};
use crate::tally::aggregate::{AggregateError, WindowAggregator};
use crate::tally::ingest::Ingestor;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("tailer failed: {0}")]
    Tail(#[from] TailError),

    #[error("aggregator failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("pipeline task panicked: {0}")]
    TaskPanicked(#[from] JoinError),
}

/// Run the tailer and the window aggregator side by side.
///
/// The log file is opened before either task starts, so a missing file fails
/// the call before any report is written. After that both tasks share one
/// cancellation scope derived from `cancel`. The first task to fail cancels
/// the scope, the other stops at its next suspension point, and that first
/// error is returned. `Ok(())` means both stopped because `cancel` fired.
pub async fn run_pipeline<E, W>(
    mut tailer: Tailer<E>,
    ingestor: Arc<Ingestor>,
    aggregator: Arc<WindowAggregator>,
    mut out: W,
    cancel: CancellationToken,
) -> Result<(), PipelineError>
where
    E: EventSource + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let reader = tailer.open().await?;

    let scope = cancel.child_token();
    let mut tasks: JoinSet<Result<(), PipelineError>> = JoinSet::new();

    tasks.spawn({
        let scope = scope.clone();
        async move {
            tailer
                .follow(reader, &ingestor, scope)
                .await
                .map_err(PipelineError::from)
        }
    });

    tasks.spawn({
        let scope = scope.clone();
        async move {
            aggregator
                .run(&mut out, scope)
                .await
                .map_err(PipelineError::from)
        }
    });

    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        let Err(err) = joined.unwrap_or_else(|e| Err(PipelineError::from(e))) else {
            continue;
        };

        if first_error.is_none() {
            tracing::error!(error = %err, "pipeline task failed; stopping");
            scope.cancel();
            first_error = Some(err);
        } else {
            tracing::debug!(error = %err, "further pipeline failure after shutdown began");
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
