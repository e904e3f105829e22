use crate::clock::{Clock, SystemClock};
use crate::conf::load_config_or_default;
use crate::conf::types::StoreBackend;
use crate::store;
use crate::tail::{NotifySource, Tailer};
use crate::tally::{Ingestor, WindowAggregator, run_pipeline};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the log file to tail
    #[arg(long = "log-file", value_name = "PATH", required = true)]
    pub log_file: Option<PathBuf>,

    /// Path to an HCL config file (defaults apply when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Counting store backend, overrides the config file
    #[arg(long, value_enum, value_name = "BACKEND")]
    pub store: Option<StoreBackend>,

    /// Redis URL, overrides the config file
    #[arg(long, value_name = "URL")]
    pub redis_url: Option<String>,
}

/// Tail the log file and report until interrupted or until a fatal error.
pub async fn run(args: RunArgs) -> Result<()> {
    let log_file = args.log_file.context("--log-file is required")?;

    let mut cfg = load_config_or_default(args.config.as_deref())?;
    if let Some(backend) = args.store {
        cfg.store.backend = backend;
    }
    if let Some(url) = args.redis_url {
        cfg.store.url = url;
    }

    let store = store::connect(&cfg.store).await?;
    tracing::info!(backend = %cfg.store.backend, "counting store ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(cfg.aggregate.timezone));
    let ingestor = Arc::new(Ingestor::new(store.clone()));
    let aggregator = Arc::new(WindowAggregator::new(store, clock, &cfg.aggregate));
    let tailer = Tailer::new(log_file, NotifySource::new(), &cfg.tail);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    run_pipeline(tailer, ingestor, aggregator, tokio::io::stdout(), cancel).await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }

    cancel.cancel();
}
