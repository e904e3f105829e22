use std::io::{self, IsTerminal};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Human-readable diagnostics on a terminal, JSON otherwise.
pub fn default_log_format() -> LogFormat {
    if io::stderr().is_terminal() {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Initialize diagnostic logging.
///
/// - Level filtering comes from `RUST_LOG` (defaults to "info")
/// - Output goes to stderr through a non-blocking writer; stdout is reserved for reports
/// - JSON output flattens event fields
///
/// Keep the returned guard alive for as long as the process logs; dropping it
/// flushes and stops the writer. With `TOKIO_CONSOLE` set the tokio-console
/// subscriber is installed instead and no guard is returned.
pub fn init_logging(format: LogFormat) -> Option<WorkerGuard> {
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        init_console_logging();
        None
    } else {
        Some(init_normal_logging(format))
    }
}

fn init_normal_logging(format: LogFormat) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .json()
            .flatten_event(true)
            .init(),
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(false)
            .init(),
    }

    guard
}

fn init_console_logging() {
    console_subscriber::init();
}
