use clap::{Parser, Subcommand};
use logtally_core::cli;
use logtally_core::logging::{self, LogFormat, init_logging};

#[derive(Parser, Debug)]
#[command(
    name = "logtally",
    version,
    about = "logtally: per-minute log level counters with windowed service summaries",
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: cli::run::RunArgs,

    /// Diagnostic log format (defaults to pretty on a terminal, json otherwise)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration tooling
    Config {
        #[command(subcommand)]
        cmd: cli::config::ConfigCmd,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { cmd }) => {
            if let Err(e) = cli::config::run(cmd) {
                eprintln!("config error: {e}");
                std::process::exit(1);
            }
        }

        None => {
            let guard = init_logging(cli.log_format.unwrap_or_else(logging::default_log_format));

            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("failed to start tokio runtime: {e}");
                    std::process::exit(1);
                }
            };

            if let Err(e) = runtime.block_on(cli::run::run(cli.run)) {
                drop(guard);
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }
}
