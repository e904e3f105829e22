use crate::conf::{
    ConfigError, TallyConfig, load_config, load_config_or_default, render_default_config,
};
use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Validate a config file and exit
    Check {
        /// Path to the config file
        #[arg(default_value = "logtally.hcl")]
        path: PathBuf,
    },

    /// Print the resolved configuration (defaults applied)
    Dump {
        /// Path to the config file; defaults only when omitted
        path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long, conflicts_with = "yaml")]
        json: bool,

        /// Output as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Write a config file with every default spelled out
    Init {
        /// Where to write the file
        #[arg(default_value = "logtally.hcl")]
        path: PathBuf,
    },
}

pub fn run(cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Check { path } => check(&path),
        ConfigCmd::Dump { path, json, yaml } => dump(path.as_deref(), yaml && !json),
        ConfigCmd::Init { path } => init(&path),
    }
}

pub fn check(path: &Path) -> Result<()> {
    match load_config(path) {
        Ok(cfg) => {
            println!("{} Config loaded successfully", "✔".green());
            println!(
                "{} {} services: {}",
                "✔".green(),
                cfg.aggregate.services.len(),
                cfg.aggregate.services.join(", ")
            );
            println!(
                "{} {} levels: {}",
                "✔".green(),
                cfg.aggregate.levels.len(),
                cfg.aggregate.levels.join(", ")
            );
            println!(
                "{} {} minute window, reported every {}s",
                "✔".green(),
                cfg.aggregate.window_minutes,
                cfg.aggregate.interval_seconds
            );
            println!("{} {} store", "✔".green(), cfg.store.backend);
            Ok(())
        }
        Err(ConfigError::Validation { path, errors }) => {
            eprintln!(
                "{} {} ({} errors)",
                "configuration validation failed".red().bold(),
                path.display(),
                errors.len()
            );
            for error in &errors {
                eprintln!("  {} {}", "-".red(), error);
            }
            bail!("invalid configuration");
        }
        Err(err) => Err(err.into()),
    }
}

pub fn dump(path: Option<&Path>, yaml: bool) -> Result<()> {
    let cfg = load_config_or_default(path)?;
    println!("{}", render_dump(&cfg, yaml)?);
    Ok(())
}

/// JSON unless YAML was asked for.
pub fn render_dump(cfg: &TallyConfig, yaml: bool) -> Result<String> {
    if yaml {
        Ok(serde_yaml::to_string(cfg)?)
    } else {
        Ok(serde_json::to_string_pretty(cfg)?)
    }
}

pub fn init(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing file {}", path.display());
    }

    fs::write(path, render_default_config())
        .map_err(|e| anyhow!("failed to write {}: {e}", path.display()))?;

    println!("{} Wrote default configuration to {}", "✔".green(), path.display());
    Ok(())
}
