use crate::conf::error::ConfigError;
use crate::conf::types::TallyConfig;
use crate::conf::validate::validate_config;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# logtally configuration

store = {
  # "redis" or "memory"
  backend       = "redis"
  url           = "redis://127.0.0.1:6379/0"
  key_delimiter = " "
}

aggregate = {
  interval_seconds = 10
  window_minutes   = 300
  services         = ["IngestorService", "ProcessorService"]
  levels           = ["ERROR", "WARN", "INFO"]
  # "local" or "utc"; must match the zone the log writer uses
  timezone         = "local"
}

tail = {
  reopen_timeout_ms = 5000
  reopen_backoff_ms = 100
}
"#;

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<TallyConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    parse_config(path, &s)
}

/// Like `load_config`, but a missing path means "all defaults".
pub fn load_config_or_default(path: Option<&Path>) -> Result<TallyConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(TallyConfig::default()),
    }
}

/// Parse and validate config text. `origin` is only used in error messages.
pub fn parse_config(origin: &Path, s: &str) -> Result<TallyConfig, ConfigError> {
    let cfg: TallyConfig = hcl::from_str(s).map_err(|e| ConfigError::parse(origin, e))?;

    validate_config(&cfg).map_err(|errors| ConfigError::Validation {
        path: origin.to_path_buf(),
        errors,
    })?;

    Ok(cfg)
}

pub fn render_default_config() -> &'static str {
    DEFAULT_CONFIG
}
