use crate::conf::types::{AggregateConfig, TallyConfig};
use std::collections::HashSet;

/// Check a parsed config. Every problem is reported, not just the first one.
pub fn validate_config(cfg: &TallyConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if cfg.store.key_delimiter.is_empty() {
        errors.push("store.key_delimiter must not be empty".to_string());
    }

    validate_aggregate(&cfg.aggregate, &mut errors);

    if cfg.tail.reopen_backoff_ms == 0 {
        errors.push("tail.reopen_backoff_ms must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_aggregate(cfg: &AggregateConfig, errors: &mut Vec<String>) {
    if cfg.interval_seconds == 0 {
        errors.push("aggregate.interval_seconds must be greater than 0".to_string());
    }

    if cfg.window_minutes == 0 {
        errors.push("aggregate.window_minutes must be greater than 0".to_string());
    }

    validate_names("aggregate.services", &cfg.services, errors);
    validate_names("aggregate.levels", &cfg.levels, errors);
}

// Names are matched against whitespace-split log fields, so they cannot contain whitespace.
fn validate_names(field: &str, names: &[String], errors: &mut Vec<String>) {
    if names.is_empty() {
        errors.push(format!("{field} must list at least one entry"));
        return;
    }

    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            errors.push(format!("{field} contains a blank entry"));
        } else if name.chars().any(char::is_whitespace) {
            errors.push(format!("{field} entry '{name}' contains whitespace"));
        } else if !seen.insert(name.as_str()) {
            errors.push(format!("{field} lists '{name}' more than once"));
        }
    }
}
