mod error;
mod loader;
pub mod types;
mod validate;


pub use error::ConfigError;
pub use loader::{load_config, load_config_or_default, parse_config, render_default_config};
pub use types::TallyConfig;
pub use validate::validate_config;
