mod config;
pub mod pipeline;
pub mod tracing;

pub use config::{fixture_path, load_fixture};
pub use pipeline::{LogFile, TestPipeline};
pub use tracing::{CapturedEvent, captured_events, init_test_tracing};
