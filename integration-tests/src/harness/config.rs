use logtally_core::conf::{TallyConfig, load_config};
use std::path::PathBuf;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("config")
        .join(name)
}

/// Load a config fixture through the same path the binary uses.
pub fn load_fixture(name: &str) -> TallyConfig {
    let path = fixture_path(name);

    assert!(path.exists(), "fixture config does not exist: {:?}", path);

    load_config(&path).expect("failed to load fixture config")
}
