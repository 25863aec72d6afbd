//! Integration test for loading configuration files from disk.

use tandem_shared::{ConfigError, SyncStrategy, TandemConfig, TimingMode};

fn temp_config_path(tag: &str) -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tandem_{tag}_{id}.toml"))
}

#[test]
fn test_shipped_config_matches_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/tandem.toml");
    let config = TandemConfig::load(path).unwrap();
    assert_eq!(config, TandemConfig::default());
}

#[test]
fn test_load_from_disk() {
    let path = temp_config_path("load");
    std::fs::write(&path, "strategy = \"spinning\"\ntiming = \"synced\"\n").unwrap();

    let config = TandemConfig::load(&path).unwrap();
    assert_eq!(config.strategy, SyncStrategy::Spinning);
    assert_eq!(config.timing, TimingMode::Synced);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_invalid_file_reports_reason() {
    let path = temp_config_path("invalid");
    std::fs::write(&path, "max_width = 100000\n").unwrap();

    let err = TandemConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("max_width"));

    std::fs::remove_file(&path).ok();
}
