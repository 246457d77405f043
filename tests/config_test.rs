//! Configuration loading from files and environment overrides

use std::fs;

use assert_matches::assert_matches;
use serial_test::serial;
use tempfile::TempDir;

use fixed_asset::config::{Settings, StorageBackend};
use fixed_asset::FixedAssetError;

const CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8088
cors_origins = ["http://localhost:3000"]

[storage]
backend = "memory"

[auth]
jwt_secret = "file-secret-that-is-at-least-32-bytes!!"
session_ttl_hours = 12
bcrypt_cost = 6

[chain]
rpc_url = "http://localhost:8545"
timeout_seconds = 5
token_symbol = "HBT"

[rate_limit]
enabled = true
requests_per_minute = 120
burst = 20

[logging]
level = "debug"
json = true

[features]
insurance = true
trading = false
"#;

fn write_config(contents: &str) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.toml"), contents).unwrap();
    let name = dir.path().join("app").to_string_lossy().into_owned();
    (dir, name)
}

#[test]
#[serial]
fn test_load_from_file() {
    let (_dir, name) = write_config(CONFIG);
    let settings = Settings::load_from(&name).unwrap();

    assert_eq!(settings.bind_address(), "127.0.0.1:8088");
    assert_eq!(settings.server.cors_origins, vec!["http://localhost:3000".to_string()]);
    assert_eq!(settings.storage.backend, StorageBackend::Memory);
    assert_eq!(settings.auth.session_ttl_hours, 12);
    assert_eq!(settings.chain.rpc_url.as_deref(), Some("http://localhost:8545"));
    assert_eq!(settings.rate_limit.burst, 20);
    assert!(settings.logging.json);
    assert!(!settings.features.trading);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let (_dir, name) = write_config(CONFIG);
    std::env::set_var("FIXED_ASSET__SERVER__PORT", "9191");
    std::env::set_var("FIXED_ASSET__LOGGING__LEVEL", "warn");
    let settings = Settings::load_from(&name);
    std::env::remove_var("FIXED_ASSET__SERVER__PORT");
    std::env::remove_var("FIXED_ASSET__LOGGING__LEVEL");

    let settings = settings.unwrap();
    assert_eq!(settings.server.port, 9191);
    assert_eq!(settings.logging.level, "warn");
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let name = dir.path().join("absent").to_string_lossy().into_owned();
    let settings = Settings::load_from(&name).unwrap();

    assert_eq!(settings.storage.backend, StorageBackend::Postgres);
    assert_eq!(settings.auth.session_ttl_hours, 24);
    // Defaults carry no signing secret, so they are not deployable as-is
    assert_matches!(settings.validate(), Err(FixedAssetError::Config(msg)) if msg.contains("JWT secret"));
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    let (_dir, name) = write_config(&CONFIG.replace("http://localhost:8545", "ftp://node"));
    let settings = Settings::load_from(&name).unwrap();
    assert_matches!(settings.validate(), Err(FixedAssetError::Config(msg)) if msg.contains("http or https"));

    let (_dir, name) = write_config(&CONFIG.replace("bcrypt_cost = 6", "bcrypt_cost = 2"));
    let settings = Settings::load_from(&name).unwrap();
    assert_matches!(settings.validate(), Err(FixedAssetError::Config(msg)) if msg.contains("bcrypt"));

    let (_dir, name) = write_config(&CONFIG.replace("level = \"debug\"", "level = \"loud\""));
    let settings = Settings::load_from(&name).unwrap();
    assert_matches!(settings.validate(), Err(FixedAssetError::Config(msg)) if msg.contains("log level"));
}
