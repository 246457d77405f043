//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::settings::StorageBackend;
use super::Settings;
use crate::utils::errors::{FixedAssetError, Result};

/// Minimum length of the session signing secret in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    if settings.storage.backend == StorageBackend::Postgres {
        validate_database_config(&settings.database)?;
    }
    validate_auth_config(&settings.auth)?;
    validate_chain_config(&settings.chain)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(FixedAssetError::Config("Server host is required".to_string()));
    }

    if config.port == 0 {
        return Err(FixedAssetError::Config("Server port must be greater than 0".to_string()));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(FixedAssetError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(FixedAssetError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(FixedAssetError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate session and password settings
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(FixedAssetError::Config(format!(
            "JWT secret must be at least {} bytes",
            MIN_JWT_SECRET_LEN
        )));
    }

    if config.session_ttl_hours <= 0 {
        return Err(FixedAssetError::Config(
            "Session TTL must be greater than 0".to_string(),
        ));
    }

    if !(4..=31).contains(&config.bcrypt_cost) {
        return Err(FixedAssetError::Config(format!(
            "Invalid bcrypt cost: {}. Valid range: 4..=31",
            config.bcrypt_cost
        )));
    }

    Ok(())
}

/// Validate chain RPC configuration
fn validate_chain_config(config: &super::ChainConfig) -> Result<()> {
    if let Some(ref rpc_url) = config.rpc_url {
        let parsed = url::Url::parse(rpc_url)
            .map_err(|e| FixedAssetError::Config(format!("Invalid chain RPC URL {}: {}", rpc_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FixedAssetError::Config(format!(
                "Chain RPC URL must use http or https: {}",
                rpc_url
            )));
        }
    }

    if config.timeout_seconds == 0 {
        return Err(FixedAssetError::Config(
            "Chain timeout must be greater than 0".to_string(),
        ));
    }

    if config.token_symbol.is_empty() {
        return Err(FixedAssetError::Config("Token symbol is required".to_string()));
    }

    Ok(())
}

/// Validate rate limiting configuration
fn validate_rate_limit_config(config: &super::RateLimitConfig) -> Result<()> {
    if config.enabled && (config.requests_per_minute == 0 || config.burst == 0) {
        return Err(FixedAssetError::Config(
            "Rate limit and burst must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(FixedAssetError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(FixedAssetError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "a-very-long-secret-used-only-in-tests".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut settings = valid_settings();
        settings.auth.jwt_secret = "short".to_string();
        assert_matches!(validate_settings(&settings), Err(FixedAssetError::Config(_)));
    }

    #[test]
    fn test_connection_bounds() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());

        settings.storage.backend = StorageBackend::Memory;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_rpc_url_must_be_http() {
        let mut settings = valid_settings();
        settings.chain.rpc_url = Some("ftp://node.example".to_string());
        assert!(validate_settings(&settings).is_err());
        settings.chain.rpc_url = Some("not a url".to_string());
        assert!(validate_settings(&settings).is_err());
        settings.chain.rpc_url = Some("https://rpc.example.org".to_string());
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("Invalid log level: verbose"));
    }
}
