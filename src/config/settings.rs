//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file (without extension)
pub const CONFIG_FILE_ENV: &str = "FIXED_ASSET_CONFIG";

/// Prefix of environment overrides, e.g. `FIXED_ASSET__SERVER__PORT`
pub const ENV_PREFIX: &str = "FIXED_ASSET";

/// Main application configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub chain: ChainConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
    pub max_lifetime_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Storage backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Session token and password hashing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

/// Chain RPC configuration. Without `rpc_url` a simulated chain is used.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: Option<String>,
    pub timeout_seconds: u64,
    pub token_symbol: String,
}

/// Per-client rate limiting
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub burst: u32,
    /// Take the client address from `x-forwarded-for`/`x-real-ip`.
    /// Only enable behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub insurance: bool,
    pub trading: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from(&file)
    }

    /// Load settings from the named file (optional) plus environment overrides
    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::FixedAssetError> {
        super::validation::validate_settings(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/fixed_asset".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Postgres,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_ttl_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            timeout_seconds: 10,
            token_symbol: "HBT".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 120,
            burst: 20,
            trust_forwarded_headers: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            json: false,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            insurance: true,
            trading: true,
        }
    }
}
