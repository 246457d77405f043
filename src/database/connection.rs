//! Database connection management

use sqlx::{Pool, Postgres};
use std::time::{Duration, Instant};

use crate::config::DatabaseConfig;
use crate::utils::errors::Result;
use crate::utils::logging::log_database_operation;

pub type DatabasePool = Pool<Postgres>;

/// Pool options resolved from the database settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
            idle_timeout: config.idle_timeout_seconds.map(Duration::from_secs),
            max_lifetime: config.max_lifetime_seconds.map(Duration::from_secs),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

/// Create a new database connection pool
pub async fn create_pool(config: &PoolConfig) -> Result<DatabasePool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool created successfully"
    );
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    tracing::info!("Running database migrations...");

    let started = Instant::now();
    let result = sqlx::migrate!("./migrations").run(pool).await;
    log_database_operation("migrate", "_sqlx_migrations", started.elapsed().as_millis() as u64, result.is_ok());
    result?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &DatabasePool) -> Result<()> {
    let started = Instant::now();
    let result = sqlx::query("SELECT 1").execute(pool).await;
    log_database_operation("health_check", "-", started.elapsed().as_millis() as u64, result.is_ok());
    result?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_from_settings() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(600)));
        assert!(config.url.starts_with("postgresql://"));
    }
}
