//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the fixed asset service.

use std::path::Path;

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::models::{TokenType, TransactionType};
use crate::utils::errors::{FixedAssetError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held by `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.file_path {
        Some(file_path) => {
            let path = Path::new(file_path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "fixed-asset.log".to_string());
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let initialized = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stdout))
            .try_init()
    } else {
        registry.with(fmt::layer().with_writer(std::io::stdout)).try_init()
    };
    initialized.map_err(|e| FixedAssetError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(guard)
}

/// Log authentication events
pub fn log_auth_event(user_id: Option<i64>, event: &str, success: bool) {
    if success {
        info!(user_id = user_id, event = event, "Authentication event");
    } else {
        warn!(user_id = user_id, event = event, "Authentication failed");
    }
}

/// Log deposit status changes
pub fn log_deposit_transition(deposit_id: i64, from: &str, to: &str, actor_id: Option<i64>) {
    info!(
        deposit_id = deposit_id,
        from = from,
        to = to,
        actor_id = actor_id,
        "Deposit status changed"
    );
}

/// Log token balance movements
pub fn log_token_movement(patient_id: i64, token_type: TokenType, transaction_type: TransactionType, amount: Decimal) {
    info!(
        patient_id = patient_id,
        token_type = %token_type,
        transaction_type = %transaction_type,
        amount = %amount,
        "Token movement recorded"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
