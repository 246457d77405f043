//! Error handling for the fixed asset service
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::TokenType;

/// Main error type for the fixed asset service
#[derive(Error, Debug)]
pub enum FixedAssetError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Session token error: {0}")]
    SessionToken(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Patient not found: {patient_id}")]
    PatientNotFound { patient_id: i64 },

    #[error("Deposit not found: {deposit_id}")]
    DepositNotFound { deposit_id: i64 },

    #[error("Verification not found: {verification_id}")]
    VerificationNotFound { verification_id: i64 },

    #[error("Redemption not found: {redemption_id}")]
    RedemptionNotFound { redemption_id: String },

    #[error("Hospital not found: {hospital_id}")]
    HospitalNotFound { hospital_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Insufficient {token_type} balance: available {}, required {}", .available.normalize(), .required.normalize())]
    InsufficientBalance {
        token_type: TokenType,
        available: Decimal,
        required: Decimal,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Chain RPC specific errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Chain RPC request failed: {0}")]
    RequestFailed(String),

    #[error("Chain RPC timeout")]
    Timeout,

    #[error("Invalid chain RPC response: {0}")]
    InvalidResponse(String),

    #[error("Chain RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Chain client not configured")]
    NotConfigured,
}

/// Result type alias for fixed asset operations
pub type Result<T> = std::result::Result<T, FixedAssetError>;

/// Result type alias for chain operations
pub type ChainResult<T> = std::result::Result<T, ChainError>;

impl FixedAssetError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            FixedAssetError::Database(_) => false,
            FixedAssetError::Migration(_) => false,
            FixedAssetError::Chain(_) => true,
            FixedAssetError::Config(_) => false,
            FixedAssetError::PermissionDenied(_) => false,
            FixedAssetError::Authentication(_) => false,
            FixedAssetError::SessionToken(_) => false,
            FixedAssetError::PasswordHash(_) => false,
            FixedAssetError::UserNotFound { .. } => false,
            FixedAssetError::PatientNotFound { .. } => false,
            FixedAssetError::DepositNotFound { .. } => false,
            FixedAssetError::VerificationNotFound { .. } => false,
            FixedAssetError::RedemptionNotFound { .. } => false,
            FixedAssetError::HospitalNotFound { .. } => false,
            FixedAssetError::NotFound(_) => false,
            FixedAssetError::InvalidStateTransition { .. } => false,
            FixedAssetError::InsufficientBalance { .. } => false,
            FixedAssetError::Conflict(_) => false,
            FixedAssetError::Http(_) => true,
            FixedAssetError::Serialization(_) => false,
            FixedAssetError::Io(_) => true,
            FixedAssetError::UrlParse(_) => false,
            FixedAssetError::RateLimitExceeded => true,
            FixedAssetError::InvalidInput(_) => false,
            FixedAssetError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FixedAssetError::Database(_) => ErrorSeverity::Critical,
            FixedAssetError::Migration(_) => ErrorSeverity::Critical,
            FixedAssetError::Config(_) => ErrorSeverity::Critical,
            FixedAssetError::PermissionDenied(_) => ErrorSeverity::Warning,
            FixedAssetError::Authentication(_) => ErrorSeverity::Warning,
            FixedAssetError::SessionToken(_) => ErrorSeverity::Warning,
            FixedAssetError::RateLimitExceeded => ErrorSeverity::Warning,
            FixedAssetError::InvalidInput(_) => ErrorSeverity::Info,
            FixedAssetError::InvalidStateTransition { .. } => ErrorSeverity::Info,
            FixedAssetError::InsufficientBalance { .. } => ErrorSeverity::Info,
            FixedAssetError::Conflict(_) => ErrorSeverity::Info,
            FixedAssetError::UserNotFound { .. }
            | FixedAssetError::PatientNotFound { .. }
            | FixedAssetError::DepositNotFound { .. }
            | FixedAssetError::VerificationNotFound { .. }
            | FixedAssetError::RedemptionNotFound { .. }
            | FixedAssetError::HospitalNotFound { .. }
            | FixedAssetError::NotFound(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            FixedAssetError::Database(_) | FixedAssetError::Migration(_) => "DATABASE_ERROR",
            FixedAssetError::Chain(_) => "CHAIN_ERROR",
            FixedAssetError::Config(_) => "CONFIG_ERROR",
            FixedAssetError::PermissionDenied(_) => "PERMISSION_DENIED",
            FixedAssetError::Authentication(_) | FixedAssetError::SessionToken(_) => "UNAUTHORIZED",
            FixedAssetError::PasswordHash(_) => "INTERNAL_ERROR",
            FixedAssetError::UserNotFound { .. }
            | FixedAssetError::PatientNotFound { .. }
            | FixedAssetError::DepositNotFound { .. }
            | FixedAssetError::VerificationNotFound { .. }
            | FixedAssetError::RedemptionNotFound { .. }
            | FixedAssetError::HospitalNotFound { .. }
            | FixedAssetError::NotFound(_) => "NOT_FOUND",
            FixedAssetError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            FixedAssetError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            FixedAssetError::Conflict(_) => "CONFLICT",
            FixedAssetError::RateLimitExceeded => "RATE_LIMITED",
            FixedAssetError::InvalidInput(_) => "INVALID_INPUT",
            FixedAssetError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            FixedAssetError::Http(_)
            | FixedAssetError::Serialization(_)
            | FixedAssetError::Io(_)
            | FixedAssetError::UrlParse(_) => "INTERNAL_ERROR",
        }
    }

    /// Shorthand for an illegal status change
    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        FixedAssetError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_message() {
        let err = FixedAssetError::InsufficientBalance {
            token_type: TokenType::Ht,
            available: Decimal::new(500_000_000, 8),
            required: Decimal::new(1000, 2),
        };
        assert_eq!(err.to_string(), "Insufficient HT balance: available 5, required 10");
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(FixedAssetError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(FixedAssetError::RateLimitExceeded.severity(), ErrorSeverity::Warning);
        assert_eq!(
            FixedAssetError::DepositNotFound { deposit_id: 1 }.severity(),
            ErrorSeverity::Info
        );
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_transition_helper() {
        let err = FixedAssetError::transition("MINTED", "PENDING");
        assert_eq!(err.to_string(), "Invalid state transition: MINTED -> PENDING");
    }
}
