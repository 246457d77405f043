//! Fixed Asset service
//!
//! Backend for the patient, hospital and bank portals of an asset tokenization
//! and health benefit platform. Patients deposit physical assets, the bank
//! verifies them and mints asset tokens, and health tokens are redeemed for
//! medical services at hospitals.

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{FixedAssetError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::create_router;
pub use services::ServiceFactory;
pub use state::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
