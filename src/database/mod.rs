//! Database module
//!
//! This module handles database connections and storage backends

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod traits;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool, PoolConfig};
pub use memory::MemoryStore;
pub use service::DatabaseService;
pub use traits::{
    BenefitStore, DepositStore, HospitalStore, InsuranceStore, MintingStore, PatientStore, TokenStore, UserStore,
};
