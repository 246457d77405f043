//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod benefit;
pub mod chain;
pub mod dashboard;
pub mod deposit;
pub mod hospital;
pub mod insurance;
pub mod minting;
pub mod patient;
pub mod token;

// Re-export commonly used services
pub use auth::{AuthContext, AuthService, Claims, Permission};
pub use benefit::BenefitService;
pub use chain::{chain_from_config, ChainClient, RpcChainClient, SimulatedChain};
pub use dashboard::DashboardService;
pub use deposit::DepositService;
pub use hospital::HospitalService;
pub use insurance::InsuranceService;
pub use minting::MintingService;
pub use patient::PatientService;
pub use token::TokenService;

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::config::Settings;
use crate::database::DatabaseService;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub db: DatabaseService,
    pub chain: Arc<dyn ChainClient>,
    pub auth_service: AuthService,
    pub patient_service: PatientService,
    pub deposit_service: DepositService,
    pub token_service: TokenService,
    pub benefit_service: BenefitService,
    pub minting_service: MintingService,
    pub hospital_service: HospitalService,
    pub insurance_service: InsuranceService,
    pub dashboard_service: DashboardService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, db: DatabaseService, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            auth_service: AuthService::new(db.clone(), settings.auth.clone()),
            patient_service: PatientService::new(db.clone()),
            deposit_service: DepositService::new(db.clone(), chain.clone()),
            token_service: TokenService::new(db.clone()),
            benefit_service: BenefitService::new(db.clone(), chain.clone()),
            minting_service: MintingService::new(db.clone(), chain.clone(), settings.chain.token_symbol.clone()),
            hospital_service: HospitalService::new(db.clone(), settings.features.trading),
            insurance_service: InsuranceService::new(db.clone(), settings.features.insurance),
            dashboard_service: DashboardService::new(db.clone()),
            db,
            chain,
        }
    }

    /// Health check for the database and chain
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = match self.db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        };
        let chain_block = match self.chain.block_number().await {
            Ok(block) => Some(block),
            Err(e) => {
                warn!(error = %e, chain = self.chain.name(), "Chain health check failed");
                None
            }
        };

        ServiceHealthStatus {
            database_backend: self.db.backend_name(),
            database_healthy,
            chain_backend: self.chain.name(),
            chain_block,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_backend: &'static str,
    pub database_healthy: bool,
    pub chain_backend: &'static str,
    pub chain_block: Option<u64>,
}

impl ServiceHealthStatus {
    /// The service is healthy when its database answers; the chain is advisory
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy components
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push(format!("Database ({}) unreachable", self.database_backend));
        }
        if self.chain_block.is_none() {
            issues.push(format!("Chain ({}) unreachable", self.chain_backend));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_factory_is_healthy() {
        let settings = Settings::default();
        let factory = ServiceFactory::new(&settings, DatabaseService::in_memory(), Arc::new(SimulatedChain));
        let status = factory.health_check().await;
        assert!(status.is_healthy());
        assert!(status.get_issues().is_empty());
        assert_eq!(status.database_backend, "memory");
        assert_eq!(status.chain_block, Some(chain::SIMULATED_BLOCK_NUMBER));
    }
}
