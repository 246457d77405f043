//! Database service layer
//!
//! This module bundles one handle per storage trait so services can share
//! a single backend, either Postgres or in-memory.

use std::sync::Arc;

use crate::database::memory::MemoryStore;
use crate::database::repositories::*;
use crate::database::traits::*;
use crate::database::{health_check, DatabasePool};
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct DatabaseService {
    pub users: Arc<dyn UserStore>,
    pub patients: Arc<dyn PatientStore>,
    pub deposits: Arc<dyn DepositStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub benefits: Arc<dyn BenefitStore>,
    pub minting: Arc<dyn MintingStore>,
    pub hospitals: Arc<dyn HospitalStore>,
    pub insurance: Arc<dyn InsuranceStore>,
    pool: Option<DatabasePool>,
}

impl DatabaseService {
    /// Postgres-backed repositories sharing one pool
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            patients: Arc::new(PatientRepository::new(pool.clone())),
            deposits: Arc::new(DepositRepository::new(pool.clone())),
            tokens: Arc::new(TokenRepository::new(pool.clone())),
            benefits: Arc::new(BenefitRepository::new(pool.clone())),
            minting: Arc::new(MintingRepository::new(pool.clone())),
            hospitals: Arc::new(HospitalRepository::new(pool.clone())),
            insurance: Arc::new(InsuranceRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Every handle points at the same in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            patients: store.clone(),
            deposits: store.clone(),
            tokens: store.clone(),
            benefits: store.clone(),
            minting: store.clone(),
            hospitals: store.clone(),
            insurance: store,
            pool: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    /// Probe the backing database; the in-memory store is always healthy
    pub async fn health_check(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => health_check(pool).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("backend", &self.backend_name())
            .finish()
    }
}
