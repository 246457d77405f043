//! Shared application state
//!
//! One `AppState` is built at startup and cloned into every request handler.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::middleware::RateLimitMiddleware;
use crate::services::{ServiceFactory, SimulatedChain};

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    pub settings: Arc<Settings>,
    pub rate_limiter: Option<Arc<RateLimitMiddleware>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings, services: ServiceFactory) -> Self {
        let rate_limiter = RateLimitMiddleware::from_config(&settings.rate_limit).map(Arc::new);
        Self {
            services,
            settings: Arc::new(settings),
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// In-memory storage with a simulated chain
    pub fn in_memory(settings: Settings) -> Self {
        let services = ServiceFactory::new(&settings, DatabaseService::in_memory(), Arc::new(SimulatedChain));
        Self::new(settings, services)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
