//! Fixed Asset service
//!
//! Main application entry point

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use fixed_asset::{
    config::{Settings, StorageBackend},
    create_router,
    database::{create_pool, run_migrations, DatabaseService, PoolConfig},
    services::{chain_from_config, ServiceFactory},
    utils::logging,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", fixed_asset::info());

    let database = match settings.storage.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&PoolConfig::from(&settings.database)).await?;

            info!("Running database migrations...");
            run_migrations(&pool).await?;
            DatabaseService::new(pool)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            DatabaseService::in_memory()
        }
    };

    let chain = chain_from_config(&settings.chain)?;
    info!(chain = chain.name(), "Chain client ready");

    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, database, chain);
    let bind_address = settings.bind_address();
    let state = AppState::new(settings, services);

    if let Some(limiter) = state.rate_limiter.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        });
    }

    let app = create_router(state);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    info!(address = %bind_address, "Fixed Asset service is listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Fixed Asset service has been shut down.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
