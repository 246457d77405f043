//! Banner and health endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Banner {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

/// GET / - service banner
pub async fn banner() -> Json<Banner> {
    Json(Banner {
        service: "fixed-asset",
        version: env!("CARGO_PKG_VERSION"),
        description: "Patient asset tokenization and health benefit service",
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    pub chain: ChainHealth,
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub backend: &'static str,
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct ChainHealth {
    pub backend: &'static str,
    pub block_number: Option<u64>,
}

/// GET /health - database and chain probe
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = state.services.health_check().await;
    let healthy = status.is_healthy();
    debug!(healthy = healthy, "Health check");

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        issues: status.get_issues(),
        database: DatabaseHealth {
            backend: status.database_backend,
            healthy: status.database_healthy,
        },
        chain: ChainHealth {
            backend: status.chain_backend,
            block_number: status.chain_block,
        },
    };
    let code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(body))
}
