//! HTTP handlers module
//!
//! This module contains the JSON API organized by portal:
//! - Auth and system endpoints
//! - Patient-scoped endpoints (profile, deposits, tokens, benefits, dashboard)
//! - Bank and hospital portals

pub mod auth;
pub mod bank;
pub mod benefits;
pub mod dashboard;
pub mod deposits;
pub mod error;
pub mod extract;
pub mod hospitals;
pub mod patients;
pub mod system;
pub mod tokens;

pub use error::ErrorResponse;

use std::str::FromStr;

use axum::http::HeaderValue;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::middleware::{rate_limit, with_request_tracing};
use crate::models::ParseEnumError;
use crate::state::AppState;
use crate::utils::errors::{FixedAssetError, Result};

/// Reject a body `patient_id` that differs from the one in the path
pub fn ensure_path_matches(path_patient_id: i64, body_patient_id: Option<i64>) -> Result<()> {
    match body_patient_id {
        Some(id) if id != path_patient_id => Err(FixedAssetError::InvalidInput(
            "Patient ID in path and request body do not match".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Parse a status-like path segment
pub fn parse_enum<T>(raw: &str) -> Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    raw.parse().map_err(|e: ParseEnumError| FixedAssetError::InvalidInput(e.to_string()))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/validate", get(auth::validate))
        .route("/api/auth/me", get(auth::me).put(auth::update_me))
}

fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/api/patients", get(patients::list_patients))
        .route(
            "/api/patients/{id}",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route("/api/patients/email/{email}", get(patients::get_patient_by_email))
        .route("/api/patients/registration/{registration_id}", get(patients::get_patient_by_registration))
        .route("/api/patients/check-email/{email}", get(patients::check_email))
        .route("/api/patients/{id}/tokens", patch(patients::set_token_balances))
        .route("/api/patients/{id}/dashboard", get(dashboard::patient_dashboard))
        .route("/api/patients/{id}/dashboard/summary", get(dashboard::patient_summary))
        .route("/api/patients/{id}/dashboard/stats", get(dashboard::patient_stats))
}

fn deposit_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/patients/{id}/deposits",
            post(deposits::submit_deposit).get(deposits::list_deposits),
        )
        .route("/api/patients/{id}/deposits/total-tokens", get(deposits::total_tokens))
        .route("/api/patients/{id}/deposits/status/{status}", get(deposits::list_deposits_by_status))
        .route("/api/patients/{id}/deposits/{deposit_id}", get(deposits::get_deposit))
        .route("/api/patients/{id}/deposits/{deposit_id}/status", put(deposits::update_deposit_status))
        .route("/api/patients/{id}/deposits/{deposit_id}/approve", post(deposits::approve_deposit))
        .route("/api/patients/{id}/deposits/{deposit_id}/reject", post(deposits::reject_deposit))
}

fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/api/patients/{id}/tokens/balance", get(tokens::get_balance))
        .route("/api/patients/{id}/tokens/asset/update", post(tokens::update_asset_balance))
        .route("/api/patients/{id}/tokens/health/update", post(tokens::update_health_balance))
        .route("/api/patients/{id}/tokens/transfer", post(tokens::transfer))
        .route("/api/patients/{id}/tokens/transactions", get(tokens::list_transactions))
        .route("/api/patients/{id}/tokens/transactions/{token_type}", get(tokens::list_transactions_by_type))
        .route("/api/patients/{id}/tokens/total-minted/{token_type}", get(tokens::total_minted))
        .route("/api/patients/{id}/tokens/assets", get(tokens::list_asset_tokens))
}

fn benefit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/patients/{id}/benefits/available", get(benefits::available_benefits))
        .route("/api/patients/{id}/benefits/eligible-services", get(benefits::eligible_services))
        .route("/api/patients/{id}/benefits/redeem", post(benefits::redeem))
        .route("/api/patients/{id}/benefits/history", get(benefits::history))
        .route("/api/patients/{id}/benefits/redemption/{redemption_id}", get(benefits::get_redemption))
        .route(
            "/api/patients/{id}/benefits/redemption/{redemption_id}/approve",
            post(benefits::approve_redemption),
        )
        .route(
            "/api/patients/{id}/benefits/redemption/{redemption_id}/complete",
            post(benefits::complete_redemption),
        )
        .route(
            "/api/patients/{id}/benefits/redemption/{redemption_id}/reject",
            post(benefits::reject_redemption),
        )
        .route("/api/patients/{id}/benefits/total-redeemed", get(benefits::total_redeemed))
}

fn bank_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bank/minting-requests", get(bank::minting_requests))
        .route("/api/bank/minting-requests/{id}/approve", post(bank::approve_minting))
        .route("/api/bank/minting-requests/{id}/reject", post(bank::reject_minting))
        .route("/api/bank/deposits/{deposit_id}/verify", post(bank::verify_asset))
        .route("/api/bank/ledger", get(bank::token_ledger))
        .route(
            "/api/bank/insurance/policies",
            get(bank::list_policies).post(bank::create_policy),
        )
        .route("/api/bank/insurance/claims", get(bank::list_claims).post(bank::file_claim))
        .route("/api/bank/dashboard", get(bank::dashboard))
        .route("/api/bank/staff/me", get(bank::staff_info).post(bank::register_staff))
}

fn hospital_routes() -> Router<AppState> {
    Router::new()
        .route("/api/hospitals", post(hospitals::create_hospital))
        .route("/api/hospitals/me", get(hospitals::my_hospital))
        .route("/api/hospitals/{id}", get(hospitals::get_hospital))
        .route("/api/hospitals/{id}/staff", post(hospitals::add_staff))
        .route("/api/hospitals/{id}/patients", get(hospitals::hospital_patients))
        .route("/api/hospitals/{id}/asset-requests", get(hospitals::asset_requests))
        .route(
            "/api/hospitals/{id}/asset-requests/{request_id}/approve",
            post(hospitals::approve_asset_request),
        )
        .route(
            "/api/hospitals/{id}/asset-requests/{request_id}/reject",
            post(hospitals::reject_asset_request),
        )
        .route(
            "/api/hospitals/{id}/trades",
            get(hospitals::list_trades).post(hospitals::create_trade),
        )
        .route("/api/hospitals/{id}/trades/{trade_id}/status", put(hospitals::update_trade_status))
        .route("/api/hospitals/{id}/allocations", post(hospitals::allocate_benefits))
        .route("/api/hospitals/{id}/dashboard", get(hospitals::hospital_dashboard))
}

/// Build the application router with all layers applied
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server.cors_origins);

    let api = Router::new()
        .route("/", get(system::banner))
        .route("/health", get(system::health))
        .merge(auth_routes())
        .merge(patient_routes())
        .merge(deposit_routes())
        .merge(token_routes())
        .merge(benefit_routes())
        .merge(bank_routes())
        .merge(hospital_routes())
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state);

    with_request_tracing(api).layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DepositStatus;

    #[test]
    fn test_path_body_mismatch() {
        assert!(ensure_path_matches(1, None).is_ok());
        assert!(ensure_path_matches(1, Some(1)).is_ok());
        let err = ensure_path_matches(1, Some(2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: Patient ID in path and request body do not match"
        );
    }

    #[test]
    fn test_parse_enum_path_segment() {
        assert_eq!(parse_enum::<DepositStatus>("approved").unwrap(), DepositStatus::Approved);
        assert!(matches!(
            parse_enum::<DepositStatus>("lost"),
            Err(FixedAssetError::InvalidInput(_))
        ));
    }
}
