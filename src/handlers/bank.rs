//! Bank portal endpoints under /api/bank
//!
//! Every route takes a `BankUser`, so non-bank callers get 403.

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::deposits::RejectRequest;
use super::extract::{JsonBody, QueryParams};
use crate::middleware::BankUser;
use crate::models::{
    AssetToken, AssetVerification, BankStaff, BankStats, ClaimStatus, InsuranceClaim, InsurancePolicy,
    MintingRequest, NewBankStaff, NewClaim, NewPolicy, PolicyStatus, VerificationStatus,
};
use crate::services::Permission;
use crate::state::AppState;
use crate::utils::errors::Result;

#[derive(Debug, Default, Deserialize)]
pub struct VerificationFilter {
    pub status: Option<VerificationStatus>,
}

/// GET /api/bank/minting-requests?status=
pub async fn minting_requests(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    QueryParams(filter): QueryParams<VerificationFilter>,
) -> Result<Json<Vec<MintingRequest>>> {
    auth.require(Permission::BankOperations)?;
    let requests = state.services.minting_service.minting_requests(filter.status).await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
pub struct VerifyAssetRequest {
    pub verified_value: Decimal,
    pub tokens_to_mint: Decimal,
    pub verification_notes: Option<String>,
    pub ipfs_hash: Option<String>,
}

/// POST /api/bank/deposits/{deposit_id}/verify
pub async fn verify_asset(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    Path(deposit_id): Path<i64>,
    JsonBody(request): JsonBody<VerifyAssetRequest>,
) -> Result<Json<AssetVerification>> {
    auth.require(Permission::BankOperations)?;
    let verification = state
        .services
        .minting_service
        .verify_asset(
            deposit_id,
            request.verified_value,
            request.tokens_to_mint,
            request.verification_notes,
            request.ipfs_hash,
            auth.user_id,
        )
        .await?;
    Ok(Json(verification))
}

/// POST /api/bank/minting-requests/{id}/approve
pub async fn approve_minting(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    Path(verification_id): Path<i64>,
) -> Result<Json<AssetToken>> {
    auth.require(Permission::BankOperations)?;
    let token = state
        .services
        .minting_service
        .approve_minting(verification_id, auth.user_id)
        .await?;
    Ok(Json(token))
}

/// POST /api/bank/minting-requests/{id}/reject
pub async fn reject_minting(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    Path(verification_id): Path<i64>,
    JsonBody(request): JsonBody<RejectRequest>,
) -> Result<Json<AssetVerification>> {
    auth.require(Permission::BankOperations)?;
    let verification = state
        .services
        .minting_service
        .reject_minting(verification_id, &request.reason, auth.user_id)
        .await?;
    Ok(Json(verification))
}

/// GET /api/bank/ledger
pub async fn token_ledger(State(state): State<AppState>, BankUser(auth): BankUser) -> Result<Json<Vec<AssetToken>>> {
    auth.require(Permission::BankOperations)?;
    Ok(Json(state.services.minting_service.token_ledger().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct PolicyFilter {
    pub status: Option<PolicyStatus>,
}

/// GET /api/bank/insurance/policies?status=
pub async fn list_policies(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    QueryParams(filter): QueryParams<PolicyFilter>,
) -> Result<Json<Vec<InsurancePolicy>>> {
    auth.require(Permission::BankOperations)?;
    Ok(Json(state.services.insurance_service.policies(filter.status).await?))
}

/// POST /api/bank/insurance/policies
pub async fn create_policy(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    JsonBody(request): JsonBody<NewPolicy>,
) -> Result<Json<InsurancePolicy>> {
    auth.require(Permission::BankOperations)?;
    Ok(Json(state.services.insurance_service.create_policy(request).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClaimFilter {
    pub status: Option<ClaimStatus>,
}

/// GET /api/bank/insurance/claims?status=
pub async fn list_claims(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    QueryParams(filter): QueryParams<ClaimFilter>,
) -> Result<Json<Vec<InsuranceClaim>>> {
    auth.require(Permission::BankOperations)?;
    Ok(Json(state.services.insurance_service.claims(filter.status).await?))
}

/// POST /api/bank/insurance/claims
pub async fn file_claim(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    JsonBody(request): JsonBody<NewClaim>,
) -> Result<Json<InsuranceClaim>> {
    auth.require(Permission::BankOperations)?;
    Ok(Json(state.services.insurance_service.file_claim(request).await?))
}

/// GET /api/bank/dashboard
pub async fn dashboard(State(state): State<AppState>, BankUser(auth): BankUser) -> Result<Json<BankStats>> {
    auth.require(Permission::BankOperations)?;
    Ok(Json(state.services.dashboard_service.bank_stats().await?))
}

/// GET /api/bank/staff/me
pub async fn staff_info(State(state): State<AppState>, BankUser(auth): BankUser) -> Result<Json<BankStaff>> {
    Ok(Json(state.services.minting_service.bank_staff_info(auth.user_id).await?))
}

/// POST /api/bank/staff/me
pub async fn register_staff(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    JsonBody(request): JsonBody<NewBankStaff>,
) -> Result<Json<BankStaff>> {
    let staff = state
        .services
        .minting_service
        .register_bank_staff(auth.user_id, request)
        .await?;
    Ok(Json(staff))
}
