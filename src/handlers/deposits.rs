//! Asset deposit endpoints under /api/patients/{id}/deposits

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ensure_path_matches, parse_enum};
use super::extract::JsonBody;
use crate::models::{AssetDeposit, DepositStatus, SubmitDepositRequest};
use crate::services::{AuthContext, Permission};
use crate::state::AppState;
use crate::utils::errors::Result;

/// POST /api/patients/{id}/deposits
pub async fn submit_deposit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<SubmitDepositRequest>,
) -> Result<Json<AssetDeposit>> {
    auth.require_patient_access(patient_id)?;
    ensure_path_matches(patient_id, request.patient_id)?;
    let deposit = state.services.deposit_service.submit(patient_id, request).await?;
    Ok(Json(deposit))
}

/// GET /api/patients/{id}/deposits
pub async fn list_deposits(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<AssetDeposit>>> {
    auth.require_patient_access(patient_id)?;
    let deposits = state.services.deposit_service.list_for_patient(patient_id).await?;
    Ok(Json(deposits))
}

/// GET /api/patients/{id}/deposits/{deposit_id}
pub async fn get_deposit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, deposit_id)): Path<(i64, i64)>,
) -> Result<Json<AssetDeposit>> {
    auth.require_patient_access(patient_id)?;
    let deposit = state
        .services
        .deposit_service
        .get_for_patient(patient_id, deposit_id)
        .await?;
    Ok(Json(deposit))
}

/// GET /api/patients/{id}/deposits/status/{status}
///
/// Only deposits of the patient in the path are returned.
pub async fn list_deposits_by_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, status)): Path<(i64, String)>,
) -> Result<Json<Vec<AssetDeposit>>> {
    auth.require_patient_access(patient_id)?;
    let status: DepositStatus = parse_enum(&status)?;
    let deposits = state
        .services
        .deposit_service
        .list_by_status(status)
        .await?
        .into_iter()
        .filter(|d| d.patient_id == patient_id)
        .collect();
    Ok(Json(deposits))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DepositStatus,
    pub chain_deposit_id: Option<String>,
}

/// PUT /api/patients/{id}/deposits/{deposit_id}/status - hospital or bank
pub async fn update_deposit_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, deposit_id)): Path<(i64, i64)>,
    JsonBody(request): JsonBody<UpdateStatusRequest>,
) -> Result<Json<AssetDeposit>> {
    auth.require(Permission::ReviewDeposits)?;
    state
        .services
        .deposit_service
        .get_for_patient(patient_id, deposit_id)
        .await?;
    let deposit = state
        .services
        .deposit_service
        .update_status(deposit_id, request.status, request.chain_deposit_id, Some(auth.user_id))
        .await?;
    Ok(Json(deposit))
}

#[derive(Debug, Deserialize)]
pub struct ApproveDepositRequest {
    pub tokens_to_mint: Decimal,
    pub chain_deposit_id: Option<String>,
}

/// POST /api/patients/{id}/deposits/{deposit_id}/approve - hospital or bank
pub async fn approve_deposit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, deposit_id)): Path<(i64, i64)>,
    JsonBody(request): JsonBody<ApproveDepositRequest>,
) -> Result<Json<AssetDeposit>> {
    auth.require(Permission::ReviewDeposits)?;
    state
        .services
        .deposit_service
        .get_for_patient(patient_id, deposit_id)
        .await?;
    let deposit = state
        .services
        .deposit_service
        .approve(deposit_id, request.tokens_to_mint, request.chain_deposit_id, Some(auth.user_id))
        .await?;
    Ok(Json(deposit))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// POST /api/patients/{id}/deposits/{deposit_id}/reject - hospital or bank
pub async fn reject_deposit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, deposit_id)): Path<(i64, i64)>,
    JsonBody(request): JsonBody<RejectRequest>,
) -> Result<Json<AssetDeposit>> {
    auth.require(Permission::ReviewDeposits)?;
    state
        .services
        .deposit_service
        .get_for_patient(patient_id, deposit_id)
        .await?;
    let deposit = state
        .services
        .deposit_service
        .reject(deposit_id, &request.reason, Some(auth.user_id))
        .await?;
    Ok(Json(deposit))
}

#[derive(Debug, Serialize)]
pub struct TotalTokensResponse {
    pub patient_id: i64,
    pub total_tokens: Decimal,
}

/// GET /api/patients/{id}/deposits/total-tokens
pub async fn total_tokens(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<TotalTokensResponse>> {
    auth.require_patient_access(patient_id)?;
    let total_tokens = state.services.deposit_service.total_minted_tokens(patient_id).await?;
    Ok(Json(TotalTokensResponse { patient_id, total_tokens }))
}
