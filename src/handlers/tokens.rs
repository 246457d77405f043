//! Token balance and ledger endpoints under /api/patients/{id}/tokens

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::extract::JsonBody;
use super::{ensure_path_matches, parse_enum};
use crate::models::{AssetToken, TokenBalanceView, TokenTransaction, TokenType};
use crate::services::{AuthContext, Permission};
use crate::state::AppState;
use crate::utils::errors::Result;

/// GET /api/patients/{id}/tokens/balance
pub async fn get_balance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<TokenBalanceView>> {
    auth.require_patient_access(patient_id)?;
    let balance = state.services.token_service.balance(patient_id).await?;
    Ok(Json(balance))
}

/// Signed change: positive mints, negative burns
#[derive(Debug, Deserialize)]
pub struct BalanceUpdateRequest {
    pub amount: Decimal,
}

/// POST /api/patients/{id}/tokens/asset/update - bank only
pub async fn update_asset_balance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<BalanceUpdateRequest>,
) -> Result<Json<TokenBalanceView>> {
    auth.require(Permission::ManageBalances)?;
    let balance = state
        .services
        .token_service
        .update_asset_balance(patient_id, request.amount)
        .await?;
    Ok(Json(balance))
}

/// POST /api/patients/{id}/tokens/health/update - bank only
pub async fn update_health_balance(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<BalanceUpdateRequest>,
) -> Result<Json<TokenBalanceView>> {
    auth.require(Permission::ManageBalances)?;
    let balance = state
        .services
        .token_service
        .update_health_balance(patient_id, request.amount)
        .await?;
    Ok(Json(balance))
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub patient_id: Option<i64>,
    pub to_patient_id: i64,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub message: String,
    pub sender: TokenTransaction,
    pub receiver: TokenTransaction,
}

/// POST /api/patients/{id}/tokens/transfer - owner only
pub async fn transfer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<TransferRequest>,
) -> Result<Json<TransferResponse>> {
    auth.require_owner(patient_id)?;
    ensure_path_matches(patient_id, request.patient_id)?;
    let (sender, receiver) = state
        .services
        .token_service
        .transfer_asset_tokens(patient_id, request.to_patient_id, request.amount)
        .await?;
    Ok(Json(TransferResponse {
        message: "Tokens transferred successfully".to_string(),
        sender,
        receiver,
    }))
}

/// GET /api/patients/{id}/tokens/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<TokenTransaction>>> {
    auth.require_patient_access(patient_id)?;
    let transactions = state.services.token_service.transactions(patient_id, None).await?;
    Ok(Json(transactions))
}

/// GET /api/patients/{id}/tokens/transactions/{token_type}
pub async fn list_transactions_by_type(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, token_type)): Path<(i64, String)>,
) -> Result<Json<Vec<TokenTransaction>>> {
    auth.require_patient_access(patient_id)?;
    let token_type: TokenType = parse_enum(&token_type)?;
    let transactions = state
        .services
        .token_service
        .transactions(patient_id, Some(token_type))
        .await?;
    Ok(Json(transactions))
}

#[derive(Debug, Serialize)]
pub struct TotalMintedResponse {
    pub patient_id: i64,
    pub token_type: TokenType,
    pub total_minted: Decimal,
}

/// GET /api/patients/{id}/tokens/total-minted/{token_type}
pub async fn total_minted(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, token_type)): Path<(i64, String)>,
) -> Result<Json<TotalMintedResponse>> {
    auth.require_patient_access(patient_id)?;
    let token_type: TokenType = parse_enum(&token_type)?;
    let total_minted = state.services.token_service.total_minted(patient_id, token_type).await?;
    Ok(Json(TotalMintedResponse {
        patient_id,
        token_type,
        total_minted,
    }))
}

/// GET /api/patients/{id}/tokens/assets
pub async fn list_asset_tokens(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<AssetToken>>> {
    auth.require_patient_access(patient_id)?;
    let tokens = state.services.token_service.asset_tokens(patient_id).await?;
    Ok(Json(tokens))
}
