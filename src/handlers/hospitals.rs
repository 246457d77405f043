//! Hospital portal endpoints under /api/hospitals

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::deposits::RejectRequest;
use super::extract::{JsonBody, QueryParams};
use crate::middleware::{BankUser, HospitalUser};
use crate::models::{
    AssetRequest, AssetRequestDetail, AssetRequestStatus, BenefitAllocation, Hospital, HospitalStaff, HospitalStats,
    NewAllocation, NewHospital, NewTrade, Patient, Trade, TradeStatus,
};
use crate::services::{AuthContext, Permission};
use crate::state::AppState;
use crate::utils::errors::Result;

/// POST /api/hospitals - bank only
pub async fn create_hospital(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    JsonBody(request): JsonBody<NewHospital>,
) -> Result<Json<Hospital>> {
    auth.require(Permission::ManageHospitals)?;
    Ok(Json(state.services.hospital_service.create_hospital(request).await?))
}

/// GET /api/hospitals/me - the caller's own hospital
pub async fn my_hospital(State(state): State<AppState>, HospitalUser(auth): HospitalUser) -> Result<Json<Hospital>> {
    Ok(Json(state.services.hospital_service.hospital_for_user(auth.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddStaffRequest {
    pub user_id: i64,
    pub role: Option<String>,
}

/// POST /api/hospitals/{id}/staff - bank only
pub async fn add_staff(
    State(state): State<AppState>,
    BankUser(auth): BankUser,
    Path(hospital_id): Path<i64>,
    JsonBody(request): JsonBody<AddStaffRequest>,
) -> Result<Json<HospitalStaff>> {
    auth.require(Permission::ManageHospitals)?;
    let role = request.role.as_deref().unwrap_or("staff");
    let staff = state
        .services
        .hospital_service
        .add_staff(hospital_id, request.user_id, role)
        .await?;
    Ok(Json(staff))
}

/// GET /api/hospitals/{id}
pub async fn get_hospital(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
) -> Result<Json<Hospital>> {
    auth.require_hospital_access(hospital_id)?;
    Ok(Json(state.services.hospital_service.get_hospital(hospital_id).await?))
}

/// GET /api/hospitals/{id}/patients
pub async fn hospital_patients(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
) -> Result<Json<Vec<Patient>>> {
    auth.require_hospital_access(hospital_id)?;
    Ok(Json(state.services.hospital_service.patients(hospital_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetRequestFilter {
    pub status: Option<AssetRequestStatus>,
}

/// GET /api/hospitals/{id}/asset-requests?status=
pub async fn asset_requests(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
    QueryParams(filter): QueryParams<AssetRequestFilter>,
) -> Result<Json<Vec<AssetRequestDetail>>> {
    auth.require_hospital_access(hospital_id)?;
    let requests = state
        .services
        .hospital_service
        .asset_requests(hospital_id, filter.status)
        .await?;
    Ok(Json(requests))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequestBody {
    pub notes: Option<String>,
}

/// POST /api/hospitals/{id}/asset-requests/{request_id}/approve
pub async fn approve_asset_request(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((hospital_id, request_id)): Path<(i64, i64)>,
    JsonBody(body): JsonBody<ApproveRequestBody>,
) -> Result<Json<AssetRequest>> {
    auth.require_hospital_access(hospital_id)?;
    let request = state
        .services
        .hospital_service
        .approve_asset_request(hospital_id, request_id, body.notes)
        .await?;
    Ok(Json(request))
}

/// POST /api/hospitals/{id}/asset-requests/{request_id}/reject
pub async fn reject_asset_request(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((hospital_id, request_id)): Path<(i64, i64)>,
    JsonBody(body): JsonBody<RejectRequest>,
) -> Result<Json<AssetRequest>> {
    auth.require_hospital_access(hospital_id)?;
    let request = state
        .services
        .hospital_service
        .reject_asset_request(hospital_id, request_id, &body.reason)
        .await?;
    Ok(Json(request))
}

/// GET /api/hospitals/{id}/trades
pub async fn list_trades(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
) -> Result<Json<Vec<Trade>>> {
    auth.require_hospital_access(hospital_id)?;
    Ok(Json(state.services.hospital_service.trades(hospital_id).await?))
}

/// POST /api/hospitals/{id}/trades
pub async fn create_trade(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
    JsonBody(trade): JsonBody<NewTrade>,
) -> Result<Json<Trade>> {
    auth.require_hospital_access(hospital_id)?;
    Ok(Json(state.services.hospital_service.create_trade(hospital_id, trade).await?))
}

#[derive(Debug, Deserialize)]
pub struct TradeStatusRequest {
    pub status: TradeStatus,
}

/// PUT /api/hospitals/{id}/trades/{trade_id}/status
pub async fn update_trade_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((hospital_id, trade_id)): Path<(i64, i64)>,
    JsonBody(request): JsonBody<TradeStatusRequest>,
) -> Result<Json<Trade>> {
    auth.require_hospital_access(hospital_id)?;
    let trade = state
        .services
        .hospital_service
        .update_trade_status(hospital_id, trade_id, request.status)
        .await?;
    Ok(Json(trade))
}

/// POST /api/hospitals/{id}/allocations
pub async fn allocate_benefits(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
    JsonBody(request): JsonBody<NewAllocation>,
) -> Result<Json<BenefitAllocation>> {
    auth.require_hospital_access(hospital_id)?;
    let allocation = state
        .services
        .hospital_service
        .allocate_benefits(hospital_id, request.total_amount, request.distribution_date)
        .await?;
    Ok(Json(allocation))
}

/// GET /api/hospitals/{id}/dashboard
pub async fn hospital_dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(hospital_id): Path<i64>,
) -> Result<Json<HospitalStats>> {
    auth.require_hospital_access(hospital_id)?;
    Ok(Json(state.services.dashboard_service.hospital_stats(hospital_id).await?))
}
