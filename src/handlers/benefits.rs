//! Health benefit endpoints under /api/patients/{id}/benefits

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::deposits::RejectRequest;
use super::ensure_path_matches;
use super::extract::JsonBody;
use crate::middleware::HospitalUser;
use crate::models::{BenefitRedemption, HealthBenefit, RedeemRequest, RedemptionOutcome, ServiceType};
use crate::services::{AuthContext, Permission};
use crate::state::AppState;
use crate::utils::errors::{FixedAssetError, Result};

/// GET /api/patients/{id}/benefits/available
pub async fn available_benefits(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<HealthBenefit>>> {
    auth.require_patient_access(patient_id)?;
    let benefits = state.services.benefit_service.available_benefits(patient_id).await?;
    Ok(Json(benefits))
}

/// GET /api/patients/{id}/benefits/eligible-services
pub async fn eligible_services(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<ServiceType>>> {
    auth.require_patient_access(patient_id)?;
    let services = state.services.benefit_service.eligible_services(patient_id).await?;
    Ok(Json(services))
}

/// POST /api/patients/{id}/benefits/redeem
///
/// An unaffordable request is answered with a REJECTED outcome that is not stored.
pub async fn redeem(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<RedeemRequest>,
) -> Result<Json<RedemptionOutcome>> {
    auth.require_patient_access(patient_id)?;
    ensure_path_matches(patient_id, request.patient_id)?;
    let outcome = state
        .services
        .benefit_service
        .redeem(patient_id, request.service_type, request.ht_amount)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/patients/{id}/benefits/history
pub async fn history(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Vec<BenefitRedemption>>> {
    auth.require_patient_access(patient_id)?;
    let redemptions = state.services.benefit_service.history(patient_id).await?;
    Ok(Json(redemptions))
}

/// GET /api/patients/{id}/benefits/redemption/{redemption_id}
pub async fn get_redemption(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((patient_id, redemption_id)): Path<(i64, String)>,
) -> Result<Json<BenefitRedemption>> {
    auth.require_patient_access(patient_id)?;
    let redemption = state
        .services
        .benefit_service
        .get_for_patient(patient_id, &redemption_id)
        .await?;
    Ok(Json(redemption))
}

/// POST /api/patients/{id}/benefits/redemption/{redemption_id}/approve - hospital staff
pub async fn approve_redemption(
    State(state): State<AppState>,
    HospitalUser(auth): HospitalUser,
    Path((patient_id, redemption_id)): Path<(i64, String)>,
) -> Result<Json<BenefitRedemption>> {
    auth.require(Permission::ProcessRedemptions)?;
    let hospital_id = auth.hospital_id.ok_or_else(|| {
        FixedAssetError::PermissionDenied(format!("User {} is not assigned to a hospital", auth.user_id))
    })?;
    state
        .services
        .benefit_service
        .get_for_patient(patient_id, &redemption_id)
        .await?;
    let redemption = state
        .services
        .benefit_service
        .approve(&redemption_id, hospital_id)
        .await?;
    Ok(Json(redemption))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRedemptionRequest {
    pub transaction_hash: Option<String>,
}

/// POST /api/patients/{id}/benefits/redemption/{redemption_id}/complete - hospital staff
pub async fn complete_redemption(
    State(state): State<AppState>,
    HospitalUser(auth): HospitalUser,
    Path((patient_id, redemption_id)): Path<(i64, String)>,
    body: std::result::Result<JsonBody<CompleteRedemptionRequest>, FixedAssetError>,
) -> Result<Json<BenefitRedemption>> {
    auth.require(Permission::ProcessRedemptions)?;
    // The body is optional; without a hash the burn is submitted to the chain
    let request = body.map(|JsonBody(r)| r).unwrap_or_default();
    state
        .services
        .benefit_service
        .get_for_patient(patient_id, &redemption_id)
        .await?;
    let redemption = state
        .services
        .benefit_service
        .complete(&redemption_id, request.transaction_hash)
        .await?;
    Ok(Json(redemption))
}

/// POST /api/patients/{id}/benefits/redemption/{redemption_id}/reject - hospital staff
pub async fn reject_redemption(
    State(state): State<AppState>,
    HospitalUser(auth): HospitalUser,
    Path((patient_id, redemption_id)): Path<(i64, String)>,
    JsonBody(request): JsonBody<RejectRequest>,
) -> Result<Json<BenefitRedemption>> {
    auth.require(Permission::ProcessRedemptions)?;
    state
        .services
        .benefit_service
        .get_for_patient(patient_id, &redemption_id)
        .await?;
    let redemption = state
        .services
        .benefit_service
        .reject(&redemption_id, &request.reason)
        .await?;
    Ok(Json(redemption))
}

#[derive(Debug, Serialize)]
pub struct TotalRedeemedResponse {
    pub patient_id: i64,
    pub total_redeemed: Decimal,
}

/// GET /api/patients/{id}/benefits/total-redeemed
pub async fn total_redeemed(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<TotalRedeemedResponse>> {
    auth.require_patient_access(patient_id)?;
    let total_redeemed = state.services.benefit_service.total_redeemed(patient_id).await?;
    Ok(Json(TotalRedeemedResponse {
        patient_id,
        total_redeemed,
    }))
}
