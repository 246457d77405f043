//! Patient profile endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::extract::{JsonBody, QueryParams};
use crate::models::{Patient, TokenBalanceView, UpdatePatientRequest};
use crate::services::{AuthContext, Permission};
use crate::state::AppState;
use crate::utils::errors::Result;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/patients - hospital and bank staff only
pub async fn list_patients(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<Patient>>> {
    auth.require(Permission::ViewPatients)?;
    let patients = state.services.patient_service.list(query.limit, query.offset).await?;
    Ok(Json(patients))
}

/// GET /api/patients/{id}
pub async fn get_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<Patient>> {
    auth.require_patient_access(patient_id)?;
    let patient = state.services.patient_service.get_by_id(patient_id).await?;
    Ok(Json(patient))
}

/// GET /api/patients/email/{email}
pub async fn get_patient_by_email(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
) -> Result<Json<Patient>> {
    let patient = state.services.patient_service.get_by_email(&email).await?;
    auth.require_patient_access(patient.id)?;
    Ok(Json(patient))
}

/// GET /api/patients/registration/{registration_id}
pub async fn get_patient_by_registration(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(registration_id): Path<String>,
) -> Result<Json<Patient>> {
    let patient = state
        .services
        .patient_service
        .get_by_registration_id(&registration_id)
        .await?;
    auth.require_patient_access(patient.id)?;
    Ok(Json(patient))
}

/// PUT /api/patients/{id}
pub async fn update_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<UpdatePatientRequest>,
) -> Result<Json<Patient>> {
    auth.require_patient_access(patient_id)?;
    let patient = state.services.patient_service.update(patient_id, request).await?;
    Ok(Json(patient))
}

/// DELETE /api/patients/{id} - bank only
pub async fn delete_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<StatusCode> {
    auth.require(Permission::ManageBalances)?;
    state.services.patient_service.delete(patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct EmailExistsResponse {
    pub email: String,
    pub exists: bool,
}

/// GET /api/patients/check-email/{email} - open so sign-up forms can check
pub async fn check_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<EmailExistsResponse>> {
    let exists = state.services.patient_service.email_exists(&email).await?;
    Ok(Json(EmailExistsResponse { email, exists }))
}

#[derive(Debug, Deserialize)]
pub struct SetBalancesRequest {
    pub asset_token_balance: Option<Decimal>,
    pub health_token_balance: Option<Decimal>,
}

/// PATCH /api/patients/{id}/tokens - bank only
pub async fn set_token_balances(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
    JsonBody(request): JsonBody<SetBalancesRequest>,
) -> Result<Json<TokenBalanceView>> {
    auth.require(Permission::ManageBalances)?;
    let balance = state
        .services
        .token_service
        .set_balances(patient_id, request.asset_token_balance, request.health_token_balance)
        .await?;
    Ok(Json(balance))
}
