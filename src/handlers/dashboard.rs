//! Patient dashboard endpoints

use axum::extract::{Path, State};
use axum::Json;

use crate::models::{PatientDashboard, PatientStats, PatientSummary};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

/// GET /api/patients/{id}/dashboard
pub async fn patient_dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<PatientDashboard>> {
    auth.require_patient_access(patient_id)?;
    Ok(Json(state.services.dashboard_service.patient_dashboard(patient_id).await?))
}

/// GET /api/patients/{id}/dashboard/summary
pub async fn patient_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<PatientSummary>> {
    auth.require_patient_access(patient_id)?;
    Ok(Json(state.services.dashboard_service.patient_summary(patient_id).await?))
}

/// GET /api/patients/{id}/dashboard/stats
pub async fn patient_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<i64>,
) -> Result<Json<PatientStats>> {
    auth.require_patient_access(patient_id)?;
    Ok(Json(state.services.dashboard_service.patient_stats(patient_id).await?))
}
