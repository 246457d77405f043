//! Registration, login and the caller's own profile

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::extract::JsonBody;
use crate::middleware::bearer_token;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UpdateUserRequest, User, UserRole};
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::Result;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .or_else(|| header_value(headers, "x-real-ip"))
}

/// POST /api/auth/register
pub async fn register(State(state): State<AppState>, JsonBody(request): JsonBody<RegisterRequest>) -> Result<Json<AuthResponse>> {
    let response = state.services.auth_service.register(request).await?;
    Ok(Json(response))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user_agent = header_value(&headers, USER_AGENT.as_str());
    let response = state
        .services
        .auth_service
        .login(request, user_agent, client_ip(&headers))
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub sessions_revoked: u64,
}

/// POST /api/auth/logout - revokes every session of the caller
pub async fn logout(State(state): State<AppState>, auth: AuthContext) -> Result<Json<LogoutResponse>> {
    let revoked = state.services.auth_service.logout(auth.user_id).await?;
    Ok(Json(LogoutResponse {
        message: "Logout successful".to_string(),
        sessions_revoked: revoked,
    }))
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// GET /api/auth/validate - never fails, answers whether the token is usable
pub async fn validate(State(state): State<AppState>, request: axum::extract::Request) -> Json<ValidateResponse> {
    let (parts, _) = request.into_parts();
    let valid = match bearer_token(&parts) {
        Ok(token) => state.services.auth_service.validate_token(token).await,
        Err(_) => false,
    };
    Json(ValidateResponse { valid })
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub role: UserRole,
    pub patient_id: Option<i64>,
    pub hospital_id: Option<i64>,
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> Result<Json<MeResponse>> {
    let user = state.services.auth_service.get_user(auth.user_id).await?;
    Ok(Json(MeResponse {
        user,
        role: auth.role,
        patient_id: auth.patient_id,
        hospital_id: auth.hospital_id,
    }))
}

/// PUT /api/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<Json<User>> {
    let user = state.services.auth_service.update_profile(auth.user_id, request).await?;
    Ok(Json(user))
}
