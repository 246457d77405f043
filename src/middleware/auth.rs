//! Authentication middleware
//!
//! `AuthContext` is an extractor: handlers that take it require a valid
//! `Authorization: Bearer <token>` header.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::models::UserRole;
use crate::services::AuthContext;
use crate::state::AppState;
use crate::utils::errors::{FixedAssetError, Result};

/// Pull the bearer token out of the request headers
pub fn bearer_token(parts: &Parts) -> Result<&str> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| FixedAssetError::Authentication("Missing Authorization header".to_string()))?;
    let value = value
        .to_str()
        .map_err(|_| FixedAssetError::Authentication("Malformed Authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| FixedAssetError::Authentication("Expected a Bearer token".to_string()))
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = FixedAssetError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?;
        let context = state.services.auth_service.authenticate(token).await?;
        debug!(user_id = context.user_id, path = %parts.uri.path(), "Authenticated request");
        Ok(context)
    }
}

/// Caller must be a BANK user
#[derive(Debug, Clone)]
pub struct BankUser(pub AuthContext);

impl FromRequestParts<AppState> for BankUser {
    type Rejection = FixedAssetError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let context = AuthContext::from_request_parts(parts, state).await?;
        context.require_role(UserRole::Bank)?;
        Ok(BankUser(context))
    }
}

/// Caller must be a HOSPITAL user
#[derive(Debug, Clone)]
pub struct HospitalUser(pub AuthContext);

impl FromRequestParts<AppState> for HospitalUser {
    type Rejection = FixedAssetError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let context = AuthContext::from_request_parts(parts, state).await?;
        context.require_role(UserRole::Hospital)?;
        Ok(HospitalUser(context))
    }
}
