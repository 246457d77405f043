//! Error responses
//!
//! Every failure leaves the service as `{"error", "message", "timestamp"}`
//! with a status chosen from the error variant.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::utils::errors::FixedAssetError;

/// Error response format shared by handlers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: i64,
}

impl FixedAssetError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            FixedAssetError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            FixedAssetError::Authentication(_) | FixedAssetError::SessionToken(_) => StatusCode::UNAUTHORIZED,
            FixedAssetError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            FixedAssetError::UserNotFound { .. }
            | FixedAssetError::PatientNotFound { .. }
            | FixedAssetError::DepositNotFound { .. }
            | FixedAssetError::VerificationNotFound { .. }
            | FixedAssetError::RedemptionNotFound { .. }
            | FixedAssetError::HospitalNotFound { .. }
            | FixedAssetError::NotFound(_) => StatusCode::NOT_FOUND,
            FixedAssetError::Conflict(_) | FixedAssetError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            FixedAssetError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FixedAssetError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            FixedAssetError::Chain(_) | FixedAssetError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FixedAssetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, severity = %self.severity(), "Request failed");
            "Internal server error".to_string()
        } else {
            if status.is_server_error() {
                error!(error = %self, severity = %self.severity(), "Request failed");
            } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                warn!(error = %self, "Request rejected");
            }
            self.to_string()
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
            timestamp: chrono::Utc::now().timestamp(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for FixedAssetError {
    fn from(rejection: JsonRejection) -> Self {
        FixedAssetError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for FixedAssetError {
    fn from(rejection: QueryRejection) -> Self {
        FixedAssetError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;
    use crate::utils::errors::ChainError;
    use rust_decimal::Decimal;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (FixedAssetError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (FixedAssetError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (FixedAssetError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (FixedAssetError::DepositNotFound { deposit_id: 1 }, StatusCode::NOT_FOUND),
            (FixedAssetError::transition("MINTED", "PENDING"), StatusCode::CONFLICT),
            (FixedAssetError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                FixedAssetError::InsufficientBalance {
                    token_type: TokenType::At,
                    available: Decimal::ZERO,
                    required: Decimal::ONE,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (FixedAssetError::RateLimitExceeded, StatusCode::TOO_MANY_REQUESTS),
            (FixedAssetError::Chain(ChainError::Timeout), StatusCode::SERVICE_UNAVAILABLE),
            (FixedAssetError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn test_internal_errors_hide_message() {
        let response = FixedAssetError::Config("secret path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
