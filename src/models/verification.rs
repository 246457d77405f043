//! Bank verification of deposits

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::deposit::AssetType;

text_enum! {
    VerificationStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

impl VerificationStatus {
    pub fn can_transition_to(&self, next: VerificationStatus) -> bool {
        matches!(
            (self, next),
            (VerificationStatus::Pending, VerificationStatus::Approved)
                | (VerificationStatus::Pending, VerificationStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetVerification {
    pub id: i64,
    pub deposit_id: i64,
    pub verified_value: Decimal,
    pub tokens_to_mint: Decimal,
    pub verification_notes: Option<String>,
    pub ipfs_hash: Option<String>,
    pub verified_by: i64,
    pub approved_by: Option<i64>,
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub mint_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVerification {
    pub deposit_id: i64,
    pub verified_value: Decimal,
    pub tokens_to_mint: Decimal,
    pub verification_notes: Option<String>,
    pub ipfs_hash: Option<String>,
    pub verified_by: i64,
}

/// Verification joined with its deposit and patient for the bank queue
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MintingRequest {
    pub verification_id: i64,
    pub deposit_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub asset_type: AssetType,
    pub asset_description: Option<String>,
    pub estimated_value: Decimal,
    pub verified_value: Decimal,
    pub tokens_to_mint: Decimal,
    pub status: VerificationStatus,
    pub verified_by: i64,
    pub created_at: DateTime<Utc>,
}
