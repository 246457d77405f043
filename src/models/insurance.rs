//! Insurance policies and claims

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

text_enum! {
    PolicyStatus {
        Active => "ACTIVE",
        Expired => "EXPIRED",
        Cancelled => "CANCELLED",
    }
}

text_enum! {
    ClaimStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Paid => "PAID",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsurancePolicy {
    pub id: i64,
    pub hospital_id: i64,
    pub policy_number: String,
    pub coverage_amount: Decimal,
    pub premium: Decimal,
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPolicy {
    pub hospital_id: i64,
    pub policy_number: String,
    pub coverage_amount: Decimal,
    pub premium: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsuranceClaim {
    pub id: i64,
    pub policy_id: i64,
    pub patient_id: i64,
    pub claim_amount: Decimal,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub policy_id: i64,
    pub patient_id: i64,
    pub claim_amount: Decimal,
}
