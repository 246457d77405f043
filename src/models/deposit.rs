//! Asset deposit model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

text_enum! {
    AssetType {
        Gold => "GOLD",
        Silver => "SILVER",
        Cash => "CASH",
        Property => "PROPERTY",
        Other => "OTHER",
    }
}

text_enum! {
    /// Lifecycle of a deposit from submission to minting
    DepositStatus {
        Pending => "PENDING",
        Verified => "VERIFIED",
        Approved => "APPROVED",
        Minted => "MINTED",
        Rejected => "REJECTED",
    }
}

impl DepositStatus {
    pub fn can_transition_to(&self, next: DepositStatus) -> bool {
        use DepositStatus::*;
        matches!(
            (self, next),
            (Pending, Verified)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Verified, Approved)
                | (Verified, Minted)
                | (Verified, Rejected)
                | (Approved, Minted)
                | (Approved, Rejected)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DepositStatus::Minted | DepositStatus::Rejected)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetDeposit {
    pub id: i64,
    pub patient_id: i64,
    pub asset_type: AssetType,
    pub asset_description: Option<String>,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub estimated_value: Decimal,
    pub status: DepositStatus,
    pub tokens_minted: Option<Decimal>,
    pub chain_deposit_id: Option<String>,
    pub transaction_hash: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub patient_id: i64,
    pub asset_type: AssetType,
    pub asset_description: Option<String>,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub estimated_value: Decimal,
    pub hospital_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDepositRequest {
    pub patient_id: Option<i64>,
    pub asset_type: AssetType,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub estimated_value: Decimal,
    pub description: Option<String>,
    pub hospital_id: Option<i64>,
}

/// Status change applied to a deposit row; optional fields are kept when `None`
#[derive(Debug, Clone)]
pub struct DepositTransition {
    pub to: DepositStatus,
    pub chain_deposit_id: Option<String>,
    pub tokens_minted: Option<Decimal>,
    pub rejection_reason: Option<String>,
}

impl DepositTransition {
    pub fn to(status: DepositStatus) -> Self {
        Self {
            to: status,
            chain_deposit_id: None,
            tokens_minted: None,
            rejection_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_transitions() {
        assert!(DepositStatus::Pending.can_transition_to(DepositStatus::Verified));
        assert!(DepositStatus::Pending.can_transition_to(DepositStatus::Approved));
        assert!(DepositStatus::Verified.can_transition_to(DepositStatus::Minted));
        assert!(DepositStatus::Approved.can_transition_to(DepositStatus::Rejected));
        assert!(!DepositStatus::Pending.can_transition_to(DepositStatus::Minted));
        assert!(!DepositStatus::Approved.can_transition_to(DepositStatus::Verified));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in DepositStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in DepositStatus::ALL {
                assert!(!from.can_transition_to(*to), "{} -> {} should be rejected", from, to);
            }
        }
    }
}
