//! Hospital, staff, asset request and trade models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::deposit::{AssetType, DepositStatus};

text_enum! {
    AssetRequestStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

impl AssetRequestStatus {
    pub fn can_transition_to(&self, next: AssetRequestStatus) -> bool {
        matches!(
            (self, next),
            (AssetRequestStatus::Pending, AssetRequestStatus::Approved)
                | (AssetRequestStatus::Pending, AssetRequestStatus::Rejected)
        )
    }
}

text_enum! {
    TradeStatus {
        Active => "ACTIVE",
        Completed => "COMPLETED",
        Distributed => "DISTRIBUTED",
        Failed => "FAILED",
    }
}

impl TradeStatus {
    pub fn can_transition_to(&self, next: TradeStatus) -> bool {
        use TradeStatus::*;
        matches!((self, next), (Active, Completed) | (Active, Failed) | (Completed, Distributed))
    }
}

text_enum! {
    AllocationStatus {
        Pending => "PENDING",
        Distributed => "DISTRIBUTED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub registration_number: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHospital {
    pub name: String,
    pub registration_number: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HospitalStaff {
    pub id: i64,
    pub hospital_id: i64,
    pub user_id: i64,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BankStaff {
    pub id: i64,
    pub user_id: i64,
    pub employee_id: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBankStaff {
    pub employee_id: String,
    pub department: Option<String>,
    pub position: Option<String>,
}

/// Deposit forwarded to a hospital for review
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetRequest {
    pub id: i64,
    pub hospital_id: i64,
    pub patient_id: i64,
    pub deposit_id: i64,
    pub status: AssetRequestStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Asset request joined with patient and deposit details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetRequestDetail {
    pub id: i64,
    pub hospital_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub deposit_id: i64,
    pub asset_type: AssetType,
    pub estimated_value: Decimal,
    pub deposit_status: DepositStatus,
    pub status: AssetRequestStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: i64,
    pub hospital_id: i64,
    pub asset_id: i64,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_value: Decimal,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    pub asset_id: i64,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BenefitAllocation {
    pub id: i64,
    pub hospital_id: i64,
    pub total_amount: Decimal,
    pub distribution_date: NaiveDate,
    pub status: AllocationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAllocation {
    pub total_amount: Decimal,
    pub distribution_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_transitions() {
        assert!(TradeStatus::Active.can_transition_to(TradeStatus::Completed));
        assert!(TradeStatus::Completed.can_transition_to(TradeStatus::Distributed));
        assert!(!TradeStatus::Active.can_transition_to(TradeStatus::Distributed));
        assert!(!TradeStatus::Failed.can_transition_to(TradeStatus::Active));
    }

    #[test]
    fn test_asset_request_transitions() {
        assert!(AssetRequestStatus::Pending.can_transition_to(AssetRequestStatus::Rejected));
        assert!(!AssetRequestStatus::Approved.can_transition_to(AssetRequestStatus::Rejected));
    }
}
