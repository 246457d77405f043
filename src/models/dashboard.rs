//! Dashboard aggregates for the three portals

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::benefit::{BenefitRedemption, HealthBenefit};
use super::deposit::AssetDeposit;
use super::token::TokenBalanceView;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStatistics {
    pub total_deposits: i64,
    pub pending_deposits: i64,
    pub total_redemptions: i64,
    pub completed_redemptions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDashboard {
    pub patient_id: i64,
    pub token_balance: TokenBalanceView,
    pub recent_deposits: Vec<AssetDeposit>,
    pub available_benefits: Vec<HealthBenefit>,
    pub recent_redemptions: Vec<BenefitRedemption>,
    pub statistics: DashboardStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSummary {
    pub asset_tokens: Decimal,
    pub health_tokens: Decimal,
    pub total_deposits: i64,
    pub pending_deposits: i64,
    pub approved_deposits: i64,
    pub total_redemptions: i64,
    pub pending_redemptions: i64,
    pub completed_redemptions: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientStats {
    pub total_assets: Decimal,
    pub active_tokens: Decimal,
    pub benefits_redeemed: Decimal,
    pub pending_approvals: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HospitalStats {
    pub active_patients: i64,
    pub total_trade_value: Decimal,
    pub pending_approvals: i64,
    pub requests_processed: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankStats {
    pub total_value_under_management: Decimal,
    pub active_mint_requests: i64,
    pub tokens_issued: Decimal,
    pub insurance_reserve_balance: Decimal,
}
