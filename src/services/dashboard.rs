//! Dashboard aggregates for patients, hospitals and the bank

use rust_decimal::Decimal;
use tracing::debug;

use crate::database::DatabaseService;
use crate::models::{
    AssetRequestStatus, AssetTokenStatus, BankStats, DashboardStatistics, DepositStatus, HealthBenefit,
    HospitalStats, Patient, PatientDashboard, PatientStats, PatientSummary, PolicyStatus, RedemptionStatus,
    TokenBalanceView, TradeStatus, VerificationStatus, BENEFIT_CATALOG,
};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::checked_sum;

/// Number of deposits and redemptions shown on the patient dashboard
pub const RECENT_ITEMS: usize = 5;

#[derive(Clone, Debug)]
pub struct DashboardService {
    db: DatabaseService,
}

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> i64 {
    items.iter().filter(|item| pred(item)).count() as i64
}

impl DashboardService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn patient_dashboard(&self, patient_id: i64) -> Result<PatientDashboard> {
        let patient = self.patient(patient_id).await?;
        let balance = self.db.tokens.balance(patient_id).await?;
        let deposits = self.db.deposits.list_deposits_for_patient(patient_id).await?;
        let redemptions = self.db.benefits.list_redemptions(patient_id).await?;

        let statistics = DashboardStatistics {
            total_deposits: deposits.len() as i64,
            pending_deposits: count(&deposits, |d| d.status == DepositStatus::Pending),
            total_redemptions: redemptions.len() as i64,
            completed_redemptions: count(&redemptions, |r| r.status == RedemptionStatus::Completed),
        };
        let available_benefits = BENEFIT_CATALOG
            .iter()
            .map(|entry| HealthBenefit::evaluate(entry, balance.health_token_balance))
            .collect();

        debug!(patient_id = patient_id, deposits = deposits.len(), redemptions = redemptions.len(), "Patient dashboard built");
        Ok(PatientDashboard {
            patient_id,
            token_balance: TokenBalanceView::from_balance(&balance, patient.wallet_address),
            recent_deposits: deposits.into_iter().take(RECENT_ITEMS).collect(),
            available_benefits,
            recent_redemptions: redemptions.into_iter().take(RECENT_ITEMS).collect(),
            statistics,
        })
    }

    pub async fn patient_summary(&self, patient_id: i64) -> Result<PatientSummary> {
        self.patient(patient_id).await?;
        let balance = self.db.tokens.balance(patient_id).await?;
        let deposits = self.db.deposits.list_deposits_for_patient(patient_id).await?;
        let redemptions = self.db.benefits.list_redemptions(patient_id).await?;

        Ok(PatientSummary {
            asset_tokens: balance.asset_token_balance,
            health_tokens: balance.health_token_balance,
            total_deposits: deposits.len() as i64,
            pending_deposits: count(&deposits, |d| d.status == DepositStatus::Pending),
            approved_deposits: count(&deposits, |d| d.status == DepositStatus::Approved),
            total_redemptions: redemptions.len() as i64,
            pending_redemptions: count(&redemptions, |r| r.status == RedemptionStatus::Pending),
            completed_redemptions: count(&redemptions, |r| r.status == RedemptionStatus::Completed),
        })
    }

    pub async fn patient_stats(&self, patient_id: i64) -> Result<PatientStats> {
        self.patient(patient_id).await?;
        let balance = self.db.tokens.balance(patient_id).await?;
        let deposits = self.db.deposits.list_deposits_for_patient(patient_id).await?;
        let redemptions = self.db.benefits.list_redemptions(patient_id).await?;

        Ok(PatientStats {
            total_assets: checked_sum("Total assets", deposits.iter().map(|d| d.estimated_value))?,
            active_tokens: balance.asset_token_balance,
            benefits_redeemed: checked_sum(
                "Benefits redeemed",
                redemptions
                    .iter()
                    .filter(|r| r.status == RedemptionStatus::Completed)
                    .map(|r| r.ht_amount),
            )?,
            pending_approvals: count(&deposits, |d| d.status == DepositStatus::Pending),
        })
    }

    pub async fn hospital_stats(&self, hospital_id: i64) -> Result<HospitalStats> {
        if self.db.hospitals.find_hospital(hospital_id).await?.is_none() {
            return Err(FixedAssetError::HospitalNotFound { hospital_id });
        }
        let requests = self.db.hospitals.list_asset_requests(hospital_id, None).await?;
        let trades = self.db.hospitals.list_trades(hospital_id).await?;
        let patients = self.db.hospitals.hospital_patients(hospital_id).await?;

        let pending = count(&requests, |r| r.status == AssetRequestStatus::Pending);
        Ok(HospitalStats {
            active_patients: patients.len() as i64,
            total_trade_value: checked_sum(
                "Total trade value",
                trades
                    .iter()
                    .filter(|t| t.status == TradeStatus::Completed)
                    .map(|t| t.total_value),
            )?,
            pending_approvals: pending,
            requests_processed: requests.len() as i64 - pending,
        })
    }

    pub async fn bank_stats(&self) -> Result<BankStats> {
        let tokens = self.db.tokens.list_asset_tokens(None).await?;
        let pending = self
            .db
            .minting
            .list_minting_requests(Some(VerificationStatus::Pending))
            .await?;
        let policies = self.db.insurance.list_policies(Some(PolicyStatus::Active)).await?;

        let active: Vec<_> = tokens.iter().filter(|t| t.status == AssetTokenStatus::Active).collect();
        let token_values = active
            .iter()
            .map(|t| {
                t.token_amount.checked_mul(t.value_per_token).ok_or_else(|| {
                    FixedAssetError::InvalidInput(format!("Value of asset token {} is out of range", t.id))
                })
            })
            .collect::<Result<Vec<Decimal>>>()?;
        Ok(BankStats {
            total_value_under_management: checked_sum("Total value under management", token_values)?,
            active_mint_requests: pending.len() as i64,
            tokens_issued: checked_sum("Tokens issued", active.iter().map(|t| t.token_amount))?,
            insurance_reserve_balance: checked_sum(
                "Insurance reserve",
                policies.iter().map(|p| p.coverage_amount),
            )?,
        })
    }

    async fn patient(&self, patient_id: i64) -> Result<Patient> {
        self.db
            .patients
            .find_patient(patient_id)
            .await?
            .ok_or(FixedAssetError::PatientNotFound { patient_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AssetType, BalanceChange, CreateUserRequest, NewDeposit, NewPatient, NewVerification, TokenType,
        TransactionType, UserRole,
    };

    async fn patient_with_deposits(db: &DatabaseService, deposits: usize) -> i64 {
        let user = db
            .users
            .create_user(CreateUserRequest {
                email: "dash@example.com".to_string(),
                name: "Dash".to_string(),
                password_hash: "x".to_string(),
                role: UserRole::Patient,
                wallet_address: None,
            })
            .await
            .unwrap();
        let patient = db
            .patients
            .create_patient(NewPatient {
                user_id: user.id,
                registration_id: "PAT-DASH0001".to_string(),
            })
            .await
            .unwrap();
        for i in 0..deposits {
            db.deposits
                .create_deposit(NewDeposit {
                    patient_id: patient.id,
                    asset_type: AssetType::Cash,
                    asset_description: None,
                    quantity: Decimal::ONE,
                    unit: None,
                    estimated_value: Decimal::from(100 * (i as i64 + 1)),
                    hospital_id: None,
                })
                .await
                .unwrap();
        }
        patient.id
    }

    #[tokio::test]
    async fn test_patient_dashboard_limits_recent_items() {
        let db = DatabaseService::in_memory();
        let service = DashboardService::new(db.clone());
        let patient_id = patient_with_deposits(&db, 7).await;
        db.tokens
            .apply_balance_change(BalanceChange::new(patient_id, TokenType::Ht, Decimal::from(12), TransactionType::Mint))
            .await
            .unwrap();

        let dashboard = service.patient_dashboard(patient_id).await.unwrap();
        assert_eq!(dashboard.recent_deposits.len(), RECENT_ITEMS);
        assert_eq!(dashboard.statistics.total_deposits, 7);
        assert_eq!(dashboard.statistics.pending_deposits, 7);
        assert_eq!(dashboard.available_benefits.iter().filter(|b| b.available).count(), 2);
        assert_eq!(dashboard.token_balance.health_token_balance, Decimal::from(12));

        let stats = service.patient_stats(patient_id).await.unwrap();
        assert_eq!(stats.total_assets, Decimal::from(2_800));
        assert_eq!(stats.pending_approvals, 7);

        let summary = service.patient_summary(patient_id).await.unwrap();
        assert_eq!(summary.approved_deposits, 0);
        assert_eq!(summary.health_tokens, Decimal::from(12));
    }

    #[tokio::test]
    async fn test_bank_stats_counts_pending_and_minted() {
        let db = DatabaseService::in_memory();
        let service = DashboardService::new(db.clone());
        let patient_id = patient_with_deposits(&db, 2).await;
        let deposits = db.deposits.list_deposits_for_patient(patient_id).await.unwrap();

        let mut verifications = Vec::new();
        for deposit in &deposits {
            let v = db
                .minting
                .create_verification(NewVerification {
                    deposit_id: deposit.id,
                    verified_value: Decimal::from(200),
                    tokens_to_mint: Decimal::from(20),
                    verification_notes: None,
                    ipfs_hash: None,
                    verified_by: 1,
                })
                .await
                .unwrap();
            verifications.push(v);
        }
        db.minting
            .approve_minting(verifications[0].id, 1, "0xabc", "HBT")
            .await
            .unwrap();

        let stats = service.bank_stats().await.unwrap();
        assert_eq!(stats.active_mint_requests, 1);
        assert_eq!(stats.tokens_issued, Decimal::from(20));
        assert_eq!(stats.total_value_under_management, Decimal::from(200));
        assert_eq!(stats.insurance_reserve_balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let service = DashboardService::new(DatabaseService::in_memory());
        assert!(matches!(
            service.patient_summary(1).await,
            Err(FixedAssetError::PatientNotFound { patient_id: 1 })
        ));
        assert!(matches!(
            service.hospital_stats(1).await,
            Err(FixedAssetError::HospitalNotFound { hospital_id: 1 })
        ));
    }
}
