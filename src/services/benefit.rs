//! Health benefit catalog and redemption service
//!
//! A redemption is created PENDING without touching balances. Hospital
//! approval debits the HT in the same write that changes the status, and
//! completion attaches the burn transaction hash.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::database::DatabaseService;
use crate::models::{
    BenefitRedemption, HealthBenefit, NewRedemption, RedemptionOutcome, RedemptionStatus, ServiceType,
    BENEFIT_CATALOG,
};
use crate::services::chain::ChainClient;
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{checked_sum, ensure_amount_in_range, generate_redemption_id, is_tx_hash, normalize_whitespace};

#[derive(Clone)]
pub struct BenefitService {
    db: DatabaseService,
    chain: Arc<dyn ChainClient>,
}

impl BenefitService {
    pub fn new(db: DatabaseService, chain: Arc<dyn ChainClient>) -> Self {
        Self { db, chain }
    }

    /// The fixed catalog, evaluated against an empty balance
    pub fn catalog(&self) -> Vec<HealthBenefit> {
        BENEFIT_CATALOG
            .iter()
            .map(|entry| HealthBenefit::evaluate(entry, Decimal::ZERO))
            .collect()
    }

    pub async fn available_benefits(&self, patient_id: i64) -> Result<Vec<HealthBenefit>> {
        let balance = self.health_balance(patient_id).await?;
        Ok(BENEFIT_CATALOG
            .iter()
            .map(|entry| HealthBenefit::evaluate(entry, balance))
            .collect())
    }

    /// Services the patient can afford right now
    pub async fn eligible_services(&self, patient_id: i64) -> Result<Vec<ServiceType>> {
        let balance = self.health_balance(patient_id).await?;
        Ok(BENEFIT_CATALOG
            .iter()
            .filter(|entry| balance >= Decimal::from(entry.ht_cost))
            .map(|entry| entry.service_type)
            .collect())
    }

    /// Request a benefit. An unaffordable request is answered but not stored.
    pub async fn redeem(
        &self,
        patient_id: i64,
        service_type: ServiceType,
        ht_amount: Option<Decimal>,
    ) -> Result<RedemptionOutcome> {
        let required = ht_amount.unwrap_or_else(|| service_type.ht_cost());
        if required <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput("HT amount must be greater than zero".to_string()));
        }
        ensure_amount_in_range("HT amount", required)?;

        let available = self.health_balance(patient_id).await?;
        if available < required {
            warn!(
                patient_id = patient_id,
                service_type = %service_type,
                available = %available,
                required = %required,
                "Redemption refused for insufficient balance"
            );
            return Ok(RedemptionOutcome::insufficient(patient_id, service_type, available, required));
        }

        let redemption = self
            .db
            .benefits
            .create_redemption(NewRedemption {
                redemption_id: generate_redemption_id(),
                patient_id,
                service_type,
                ht_amount: required,
                description: format!("Redeeming {} service", service_type),
            })
            .await?;

        info!(
            patient_id = patient_id,
            redemption_id = %redemption.redemption_id,
            service_type = %service_type,
            ht_amount = %required,
            "Benefit redemption requested"
        );
        Ok(RedemptionOutcome::accepted(&redemption))
    }

    pub async fn history(&self, patient_id: i64) -> Result<Vec<BenefitRedemption>> {
        self.require_patient(patient_id).await?;
        self.db.benefits.list_redemptions(patient_id).await
    }

    pub async fn get(&self, redemption_id: &str) -> Result<BenefitRedemption> {
        self.db
            .benefits
            .find_redemption(redemption_id)
            .await?
            .ok_or_else(|| FixedAssetError::RedemptionNotFound {
                redemption_id: redemption_id.to_string(),
            })
    }

    /// A redemption belonging to another patient is reported as missing
    pub async fn get_for_patient(&self, patient_id: i64, redemption_id: &str) -> Result<BenefitRedemption> {
        let redemption = self.get(redemption_id).await?;
        if redemption.patient_id != patient_id {
            return Err(FixedAssetError::RedemptionNotFound {
                redemption_id: redemption_id.to_string(),
            });
        }
        Ok(redemption)
    }

    pub async fn approve(&self, redemption_id: &str, hospital_id: i64) -> Result<BenefitRedemption> {
        let redemption = self.db.benefits.approve_redemption(redemption_id, hospital_id).await?;
        info!(
            redemption_id = redemption_id,
            hospital_id = hospital_id,
            ht_amount = %redemption.ht_amount,
            "Benefit redemption approved"
        );
        Ok(redemption)
    }

    /// Complete an approved redemption; without a hash the burn is submitted to the chain
    pub async fn complete(&self, redemption_id: &str, transaction_hash: Option<String>) -> Result<BenefitRedemption> {
        let current = self.get(redemption_id).await?;
        if !current.status.can_transition_to(RedemptionStatus::Completed) {
            return Err(FixedAssetError::transition(current.status, RedemptionStatus::Completed));
        }

        let hash = match transaction_hash {
            Some(hash) if is_tx_hash(&hash) => hash,
            Some(hash) => {
                return Err(FixedAssetError::InvalidInput(format!("Invalid transaction hash: {}", hash)));
            }
            None => {
                let wallet = self
                    .db
                    .patients
                    .find_patient(current.patient_id)
                    .await?
                    .and_then(|p| p.wallet_address);
                self.chain.submit_burn(wallet.as_deref(), current.ht_amount).await?
            }
        };

        let redemption = self.db.benefits.complete_redemption(redemption_id, &hash).await?;
        info!(redemption_id = redemption_id, tx_hash = %hash, "Benefit redemption completed");
        Ok(redemption)
    }

    pub async fn reject(&self, redemption_id: &str, reason: &str) -> Result<BenefitRedemption> {
        let reason = normalize_whitespace(reason);
        if reason.is_empty() {
            return Err(FixedAssetError::InvalidInput("Rejection reason is required".to_string()));
        }
        let redemption = self.db.benefits.reject_redemption(redemption_id, &reason).await?;
        info!(redemption_id = redemption_id, reason = %reason, "Benefit redemption rejected");
        Ok(redemption)
    }

    /// Sum of HT over COMPLETED redemptions
    pub async fn total_redeemed(&self, patient_id: i64) -> Result<Decimal> {
        let rows = self.history(patient_id).await?;
        checked_sum(
            "Total redeemed",
            rows.iter()
                .filter(|r| r.status == RedemptionStatus::Completed)
                .map(|r| r.ht_amount),
        )
    }

    async fn health_balance(&self, patient_id: i64) -> Result<Decimal> {
        self.require_patient(patient_id).await?;
        Ok(self.db.tokens.balance(patient_id).await?.health_token_balance)
    }

    async fn require_patient(&self, patient_id: i64) -> Result<()> {
        match self.db.patients.find_patient(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(FixedAssetError::PatientNotFound { patient_id }),
        }
    }
}
