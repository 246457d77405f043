//! Asset deposit service
//!
//! Deposits move through PENDING, VERIFIED, APPROVED and finally MINTED or
//! REJECTED. Every status change is checked against the deposit state machine
//! before it is written.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::{AssetDeposit, DepositStatus, DepositTransition, NewDeposit, SubmitDepositRequest};
use crate::services::chain::ChainClient;
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{checked_sum, ensure_amount_in_range, normalize_whitespace};
use crate::utils::logging::log_deposit_transition;

#[derive(Clone)]
pub struct DepositService {
    db: DatabaseService,
    chain: Arc<dyn ChainClient>,
}

impl DepositService {
    pub fn new(db: DatabaseService, chain: Arc<dyn ChainClient>) -> Self {
        Self { db, chain }
    }

    pub async fn submit(&self, patient_id: i64, request: SubmitDepositRequest) -> Result<AssetDeposit> {
        if request.quantity <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput("Quantity must be greater than zero".to_string()));
        }
        if request.estimated_value <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Estimated value must be greater than zero".to_string(),
            ));
        }
        ensure_amount_in_range("Quantity", request.quantity)?;
        ensure_amount_in_range("Estimated value", request.estimated_value)?;

        let description = request
            .description
            .as_deref()
            .map(normalize_whitespace)
            .filter(|d| !d.is_empty());
        let unit = request.unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());

        let deposit = self
            .db
            .deposits
            .create_deposit(NewDeposit {
                patient_id,
                asset_type: request.asset_type,
                asset_description: description,
                quantity: request.quantity,
                unit,
                estimated_value: request.estimated_value,
                hospital_id: request.hospital_id,
            })
            .await?;

        info!(
            deposit_id = deposit.id,
            patient_id = patient_id,
            asset_type = %deposit.asset_type,
            estimated_value = %deposit.estimated_value,
            hospital_id = ?request.hospital_id,
            "Asset deposit submitted"
        );
        Ok(deposit)
    }

    pub async fn get(&self, deposit_id: i64) -> Result<AssetDeposit> {
        self.db
            .deposits
            .find_deposit(deposit_id)
            .await?
            .ok_or(FixedAssetError::DepositNotFound { deposit_id })
    }

    /// A deposit belonging to another patient is reported as missing
    pub async fn get_for_patient(&self, patient_id: i64, deposit_id: i64) -> Result<AssetDeposit> {
        let deposit = self.get(deposit_id).await?;
        if deposit.patient_id != patient_id {
            return Err(FixedAssetError::DepositNotFound { deposit_id });
        }
        Ok(deposit)
    }

    pub async fn list_for_patient(&self, patient_id: i64) -> Result<Vec<AssetDeposit>> {
        self.require_patient(patient_id).await?;
        self.db.deposits.list_deposits_for_patient(patient_id).await
    }

    pub async fn list_by_status(&self, status: DepositStatus) -> Result<Vec<AssetDeposit>> {
        debug!(status = %status, "Listing deposits by status");
        self.db.deposits.list_deposits_by_status(status).await
    }

    /// Move a deposit to `status`; MINTED credits the approved tokens
    pub async fn update_status(
        &self,
        deposit_id: i64,
        status: DepositStatus,
        chain_deposit_id: Option<String>,
        actor_id: Option<i64>,
    ) -> Result<AssetDeposit> {
        let current = self.get(deposit_id).await?;
        if !current.status.can_transition_to(status) {
            return Err(FixedAssetError::transition(current.status, status));
        }

        let updated = if status == DepositStatus::Minted {
            self.mint(&current).await?
        } else {
            let transition = DepositTransition {
                chain_deposit_id,
                ..DepositTransition::to(status)
            };
            self.db.deposits.transition_deposit(deposit_id, transition).await?
        };

        log_deposit_transition(deposit_id, current.status.as_str(), updated.status.as_str(), actor_id);
        Ok(updated)
    }

    /// Approve a deposit for `tokens_to_mint` asset tokens
    pub async fn approve(
        &self,
        deposit_id: i64,
        tokens_to_mint: Decimal,
        chain_deposit_id: Option<String>,
        actor_id: Option<i64>,
    ) -> Result<AssetDeposit> {
        if tokens_to_mint <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Tokens to mint must be greater than zero".to_string(),
            ));
        }
        ensure_amount_in_range("Tokens to mint", tokens_to_mint)?;

        let current = self.get(deposit_id).await?;
        let transition = DepositTransition {
            chain_deposit_id,
            tokens_minted: Some(tokens_to_mint),
            ..DepositTransition::to(DepositStatus::Approved)
        };
        let deposit = self.db.deposits.transition_deposit(deposit_id, transition).await?;
        log_deposit_transition(deposit_id, current.status.as_str(), deposit.status.as_str(), actor_id);
        info!(deposit_id = deposit_id, tokens = %tokens_to_mint, "Deposit approved");
        Ok(deposit)
    }

    pub async fn reject(&self, deposit_id: i64, reason: &str, actor_id: Option<i64>) -> Result<AssetDeposit> {
        let reason = normalize_whitespace(reason);
        if reason.is_empty() {
            return Err(FixedAssetError::InvalidInput("Rejection reason is required".to_string()));
        }

        let current = self.get(deposit_id).await?;
        let transition = DepositTransition {
            rejection_reason: Some(reason),
            ..DepositTransition::to(DepositStatus::Rejected)
        };
        let deposit = self.db.deposits.transition_deposit(deposit_id, transition).await?;
        log_deposit_transition(deposit_id, current.status.as_str(), deposit.status.as_str(), actor_id);
        Ok(deposit)
    }

    /// Sum of tokens over MINTED deposits
    pub async fn total_minted_tokens(&self, patient_id: i64) -> Result<Decimal> {
        let deposits = self.list_for_patient(patient_id).await?;
        checked_sum(
            "Total minted tokens",
            deposits
                .iter()
                .filter(|d| d.status == DepositStatus::Minted)
                .filter_map(|d| d.tokens_minted),
        )
    }

    async fn mint(&self, deposit: &AssetDeposit) -> Result<AssetDeposit> {
        let tokens = deposit.tokens_minted.unwrap_or(Decimal::ZERO);
        if tokens <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(format!(
                "Deposit {} has no approved token amount",
                deposit.id
            )));
        }

        let patient = self
            .db
            .patients
            .find_patient(deposit.patient_id)
            .await?
            .ok_or(FixedAssetError::PatientNotFound {
                patient_id: deposit.patient_id,
            })?;
        let reference = deposit
            .chain_deposit_id
            .clone()
            .unwrap_or_else(|| format!("DEP-{}", deposit.id));
        let tx_hash = self
            .chain
            .submit_mint(patient.wallet_address.as_deref(), tokens, &reference)
            .await?;

        self.db.deposits.mint_deposit(deposit.id, &tx_hash).await
    }

    async fn require_patient(&self, patient_id: i64) -> Result<()> {
        match self.db.patients.find_patient(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(FixedAssetError::PatientNotFound { patient_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetType, CreateUserRequest, NewPatient, UserRole};
    use crate::services::chain::SimulatedChain;
    use assert_matches::assert_matches;

    async fn setup() -> (DatabaseService, DepositService, i64) {
        let db = DatabaseService::in_memory();
        let user = db
            .users
            .create_user(CreateUserRequest {
                email: "dewi@example.com".to_string(),
                name: "Dewi".to_string(),
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
                registration_id: "PAT-0000DEW1".to_string(),
            })
            .await
            .unwrap();
        let service = DepositService::new(db.clone(), Arc::new(SimulatedChain));
        (db, service, patient.id)
    }

    fn gold(value: i64) -> SubmitDepositRequest {
        SubmitDepositRequest {
            patient_id: None,
            asset_type: AssetType::Gold,
            quantity: Decimal::from(2),
            unit: Some("gram".to_string()),
            estimated_value: Decimal::from(value),
            description: Some("  Antam   gold bar ".to_string()),
            hospital_id: None,
        }
    }

    #[tokio::test]
    async fn test_submit_validates_amounts() {
        let (_, service, patient_id) = setup().await;
        assert_matches!(service.submit(patient_id, gold(0)).await, Err(FixedAssetError::InvalidInput(_)));
        assert_matches!(
            service.submit(patient_id, gold(1_000_000_000_000)).await,
            Err(FixedAssetError::InvalidInput(_))
        );

        let deposit = service.submit(patient_id, gold(1000)).await.unwrap();
        assert_eq!(deposit.status, DepositStatus::Pending);
        assert_eq!(deposit.asset_description.as_deref(), Some("Antam gold bar"));
        assert_matches!(
            service.submit(9999, gold(1000)).await,
            Err(FixedAssetError::PatientNotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_approve_then_mint_credits_balance() {
        let (db, service, patient_id) = setup().await;
        let deposit = service.submit(patient_id, gold(1000)).await.unwrap();

        assert_matches!(
            service.approve(deposit.id, Decimal::ZERO, None, None).await,
            Err(FixedAssetError::InvalidInput(_))
        );
        let approved = service
            .approve(deposit.id, Decimal::from(100), Some("CHAIN-1".to_string()), None)
            .await
            .unwrap();
        assert_eq!(approved.status, DepositStatus::Approved);
        assert_eq!(approved.tokens_minted, Some(Decimal::from(100)));

        let minted = service
            .update_status(deposit.id, DepositStatus::Minted, None, None)
            .await
            .unwrap();
        assert_eq!(minted.status, DepositStatus::Minted);
        assert!(minted.transaction_hash.is_some());

        let balance = db.tokens.balance(patient_id).await.unwrap();
        assert_eq!(balance.asset_token_balance, Decimal::from(100));
        assert_eq!(service.total_minted_tokens(patient_id).await.unwrap(), Decimal::from(100));
    }

    #[tokio::test]
    async fn test_illegal_transitions() {
        let (_, service, patient_id) = setup().await;
        let deposit = service.submit(patient_id, gold(500)).await.unwrap();

        assert_matches!(
            service.update_status(deposit.id, DepositStatus::Minted, None, None).await,
            Err(FixedAssetError::InvalidStateTransition { .. })
        );

        service.reject(deposit.id, "Forged certificate", None).await.unwrap();
        assert_matches!(
            service.approve(deposit.id, Decimal::from(5), None, None).await,
            Err(FixedAssetError::InvalidStateTransition { .. })
        );
        assert_eq!(service.total_minted_tokens(patient_id).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_foreign_deposit_is_not_found() {
        let (_, service, patient_id) = setup().await;
        let deposit = service.submit(patient_id, gold(500)).await.unwrap();
        assert_matches!(
            service.get_for_patient(patient_id + 1000, deposit.id).await,
            Err(FixedAssetError::DepositNotFound { .. })
        );
        assert_eq!(service.list_by_status(DepositStatus::Pending).await.unwrap().len(), 1);
    }
}
