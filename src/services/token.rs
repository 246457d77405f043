//! Token balance and ledger service

use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::database::DatabaseService;
use crate::models::{
    AssetToken, BalanceChange, Patient, TokenBalanceView, TokenTransaction, TokenType, TransactionType,
};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{checked_sum, ensure_amount_in_range};
use crate::utils::logging::log_token_movement;

#[derive(Clone, Debug)]
pub struct TokenService {
    db: DatabaseService,
}

impl TokenService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn balance(&self, patient_id: i64) -> Result<TokenBalanceView> {
        let patient = self.patient(patient_id).await?;
        let balance = self.db.tokens.balance(patient_id).await?;
        Ok(TokenBalanceView::from_balance(&balance, patient.wallet_address))
    }

    /// Positive amounts mint AT, negative amounts burn it
    pub async fn update_asset_balance(&self, patient_id: i64, amount: Decimal) -> Result<TokenBalanceView> {
        self.adjust(patient_id, TokenType::At, amount, None).await
    }

    /// Positive amounts mint HT, negative amounts burn it
    pub async fn update_health_balance(&self, patient_id: i64, amount: Decimal) -> Result<TokenBalanceView> {
        self.adjust(patient_id, TokenType::Ht, amount, None).await
    }

    /// Bring both balances to the given values through ledger entries
    pub async fn set_balances(
        &self,
        patient_id: i64,
        asset_tokens: Option<Decimal>,
        health_tokens: Option<Decimal>,
    ) -> Result<TokenBalanceView> {
        for target in [asset_tokens, health_tokens].into_iter().flatten() {
            if target.is_sign_negative() && !target.is_zero() {
                return Err(FixedAssetError::InvalidInput("Balances cannot be negative".to_string()));
            }
            ensure_amount_in_range("Balance", target)?;
        }

        let current = self.balance(patient_id).await?;
        let targets = [
            (TokenType::At, asset_tokens, current.asset_token_balance),
            (TokenType::Ht, health_tokens, current.health_token_balance),
        ];
        for (token_type, target, now) in targets {
            if let Some(target) = target {
                let delta = target - now;
                if !delta.is_zero() {
                    self.adjust(patient_id, token_type, delta, Some(json!({ "reason": "balance set" })))
                        .await?;
                }
            }
        }
        self.balance(patient_id).await
    }

    pub async fn transfer_asset_tokens(
        &self,
        from_patient_id: i64,
        to_patient_id: i64,
        amount: Decimal,
    ) -> Result<(TokenTransaction, TokenTransaction)> {
        if amount <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Transfer amount must be greater than zero".to_string(),
            ));
        }
        ensure_amount_in_range("Transfer amount", amount)?;
        if from_patient_id == to_patient_id {
            return Err(FixedAssetError::InvalidInput("Cannot transfer tokens to yourself".to_string()));
        }
        self.patient(from_patient_id).await?;
        self.patient(to_patient_id).await?;

        let rows = self
            .db
            .tokens
            .transfer_asset_tokens(from_patient_id, to_patient_id, amount)
            .await?;
        info!(
            from_patient_id = from_patient_id,
            to_patient_id = to_patient_id,
            amount = %amount,
            "Asset tokens transferred"
        );
        Ok(rows)
    }

    pub async fn transactions(&self, patient_id: i64, token_type: Option<TokenType>) -> Result<Vec<TokenTransaction>> {
        self.patient(patient_id).await?;
        self.db.tokens.list_transactions(patient_id, token_type).await
    }

    /// Sum of MINT entries for the token type
    pub async fn total_minted(&self, patient_id: i64, token_type: TokenType) -> Result<Decimal> {
        let rows = self.transactions(patient_id, Some(token_type)).await?;
        checked_sum(
            "Total minted",
            rows.iter()
                .filter(|tx| tx.transaction_type == TransactionType::Mint)
                .map(|tx| tx.amount),
        )
    }

    pub async fn asset_tokens(&self, patient_id: i64) -> Result<Vec<AssetToken>> {
        self.patient(patient_id).await?;
        self.db.tokens.list_asset_tokens(Some(patient_id)).await
    }

    async fn adjust(
        &self,
        patient_id: i64,
        token_type: TokenType,
        amount: Decimal,
        metadata: Option<serde_json::Value>,
    ) -> Result<TokenBalanceView> {
        if amount.is_zero() {
            return Err(FixedAssetError::InvalidInput("Amount cannot be zero".to_string()));
        }
        ensure_amount_in_range("Amount", amount)?;
        let patient = self.patient(patient_id).await?;

        let transaction_type = if amount.is_sign_positive() {
            TransactionType::Mint
        } else {
            TransactionType::Burn
        };
        let mut change = BalanceChange::new(patient_id, token_type, amount, transaction_type);
        if let Some(metadata) = metadata {
            change = change.with_metadata(metadata);
        }

        let (balance, _) = self.db.tokens.apply_balance_change(change).await?;
        log_token_movement(patient_id, token_type, transaction_type, amount.abs());
        Ok(TokenBalanceView::from_balance(&balance, patient.wallet_address))
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
    use crate::models::{CreateUserRequest, NewPatient, UserRole};
    use assert_matches::assert_matches;

    async fn patient(db: &DatabaseService, email: &str) -> i64 {
        let user = db
            .users
            .create_user(CreateUserRequest {
                email: email.to_string(),
                name: email.to_string(),
                password_hash: "x".to_string(),
                role: UserRole::Patient,
                wallet_address: None,
            })
            .await
            .unwrap();
        db.patients
            .create_patient(NewPatient {
                user_id: user.id,
                registration_id: format!("PAT-{}", user.id),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_mint_and_burn() {
        let db = DatabaseService::in_memory();
        let service = TokenService::new(db.clone());
        let id = patient(&db, "a@example.com").await;

        assert_matches!(
            service.update_health_balance(id, Decimal::ZERO).await,
            Err(FixedAssetError::InvalidInput(_))
        );
        service.update_health_balance(id, Decimal::from(40)).await.unwrap();
        let view = service.update_health_balance(id, Decimal::from(-15)).await.unwrap();
        assert_eq!(view.health_token_balance, Decimal::from(25));

        assert_matches!(
            service.update_health_balance(id, Decimal::from(-26)).await,
            Err(FixedAssetError::InsufficientBalance { .. })
        );

        let history = service.transactions(id, Some(TokenType::Ht)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].transaction_type, TransactionType::Burn);
        assert_eq!(history[0].amount, Decimal::from(15));
        assert_eq!(service.total_minted(id, TokenType::Ht).await.unwrap(), Decimal::from(40));
    }

    #[tokio::test]
    async fn test_set_balances_goes_through_ledger() {
        let db = DatabaseService::in_memory();
        let service = TokenService::new(db.clone());
        let id = patient(&db, "b@example.com").await;

        let view = service
            .set_balances(id, Some(Decimal::from(100)), Some(Decimal::from(30)))
            .await
            .unwrap();
        assert_eq!(view.asset_token_balance, Decimal::from(100));
        assert_eq!(view.health_token_balance, Decimal::from(30));

        let view = service.set_balances(id, Some(Decimal::from(60)), None).await.unwrap();
        assert_eq!(view.asset_token_balance, Decimal::from(60));
        assert_eq!(service.transactions(id, None).await.unwrap().len(), 3);

        assert_matches!(
            service.set_balances(id, Some(Decimal::from(-1)), None).await,
            Err(FixedAssetError::InvalidInput(_))
        );
    }

    #[tokio::test]
    async fn test_balances_stay_within_column_range() {
        let db = DatabaseService::in_memory();
        let service = TokenService::new(db.clone());
        let id = patient(&db, "whale@example.com").await;

        assert_matches!(
            service.update_asset_balance(id, Decimal::MAX).await,
            Err(FixedAssetError::InvalidInput(_))
        );
        let near_limit = Decimal::from(999_999_999_999i64);
        service.update_asset_balance(id, near_limit).await.unwrap();
        assert_matches!(
            service.update_asset_balance(id, Decimal::ONE).await,
            Err(FixedAssetError::InvalidInput(_))
        );
        assert_eq!(service.balance(id).await.unwrap().asset_token_balance, near_limit);
        assert_eq!(service.transactions(id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_rules() {
        let db = DatabaseService::in_memory();
        let service = TokenService::new(db.clone());
        let from = patient(&db, "from@example.com").await;
        let to = patient(&db, "to@example.com").await;
        service.update_asset_balance(from, Decimal::from(50)).await.unwrap();

        assert_matches!(
            service.transfer_asset_tokens(from, from, Decimal::ONE).await,
            Err(FixedAssetError::InvalidInput(_))
        );
        assert_matches!(
            service.transfer_asset_tokens(from, 9999, Decimal::ONE).await,
            Err(FixedAssetError::PatientNotFound { .. })
        );
        assert_matches!(
            service.transfer_asset_tokens(from, to, Decimal::from(51)).await,
            Err(FixedAssetError::InsufficientBalance { .. })
        );

        let (sent, received) = service.transfer_asset_tokens(from, to, Decimal::from(20)).await.unwrap();
        assert_eq!(sent.amount, Decimal::from(-20));
        assert_eq!(received.amount, Decimal::from(20));
        assert_eq!(service.balance(from).await.unwrap().asset_token_balance, Decimal::from(30));
        assert_eq!(service.balance(to).await.unwrap().asset_token_balance, Decimal::from(20));
    }
}
