//! Bank-side asset verification and minting

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::{
    AssetToken, AssetVerification, BankStaff, MintingRequest, NewBankStaff, NewVerification, VerificationStatus,
};
use crate::services::chain::ChainClient;
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{ensure_amount_in_range, normalize_whitespace};
use crate::utils::logging::{log_admin_action, log_deposit_transition};

#[derive(Clone)]
pub struct MintingService {
    db: DatabaseService,
    chain: Arc<dyn ChainClient>,
    token_symbol: String,
}

impl MintingService {
    pub fn new(db: DatabaseService, chain: Arc<dyn ChainClient>, token_symbol: impl Into<String>) -> Self {
        Self {
            db,
            chain,
            token_symbol: token_symbol.into(),
        }
    }

    pub async fn minting_requests(&self, status: Option<VerificationStatus>) -> Result<Vec<MintingRequest>> {
        debug!(status = ?status, "Listing minting requests");
        self.db.minting.list_minting_requests(status).await
    }

    /// Record the bank's valuation of a deposit and queue it for minting
    pub async fn verify_asset(
        &self,
        deposit_id: i64,
        verified_value: Decimal,
        tokens_to_mint: Decimal,
        notes: Option<String>,
        ipfs_hash: Option<String>,
        verified_by: i64,
    ) -> Result<AssetVerification> {
        if verified_value <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Verified value must be greater than zero".to_string(),
            ));
        }
        if tokens_to_mint <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Tokens to mint must be greater than zero".to_string(),
            ));
        }
        ensure_amount_in_range("Verified value", verified_value)?;
        ensure_amount_in_range("Tokens to mint", tokens_to_mint)?;
        let per_token = verified_value
            .checked_div(tokens_to_mint)
            .ok_or_else(|| FixedAssetError::InvalidInput("Value per token is out of range".to_string()))?;
        ensure_amount_in_range("Value per token", per_token)?;

        let verification = self
            .db
            .minting
            .create_verification(NewVerification {
                deposit_id,
                verified_value,
                tokens_to_mint,
                verification_notes: notes.as_deref().map(normalize_whitespace).filter(|n| !n.is_empty()),
                ipfs_hash: ipfs_hash.filter(|h| !h.trim().is_empty()),
                verified_by,
            })
            .await?;

        log_deposit_transition(deposit_id, "PENDING", "VERIFIED", Some(verified_by));
        info!(
            verification_id = verification.id,
            deposit_id = deposit_id,
            verified_value = %verified_value,
            tokens_to_mint = %tokens_to_mint,
            "Asset verified"
        );
        Ok(verification)
    }

    /// Submit the mint to the chain, then record it in one atomic write
    pub async fn approve_minting(&self, verification_id: i64, approved_by: i64) -> Result<AssetToken> {
        let verification = self
            .db
            .minting
            .find_verification(verification_id)
            .await?
            .ok_or(FixedAssetError::VerificationNotFound { verification_id })?;
        if !verification.status.can_transition_to(VerificationStatus::Approved) {
            return Err(FixedAssetError::transition(verification.status, VerificationStatus::Approved));
        }
        let deposit = self
            .db
            .deposits
            .find_deposit(verification.deposit_id)
            .await?
            .ok_or(FixedAssetError::DepositNotFound {
                deposit_id: verification.deposit_id,
            })?;
        let wallet = self
            .db
            .patients
            .find_patient(deposit.patient_id)
            .await?
            .and_then(|p| p.wallet_address);

        let reference = deposit
            .chain_deposit_id
            .clone()
            .unwrap_or_else(|| format!("DEP-{}", deposit.id));
        let tx_hash = self
            .chain
            .submit_mint(wallet.as_deref(), verification.tokens_to_mint, &reference)
            .await?;

        let token = self
            .db
            .minting
            .approve_minting(verification_id, approved_by, &tx_hash, &self.token_symbol)
            .await?;

        log_deposit_transition(deposit.id, deposit.status.as_str(), "MINTED", Some(approved_by));
        log_admin_action(
            approved_by,
            "approve_minting",
            Some(&format!("verification:{}", verification_id)),
            Some(&format!("{} {}", token.token_amount, token.token_symbol)),
        );
        Ok(token)
    }

    pub async fn reject_minting(&self, verification_id: i64, reason: &str, rejected_by: i64) -> Result<AssetVerification> {
        let reason = normalize_whitespace(reason);
        if reason.is_empty() {
            return Err(FixedAssetError::InvalidInput("Rejection reason is required".to_string()));
        }
        let verification = self.db.minting.reject_minting(verification_id, &reason).await?;
        log_deposit_transition(verification.deposit_id, "VERIFIED", "REJECTED", Some(rejected_by));
        log_admin_action(
            rejected_by,
            "reject_minting",
            Some(&format!("verification:{}", verification_id)),
            Some(&reason),
        );
        Ok(verification)
    }

    /// Every minted asset token, newest first
    pub async fn token_ledger(&self) -> Result<Vec<AssetToken>> {
        self.db.tokens.list_asset_tokens(None).await
    }

    pub async fn bank_staff_info(&self, user_id: i64) -> Result<BankStaff> {
        self.db
            .minting
            .find_bank_staff(user_id)
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Bank staff record for user {}", user_id)))
    }

    pub async fn register_bank_staff(&self, user_id: i64, staff: NewBankStaff) -> Result<BankStaff> {
        let employee_id = staff.employee_id.trim().to_string();
        if employee_id.is_empty() {
            return Err(FixedAssetError::InvalidInput("Employee ID is required".to_string()));
        }
        let record = self
            .db
            .minting
            .create_bank_staff(
                user_id,
                NewBankStaff {
                    employee_id,
                    ..staff
                },
            )
            .await?;
        info!(user_id = user_id, employee_id = %record.employee_id, "Bank staff registered");
        Ok(record)
    }
}
