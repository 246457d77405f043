//! Bank verification and minting repository implementation

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use super::conflict_on_unique;
use super::deposit::{lock_deposit, store_deposit};
use super::token::{apply_change, ASSET_TOKEN_COLUMNS};
use crate::database::traits::MintingStore;
use crate::models::deposit::DepositStatus;
use crate::models::hospital::{BankStaff, NewBankStaff};
use crate::models::token::{AssetToken, AssetTokenStatus, BalanceChange, TokenType, TransactionType};
use crate::models::verification::{AssetVerification, MintingRequest, NewVerification, VerificationStatus};
use crate::utils::errors::{FixedAssetError, Result};

const VERIFICATION_COLUMNS: &str = "id, deposit_id, verified_value, tokens_to_mint, verification_notes, ipfs_hash, \
     verified_by, approved_by, status, rejection_reason, mint_tx_hash, created_at, updated_at";

async fn lock_verification(conn: &mut PgConnection, id: i64) -> Result<AssetVerification> {
    let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM asset_verifications WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, AssetVerification>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(FixedAssetError::VerificationNotFound { verification_id: id })
}

async fn store_verification(conn: &mut PgConnection, v: &AssetVerification) -> Result<AssetVerification> {
    let sql = format!(
        r#"
        UPDATE asset_verifications
        SET status = $2, approved_by = $3, rejection_reason = $4, mint_tx_hash = $5, updated_at = $6
        WHERE id = $1
        RETURNING {VERIFICATION_COLUMNS}
        "#
    );
    let stored = sqlx::query_as::<_, AssetVerification>(&sql)
        .bind(v.id)
        .bind(v.status)
        .bind(v.approved_by)
        .bind(&v.rejection_reason)
        .bind(&v.mint_tx_hash)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    Ok(stored)
}

#[derive(Clone, Debug)]
pub struct MintingRepository {
    pool: PgPool,
}

impl MintingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MintingStore for MintingRepository {
    async fn create_verification(&self, verification: NewVerification) -> Result<AssetVerification> {
        let mut tx = self.pool.begin().await?;
        let mut deposit = lock_deposit(&mut tx, verification.deposit_id).await?;
        if !deposit.status.can_transition_to(DepositStatus::Verified) {
            return Err(FixedAssetError::transition(deposit.status, DepositStatus::Verified));
        }

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO asset_verifications (deposit_id, verified_value, tokens_to_mint, verification_notes, ipfs_hash, verified_by, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {VERIFICATION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, AssetVerification>(&sql)
            .bind(verification.deposit_id)
            .bind(verification.verified_value)
            .bind(verification.tokens_to_mint)
            .bind(verification.verification_notes)
            .bind(verification.ipfs_hash)
            .bind(verification.verified_by)
            .bind(VerificationStatus::Pending)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        deposit.status = DepositStatus::Verified;
        store_deposit(&mut tx, &deposit).await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn find_verification(&self, id: i64) -> Result<Option<AssetVerification>> {
        let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM asset_verifications WHERE id = $1");
        let row = sqlx::query_as::<_, AssetVerification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_minting_requests(&self, status: Option<VerificationStatus>) -> Result<Vec<MintingRequest>> {
        let rows = sqlx::query_as::<_, MintingRequest>(
            r#"
            SELECT v.id AS verification_id, d.id AS deposit_id, p.id AS patient_id, u.name AS patient_name,
                   d.asset_type, d.asset_description, d.estimated_value, v.verified_value, v.tokens_to_mint,
                   v.status, v.verified_by, v.created_at
            FROM asset_verifications v
            JOIN asset_deposits d ON d.id = v.deposit_id
            JOIN patients p ON p.id = d.patient_id
            JOIN users u ON u.id = p.user_id
            WHERE ($1::TEXT IS NULL OR v.status = $1)
            ORDER BY v.created_at DESC, v.id DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn approve_minting(
        &self,
        verification_id: i64,
        approved_by: i64,
        transaction_hash: &str,
        token_symbol: &str,
    ) -> Result<AssetToken> {
        let mut tx = self.pool.begin().await?;
        let mut verification = lock_verification(&mut tx, verification_id).await?;
        if !verification.status.can_transition_to(VerificationStatus::Approved) {
            return Err(FixedAssetError::transition(verification.status, VerificationStatus::Approved));
        }
        let mut deposit = lock_deposit(&mut tx, verification.deposit_id).await?;
        if !deposit.status.can_transition_to(DepositStatus::Minted) {
            return Err(FixedAssetError::transition(deposit.status, DepositStatus::Minted));
        }

        let tokens = verification.tokens_to_mint;
        let change = BalanceChange::new(deposit.patient_id, TokenType::At, tokens, TransactionType::Mint)
            .with_metadata(json!({ "deposit_id": deposit.id, "verification_id": verification_id }))
            .with_hash(transaction_hash);
        apply_change(&mut tx, change).await?;

        verification.status = VerificationStatus::Approved;
        verification.approved_by = Some(approved_by);
        verification.mint_tx_hash = Some(transaction_hash.to_string());
        store_verification(&mut tx, &verification).await?;

        deposit.status = DepositStatus::Minted;
        deposit.tokens_minted = Some(tokens);
        deposit.transaction_hash = Some(transaction_hash.to_string());
        store_deposit(&mut tx, &deposit).await?;

        let sql = format!(
            r#"
            INSERT INTO asset_tokens (deposit_id, patient_id, token_symbol, token_amount, value_per_token, status, mint_tx_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ASSET_TOKEN_COLUMNS}
            "#
        );
        let token = sqlx::query_as::<_, AssetToken>(&sql)
            .bind(deposit.id)
            .bind(deposit.patient_id)
            .bind(token_symbol)
            .bind(tokens)
            .bind(verification.verified_value.checked_div(tokens).unwrap_or(Decimal::ZERO))
            .bind(AssetTokenStatus::Active)
            .bind(transaction_hash)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(token)
    }

    async fn reject_minting(&self, verification_id: i64, reason: &str) -> Result<AssetVerification> {
        let mut tx = self.pool.begin().await?;
        let mut verification = lock_verification(&mut tx, verification_id).await?;
        if !verification.status.can_transition_to(VerificationStatus::Rejected) {
            return Err(FixedAssetError::transition(verification.status, VerificationStatus::Rejected));
        }
        let mut deposit = lock_deposit(&mut tx, verification.deposit_id).await?;
        if !deposit.status.can_transition_to(DepositStatus::Rejected) {
            return Err(FixedAssetError::transition(deposit.status, DepositStatus::Rejected));
        }

        deposit.status = DepositStatus::Rejected;
        deposit.rejection_reason = Some(reason.to_string());
        store_deposit(&mut tx, &deposit).await?;

        verification.status = VerificationStatus::Rejected;
        verification.rejection_reason = Some(reason.to_string());
        let stored = store_verification(&mut tx, &verification).await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn find_bank_staff(&self, user_id: i64) -> Result<Option<BankStaff>> {
        let staff = sqlx::query_as::<_, BankStaff>(
            "SELECT id, user_id, employee_id, department, position, created_at FROM bank_staff WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }

    async fn create_bank_staff(&self, user_id: i64, staff: NewBankStaff) -> Result<BankStaff> {
        let staff = sqlx::query_as::<_, BankStaff>(
            r#"
            INSERT INTO bank_staff (user_id, employee_id, department, position, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, employee_id, department, position, created_at
            "#,
        )
        .bind(user_id)
        .bind(staff.employee_id)
        .bind(staff.department)
        .bind(staff.position)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("Bank staff record already exists"))?;

        Ok(staff)
    }
}
