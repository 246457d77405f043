//! Asset deposit repository implementation

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use super::token::apply_change;
use super::{ensure_hospital, ensure_patient};
use crate::database::traits::DepositStore;
use crate::models::deposit::{AssetDeposit, DepositStatus, DepositTransition, NewDeposit};
use crate::models::token::{BalanceChange, TokenType, TransactionType};
use crate::utils::errors::{FixedAssetError, Result};

pub(crate) const DEPOSIT_COLUMNS: &str = "id, patient_id, asset_type, asset_description, quantity, unit, \
     estimated_value, status, tokens_minted, chain_deposit_id, transaction_hash, rejection_reason, created_at, updated_at";

pub(crate) async fn lock_deposit(conn: &mut PgConnection, id: i64) -> Result<AssetDeposit> {
    let sql = format!("SELECT {DEPOSIT_COLUMNS} FROM asset_deposits WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, AssetDeposit>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(FixedAssetError::DepositNotFound { deposit_id: id })
}

pub(crate) async fn store_deposit(conn: &mut PgConnection, deposit: &AssetDeposit) -> Result<AssetDeposit> {
    let sql = format!(
        r#"
        UPDATE asset_deposits
        SET status = $2, tokens_minted = $3, chain_deposit_id = $4, transaction_hash = $5,
            rejection_reason = $6, updated_at = $7
        WHERE id = $1
        RETURNING {DEPOSIT_COLUMNS}
        "#
    );
    let stored = sqlx::query_as::<_, AssetDeposit>(&sql)
        .bind(deposit.id)
        .bind(deposit.status)
        .bind(deposit.tokens_minted)
        .bind(&deposit.chain_deposit_id)
        .bind(&deposit.transaction_hash)
        .bind(&deposit.rejection_reason)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    Ok(stored)
}

#[derive(Clone, Debug)]
pub struct DepositRepository {
    pool: PgPool,
}

impl DepositRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepositStore for DepositRepository {
    async fn create_deposit(&self, deposit: NewDeposit) -> Result<AssetDeposit> {
        let mut tx = self.pool.begin().await?;
        ensure_patient(&mut tx, deposit.patient_id).await?;
        if let Some(hospital_id) = deposit.hospital_id {
            ensure_hospital(&mut tx, hospital_id).await?;
        }

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO asset_deposits (patient_id, asset_type, asset_description, quantity, unit, estimated_value, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {DEPOSIT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, AssetDeposit>(&sql)
            .bind(deposit.patient_id)
            .bind(deposit.asset_type)
            .bind(deposit.asset_description)
            .bind(deposit.quantity)
            .bind(deposit.unit)
            .bind(deposit.estimated_value)
            .bind(DepositStatus::Pending)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(hospital_id) = deposit.hospital_id {
            sqlx::query(
                r#"
                INSERT INTO asset_requests (hospital_id, patient_id, deposit_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, 'PENDING', $4, $4)
                "#,
            )
            .bind(hospital_id)
            .bind(row.patient_id)
            .bind(row.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn find_deposit(&self, id: i64) -> Result<Option<AssetDeposit>> {
        let sql = format!("SELECT {DEPOSIT_COLUMNS} FROM asset_deposits WHERE id = $1");
        let deposit = sqlx::query_as::<_, AssetDeposit>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(deposit)
    }

    async fn list_deposits_for_patient(&self, patient_id: i64) -> Result<Vec<AssetDeposit>> {
        let sql = format!(
            "SELECT {DEPOSIT_COLUMNS} FROM asset_deposits WHERE patient_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let deposits = sqlx::query_as::<_, AssetDeposit>(&sql)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(deposits)
    }

    async fn list_deposits_by_status(&self, status: DepositStatus) -> Result<Vec<AssetDeposit>> {
        let sql = format!(
            "SELECT {DEPOSIT_COLUMNS} FROM asset_deposits WHERE status = $1 ORDER BY created_at DESC, id DESC"
        );
        let deposits = sqlx::query_as::<_, AssetDeposit>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(deposits)
    }

    async fn transition_deposit(&self, id: i64, transition: DepositTransition) -> Result<AssetDeposit> {
        let mut tx = self.pool.begin().await?;
        let mut deposit = lock_deposit(&mut tx, id).await?;
        if !deposit.status.can_transition_to(transition.to) {
            return Err(FixedAssetError::transition(deposit.status, transition.to));
        }

        deposit.status = transition.to;
        if transition.chain_deposit_id.is_some() {
            deposit.chain_deposit_id = transition.chain_deposit_id;
        }
        if transition.tokens_minted.is_some() {
            deposit.tokens_minted = transition.tokens_minted;
        }
        if transition.rejection_reason.is_some() {
            deposit.rejection_reason = transition.rejection_reason;
        }
        let stored = store_deposit(&mut tx, &deposit).await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn mint_deposit(&self, id: i64, transaction_hash: &str) -> Result<AssetDeposit> {
        let mut tx = self.pool.begin().await?;
        let mut deposit = lock_deposit(&mut tx, id).await?;
        if !deposit.status.can_transition_to(DepositStatus::Minted) {
            return Err(FixedAssetError::transition(deposit.status, DepositStatus::Minted));
        }
        let tokens = deposit
            .tokens_minted
            .filter(|t| !t.is_zero() && t.is_sign_positive())
            .ok_or_else(|| FixedAssetError::InvalidInput(format!("Deposit {} has no approved token amount", id)))?;

        let change = BalanceChange::new(deposit.patient_id, TokenType::At, tokens, TransactionType::Mint)
            .with_metadata(json!({ "deposit_id": id }))
            .with_hash(transaction_hash);
        apply_change(&mut tx, change).await?;

        deposit.status = DepositStatus::Minted;
        deposit.transaction_hash = Some(transaction_hash.to_string());
        let stored = store_deposit(&mut tx, &deposit).await?;

        tx.commit().await?;
        Ok(stored)
    }
}
