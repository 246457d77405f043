//! Token balance and ledger repository implementation

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use super::ensure_patient;
use crate::database::traits::TokenStore;
use crate::models::token::{
    apply_delta, AssetToken, BalanceChange, TokenBalance, TokenTransaction, TokenType, TransactionStatus,
    TransactionType,
};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::ensure_amount_in_range;

const BALANCE_COLUMNS: &str = "id, patient_id, asset_token_balance, health_token_balance, created_at, updated_at";
const TRANSACTION_COLUMNS: &str =
    "id, patient_id, token_type, transaction_type, amount, transaction_hash, status, metadata, created_at";
pub(crate) const ASSET_TOKEN_COLUMNS: &str =
    "id, deposit_id, patient_id, token_symbol, token_amount, value_per_token, status, mint_tx_hash, created_at";

/// Locks the balance row of a patient, creating it first when missing
pub(crate) async fn lock_balance(conn: &mut PgConnection, patient_id: i64) -> Result<TokenBalance> {
    ensure_patient(conn, patient_id).await?;

    sqlx::query("INSERT INTO token_balances (patient_id) VALUES ($1) ON CONFLICT (patient_id) DO NOTHING")
        .bind(patient_id)
        .execute(&mut *conn)
        .await?;

    let sql = format!("SELECT {BALANCE_COLUMNS} FROM token_balances WHERE patient_id = $1 FOR UPDATE");
    let balance = sqlx::query_as::<_, TokenBalance>(&sql)
        .bind(patient_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(balance)
}

async fn store_balance(conn: &mut PgConnection, balance: &TokenBalance) -> Result<TokenBalance> {
    let sql = format!(
        r#"
        UPDATE token_balances
        SET asset_token_balance = $2, health_token_balance = $3, updated_at = $4
        WHERE patient_id = $1
        RETURNING {BALANCE_COLUMNS}
        "#
    );
    let stored = sqlx::query_as::<_, TokenBalance>(&sql)
        .bind(balance.patient_id)
        .bind(balance.asset_token_balance)
        .bind(balance.health_token_balance)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    Ok(stored)
}

pub(crate) async fn insert_transaction(
    conn: &mut PgConnection,
    patient_id: i64,
    token_type: TokenType,
    transaction_type: TransactionType,
    amount: Decimal,
    transaction_hash: Option<String>,
    metadata: Option<serde_json::Value>,
) -> Result<TokenTransaction> {
    let sql = format!(
        r#"
        INSERT INTO token_transactions (patient_id, token_type, transaction_type, amount, transaction_hash, status, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {TRANSACTION_COLUMNS}
        "#
    );
    let tx = sqlx::query_as::<_, TokenTransaction>(&sql)
        .bind(patient_id)
        .bind(token_type)
        .bind(transaction_type)
        .bind(amount)
        .bind(transaction_hash)
        .bind(TransactionStatus::Confirmed)
        .bind(metadata)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    Ok(tx)
}

/// Applies a balance change on an open transaction
pub(crate) async fn apply_change(
    conn: &mut PgConnection,
    change: BalanceChange,
) -> Result<(TokenBalance, TokenTransaction)> {
    let mut balance = lock_balance(conn, change.patient_id).await?;
    let current = balance.get(change.token_type);
    let next = apply_delta(current, change.delta).ok_or(FixedAssetError::InsufficientBalance {
        token_type: change.token_type,
        available: current,
        required: change.delta.abs(),
    })?;
    ensure_amount_in_range("Balance", next)?;
    balance.set(change.token_type, next);
    let balance = store_balance(conn, &balance).await?;

    let tx = insert_transaction(
        conn,
        change.patient_id,
        change.token_type,
        change.transaction_type,
        change.delta.abs(),
        change.transaction_hash,
        change.metadata,
    )
    .await?;

    Ok((balance, tx))
}

#[derive(Clone, Debug)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn balance(&self, patient_id: i64) -> Result<TokenBalance> {
        let mut tx = self.pool.begin().await?;
        let balance = lock_balance(&mut tx, patient_id).await?;
        tx.commit().await?;

        Ok(balance)
    }

    async fn apply_balance_change(&self, change: BalanceChange) -> Result<(TokenBalance, TokenTransaction)> {
        let mut tx = self.pool.begin().await?;
        let result = apply_change(&mut tx, change).await?;
        tx.commit().await?;

        Ok(result)
    }

    async fn transfer_asset_tokens(
        &self,
        from_patient_id: i64,
        to_patient_id: i64,
        amount: Decimal,
    ) -> Result<(TokenTransaction, TokenTransaction)> {
        let mut tx = self.pool.begin().await?;

        // lock in id order so two opposite transfers cannot deadlock
        let (first, second) = if from_patient_id < to_patient_id {
            (from_patient_id, to_patient_id)
        } else {
            (to_patient_id, from_patient_id)
        };
        let first_balance = lock_balance(&mut tx, first).await?;
        let second_balance = lock_balance(&mut tx, second).await?;
        let (mut sender, mut receiver) = if first == from_patient_id {
            (first_balance, second_balance)
        } else {
            (second_balance, first_balance)
        };

        let available = sender.asset_token_balance;
        sender.asset_token_balance = apply_delta(available, -amount).ok_or(FixedAssetError::InsufficientBalance {
            token_type: TokenType::At,
            available,
            required: amount,
        })?;
        receiver.asset_token_balance = apply_delta(receiver.asset_token_balance, amount)
            .ok_or_else(|| FixedAssetError::InvalidInput("Transfer amount out of range".to_string()))?;
        ensure_amount_in_range("Balance", receiver.asset_token_balance)?;
        store_balance(&mut tx, &sender).await?;
        store_balance(&mut tx, &receiver).await?;

        let sent = insert_transaction(
            &mut tx,
            from_patient_id,
            TokenType::At,
            TransactionType::Transfer,
            -amount,
            None,
            Some(json!({ "to_patient_id": to_patient_id })),
        )
        .await?;
        let received = insert_transaction(
            &mut tx,
            to_patient_id,
            TokenType::At,
            TransactionType::Transfer,
            amount,
            None,
            Some(json!({ "from_patient_id": from_patient_id })),
        )
        .await?;

        tx.commit().await?;
        Ok((sent, received))
    }

    async fn list_transactions(&self, patient_id: i64, token_type: Option<TokenType>) -> Result<Vec<TokenTransaction>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM token_transactions
            WHERE patient_id = $1 AND ($2::TEXT IS NULL OR token_type = $2)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let txs = sqlx::query_as::<_, TokenTransaction>(&sql)
            .bind(patient_id)
            .bind(token_type)
            .fetch_all(&self.pool)
            .await?;

        Ok(txs)
    }

    async fn list_asset_tokens(&self, patient_id: Option<i64>) -> Result<Vec<AssetToken>> {
        let sql = format!(
            r#"
            SELECT {ASSET_TOKEN_COLUMNS} FROM asset_tokens
            WHERE ($1::BIGINT IS NULL OR patient_id = $1)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let tokens = sqlx::query_as::<_, AssetToken>(&sql)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    async fn find_asset_token(&self, id: i64) -> Result<Option<AssetToken>> {
        let sql = format!("SELECT {ASSET_TOKEN_COLUMNS} FROM asset_tokens WHERE id = $1");
        let token = sqlx::query_as::<_, AssetToken>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }
}
