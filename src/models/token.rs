//! Token balances, ledger rows and minted asset tokens

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

text_enum! {
    /// AT is backed by deposited assets, HT is spent on health benefits
    TokenType {
        At => "AT",
        Ht => "HT",
    }
}

text_enum! {
    TransactionType {
        Mint => "MINT",
        Burn => "BURN",
        Transfer => "TRANSFER",
        Redeem => "REDEEM",
    }
}

text_enum! {
    TransactionStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Failed => "FAILED",
    }
}

text_enum! {
    AssetTokenStatus {
        Active => "ACTIVE",
        Burned => "BURNED",
    }
}

/// Adds a signed delta to a balance. Returns `None` if the result would be negative.
pub fn apply_delta(balance: Decimal, delta: Decimal) -> Option<Decimal> {
    let next = balance.checked_add(delta)?;
    if next.is_sign_negative() && !next.is_zero() {
        None
    } else {
        Some(next)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenBalance {
    pub id: i64,
    pub patient_id: i64,
    pub asset_token_balance: Decimal,
    pub health_token_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenBalance {
    pub fn get(&self, token_type: TokenType) -> Decimal {
        match token_type {
            TokenType::At => self.asset_token_balance,
            TokenType::Ht => self.health_token_balance,
        }
    }

    pub fn set(&mut self, token_type: TokenType, value: Decimal) {
        match token_type {
            TokenType::At => self.asset_token_balance = value,
            TokenType::Ht => self.health_token_balance = value,
        }
    }
}

/// Balance as returned to the portals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalanceView {
    pub patient_id: i64,
    pub asset_token_balance: Decimal,
    pub health_token_balance: Decimal,
    pub wallet_address: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl TokenBalanceView {
    pub fn from_balance(balance: &TokenBalance, wallet_address: Option<String>) -> Self {
        Self {
            patient_id: balance.patient_id,
            asset_token_balance: balance.asset_token_balance,
            health_token_balance: balance.health_token_balance,
            wallet_address,
            last_updated: balance.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenTransaction {
    pub id: i64,
    pub patient_id: i64,
    pub token_type: TokenType,
    pub transaction_type: TransactionType,
    /// Signed for transfers, absolute otherwise
    pub amount: Decimal,
    pub transaction_hash: Option<String>,
    pub status: TransactionStatus,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A single ledger movement applied atomically with its balance update
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub patient_id: i64,
    pub token_type: TokenType,
    pub delta: Decimal,
    pub transaction_type: TransactionType,
    pub metadata: Option<serde_json::Value>,
    pub transaction_hash: Option<String>,
}

impl BalanceChange {
    pub fn new(patient_id: i64, token_type: TokenType, delta: Decimal, transaction_type: TransactionType) -> Self {
        Self {
            patient_id,
            token_type,
            delta,
            transaction_type,
            metadata: None,
            transaction_hash: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(hash.into());
        self
    }
}

/// Tokens minted against a verified deposit
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssetToken {
    pub id: i64,
    pub deposit_id: i64,
    pub patient_id: i64,
    pub token_symbol: String,
    pub token_amount: Decimal,
    pub value_per_token: Decimal,
    pub status: AssetTokenStatus,
    pub mint_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta_rejects_negative_result() {
        assert_eq!(apply_delta(Decimal::from(10), Decimal::from(-4)), Some(Decimal::from(6)));
        assert_eq!(apply_delta(Decimal::from(10), Decimal::from(-10)), Some(Decimal::ZERO));
        assert_eq!(apply_delta(Decimal::from(3), Decimal::from(-4)), None);
    }

    #[test]
    fn test_balance_accessors() {
        let now = Utc::now();
        let mut balance = TokenBalance {
            id: 1,
            patient_id: 7,
            asset_token_balance: Decimal::ZERO,
            health_token_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        balance.set(TokenType::Ht, Decimal::from(42));
        assert_eq!(balance.get(TokenType::Ht), Decimal::from(42));
        assert_eq!(balance.get(TokenType::At), Decimal::ZERO);
    }
}
