//! Patient model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Patient profile joined with its user account and token balances
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub registration_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub wallet_address: Option<String>,
    pub emergency_contact: Option<serde_json::Value>,
    pub medical_history: Option<serde_json::Value>,
    pub asset_token_balance: Decimal,
    pub health_token_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub user_id: i64,
    pub registration_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub wallet_address: Option<String>,
    pub emergency_contact: Option<serde_json::Value>,
    pub medical_history: Option<serde_json::Value>,
}
