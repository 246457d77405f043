//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::utils::errors::{FixedAssetError, Result};

/// Largest page size accepted by list endpoints
pub const MAX_PAGE_SIZE: i64 = 100;

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok())
        .as_ref()
}

fn wallet_regex() -> Option<&'static Regex> {
    static WALLET: OnceLock<Option<Regex>> = OnceLock::new();
    WALLET.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").ok()).as_ref()
}

/// `PREFIX-` followed by eight uppercase hex characters
pub fn generate_reference(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, id[..8].to_uppercase())
}

pub fn generate_registration_id() -> String {
    generate_reference("PAT")
}

pub fn generate_redemption_id() -> String {
    generate_reference("RED")
}

/// Random transaction hash: `0x` followed by 64 hex characters
pub fn generate_tx_hash() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("0x{}", hex)
}

pub fn is_tx_hash(value: &str) -> bool {
    value.len() == 66
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// `0x` followed by 40 hex characters
pub fn is_valid_wallet_address(address: &str) -> bool {
    wallet_regex().is_some_and(|re| re.is_match(address))
}

/// Validate phone number format (basic validation)
pub fn is_valid_phone(phone: &str) -> bool {
    phone.chars().all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ') && phone.len() >= 10
}

/// Trim and lowercase an email address before storage or lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`
pub fn clamp_page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE)
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Amount columns are NUMERIC(20, 8), so every amount stays below 10^12
pub const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Reject amounts that do not fit the amount columns
pub fn ensure_amount_in_range(field: &str, value: Decimal) -> Result<Decimal> {
    if value.abs() >= Decimal::from(AMOUNT_LIMIT) {
        return Err(FixedAssetError::InvalidInput(format!(
            "{} must be less than {}",
            field, AMOUNT_LIMIT
        )));
    }
    Ok(value)
}

/// `a * b`, rejected when it overflows or leaves the column range
pub fn checked_product(field: &str, a: Decimal, b: Decimal) -> Result<Decimal> {
    let product = a
        .checked_mul(b)
        .ok_or_else(|| FixedAssetError::InvalidInput(format!("{} is out of range", field)))?;
    ensure_amount_in_range(field, product)
}

/// Sum without panicking on overflow
pub fn checked_sum(field: &str, values: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, |total, value| {
        total
            .checked_add(value)
            .ok_or_else(|| FixedAssetError::InvalidInput(format!("{} is out of range", field)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let id = generate_redemption_id();
        assert!(id.starts_with("RED-"));
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert!(generate_registration_id().starts_with("PAT-"));
    }

    #[test]
    fn test_tx_hash_format() {
        let hash = generate_tx_hash();
        assert!(is_tx_hash(&hash));
        assert!(!is_tx_hash("0x1234"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("patient@example.com"));
        assert!(!is_valid_email("patient@example"));
        assert!(!is_valid_email("not an email"));
        assert_eq!(normalize_email("  Ali@Example.COM "), "ali@example.com");
    }

    #[test]
    fn test_wallet_validation() {
        assert!(is_valid_wallet_address("0x52908400098527886E0F7030069857D2E4169EE7"));
        assert!(!is_valid_wallet_address("0x1234"));
        assert!(!is_valid_wallet_address("52908400098527886E0F7030069857D2E4169EE7"));
    }

    #[test]
    fn test_page_size_clamp() {
        assert_eq!(clamp_page_size(None), 20);
        assert_eq!(clamp_page_size(Some(500)), 100);
        assert_eq!(clamp_page_size(Some(0)), 1);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Gold   bar \n"), "Gold bar");
    }

    #[test]
    fn test_amount_range() {
        assert!(ensure_amount_in_range("Quantity", Decimal::new(99_999_999_999_999, 2)).is_ok());
        assert!(matches!(
            ensure_amount_in_range("Quantity", Decimal::from(AMOUNT_LIMIT)),
            Err(FixedAssetError::InvalidInput(_))
        ));
        assert!(ensure_amount_in_range("Delta", -Decimal::from(AMOUNT_LIMIT)).is_err());
    }

    #[test]
    fn test_checked_arithmetic_never_panics() {
        assert_eq!(checked_product("Total", Decimal::from(3), Decimal::from(7)).unwrap(), Decimal::from(21));
        assert!(matches!(
            checked_product("Total", Decimal::MAX, Decimal::from(2)),
            Err(FixedAssetError::InvalidInput(_))
        ));
        assert!(checked_product("Total", Decimal::from(1_000_000), Decimal::from(1_000_000)).is_err());
        assert_eq!(checked_sum("Total", [Decimal::ONE, Decimal::TWO]).unwrap(), Decimal::from(3));
        assert!(checked_sum("Total", [Decimal::MAX, Decimal::MAX]).is_err());
    }
}
