//! Data models module
//!
//! This module contains all data structures used throughout the application:
//! database rows, request payloads and API views.

/// Declares a status-like enum stored as TEXT and sent over the wire in
/// SCREAMING_SNAKE_CASE. Parsing is case-insensitive.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::models::ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(raw.parse::<$name>()?)
            }
        }
    };
}

pub mod benefit;
pub mod dashboard;
pub mod deposit;
pub mod hospital;
pub mod insurance;
pub mod patient;
pub mod token;
pub mod user;
pub mod verification;

use thiserror::Error;

/// Returned when a status string does not name a known variant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

// Re-export commonly used models
pub use benefit::{
    BenefitRedemption, CatalogEntry, HealthBenefit, NewRedemption, RedeemRequest, RedemptionOutcome,
    RedemptionStatus, ServiceType, BENEFIT_CATALOG,
};
pub use dashboard::{BankStats, DashboardStatistics, HospitalStats, PatientDashboard, PatientStats, PatientSummary};
pub use deposit::{AssetDeposit, AssetType, DepositStatus, DepositTransition, NewDeposit, SubmitDepositRequest};
pub use hospital::{
    AllocationStatus, AssetRequest, AssetRequestDetail, AssetRequestStatus, BankStaff, BenefitAllocation,
    Hospital, HospitalStaff, NewAllocation, NewBankStaff, NewHospital, NewTrade, Trade, TradeStatus,
};
pub use insurance::{ClaimStatus, InsuranceClaim, InsurancePolicy, NewClaim, NewPolicy, PolicyStatus};
pub use patient::{NewPatient, Patient, UpdatePatientRequest};
pub use token::{
    apply_delta, AssetToken, AssetTokenStatus, BalanceChange, TokenBalance, TokenBalanceView, TokenTransaction,
    TokenType, TransactionStatus, TransactionType,
};
pub use user::{
    AuthResponse, CreateUserRequest, LoginRequest, RegisterRequest, Session, UpdateUserRequest, User, UserRole,
    UserStatus,
};
pub use verification::{AssetVerification, MintingRequest, NewVerification, VerificationStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("pending".parse::<DepositStatus>(), Ok(DepositStatus::Pending));
        assert_eq!(" Minted ".parse::<DepositStatus>(), Ok(DepositStatus::Minted));
        assert_eq!("ht".parse::<TokenType>(), Ok(TokenType::Ht));
    }

    #[test]
    fn test_enum_parse_error() {
        let err = "LOST".parse::<DepositStatus>().unwrap_err();
        assert_eq!(err.kind, "DepositStatus");
        assert_eq!(err.to_string(), "Unknown DepositStatus value: LOST");
    }

    #[test]
    fn test_enum_serde_wire_format() {
        let json = serde_json::to_string(&TransactionType::Transfer).unwrap();
        assert_eq!(json, "\"TRANSFER\"");
        let parsed: UserRole = serde_json::from_str("\"bank\"").unwrap();
        assert_eq!(parsed, UserRole::Bank);
    }
}
