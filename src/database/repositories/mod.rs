//! Database repositories module
//!
//! Postgres implementations of the storage traits

pub mod benefit;
pub mod deposit;
pub mod hospital;
pub mod insurance;
pub mod minting;
pub mod patient;
pub mod token;
pub mod user;

// Re-export repositories
pub use benefit::BenefitRepository;
pub use deposit::DepositRepository;
pub use hospital::HospitalRepository;
pub use insurance::InsuranceRepository;
pub use minting::MintingRepository;
pub use patient::PatientRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

use sqlx::PgConnection;

use crate::utils::errors::{FixedAssetError, Result};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps a unique constraint violation to `Conflict`, other errors pass through
pub(crate) fn conflict_on_unique(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> FixedAssetError {
    let message = message.into();
    move |err| {
        let is_unique = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION);
        if is_unique {
            FixedAssetError::Conflict(message)
        } else {
            FixedAssetError::Database(err)
        }
    }
}

/// Maps a foreign key violation to `Conflict`, other errors pass through
pub(crate) fn conflict_on_foreign_key(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> FixedAssetError {
    let message = message.into();
    move |err| {
        let is_referenced = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == FOREIGN_KEY_VIOLATION);
        if is_referenced {
            FixedAssetError::Conflict(message)
        } else {
            FixedAssetError::Database(err)
        }
    }
}

pub(crate) async fn ensure_patient(conn: &mut PgConnection, patient_id: i64) -> Result<()> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1)")
        .bind(patient_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists.0 {
        Ok(())
    } else {
        Err(FixedAssetError::PatientNotFound { patient_id })
    }
}

pub(crate) async fn ensure_hospital(conn: &mut PgConnection, hospital_id: i64) -> Result<()> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = $1)")
        .bind(hospital_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists.0 {
        Ok(())
    } else {
        Err(FixedAssetError::HospitalNotFound { hospital_id })
    }
}
