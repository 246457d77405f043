//! Patient repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::{conflict_on_foreign_key, conflict_on_unique};
use crate::database::traits::{PatientStore, PATIENT_HAS_TRADES};
use crate::models::patient::{NewPatient, Patient, UpdatePatientRequest};
use crate::utils::errors::{FixedAssetError, Result};

/// Patient rows joined with the owning user and the balance row
pub(crate) const PATIENT_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.registration_id, u.name, u.email, p.phone_number, p.address,
           p.date_of_birth, u.wallet_address, p.emergency_contact, p.medical_history,
           COALESCE(b.asset_token_balance, 0) AS asset_token_balance,
           COALESCE(b.health_token_balance, 0) AS health_token_balance,
           p.created_at, p.updated_at
    FROM patients p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN token_balances b ON b.patient_id = p.id
"#;

#[derive(Clone, Debug)]
pub struct PatientRepository {
    pool: PgPool,
}

impl PatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_where(&self, clause: &str, value: impl ToString) -> Result<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT} WHERE {clause}");
        let patient = sqlx::query_as::<_, Patient>(&sql)
            .bind(value.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(patient)
    }
}

#[async_trait]
impl PatientStore for PatientRepository {
    async fn create_patient(&self, patient: NewPatient) -> Result<Patient> {
        let now = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO patients (user_id, registration_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(patient.user_id)
        .bind(&patient.registration_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("Patient profile already exists"))?;

        self.find_patient(id)
            .await?
            .ok_or(FixedAssetError::PatientNotFound { patient_id: id })
    }

    async fn find_patient(&self, id: i64) -> Result<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT} WHERE p.id = $1");
        let patient = sqlx::query_as::<_, Patient>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(patient)
    }

    async fn find_patient_by_user(&self, user_id: i64) -> Result<Option<Patient>> {
        let sql = format!("{PATIENT_SELECT} WHERE p.user_id = $1");
        let patient = sqlx::query_as::<_, Patient>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(patient)
    }

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>> {
        self.find_where("u.email = $1", email).await
    }

    async fn find_patient_by_registration_id(&self, registration_id: &str) -> Result<Option<Patient>> {
        self.find_where("p.registration_id = $1", registration_id).await
    }

    async fn list_patients(&self, limit: i64, offset: i64) -> Result<Vec<Patient>> {
        let sql = format!("{PATIENT_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2");
        let patients = sqlx::query_as::<_, Patient>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(patients)
    }

    async fn update_patient(&self, id: i64, request: UpdatePatientRequest) -> Result<Patient> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE patients
            SET phone_number = COALESCE($2, phone_number),
                address = COALESCE($3, address),
                date_of_birth = COALESCE($4, date_of_birth),
                emergency_contact = COALESCE($5, emergency_contact),
                medical_history = COALESCE($6, medical_history),
                updated_at = $7
            WHERE id = $1
            RETURNING user_id
            "#,
        )
        .bind(id)
        .bind(request.phone_number)
        .bind(request.address)
        .bind(request.date_of_birth)
        .bind(request.emergency_contact)
        .bind(request.medical_history)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let (user_id,) = updated.ok_or(FixedAssetError::PatientNotFound { patient_id: id })?;

        if let Some(wallet) = request.wallet_address {
            sqlx::query("UPDATE users SET wallet_address = $2, updated_at = $3 WHERE id = $1")
                .bind(user_id)
                .bind(wallet)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_patient(id)
            .await?
            .ok_or(FixedAssetError::PatientNotFound { patient_id: id })
    }

    async fn delete_patient(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let locked: Option<(i64,)> = sqlx::query_as("SELECT id FROM patients WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(false);
        }

        let traded: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM trades t JOIN asset_tokens a ON a.id = t.asset_id WHERE a.patient_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if traded.0 {
            return Err(FixedAssetError::Conflict(PATIENT_HAS_TRADES.to_string()));
        }

        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_foreign_key(PATIENT_HAS_TRADES))?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
