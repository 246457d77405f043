//! Insurance policy and claim repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::{conflict_on_unique, ensure_hospital, ensure_patient};
use crate::database::traits::InsuranceStore;
use crate::models::insurance::{ClaimStatus, InsuranceClaim, InsurancePolicy, NewClaim, NewPolicy, PolicyStatus};
use crate::utils::errors::{FixedAssetError, Result};

const POLICY_COLUMNS: &str = "id, hospital_id, policy_number, coverage_amount, premium, status, created_at";
const CLAIM_COLUMNS: &str = "id, policy_id, patient_id, claim_amount, status, created_at";

#[derive(Clone, Debug)]
pub struct InsuranceRepository {
    pool: PgPool,
}

impl InsuranceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsuranceStore for InsuranceRepository {
    async fn list_policies(&self, status: Option<PolicyStatus>) -> Result<Vec<InsurancePolicy>> {
        let sql = format!(
            "SELECT {POLICY_COLUMNS} FROM insurance_policies WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, InsurancePolicy>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_policy(&self, id: i64) -> Result<Option<InsurancePolicy>> {
        let sql = format!("SELECT {POLICY_COLUMNS} FROM insurance_policies WHERE id = $1");
        let row = sqlx::query_as::<_, InsurancePolicy>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn create_policy(&self, policy: NewPolicy) -> Result<InsurancePolicy> {
        let mut tx = self.pool.begin().await?;
        ensure_hospital(&mut tx, policy.hospital_id).await?;

        let sql = format!(
            r#"
            INSERT INTO insurance_policies (hospital_id, policy_number, coverage_amount, premium, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {POLICY_COLUMNS}
            "#
        );
        let conflict = format!("Policy number {} already exists", policy.policy_number);
        let row = sqlx::query_as::<_, InsurancePolicy>(&sql)
            .bind(policy.hospital_id)
            .bind(policy.policy_number)
            .bind(policy.coverage_amount)
            .bind(policy.premium)
            .bind(PolicyStatus::Active)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(conflict_on_unique(conflict))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn list_claims(&self, status: Option<ClaimStatus>) -> Result<Vec<InsuranceClaim>> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM insurance_claims WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, InsuranceClaim>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn create_claim(&self, claim: NewClaim) -> Result<InsuranceClaim> {
        let mut tx = self.pool.begin().await?;
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM insurance_policies WHERE id = $1)")
            .bind(claim.policy_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(FixedAssetError::NotFound(format!("Insurance policy {}", claim.policy_id)));
        }
        ensure_patient(&mut tx, claim.patient_id).await?;

        let sql = format!(
            r#"
            INSERT INTO insurance_claims (policy_id, patient_id, claim_amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CLAIM_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InsuranceClaim>(&sql)
            .bind(claim.policy_id)
            .bind(claim.patient_id)
            .bind(claim.claim_amount)
            .bind(ClaimStatus::Pending)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }
}
