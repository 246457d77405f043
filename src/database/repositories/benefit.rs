//! Benefit redemption repository implementation

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use super::token::apply_change;
use super::{conflict_on_unique, ensure_hospital, ensure_patient};
use crate::database::traits::BenefitStore;
use crate::models::benefit::{BenefitRedemption, NewRedemption, RedemptionStatus};
use crate::models::token::{BalanceChange, TokenType, TransactionType};
use crate::utils::errors::{FixedAssetError, Result};

const REDEMPTION_COLUMNS: &str = "id, redemption_id, patient_id, hospital_id, service_type, ht_amount, status, \
     description, transaction_hash, rejection_reason, approved_at, completed_at, created_at, updated_at";

async fn lock_redemption(conn: &mut PgConnection, redemption_id: &str) -> Result<BenefitRedemption> {
    let sql = format!("SELECT {REDEMPTION_COLUMNS} FROM benefit_redemptions WHERE redemption_id = $1 FOR UPDATE");
    sqlx::query_as::<_, BenefitRedemption>(&sql)
        .bind(redemption_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| FixedAssetError::RedemptionNotFound {
            redemption_id: redemption_id.to_string(),
        })
}

async fn store_redemption(conn: &mut PgConnection, redemption: &BenefitRedemption) -> Result<BenefitRedemption> {
    let sql = format!(
        r#"
        UPDATE benefit_redemptions
        SET status = $2, hospital_id = $3, transaction_hash = $4, rejection_reason = $5,
            approved_at = $6, completed_at = $7, updated_at = $8
        WHERE id = $1
        RETURNING {REDEMPTION_COLUMNS}
        "#
    );
    let stored = sqlx::query_as::<_, BenefitRedemption>(&sql)
        .bind(redemption.id)
        .bind(redemption.status)
        .bind(redemption.hospital_id)
        .bind(&redemption.transaction_hash)
        .bind(&redemption.rejection_reason)
        .bind(redemption.approved_at)
        .bind(redemption.completed_at)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

    Ok(stored)
}

#[derive(Clone, Debug)]
pub struct BenefitRepository {
    pool: PgPool,
}

impl BenefitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        redemption_id: &str,
        to: RedemptionStatus,
        update: impl FnOnce(&mut BenefitRedemption),
    ) -> Result<BenefitRedemption> {
        let mut tx = self.pool.begin().await?;
        let mut redemption = lock_redemption(&mut tx, redemption_id).await?;
        if !redemption.status.can_transition_to(to) {
            return Err(FixedAssetError::transition(redemption.status, to));
        }
        redemption.status = to;
        update(&mut redemption);
        let stored = store_redemption(&mut tx, &redemption).await?;

        tx.commit().await?;
        Ok(stored)
    }
}

#[async_trait]
impl BenefitStore for BenefitRepository {
    async fn create_redemption(&self, redemption: NewRedemption) -> Result<BenefitRedemption> {
        let mut tx = self.pool.begin().await?;
        ensure_patient(&mut tx, redemption.patient_id).await?;

        let sql = format!(
            r#"
            INSERT INTO benefit_redemptions (redemption_id, patient_id, service_type, ht_amount, status, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {REDEMPTION_COLUMNS}
            "#
        );
        let conflict = format!("Redemption {} already exists", redemption.redemption_id);
        let row = sqlx::query_as::<_, BenefitRedemption>(&sql)
            .bind(redemption.redemption_id)
            .bind(redemption.patient_id)
            .bind(redemption.service_type)
            .bind(redemption.ht_amount)
            .bind(RedemptionStatus::Pending)
            .bind(redemption.description)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(conflict_on_unique(conflict))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn find_redemption(&self, redemption_id: &str) -> Result<Option<BenefitRedemption>> {
        let sql = format!("SELECT {REDEMPTION_COLUMNS} FROM benefit_redemptions WHERE redemption_id = $1");
        let row = sqlx::query_as::<_, BenefitRedemption>(&sql)
            .bind(redemption_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_redemptions(&self, patient_id: i64) -> Result<Vec<BenefitRedemption>> {
        let sql = format!(
            "SELECT {REDEMPTION_COLUMNS} FROM benefit_redemptions WHERE patient_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, BenefitRedemption>(&sql)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn approve_redemption(&self, redemption_id: &str, hospital_id: i64) -> Result<BenefitRedemption> {
        let mut tx = self.pool.begin().await?;
        let mut redemption = lock_redemption(&mut tx, redemption_id).await?;
        if !redemption.status.can_transition_to(RedemptionStatus::Approved) {
            return Err(FixedAssetError::transition(redemption.status, RedemptionStatus::Approved));
        }
        ensure_hospital(&mut tx, hospital_id).await?;

        let change = BalanceChange::new(
            redemption.patient_id,
            TokenType::Ht,
            -redemption.ht_amount,
            TransactionType::Redeem,
        )
        .with_metadata(json!({
            "redemption_id": redemption_id,
            "service_type": redemption.service_type.as_str(),
            "hospital_id": hospital_id,
        }));
        apply_change(&mut tx, change).await?;

        let now = Utc::now();
        redemption.status = RedemptionStatus::Approved;
        redemption.hospital_id = Some(hospital_id);
        redemption.approved_at = Some(now);
        let stored = store_redemption(&mut tx, &redemption).await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn complete_redemption(&self, redemption_id: &str, transaction_hash: &str) -> Result<BenefitRedemption> {
        self.transition(redemption_id, RedemptionStatus::Completed, |r| {
            r.transaction_hash = Some(transaction_hash.to_string());
            r.completed_at = Some(Utc::now());
        })
        .await
    }

    async fn reject_redemption(&self, redemption_id: &str, reason: &str) -> Result<BenefitRedemption> {
        self.transition(redemption_id, RedemptionStatus::Rejected, |r| {
            r.rejection_reason = Some(reason.to_string());
        })
        .await
    }
}
