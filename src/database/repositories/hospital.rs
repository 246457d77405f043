//! Hospital, staff, asset request and trade repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::patient::PATIENT_SELECT;
use super::{conflict_on_unique, ensure_hospital};
use crate::database::traits::HospitalStore;
use crate::models::hospital::{
    AllocationStatus, AssetRequest, AssetRequestDetail, AssetRequestStatus, BenefitAllocation, Hospital,
    HospitalStaff, NewAllocation, NewHospital, NewTrade, Trade, TradeStatus,
};
use crate::models::patient::Patient;
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::checked_product;

const HOSPITAL_COLUMNS: &str = "id, name, registration_number, address, phone, email, created_at";
const REQUEST_COLUMNS: &str = "id, hospital_id, patient_id, deposit_id, status, notes, created_at, updated_at";
const TRADE_COLUMNS: &str =
    "id, hospital_id, asset_id, quantity, price_per_unit, total_value, status, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct HospitalRepository {
    pool: PgPool,
}

impl HospitalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HospitalStore for HospitalRepository {
    async fn create_hospital(&self, hospital: NewHospital) -> Result<Hospital> {
        let sql = format!(
            r#"
            INSERT INTO hospitals (name, registration_number, address, phone, email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {HOSPITAL_COLUMNS}
            "#
        );
        let conflict = format!("Hospital {} already registered", hospital.registration_number);
        let row = sqlx::query_as::<_, Hospital>(&sql)
            .bind(hospital.name)
            .bind(hospital.registration_number)
            .bind(hospital.address)
            .bind(hospital.phone)
            .bind(hospital.email)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique(conflict))?;

        Ok(row)
    }

    async fn find_hospital(&self, id: i64) -> Result<Option<Hospital>> {
        let sql = format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = $1");
        let row = sqlx::query_as::<_, Hospital>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn add_staff(&self, hospital_id: i64, user_id: i64, role: &str) -> Result<HospitalStaff> {
        let mut tx = self.pool.begin().await?;
        ensure_hospital(&mut tx, hospital_id).await?;

        let staff = sqlx::query_as::<_, HospitalStaff>(
            r#"
            INSERT INTO hospital_staff (hospital_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, hospital_id, user_id, role, created_at
            "#,
        )
        .bind(hospital_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("User is already hospital staff"))?;

        tx.commit().await?;
        Ok(staff)
    }

    async fn find_staff_by_user(&self, user_id: i64) -> Result<Option<HospitalStaff>> {
        let staff = sqlx::query_as::<_, HospitalStaff>(
            "SELECT id, hospital_id, user_id, role, created_at FROM hospital_staff WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }

    async fn hospital_patients(&self, hospital_id: i64) -> Result<Vec<Patient>> {
        let sql = format!(
            "{PATIENT_SELECT} WHERE p.id IN (SELECT patient_id FROM asset_requests WHERE hospital_id = $1) ORDER BY p.id"
        );
        let patients = sqlx::query_as::<_, Patient>(&sql)
            .bind(hospital_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(patients)
    }

    async fn list_asset_requests(
        &self,
        hospital_id: i64,
        status: Option<AssetRequestStatus>,
    ) -> Result<Vec<AssetRequestDetail>> {
        let rows = sqlx::query_as::<_, AssetRequestDetail>(
            r#"
            SELECT r.id, r.hospital_id, r.patient_id, u.name AS patient_name, r.deposit_id,
                   d.asset_type, d.estimated_value, d.status AS deposit_status, r.status, r.notes, r.created_at
            FROM asset_requests r
            JOIN asset_deposits d ON d.id = r.deposit_id
            JOIN patients p ON p.id = r.patient_id
            JOIN users u ON u.id = p.user_id
            WHERE r.hospital_id = $1 AND ($2::TEXT IS NULL OR r.status = $2)
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(hospital_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn transition_asset_request(
        &self,
        hospital_id: i64,
        request_id: i64,
        to: AssetRequestStatus,
        notes: Option<String>,
    ) -> Result<AssetRequest> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM asset_requests WHERE id = $1 AND hospital_id = $2 FOR UPDATE");
        let current = sqlx::query_as::<_, AssetRequest>(&sql)
            .bind(request_id)
            .bind(hospital_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Asset request {}", request_id)))?;
        if !current.status.can_transition_to(to) {
            return Err(FixedAssetError::transition(current.status, to));
        }

        let sql = format!(
            r#"
            UPDATE asset_requests
            SET status = $2, notes = COALESCE($3, notes), updated_at = $4
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, AssetRequest>(&sql)
            .bind(request_id)
            .bind(to)
            .bind(notes)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn create_trade(&self, hospital_id: i64, trade: NewTrade) -> Result<Trade> {
        let total_value = checked_product("Total value", trade.quantity, trade.price_per_unit)?;
        let mut tx = self.pool.begin().await?;
        ensure_hospital(&mut tx, hospital_id).await?;
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM asset_tokens WHERE id = $1)")
            .bind(trade.asset_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(FixedAssetError::NotFound(format!("Asset token {}", trade.asset_id)));
        }

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO trades (hospital_id, asset_id, quantity, price_per_unit, total_value, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {TRADE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Trade>(&sql)
            .bind(hospital_id)
            .bind(trade.asset_id)
            .bind(trade.quantity)
            .bind(trade.price_per_unit)
            .bind(total_value)
            .bind(TradeStatus::Active)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn list_trades(&self, hospital_id: i64) -> Result<Vec<Trade>> {
        let sql = format!("SELECT {TRADE_COLUMNS} FROM trades WHERE hospital_id = $1 ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, Trade>(&sql)
            .bind(hospital_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn transition_trade(&self, hospital_id: i64, trade_id: i64, to: TradeStatus) -> Result<Trade> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = $1 AND hospital_id = $2 FOR UPDATE");
        let current = sqlx::query_as::<_, Trade>(&sql)
            .bind(trade_id)
            .bind(hospital_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Trade {}", trade_id)))?;
        if !current.status.can_transition_to(to) {
            return Err(FixedAssetError::transition(current.status, to));
        }

        let sql = format!("UPDATE trades SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {TRADE_COLUMNS}");
        let updated = sqlx::query_as::<_, Trade>(&sql)
            .bind(trade_id)
            .bind(to)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn create_allocation(&self, hospital_id: i64, allocation: NewAllocation) -> Result<BenefitAllocation> {
        let mut tx = self.pool.begin().await?;
        ensure_hospital(&mut tx, hospital_id).await?;

        let row = sqlx::query_as::<_, BenefitAllocation>(
            r#"
            INSERT INTO benefit_allocations (hospital_id, total_amount, distribution_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, hospital_id, total_amount, distribution_date, status, created_at
            "#,
        )
        .bind(hospital_id)
        .bind(allocation.total_amount)
        .bind(allocation.distribution_date)
        .bind(AllocationStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }
}
