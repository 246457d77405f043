//! Hospital operations: staff, asset review requests, trades and benefit allocations

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::{
    AssetRequest, AssetRequestDetail, AssetRequestStatus, BenefitAllocation, Hospital, HospitalStaff, NewAllocation,
    NewHospital, NewTrade, Patient, Trade, TradeStatus, UserRole,
};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{
    checked_product, ensure_amount_in_range, is_valid_email, normalize_email, normalize_whitespace,
};

#[derive(Clone, Debug)]
pub struct HospitalService {
    db: DatabaseService,
    trading_enabled: bool,
}

impl HospitalService {
    pub fn new(db: DatabaseService, trading_enabled: bool) -> Self {
        Self { db, trading_enabled }
    }

    pub async fn create_hospital(&self, request: NewHospital) -> Result<Hospital> {
        let name = normalize_whitespace(&request.name);
        let registration_number = request.registration_number.trim().to_string();
        if name.is_empty() || registration_number.is_empty() {
            return Err(FixedAssetError::InvalidInput(
                "Hospital name and registration number are required".to_string(),
            ));
        }
        let email = request.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(FixedAssetError::InvalidInput("Invalid email format".to_string()));
            }
        }

        let hospital = self
            .db
            .hospitals
            .create_hospital(NewHospital {
                name,
                registration_number,
                address: request.address,
                phone: request.phone,
                email,
            })
            .await?;
        info!(hospital_id = hospital.id, name = %hospital.name, "Hospital registered");
        Ok(hospital)
    }

    /// Attach a HOSPITAL user to a hospital
    pub async fn add_staff(&self, hospital_id: i64, user_id: i64, role: &str) -> Result<HospitalStaff> {
        let user = self
            .db
            .users
            .find_user(user_id)
            .await?
            .ok_or(FixedAssetError::UserNotFound { user_id })?;
        if user.role != UserRole::Hospital {
            return Err(FixedAssetError::InvalidInput(format!(
                "User {} does not have the HOSPITAL role",
                user_id
            )));
        }
        let role = role.trim();
        let role = if role.is_empty() { "staff" } else { role };

        let staff = self.db.hospitals.add_staff(hospital_id, user_id, role).await?;
        info!(hospital_id = hospital_id, user_id = user_id, role = role, "Hospital staff added");
        Ok(staff)
    }

    pub async fn hospital_for_user(&self, user_id: i64) -> Result<Hospital> {
        let staff = self
            .db
            .hospitals
            .find_staff_by_user(user_id)
            .await?
            .ok_or_else(|| FixedAssetError::NotFound(format!("Hospital for user {}", user_id)))?;
        self.get_hospital(staff.hospital_id).await
    }

    pub async fn get_hospital(&self, hospital_id: i64) -> Result<Hospital> {
        self.db
            .hospitals
            .find_hospital(hospital_id)
            .await?
            .ok_or(FixedAssetError::HospitalNotFound { hospital_id })
    }

    /// Patients with at least one asset request at the hospital
    pub async fn patients(&self, hospital_id: i64) -> Result<Vec<Patient>> {
        self.get_hospital(hospital_id).await?;
        self.db.hospitals.hospital_patients(hospital_id).await
    }

    pub async fn asset_requests(
        &self,
        hospital_id: i64,
        status: Option<AssetRequestStatus>,
    ) -> Result<Vec<AssetRequestDetail>> {
        self.get_hospital(hospital_id).await?;
        debug!(hospital_id = hospital_id, status = ?status, "Listing asset requests");
        self.db.hospitals.list_asset_requests(hospital_id, status).await
    }

    pub async fn approve_asset_request(
        &self,
        hospital_id: i64,
        request_id: i64,
        notes: Option<String>,
    ) -> Result<AssetRequest> {
        let notes = notes.as_deref().map(normalize_whitespace).filter(|n| !n.is_empty());
        let request = self
            .db
            .hospitals
            .transition_asset_request(hospital_id, request_id, AssetRequestStatus::Approved, notes)
            .await?;
        info!(hospital_id = hospital_id, request_id = request_id, "Asset request approved");
        Ok(request)
    }

    pub async fn reject_asset_request(&self, hospital_id: i64, request_id: i64, reason: &str) -> Result<AssetRequest> {
        let reason = normalize_whitespace(reason);
        if reason.is_empty() {
            return Err(FixedAssetError::InvalidInput("Rejection reason is required".to_string()));
        }
        let request = self
            .db
            .hospitals
            .transition_asset_request(hospital_id, request_id, AssetRequestStatus::Rejected, Some(reason))
            .await?;
        info!(hospital_id = hospital_id, request_id = request_id, "Asset request rejected");
        Ok(request)
    }

    pub async fn create_trade(&self, hospital_id: i64, trade: NewTrade) -> Result<Trade> {
        self.require_trading()?;
        if trade.quantity <= Decimal::ZERO || trade.price_per_unit <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Quantity and price per unit must be greater than zero".to_string(),
            ));
        }
        ensure_amount_in_range("Quantity", trade.quantity)?;
        ensure_amount_in_range("Price per unit", trade.price_per_unit)?;
        checked_product("Total value", trade.quantity, trade.price_per_unit)?;
        let trade = self.db.hospitals.create_trade(hospital_id, trade).await?;
        info!(
            hospital_id = hospital_id,
            trade_id = trade.id,
            total_value = %trade.total_value,
            "Trade opened"
        );
        Ok(trade)
    }

    pub async fn trades(&self, hospital_id: i64) -> Result<Vec<Trade>> {
        self.get_hospital(hospital_id).await?;
        self.db.hospitals.list_trades(hospital_id).await
    }

    pub async fn update_trade_status(&self, hospital_id: i64, trade_id: i64, status: TradeStatus) -> Result<Trade> {
        self.require_trading()?;
        let trade = self.db.hospitals.transition_trade(hospital_id, trade_id, status).await?;
        info!(hospital_id = hospital_id, trade_id = trade_id, status = %status, "Trade status changed");
        Ok(trade)
    }

    pub async fn allocate_benefits(
        &self,
        hospital_id: i64,
        total_amount: Decimal,
        distribution_date: NaiveDate,
    ) -> Result<BenefitAllocation> {
        if total_amount <= Decimal::ZERO {
            return Err(FixedAssetError::InvalidInput(
                "Allocation amount must be greater than zero".to_string(),
            ));
        }
        ensure_amount_in_range("Allocation amount", total_amount)?;
        let allocation = self
            .db
            .hospitals
            .create_allocation(
                hospital_id,
                NewAllocation {
                    total_amount,
                    distribution_date,
                },
            )
            .await?;
        info!(
            hospital_id = hospital_id,
            allocation_id = allocation.id,
            total_amount = %total_amount,
            "Benefit allocation scheduled"
        );
        Ok(allocation)
    }

    fn require_trading(&self) -> Result<()> {
        if self.trading_enabled {
            Ok(())
        } else {
            Err(FixedAssetError::ServiceUnavailable("Trading is disabled".to_string()))
        }
    }
}
