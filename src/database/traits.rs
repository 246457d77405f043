//! Storage traits
//!
//! Every service talks to storage through these traits. The Postgres
//! repositories and the in-memory store both implement all of them, and
//! operations that touch several rows are atomic in either backend.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::*;
use crate::utils::errors::Result;

pub const PATIENT_HAS_TRADES: &str = "Patient has asset tokens referenced by trades";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, request: CreateUserRequest) -> Result<User>;
    /// Creates a PATIENT user together with its profile; neither row exists on failure
    async fn create_patient_user(&self, request: CreateUserRequest, registration_id: String) -> Result<(User, Patient)>;
    async fn find_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `UserNotFound` when the user does not exist
    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User>;
    async fn create_session(&self, session: Session) -> Result<Session>;
    async fn find_session(&self, id: Uuid) -> Result<Option<Session>>;
    /// Returns the number of sessions removed
    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64>;
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn create_patient(&self, patient: NewPatient) -> Result<Patient>;
    async fn find_patient(&self, id: i64) -> Result<Option<Patient>>;
    async fn find_patient_by_user(&self, user_id: i64) -> Result<Option<Patient>>;
    async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>>;
    async fn find_patient_by_registration_id(&self, registration_id: &str) -> Result<Option<Patient>>;
    async fn list_patients(&self, limit: i64, offset: i64) -> Result<Vec<Patient>>;
    async fn update_patient(&self, id: i64, request: UpdatePatientRequest) -> Result<Patient>;
    /// Returns false when no patient was deleted. Removes the patient's deposits,
    /// tokens and ledger rows; fails with `Conflict` while any trade references
    /// one of the patient's asset tokens.
    async fn delete_patient(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait DepositStore: Send + Sync {
    /// Inserts the deposit and, when a hospital is named, a pending asset request
    async fn create_deposit(&self, deposit: NewDeposit) -> Result<AssetDeposit>;
    async fn find_deposit(&self, id: i64) -> Result<Option<AssetDeposit>>;
    /// Newest first
    async fn list_deposits_for_patient(&self, patient_id: i64) -> Result<Vec<AssetDeposit>>;
    async fn list_deposits_by_status(&self, status: DepositStatus) -> Result<Vec<AssetDeposit>>;
    /// Applies a validated status change
    async fn transition_deposit(&self, id: i64, transition: DepositTransition) -> Result<AssetDeposit>;
    /// Marks an approved deposit minted and credits its tokens as AT
    async fn mint_deposit(&self, id: i64, transaction_hash: &str) -> Result<AssetDeposit>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the balance row, creating a zero row on first access
    async fn balance(&self, patient_id: i64) -> Result<TokenBalance>;
    /// Updates a balance and records a confirmed ledger row
    async fn apply_balance_change(&self, change: BalanceChange) -> Result<(TokenBalance, TokenTransaction)>;
    /// Moves AT between patients; returns the sender and receiver ledger rows
    async fn transfer_asset_tokens(
        &self,
        from_patient_id: i64,
        to_patient_id: i64,
        amount: Decimal,
    ) -> Result<(TokenTransaction, TokenTransaction)>;
    /// Newest first
    async fn list_transactions(&self, patient_id: i64, token_type: Option<TokenType>) -> Result<Vec<TokenTransaction>>;
    /// All minted asset tokens when `patient_id` is `None`
    async fn list_asset_tokens(&self, patient_id: Option<i64>) -> Result<Vec<AssetToken>>;
    async fn find_asset_token(&self, id: i64) -> Result<Option<AssetToken>>;
}

#[async_trait]
pub trait BenefitStore: Send + Sync {
    async fn create_redemption(&self, redemption: NewRedemption) -> Result<BenefitRedemption>;
    async fn find_redemption(&self, redemption_id: &str) -> Result<Option<BenefitRedemption>>;
    /// Newest first
    async fn list_redemptions(&self, patient_id: i64) -> Result<Vec<BenefitRedemption>>;
    /// PENDING to APPROVED, debiting HT and recording a REDEEM row
    async fn approve_redemption(&self, redemption_id: &str, hospital_id: i64) -> Result<BenefitRedemption>;
    async fn complete_redemption(&self, redemption_id: &str, transaction_hash: &str) -> Result<BenefitRedemption>;
    async fn reject_redemption(&self, redemption_id: &str, reason: &str) -> Result<BenefitRedemption>;
}

#[async_trait]
pub trait MintingStore: Send + Sync {
    /// Inserts a pending verification and moves the deposit to VERIFIED
    async fn create_verification(&self, verification: NewVerification) -> Result<AssetVerification>;
    async fn find_verification(&self, id: i64) -> Result<Option<AssetVerification>>;
    async fn list_minting_requests(&self, status: Option<VerificationStatus>) -> Result<Vec<MintingRequest>>;
    /// Approves a verification, mints the deposit and credits AT
    async fn approve_minting(
        &self,
        verification_id: i64,
        approved_by: i64,
        transaction_hash: &str,
        token_symbol: &str,
    ) -> Result<AssetToken>;
    async fn reject_minting(&self, verification_id: i64, reason: &str) -> Result<AssetVerification>;
    async fn find_bank_staff(&self, user_id: i64) -> Result<Option<BankStaff>>;
    async fn create_bank_staff(&self, user_id: i64, staff: NewBankStaff) -> Result<BankStaff>;
}

#[async_trait]
pub trait HospitalStore: Send + Sync {
    async fn create_hospital(&self, hospital: NewHospital) -> Result<Hospital>;
    async fn find_hospital(&self, id: i64) -> Result<Option<Hospital>>;
    async fn add_staff(&self, hospital_id: i64, user_id: i64, role: &str) -> Result<HospitalStaff>;
    async fn find_staff_by_user(&self, user_id: i64) -> Result<Option<HospitalStaff>>;
    /// Distinct patients with at least one asset request at the hospital
    async fn hospital_patients(&self, hospital_id: i64) -> Result<Vec<Patient>>;
    async fn list_asset_requests(
        &self,
        hospital_id: i64,
        status: Option<AssetRequestStatus>,
    ) -> Result<Vec<AssetRequestDetail>>;
    async fn transition_asset_request(
        &self,
        hospital_id: i64,
        request_id: i64,
        to: AssetRequestStatus,
        notes: Option<String>,
    ) -> Result<AssetRequest>;
    async fn create_trade(&self, hospital_id: i64, trade: NewTrade) -> Result<Trade>;
    async fn list_trades(&self, hospital_id: i64) -> Result<Vec<Trade>>;
    async fn transition_trade(&self, hospital_id: i64, trade_id: i64, to: TradeStatus) -> Result<Trade>;
    async fn create_allocation(&self, hospital_id: i64, allocation: NewAllocation) -> Result<BenefitAllocation>;
}

#[async_trait]
pub trait InsuranceStore: Send + Sync {
    async fn list_policies(&self, status: Option<PolicyStatus>) -> Result<Vec<InsurancePolicy>>;
    async fn find_policy(&self, id: i64) -> Result<Option<InsurancePolicy>>;
    /// Fails with `Conflict` on a duplicate policy number
    async fn create_policy(&self, policy: NewPolicy) -> Result<InsurancePolicy>;
    async fn list_claims(&self, status: Option<ClaimStatus>) -> Result<Vec<InsuranceClaim>>;
    async fn create_claim(&self, claim: NewClaim) -> Result<InsuranceClaim>;
}
