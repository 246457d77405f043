//! In-process storage backend
//!
//! All tables live behind a single lock so every multi-row operation is
//! atomic. Validation happens before the first write, which keeps a failed
//! operation from leaving partial changes behind.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::traits::*;
use crate::models::*;
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{checked_product, ensure_amount_in_range};

#[derive(Debug, Clone)]
struct PatientRow {
    id: i64,
    user_id: i64,
    registration_id: String,
    phone_number: Option<String>,
    address: Option<String>,
    date_of_birth: Option<chrono::NaiveDate>,
    emergency_contact: Option<serde_json::Value>,
    medical_history: Option<serde_json::Value>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    seq: i64,
    users: BTreeMap<i64, User>,
    sessions: HashMap<Uuid, Session>,
    patients: BTreeMap<i64, PatientRow>,
    balances: BTreeMap<i64, TokenBalance>,
    transactions: Vec<TokenTransaction>,
    deposits: BTreeMap<i64, AssetDeposit>,
    verifications: BTreeMap<i64, AssetVerification>,
    asset_tokens: BTreeMap<i64, AssetToken>,
    redemptions: BTreeMap<String, BenefitRedemption>,
    hospitals: BTreeMap<i64, Hospital>,
    hospital_staff: BTreeMap<i64, HospitalStaff>,
    bank_staff: BTreeMap<i64, BankStaff>,
    asset_requests: BTreeMap<i64, AssetRequest>,
    trades: BTreeMap<i64, Trade>,
    allocations: BTreeMap<i64, BenefitAllocation>,
    policies: BTreeMap<i64, InsurancePolicy>,
    claims: BTreeMap<i64, InsuranceClaim>,
}

impl Tables {
    fn insert_user(&mut self, request: CreateUserRequest) -> Result<User> {
        if self.users.values().any(|u| u.email == request.email) {
            return Err(FixedAssetError::Conflict("Email already registered".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: self.next_id(),
            email: request.email,
            name: request.name,
            password_hash: request.password_hash,
            role: request.role,
            wallet_address: request.wallet_address,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn insert_patient(&mut self, patient: NewPatient) -> Result<Patient> {
        if !self.users.contains_key(&patient.user_id) {
            return Err(FixedAssetError::UserNotFound { user_id: patient.user_id });
        }
        if self.patients.values().any(|p| p.user_id == patient.user_id) {
            return Err(FixedAssetError::Conflict("Patient profile already exists".to_string()));
        }
        if self.patients.values().any(|p| p.registration_id == patient.registration_id) {
            return Err(FixedAssetError::Conflict("Registration ID already in use".to_string()));
        }
        let now = Utc::now();
        let row = PatientRow {
            id: self.next_id(),
            user_id: patient.user_id,
            registration_id: patient.registration_id,
            phone_number: None,
            address: None,
            date_of_birth: None,
            emergency_contact: None,
            medical_history: None,
            created_at: now,
            updated_at: now,
        };
        let id = row.id;
        self.patients.insert(id, row);
        self.patient_by_id(id).ok_or(FixedAssetError::PatientNotFound { patient_id: id })
    }

    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn patient_view(&self, row: &PatientRow) -> Option<Patient> {
        let user = self.users.get(&row.user_id)?;
        let (asset, health) = self
            .balances
            .get(&row.id)
            .map(|b| (b.asset_token_balance, b.health_token_balance))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));
        Some(Patient {
            id: row.id,
            user_id: row.user_id,
            registration_id: row.registration_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone_number: row.phone_number.clone(),
            address: row.address.clone(),
            date_of_birth: row.date_of_birth,
            wallet_address: user.wallet_address.clone(),
            emergency_contact: row.emergency_contact.clone(),
            medical_history: row.medical_history.clone(),
            asset_token_balance: asset,
            health_token_balance: health,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn patient_by_id(&self, id: i64) -> Option<Patient> {
        self.patients.get(&id).and_then(|row| self.patient_view(row))
    }

    fn require_patient(&self, id: i64) -> Result<()> {
        if self.patients.contains_key(&id) {
            Ok(())
        } else {
            Err(FixedAssetError::PatientNotFound { patient_id: id })
        }
    }

    fn require_hospital(&self, id: i64) -> Result<()> {
        if self.hospitals.contains_key(&id) {
            Ok(())
        } else {
            Err(FixedAssetError::HospitalNotFound { hospital_id: id })
        }
    }

    fn balance_entry(&mut self, patient_id: i64) -> &mut TokenBalance {
        let seq = &mut self.seq;
        self.balances.entry(patient_id).or_insert_with(|| {
            *seq += 1;
            let now = Utc::now();
            TokenBalance {
                id: *seq,
                patient_id,
                asset_token_balance: Decimal::ZERO,
                health_token_balance: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            }
        })
    }

    fn push_transaction(
        &mut self,
        patient_id: i64,
        token_type: TokenType,
        transaction_type: TransactionType,
        amount: Decimal,
        transaction_hash: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> TokenTransaction {
        let tx = TokenTransaction {
            id: self.next_id(),
            patient_id,
            token_type,
            transaction_type,
            amount,
            transaction_hash,
            status: TransactionStatus::Confirmed,
            metadata,
            created_at: Utc::now(),
        };
        self.transactions.push(tx.clone());
        tx
    }

    /// Fails before writing anything when a debit is not covered
    fn apply_change(&mut self, change: BalanceChange) -> Result<(TokenBalance, TokenTransaction)> {
        self.require_patient(change.patient_id)?;
        let balance = self.balance_entry(change.patient_id);
        let current = balance.get(change.token_type);
        let next = apply_delta(current, change.delta).ok_or(FixedAssetError::InsufficientBalance {
            token_type: change.token_type,
            available: current,
            required: change.delta.abs(),
        })?;
        ensure_amount_in_range("Balance", next)?;
        balance.set(change.token_type, next);
        balance.updated_at = Utc::now();
        let snapshot = balance.clone();

        let tx = self.push_transaction(
            change.patient_id,
            change.token_type,
            change.transaction_type,
            change.delta.abs(),
            change.transaction_hash,
            change.metadata,
        );
        Ok((snapshot, tx))
    }

    fn redemption_mut(&mut self, redemption_id: &str) -> Result<&mut BenefitRedemption> {
        self.redemptions
            .get_mut(redemption_id)
            .ok_or_else(|| FixedAssetError::RedemptionNotFound {
                redemption_id: redemption_id.to_string(),
            })
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Storage backend that keeps every table in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        self.tables.write().await.insert_user(request)
    }

    async fn create_patient_user(&self, request: CreateUserRequest, registration_id: String) -> Result<(User, Patient)> {
        let mut t = self.tables.write().await;
        if t.patients.values().any(|p| p.registration_id == registration_id) {
            return Err(FixedAssetError::Conflict("Registration ID already in use".to_string()));
        }
        let user = t.insert_user(request)?;
        let patient = t.insert_patient(NewPatient {
            user_id: user.id,
            registration_id,
        })?;
        Ok((user, patient))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User> {
        let mut t = self.tables.write().await;
        if let Some(email) = &request.email {
            if t.users.values().any(|u| &u.email == email && u.id != id) {
                return Err(FixedAssetError::Conflict("Email already registered".to_string()));
            }
        }
        let user = t.users.get_mut(&id).ok_or(FixedAssetError::UserNotFound { user_id: id })?;
        if let Some(name) = request.name {
            user.name = name;
        }
        if let Some(email) = request.email {
            user.email = email;
        }
        if let Some(wallet) = request.wallet_address {
            user.wallet_address = Some(wallet);
        }
        if let Some(status) = request.status {
            user.status = status;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn create_session(&self, session: Session) -> Result<Session> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&session.user_id) {
            return Err(FixedAssetError::UserNotFound { user_id: session.user_id });
        }
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn create_patient(&self, patient: NewPatient) -> Result<Patient> {
        self.tables.write().await.insert_patient(patient)
    }

    async fn find_patient(&self, id: i64) -> Result<Option<Patient>> {
        Ok(self.tables.read().await.patient_by_id(id))
    }

    async fn find_patient_by_user(&self, user_id: i64) -> Result<Option<Patient>> {
        let t = self.tables.read().await;
        Ok(t.patients
            .values()
            .find(|p| p.user_id == user_id)
            .and_then(|row| t.patient_view(row)))
    }

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>> {
        let t = self.tables.read().await;
        Ok(t.patients
            .values()
            .filter_map(|row| t.patient_view(row))
            .find(|p| p.email == email))
    }

    async fn find_patient_by_registration_id(&self, registration_id: &str) -> Result<Option<Patient>> {
        let t = self.tables.read().await;
        Ok(t.patients
            .values()
            .find(|p| p.registration_id == registration_id)
            .and_then(|row| t.patient_view(row)))
    }

    async fn list_patients(&self, limit: i64, offset: i64) -> Result<Vec<Patient>> {
        let t = self.tables.read().await;
        let mut patients: Vec<Patient> = t.patients.values().filter_map(|row| t.patient_view(row)).collect();
        newest_first(&mut patients, |p| (p.created_at, p.id));
        Ok(patients
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update_patient(&self, id: i64, request: UpdatePatientRequest) -> Result<Patient> {
        let mut t = self.tables.write().await;
        let row = t.patients.get_mut(&id).ok_or(FixedAssetError::PatientNotFound { patient_id: id })?;
        if let Some(phone) = request.phone_number {
            row.phone_number = Some(phone);
        }
        if let Some(address) = request.address {
            row.address = Some(address);
        }
        if let Some(dob) = request.date_of_birth {
            row.date_of_birth = Some(dob);
        }
        if let Some(contact) = request.emergency_contact {
            row.emergency_contact = Some(contact);
        }
        if let Some(history) = request.medical_history {
            row.medical_history = Some(history);
        }
        row.updated_at = Utc::now();
        let user_id = row.user_id;
        if let Some(wallet) = request.wallet_address {
            if let Some(user) = t.users.get_mut(&user_id) {
                user.wallet_address = Some(wallet);
                user.updated_at = Utc::now();
            }
        }
        t.patient_by_id(id).ok_or(FixedAssetError::PatientNotFound { patient_id: id })
    }

    async fn delete_patient(&self, id: i64) -> Result<bool> {
        let mut t = self.tables.write().await;
        if !t.patients.contains_key(&id) {
            return Ok(false);
        }
        let traded = t
            .trades
            .values()
            .any(|trade| t.asset_tokens.get(&trade.asset_id).is_some_and(|a| a.patient_id == id));
        if traded {
            return Err(FixedAssetError::Conflict(PATIENT_HAS_TRADES.to_string()));
        }
        t.patients.remove(&id);
        t.balances.remove(&id);
        t.transactions.retain(|tx| tx.patient_id != id);
        let deposits: HashSet<i64> = t.deposits.values().filter(|d| d.patient_id == id).map(|d| d.id).collect();
        t.deposits.retain(|_, d| d.patient_id != id);
        t.verifications.retain(|_, v| !deposits.contains(&v.deposit_id));
        t.asset_tokens.retain(|_, a| a.patient_id != id);
        t.redemptions.retain(|_, r| r.patient_id != id);
        t.asset_requests.retain(|_, r| r.patient_id != id);
        t.claims.retain(|_, c| c.patient_id != id);
        Ok(true)
    }
}

#[async_trait]
impl DepositStore for MemoryStore {
    async fn create_deposit(&self, deposit: NewDeposit) -> Result<AssetDeposit> {
        let mut t = self.tables.write().await;
        t.require_patient(deposit.patient_id)?;
        if let Some(hospital_id) = deposit.hospital_id {
            t.require_hospital(hospital_id)?;
        }
        let now = Utc::now();
        let row = AssetDeposit {
            id: t.next_id(),
            patient_id: deposit.patient_id,
            asset_type: deposit.asset_type,
            asset_description: deposit.asset_description,
            quantity: deposit.quantity,
            unit: deposit.unit,
            estimated_value: deposit.estimated_value,
            status: DepositStatus::Pending,
            tokens_minted: None,
            chain_deposit_id: None,
            transaction_hash: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        t.deposits.insert(row.id, row.clone());

        if let Some(hospital_id) = deposit.hospital_id {
            let request = AssetRequest {
                id: t.next_id(),
                hospital_id,
                patient_id: row.patient_id,
                deposit_id: row.id,
                status: AssetRequestStatus::Pending,
                notes: None,
                created_at: now,
                updated_at: now,
            };
            t.asset_requests.insert(request.id, request);
        }
        Ok(row)
    }

    async fn find_deposit(&self, id: i64) -> Result<Option<AssetDeposit>> {
        Ok(self.tables.read().await.deposits.get(&id).cloned())
    }

    async fn list_deposits_for_patient(&self, patient_id: i64) -> Result<Vec<AssetDeposit>> {
        let t = self.tables.read().await;
        let mut deposits: Vec<AssetDeposit> = t
            .deposits
            .values()
            .filter(|d| d.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut deposits, |d| (d.created_at, d.id));
        Ok(deposits)
    }

    async fn list_deposits_by_status(&self, status: DepositStatus) -> Result<Vec<AssetDeposit>> {
        let t = self.tables.read().await;
        let mut deposits: Vec<AssetDeposit> = t.deposits.values().filter(|d| d.status == status).cloned().collect();
        newest_first(&mut deposits, |d| (d.created_at, d.id));
        Ok(deposits)
    }

    async fn transition_deposit(&self, id: i64, transition: DepositTransition) -> Result<AssetDeposit> {
        let mut t = self.tables.write().await;
        let deposit = t.deposits.get_mut(&id).ok_or(FixedAssetError::DepositNotFound { deposit_id: id })?;
        if !deposit.status.can_transition_to(transition.to) {
            return Err(FixedAssetError::transition(deposit.status, transition.to));
        }
        deposit.status = transition.to;
        if let Some(chain_id) = transition.chain_deposit_id {
            deposit.chain_deposit_id = Some(chain_id);
        }
        if let Some(tokens) = transition.tokens_minted {
            deposit.tokens_minted = Some(tokens);
        }
        if let Some(reason) = transition.rejection_reason {
            deposit.rejection_reason = Some(reason);
        }
        deposit.updated_at = Utc::now();
        Ok(deposit.clone())
    }

    async fn mint_deposit(&self, id: i64, transaction_hash: &str) -> Result<AssetDeposit> {
        let mut t = self.tables.write().await;
        let deposit = t.deposits.get(&id).cloned().ok_or(FixedAssetError::DepositNotFound { deposit_id: id })?;
        if !deposit.status.can_transition_to(DepositStatus::Minted) {
            return Err(FixedAssetError::transition(deposit.status, DepositStatus::Minted));
        }
        let tokens = match deposit.tokens_minted {
            Some(tokens) if tokens > Decimal::ZERO => tokens,
            _ => {
                return Err(FixedAssetError::InvalidInput(format!(
                    "Deposit {} has no approved token amount",
                    id
                )))
            }
        };

        let change = BalanceChange::new(deposit.patient_id, TokenType::At, tokens, TransactionType::Mint)
            .with_metadata(json!({ "deposit_id": id }))
            .with_hash(transaction_hash);
        t.apply_change(change)?;

        let row = t.deposits.get_mut(&id).ok_or(FixedAssetError::DepositNotFound { deposit_id: id })?;
        row.status = DepositStatus::Minted;
        row.transaction_hash = Some(transaction_hash.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn balance(&self, patient_id: i64) -> Result<TokenBalance> {
        let mut t = self.tables.write().await;
        t.require_patient(patient_id)?;
        Ok(t.balance_entry(patient_id).clone())
    }

    async fn apply_balance_change(&self, change: BalanceChange) -> Result<(TokenBalance, TokenTransaction)> {
        self.tables.write().await.apply_change(change)
    }

    async fn transfer_asset_tokens(
        &self,
        from_patient_id: i64,
        to_patient_id: i64,
        amount: Decimal,
    ) -> Result<(TokenTransaction, TokenTransaction)> {
        let mut t = self.tables.write().await;
        t.require_patient(from_patient_id)?;
        t.require_patient(to_patient_id)?;

        let available = t.balance_entry(from_patient_id).asset_token_balance;
        let debited = apply_delta(available, -amount).ok_or(FixedAssetError::InsufficientBalance {
            token_type: TokenType::At,
            available,
            required: amount,
        })?;
        let credited = apply_delta(t.balance_entry(to_patient_id).asset_token_balance, amount)
            .ok_or_else(|| FixedAssetError::InvalidInput("Transfer amount out of range".to_string()))?;
        ensure_amount_in_range("Balance", credited)?;

        let now = Utc::now();
        let sender = t.balance_entry(from_patient_id);
        sender.asset_token_balance = debited;
        sender.updated_at = now;
        let receiver = t.balance_entry(to_patient_id);
        receiver.asset_token_balance = credited;
        receiver.updated_at = now;

        let sent = t.push_transaction(
            from_patient_id,
            TokenType::At,
            TransactionType::Transfer,
            -amount,
            None,
            Some(json!({ "to_patient_id": to_patient_id })),
        );
        let received = t.push_transaction(
            to_patient_id,
            TokenType::At,
            TransactionType::Transfer,
            amount,
            None,
            Some(json!({ "from_patient_id": from_patient_id })),
        );
        Ok((sent, received))
    }

    async fn list_transactions(&self, patient_id: i64, token_type: Option<TokenType>) -> Result<Vec<TokenTransaction>> {
        let t = self.tables.read().await;
        let mut txs: Vec<TokenTransaction> = t
            .transactions
            .iter()
            .filter(|tx| tx.patient_id == patient_id)
            .filter(|tx| token_type.map_or(true, |tt| tx.token_type == tt))
            .cloned()
            .collect();
        newest_first(&mut txs, |tx| (tx.created_at, tx.id));
        Ok(txs)
    }

    async fn list_asset_tokens(&self, patient_id: Option<i64>) -> Result<Vec<AssetToken>> {
        let t = self.tables.read().await;
        let mut tokens: Vec<AssetToken> = t
            .asset_tokens
            .values()
            .filter(|a| patient_id.map_or(true, |id| a.patient_id == id))
            .cloned()
            .collect();
        newest_first(&mut tokens, |a| (a.created_at, a.id));
        Ok(tokens)
    }

    async fn find_asset_token(&self, id: i64) -> Result<Option<AssetToken>> {
        Ok(self.tables.read().await.asset_tokens.get(&id).cloned())
    }
}

#[async_trait]
impl BenefitStore for MemoryStore {
    async fn create_redemption(&self, redemption: NewRedemption) -> Result<BenefitRedemption> {
        let mut t = self.tables.write().await;
        t.require_patient(redemption.patient_id)?;
        if t.redemptions.contains_key(&redemption.redemption_id) {
            return Err(FixedAssetError::Conflict(format!(
                "Redemption {} already exists",
                redemption.redemption_id
            )));
        }
        let now = Utc::now();
        let row = BenefitRedemption {
            id: t.next_id(),
            redemption_id: redemption.redemption_id,
            patient_id: redemption.patient_id,
            hospital_id: None,
            service_type: redemption.service_type,
            ht_amount: redemption.ht_amount,
            status: RedemptionStatus::Pending,
            description: Some(redemption.description),
            transaction_hash: None,
            rejection_reason: None,
            approved_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        t.redemptions.insert(row.redemption_id.clone(), row.clone());
        Ok(row)
    }

    async fn find_redemption(&self, redemption_id: &str) -> Result<Option<BenefitRedemption>> {
        Ok(self.tables.read().await.redemptions.get(redemption_id).cloned())
    }

    async fn list_redemptions(&self, patient_id: i64) -> Result<Vec<BenefitRedemption>> {
        let t = self.tables.read().await;
        let mut rows: Vec<BenefitRedemption> = t
            .redemptions
            .values()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn approve_redemption(&self, redemption_id: &str, hospital_id: i64) -> Result<BenefitRedemption> {
        let mut t = self.tables.write().await;
        let current = t.redemption_mut(redemption_id)?.clone();
        if !current.status.can_transition_to(RedemptionStatus::Approved) {
            return Err(FixedAssetError::transition(current.status, RedemptionStatus::Approved));
        }
        t.require_hospital(hospital_id)?;

        let change = BalanceChange::new(current.patient_id, TokenType::Ht, -current.ht_amount, TransactionType::Redeem)
            .with_metadata(json!({
                "redemption_id": redemption_id,
                "service_type": current.service_type.as_str(),
                "hospital_id": hospital_id,
            }));
        t.apply_change(change)?;

        let now = Utc::now();
        let row = t.redemption_mut(redemption_id)?;
        row.status = RedemptionStatus::Approved;
        row.hospital_id = Some(hospital_id);
        row.approved_at = Some(now);
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn complete_redemption(&self, redemption_id: &str, transaction_hash: &str) -> Result<BenefitRedemption> {
        let mut t = self.tables.write().await;
        let row = t.redemption_mut(redemption_id)?;
        if !row.status.can_transition_to(RedemptionStatus::Completed) {
            return Err(FixedAssetError::transition(row.status, RedemptionStatus::Completed));
        }
        let now = Utc::now();
        row.status = RedemptionStatus::Completed;
        row.transaction_hash = Some(transaction_hash.to_string());
        row.completed_at = Some(now);
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn reject_redemption(&self, redemption_id: &str, reason: &str) -> Result<BenefitRedemption> {
        let mut t = self.tables.write().await;
        let row = t.redemption_mut(redemption_id)?;
        if !row.status.can_transition_to(RedemptionStatus::Rejected) {
            return Err(FixedAssetError::transition(row.status, RedemptionStatus::Rejected));
        }
        row.status = RedemptionStatus::Rejected;
        row.rejection_reason = Some(reason.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

#[async_trait]
impl MintingStore for MemoryStore {
    async fn create_verification(&self, verification: NewVerification) -> Result<AssetVerification> {
        let mut t = self.tables.write().await;
        let deposit_id = verification.deposit_id;
        let status = t
            .deposits
            .get(&deposit_id)
            .map(|d| d.status)
            .ok_or(FixedAssetError::DepositNotFound { deposit_id })?;
        if !status.can_transition_to(DepositStatus::Verified) {
            return Err(FixedAssetError::transition(status, DepositStatus::Verified));
        }

        let now = Utc::now();
        let row = AssetVerification {
            id: t.next_id(),
            deposit_id,
            verified_value: verification.verified_value,
            tokens_to_mint: verification.tokens_to_mint,
            verification_notes: verification.verification_notes,
            ipfs_hash: verification.ipfs_hash,
            verified_by: verification.verified_by,
            approved_by: None,
            status: VerificationStatus::Pending,
            rejection_reason: None,
            mint_tx_hash: None,
            created_at: now,
            updated_at: now,
        };
        t.verifications.insert(row.id, row.clone());
        if let Some(deposit) = t.deposits.get_mut(&deposit_id) {
            deposit.status = DepositStatus::Verified;
            deposit.updated_at = now;
        }
        Ok(row)
    }

    async fn find_verification(&self, id: i64) -> Result<Option<AssetVerification>> {
        Ok(self.tables.read().await.verifications.get(&id).cloned())
    }

    async fn list_minting_requests(&self, status: Option<VerificationStatus>) -> Result<Vec<MintingRequest>> {
        let t = self.tables.read().await;
        let mut rows: Vec<MintingRequest> = t
            .verifications
            .values()
            .filter(|v| status.map_or(true, |s| v.status == s))
            .filter_map(|v| {
                let deposit = t.deposits.get(&v.deposit_id)?;
                let patient = t.patient_by_id(deposit.patient_id)?;
                Some(MintingRequest {
                    verification_id: v.id,
                    deposit_id: deposit.id,
                    patient_id: patient.id,
                    patient_name: patient.name,
                    asset_type: deposit.asset_type,
                    asset_description: deposit.asset_description.clone(),
                    estimated_value: deposit.estimated_value,
                    verified_value: v.verified_value,
                    tokens_to_mint: v.tokens_to_mint,
                    status: v.status,
                    verified_by: v.verified_by,
                    created_at: v.created_at,
                })
            })
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.verification_id));
        Ok(rows)
    }

    async fn approve_minting(
        &self,
        verification_id: i64,
        approved_by: i64,
        transaction_hash: &str,
        token_symbol: &str,
    ) -> Result<AssetToken> {
        let mut t = self.tables.write().await;
        let verification = t
            .verifications
            .get(&verification_id)
            .cloned()
            .ok_or(FixedAssetError::VerificationNotFound { verification_id })?;
        if !verification.status.can_transition_to(VerificationStatus::Approved) {
            return Err(FixedAssetError::transition(verification.status, VerificationStatus::Approved));
        }
        let deposit = t
            .deposits
            .get(&verification.deposit_id)
            .cloned()
            .ok_or(FixedAssetError::DepositNotFound {
                deposit_id: verification.deposit_id,
            })?;
        if !deposit.status.can_transition_to(DepositStatus::Minted) {
            return Err(FixedAssetError::transition(deposit.status, DepositStatus::Minted));
        }

        let tokens = verification.tokens_to_mint;
        let change = BalanceChange::new(deposit.patient_id, TokenType::At, tokens, TransactionType::Mint)
            .with_metadata(json!({ "deposit_id": deposit.id, "verification_id": verification_id }))
            .with_hash(transaction_hash);
        t.apply_change(change)?;

        let now = Utc::now();
        if let Some(v) = t.verifications.get_mut(&verification_id) {
            v.status = VerificationStatus::Approved;
            v.approved_by = Some(approved_by);
            v.mint_tx_hash = Some(transaction_hash.to_string());
            v.updated_at = now;
        }
        if let Some(d) = t.deposits.get_mut(&deposit.id) {
            d.status = DepositStatus::Minted;
            d.tokens_minted = Some(tokens);
            d.transaction_hash = Some(transaction_hash.to_string());
            d.updated_at = now;
        }

        let token = AssetToken {
            id: t.next_id(),
            deposit_id: deposit.id,
            patient_id: deposit.patient_id,
            token_symbol: token_symbol.to_string(),
            token_amount: tokens,
            value_per_token: verification.verified_value.checked_div(tokens).unwrap_or(Decimal::ZERO),
            status: AssetTokenStatus::Active,
            mint_tx_hash: Some(transaction_hash.to_string()),
            created_at: now,
        };
        t.asset_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn reject_minting(&self, verification_id: i64, reason: &str) -> Result<AssetVerification> {
        let mut t = self.tables.write().await;
        let verification = t
            .verifications
            .get(&verification_id)
            .cloned()
            .ok_or(FixedAssetError::VerificationNotFound { verification_id })?;
        if !verification.status.can_transition_to(VerificationStatus::Rejected) {
            return Err(FixedAssetError::transition(verification.status, VerificationStatus::Rejected));
        }
        let deposit_status = t
            .deposits
            .get(&verification.deposit_id)
            .map(|d| d.status)
            .ok_or(FixedAssetError::DepositNotFound {
                deposit_id: verification.deposit_id,
            })?;
        if !deposit_status.can_transition_to(DepositStatus::Rejected) {
            return Err(FixedAssetError::transition(deposit_status, DepositStatus::Rejected));
        }

        let now = Utc::now();
        if let Some(d) = t.deposits.get_mut(&verification.deposit_id) {
            d.status = DepositStatus::Rejected;
            d.rejection_reason = Some(reason.to_string());
            d.updated_at = now;
        }
        let v = t
            .verifications
            .get_mut(&verification_id)
            .ok_or(FixedAssetError::VerificationNotFound { verification_id })?;
        v.status = VerificationStatus::Rejected;
        v.rejection_reason = Some(reason.to_string());
        v.updated_at = now;
        Ok(v.clone())
    }

    async fn find_bank_staff(&self, user_id: i64) -> Result<Option<BankStaff>> {
        let t = self.tables.read().await;
        Ok(t.bank_staff.values().find(|s| s.user_id == user_id).cloned())
    }

    async fn create_bank_staff(&self, user_id: i64, staff: NewBankStaff) -> Result<BankStaff> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&user_id) {
            return Err(FixedAssetError::UserNotFound { user_id });
        }
        if t
            .bank_staff
            .values()
            .any(|s| s.user_id == user_id || s.employee_id == staff.employee_id)
        {
            return Err(FixedAssetError::Conflict("Bank staff record already exists".to_string()));
        }
        let row = BankStaff {
            id: t.next_id(),
            user_id,
            employee_id: staff.employee_id,
            department: staff.department,
            position: staff.position,
            created_at: Utc::now(),
        };
        t.bank_staff.insert(row.id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl HospitalStore for MemoryStore {
    async fn create_hospital(&self, hospital: NewHospital) -> Result<Hospital> {
        let mut t = self.tables.write().await;
        if t
            .hospitals
            .values()
            .any(|h| h.registration_number == hospital.registration_number)
        {
            return Err(FixedAssetError::Conflict(format!(
                "Hospital {} already registered",
                hospital.registration_number
            )));
        }
        let row = Hospital {
            id: t.next_id(),
            name: hospital.name,
            registration_number: hospital.registration_number,
            address: hospital.address,
            phone: hospital.phone,
            email: hospital.email,
            created_at: Utc::now(),
        };
        t.hospitals.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_hospital(&self, id: i64) -> Result<Option<Hospital>> {
        Ok(self.tables.read().await.hospitals.get(&id).cloned())
    }

    async fn add_staff(&self, hospital_id: i64, user_id: i64, role: &str) -> Result<HospitalStaff> {
        let mut t = self.tables.write().await;
        t.require_hospital(hospital_id)?;
        if !t.users.contains_key(&user_id) {
            return Err(FixedAssetError::UserNotFound { user_id });
        }
        if t.hospital_staff.values().any(|s| s.user_id == user_id) {
            return Err(FixedAssetError::Conflict("User is already hospital staff".to_string()));
        }
        let row = HospitalStaff {
            id: t.next_id(),
            hospital_id,
            user_id,
            role: role.to_string(),
            created_at: Utc::now(),
        };
        t.hospital_staff.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_staff_by_user(&self, user_id: i64) -> Result<Option<HospitalStaff>> {
        let t = self.tables.read().await;
        Ok(t.hospital_staff.values().find(|s| s.user_id == user_id).cloned())
    }

    async fn hospital_patients(&self, hospital_id: i64) -> Result<Vec<Patient>> {
        let t = self.tables.read().await;
        let mut ids: Vec<i64> = t
            .asset_requests
            .values()
            .filter(|r| r.hospital_id == hospital_id)
            .map(|r| r.patient_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids.into_iter().filter_map(|id| t.patient_by_id(id)).collect())
    }

    async fn list_asset_requests(
        &self,
        hospital_id: i64,
        status: Option<AssetRequestStatus>,
    ) -> Result<Vec<AssetRequestDetail>> {
        let t = self.tables.read().await;
        let mut rows: Vec<AssetRequestDetail> = t
            .asset_requests
            .values()
            .filter(|r| r.hospital_id == hospital_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .filter_map(|r| {
                let deposit = t.deposits.get(&r.deposit_id)?;
                let patient = t.patient_by_id(r.patient_id)?;
                Some(AssetRequestDetail {
                    id: r.id,
                    hospital_id: r.hospital_id,
                    patient_id: r.patient_id,
                    patient_name: patient.name,
                    deposit_id: r.deposit_id,
                    asset_type: deposit.asset_type,
                    estimated_value: deposit.estimated_value,
                    deposit_status: deposit.status,
                    status: r.status,
                    notes: r.notes.clone(),
                    created_at: r.created_at,
                })
            })
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn transition_asset_request(
        &self,
        hospital_id: i64,
        request_id: i64,
        to: AssetRequestStatus,
        notes: Option<String>,
    ) -> Result<AssetRequest> {
        let mut t = self.tables.write().await;
        let row = t
            .asset_requests
            .get_mut(&request_id)
            .filter(|r| r.hospital_id == hospital_id)
            .ok_or_else(|| FixedAssetError::NotFound(format!("Asset request {}", request_id)))?;
        if !row.status.can_transition_to(to) {
            return Err(FixedAssetError::transition(row.status, to));
        }
        row.status = to;
        if notes.is_some() {
            row.notes = notes;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn create_trade(&self, hospital_id: i64, trade: NewTrade) -> Result<Trade> {
        let mut t = self.tables.write().await;
        t.require_hospital(hospital_id)?;
        if !t.asset_tokens.contains_key(&trade.asset_id) {
            return Err(FixedAssetError::NotFound(format!("Asset token {}", trade.asset_id)));
        }
        let total_value = checked_product("Total value", trade.quantity, trade.price_per_unit)?;
        let now = Utc::now();
        let row = Trade {
            id: t.next_id(),
            hospital_id,
            asset_id: trade.asset_id,
            quantity: trade.quantity,
            price_per_unit: trade.price_per_unit,
            total_value,
            status: TradeStatus::Active,
            created_at: now,
            updated_at: now,
        };
        t.trades.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_trades(&self, hospital_id: i64) -> Result<Vec<Trade>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Trade> = t.trades.values().filter(|tr| tr.hospital_id == hospital_id).cloned().collect();
        newest_first(&mut rows, |tr| (tr.created_at, tr.id));
        Ok(rows)
    }

    async fn transition_trade(&self, hospital_id: i64, trade_id: i64, to: TradeStatus) -> Result<Trade> {
        let mut t = self.tables.write().await;
        let row = t
            .trades
            .get_mut(&trade_id)
            .filter(|tr| tr.hospital_id == hospital_id)
            .ok_or_else(|| FixedAssetError::NotFound(format!("Trade {}", trade_id)))?;
        if !row.status.can_transition_to(to) {
            return Err(FixedAssetError::transition(row.status, to));
        }
        row.status = to;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn create_allocation(&self, hospital_id: i64, allocation: NewAllocation) -> Result<BenefitAllocation> {
        let mut t = self.tables.write().await;
        t.require_hospital(hospital_id)?;
        let row = BenefitAllocation {
            id: t.next_id(),
            hospital_id,
            total_amount: allocation.total_amount,
            distribution_date: allocation.distribution_date,
            status: AllocationStatus::Pending,
            created_at: Utc::now(),
        };
        t.allocations.insert(row.id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl InsuranceStore for MemoryStore {
    async fn list_policies(&self, status: Option<PolicyStatus>) -> Result<Vec<InsurancePolicy>> {
        let t = self.tables.read().await;
        let mut rows: Vec<InsurancePolicy> = t
            .policies
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(rows)
    }

    async fn find_policy(&self, id: i64) -> Result<Option<InsurancePolicy>> {
        Ok(self.tables.read().await.policies.get(&id).cloned())
    }

    async fn create_policy(&self, policy: NewPolicy) -> Result<InsurancePolicy> {
        let mut t = self.tables.write().await;
        t.require_hospital(policy.hospital_id)?;
        if t.policies.values().any(|p| p.policy_number == policy.policy_number) {
            return Err(FixedAssetError::Conflict(format!(
                "Policy number {} already exists",
                policy.policy_number
            )));
        }
        let row = InsurancePolicy {
            id: t.next_id(),
            hospital_id: policy.hospital_id,
            policy_number: policy.policy_number,
            coverage_amount: policy.coverage_amount,
            premium: policy.premium,
            status: PolicyStatus::Active,
            created_at: Utc::now(),
        };
        t.policies.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_claims(&self, status: Option<ClaimStatus>) -> Result<Vec<InsuranceClaim>> {
        let t = self.tables.read().await;
        let mut rows: Vec<InsuranceClaim> = t
            .claims
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        newest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn create_claim(&self, claim: NewClaim) -> Result<InsuranceClaim> {
        let mut t = self.tables.write().await;
        if !t.policies.contains_key(&claim.policy_id) {
            return Err(FixedAssetError::NotFound(format!("Insurance policy {}", claim.policy_id)));
        }
        t.require_patient(claim.patient_id)?;
        let row = InsuranceClaim {
            id: t.next_id(),
            policy_id: claim.policy_id,
            patient_id: claim.patient_id,
            claim_amount: claim.claim_amount,
            status: ClaimStatus::Pending,
            created_at: Utc::now(),
        };
        t.claims.insert(row.id, row.clone());
        Ok(row)
    }
}
