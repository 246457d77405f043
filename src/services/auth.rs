//! Authentication service implementation
//!
//! This service handles account registration, password login, signed session
//! tokens bound to revocable session rows, and role-based access checks.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::database::DatabaseService;
use crate::models::{
    AuthResponse, CreateUserRequest, LoginRequest, RegisterRequest, Session, UpdateUserRequest, User,
    UserRole, UserStatus,
};
use crate::utils::errors::{FixedAssetError, Result};
use crate::utils::helpers::{generate_registration_id, is_valid_email, is_valid_wallet_address, normalize_email};
use crate::utils::logging::log_auth_event;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read any patient's records
    ViewPatients,
    /// Approve or reject deposits
    ReviewDeposits,
    /// Approve, complete or reject benefit redemptions
    ProcessRedemptions,
    /// Set balances directly, delete patients
    ManageBalances,
    /// Verification, minting, ledger and insurance
    BankOperations,
    /// Create hospitals and assign staff
    ManageHospitals,
}

impl Permission {
    pub fn for_role(role: UserRole) -> HashSet<Permission> {
        let granted: &[Permission] = match role {
            UserRole::Patient => &[],
            UserRole::Hospital => &[
                Permission::ViewPatients,
                Permission::ReviewDeposits,
                Permission::ProcessRedemptions,
            ],
            UserRole::Bank => &[
                Permission::ViewPatients,
                Permission::ReviewDeposits,
                Permission::ManageBalances,
                Permission::BankOperations,
                Permission::ManageHospitals,
            ],
        };
        granted.iter().copied().collect()
    }
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: UserRole,
    pub session_id: Uuid,
    pub patient_id: Option<i64>,
    pub hospital_id: Option<i64>,
    pub permissions: HashSet<Permission>,
}

impl AuthContext {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Require specific permission or return error
    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(FixedAssetError::PermissionDenied(format!(
                "User {} lacks required permission: {:?}",
                self.user_id, permission
            )))
        }
    }

    pub fn require_role(&self, role: UserRole) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(FixedAssetError::PermissionDenied(format!("{} role required", role)))
        }
    }

    /// Owner, hospital staff and bank staff may read a patient's records
    pub fn can_access_patient(&self, patient_id: i64) -> bool {
        self.patient_id == Some(patient_id) || self.has(Permission::ViewPatients)
    }

    pub fn require_patient_access(&self, patient_id: i64) -> Result<()> {
        if self.can_access_patient(patient_id) {
            Ok(())
        } else {
            Err(FixedAssetError::PermissionDenied(format!(
                "User {} may not access patient {}",
                self.user_id, patient_id
            )))
        }
    }

    pub fn require_owner(&self, patient_id: i64) -> Result<()> {
        if self.patient_id == Some(patient_id) {
            Ok(())
        } else {
            Err(FixedAssetError::PermissionDenied(format!(
                "Only the owning patient may perform this action on patient {}",
                patient_id
            )))
        }
    }

    /// Hospital staff of `hospital_id`, or any bank user
    pub fn require_hospital_access(&self, hospital_id: i64) -> Result<()> {
        if self.hospital_id == Some(hospital_id) || self.role == UserRole::Bank {
            Ok(())
        } else {
            Err(FixedAssetError::PermissionDenied(format!(
                "User {} is not staff of hospital {}",
                self.user_id, hospital_id
            )))
        }
    }
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub sid: Uuid,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct AuthService {
    db: DatabaseService,
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(db: DatabaseService, config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            db,
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Create an account and, for patients, the patient profile
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(FixedAssetError::InvalidInput("Invalid email format".to_string()));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FixedAssetError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(FixedAssetError::InvalidInput("Name is required".to_string()));
        }
        if let Some(wallet) = &request.wallet_address {
            if !is_valid_wallet_address(wallet) {
                return Err(FixedAssetError::InvalidInput("Invalid wallet address".to_string()));
            }
        }
        if self.db.users.find_user_by_email(&email).await?.is_some() {
            return Err(FixedAssetError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(request.password).await?;
        let create = CreateUserRequest {
            email,
            name,
            password_hash,
            role: request.role,
            wallet_address: request.wallet_address,
        };
        let (user, patient_id) = if request.role == UserRole::Patient {
            let (user, patient) = self
                .db
                .users
                .create_patient_user(create, generate_registration_id())
                .await?;
            (user, Some(patient.id))
        } else {
            (self.db.users.create_user(create).await?, None)
        };

        info!(user_id = user.id, role = %user.role, patient_id = ?patient_id, "User registered");
        log_auth_event(Some(user.id), "register", true);

        self.issue(user, patient_id, None, None, "Registration successful").await
    }

    pub async fn login(
        &self,
        request: LoginRequest,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Result<AuthResponse> {
        let email = normalize_email(&request.email);
        let user = match self.db.users.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                log_auth_event(None, "login", false);
                return Err(invalid_credentials());
            }
        };

        if !self.verify_password(request.password, user.password_hash.clone()).await? {
            log_auth_event(Some(user.id), "login", false);
            return Err(invalid_credentials());
        }

        if user.status != UserStatus::Active {
            warn!(user_id = user.id, status = %user.status, "Login refused for inactive account");
            return Err(FixedAssetError::PermissionDenied(format!("Account is {}", user.status)));
        }

        let patient_id = self.db.patients.find_patient_by_user(user.id).await?.map(|p| p.id);
        log_auth_event(Some(user.id), "login", true);
        self.issue(user, patient_id, user_agent, ip_address, "Login successful").await
    }

    /// Resolve a bearer token into the caller's context
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let claims = self.decode_token(token)?;

        let session = self
            .db
            .users
            .find_session(claims.sid)
            .await?
            .ok_or_else(|| FixedAssetError::Authentication("Session has been revoked".to_string()))?;
        if session.is_expired(Utc::now()) {
            return Err(FixedAssetError::Authentication("Session expired".to_string()));
        }
        if session.user_id.to_string() != claims.sub {
            return Err(FixedAssetError::Authentication("Session does not match token".to_string()));
        }

        let user = self
            .db
            .users
            .find_user(session.user_id)
            .await?
            .ok_or_else(|| FixedAssetError::Authentication("Account no longer exists".to_string()))?;
        if user.status != UserStatus::Active {
            return Err(FixedAssetError::PermissionDenied(format!("Account is {}", user.status)));
        }

        let patient_id = match user.role {
            UserRole::Patient => self.db.patients.find_patient_by_user(user.id).await?.map(|p| p.id),
            _ => None,
        };
        let hospital_id = match user.role {
            UserRole::Hospital => self.db.hospitals.find_staff_by_user(user.id).await?.map(|s| s.hospital_id),
            _ => None,
        };

        debug!(user_id = user.id, role = %user.role, session_id = %session.id, "Request authenticated");
        Ok(AuthContext {
            user_id: user.id,
            role: user.role,
            session_id: session.id,
            patient_id,
            hospital_id,
            permissions: Permission::for_role(user.role),
        })
    }

    pub async fn validate_token(&self, token: &str) -> bool {
        self.authenticate(token).await.is_ok()
    }

    /// Revoke every session of the user
    pub async fn logout(&self, user_id: i64) -> Result<u64> {
        let removed = self.db.users.delete_sessions_for_user(user_id).await?;
        info!(user_id = user_id, sessions = removed, "User logged out");
        log_auth_event(Some(user_id), "logout", true);
        Ok(removed)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.db
            .users
            .find_user(user_id)
            .await?
            .ok_or(FixedAssetError::UserNotFound { user_id })
    }

    /// Update name, email or wallet; status changes are not self-service
    pub async fn update_profile(&self, user_id: i64, request: UpdateUserRequest) -> Result<User> {
        let email = match &request.email {
            Some(email) => {
                let email = normalize_email(email);
                if !is_valid_email(&email) {
                    return Err(FixedAssetError::InvalidInput("Invalid email format".to_string()));
                }
                Some(email)
            }
            None => None,
        };
        if let Some(wallet) = &request.wallet_address {
            if !is_valid_wallet_address(wallet) {
                return Err(FixedAssetError::InvalidInput("Invalid wallet address".to_string()));
            }
        }
        let name = request.name.map(|n| n.trim().to_string());
        if name.as_deref() == Some("") {
            return Err(FixedAssetError::InvalidInput("Name cannot be empty".to_string()));
        }

        let user = self
            .db
            .users
            .update_user(
                user_id,
                UpdateUserRequest {
                    name,
                    email,
                    wallet_address: request.wallet_address,
                    status: None,
                },
            )
            .await?;
        info!(user_id = user_id, "User profile updated");
        Ok(user)
    }

    async fn issue(
        &self,
        user: User,
        patient_id: Option<i64>,
        user_agent: Option<String>,
        ip_address: Option<String>,
        message: &str,
    ) -> Result<AuthResponse> {
        let now = Utc::now();
        let session = self
            .db
            .users
            .create_session(Session {
                id: Uuid::new_v4(),
                user_id: user.id,
                expires_at: now + Duration::hours(self.config.session_ttl_hours),
                ip_address,
                user_agent,
                created_at: now,
            })
            .await?;

        let claims = Claims {
            sub: user.id.to_string(),
            sid: session.id,
            role: user.role,
            exp: session.expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;

        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_at: session.expires_at,
            user,
            patient_id,
            message: message.to_string(),
        })
    }

    /// Subject of a correctly signed, unexpired token. No session lookup.
    pub fn token_subject(&self, token: &str) -> Option<String> {
        self.decode_token(token).ok().map(|claims| claims.sub)
    }

    fn decode_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let cost = self.config.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| FixedAssetError::ServiceUnavailable(format!("Password hashing task failed: {}", e)))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| FixedAssetError::ServiceUnavailable(format!("Password check task failed: {}", e)))??;
        Ok(matches)
    }
}

fn invalid_credentials() -> FixedAssetError {
    FixedAssetError::Authentication("Invalid email or password".to_string())
}
