//! User and session repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::conflict_on_unique;
use super::patient::PATIENT_SELECT;
use crate::database::traits::UserStore;
use crate::models::patient::Patient;
use crate::models::user::{CreateUserRequest, Session, UpdateUserRequest, User};
use crate::utils::errors::{FixedAssetError, Result};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, wallet_address, status, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    /// Create a new user
    async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, wallet_address, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'ACTIVE', $6, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(request.email)
            .bind(request.name)
            .bind(request.password_hash)
            .bind(request.role)
            .bind(request.wallet_address)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique("Email already registered"))?;

        Ok(user)
    }

    async fn create_patient_user(&self, request: CreateUserRequest, registration_id: String) -> Result<(User, Patient)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO users (email, name, password_hash, role, wallet_address, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'ACTIVE', $6, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(request.email)
            .bind(request.name)
            .bind(request.password_hash)
            .bind(request.role)
            .bind(request.wallet_address)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(conflict_on_unique("Email already registered"))?;

        let (patient_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO patients (user_id, registration_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(&registration_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("Registration ID already in use"))?;

        let sql = format!("{PATIENT_SELECT} WHERE p.id = $1");
        let patient = sqlx::query_as::<_, Patient>(&sql)
            .bind(patient_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok((user, patient))
    }

    /// Find user by ID
    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update user
    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                wallet_address = COALESCE($4, wallet_address),
                status = COALESCE($5, status),
                updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(request.name)
            .bind(request.email)
            .bind(request.wallet_address)
            .bind(request.status)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(conflict_on_unique("Email already registered"))?;

        user.ok_or(FixedAssetError::UserNotFound { user_id: id })
    }

    async fn create_session(&self, session: Session) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, expires_at, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, expires_at, ip_address, user_agent, created_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.ip_address)
        .bind(session.user_agent)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, expires_at, ip_address, user_agent, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
