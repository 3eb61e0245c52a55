use crate::{
    db::models::{user_models::CREDENTIAL_PROVIDER, Account, User},
    error::Error,
};
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Users repository for handling user and account operations
#[derive(Clone)]
pub struct UsersRepository {
    pool: Arc<PgPool>,
}

impl UsersRepository {
    /// Create a new users repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a user together with its credential account.
    ///
    /// Both rows are written in one transaction so a user never exists
    /// without a way to sign in.
    pub async fn create_with_credentials(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        info!("Creating new user: {}", email);

        let now = Utc::now();
        let user_id = Uuid::new_v4().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO "user" (id, name, email, email_verified, image, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, NULL, $4, $4)
            RETURNING id, name, email, email_verified, image, created_at, updated_at
            "#,
        )
        .bind(&user_id)
        .bind(name)
        .bind(email)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to create user: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO account (id, account_id, provider_id, user_id, password, created_at, updated_at)
            VALUES ($1, $2, $3, $2, $4, $5, $5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(CREDENTIAL_PROVIDER)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to create credential account: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit user: {}", e)))?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, email_verified, image, created_at, updated_at
            FROM "user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get user by ID: {}", e)))?;

        Ok(result)
    }

    /// Get user by email, compared case-insensitively
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, email_verified, image, created_at, updated_at
            FROM "user"
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get user by email: {}", e)))?;

        Ok(result)
    }

    /// Email and password account of a user, if any
    pub async fn get_credential_account(&self, user_id: &str) -> Result<Option<Account>> {
        let result = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, account_id, provider_id, user_id, password, created_at, updated_at
            FROM account
            WHERE user_id = $1 AND provider_id = $2
            "#,
        )
        .bind(user_id)
        .bind(CREDENTIAL_PROVIDER)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get credential account: {}", e)))?;

        Ok(result)
    }
}
