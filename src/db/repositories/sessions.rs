use crate::{db::models::Session, error::Error};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Login sessions
#[derive(Clone)]
pub struct SessionsRepository {
    pool: Arc<PgPool>,
}

impl SessionsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Session> {
        let now = Utc::now();

        let result = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO session (id, expires_at, token, created_at, updated_at, ip_address, user_agent, user_id)
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7)
            RETURNING id, expires_at, token, created_at, updated_at, ip_address, user_agent, user_id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(expires_at)
        .bind(token)
        .bind(now)
        .bind(ip_address)
        .bind(user_agent)
        .bind(user_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create session: {}", e)))?;

        Ok(result)
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let result = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, expires_at, token, created_at, updated_at, ip_address, user_agent, user_id
            FROM session
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get session: {}", e)))?;

        Ok(result)
    }

    /// Returns true when a session was removed
    pub async fn delete_by_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session WHERE token = $1")
            .bind(token)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete session: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at <= NOW()")
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to purge sessions: {}", e)))?;

        if result.rows_affected() > 0 {
            info!("Purged {} expired sessions", result.rows_affected());
        }

        Ok(result.rows_affected())
    }
}
