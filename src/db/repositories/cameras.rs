use crate::{db::models::Camera, error::Error};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Cameras repository for handling camera operations
#[derive(Clone)]
pub struct CamerasRepository {
    pool: Arc<PgPool>,
}

impl CamerasRepository {
    /// Create a new cameras repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Register a camera by name and stream URL
    pub async fn create(&self, name: &str, url: &str) -> Result<Camera> {
        info!("Creating new camera: {} ({})", name, url);

        let result = sqlx::query_as::<_, Camera>(
            r#"
            INSERT INTO cameras (name, url)
            VALUES ($1, $2)
            RETURNING id, name, url, username, password, is_connected, status,
                      created_at, updated_at, zones_of_interest, resolution, category
            "#,
        )
        .bind(name)
        .bind(url)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create camera: {}", e)))?;

        Ok(result)
    }

    /// Get all cameras
    pub async fn get_all(&self) -> Result<Vec<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT id, name, url, username, password, is_connected, status,
                   created_at, updated_at, zones_of_interest, resolution, category
            FROM cameras
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get all cameras: {}", e)))?;

        Ok(result)
    }

    /// Number of cameras currently reporting a live connection
    pub async fn count_connected(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT id)
            FROM cameras
            WHERE is_connected = TRUE
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count connected cameras: {}", e)))?;

        Ok(count)
    }
}
