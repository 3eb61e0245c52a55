use crate::{
    db::models::{AnalyticsSnapshot, Anomaly},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

/// Crowd analytics snapshots
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: Arc<PgPool>,
}

impl AnalyticsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Most recent snapshots, optionally for a single camera
    pub async fn recent(&self, camera_id: Option<i32>, limit: i64) -> Result<Vec<AnalyticsSnapshot>> {
        let result = sqlx::query_as::<_, AnalyticsSnapshot>(
            r#"
            SELECT id, camera_id, timestamp, crowd_count, density, additional_metrics
            FROM analytics
            WHERE ($1::INTEGER IS NULL OR camera_id = $1)
            ORDER BY timestamp DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(camera_id)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get analytics snapshots: {}", e)))?;

        Ok(result)
    }
}

/// Anomaly clips recorded by the detection pipeline
#[derive(Clone)]
pub struct AnomaliesRepository {
    pool: Arc<PgPool>,
}

impl AnomaliesRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Anomaly>> {
        let result = sqlx::query_as::<_, Anomaly>(
            r#"
            SELECT a.id, a.camera_id, c.name AS camera_name, a.start_frame, a.end_frame,
                   a.anomaly_count, a.created_at, a.file_path
            FROM anomaly a
            LEFT JOIN cameras c ON c.id = a.camera_id
            ORDER BY a.created_at DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get anomalies: {}", e)))?;

        Ok(result)
    }
}
