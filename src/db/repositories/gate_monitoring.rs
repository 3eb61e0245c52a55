use crate::{
    db::models::{AttendancePoint, MinuteGroupedData, NewGateMonitoring},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Minute buckets spanning the recorded data, and per camera the highest
/// counters seen at or before each bucket.
const CAMERA_MAX_PER_MINUTE: &str = r#"
    WITH minute_buckets AS (
        SELECT
            date_trunc('minute', min(timestamp)) +
            (INTERVAL '1 minute' * generate_series(0,
                (EXTRACT(EPOCH FROM (date_trunc('minute', max(timestamp)) -
                                    date_trunc('minute', min(timestamp)))) / 60)::INTEGER
            )) AS minute_bucket
        FROM gate_monitoring
    ),
    all_cameras AS (
        SELECT DISTINCT camera_id
        FROM gate_monitoring
        WHERE camera_id IS NOT NULL
    ),
    camera_max_per_minute AS (
        SELECT
            mb.minute_bucket,
            ac.camera_id,
            COALESCE(MAX(gm.unique_count), 0)::BIGINT AS max_unique_count,
            COALESCE(MAX(gm.jersey_yellow), 0)::BIGINT AS max_jersey_yellow,
            COALESCE(MAX(gm.jersey_blue), 0)::BIGINT AS max_jersey_blue,
            COALESCE(MAX(gm.jersey_others), 0)::BIGINT AS max_jersey_others
        FROM minute_buckets mb
        CROSS JOIN all_cameras ac
        LEFT JOIN gate_monitoring gm ON
            gm.camera_id = ac.camera_id AND
            gm.timestamp <= mb.minute_bucket
        GROUP BY mb.minute_bucket, ac.camera_id
    )
"#;

/// Gate monitoring repository backing the attendance views
#[derive(Clone)]
pub struct GateMonitoringRepository {
    pool: Arc<PgPool>,
}

impl GateMonitoringRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Cumulative attendance per minute across all gate cameras.
    ///
    /// Every counter is a running maximum, so the series never decreases
    /// even when a camera reports a lower figure later on.
    pub async fn attendance_series(&self) -> Result<Vec<AttendancePoint>> {
        let sql = format!(
            r#"{}
            , minute_totals AS (
                SELECT
                    minute_bucket,
                    SUM(max_unique_count)::BIGINT AS total_unique_count,
                    SUM(max_jersey_yellow)::BIGINT AS total_jersey_yellow,
                    SUM(max_jersey_blue)::BIGINT AS total_jersey_blue,
                    SUM(max_jersey_others)::BIGINT AS total_jersey_others
                FROM camera_max_per_minute
                GROUP BY minute_bucket
            )
            SELECT
                minute_bucket AS minute,
                MAX(total_unique_count) OVER (ORDER BY minute_bucket) AS total_unique_count,
                MAX(total_jersey_yellow) OVER (ORDER BY minute_bucket) AS total_jersey_yellow,
                MAX(total_jersey_blue) OVER (ORDER BY minute_bucket) AS total_jersey_blue,
                MAX(total_jersey_others) OVER (ORDER BY minute_bucket) AS total_jersey_others
            FROM minute_totals
            WHERE minute_bucket IS NOT NULL
            ORDER BY minute_bucket
            "#,
            CAMERA_MAX_PER_MINUTE
        );

        let result = sqlx::query_as::<_, AttendancePoint>(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to query attendance series: {}", e)))?;

        Ok(result)
    }

    /// Latest minute bucket with the per-camera breakdown
    pub async fn latest_camera_breakdown(&self) -> Result<Vec<MinuteGroupedData>> {
        let sql = format!(
            r#"{}
            SELECT
                minute_bucket,
                jsonb_agg(
                    jsonb_build_object(
                        'camera_id', camera_id,
                        'max_unique_count', max_unique_count,
                        'max_jersey_yellow', max_jersey_yellow,
                        'max_jersey_blue', max_jersey_blue,
                        'max_jersey_others', max_jersey_others
                    )
                    ORDER BY camera_id
                ) AS cameras
            FROM camera_max_per_minute
            WHERE minute_bucket IS NOT NULL
            GROUP BY minute_bucket
            ORDER BY minute_bucket DESC
            LIMIT 1
            "#,
            CAMERA_MAX_PER_MINUTE
        );

        let result = sqlx::query_as::<_, MinuteGroupedData>(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| {
                Error::Database(format!("Failed to query camera breakdown by minute: {}", e))
            })?;

        Ok(result)
    }

    /// Insert snapshots in one transaction, skipping duplicates.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_many(&self, records: &[NewGateMonitoring]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO gate_monitoring (
                    camera_id, timestamp, unique_count, jersey_yellow, jersey_blue, jersey_others
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&record.camera_id)
            .bind(record.timestamp)
            .bind(record.unique_count)
            .bind(record.jersey_yellow)
            .bind(record.jersey_blue)
            .bind(record.jersey_others)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to insert gate snapshot: {}", e)))?;

            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("Failed to commit gate snapshots: {}", e)))?;

        info!("Inserted {} of {} gate snapshots", inserted, records.len());

        Ok(inserted)
    }
}
