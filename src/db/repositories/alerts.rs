use crate::{
    db::models::{LoiteringAlertRow, PoliceAlertRow, SearchAlertRow},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Tables whose rows carry an `is_notified` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifiableTable {
    AlertNotifications,
    Loitering,
    PoliceMonitoring,
}

impl NotifiableTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            NotifiableTable::AlertNotifications => "alert_notifications",
            NotifiableTable::Loitering => "loitering",
            NotifiableTable::PoliceMonitoring => "police_monitoring",
        }
    }
}

impl fmt::Display for NotifiableTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Alert rows from the detection services, plus notification bookkeeping
#[derive(Clone)]
pub struct AlertsRepository {
    pool: Arc<PgPool>,
}

impl AlertsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Expand every stored search notification into one row per hit,
    /// newest end timestamp first.
    pub async fn search_alert_rows(&self) -> Result<Vec<SearchAlertRow>> {
        let result = sqlx::query_as::<_, SearchAlertRow>(
            r#"
            SELECT
                id, query, res_id, camera_id, img_url, thumb_path,
                start_timestamp, end_timestamp,
                'data:image/png;base64,' || thumbnail AS thumbnail,
                is_notified
            FROM (
                SELECT DISTINCT
                    an.id AS id,
                    an.query AS query,
                    result_elem ->> 'id' AS res_id,
                    result_elem ->> 'camera' AS camera_id,
                    result_elem ->> 'img_url' AS img_url,
                    result_elem ->> 'thumb_path' AS thumb_path,
                    TO_TIMESTAMP((result_elem ->> 'start_time')::DOUBLE PRECISION)
                        AT TIME ZONE 'UTC' AS start_timestamp,
                    TO_TIMESTAMP((result_elem ->> 'end_time')::DOUBLE PRECISION)
                        AT TIME ZONE 'UTC' AS end_timestamp,
                    result_elem ->> 'thumbnail' AS thumbnail,
                    an.is_notified AS is_notified
                FROM alert_notifications an,
                LATERAL jsonb_array_elements(
                    CASE WHEN jsonb_typeof(an.results -> 'results') = 'array'
                         THEN an.results -> 'results'
                         ELSE '[]'::jsonb
                    END
                ) AS result_elem
            ) AS sub
            ORDER BY end_timestamp DESC NULLS LAST
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query search alerts: {}", e)))?;

        Ok(result)
    }

    /// Loitering events; `endpoint` prefixes the snapshot path
    pub async fn loitering_rows(&self, endpoint: &str) -> Result<Vec<LoiteringAlertRow>> {
        let result = sqlx::query_as::<_, LoiteringAlertRow>(
            r#"
            SELECT
                id, camera_id, query, thumb_path, start_timestamp, end_timestamp,
                EXTRACT(EPOCH FROM (end_timestamp - start_timestamp))::DOUBLE PRECISION AS duration,
                is_notified
            FROM (
                SELECT
                    id,
                    camera_id,
                    object_class || ' found loitering' AS query,
                    $1 || '/snapshot/' || snapshot_path AS thumb_path,
                    loitering_start_time AT TIME ZONE 'UTC' AS start_timestamp,
                    created_at AT TIME ZONE 'UTC' AS end_timestamp,
                    is_notified
                FROM loitering
            ) AS sub
            ORDER BY start_timestamp DESC NULLS LAST
            "#,
        )
        .bind(endpoint)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query loitering alerts: {}", e)))?;

        Ok(result)
    }

    /// Missing police personnel events; `endpoint` prefixes snapshot and clip
    pub async fn police_rows(&self, endpoint: &str) -> Result<Vec<PoliceAlertRow>> {
        let result = sqlx::query_as::<_, PoliceAlertRow>(
            r#"
            SELECT
                id,
                camera_id,
                'Missing Police Personnel' AS query,
                from_timestamp AT TIME ZONE 'UTC' AS start_timestamp,
                to_timestamp AT TIME ZONE 'UTC' AS end_timestamp,
                missing_duration AS duration,
                $1 || '/snapshot/' || snapshot_path AS thumb_path,
                $1 || '/clip/' || clip_path AS clip_path,
                is_notified
            FROM police_monitoring
            ORDER BY start_timestamp DESC NULLS LAST
            "#,
        )
        .bind(endpoint)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query police alerts: {}", e)))?;

        Ok(result)
    }

    /// Number of distinct alerts that produced at least one notification
    pub async fn distinct_notified_alert_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT alert_id) FROM alert_notifications",
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count alert notifications: {}", e)))?;

        Ok(count)
    }

    /// Flag notification rows with text ids as delivered
    pub async fn mark_search_notified(&self, ids: &[String]) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE alert_notifications SET is_notified = TRUE WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update alert_notifications: {}", e)))?;

        info!("Marked {} alert_notifications rows as notified", result.rows_affected());

        Ok(result.rows_affected())
    }

    /// Flag loitering or police monitoring rows as delivered
    pub async fn mark_event_notified(&self, table: NotifiableTable, ids: &[i64]) -> Result<u64> {
        let sql = match table {
            NotifiableTable::Loitering => {
                "UPDATE loitering SET is_notified = TRUE WHERE id = ANY($1::BIGINT[])"
            }
            NotifiableTable::PoliceMonitoring => {
                "UPDATE police_monitoring SET is_notified = TRUE WHERE id = ANY($1::BIGINT[])"
            }
            NotifiableTable::AlertNotifications => {
                return Err(Error::Validation(
                    "alert_notifications ids are text, use mark_search_notified".to_string(),
                )
                .into())
            }
        };

        let result = sqlx::query(sql)
            .bind(ids)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update {}: {}", table, e)))?;

        info!("Marked {} {} rows as notified", result.rows_affected(), table);

        Ok(result.rows_affected())
    }
}
