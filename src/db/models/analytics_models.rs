use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Crowd analytics snapshot produced by the detection pipeline
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalyticsSnapshot {
    pub id: i32,
    pub camera_id: Option<i32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub crowd_count: i32,
    pub density: f64,
    pub additional_metrics: Option<Json<serde_json::Value>>,
}

/// Anomaly clip with the name of the camera that recorded it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Anomaly {
    pub id: i32,
    pub camera_id: i32,
    pub camera_name: Option<String>,
    pub start_frame: i32,
    pub end_frame: i32,
    pub anomaly_count: i32,
    pub created_at: Option<NaiveDateTime>,
    pub file_path: Option<String>,
}
