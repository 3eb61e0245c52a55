use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One search hit expanded out of an alert notification's `results` array
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct SearchAlertRow {
    pub id: String,
    pub query: Option<String>,
    pub res_id: Option<String>,
    pub camera_id: Option<String>,
    pub img_url: Option<String>,
    pub thumb_path: Option<String>,
    pub start_timestamp: Option<NaiveDateTime>,
    pub end_timestamp: Option<NaiveDateTime>,
    /// `data:image/png;base64,` URI built from the stored thumbnail
    pub thumbnail: Option<String>,
    pub is_notified: bool,
}

/// Loitering event shaped for the alerts view
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct LoiteringAlertRow {
    pub id: i32,
    pub camera_id: Option<String>,
    pub query: Option<String>,
    pub thumb_path: Option<String>,
    pub start_timestamp: Option<NaiveDateTime>,
    pub end_timestamp: Option<NaiveDateTime>,
    /// Seconds between start and end
    pub duration: Option<f64>,
    pub is_notified: bool,
}

/// Missing police personnel event shaped for the alerts view
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct PoliceAlertRow {
    pub id: i32,
    pub camera_id: Option<String>,
    pub query: String,
    pub start_timestamp: Option<NaiveDateTime>,
    pub end_timestamp: Option<NaiveDateTime>,
    pub duration: Option<f64>,
    pub thumb_path: Option<String>,
    pub clip_path: Option<String>,
    pub is_notified: bool,
}

/// Primary key of a notifiable alert row.
///
/// Search notifications use text ids while loitering and police rows use
/// serial integers, so the wire format accepts both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum AlertDbId {
    Int(i64),
    Text(String),
}

impl AlertDbId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AlertDbId::Int(v) => Some(*v),
            AlertDbId::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AlertDbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertDbId::Int(v) => write!(f, "{}", v),
            AlertDbId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for AlertDbId {
    fn from(v: i32) -> Self {
        AlertDbId::Int(v as i64)
    }
}

impl From<String> for AlertDbId {
    fn from(v: String) -> Self {
        AlertDbId::Text(v)
    }
}
