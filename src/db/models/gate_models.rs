use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

/// Gate counter snapshot to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewGateMonitoring {
    pub camera_id: String,
    pub timestamp: NaiveDateTime,
    pub unique_count: i32,
    pub jersey_yellow: i32,
    pub jersey_blue: i32,
    pub jersey_others: i32,
}

impl NewGateMonitoring {
    /// Build a record from an exported JSON object.
    ///
    /// Both camelCase and snake_case keys are accepted. Returns `None` when
    /// the unique count is missing or any counter is not an integer.
    pub fn from_json(record: &Value) -> Option<Self> {
        let camera_id = match first_truthy(record, &["cameraId", "camera_id"])? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let timestamp = parse_timestamp(record.get("timestamp")?.as_str()?)?;

        let unique_count = parse_int(first_present(record, &["uniqueCount", "unique_count"])?)?;
        let jersey_yellow = counter(record, &["jerseyYellow", "jersey_yellow"])?;
        let jersey_blue = counter(record, &["jerseyBlue", "jersey_blue"])?;
        let jersey_others = counter(record, &["jerseyOthers", "jersey_others"])?;

        Some(Self {
            camera_id,
            timestamp,
            unique_count,
            jersey_yellow,
            jersey_blue,
            jersey_others,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn first_truthy<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| is_truthy(value))
}

fn first_present<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Optional counter: absent or falsy means zero
fn counter(record: &Value, keys: &[&str]) -> Option<i32> {
    match first_truthy(record, keys) {
        Some(value) => parse_int(value),
        None => Some(0),
    }
}

/// Integer parse that truncates decimals and ignores trailing garbage
fn parse_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => {
            let s = s.trim_start();
            let end = s
                .char_indices()
                .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// One minute of cumulative attendance summed across gate cameras
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePoint {
    pub minute: NaiveDateTime,
    pub total_unique_count: i64,
    pub total_jersey_yellow: i64,
    pub total_jersey_blue: i64,
    pub total_jersey_others: i64,
}

/// Per-camera maxima within a minute bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraData {
    pub camera_id: String,
    pub max_unique_count: i64,
    pub max_jersey_yellow: i64,
    pub max_jersey_blue: i64,
    pub max_jersey_others: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MinuteGroupedData {
    pub minute_bucket: NaiveDateTime,
    pub cameras: Json<Vec<CameraData>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_mixed_key_styles() {
        let record = json!({
            "camera_id": "gate-3",
            "timestamp": "2025-04-12 18:30:05",
            "uniqueCount": "120",
            "jersey_yellow": 40,
            "jerseyBlue": "12.7",
        });

        let parsed = NewGateMonitoring::from_json(&record).unwrap();
        assert_eq!(parsed.camera_id, "gate-3");
        assert_eq!(parsed.unique_count, 120);
        assert_eq!(parsed.jersey_yellow, 40);
        assert_eq!(parsed.jersey_blue, 12);
        assert_eq!(parsed.jersey_others, 0);
        assert_eq!(parsed.timestamp.to_string(), "2025-04-12 18:30:05");
    }

    #[test]
    fn numeric_camera_ids_are_stringified() {
        let record = json!({"cameraId": 7, "timestamp": "2025-04-12T18:30:05Z", "unique_count": 3});
        let parsed = NewGateMonitoring::from_json(&record).unwrap();
        assert_eq!(parsed.camera_id, "7");
    }

    #[test]
    fn rejects_unparseable_counters() {
        let missing_count = json!({"cameraId": "a", "timestamp": "2025-04-12T18:30:05"});
        assert!(NewGateMonitoring::from_json(&missing_count).is_none());

        let bad_jersey = json!({
            "cameraId": "a",
            "timestamp": "2025-04-12T18:30:05",
            "uniqueCount": 5,
            "jerseyOthers": "many",
        });
        assert!(NewGateMonitoring::from_json(&bad_jersey).is_none());
    }

    #[test]
    fn zero_unique_count_is_kept() {
        let record = json!({"cameraId": "a", "timestamp": "2025-04-12T18:30:05", "uniqueCount": 0});
        assert_eq!(NewGateMonitoring::from_json(&record).unwrap().unique_count, 0);
    }

    #[test]
    fn attendance_point_uses_camel_case() {
        let point = AttendancePoint {
            minute: NaiveDateTime::parse_from_str("2025-04-12 18:30:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            total_unique_count: 10,
            total_jersey_yellow: 4,
            total_jersey_blue: 3,
            total_jersey_others: 3,
        };
        let value = serde_json::to_value(point).unwrap();
        assert_eq!(value["totalUniqueCount"], 10);
        assert_eq!(value["minute"], "2025-04-12T18:30:00");
    }
}
