use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Camera registered with the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Camera {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub is_connected: Option<bool>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub zones_of_interest: Option<Json<serde_json::Value>>,
    pub resolution: Option<Json<serde_json::Value>>,
    pub category: Option<String>,
}

/// Payload for registering a camera
#[derive(Debug, Clone, Deserialize)]
pub struct NewCamera {
    pub name: Option<String>,
    pub url: Option<String>,
}

impl NewCamera {
    /// Resolve the stored name and URL, `None` when no usable URL was given
    pub fn resolve(&self) -> Option<(String, String)> {
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(url);
        Some((name.to_string(), url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_falls_back_to_url() {
        let camera = NewCamera {
            name: Some("  ".into()),
            url: Some("rtsp://10.0.0.5/stream1".into()),
        };
        assert_eq!(
            camera.resolve(),
            Some(("rtsp://10.0.0.5/stream1".into(), "rtsp://10.0.0.5/stream1".into()))
        );
    }

    #[test]
    fn url_is_required() {
        let camera = NewCamera {
            name: Some("Gate 4".into()),
            url: None,
        };
        assert!(camera.resolve().is_none());
    }

    #[test]
    fn password_is_not_serialized() {
        let camera = Camera {
            id: 1,
            name: "Gate 1".into(),
            url: "rtsp://gate1".into(),
            username: Some("admin".into()),
            password: Some("secret".into()),
            is_connected: Some(true),
            status: None,
            created_at: None,
            updated_at: None,
            zones_of_interest: None,
            resolution: None,
            category: None,
        };
        let value = serde_json::to_value(&camera).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["username"], "admin");
    }
}
