use super::{ensure_success, join_url, read_json};
use crate::error::Error;
use anyhow::Result;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

const DEFAULT_ALERT_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAction {
    Start,
    Stop,
}

impl CameraAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraAction::Start => "start",
            CameraAction::Stop => "stop",
        }
    }
}

impl fmt::Display for CameraAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(CameraAction::Start),
            "stop" => Ok(CameraAction::Stop),
            _ => Err(Error::Validation(
                "Invalid action. Must be \"start\" or \"stop\"".to_string(),
            )),
        }
    }
}

/// Client for the camera control and alert backend
#[derive(Clone)]
pub struct CameraControlClient {
    client: Client,
    base_url: String,
}

impl CameraControlClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    pub async fn camera_action(&self, camera_id: &str, action: CameraAction) -> Result<Value> {
        info!("Requesting {} for camera {}", action, camera_id);

        let url = join_url(&self.base_url, &format!("cameras/{}/{}", camera_id, action));
        let response = self.client.post(url).send().await.map_err(Error::from)?;

        read_json(response, &format!("Failed to {} camera", action)).await
    }

    pub async fn camera_status(&self, camera_id: &str) -> Result<Value> {
        let url = join_url(&self.base_url, &format!("cameras/{}/status", camera_id));
        let response = self.client.get(url).send().await.map_err(Error::from)?;

        read_json(response, "Failed to fetch camera status").await
    }

    pub async fn list_alerts(&self) -> Result<Value> {
        let url = join_url(&self.base_url, "alerts");
        let response = self.client.get(url).send().await.map_err(Error::from)?;

        read_json(response, "Failed to fetch alerts").await
    }

    /// Create a search alert.
    ///
    /// `query` is required; `interval_seconds` defaults to one minute when
    /// absent or zero. Other fields are passed through untouched.
    pub async fn create_alert(&self, alert: Value) -> Result<Value> {
        let alert = prepare_alert(alert)?;
        debug!("Creating alert: {}", alert);

        let url = join_url(&self.base_url, "alerts");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&alert)
            .send()
            .await
            .map_err(Error::from)?;

        read_json(response, "Failed to create alert").await
    }

    pub async fn delete_alert(&self, alert_id: &str) -> Result<()> {
        info!("Deleting alert {}", alert_id);

        let url = join_url(&self.base_url, &format!("alerts/{}", alert_id));
        let response = self.client.delete(url).send().await.map_err(Error::from)?;
        ensure_success(response, "Failed to delete alert").await?;

        Ok(())
    }

    pub async fn stop_alert(&self, alert_id: &str) -> Result<()> {
        info!("Stopping alert {}", alert_id);

        let url = join_url(&self.base_url, &format!("alerts/{}/stop", alert_id));
        let response = self.client.post(url).send().await.map_err(Error::from)?;
        ensure_success(response, "Failed to stop alert").await?;

        Ok(())
    }

    pub async fn alert_notifications(&self) -> Result<Value> {
        let url = join_url(&self.base_url, "alerts-notifications");
        let response = self.client.get(url).send().await.map_err(Error::from)?;

        read_json(response, "Failed to fetch alert notifications").await
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

fn prepare_alert(mut alert: Value) -> Result<Value> {
    let fields = alert
        .as_object_mut()
        .ok_or_else(|| Error::Validation("Alert body must be a JSON object".to_string()))?;

    if is_blank(fields.get("query")) {
        return Err(Error::Validation("Query is required".to_string()).into());
    }

    if is_blank(fields.get("interval_seconds")) {
        fields.insert(
            "interval_seconds".to_string(),
            json!(DEFAULT_ALERT_INTERVAL_SECONDS),
        );
    }

    Ok(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_camera_action() {
        assert_eq!("start".parse::<CameraAction>().unwrap(), CameraAction::Start);
        assert_eq!("stop".parse::<CameraAction>().unwrap(), CameraAction::Stop);
        assert!("restart".parse::<CameraAction>().is_err());
    }

    #[test]
    fn test_prepare_alert_defaults_interval() {
        let alert = prepare_alert(json!({"query": "dogs", "cameras": ["gate_1"]})).unwrap();
        assert_eq!(alert["interval_seconds"], 60);
        assert_eq!(alert["cameras"], json!(["gate_1"]));

        let alert = prepare_alert(json!({"query": "dogs", "interval_seconds": 15})).unwrap();
        assert_eq!(alert["interval_seconds"], 15);
    }

    #[test]
    fn test_prepare_alert_requires_query() {
        assert!(prepare_alert(json!({"interval_seconds": 15})).is_err());
        assert!(prepare_alert(json!({"query": ""})).is_err());
        assert!(prepare_alert(json!("dogs")).is_err());
    }

    #[tokio::test]
    async fn test_camera_action_forwards_to_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cameras/7/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = CameraControlClient::new(Client::new(), &server.uri());
        let body = client.camera_action("7", CameraAction::Start).await.unwrap();

        assert_eq!(body["status"], "started");
    }

    #[tokio::test]
    async fn test_create_alert_sends_default_interval() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts"))
            .and(body_json(json!({"query": "dogs", "interval_seconds": 60})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = CameraControlClient::new(Client::new(), &server.uri());
        let created = client.create_alert(json!({"query": "dogs"})).await.unwrap();

        assert_eq!(created["id"], "a1");
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cameras/3/status"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such camera"))
            .mount(&server)
            .await;

        let client = CameraControlClient::new(Client::new(), &server.uri());
        let err = client.camera_status("3").await.unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::UpstreamStatus(status, _)) => assert_eq!(*status, 404),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_and_delete_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts/a1/stop"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/alerts/a1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = CameraControlClient::new(Client::new(), &server.uri());
        client.stop_alert("a1").await.unwrap();
        client.delete_alert("a1").await.unwrap();
    }
}
