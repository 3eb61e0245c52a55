//! Clients for the external detection, search and notification services.
//!
//! Every client shares one `reqwest::Client`, so connection pooling and the
//! configured timeout apply to all outbound calls.

use crate::config::Config;
use crate::error::Error;
use anyhow::Result;
use reqwest::multipart::Part;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod camera_control;
pub mod event_search;
pub mod face;
pub mod media;
pub mod notification;

pub use camera_control::{CameraAction, CameraControlClient};
pub use event_search::{EventSearchClient, FrigateEvent, SemanticSearchParams, TextSearchRequest};
pub use face::{FaceClient, FaceSearchOptions, SearchPriority};
pub use media::MediaProxy;
pub use notification::NotificationClient;

/// Uploaded image forwarded to an upstream service
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn to_part(&self) -> Result<Part> {
        let part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        let part = match &self.content_type {
            Some(content_type) => part
                .mime_str(content_type)
                .map_err(|e| Error::Validation(format!("Invalid content type: {}", e)))?,
            None => part,
        };
        Ok(part)
    }
}

/// All upstream clients used by the API
#[derive(Clone)]
pub struct ExternalServices {
    pub camera_control: CameraControlClient,
    pub face: FaceClient,
    pub event_search: EventSearchClient,
    pub notification: NotificationClient,
    pub media: MediaProxy,
}

impl ExternalServices {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config.services.request_timeout_secs)?;
        let services = &config.services;

        Ok(Self {
            camera_control: CameraControlClient::new(client.clone(), &services.camera_control_url),
            face: FaceClient::new(client.clone(), &services.face_service_url),
            event_search: EventSearchClient::new(
                client.clone(),
                config.frigate_instances.clone(),
                &services.text_search_url,
            ),
            notification: NotificationClient::new(
                client.clone(),
                &services.notification_url,
                &services.telegram_chat_id,
            ),
            media: MediaProxy::new(
                client,
                build_streaming_client(config.services.request_timeout_secs)?,
            ),
        })
    }
}

/// Shared HTTP client; a zero timeout leaves requests unbounded
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let mut builder = Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    let client = builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
    Ok(client)
}

/// Client for long-lived streamed bodies.
///
/// A reqwest `timeout` also covers reading the body, so only the connect
/// phase is bounded here.
pub fn build_streaming_client(connect_timeout_secs: u64) -> Result<Client> {
    let mut builder = Client::builder();
    if connect_timeout_secs > 0 {
        builder = builder.connect_timeout(Duration::from_secs(connect_timeout_secs));
    }
    let client = builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to build streaming HTTP client: {}", e)))?;
    Ok(client)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Fail on a non-success status, keeping the upstream body for the logs
pub(crate) async fn ensure_success(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string());

    Err(Error::UpstreamStatus(status.as_u16(), format!("{}: {}", context, body)).into())
}

/// Check the status, then decode the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let response = ensure_success(response, context).await?;
    let body = response
        .json::<T>()
        .await
        .map_err(|e| Error::Upstream(format!("{}: invalid JSON body: {}", context, e)))?;
    Ok(body)
}
