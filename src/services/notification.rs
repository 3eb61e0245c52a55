use super::read_json;
use crate::error::Error;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

const SNAPSHOT_FILE_NAME: &str = "alerts-snapshot.png";

/// Relays dashboard snapshots to the notification service (Telegram bot)
#[derive(Clone)]
pub struct NotificationClient {
    client: Client,
    url: String,
    chat_id: String,
}

impl NotificationClient {
    pub fn new(client: Client, url: &str, chat_id: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Send a `data:` URL image; returns the service's JSON reply
    pub async fn send_alert_image(&self, image: &str) -> Result<Value> {
        let bytes = decode_data_url(image)?;
        info!("Sending {} byte alert snapshot", bytes.len());

        let part = Part::bytes(bytes)
            .file_name(SNAPSHOT_FILE_NAME)
            .mime_str("image/png")
            .map_err(Error::from)?;
        let form = Form::new()
            .part("image", part)
            .text("chat_id", self.chat_id.clone());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(Error::from)?;

        read_json(response, "Notification service rejected the image").await
    }
}

/// Decode the base64 payload after the first comma of a data URL
pub fn decode_data_url(image: &str) -> Result<Vec<u8>> {
    if image.is_empty() {
        return Err(Error::Validation("No image data provided".to_string()).into());
    }

    let payload = image
        .split_once(',')
        .map(|(_, data)| data)
        .ok_or_else(|| Error::Validation("Image must be a data URL".to_string()))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Validation(format!("Invalid base64 image data: {}", e)))?;

    Ok(bytes)
}
