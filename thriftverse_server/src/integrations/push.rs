use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde_json::json;
use thriftverse_engine::notifications::{NotificationError, PushSender};

use crate::config::NotificationConfig;

/// A [`PushSender`] speaking the Expo push API, which is what the seller mobile app registers its tokens with.
#[derive(Clone)]
pub struct ExpoPushClient {
    config: NotificationConfig,
    client: Arc<Client>,
}

impl ExpoPushClient {
    pub fn new(config: NotificationConfig) -> Result<Self, NotificationError> {
        let client = Client::builder().build().map_err(|e| NotificationError(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }
}

impl PushSender for ExpoPushClient {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), NotificationError> {
        if !self.config.push_enabled() {
            debug!("📭️ Push integration is not configured; dropping push to {token}");
            return Err(NotificationError("push integration is not configured".to_string()));
        }
        let payload = json!({
            "to": token,
            "title": title,
            "body": body,
            "sound": "default",
        });
        let response = self
            .client
            .post(&self.config.push_api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError(e.to_string()))?;
        if response.status().is_success() {
            trace!("📭️ Push accepted for {token}");
            Ok(())
        } else {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            Err(NotificationError(format!("push API returned {status}: {message}")))
        }
    }
}
