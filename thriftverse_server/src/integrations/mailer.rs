use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::json;
use thriftverse_engine::notifications::{EmailSender, NotificationError};

use crate::config::NotificationConfig;

/// An [`EmailSender`] backed by a transactional mail HTTP API (Resend-style JSON POST with a bearer key).
#[derive(Clone)]
pub struct HttpMailer {
    config: NotificationConfig,
    client: Arc<Client>,
}

impl HttpMailer {
    pub fn new(config: NotificationConfig) -> Result<Self, NotificationError> {
        let mut headers = HeaderMap::with_capacity(2);
        if !config.mail_api_key.is_blank() {
            let val = HeaderValue::from_str(&format!("Bearer {}", config.mail_api_key.reveal()))
                .map_err(|e| NotificationError(e.to_string()))?;
            headers.insert("Authorization", val);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| NotificationError(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }
}

impl EmailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if !self.config.mail_enabled() {
            debug!("📭️ Mail integration is not configured; dropping email to {to}");
            return Err(NotificationError("mail integration is not configured".to_string()));
        }
        let payload = json!({
            "from": self.config.mail_from,
            "to": [to],
            "subject": subject,
            "text": body,
        });
        let response = self
            .client
            .post(&self.config.mail_api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError(e.to_string()))?;
        if response.status().is_success() {
            trace!("📭️ Mail accepted for {to}");
            Ok(())
        } else {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            Err(NotificationError(format!("mail API returned {status}: {message}")))
        }
    }
}
