use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::error::AppError;

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send_push(&self, token: &str, title: &str, body: &str) -> Result<(), AppError>;
}

/// Sends pushes through an Expo-compatible HTTP endpoint.
pub struct ExpoPushTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl ExpoPushTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build push client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PushTransport for ExpoPushTransport {
    async fn send_push(&self, token: &str, title: &str, body: &str) -> Result<(), AppError> {
        let message = json!({
            "to": token,
            "sound": "default",
            "title": title,
            "body": body,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|err| AppError::Internal(format!("push request failed: {err}")))?
            .error_for_status()
            .map_err(|err| AppError::Internal(format!("push rejected: {err}")))?;

        let receipt: serde_json::Value = response
            .json()
            .await
            .map_err(|err| AppError::Internal(format!("push response unreadable: {err}")))?;
        debug!(receipt = %receipt, "push delivered");
        Ok(())
    }
}

/// Stands in for a real transport when pushes are disabled.
pub struct LogPushTransport;

#[async_trait]
impl PushTransport for LogPushTransport {
    async fn send_push(&self, token: &str, title: &str, _body: &str) -> Result<(), AppError> {
        info!(token = %token, title = %title, "push disabled; dropping message");
        Ok(())
    }
}
