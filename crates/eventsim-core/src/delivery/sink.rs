//! Delivery targets for event batches.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::error::{DeliveryError, Result};
use crate::event::EventBatch;

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:4000/webhook/events";
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the delivery loop pushes batches
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Human-readable target description for logs
    fn target(&self) -> &str;

    async fn deliver(&self, batch: &EventBatch) -> Result<()>;
}

/// HTTP POST of `{"events": [...]}` to a fixed URL.
///
/// Only the status code is inspected; anything other than 200 is a failure.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    fn target(&self) -> &str {
        &self.url
    }

    async fn deliver(&self, batch: &EventBatch) -> Result<()> {
        let body = serde_json::to_vec(batch)?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }

        debug!(url = %self.url, events = batch.len(), "Webhook accepted batch");
        Ok(())
    }
}
