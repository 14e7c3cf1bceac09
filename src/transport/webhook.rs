//! HTTP webhook transport
//!
//! Each event is `POST`ed as JSON to the configured URL. The subject travels in
//! the `X-EVENT-SUBJECT` header, an optional shared secret in `X-EVENT-TOKEN`.
//! Any non-2xx response counts as a failed publish.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::WebhookConfig;

use super::backend::{Transport, TransportHealth};
use super::error::{TransportError, TransportResult};

pub const SUBJECT_HEADER: &str = "X-EVENT-SUBJECT";
pub const TOKEN_HEADER: &str = "X-EVENT-TOKEN";

pub struct WebhookTransport {
    /// HTTP client (reused across requests)
    client: Client,
    url: String,
    token: Option<String>,

    /// Error of the most recent publish, `None` after a success
    last_error: RwLock<Option<String>>,
}

impl WebhookTransport {
    pub fn new(config: &WebhookConfig) -> TransportResult<Self> {
        if config.url.is_empty() {
            return Err(TransportError::InvalidConfig(
                "webhook url must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
            last_error: RwLock::new(None),
        })
    }

    async fn send(&self, subject: &str, payload: Vec<u8>) -> TransportResult<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SUBJECT_HEADER, subject)
            .body(payload);

        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected(format!("HTTP {status}")));
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    #[instrument(skip(self, payload))]
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> TransportResult<()> {
        let result = self.send(subject, payload).await;

        let mut last_error = self.last_error.write().await;
        match &result {
            Ok(()) => {
                debug!("webhook accepted event");
                *last_error = None;
            }
            Err(e) => {
                warn!("webhook publish failed: {e}");
                *last_error = Some(e.to_string());
            }
        }

        result
    }

    async fn health_check(&self) -> TransportHealth {
        let health = match self.last_error.read().await.as_ref() {
            None => TransportHealth::healthy("webhook transport operational"),
            Some(error) => TransportHealth::unhealthy(format!("last publish failed: {error}")),
        };

        health
            .with_metadata("transport", "webhook")
            .with_metadata("url", &self.url)
    }
}
