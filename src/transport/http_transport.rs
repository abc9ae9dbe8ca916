//! HTTP client for the push provider batch endpoint.

use super::models::{BatchResponse, WireBatchRequest};
use super::{check_batch_size, PushTransport, TransportError};
use crate::fanout::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct HttpPushTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushTransport {
    /// # Arguments
    /// * `endpoint` - Full URL of the provider batch send endpoint
    /// * `timeout_sec` - Per-request timeout in seconds
    pub fn new(endpoint: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send_batch(&self, messages: &[Message]) -> Result<BatchResponse, TransportError> {
        check_batch_size(messages)?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&WireBatchRequest::from_messages(messages))
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let batch: BatchResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        // Short responses are folded per message by the dispatcher.
        if batch.responses.len() > messages.len() {
            return Err(TransportError::InvalidResponse(format!(
                "expected at most {} responses, got {}",
                messages.len(),
                batch.responses.len()
            )));
        }

        Ok(batch)
    }
}
