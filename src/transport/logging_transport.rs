use super::models::{BatchResponse, SendResponse};
use super::{check_batch_size, PushTransport, TransportError};
use crate::fanout::Message;
use async_trait::async_trait;
use tracing::info;

/// Transport used when no provider endpoint is configured: logs each batch
/// and reports every message as delivered.
#[derive(Default)]
pub struct LoggingTransport;

#[async_trait]
impl PushTransport for LoggingTransport {
    fn name(&self) -> &str {
        "logging"
    }

    async fn send_batch(&self, messages: &[Message]) -> Result<BatchResponse, TransportError> {
        check_batch_size(messages)?;

        if let Some(first) = messages.first() {
            info!(
                "[dry-run] would push {:?} ({}) to {} recipients",
                first.notification.title,
                first.notification.link,
                messages.len()
            );
        }

        Ok(BatchResponse::from_responses(
            messages.iter().map(|_| SendResponse::ok()).collect(),
        ))
    }
}
