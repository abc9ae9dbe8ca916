//! Push provider transport.
//!
//! A transport accepts one chunk of at most [`MAX_CHUNK_SIZE`] messages and
//! reports a per-message result, positionally correlated with the input.

mod http_transport;
mod logging_transport;
mod models;

pub use http_transport::HttpPushTransport;
pub use logging_transport::LoggingTransport;
pub use models::{BatchResponse, SendResponse};

use crate::fanout::{Message, MAX_CHUNK_SIZE};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that fail a whole batch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Batch of {size} messages exceeds the provider limit of {max}")]
    BatchTooLarge { size: usize, max: usize },
}

pub(crate) fn check_batch_size(messages: &[Message]) -> Result<(), TransportError> {
    if messages.len() > MAX_CHUNK_SIZE {
        return Err(TransportError::BatchTooLarge {
            size: messages.len(),
            max: MAX_CHUNK_SIZE,
        });
    }
    Ok(())
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Send one batch. Per-recipient failures are reported inside the
    /// response; an `Err` means the batch as a whole failed.
    async fn send_batch(&self, messages: &[Message]) -> Result<BatchResponse, TransportError>;
}
