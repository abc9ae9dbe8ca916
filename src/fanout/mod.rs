//! Push notification fan-out.
//!
//! Turns one notification request into provider-sized batches addressed to
//! every eligible recipient in the directory, sends the batches concurrently
//! and folds the per-recipient responses into a single report.

mod chunking;
mod classify;
mod dispatcher;
mod error;
mod models;

pub use chunking::{build_chunks, partition_eligible};
pub use classify::{classify_failure, FailureClass, INVALID_TOKEN_MARKER};
pub use dispatcher::FanOutDispatcher;
pub use error::FanOutError;
pub use models::{
    AggregateResult, DispatchOutcome, DispatchStatus, FanOutReport, Message, Notification,
    NotifyRequest, Recipient, RecipientFailure, MAX_CHUNK_SIZE,
};
