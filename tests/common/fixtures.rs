//! Test doubles and data seeding

use super::constants::*;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use pushfan_server::directory::SqliteRecipientDirectory;
use pushfan_server::fanout::Message;
use pushfan_server::purge::SqliteRecordStore;
use pushfan_server::transport::{BatchResponse, PushTransport, SendResponse, TransportError};
use std::sync::Mutex;

/// Transport that answers from the address prefix and remembers every batch.
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingTransport {
    pub fn batch_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .batches
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.len())
            .collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    pub fn sent_addresses(&self) -> Vec<String> {
        let mut all: Vec<String> = self.batches.lock().unwrap().concat();
        all.sort();
        all
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_batch(&self, messages: &[Message]) -> Result<BatchResponse, TransportError> {
        self.batches
            .lock()
            .unwrap()
            .push(messages.iter().map(|m| m.address.clone()).collect());

        let responses = messages
            .iter()
            .map(|m| {
                if m.address.starts_with(UNREGISTERED_PREFIX) {
                    SendResponse::failed(
                        "messaging/registration-token-not-registered",
                        "Requested entity was not found.",
                    )
                } else if m.address.starts_with(UNAVAILABLE_PREFIX) {
                    SendResponse::failed("messaging/server-unavailable", "Try again later")
                } else {
                    SendResponse::ok()
                }
            })
            .collect();
        Ok(BatchResponse::from_responses(responses))
    }
}

/// Adds `count` opted-in recipients named `{prefix}{i}`.
pub fn seed_recipients(directory: &SqliteRecipientDirectory, prefix: &str, count: usize) {
    let addresses: Vec<String> = (0..count).map(|i| format!("{}{}", prefix, i)).collect();
    directory
        .add_recipients(&addresses, true)
        .expect("Failed to seed recipients");
}

/// Adds `count` records created `age_days` ago, named `{prefix}{i}`.
pub fn seed_records(store: &SqliteRecordStore, prefix: &str, count: usize, age_days: i64) {
    let created_at = (Utc::now() - Duration::days(age_days)).timestamp();
    let rows: Vec<(String, i64)> = (0..count)
        .map(|i| (format!("{}{}", prefix, i), created_at))
        .collect();
    store.insert_records(&rows).expect("Failed to seed records");
}
