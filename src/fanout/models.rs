//! Fan-out data models

use super::error::FanOutError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hard per-call ceiling of the push provider. Not configurable.
pub const MAX_CHUNK_SIZE: usize = 1000;

/// A directory entry that may receive pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
    pub eligible: bool,
}

impl Recipient {
    pub fn new(address: impl Into<String>, eligible: bool) -> Self {
        Self {
            address: address.into(),
            eligible,
        }
    }

    /// Opted in and carrying a non-blank address.
    pub fn is_eligible(&self) -> bool {
        self.eligible && !self.address.trim().is_empty()
    }
}

/// The content pushed to every recipient of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub link: String,
}

/// Body of an inbound notify request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyRequest {
    pub link: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
}

fn required_field(value: Option<String>, name: &str) -> Result<String, FanOutError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(FanOutError::InvalidRequest(format!(
            "'{}' is required and must be a non-empty string",
            name
        ))),
    }
}

impl NotifyRequest {
    pub fn new(link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
            title: Some(title.into()),
            body: None,
        }
    }

    pub fn into_notification(self) -> Result<Notification, FanOutError> {
        let link = required_field(self.link, "link")?;
        let title = required_field(self.title, "title")?;
        Ok(Notification {
            title,
            body: self.body.unwrap_or_default(),
            link,
        })
    }
}

/// One recipient paired with the shared notification.
#[derive(Debug, Clone)]
pub struct Message {
    pub address: String,
    pub notification: Arc<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientFailure {
    pub address: String,
    pub error_code: String,
    pub error_message: String,
}

/// Result of sending a single chunk.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub chunk_index: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<RecipientFailure>,
    /// Set when the whole chunk failed at the transport level.
    pub transport_error: Option<String>,
}

impl DispatchOutcome {
    /// The outcome of a chunk whose transport call failed as a whole: every
    /// message in it counts as failed.
    pub fn chunk_failed(chunk_index: usize, chunk_len: usize, error: String) -> Self {
        Self {
            chunk_index,
            success_count: 0,
            failure_count: chunk_len,
            failures: Vec::new(),
            transport_error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub total_success: usize,
    pub total_failure: usize,
}

impl AggregateResult {
    pub fn absorb(&mut self, outcome: &DispatchOutcome) {
        self.total_success += outcome.success_count;
        self.total_failure += outcome.failure_count;
    }

    pub fn summary(&self) -> String {
        format!(
            "Successfully sent {} messages, failed {}.",
            self.total_success, self.total_failure
        )
    }
}

impl<'a> FromIterator<&'a DispatchOutcome> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = &'a DispatchOutcome>>(iter: I) -> Self {
        let mut result = AggregateResult::default();
        for outcome in iter {
            result.absorb(outcome);
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Sent,
    NoRecipients,
}

/// Everything one fan-out invocation produced.
#[derive(Debug, Clone, Serialize)]
pub struct FanOutReport {
    pub status: DispatchStatus,
    pub result: AggregateResult,
    pub chunk_count: usize,
    pub excluded_count: usize,
    pub flagged_for_removal: Vec<RecipientFailure>,
}

impl FanOutReport {
    pub fn no_recipients(excluded_count: usize) -> Self {
        Self {
            status: DispatchStatus::NoRecipients,
            result: AggregateResult::default(),
            chunk_count: 0,
            excluded_count,
            flagged_for_removal: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_requires_opt_in_and_address() {
        assert!(Recipient::new("token-a", true).is_eligible());
        assert!(!Recipient::new("token-a", false).is_eligible());
        assert!(!Recipient::new("", true).is_eligible());
        assert!(!Recipient::new("   ", true).is_eligible());
    }

    #[test]
    fn request_without_link_is_invalid() {
        let request = NotifyRequest {
            link: None,
            title: Some("Hello".to_string()),
            body: None,
        };
        let err = request.into_notification().unwrap_err();
        assert!(matches!(err, FanOutError::InvalidRequest(msg) if msg.contains("link")));
    }

    #[test]
    fn request_with_blank_title_is_invalid() {
        let request = NotifyRequest::new("https://example.com/post/1", "  ");
        assert!(matches!(
            request.into_notification(),
            Err(FanOutError::InvalidRequest(_))
        ));
    }

    #[test]
    fn body_defaults_to_empty() {
        let notification = NotifyRequest::new("https://example.com/post/1", "New post")
            .into_notification()
            .unwrap();
        assert_eq!(notification.title, "New post");
        assert_eq!(notification.link, "https://example.com/post/1");
        assert_eq!(notification.body, "");
    }

    #[test]
    fn aggregate_sums_outcomes() {
        let outcomes = vec![
            DispatchOutcome {
                chunk_index: 0,
                success_count: 998,
                failure_count: 2,
                ..Default::default()
            },
            DispatchOutcome::chunk_failed(1, 500, "boom".to_string()),
        ];
        let result: AggregateResult = outcomes.iter().collect();
        assert_eq!(result.total_success, 998);
        assert_eq!(result.total_failure, 502);
        assert_eq!(result.summary(), "Successfully sent 998 messages, failed 502.");
    }
}
