//! Wire models for the push provider batch endpoint.

use crate::fanout::Message;
use serde::{Deserialize, Serialize};

/// Per-message result, in the same order as the sent messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SendResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub success_count: usize,
    #[serde(default)]
    pub failure_count: usize,
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct WireNotification<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct WireData<'a> {
    pub link: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct WireMessage<'a> {
    pub token: &'a str,
    pub notification: WireNotification<'a>,
    pub data: WireData<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct WireBatchRequest<'a> {
    pub messages: Vec<WireMessage<'a>>,
}

impl<'a> WireBatchRequest<'a> {
    pub fn from_messages(messages: &'a [Message]) -> Self {
        Self {
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    token: &m.address,
                    notification: WireNotification {
                        title: &m.notification.title,
                        body: &m.notification.body,
                    },
                    data: WireData {
                        link: &m.notification.link,
                    },
                })
                .collect(),
        }
    }
}
