// src/models/notification.rs
use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// One payload addressed to many device tokens. Token order is preserved and
/// duplicates are sent as-is.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MulticastMessage {
    pub notification: Notification,
    pub tokens: Vec<String>,
}

impl MulticastMessage {
    pub fn new(title: &str, body: &str, tokens: Vec<String>) -> Self {
        Self {
            notification: Notification {
                title: title.to_string(),
                body: body.to_string(),
            },
            tokens,
        }
    }
}

/// Outcome of delivering to a single token.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SendResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResponse {
    pub fn delivered(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            message_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-token results of a multicast, in the same order as `MulticastMessage::tokens`.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }
}
