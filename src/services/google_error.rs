// src/services/google_error.rs
use serde::Deserialize;

/// The `{"error": {...}}` envelope Google REST APIs return on failure.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: GoogleApiError,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GoogleApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl GoogleApiError {
    /// Parses an error body. Streaming endpoints wrap the envelope in an array.
    pub fn parse(body: &str) -> Option<Self> {
        // A derived struct also accepts a JSON array positionally, so the shape
        // has to be picked before decoding.
        if body.trim_start().starts_with('[') {
            return serde_json::from_str::<Vec<ErrorEnvelope>>(body)
                .ok()?
                .into_iter()
                .next()
                .map(|envelope| envelope.error);
        }
        serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }

    /// The FCM-specific code (`UNREGISTERED`, `SENDER_ID_MISMATCH`, ...) when present,
    /// otherwise the canonical status.
    pub fn reason(&self) -> &str {
        self.details
            .iter()
            .find_map(|d| d.get("errorCode").and_then(|c| c.as_str()))
            .unwrap_or(self.status.as_str())
    }

    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            self.reason().to_string()
        } else {
            format!("{}: {}", self.reason(), self.message)
        }
    }
}
