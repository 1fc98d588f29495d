// src/models/driver.rs
use serde::Serialize;

use super::firestore::{Document, Value};

pub const DRIVERS_COLLECTION: &str = "drivers";
pub const FIELD_IS_AVAILABLE: &str = "isAvailable";
pub const FIELD_FCM_TOKEN: &str = "fcmToken";

/// The slice of a driver document this service reads.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Driver {
    pub id: String,
    pub is_available: bool,
    pub fcm_token: Option<String>, // For push notifications
}

impl Driver {
    pub fn new(id: impl Into<String>, is_available: bool, fcm_token: Option<&str>) -> Self {
        Self {
            id: id.into(),
            is_available,
            fcm_token: fcm_token.map(str::to_string),
        }
    }

    /// Reads the explicit schema out of an untyped document.
    ///
    /// A missing or non-boolean `isAvailable` reads as unavailable. `fcmToken` is kept only
    /// when it is a non-empty string; any other type is reported and dropped.
    pub fn from_document(doc: &Document) -> Self {
        let is_available = doc
            .get(FIELD_IS_AVAILABLE)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let fcm_token = match doc.get(FIELD_FCM_TOKEN) {
            None | Some(Value::NullValue(_)) => None,
            Some(Value::StringValue(token)) if token.is_empty() => None,
            Some(Value::StringValue(token)) => Some(token.clone()),
            Some(other) => {
                tracing::warn!(
                    "Driver {} has a malformed {} field of type {}, skipping it",
                    doc.id(),
                    FIELD_FCM_TOKEN,
                    other.type_name()
                );
                None
            }
        };

        Self {
            id: doc.id().to_string(),
            is_available,
            fcm_token,
        }
    }
}
