// src/models/request.rs
use chrono::{DateTime, Utc};

use super::firestore::{DocumentEventData, Fields, relative_document_path};

pub const REQUESTS_COLLECTION: &str = "requests";

/// Read-only view of a newly created transport request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub id: String,
    /// `None` when the event carried no readable document.
    pub data: Option<Fields>,
    pub create_time: Option<DateTime<Utc>>,
}

impl RequestSnapshot {
    pub fn new(id: impl Into<String>, data: Option<Fields>) -> Self {
        Self {
            id: id.into(),
            data,
            create_time: None,
        }
    }

    /// Builds the snapshot for a `created` event. `request_id` comes from the event
    /// subject and is used when the body has no document to name it.
    pub fn from_event(event: DocumentEventData, request_id: &str) -> Self {
        match event.value {
            Some(doc) => Self {
                id: doc.id().to_string(),
                data: Some(doc.fields),
                create_time: doc.create_time,
            },
            None => Self::new(request_id, None),
        }
    }
}

/// Extracts `{requestId}` when `path` names a document directly under `requests/`.
///
/// Accepts both relative paths and full resource names, with or without the
/// `documents/` prefix Eventarc puts in `ce-subject`.
pub fn match_request_path(path: &str) -> Option<&str> {
    let relative = relative_document_path(path);
    let relative = relative.strip_prefix("documents/").unwrap_or(relative);

    let mut segments = relative.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(REQUESTS_COLLECTION), Some(id), None) if !id.is_empty() => Some(id),
        _ => None,
    }
}
