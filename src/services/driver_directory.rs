// src/services/driver_directory.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    config::FirestoreConfig,
    errors::NotifierError as AppError,
    models::{
        Document,
        driver::{DRIVERS_COLLECTION, Driver, FIELD_IS_AVAILABLE},
    },
    services::{auth::AccessTokenProvider, google_error::GoogleApiError},
};

/// Read-only access to the driver roster.
#[async_trait]
pub trait DriverDirectory: Send + Sync {
    /// Drivers whose `isAvailable` flag is true, in backend result order.
    async fn available_drivers(&self) -> Result<Vec<Driver>, AppError>;
}

/// One element of the `documents:runQuery` response stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryResponse {
    document: Option<Document>,
    /// A stream that fails after it started still answers 200 and ends with this.
    error: Option<GoogleApiError>,
}

pub struct FirestoreDriverDirectory {
    client: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    query_url: String,
}

impl FirestoreDriverDirectory {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn AccessTokenProvider>,
        config: &FirestoreConfig,
        project_id: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            query_url: format!(
                "{}/v1/projects/{}/databases/{}/documents:runQuery",
                config.base_url.trim_end_matches('/'),
                project_id,
                config.database
            ),
        }
    }

    fn available_drivers_query() -> serde_json::Value {
        json!({
            "structuredQuery": {
                "from": [{ "collectionId": DRIVERS_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": FIELD_IS_AVAILABLE },
                        "op": "EQUAL",
                        "value": { "booleanValue": true }
                    }
                }
            }
        })
    }
}

/// Entries without a `document` only carry read-time progress and are skipped. An
/// `error` entry fails the whole query.
fn decode_run_query(body: &str) -> Result<Vec<Driver>, AppError> {
    let entries: Vec<RunQueryResponse> = serde_json::from_str(body)?;

    if let Some(err) = entries.iter().find_map(|entry| entry.error.as_ref()) {
        tracing::error!("Firestore runQuery stream failed: {}", err.describe());
        return Err(AppError::firestore(err.code, err.describe()));
    }

    Ok(entries
        .iter()
        .filter_map(|entry| entry.document.as_ref())
        .map(Driver::from_document)
        .collect())
}

#[async_trait]
impl DriverDirectory for FirestoreDriverDirectory {
    async fn available_drivers(&self) -> Result<Vec<Driver>, AppError> {
        let token = self.tokens.access_token().await?;

        tracing::debug!("Querying available drivers: {}", self.query_url);

        let response = self
            .client
            .post(&self.query_url)
            .bearer_auth(token)
            .json(&Self::available_drivers_query())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = GoogleApiError::parse(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            tracing::error!("Firestore runQuery failed: {} {}", status, message);
            return Err(AppError::firestore(status.as_u16(), message));
        }

        let drivers = decode_run_query(&body)?;
        tracing::debug!("Firestore returned {} available drivers", drivers.len());
        Ok(drivers)
    }
}
