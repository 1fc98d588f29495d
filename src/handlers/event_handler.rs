// src/handlers/event_handler.rs
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    errors::NotifierError as AppError,
    models::{
        firestore::DocumentEventData,
        request::{RequestSnapshot, match_request_path},
    },
    services::DispatchOutcome,
    state::AppState,
};

/// CloudEvents type Eventarc uses for Firestore document creation. The
/// `.withAuthContext` variant shares the prefix.
pub const DOCUMENT_CREATED: &str = "google.cloud.firestore.document.v1.created";

const CE_ID: &str = "ce-id";
const CE_TYPE: &str = "ce-type";
const CE_SUBJECT: &str = "ce-subject";

/// Eventarc sends Firestore events as protobuf unless the trigger asks for JSON.
const JSON_TRIGGER_HINT: &str =
    "create the Eventarc trigger with --event-data-content-type=application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Processed,
    Ignored,
}

#[derive(Debug, Serialize)]
pub struct EventAck {
    pub event_id: String,
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DispatchOutcome>,
}

impl EventAck {
    fn ignored(event_id: String, reason: String) -> Self {
        tracing::debug!("Ignoring event: {}", reason);
        Self {
            event_id,
            status: AckStatus::Ignored,
            reason: Some(reason),
            result: None,
        }
    }

    fn processed(event_id: String, outcome: DispatchOutcome) -> Self {
        Self {
            event_id,
            status: AckStatus::Processed,
            reason: None,
            result: Some(outcome),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Eventarc delivery endpoint for `requests/{requestId}` creations.
///
/// A 2xx acknowledges the event; errors map to statuses through `IntoResponse`, and the
/// platform decides whether to redeliver.
pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EventAck>, AppError> {
    let event_id = header(&headers, CE_ID)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!("request_created", event_id = %event_id);
    handle_event(state, headers, body, event_id)
        .instrument(span)
        .await
        .map(Json)
}

async fn handle_event(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: Bytes,
    event_id: String,
) -> Result<EventAck, AppError> {
    if let Some(event_type) = header(&headers, CE_TYPE) {
        if !event_type.starts_with(DOCUMENT_CREATED) {
            return Ok(EventAck::ignored(
                event_id,
                format!("event type {} is not a document creation", event_type),
            ));
        }
    }

    if let Some(content_type) = header(&headers, "content-type") {
        if !content_type.to_ascii_lowercase().contains("json") {
            tracing::warn!("Rejecting {} event body; {}", content_type, JSON_TRIGGER_HINT);
            return Err(AppError::bad_request(format!(
                "unsupported content type {}: {}",
                content_type, JSON_TRIGGER_HINT
            )));
        }
    }

    let event: DocumentEventData = if body.iter().all(u8::is_ascii_whitespace) {
        DocumentEventData::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Rejecting undecodable event body: {}", e);
            AppError::bad_request(format!("undecodable event body: {}", e))
        })?
    };

    let path = header(&headers, CE_SUBJECT)
        .map(str::to_string)
        .or_else(|| event.value.as_ref().map(|doc| doc.name.clone()));

    let Some(path) = path else {
        return Ok(EventAck::ignored(
            event_id,
            "event names no document".to_string(),
        ));
    };

    let Some(request_id) = match_request_path(&path).map(str::to_string) else {
        return Ok(EventAck::ignored(
            event_id,
            format!("{} is not a requests/{{requestId}} document", path),
        ));
    };

    let snapshot = RequestSnapshot::from_event(event, &request_id);
    match state.notifier.handle_request_created(&snapshot).await {
        Ok(outcome) => Ok(EventAck::processed(event_id, outcome)),
        Err(e) => {
            tracing::error!("Request {} failed, leaving retry to the platform: {}", request_id, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        handlers::router,
        models::{
            driver::Driver,
            notification::{BatchResponse, MulticastMessage, SendResponse},
        },
        services::{DriverDirectory, PushGateway},
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    struct StubDirectory {
        drivers: Vec<Driver>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DriverDirectory for StubDirectory {
        async fn available_drivers(&self) -> Result<Vec<Driver>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::firestore(503, "UNAVAILABLE: backend down"));
            }
            Ok(self.drivers.clone())
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<MulticastMessage>>,
    }

    #[async_trait]
    impl PushGateway for RecordingGateway {
        async fn send_multicast(
            &self,
            message: &MulticastMessage,
        ) -> Result<BatchResponse, AppError> {
            self.sent.lock().await.push(message.clone());
            Ok(BatchResponse {
                responses: message
                    .tokens
                    .iter()
                    .map(|t| SendResponse::delivered(t.as_str(), "projects/demo/messages/1"))
                    .collect(),
            })
        }
    }

    struct Harness {
        app: Router,
        directory: Arc<StubDirectory>,
        gateway: Arc<RecordingGateway>,
    }

    fn harness(drivers: Vec<Driver>, fail: bool) -> Harness {
        let config = AppConfig::from_lookup(|name| {
            (name == "GOOGLE_CLOUD_PROJECT").then(|| "demo".to_string())
        })
        .unwrap();
        let directory = Arc::new(StubDirectory {
            drivers,
            fail,
            calls: AtomicUsize::new(0),
        });
        let gateway = Arc::new(RecordingGateway::default());
        let state = AppState::with_services(config, directory.clone(), gateway.clone());
        Harness {
            app: router(Arc::new(state)),
            directory,
            gateway,
        }
    }

    fn event(ce_type: &str, subject: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header(CE_ID, "evt-1")
            .header(CE_TYPE, ce_type)
            .header(CE_SUBJECT, subject)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn created_body() -> Value {
        json!({
            "value": {
                "name": "projects/demo/databases/(default)/documents/requests/req-9",
                "fields": { "pickup": { "stringValue": "Korle Bu" } },
                "createTime": "2024-05-01T09:00:00Z",
                "updateTime": "2024-05-01T09:00:00Z"
            }
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_created_request_alerts_drivers() {
        let h = harness(
            vec![
                Driver::new("d1", true, Some("A")),
                Driver::new("d2", true, None),
                Driver::new("d3", true, Some("B")),
            ],
            false,
        );

        let response = h
            .app
            .oneshot(event(DOCUMENT_CREATED, "documents/requests/req-9", created_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["event_id"], "evt-1");
        assert_eq!(body["status"], "processed");
        assert_eq!(body["result"]["outcome"], "sent");
        assert_eq!(body["result"]["success_count"], 2);

        let sent = h.gateway.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].tokens, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_other_event_types_are_ignored() {
        let h = harness(vec![Driver::new("d1", true, Some("A"))], false);

        let response = h
            .app
            .oneshot(event(
                "google.cloud.firestore.document.v1.updated",
                "documents/requests/req-9",
                created_body(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ignored");
        assert_eq!(h.directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_collections_are_ignored() {
        let h = harness(vec![Driver::new("d1", true, Some("A"))], false);

        let response = h
            .app
            .oneshot(event(DOCUMENT_CREATED, "documents/drivers/d1", created_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ignored");
        assert_eq!(h.directory.calls.load(Ordering::SeqCst), 0);
        assert!(h.gateway.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_event_without_document_is_a_no_op() {
        let h = harness(vec![Driver::new("d1", true, Some("A"))], false);

        let response = h
            .app
            .oneshot(event(DOCUMENT_CREATED, "documents/requests/req-9", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["result"]["outcome"], "no_payload");
        assert_eq!(h.directory.calls.load(Ordering::SeqCst), 0);
        assert!(h.gateway.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_subject_falls_back_to_document_name() {
        let h = harness(vec![Driver::new("d1", true, Some("A"))], false);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(created_body().to_string()))
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "processed");
        assert_eq!(h.gateway.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let h = harness(vec![], false);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CE_TYPE, DOCUMENT_CREATED)
            .header(CE_SUBJECT, "documents/requests/req-9")
            .body(Body::from("{\"value\": "))
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_failure_is_returned_to_platform() {
        let h = harness(vec![], true);

        let response = h
            .app
            .oneshot(event(DOCUMENT_CREATED, "documents/requests/req-9", created_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "firestore_error");
        assert!(h.gateway.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(vec![], false);
        let response = h
            .app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["project"], "demo");
        assert_eq!(body["push_backend"], "fcm");
        assert_eq!(body["dry_run"], false);
    }

    #[tokio::test]
    async fn test_protobuf_delivery_is_rejected_with_hint() {
        let h = harness(vec![Driver::new("d1", true, Some("A"))], false);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/protobuf")
            .header(CE_TYPE, DOCUMENT_CREATED)
            .header(CE_SUBJECT, "documents/requests/req-9")
            .body(Body::from(vec![0x0a, 0x02, 0x08, 0x01]))
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("--event-data-content-type=application/json")
        );
        assert_eq!(h.directory.calls.load(Ordering::SeqCst), 0);
    }
}
