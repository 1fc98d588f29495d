// src/handlers/health_handler.rs
use std::sync::Arc;

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

/// Liveness plus the delivery mode, so a log-only or dry-run deployment is visible.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "ok",
        "project": config.google.project_id,
        "push_backend": config.fcm.backend.as_str(),
        "dry_run": config.fcm.dry_run,
    }))
}
