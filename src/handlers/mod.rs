// src/handlers/mod.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod event_handler;
pub mod health_handler;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(event_handler::receive_event))
        .route("/healthz", get(health_handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
