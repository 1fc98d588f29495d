// src/services/request_notifier.rs
use serde::Serialize;
use std::sync::Arc;

use crate::{
    errors::NotifierError as AppError,
    models::{driver::Driver, notification::MulticastMessage, request::RequestSnapshot},
    services::{driver_directory::DriverDirectory, messaging_service::PushGateway},
};

pub const ALERT_TITLE: &str = "🆘 New Ambulance Request";
pub const ALERT_BODY: &str = "Tap to accept a nearby emergency request";

/// What a single invocation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The event carried no readable request document.
    NoPayload,
    /// No available driver had a push token.
    NoRecipients,
    Sent {
        success_count: usize,
        failure_count: usize,
    },
}

/// Alerts available drivers when a new transport request is created.
///
/// Reads the driver roster and writes only to the push channel. Errors from either
/// collaborator are returned unchanged so the event source can apply its own retry policy.
pub struct RequestNotifier {
    drivers: Arc<dyn DriverDirectory>,
    push: Arc<dyn PushGateway>,
}

impl RequestNotifier {
    pub fn new(drivers: Arc<dyn DriverDirectory>, push: Arc<dyn PushGateway>) -> Self {
        Self { drivers, push }
    }

    pub async fn handle_request_created(
        &self,
        snapshot: &RequestSnapshot,
    ) -> Result<DispatchOutcome, AppError> {
        if snapshot.data.is_none() {
            tracing::debug!("Request {} has no data, nothing to do", snapshot.id);
            return Ok(DispatchOutcome::NoPayload);
        }

        let drivers = self.drivers.available_drivers().await?;
        let tokens = collect_tokens(&drivers);

        if tokens.is_empty() {
            tracing::debug!(
                "No reachable drivers for request {} ({} available)",
                snapshot.id,
                drivers.len()
            );
            return Ok(DispatchOutcome::NoRecipients);
        }

        let batch = self.push.send_multicast(&ambulance_alert(tokens)).await?;

        let success_count = batch.success_count();
        tracing::info!(request_id = %snapshot.id, "{}", sent_summary(success_count));

        Ok(DispatchOutcome::Sent {
            success_count,
            failure_count: batch.failure_count(),
        })
    }
}

/// Push tokens of the given drivers, in order. Drivers without a token are skipped;
/// duplicate tokens are kept.
pub fn collect_tokens(drivers: &[Driver]) -> Vec<String> {
    drivers
        .iter()
        .filter_map(|driver| driver.fcm_token.clone())
        .collect()
}

/// The alert is the same for every request.
pub fn ambulance_alert(tokens: Vec<String>) -> MulticastMessage {
    MulticastMessage::new(ALERT_TITLE, ALERT_BODY, tokens)
}

pub fn sent_summary(success_count: usize) -> String {
    format!("✅ Sent to {} drivers.", success_count)
}
