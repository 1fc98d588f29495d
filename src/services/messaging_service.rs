// src/services/messaging_service.rs
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    config::FcmConfig,
    errors::NotifierError as AppError,
    models::notification::{BatchResponse, MulticastMessage, Notification, SendResponse},
    services::{auth::AccessTokenProvider, google_error::GoogleApiError},
};

#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Delivers one message to every token in `message.tokens`.
    ///
    /// Rejections of individual tokens are reported in the returned batch; an `Err`
    /// means the multicast as a whole could not be attempted.
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, AppError>;
}

#[derive(Debug, Deserialize)]
struct SendResult {
    name: String,
}

/// FCM HTTP v1. The v1 API addresses one token per request, so a multicast is
/// fanned out with bounded concurrency and the results are gathered in token order.
pub struct FcmPushGateway {
    client: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    send_url: String,
    dry_run: bool,
    max_concurrency: usize,
}

impl FcmPushGateway {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn AccessTokenProvider>,
        config: &FcmConfig,
        project_id: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                config.base_url.trim_end_matches('/'),
                project_id
            ),
            dry_run: config.dry_run,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    async fn send_to_device(
        &self,
        access_token: &str,
        device_token: &str,
        notification: &Notification,
    ) -> SendResponse {
        let fcm_message = json!({
            "validate_only": self.dry_run,
            "message": {
                "token": device_token,
                "notification": {
                    "title": notification.title,
                    "body": notification.body,
                },
                "android": { "priority": "high" },
                "apns": { "headers": { "apns-priority": "10" } }
            }
        });

        let response = match self
            .client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&fcm_message)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("FCM request for one token failed to complete: {}", e);
                return SendResponse::failed(device_token, AppError::from(e).to_string());
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let reason = GoogleApiError::parse(&body)
                .map(|e| e.describe())
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::debug!("FCM rejected token: {}", reason);
            return SendResponse::failed(device_token, reason);
        }

        match serde_json::from_str::<SendResult>(&body) {
            Ok(result) => SendResponse::delivered(device_token, result.name),
            Err(e) => SendResponse::failed(device_token, AppError::from(e).to_string()),
        }
    }
}

#[async_trait]
impl PushGateway for FcmPushGateway {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, AppError> {
        if message.tokens.is_empty() {
            return Err(AppError::EmptyTokenList);
        }

        let access_token = self.tokens.access_token().await?;

        tracing::info!(
            "Sending FCM multicast \"{}\" to {} tokens{}",
            message.notification.title,
            message.tokens.len(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let sends: Vec<_> = message
            .tokens
            .iter()
            .map(|token| self.send_to_device(&access_token, token, &message.notification))
            .collect();

        let responses = stream::iter(sends)
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(BatchResponse { responses })
    }
}

// Stand-in for development: logs instead of sending and reports every token as delivered.
#[derive(Debug)]
pub struct LoggingPushGateway;

#[async_trait]
impl PushGateway for LoggingPushGateway {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, AppError> {
        if message.tokens.is_empty() {
            return Err(AppError::EmptyTokenList);
        }

        let responses = message
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                tracing::info!(
                    "[MOCK] Would send FCM to {}: {} - {}",
                    token,
                    message.notification.title,
                    message.notification.body
                );
                SendResponse::delivered(token.as_str(), format!("mock/{}", i))
            })
            .collect();

        Ok(BatchResponse { responses })
    }
}
