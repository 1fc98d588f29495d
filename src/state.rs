// src/state.rs
use std::sync::Arc;

use crate::{
    config::{AppConfig, PushBackend},
    errors::NotifierError as AppError,
    services::{
        DriverDirectory, FcmPushGateway, FirestoreDriverDirectory, LoggingPushGateway,
        PushGateway, RequestNotifier,
        auth::{AccessTokenProvider, MetadataTokenProvider, StaticTokenProvider},
    },
};

pub struct AppState {
    pub notifier: Arc<RequestNotifier>,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the Google clients once; every event delivery reuses them.
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens: Arc<dyn AccessTokenProvider> = match &config.google.access_token {
            Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
            None => Arc::new(MetadataTokenProvider::new(
                client.clone(),
                &config.google.metadata_url,
            )),
        };

        let drivers: Arc<dyn DriverDirectory> = Arc::new(FirestoreDriverDirectory::new(
            client.clone(),
            tokens.clone(),
            &config.firestore,
            &config.google.project_id,
        ));

        let push: Arc<dyn PushGateway> = match config.fcm.backend {
            PushBackend::Fcm => Arc::new(FcmPushGateway::new(
                client,
                tokens,
                &config.fcm,
                &config.google.project_id,
            )),
            PushBackend::Log => {
                tracing::warn!("PUSH_BACKEND=log, notifications will be logged instead of sent");
                Arc::new(LoggingPushGateway)
            }
        };

        Ok(Self::with_services(config, drivers, push))
    }

    pub fn with_services(
        config: AppConfig,
        drivers: Arc<dyn DriverDirectory>,
        push: Arc<dyn PushGateway>,
    ) -> Self {
        Self {
            notifier: Arc::new(RequestNotifier::new(drivers, push)),
            config,
        }
    }
}
