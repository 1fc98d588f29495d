// src/services/auth.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::errors::NotifierError as AppError;

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AppError>;
}

/// A fixed bearer token (local development or the emulator).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AppError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Service-account tokens from the GCE / Cloud Run metadata server.
pub struct MetadataTokenProvider {
    client: reqwest::Client,
    token_url: String,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataTokenProvider {
    pub fn new(client: reqwest::Client, metadata_url: &str) -> Self {
        Self {
            client,
            token_url: format!(
                "{}/computeMetadata/v1/instance/service-accounts/default/token",
                metadata_url.trim_end_matches('/')
            ),
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, AppError> {
        tracing::debug!("Fetching access token from metadata server");

        let response = self
            .client
            .get(&self.token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AppError::authentication(format!("metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Metadata token request failed: {} {}", status, error_text);
            return Err(AppError::authentication(format!(
                "metadata server returned {}: {}",
                status, error_text
            )));
        }

        let token: MetadataToken = response.json().await?;
        Ok(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String, AppError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, routing::get};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn_metadata_server(expires_in: i64) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            get(move |headers: HeaderMap| {
                let counter = counter.clone();
                async move {
                    assert_eq!(headers.get("metadata-flavor").unwrap(), "Google");
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "access_token": format!("ya29.token-{}", n),
                        "expires_in": expires_in,
                        "token_type": "Bearer"
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{}", addr), hits)
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticTokenProvider::new("owner");
        assert_eq!(provider.access_token().await.unwrap(), "owner");
    }

    #[tokio::test]
    async fn test_metadata_token_is_cached() {
        let (url, hits) = spawn_metadata_server(3600).await;
        let provider = MetadataTokenProvider::new(reqwest::Client::new(), &url);

        assert_eq!(provider.access_token().await.unwrap(), "ya29.token-0");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.token-0");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_metadata_token_refreshes_near_expiry() {
        // Expiry inside the safety margin forces a refresh on every call.
        let (url, hits) = spawn_metadata_server(30).await;
        let provider = MetadataTokenProvider::new(reqwest::Client::new(), &url);

        assert_eq!(provider.access_token().await.unwrap(), "ya29.token-0");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.token-1");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_metadata_unreachable() {
        let provider = MetadataTokenProvider::new(reqwest::Client::new(), "http://127.0.0.1:1");
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}
