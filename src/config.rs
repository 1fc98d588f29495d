// src/config.rs
//! Environment configuration.
//!
//! The Eventarc trigger feeding this service must deliver JSON event data
//! (`--event-data-content-type=application/json`); protobuf deliveries are rejected.
use std::env;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::errors::NotifierError;

pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_FCM_URL: &str = "https://fcm.googleapis.com";
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";
pub const DEFAULT_DATABASE: &str = "(default)";
/// The Firestore emulator accepts this bearer token as an admin credential.
pub const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushBackend {
    Fcm,
    /// Logs messages instead of sending them.
    Log,
}

impl PushBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushBackend::Fcm => "fcm",
            PushBackend::Log => "log",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub google: GoogleConfig,
    pub firestore: FirestoreConfig,
    pub fcm: FcmConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub project_id: String,
    /// Fixed bearer token; when unset tokens come from the metadata server.
    pub access_token: Option<String>,
    pub metadata_url: String,
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub base_url: String,
    pub database: String,
    pub emulator: bool,
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub backend: PushBackend,
    pub base_url: String,
    pub dry_run: bool,
    pub max_concurrency: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl From<ConfigError> for NotifierError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing(var) => NotifierError::MissingEnvironmentVariable(var.to_string()),
            other => NotifierError::InvalidConfiguration(other.to_string()),
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment =
            AppEnvironment::parse(&var("APP_ENV").unwrap_or_else(|| "development".to_string()));

        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var("PORT").map(|v| ("PORT", v)).or_else(|| var("APP_PORT").map(|v| ("APP_PORT", v))) {
            Some((name, value)) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name,
                value,
                reason: "expected a port number",
            })?,
            None => 8080,
        };

        let log_level = var("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let project_id = var("GOOGLE_CLOUD_PROJECT")
            .or_else(|| var("GCLOUD_PROJECT"))
            .ok_or(ConfigError::Missing("GOOGLE_CLOUD_PROJECT"))?;

        let emulator_host = var("FIRESTORE_EMULATOR_HOST");
        let firestore = FirestoreConfig {
            base_url: match &emulator_host {
                Some(host) => format!("http://{}", host.trim()),
                None => var("FIRESTORE_URL").unwrap_or_else(|| DEFAULT_FIRESTORE_URL.to_string()),
            },
            database: var("FIRESTORE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            emulator: emulator_host.is_some(),
        };

        let access_token = var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .or_else(|| firestore.emulator.then(|| EMULATOR_TOKEN.to_string()));

        let backend = match var("PUSH_BACKEND").map(|v| v.trim().to_ascii_lowercase()) {
            None => PushBackend::Fcm,
            Some(v) if v == "fcm" => PushBackend::Fcm,
            Some(v) if v == "log" => PushBackend::Log,
            Some(value) => {
                return Err(ConfigError::Invalid {
                    name: "PUSH_BACKEND",
                    value,
                    reason: "expected 'fcm' or 'log'",
                });
            }
        };

        let dry_run = match var("FCM_DRY_RUN") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "FCM_DRY_RUN",
                value,
                reason: "expected true or false",
            })?,
            None => false,
        };

        let max_concurrency = match var("FCM_MAX_CONCURRENCY") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "FCM_MAX_CONCURRENCY",
                        value,
                        reason: "expected a positive integer",
                    });
                }
            },
            None => 16,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            google: GoogleConfig {
                project_id,
                access_token,
                metadata_url: var("METADATA_URL").unwrap_or_else(|| DEFAULT_METADATA_URL.to_string()),
            },
            firestore,
            fcm: FcmConfig {
                backend,
                base_url: var("FCM_URL").unwrap_or_else(|| DEFAULT_FCM_URL.to_string()),
                dry_run,
                max_concurrency,
            },
        })
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::Invalid {
            name: "APP_HOST",
            value: self.host.clone(),
            reason: "expected an IPv4 or IPv6 address",
        })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
