use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Main error type for the ambulance-notifier service
#[derive(Debug)]
pub enum NotifierError {
    // Event delivery errors
    BadRequest(String),

    // Google API errors
    Authentication(String),
    Firestore { status: u16, message: String },
    EmptyTokenList,

    // Network and HTTP client errors
    NetworkTimeout,
    NetworkConnection(String),
    HttpClient(String),
    InvalidUrl(String),

    // Serialization and parsing errors
    JsonParsing(String),
    JsonSerialization(String),

    // Configuration and setup errors
    MissingEnvironmentVariable(String),
    InvalidConfiguration(String),

    // Runtime errors
    Server(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl fmt::Display for NotifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierError::BadRequest(msg) => write!(f, "Bad request: {}", msg),

            NotifierError::Authentication(msg) => write!(f, "Google authentication error: {}", msg),
            NotifierError::Firestore { status, message } => {
                write!(f, "Firestore error ({}): {}", status, message)
            }
            NotifierError::EmptyTokenList => write!(f, "Multicast message has no tokens"),

            NotifierError::NetworkTimeout => write!(f, "Network request timed out"),
            NotifierError::NetworkConnection(msg) => write!(f, "Network connection error: {}", msg),
            NotifierError::HttpClient(msg) => write!(f, "HTTP client error: {}", msg),
            NotifierError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),

            NotifierError::JsonParsing(msg) => write!(f, "JSON parsing error: {}", msg),
            NotifierError::JsonSerialization(msg) => write!(f, "JSON serialization error: {}", msg),

            NotifierError::MissingEnvironmentVariable(var) => {
                write!(f, "Missing environment variable: {}", var)
            }
            NotifierError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),

            NotifierError::Server(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for NotifierError {}

impl IntoResponse for NotifierError {
    fn into_response(self) -> Response {
        // 4xx tells Eventarc not to redeliver; everything else is retried by the platform.
        let (status, error_type) = match &self {
            NotifierError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),

            NotifierError::Authentication(_) => (StatusCode::BAD_GATEWAY, "authentication_failed"),
            NotifierError::Firestore { .. } => (StatusCode::BAD_GATEWAY, "firestore_error"),
            NotifierError::NetworkTimeout => (StatusCode::GATEWAY_TIMEOUT, "network_timeout"),
            NotifierError::NetworkConnection(_) => (StatusCode::BAD_GATEWAY, "network_error"),

            // All other errors are treated as internal server errors
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type NotifierResult<T> = Result<T, NotifierError>;

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifierError::NetworkTimeout
        } else if err.is_connect() {
            NotifierError::NetworkConnection(err.to_string())
        } else if err.is_decode() {
            NotifierError::JsonParsing(err.to_string())
        } else if err.is_builder() {
            NotifierError::InvalidUrl(err.to_string())
        } else {
            NotifierError::HttpClient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NotifierError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            NotifierError::JsonParsing(err.to_string())
        } else {
            NotifierError::JsonSerialization(err.to_string())
        }
    }
}

impl From<std::io::Error> for NotifierError {
    fn from(err: std::io::Error) -> Self {
        NotifierError::Server(err.to_string())
    }
}

impl NotifierError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        NotifierError::BadRequest(msg.into())
    }

    pub fn firestore(status: u16, message: impl Into<String>) -> Self {
        NotifierError::Firestore {
            status,
            message: message.into(),
        }
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        NotifierError::Authentication(msg.into())
    }
}
