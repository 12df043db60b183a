#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Unsupported TLD: {0}")]
    UnsupportedTld(String),

    #[error("Network timeout")]
    Timeout,

    #[error("DNS query failed: {0}")]
    Dns(String),

    #[error("Whois query failed: {0}")]
    Whois(String),

    #[error("Domain lookup failed: {0}")]
    LookupFailed(String),

    #[error("Domain not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    IoError(#[from] tokio::io::Error),

    #[error("Response too large")]
    ResponseTooLarge,

    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for LookupError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LookupError::Timeout
    }
}

impl LookupError {
    /// True when the failure came from an upstream (DNS or whois) rather
    /// than from validation or the store. Only upstream failures are
    /// eligible for the serve-stale fallback.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            LookupError::Dns(_)
                | LookupError::Whois(_)
                | LookupError::Timeout
                | LookupError::UnsupportedTld(_)
                | LookupError::IoError(_)
                | LookupError::ResponseTooLarge
                | LookupError::InvalidUtf8
        )
    }
}

#[cfg(feature = "server")]
impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            LookupError::InvalidDomain(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            LookupError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            LookupError::LookupFailed(_) => (StatusCode::NOT_FOUND, self.to_string()),
            LookupError::Timeout => (StatusCode::REQUEST_TIMEOUT, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
