//! Error types for retrieval operations

use meshhub_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    // ============ Network Errors ============
    #[error("HTTP error: {status} - request to {url} failed")]
    HttpError { status: u16, url: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Rate limited by server. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    // ============ Authentication Errors ============
    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Access denied to {url}")]
    AuthFailed { url: String },

    // ============ Source Errors ============
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to read local source {path}: {source}")]
    LocalSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to unpack archive from {location}: {source}")]
    Archive {
        location: String,
        #[source]
        source: CoreError,
    },

    #[error("Failed to parse application specs: {0}")]
    Catalog(#[source] CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Other ============
    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        if e.is_timeout() {
            FetchError::Timeout { url }
        } else if e.is_connect() {
            FetchError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            FetchError::HttpError {
                status: status.as_u16(),
                url,
            }
        } else {
            FetchError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(e: url::ParseError) -> Self {
        FetchError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
