//! Error types for inbox-stream

use thiserror::Error;

/// Result type alias using inbox-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a generation backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stream carried a fatal error payload
    #[error("Backend error: {0}")]
    Backend(String),

    /// The transport failed after the response started
    #[error("Stream interrupted: {0}")]
    Transport(String),

    /// The stream ended without any text
    #[error("No response received")]
    EmptyResponse,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Classify a request error, separating connection failures from the rest
    pub fn from_request(error: reqwest::Error) -> Self {
        if error.is_connect() {
            Error::Connect(error.to_string())
        } else {
            Error::Http(error)
        }
    }

    /// Check if this error is eligible for an automatic retry.
    ///
    /// Only failures to establish the connection are transient; anything
    /// that happens once the backend has answered is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Connect(_) => true,
            Error::Http(e) => e.is_connect(),
            _ => false,
        }
    }
}
