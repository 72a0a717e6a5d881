//! Error types for inbox-store

use thiserror::Error;

/// Result type alias using inbox-store Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the command path.
///
/// Store commands never fail; these cover persistence and parsing only.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing the state slot failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown message status label
    #[error("Invalid message status: {0}")]
    InvalidStatus(String),
}
