//! Error types for inbox-assistant

use thiserror::Error;

/// Result type alias using inbox-assistant Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up the assistant
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the streaming layer
    #[error(transparent)]
    Stream(#[from] inbox_stream::Error),

    /// An unknown analysis scope name
    #[error("Unknown analysis scope: {0} (expected unread, selected or all)")]
    InvalidScope(String),
}
