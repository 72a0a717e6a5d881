//! Generation backend implementations

pub mod http;

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::Result;

/// Raw response body chunks, as delivered by the transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// A backend that answers a prompt with a streaming response body
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Submit a prompt and return the response body as a chunk stream.
    ///
    /// Failing to establish the connection is reported here as a
    /// transient error. Faults after the response started are reported
    /// as `Err` items of the stream. Dropping the stream aborts the request.
    async fn open(&self, prompt: &str) -> Result<ByteStream>;
}
