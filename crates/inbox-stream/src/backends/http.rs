//! HTTP streaming backend

use async_trait::async_trait;
use futures::StreamExt;

use super::{ByteStream, StreamBackend};
use crate::{
    error::{Error, Result},
    types::HttpBackendConfig,
};

/// Posts prompts to a streaming generation endpoint
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    /// Create a backend for the configured endpoint
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        reqwest::Url::parse(&config.endpoint)
            .map_err(|e| Error::InvalidConfig(format!("endpoint {:?}: {}", config.endpoint, e)))?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl StreamBackend for HttpBackend {
    async fn open(&self, prompt: &str) -> Result<ByteStream> {
        let request = self.config.request(prompt);
        tracing::debug!(endpoint = %self.config.endpoint, prompt_len = prompt.len(), "Opening stream");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(Error::from_request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| Error::Transport(e.to_string()))
        });
        Ok(Box::pin(body))
    }
}
