//! Request types for generation backends

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of a streaming generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub prompt: String,
    /// Always true; the client only speaks the streaming protocol
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    /// Create a streaming request for a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            stream: true,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Connection settings for [`crate::backends::http::HttpBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Full URL of the streaming generation endpoint
    pub endpoint: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Upper bound on establishing the TCP/TLS connection
    pub connect_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/generate/stream".to_string(),
            model: Some("Llama-3.2-3B-Instruct-Q4_K_M".to_string()),
            temperature: Some(0.7),
            max_tokens: Some(2048),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpBackendConfig {
    /// Build the request body for a prompt
    pub fn request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..GenerateRequest::new(prompt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_always_streams() {
        let json = serde_json::to_value(HttpBackendConfig::default().request("hi")).unwrap();
        assert_eq!(json["prompt"], "hi");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 2048);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_value(GenerateRequest::new("hi")).unwrap();
        assert!(json.get("model").is_none());
        assert!(json.get("temperature").is_none());
    }
}
