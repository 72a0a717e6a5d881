//! Configuration file support

use inbox_assistant::{AnalysisLimits, AssistantConfig, ClientConfig, RetryConfig};
use inbox_store::FileSlot;
use inbox_stream::HttpBackendConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Streaming generation endpoint
    pub endpoint: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Retries after a failed connection attempt
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Cancel a request after this long without data
    pub inactivity_timeout_secs: u64,
    pub timeout_tick_ms: u64,
    /// Analyses over more messages than this are truncated
    pub analysis_cap: usize,
    /// Most recent messages kept when truncating
    pub analysis_keep: usize,
    /// Recent messages sent along with a question
    pub ask_context: usize,
    /// Inbox state file
    pub state_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let backend = HttpBackendConfig::default();
        let client = ClientConfig::default();
        let limits = AnalysisLimits::default();
        Self {
            endpoint: backend.endpoint,
            model: backend.model,
            temperature: backend.temperature,
            max_tokens: backend.max_tokens,
            max_retries: client.retry.max_retries,
            retry_backoff_ms: client.retry.backoff.as_millis() as u64,
            inactivity_timeout_secs: client.inactivity_timeout.as_secs(),
            timeout_tick_ms: client.tick.as_millis() as u64,
            analysis_cap: limits.cap,
            analysis_keep: limits.keep,
            ask_context: limits.ask_context,
            state_path: None,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inbox")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("INBOX_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init(path: &Path) -> std::io::Result<PathBuf> {
        if !path.exists() {
            Self::default().save(path)?;
        }
        Ok(path.to_path_buf())
    }

    /// Resolved inbox state file
    pub fn state_path(&self) -> PathBuf {
        match &self.state_path {
            Some(path) => path.clone(),
            None => FileSlot::default_path(
                &dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")),
            ),
        }
    }

    pub fn backend(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }

    pub fn assistant(&self) -> AssistantConfig {
        AssistantConfig {
            client: ClientConfig {
                retry: RetryConfig {
                    max_retries: self.max_retries,
                    backoff: Duration::from_millis(self.retry_backoff_ms),
                },
                inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
                tick: Duration::from_millis(self.timeout_tick_ms.max(1)),
            },
            limits: AnalysisLimits {
                cap: self.analysis_cap,
                keep: self.analysis_keep,
                ask_context: self.ask_context,
            },
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# inbox configuration file
# Place at ~/.config/inbox/config.toml (Linux), or point INBOX_CONFIG_PATH at it

# Streaming generation endpoint
endpoint = "http://localhost:8000/generate/stream"

# Generation parameters sent with every request
model = "Llama-3.2-3B-Instruct-Q4_K_M"
temperature = 0.7
max_tokens = 2048

# Connection failures are retried with a fixed backoff
max_retries = 2
retry_backoff_ms = 1000

# A request with no data for this long is cancelled
inactivity_timeout_secs = 60
timeout_tick_ms = 1000

# Analyses over more than analysis_cap messages keep only the most recent analysis_keep
analysis_cap = 120
analysis_keep = 100

# Recent messages sent as context with a question
ask_context = 10

# Inbox state file (defaults to the platform data directory)
# state_path = "/home/me/.local/share/inbox/state.json"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses_to_defaults() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: Config = toml::from_str("max_retries = 5\nendpoint = \"http://gpu:9000/s\"").unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.endpoint, "http://gpu:9000/s");
        assert_eq!(config.analysis_cap, 120);

        let assistant = config.assistant();
        assert_eq!(assistant.client.retry.max_retries, 5);
        assert_eq!(assistant.client.inactivity_timeout, Duration::from_secs(60));
        assert_eq!(assistant.limits.keep, 100);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            ask_context: 4,
            state_path: Some(dir.path().join("state.json")),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.state_path(), dir.path().join("state.json"));
    }

    #[test]
    fn test_unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_retries = \"many\"").unwrap();
        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ask_context = 3\n").unwrap();

        Config::init(&path).unwrap();
        assert_eq!(Config::load(&path).ask_context, 3);
    }
}
