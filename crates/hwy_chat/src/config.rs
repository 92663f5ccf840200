//! Inference server configuration.

use std::time::Duration;

use crate::types::GenerationParams;

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Connection settings for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the server, without trailing slash
    pub base_url: String,
    /// Timeout for establishing the TCP connection
    pub connect_timeout: Duration,
    /// Timeout for a whole non-streaming request
    pub request_timeout: Duration,
    /// Longest wait between two frames of a streamed answer
    pub stream_idle_timeout: Duration,
    /// Parameters used when the caller passes none
    pub default_params: GenerationParams,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            stream_idle_timeout: Duration::from_secs(120),
            default_params: GenerationParams::default(),
        }
    }
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().base_url(base_url)
    }

    /// Build a config from `OLLAMA_BASE_URL`, falling back to the local default.
    pub fn from_env() -> Self {
        match std::env::var("OLLAMA_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn default_params(mut self, params: GenerationParams) -> Self {
        self.default_params = params.normalized();
        self
    }

    /// Join an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let config = OllamaConfig::new("http://gpu-box:11434/");
        assert_eq!(config.endpoint("/api/chat"), "http://gpu-box:11434/api/chat");
        assert_eq!(config.endpoint("api/tags"), "http://gpu-box:11434/api/tags");
    }

    #[test]
    fn test_builder() {
        let config = OllamaConfig::default()
            .stream_idle_timeout(Duration::from_secs(10))
            .default_params(GenerationParams::new(0.2, 512));

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.stream_idle_timeout, Duration::from_secs(10));
        assert_eq!(config.default_params.max_length, 512);
    }
}
