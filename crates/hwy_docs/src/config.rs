//! Tracker and analyzer configuration.

use std::time::Duration;

use crate::error::{DocumentError, DocumentResult};

/// Largest accepted upload by default (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Ingestion limits.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Largest accepted file in bytes
    pub max_file_size: u64,
    /// MIME types accepted for analysis
    pub supported_mime_types: Vec<String>,
    /// Buffered tracker events per subscriber
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            supported_mime_types: vec!["application/pdf".to_string()],
            event_capacity: 256,
        }
    }
}

impl TrackerConfig {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn supported_mime_types(mut self, types: Vec<String>) -> Self {
        self.supported_mime_types = types;
        self
    }

    pub fn is_supported(&self, mime_type: &str) -> bool {
        self.supported_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type))
    }
}

/// Settings for the Gemini analysis service.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-pro";
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(300),
            temperature: 0.3,
            top_k: 40,
            top_p: 0.8,
            max_output_tokens: 8192,
        }
    }

    /// Build a config from `GEMINI_API_KEY` and optional `GEMINI_MODEL`.
    pub fn from_env() -> DocumentResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(DocumentError::NotConfigured(
                "set GEMINI_API_KEY to enable document analysis".to_string(),
            ));
        }

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        Ok(config)
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// URL of the `generateContent` method for the configured model
    pub fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
        assert!(config.is_supported("application/pdf"));
        assert!(config.is_supported("Application/PDF"));
        assert!(!config.is_supported("text/plain"));
    }

    #[test]
    fn test_generate_url() {
        let config = GeminiConfig::new("key")
            .base_url("http://localhost:8080/")
            .model("gemini-1.5-flash");
        assert_eq!(
            config.generate_url(),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
