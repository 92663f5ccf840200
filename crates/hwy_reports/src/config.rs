//! Reporting backend configuration.

use std::time::Duration;

use crate::error::{ReportError, ReportResult};

/// Environment variable holding the backend base URL
pub const ENV_BASE_URL: &str = "MPR_API_BASE_URL";

#[derive(Debug, Clone)]
pub struct ReportsConfig {
    /// Base URL of the backend, without trailing slash
    pub base_url: String,
    /// Timeout for every request
    pub request_timeout: Duration,
}

impl ReportsConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Build a config from `MPR_API_BASE_URL`.
    pub fn from_env() -> ReportResult<Self> {
        match std::env::var(ENV_BASE_URL) {
            Ok(url) if !url.trim().is_empty() => Ok(Self::new(url.trim())),
            _ => Err(ReportError::NotConfigured(format!(
                "set {} or reportsBaseUrl in the settings file",
                ENV_BASE_URL
            ))),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Join an API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
