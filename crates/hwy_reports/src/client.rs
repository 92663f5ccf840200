//! HTTP client for the progress-report backend.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ReportsConfig;
use crate::error::{ReportError, ReportResult};
use crate::types::{
    CategoriesResponse, CriticalIssuesResponse, HealthResponse, IssueQuery, ReportQuery,
    ReportsResponse,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detail { detail: String },
    Error { error: String },
}

/// Turn a non-success response into a [`ReportError::Remote`].
fn remote_error(status: u16, body: &str) -> ReportError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Detail { detail: message }) | Ok(ErrorBody::Error { error: message }) => {
            ReportError::Remote(message)
        }
        Err(_) if body.trim().is_empty() => ReportError::Remote(format!("HTTP {}", status)),
        Err(_) => ReportError::Remote(format!("HTTP {}: {}", status, body.trim())),
    }
}

/// Client for the reporting backend's REST API
#[derive(Debug, Clone)]
pub struct ReportsClient {
    config: ReportsConfig,
    client: reqwest::Client,
}

impl ReportsClient {
    pub fn new(config: ReportsConfig) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ReportError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from `MPR_API_BASE_URL`
    pub fn from_env() -> ReportResult<Self> {
        Self::new(ReportsConfig::from_env()?)
    }

    pub fn config(&self) -> &ReportsConfig {
        &self.config
    }

    pub async fn health(&self) -> ReportResult<HealthResponse> {
        self.get("/health", &()).await
    }

    /// True iff the backend answers and reports a connected database. Never fails.
    pub async fn check_health(&self) -> bool {
        match self.health().await {
            Ok(health) => health.is_healthy(),
            Err(e) => {
                tracing::debug!(url = %self.config.base_url, "Reporting backend health check failed: {}", e);
                false
            }
        }
    }

    /// List progress reports, optionally filtered by project type and paged.
    pub async fn reports(&self, query: &ReportQuery) -> ReportResult<ReportsResponse> {
        self.get("/reports", query).await
    }

    pub async fn critical_issues(&self, query: &IssueQuery) -> ReportResult<CriticalIssuesResponse> {
        self.get("/critical-issues", query).await
    }

    /// Insight categories known to the backend
    pub async fn categories(&self) -> ReportResult<Vec<String>> {
        let response: CategoriesResponse = self.get("/categories", &()).await?;
        Ok(response.categories)
    }

    async fn get<T, Q>(&self, path: &str, query: &Q) -> ReportResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.config.endpoint(path);
        tracing::debug!("Reports API request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, "Reports API request failed: {}", e);
                ReportError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = status.as_u16(), "Reports API response: {}", url);

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Reports API error response: {}", body);
            return Err(remote_error(status.as_u16(), &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwy_chat::ErrorKind;

    #[test]
    fn test_remote_error_bodies() {
        assert_eq!(
            remote_error(404, r#"{"detail":"Report not found"}"#).to_string(),
            "Reporting backend error: Report not found"
        );
        assert_eq!(
            remote_error(500, r#"{"error":"database unavailable"}"#).to_string(),
            "Reporting backend error: database unavailable"
        );
        assert_eq!(
            remote_error(502, "Bad Gateway").to_string(),
            "Reporting backend error: HTTP 502: Bad Gateway"
        );
        assert_eq!(remote_error(503, " ").to_string(), "Reporting backend error: HTTP 503");
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let config = ReportsConfig::new("http://127.0.0.1:9")
            .request_timeout(std::time::Duration::from_secs(2));
        let client = ReportsClient::new(config).unwrap();

        assert!(!client.check_health().await);
        let err = client.reports(&ReportQuery::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
