//! Error types for the reporting backend client.

use hwy_chat::ErrorKind;
use thiserror::Error;

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unknown project type '{0}' (expected OM or UC)")]
    InvalidProjectType(String),

    #[error("Reporting backend is not configured: {0}")]
    NotConfigured(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected reporting backend response: {0}")]
    Protocol(String),

    #[error("Reporting backend error: {0}")]
    Remote(String),
}

impl ReportError {
    /// Category of this error for presentation and exit codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidProjectType(_) | Self::NotConfigured(_) => ErrorKind::Validation,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Remote(_) => ErrorKind::Remote,
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Connection(format!("request timed out: {}", err))
        } else if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
