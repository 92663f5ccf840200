//! Error types for document ingestion.

use hwy_chat::ErrorKind;
use thiserror::Error;

/// Result type alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while ingesting or analysing a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("{0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document {0} has already been processed")]
    AlreadyProcessed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected analyzer response: {0}")]
    Protocol(String),

    #[error("Analysis failed: {0}")]
    Remote(String),

    #[error("Analysis service is not configured: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Category of this error for presentation and exit codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::AlreadyProcessed(_)
            | Self::NotConfigured(_)
            | Self::Io(_) => ErrorKind::Validation,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Remote(_) => ErrorKind::Remote,
        }
    }
}

impl From<reqwest::Error> for DocumentError {
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

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
