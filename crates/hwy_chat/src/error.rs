//! Error types for the chat system.

use thiserror::Error;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Broad failure category, shared with the document pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input rejected before any network call
    Validation,
    /// The remote service could not be reached
    Connection,
    /// The remote service answered with something we cannot read
    Protocol,
    /// The remote service reported a structured failure
    Remote,
}

/// Chat system errors
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Ollama API error: {0}")]
    Remote(String),

    #[error("Inference server is not reachable at {0}")]
    NotConnected(String),

    #[error("Message not found: {0}")]
    UnknownMessage(String),
}

impl ChatError {
    /// Category of this error for presentation and exit codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::UnknownMessage(_) => ErrorKind::Validation,
            Self::Connection(_) | Self::NotConnected(_) => ErrorKind::Connection,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Remote(_) => ErrorKind::Remote,
        }
    }
}

impl From<reqwest::Error> for ChatError {
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

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
