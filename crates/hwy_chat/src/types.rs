//! Core types for the chat system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation message
pub type MessageId = String;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Assistant,
    User,
}

impl MessageRole {
    /// Wire name used by the chat completion endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique message ID (UUID), fixed at creation
    pub id: MessageId,
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content; grows in place while an answer streams in
    pub content: String,
    /// When the message was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    /// Create the empty assistant placeholder that a stream fills
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }
}

/// Sampling parameters forwarded to the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    /// Sampling temperature in `0.0..=1.0`
    pub temperature: f32,
    /// Maximum number of tokens to generate
    #[serde(rename = "maxLength")]
    pub max_length: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_length: 2048,
        }
    }
}

impl GenerationParams {
    pub fn new(temperature: f32, max_length: u32) -> Self {
        Self {
            temperature,
            max_length,
        }
    }

    /// Clamp temperature into range and make sure at least one token is allowed.
    pub fn normalized(self) -> Self {
        Self {
            temperature: self.temperature.clamp(0.0, 1.0),
            max_length: self.max_length.max(1),
        }
    }
}

/// How a streaming turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The model finished; the placeholder holds the full answer
    Completed { message_id: MessageId, content: String },
    /// The caller cancelled; the placeholder keeps whatever arrived
    Cancelled { message_id: MessageId, content: String },
}

impl StreamOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            Self::Completed { message_id, .. } | Self::Cancelled { message_id, .. } => message_id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Completed { content, .. } | Self::Cancelled { content, .. } => content,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A model installed on the inference server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    /// Full model name including tag, e.g. `llama2:13b`
    pub name: String,
    /// Size on disk in bytes
    #[serde(default)]
    pub size: u64,
    /// Model family reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Parameter size, e.g. `7B`
    #[serde(rename = "parameterSize", default, skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,
}
