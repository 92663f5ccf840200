//! Chat transport trait.

use async_trait::async_trait;

use crate::error::ChatResult;
use crate::types::{GenerationParams, ModelInfo};
use crate::wire::{ChatTurn, FragmentStream};

/// Everything a transport needs to issue one chat completion.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Target model identifier
    pub model: String,
    /// Ordered context, oldest first, ending with the new user message
    pub messages: Vec<ChatTurn>,
    /// Sampling parameters, or `None` for the transport's defaults
    pub params: Option<GenerationParams>,
}

/// A chat completion backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Check whether the backend is reachable. Never fails.
    async fn check_health(&self) -> bool;

    /// List the models the backend can serve.
    async fn list_models(&self) -> ChatResult<Vec<ModelInfo>>;

    /// Issue a streaming completion.
    ///
    /// Connection and HTTP status failures are reported here; failures
    /// while reading the body arrive as items of the returned stream.
    async fn stream_chat(&self, request: &StreamRequest) -> ChatResult<FragmentStream>;

    /// Issue a non-streaming completion and return the whole answer.
    async fn complete_chat(&self, request: &StreamRequest) -> ChatResult<String>;
}
