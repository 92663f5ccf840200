//! Ollama client for chat completions.
//!
//! Talks to a local (or remote) Ollama server over its REST API:
//! `/api/tags` for the model catalogue and health, `/api/chat` for
//! completions and `/api/generate` for model smoke tests.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::config::OllamaConfig;
use crate::error::{ChatError, ChatResult};
use crate::transport::{ChatTransport, StreamRequest};
use crate::types::ModelInfo;
use crate::wire::{
    self, ChatOptions, ChatRequestBody, FragmentStream, GenerateOptions, GenerateRequestBody,
    TagsResponse,
};

/// HTTP client for an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client with explicit configuration
    pub fn new(config: OllamaConfig) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChatError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from `OLLAMA_BASE_URL`
    pub fn from_env() -> ChatResult<Self> {
        Self::new(OllamaConfig::from_env())
    }

    /// Get the client configuration
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Run a tiny generation to check that a model actually loads and answers.
    pub async fn test_model(&self, model: &str) -> bool {
        tracing::info!(model, "Testing model");

        let body = GenerateRequestBody {
            model,
            prompt: "Hello",
            stream: false,
            options: GenerateOptions { num_predict: 5 },
        };

        let result = self
            .client
            .post(self.config.endpoint("/api/generate"))
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(model, "Model is working");
                true
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                tracing::warn!(model, status = status.as_u16(), "Model test failed: {}", text);
                false
            }
            Err(e) => {
                tracing::warn!(model, "Model test failed: {}", e);
                false
            }
        }
    }

    /// Sampling options for a request, falling back to the configured defaults.
    fn chat_options(&self, request: &StreamRequest) -> ChatOptions {
        ChatOptions::from(request.params.unwrap_or(self.config.default_params))
    }

    async fn post_chat(&self, request: &StreamRequest, stream: bool) -> ChatResult<reqwest::Response> {
        let body = ChatRequestBody {
            model: &request.model,
            messages: &request.messages,
            stream,
            options: self.chat_options(request),
        };

        let mut builder = self.client.post(self.config.endpoint("/api/chat")).json(&body);
        if !stream {
            builder = builder.timeout(self.config.request_timeout);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(model = %request.model, "Chat request failed: {}", e);
            ChatError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(model = %request.model, status = status.as_u16(), stream, "Chat response received");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Ollama API error response: {}", text);
            return Err(wire::remote_error(status.as_u16(), &text));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for OllamaClient {
    async fn check_health(&self) -> bool {
        let result = self
            .client
            .get(self.config.endpoint("/api/tags"))
            .timeout(self.config.connect_timeout)
            .send()
            .await;

        let healthy = matches!(&result, Ok(r) if r.status().is_success());
        tracing::info!(base_url = %self.config.base_url, healthy, "Ollama health check");
        healthy
    }

    async fn list_models(&self) -> ChatResult<Vec<ModelInfo>> {
        tracing::debug!(base_url = %self.config.base_url, "Fetching available models");

        let response = self
            .client
            .get(self.config.endpoint("/api/tags"))
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(wire::remote_error(status.as_u16(), &text));
        }

        let tags: TagsResponse = serde_json::from_str(&text)?;
        let models: Vec<ModelInfo> = tags.models.into_iter().map(ModelInfo::from).collect();
        tracing::info!(count = models.len(), "Available models loaded");
        Ok(models)
    }

    async fn stream_chat(&self, request: &StreamRequest) -> ChatResult<FragmentStream> {
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            "Starting streaming chat"
        );

        let response = self.post_chat(request, true).await?;
        let fragments = wire::decode_fragments(response.bytes_stream());
        Ok(with_idle_timeout(fragments, self.config.stream_idle_timeout))
    }

    async fn complete_chat(&self, request: &StreamRequest) -> ChatResult<String> {
        tracing::info!(model = %request.model, "Sending non-streaming chat");

        let response = self.post_chat(request, false).await?;
        let text = response.text().await?;
        wire::parse_complete(&text)
    }
}

/// End a fragment stream with a connection error when it stalls.
fn with_idle_timeout(fragments: FragmentStream, idle: Duration) -> FragmentStream {
    futures::stream::unfold(Some(fragments), move |state| async move {
        let mut fragments = state?;
        match tokio::time::timeout(idle, fragments.next()).await {
            Ok(Some(item)) => Some((item, Some(fragments))),
            Ok(None) => None,
            Err(_) => {
                tracing::error!(idle_secs = idle.as_secs(), "Stream stalled");
                let err = ChatError::Connection(format!(
                    "no data received for {} seconds",
                    idle.as_secs()
                ));
                Some((Err(err), None))
            }
        }
    })
    .boxed()
}
