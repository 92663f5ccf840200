//! Streaming chat consumer.
//!
//! Turns the fragments of one chat completion into a single, growing
//! assistant message:
//!
//! 1. the user message and an empty assistant placeholder are appended
//! 2. every fragment is concatenated onto the placeholder as it arrives
//! 3. on error the placeholder is removed; on cancellation it is kept
//!
//! At most one turn is active per consumer. Starting a new turn cancels the
//! previous one, which keeps whatever content it had received.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;
use crate::error::{ChatError, ChatResult};
use crate::transport::{ChatTransport, StreamRequest};
use crate::types::{GenerationParams, Message, MessageId, MessageRole, ModelInfo, StreamOutcome};
use crate::wire::ChatTurn;

/// Per-turn options
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Target model identifier
    pub model: String,
    /// Sampling parameters; the transport's defaults apply when unset
    pub params: Option<GenerationParams>,
    /// Extra system prompt sent ahead of the history but never stored
    pub system_context: Option<String>,
}

impl SendOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            params: None,
            system_context: None,
        }
    }

    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn system_context(mut self, context: Option<String>) -> Self {
        self.system_context = context;
        self
    }
}

struct ActiveTurn {
    message_id: MessageId,
    cancel: CancellationToken,
}

struct Turn {
    placeholder_id: MessageId,
    cancel: CancellationToken,
    request: StreamRequest,
}

/// Drives chat turns against a [`ChatTransport`] and reconciles them into a
/// [`Conversation`].
pub struct StreamingChatConsumer<T: ChatTransport> {
    transport: Arc<T>,
    conversation: Conversation,
    active: Mutex<Option<ActiveTurn>>,
}

impl<T: ChatTransport> StreamingChatConsumer<T> {
    pub fn new(transport: Arc<T>, conversation: Conversation) -> Self {
        Self {
            transport,
            conversation,
            active: Mutex::new(None),
        }
    }

    /// The conversation this consumer writes to
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Check the backend and load its models.
    ///
    /// Fails with [`ChatError::NotConnected`] when the health check fails;
    /// callers should not send until this succeeds.
    pub async fn load_models(&self, base_url: &str) -> ChatResult<Vec<ModelInfo>> {
        if !self.transport.check_health().await {
            return Err(ChatError::NotConnected(base_url.to_string()));
        }
        self.transport.list_models().await
    }

    /// Whether a turn is currently in flight
    pub fn is_streaming(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Request early termination of the active turn.
    ///
    /// Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(turn) => {
                tracing::info!(message_id = %turn.message_id, "Cancelling active stream");
                turn.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel any active turn and clear the conversation.
    pub fn reset(&self, greeting: Option<String>) {
        self.cancel();
        self.conversation.reset(greeting);
    }

    /// Send a user message and stream the answer into the conversation.
    pub async fn send(&self, text: &str, options: &SendOptions) -> ChatResult<StreamOutcome> {
        let turn = self.begin_turn(text, options)?;
        let result = self.stream_turn(&turn).await;
        self.finish_turn(turn, result)
    }

    /// Send a user message and fill the placeholder with the whole answer at once.
    pub async fn send_complete(&self, text: &str, options: &SendOptions) -> ChatResult<StreamOutcome> {
        let turn = self.begin_turn(text, options)?;
        let result = self.complete_turn(&turn).await;
        self.finish_turn(turn, result)
    }

    fn begin_turn(&self, text: &str, options: &SendOptions) -> ChatResult<Turn> {
        if text.trim().is_empty() {
            return Err(ChatError::Validation("message is empty".to_string()));
        }
        if options.model.trim().is_empty() {
            return Err(ChatError::Validation("no model selected".to_string()));
        }

        let mut messages: Vec<ChatTurn> = Vec::new();
        if let Some(context) = options.system_context.as_deref().filter(|c| !c.is_empty()) {
            messages.push(ChatTurn {
                role: MessageRole::System,
                content: context.to_string(),
            });
        }
        messages.extend(
            self.conversation
                .messages()
                .iter()
                .filter(|m| m.role != MessageRole::System && !m.content.is_empty())
                .map(ChatTurn::from),
        );

        let user = Message::user(text);
        messages.push(ChatTurn::from(&user));

        let cancel = CancellationToken::new();
        let placeholder_id = {
            let mut active = self.active.lock();
            if let Some(previous) = active.take() {
                tracing::info!(
                    message_id = %previous.message_id,
                    "New turn started, cancelling previous stream"
                );
                previous.cancel.cancel();
            }

            self.conversation.push(user);
            let placeholder_id = self.conversation.push(Message::placeholder());
            *active = Some(ActiveTurn {
                message_id: placeholder_id.clone(),
                cancel: cancel.clone(),
            });
            placeholder_id
        };

        Ok(Turn {
            placeholder_id,
            cancel,
            request: StreamRequest {
                model: options.model.clone(),
                messages,
                params: options.params.map(GenerationParams::normalized),
            },
        })
    }

    /// Returns whether the turn was cancelled.
    async fn stream_turn(&self, turn: &Turn) -> ChatResult<bool> {
        let id = &turn.placeholder_id;

        let mut fragments = tokio::select! {
            biased;
            _ = turn.cancel.cancelled() => return Ok(true),
            opened = self.transport.stream_chat(&turn.request) => opened?,
        };

        let mut received = 0usize;
        loop {
            tokio::select! {
                biased;
                _ = turn.cancel.cancelled() => return Ok(true),
                next = fragments.next() => match next {
                    Some(Ok(fragment)) => {
                        if !self.conversation.append_fragment(id, &fragment, &turn.cancel)? {
                            return Ok(true);
                        }
                        received += 1;
                        tracing::trace!(message_id = %id, received, "Applied fragment");
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        tracing::debug!(message_id = %id, received, "Stream completed");
                        return Ok(false);
                    }
                },
            }
        }
    }

    async fn complete_turn(&self, turn: &Turn) -> ChatResult<bool> {
        let content = tokio::select! {
            biased;
            _ = turn.cancel.cancelled() => return Ok(true),
            answer = self.transport.complete_chat(&turn.request) => answer?,
        };

        // Cancellation may land while the answer is being applied; the
        // placeholder then stays as it is.
        if turn.cancel.is_cancelled() {
            return Ok(true);
        }
        self.conversation.set_content(&turn.placeholder_id, content)?;
        Ok(false)
    }

    fn finish_turn(&self, turn: Turn, result: ChatResult<bool>) -> ChatResult<StreamOutcome> {
        {
            let mut active = self.active.lock();
            if active.as_ref().map(|a| &a.message_id) == Some(&turn.placeholder_id) {
                *active = None;
            }
        }

        let id = turn.placeholder_id;
        match result {
            Ok(cancelled) => {
                let content = self
                    .conversation
                    .get(&id)
                    .map(|m| m.content)
                    .unwrap_or_default();
                if !self.conversation.finish(&id, cancelled) {
                    tracing::debug!(message_id = %id, "Turn ended after its message was cleared");
                }

                if cancelled {
                    tracing::info!(message_id = %id, len = content.len(), "Stream cancelled");
                    Ok(StreamOutcome::Cancelled { message_id: id, content })
                } else {
                    tracing::info!(message_id = %id, len = content.len(), "Stream finished");
                    Ok(StreamOutcome::Completed { message_id: id, content })
                }
            }
            Err(e) => {
                tracing::error!(message_id = %id, "Chat turn failed: {}", e);
                self.conversation.remove(&id);
                Err(e)
            }
        }
    }
}
