//! Observable conversation state.
//!
//! The conversation is a single ordered list of messages guarded by one
//! lock. Every mutation publishes a [`ConversationEvent`] while the lock is
//! still held, so subscribers see events in mutation order.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::{ChatError, ChatResult};
use crate::types::{Message, MessageId, MessageRole};

const EVENT_CAPACITY: usize = 256;

/// Notification emitted after each conversation mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A message was appended at the end
    MessageAppended { message_id: MessageId, role: MessageRole },
    /// A message's content changed; `content_len` is the new length in bytes
    MessageUpdated { message_id: MessageId, content_len: usize },
    /// A message was removed
    MessageRemoved { message_id: MessageId },
    /// A turn ended; the message is now final
    StreamFinished { message_id: MessageId, cancelled: bool },
    /// The conversation was cleared
    Reset,
}

/// Shared, cloneable handle to a conversation
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Arc<RwLock<Vec<Message>>>,
    events: broadcast::Sender<ConversationEvent>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    /// Start a conversation with an assistant greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let conversation = Self::new();
        conversation.push(Message::assistant(greeting));
        conversation
    }

    /// Subscribe to mutation notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Snapshot of all messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Message> {
        self.messages.read().iter().find(|m| m.id == id).cloned()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    /// Append a message and return its ID
    pub fn push(&self, message: Message) -> MessageId {
        let mut messages = self.messages.write();
        let id = message.id.clone();
        let role = message.role;
        messages.push(message);
        self.emit(ConversationEvent::MessageAppended {
            message_id: id.clone(),
            role,
        });
        id
    }

    /// Append a fragment to a message unless `cancel` has fired.
    ///
    /// Returns `Ok(false)` when the fragment was dropped because of
    /// cancellation. The check happens under the write lock, so no fragment
    /// lands after a cancellation has been observed.
    pub fn append_fragment(
        &self,
        id: &str,
        fragment: &str,
        cancel: &CancellationToken,
    ) -> ChatResult<bool> {
        let mut messages = self.messages.write();
        if cancel.is_cancelled() {
            return Ok(false);
        }
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))?;

        message.content.push_str(fragment);
        self.emit(ConversationEvent::MessageUpdated {
            message_id: id.to_string(),
            content_len: message.content.len(),
        });
        Ok(true)
    }

    /// Replace a message's content in one step
    pub fn set_content(&self, id: &str, content: impl Into<String>) -> ChatResult<()> {
        let mut messages = self.messages.write();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))?;

        message.content = content.into();
        self.emit(ConversationEvent::MessageUpdated {
            message_id: id.to_string(),
            content_len: message.content.len(),
        });
        Ok(())
    }

    /// Remove a message; returns it if it was present
    pub fn remove(&self, id: &str) -> Option<Message> {
        let mut messages = self.messages.write();
        let index = messages.iter().position(|m| m.id == id)?;
        let removed = messages.remove(index);
        self.emit(ConversationEvent::MessageRemoved {
            message_id: removed.id.clone(),
        });
        Some(removed)
    }

    /// Drop every message, optionally seeding a new greeting
    pub fn reset(&self, greeting: Option<String>) {
        let mut messages = self.messages.write();
        messages.clear();
        self.emit(ConversationEvent::Reset);
        if let Some(greeting) = greeting {
            let message = Message::assistant(greeting);
            self.emit(ConversationEvent::MessageAppended {
                message_id: message.id.clone(),
                role: message.role,
            });
            messages.push(message);
        }
    }

    /// Announce the end of a stream. Returns false, without emitting, if the
    /// message is no longer in the conversation.
    pub(crate) fn finish(&self, id: &str, cancelled: bool) -> bool {
        let messages = self.messages.read();
        if !messages.iter().any(|m| m.id == id) {
            return false;
        }
        self.emit(ConversationEvent::StreamFinished {
            message_id: id.to_string(),
            cancelled,
        });
        true
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
