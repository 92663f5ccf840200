//! # hwy_chat - Streaming chat for Highway Desk
//!
//! This crate provides the chat side of Highway Desk:
//! - An Ollama client for model listing, health checks and chat completions
//! - An NDJSON frame decoder for streamed answers
//! - An observable [`Conversation`] that readers can subscribe to
//! - A [`StreamingChatConsumer`] that reconciles streamed fragments into
//!   one growing assistant message, with cancellation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  StreamRequest  ┌─────────────────┐   NDJSON   ┌────────────┐
//! │ StreamingChat   │────────────────▶│  ChatTransport  │───────────▶│   Ollama   │
//! │    Consumer     │◀────────────────│ (OllamaClient)  │◀───────────│   server   │
//! └────────┬────────┘    fragments    └─────────────────┘            └────────────┘
//!          │ append / remove
//!          ▼
//! ┌─────────────────┐   ConversationEvent   ┌─────────────────┐
//! │  Conversation   │──────────────────────▶│   Subscribers   │
//! └─────────────────┘                       └─────────────────┘
//! ```

pub mod config;
pub mod consumer;
pub mod conversation;
pub mod error;
pub mod models;
pub mod ollama;
pub mod scripted;
pub mod transport;
pub mod types;
pub mod wire;

pub use config::{OllamaConfig, DEFAULT_BASE_URL};
pub use consumer::{SendOptions, StreamingChatConsumer};
pub use conversation::{Conversation, ConversationEvent};
pub use error::{ChatError, ChatResult, ErrorKind};
pub use models::{format_model_name, model_description, ModelOption};
pub use ollama::OllamaClient;
pub use scripted::{LiveStream, ScriptedTransport, StreamScript};
pub use transport::{ChatTransport, StreamRequest};
pub use types::*;
pub use wire::{ChatTurn, FragmentStream};
