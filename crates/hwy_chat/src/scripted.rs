//! Scripted chat transport for testing.
//!
//! Provides a [`ChatTransport`] that replays queued answers instead of
//! talking to a server, and records every request it receives.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::error::{ChatError, ChatResult};
use crate::transport::{ChatTransport, StreamRequest};
use crate::types::ModelInfo;
use crate::wire::FragmentStream;

/// One queued answer for `stream_chat`
pub enum StreamScript {
    /// Yield these items in order, then end
    Items(Vec<ChatResult<String>>),
    /// Yield whatever is pushed through the paired [`LiveStream`]
    Live(mpsc::UnboundedReceiver<ChatResult<String>>),
    /// Fail before any fragment, as if the connection was refused
    Refuse(ChatError),
}

impl StreamScript {
    /// A stream that yields the given fragments and ends normally
    pub fn fragments(fragments: &[&str]) -> Self {
        Self::Items(fragments.iter().map(|f| Ok(f.to_string())).collect())
    }
}

/// Sending half of a live scripted stream
#[derive(Clone)]
pub struct LiveStream {
    tx: mpsc::UnboundedSender<ChatResult<String>>,
}

impl LiveStream {
    /// Deliver a fragment; returns false once the consumer dropped the stream
    pub fn fragment(&self, fragment: &str) -> bool {
        self.tx.send(Ok(fragment.to_string())).is_ok()
    }

    /// Deliver a transport failure
    pub fn fail(&self, error: ChatError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }
}

/// Scripted transport for tests.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    unhealthy: Arc<RwLock<bool>>,
    models: Arc<RwLock<Vec<ModelInfo>>>,
    streams: Arc<Mutex<VecDeque<StreamScript>>>,
    completions: Arc<Mutex<VecDeque<ChatResult<String>>>>,
    requests: Arc<RwLock<Vec<StreamRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(self, names: &[&str]) -> Self {
        *self.models.write() = names
            .iter()
            .map(|name| ModelInfo {
                name: name.to_string(),
                size: 0,
                family: None,
                parameter_size: None,
            })
            .collect();
        self
    }

    pub fn unhealthy(self) -> Self {
        *self.unhealthy.write() = true;
        self
    }

    pub fn with_stream(self, script: StreamScript) -> Self {
        self.push_stream(script);
        self
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().push_back(script);
    }

    /// Queue a live stream and return the handle that feeds it.
    ///
    /// Dropping every clone of the handle ends the stream normally.
    pub fn push_live(&self) -> LiveStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_stream(StreamScript::Live(rx));
        LiveStream { tx }
    }

    pub fn push_completion(&self, answer: ChatResult<String>) {
        self.completions.lock().push_back(answer);
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.read().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn check_health(&self) -> bool {
        !*self.unhealthy.read()
    }

    async fn list_models(&self) -> ChatResult<Vec<ModelInfo>> {
        Ok(self.models.read().clone())
    }

    async fn stream_chat(&self, request: &StreamRequest) -> ChatResult<FragmentStream> {
        self.requests.write().push(request.clone());

        let script = self.streams.lock().pop_front();
        match script {
            Some(StreamScript::Items(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(StreamScript::Live(rx)) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            Some(StreamScript::Refuse(err)) => Err(err),
            None => Err(ChatError::Connection("no scripted stream queued".to_string())),
        }
    }

    async fn complete_chat(&self, request: &StreamRequest) -> ChatResult<String> {
        self.requests.write().push(request.clone());

        self.completions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Connection("no scripted answer queued".to_string())))
    }
}
