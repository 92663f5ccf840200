//! Scripted analyzer for driving the tracker without a network.
//!
//! Answers are queued per file name. A gated answer blocks the analyzer
//! call until the test resolves it, which lets tests remove or clear a
//! document while its analysis is in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::analyzer::DocumentAnalyzer;
use crate::error::{DocumentError, DocumentResult};

enum ScriptedAnswer {
    Ready(DocumentResult<String>),
    Gated(oneshot::Receiver<DocumentResult<String>>),
}

/// One recorded analyzer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerCall {
    pub file_name: String,
    pub payload_len: usize,
}

/// Handle releasing a gated answer
#[derive(Debug)]
pub struct AnswerGate {
    tx: oneshot::Sender<DocumentResult<String>>,
}

impl AnswerGate {
    /// Release the answer. Returns false if the analyzer call is gone.
    pub fn resolve(self, answer: DocumentResult<String>) -> bool {
        self.tx.send(answer).is_ok()
    }
}

#[derive(Default)]
struct ScriptState {
    answers: HashMap<String, VecDeque<ScriptedAnswer>>,
    calls: Vec<AnalyzerCall>,
}

/// [`DocumentAnalyzer`] returning queued answers
#[derive(Clone, Default)]
pub struct ScriptedAnalyzer {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an immediate answer for `file_name`
    pub fn push_answer(&self, file_name: &str, answer: DocumentResult<String>) {
        self.state
            .lock()
            .answers
            .entry(file_name.to_string())
            .or_default()
            .push_back(ScriptedAnswer::Ready(answer));
    }

    /// Queue an answer for `file_name` that waits until the gate is resolved
    pub fn push_gated(&self, file_name: &str) -> AnswerGate {
        let (tx, rx) = oneshot::channel();
        self.state
            .lock()
            .answers
            .entry(file_name.to_string())
            .or_default()
            .push_back(ScriptedAnswer::Gated(rx));
        AnswerGate { tx }
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<AnalyzerCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl DocumentAnalyzer for ScriptedAnalyzer {
    async fn analyze_pdf(&self, base64_pdf: &str, file_name: &str) -> DocumentResult<String> {
        let answer = {
            let mut state = self.state.lock();
            state.calls.push(AnalyzerCall {
                file_name: file_name.to_string(),
                payload_len: base64_pdf.len(),
            });
            state
                .answers
                .get_mut(file_name)
                .and_then(VecDeque::pop_front)
        };

        match answer {
            Some(ScriptedAnswer::Ready(answer)) => answer,
            Some(ScriptedAnswer::Gated(rx)) => rx.await.unwrap_or_else(|_| {
                Err(DocumentError::Connection("analyzer gate dropped".to_string()))
            }),
            None => Err(DocumentError::Remote(format!(
                "no scripted answer for {}",
                file_name
            ))),
        }
    }
}
