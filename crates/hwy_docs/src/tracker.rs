//! Concurrent document ingestion tracking.
//!
//! The tracker owns the list of [`DocumentRecord`]s and one progress
//! channel per in-flight document. Every mutation happens under a single
//! lock and is announced on a broadcast channel of [`TrackerEvent`]s.
//!
//! Each accepted document gets a generation number. A progress report or
//! analyzer result is applied only if a record with the same id and
//! generation still exists, so results arriving after [`DocumentTracker::remove`]
//! or [`DocumentTracker::clear`] are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::analyzer::DocumentAnalyzer;
use crate::config::TrackerConfig;
use crate::context::{self, format_file_size};
use crate::enrich::{detect_document_kind, enrich_analysis};
use crate::error::{DocumentError, DocumentResult};
use crate::types::{
    AnalysisResult, DocumentId, DocumentRecord, DocumentStatus, IncomingFile, ProgressUpdate,
};

/// Callback receiving progress reports for one document.
///
/// Callbacks run while the tracker lock is held and must not call back
/// into the tracker.
pub type ProgressCallback = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Milestone reported once the payload is encoded
pub const PREPARED_PERCENT: u8 = 30;
/// Milestone reported when the analyzer call is issued
pub const SUBMITTED_PERCENT: u8 = 60;
/// Final milestone
pub const COMPLETE_PERCENT: u8 = 100;

/// Notification emitted after every tracker mutation
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Added {
        document_id: DocumentId,
    },
    Progress {
        document_id: DocumentId,
        percentage: u8,
        status: DocumentStatus,
        status_text: String,
    },
    Completed {
        document_id: DocumentId,
    },
    Failed {
        document_id: DocumentId,
        message: String,
    },
    Removed {
        document_id: DocumentId,
    },
}

/// Result of driving one document through analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Analysis attached, record is `Ready`
    Ready,
    /// Analyzer failed, record is `Error` with this message
    Failed(String),
    /// Record was removed while in flight; the result was dropped
    Discarded,
}

struct ProgressChannel {
    callback: Option<ProgressCallback>,
}

struct TrackedDocument {
    record: DocumentRecord,
    generation: u64,
    payload: Option<Vec<u8>>,
    started: bool,
}

#[derive(Default)]
struct TrackerState {
    documents: Vec<TrackedDocument>,
    channels: HashMap<DocumentId, ProgressChannel>,
}

impl TrackerState {
    fn find_mut(&mut self, id: &str, generation: u64) -> Option<&mut TrackedDocument> {
        self.documents
            .iter_mut()
            .find(|d| d.record.id == id && d.generation == generation)
    }
}

/// Tracks many documents through validation, upload and analysis.
pub struct DocumentTracker<A: DocumentAnalyzer> {
    analyzer: Arc<A>,
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    events: broadcast::Sender<TrackerEvent>,
    next_generation: AtomicU64,
}

impl<A: DocumentAnalyzer> DocumentTracker<A> {
    pub fn new(analyzer: Arc<A>, config: TrackerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            analyzer,
            config,
            state: Mutex::new(TrackerState::default()),
            events,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<A> {
        &self.analyzer
    }

    /// Subscribe to tracker events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Check a file against the configured type and size limits.
    pub fn validate(&self, file: &IncomingFile) -> DocumentResult<()> {
        if !self.config.is_supported(&file.mime_type) {
            return Err(DocumentError::Validation(format!(
                "Unsupported file type for \"{}\": {}. Please upload a PDF document.",
                file.name, file.mime_type
            )));
        }
        if file.size() == 0 {
            return Err(DocumentError::Validation(format!(
                "File \"{}\" is empty",
                file.name
            )));
        }
        if file.size() > self.config.max_file_size {
            return Err(DocumentError::Validation(format!(
                "File \"{}\" is too large ({}). Maximum size is {}.",
                file.name,
                format_file_size(file.size()),
                format_file_size(self.config.max_file_size)
            )));
        }
        Ok(())
    }

    /// Validate a file and start tracking it at 0%.
    pub fn accept(&self, file: IncomingFile) -> DocumentResult<DocumentId> {
        self.accept_inner(file, None)
    }

    /// Like [`accept`](Self::accept), registering a progress callback.
    pub fn accept_with_progress(
        &self,
        file: IncomingFile,
        callback: ProgressCallback,
    ) -> DocumentResult<DocumentId> {
        self.accept_inner(file, Some(callback))
    }

    fn accept_inner(
        &self,
        file: IncomingFile,
        callback: Option<ProgressCallback>,
    ) -> DocumentResult<DocumentId> {
        if let Err(e) = self.validate(&file) {
            tracing::warn!(file_name = %file.name, "Rejected document: {}", e);
            return Err(e);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let size = file.size();
        let record = DocumentRecord {
            id: id.clone(),
            name: file.name.clone(),
            size,
            mime_type: file.mime_type.clone(),
            status: DocumentStatus::Processing,
            progress: Some(0),
            content: String::new(),
            document_kind: None,
            analysis: None,
            error_message: None,
            uploaded_at: Utc::now(),
        };

        let mut state = self.state.lock();
        state.documents.push(TrackedDocument {
            record,
            generation,
            payload: Some(file.data),
            started: false,
        });
        state
            .channels
            .insert(id.clone(), ProgressChannel { callback });
        let _ = self.events.send(TrackerEvent::Added {
            document_id: id.clone(),
        });
        drop(state);

        tracing::info!(
            document_id = %id,
            file_name = %file.name,
            size = %format_file_size(size),
            "Document accepted"
        );
        Ok(id)
    }

    /// Attach or replace the progress callback of an in-flight document.
    pub fn set_progress_callback(&self, id: &str, callback: ProgressCallback) -> DocumentResult<()> {
        let mut state = self.state.lock();
        match state.channels.get_mut(id) {
            Some(channel) => {
                channel.callback = Some(callback);
                Ok(())
            }
            None => Err(DocumentError::NotFound(id.to_string())),
        }
    }

    /// Whether the document still has a registered progress channel
    pub fn has_channel(&self, id: &str) -> bool {
        self.state.lock().channels.contains_key(id)
    }

    /// Drive a document through encoding and analysis.
    ///
    /// May run at most once per document. Analyzer failures are recorded on
    /// the document and reported as [`ProcessOutcome::Failed`]; `Err` is only
    /// returned when the document is unknown or already processed.
    pub async fn process(&self, id: &str) -> DocumentResult<ProcessOutcome> {
        let (generation, name, payload) = {
            let mut state = self.state.lock();
            let doc = state
                .documents
                .iter_mut()
                .find(|d| d.record.id == id)
                .ok_or_else(|| DocumentError::NotFound(id.to_string()))?;

            if doc.started || doc.record.status.is_terminal() {
                return Err(DocumentError::AlreadyProcessed(id.to_string()));
            }
            doc.started = true;
            (
                doc.generation,
                doc.record.name.clone(),
                doc.payload.take().unwrap_or_default(),
            )
        };

        tracing::debug!(document_id = %id, file_name = %name, "Encoding document");
        let encoded = base64::engine::general_purpose::STANDARD.encode(&payload);
        drop(payload);

        if !self.report(
            id,
            generation,
            PREPARED_PERCENT,
            DocumentStatus::Processing,
            "Preparing PDF upload...",
        ) {
            return Ok(self.discarded(id));
        }
        if !self.report(
            id,
            generation,
            SUBMITTED_PERCENT,
            DocumentStatus::Analyzing,
            "Submitting to analyzer...",
        ) {
            return Ok(self.discarded(id));
        }

        let result = self.analyzer.analyze_pdf(&encoded, &name).await;
        Ok(self.complete(id, generation, &name, result))
    }

    /// Accept a file and process it in one go.
    pub async fn ingest(&self, file: IncomingFile) -> DocumentResult<(DocumentId, ProcessOutcome)> {
        let id = self.accept(file)?;
        let outcome = self.process(&id).await?;
        Ok((id, outcome))
    }

    fn discarded(&self, id: &str) -> ProcessOutcome {
        tracing::debug!(document_id = %id, "Document removed while in flight, dropping result");
        ProcessOutcome::Discarded
    }

    /// Apply one progress milestone. Returns false if the document is gone.
    fn report(
        &self,
        id: &str,
        generation: u64,
        percentage: u8,
        status: DocumentStatus,
        status_text: &str,
    ) -> bool {
        let mut state = self.state.lock();
        let Some(doc) = state.find_mut(id, generation) else {
            return false;
        };

        let current = doc.record.progress.unwrap_or(0);
        if percentage < current || !doc.record.status.can_advance_to(status) {
            tracing::warn!(
                document_id = %id,
                percentage,
                current,
                "Ignoring out-of-order progress report"
            );
            return true;
        }
        doc.record.progress = Some(percentage);
        doc.record.status = status;

        self.notify(&state, id, percentage, status, status_text);
        true
    }

    /// Run the document's callback and broadcast the progress event.
    /// Called with the tracker lock held.
    fn notify(
        &self,
        state: &TrackerState,
        id: &str,
        percentage: u8,
        status: DocumentStatus,
        status_text: &str,
    ) {
        let update = ProgressUpdate {
            document_id: id.to_string(),
            percentage,
            status_text: status_text.to_string(),
        };
        if let Some(callback) = state.channels.get(id).and_then(|c| c.callback.as_ref()) {
            callback(&update);
        }

        let _ = self.events.send(TrackerEvent::Progress {
            document_id: id.to_string(),
            percentage,
            status,
            status_text: update.status_text,
        });
        tracing::debug!(document_id = %id, percentage, status = status.label(), "Progress");
    }

    /// Apply the analyzer result and the final milestone in one update.
    fn complete(
        &self,
        id: &str,
        generation: u64,
        name: &str,
        result: DocumentResult<String>,
    ) -> ProcessOutcome {
        let result = result.map(|text| {
            let kind = detect_document_kind(&text, name);
            let analysis = enrich_analysis(&text, kind);
            (text, kind, analysis)
        });
        let (status, status_text) = match &result {
            Ok(_) => (DocumentStatus::Ready, "Analysis complete"),
            Err(_) => (DocumentStatus::Error, "Analysis failed"),
        };

        let mut state = self.state.lock();
        let Some(doc) = state.find_mut(id, generation) else {
            return self.discarded(id);
        };

        doc.record.progress = Some(COMPLETE_PERCENT);
        doc.record.status = status;
        let (outcome, event) = match result {
            Ok((text, kind, analysis)) => {
                tracing::info!(
                    document_id = %id,
                    file_name = %name,
                    kind = kind.display_name(),
                    score = ?analysis.compliance_score,
                    "Document ready"
                );
                doc.record.content = text;
                doc.record.document_kind = Some(kind);
                doc.record.analysis = Some(analysis);
                (
                    ProcessOutcome::Ready,
                    TrackerEvent::Completed {
                        document_id: id.to_string(),
                    },
                )
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(document_id = %id, file_name = %name, "Document analysis failed: {}", message);
                doc.record.error_message = Some(message.clone());
                doc.record.analysis = Some(AnalysisResult::failure(message.clone()));
                (
                    ProcessOutcome::Failed(message.clone()),
                    TrackerEvent::Failed {
                        document_id: id.to_string(),
                        message,
                    },
                )
            }
        };

        self.notify(&state, id, COMPLETE_PERCENT, status, status_text);
        state.channels.remove(id);
        let _ = self.events.send(event);
        outcome
    }

    /// Stop tracking a document. In-flight analysis is not cancelled; its
    /// result is dropped when it arrives.
    pub fn remove(&self, id: &str) -> Option<DocumentRecord> {
        let mut state = self.state.lock();
        let index = state.documents.iter().position(|d| d.record.id == id)?;
        let doc = state.documents.remove(index);
        state.channels.remove(id);
        let _ = self.events.send(TrackerEvent::Removed {
            document_id: id.to_string(),
        });
        drop(state);

        tracing::info!(document_id = %id, file_name = %doc.record.name, "Document removed");
        Some(doc.record)
    }

    /// Remove every document and channel.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let removed: Vec<TrackedDocument> = state.documents.drain(..).collect();
        state.channels.clear();
        for doc in &removed {
            let _ = self.events.send(TrackerEvent::Removed {
                document_id: doc.record.id.clone(),
            });
        }
        drop(state);

        tracing::info!(count = removed.len(), "Cleared documents");
    }

    /// Snapshot of all records in upload order
    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.state
            .lock()
            .documents
            .iter()
            .map(|d| d.record.clone())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.state
            .lock()
            .documents
            .iter()
            .find(|d| d.record.id == id)
            .map(|d| d.record.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// System context for chat built from every ready document
    pub fn chat_context(&self) -> Option<String> {
        let state = self.state.lock();
        context::chat_context(state.documents.iter().map(|d| &d.record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MockDocumentAnalyzer;

    fn pdf(name: &str, size: usize) -> IncomingFile {
        IncomingFile::new(name, "application/pdf", vec![b'%'; size])
    }

    #[test]
    fn test_validation_messages() {
        let tracker = DocumentTracker::new(
            Arc::new(MockDocumentAnalyzer::new()),
            TrackerConfig::default().max_file_size(1024),
        );

        let err = tracker
            .validate(&IncomingFile::new("notes.txt", "text/plain", vec![1]))
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));

        let err = tracker.validate(&pdf("big.pdf", 2048)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File \"big.pdf\" is too large (2 KB). Maximum size is 1 KB."
        );

        assert!(tracker.validate(&pdf("empty.pdf", 0)).is_err());
        assert!(tracker.validate(&pdf("ok.pdf", 1024)).is_ok());
    }

    #[tokio::test]
    async fn test_process_sends_base64_payload() {
        let mut analyzer = MockDocumentAnalyzer::new();
        analyzer
            .expect_analyze_pdf()
            .withf(|payload, name| &payload[..] == "JVBERg==" && &name[..] == "road.pdf")
            .times(1)
            .returning(|_, _| Ok("All clear, IRC 37 compliant.".to_string()));

        let tracker = DocumentTracker::new(Arc::new(analyzer), TrackerConfig::default());
        let id = tracker
            .accept(IncomingFile::new("road.pdf", "application/pdf", b"%PDF".to_vec()))
            .unwrap();

        assert_eq!(tracker.process(&id).await.unwrap(), ProcessOutcome::Ready);

        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, DocumentStatus::Ready);
        assert_eq!(record.progress, Some(100));
        assert_eq!(record.size, 4);
        assert_eq!(record.content, "All clear, IRC 37 compliant.");
        assert!(!tracker.has_channel(&id));
    }

    #[tokio::test]
    async fn test_analyzer_failure_is_recorded() {
        let mut analyzer = MockDocumentAnalyzer::new();
        analyzer
            .expect_analyze_pdf()
            .returning(|_, _| Err(DocumentError::Remote("quota exceeded".to_string())));

        let tracker = DocumentTracker::new(Arc::new(analyzer), TrackerConfig::default());
        let id = tracker.accept(pdf("a.pdf", 16)).unwrap();

        let outcome = tracker.process(&id).await.unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Failed("Analysis failed: quota exceeded".to_string())
        );

        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, DocumentStatus::Error);
        assert_eq!(
            record.error_message.as_deref(),
            Some("Analysis failed: quota exceeded")
        );
        let analysis = record.analysis.unwrap();
        assert!(!analysis.success);
        assert!(analysis.compliance_score.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ready_event_sees_attached_analysis() {
        const DOCUMENTS: usize = 200;

        let mut analyzer = MockDocumentAnalyzer::new();
        analyzer
            .expect_analyze_pdf()
            .returning(|_, _| Ok("IRC 37 checks passed".to_string()));
        let config = TrackerConfig {
            event_capacity: 8 * DOCUMENTS,
            ..TrackerConfig::default()
        };
        let tracker = Arc::new(DocumentTracker::new(Arc::new(analyzer), config));

        let mut events = tracker.subscribe();
        let watcher = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                let mut incomplete = 0;
                let mut completed = 0;
                while completed < DOCUMENTS {
                    match events.recv().await {
                        Ok(TrackerEvent::Progress {
                            document_id,
                            status: DocumentStatus::Ready,
                            ..
                        }) => {
                            let record = tracker.get(&document_id).unwrap();
                            if record.analysis.is_none() || record.content.is_empty() {
                                incomplete += 1;
                            }
                        }
                        Ok(TrackerEvent::Completed { .. }) => completed += 1,
                        Ok(_) => {}
                        Err(e) => panic!("watcher stopped early: {}", e),
                    }
                }
                incomplete
            })
        };

        for i in 0..DOCUMENTS {
            let (_, outcome) = tracker.ingest(pdf(&format!("doc-{}.pdf", i), 16)).await.unwrap();
            assert_eq!(outcome, ProcessOutcome::Ready);
        }

        assert_eq!(watcher.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_progress_and_event_are_consistent() {
        let mut analyzer = MockDocumentAnalyzer::new();
        analyzer
            .expect_analyze_pdf()
            .returning(|_, _| Err(DocumentError::Remote("quota exceeded".to_string())));

        let tracker = DocumentTracker::new(Arc::new(analyzer), TrackerConfig::default());
        let mut events = tracker.subscribe();
        let id = tracker.accept(pdf("a.pdf", 16)).unwrap();
        tracker.process(&id).await.unwrap();

        let mut tail = Vec::new();
        while let Ok(event) = events.try_recv() {
            tail.push(event);
        }
        let n = tail.len();
        assert!(matches!(
            &tail[n - 2],
            TrackerEvent::Progress { percentage: 100, status: DocumentStatus::Error, .. }
        ));
        assert!(matches!(&tail[n - 1], TrackerEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn test_process_unknown_document() {
        let tracker =
            DocumentTracker::new(Arc::new(MockDocumentAnalyzer::new()), TrackerConfig::default());
        let err = tracker.process("missing").await.unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[test]
    fn test_set_progress_callback_requires_channel() {
        let tracker =
            DocumentTracker::new(Arc::new(MockDocumentAnalyzer::new()), TrackerConfig::default());
        let id = tracker.accept(pdf("a.pdf", 16)).unwrap();

        assert!(tracker.set_progress_callback(&id, Box::new(|_| {})).is_ok());
        tracker.remove(&id);
        assert!(tracker.set_progress_callback(&id, Box::new(|_| {})).is_err());
        assert!(!tracker.has_channel(&id));
    }

    #[test]
    fn test_clear_removes_everything() {
        let tracker =
            DocumentTracker::new(Arc::new(MockDocumentAnalyzer::new()), TrackerConfig::default());
        let mut events = tracker.subscribe();
        tracker.accept(pdf("a.pdf", 16)).unwrap();
        tracker.accept(pdf("b.pdf", 16)).unwrap();

        tracker.clear();
        assert!(tracker.is_empty());

        let mut removed = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TrackerEvent::Removed { .. }) {
                removed += 1;
            }
        }
        assert_eq!(removed, 2);
    }
}
