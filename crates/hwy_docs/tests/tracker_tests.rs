//! Integration tests for the document tracker.
//!
//! A scripted analyzer stands in for the analysis service; gated answers
//! keep a document in flight while the test removes or inspects it.

use std::sync::Arc;
use std::time::Duration;

use hwy_docs::{
    DocumentError, DocumentKind, DocumentStatus, DocumentTracker, IncomingFile, ProcessOutcome,
    ProgressUpdate, ScriptedAnalyzer, TrackerConfig, TrackerEvent,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

const SCHEDULE_ANALYSIS: &str = "SUBTASK 1: CLAUSES
- Schedule B clause 2.1: carriageway 7.0m

SUBTASK 3: IRC CODE COMPLIANCE CHECK
| Element | Dimension | Relevant IRC Code | Remarks |
| Carriageway | 7.0m | IRC 86-1983 | ✅ Compliant |
| Shoulder | 1.5m | IRC 37-2018 | ❌ Below 2.5m |

SUBTASK 4: DIFFERENCES
- Median type is missing from cross section 3
";

fn tracker(analyzer: &ScriptedAnalyzer) -> Arc<DocumentTracker<ScriptedAnalyzer>> {
    Arc::new(DocumentTracker::new(
        Arc::new(analyzer.clone()),
        TrackerConfig::default(),
    ))
}

fn pdf(name: &str, size: usize) -> IncomingFile {
    IncomingFile::new(name, "application/pdf", vec![b'%'; size])
}

async fn next_event(rx: &mut broadcast::Receiver<TrackerEvent>) -> TrackerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for tracker event")
        .expect("event channel closed")
}

/// Wait until the document has been handed to the analyzer.
async fn wait_until_analyzing(rx: &mut broadcast::Receiver<TrackerEvent>, id: &str) {
    loop {
        if let TrackerEvent::Progress {
            document_id,
            status: DocumentStatus::Analyzing,
            ..
        } = next_event(rx).await
        {
            if document_id == id {
                return;
            }
        }
    }
}

#[tokio::test]
async fn test_highway_schedule_lifecycle() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.push_answer("highway_schedule.pdf", Ok(SCHEDULE_ANALYSIS.to_string()));
    let tracker = tracker(&analyzer);
    let mut events = tracker.subscribe();

    let id = tracker.accept(pdf("highway_schedule.pdf", 3 * 1024 * 1024)).unwrap();
    let record = tracker.get(&id).unwrap();
    assert_eq!(record.status, DocumentStatus::Processing);
    assert_eq!(record.progress, Some(0));

    assert_eq!(tracker.process(&id).await.unwrap(), ProcessOutcome::Ready);

    let mut observed = Vec::new();
    loop {
        match next_event(&mut events).await {
            TrackerEvent::Progress {
                percentage, status, ..
            } => observed.push((status, percentage)),
            TrackerEvent::Completed { document_id } => {
                assert_eq!(document_id, id);
                break;
            }
            _ => {}
        }
    }
    assert_eq!(
        observed,
        vec![
            (DocumentStatus::Processing, 30),
            (DocumentStatus::Analyzing, 60),
            (DocumentStatus::Ready, 100),
        ]
    );

    let record = tracker.get(&id).unwrap();
    assert_eq!(record.status, DocumentStatus::Ready);
    assert_eq!(record.document_kind, Some(DocumentKind::HighwayEngineering));
    let analysis = record.analysis.expect("analysis attached");
    assert!(analysis.success);
    assert!(analysis.compliance_score.is_some());
    assert_eq!(
        analysis.recommendations,
        Some(vec!["Review Shoulder - ❌ Below 2.5m".to_string()])
    );

    let calls = analyzer.calls();
    assert_eq!(calls.len(), 1);
    // 3 MiB of base64 is 4 MiB of text
    assert_eq!(calls[0].payload_len, 4 * 1024 * 1024);
}

#[tokio::test]
async fn test_oversized_file_rejected() {
    let analyzer = ScriptedAnalyzer::new();
    let tracker = tracker(&analyzer);

    let err = tracker.accept(pdf("huge.pdf", 60 * 1024 * 1024)).unwrap_err();
    assert!(matches!(err, DocumentError::Validation(_)));
    assert!(err.to_string().contains("too large"));
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn test_unsupported_type_rejected() {
    let analyzer = ScriptedAnalyzer::new();
    let tracker = tracker(&analyzer);
    let mut events = tracker.subscribe();

    let err = tracker
        .accept(IncomingFile::new("notes.txt", "text/plain", b"hello".to_vec()))
        .unwrap_err();
    assert!(matches!(err, DocumentError::Validation(_)));
    assert!(tracker.documents().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_progress_is_non_decreasing() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.push_answer("road.pdf", Ok("General notes.".to_string()));
    let tracker = tracker(&analyzer);

    let seen: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::default();
    let sink = seen.clone();
    let id = tracker
        .accept_with_progress(
            pdf("road.pdf", 1024),
            Box::new(move |update| sink.lock().push(update.clone())),
        )
        .unwrap();
    assert!(tracker.has_channel(&id));

    tracker.process(&id).await.unwrap();

    let seen = seen.lock();
    let percentages: Vec<u8> = seen.iter().map(|u| u.percentage).collect();
    assert_eq!(percentages, vec![30, 60, 100]);
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen[0].status_text, "Preparing PDF upload...");
    assert_eq!(seen[2].status_text, "Analysis complete");
    assert!(!tracker.has_channel(&id));
}

#[tokio::test]
async fn test_removed_document_ignores_late_result() {
    let analyzer = ScriptedAnalyzer::new();
    let gate = analyzer.push_gated("slow.pdf");
    analyzer.push_answer("other.pdf", Ok("Other analysis".to_string()));
    let tracker = tracker(&analyzer);
    let mut events = tracker.subscribe();

    let slow = tracker.accept(pdf("slow.pdf", 512)).unwrap();
    let other = tracker.accept(pdf("other.pdf", 512)).unwrap();
    tracker.process(&other).await.unwrap();
    let other_before = tracker.get(&other).unwrap();

    let task = {
        let tracker = tracker.clone();
        let slow = slow.clone();
        tokio::spawn(async move { tracker.process(&slow).await })
    };
    wait_until_analyzing(&mut events, &slow).await;

    let removed = tracker.remove(&slow).unwrap();
    assert_eq!(removed.status, DocumentStatus::Analyzing);
    assert!(!tracker.has_channel(&slow));

    assert!(gate.resolve(Ok("Late analysis".to_string())));
    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, ProcessOutcome::Discarded);

    assert!(tracker.get(&slow).is_none());
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.get(&other).unwrap(), other_before);
}

#[tokio::test]
async fn test_failure_is_isolated() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.push_answer(
        "broken.pdf",
        Err(DocumentError::Connection("connection reset".to_string())),
    );
    analyzer.push_answer("good.pdf", Ok(SCHEDULE_ANALYSIS.to_string()));
    let tracker = tracker(&analyzer);

    let broken = tracker.accept(pdf("broken.pdf", 256)).unwrap();
    let good = tracker.accept(pdf("good.pdf", 256)).unwrap();

    let (broken_outcome, good_outcome) = tokio::join!(tracker.process(&broken), tracker.process(&good));
    assert!(matches!(broken_outcome.unwrap(), ProcessOutcome::Failed(_)));
    assert_eq!(good_outcome.unwrap(), ProcessOutcome::Ready);

    let broken = tracker.get(&broken).unwrap();
    assert_eq!(broken.status, DocumentStatus::Error);
    assert_eq!(
        broken.error_message.as_deref(),
        Some("Connection error: connection reset")
    );

    let good = tracker.get(&good).unwrap();
    assert_eq!(good.status, DocumentStatus::Ready);
    assert!(good.analysis.unwrap().success);
}

#[tokio::test]
async fn test_process_runs_at_most_once() {
    let analyzer = ScriptedAnalyzer::new();
    let gate = analyzer.push_gated("once.pdf");
    let tracker = tracker(&analyzer);
    let mut events = tracker.subscribe();

    let id = tracker.accept(pdf("once.pdf", 128)).unwrap();
    let task = {
        let tracker = tracker.clone();
        let id = id.clone();
        tokio::spawn(async move { tracker.process(&id).await })
    };
    wait_until_analyzing(&mut events, &id).await;

    // In flight
    let err = tracker.process(&id).await.unwrap_err();
    assert!(matches!(err, DocumentError::AlreadyProcessed(_)));

    gate.resolve(Ok("Done".to_string()));
    assert_eq!(task.await.unwrap().unwrap(), ProcessOutcome::Ready);

    // Terminal
    let err = tracker.process(&id).await.unwrap_err();
    assert!(matches!(err, DocumentError::AlreadyProcessed(_)));
    assert_eq!(analyzer.calls().len(), 1);
}

#[tokio::test]
async fn test_concurrent_documents_all_complete() {
    let analyzer = ScriptedAnalyzer::new();
    let names = ["a_road.pdf", "b_road.pdf", "c_road.pdf"];
    let gates: Vec<_> = names.iter().map(|n| analyzer.push_gated(n)).collect();
    let tracker = tracker(&analyzer);

    let mut tasks = Vec::new();
    for name in names {
        let id = tracker.accept(pdf(name, 64)).unwrap();
        let tracker = tracker.clone();
        tasks.push(tokio::spawn(async move { tracker.process(&id).await }));
    }

    // Resolve in reverse order
    for (gate, name) in gates.into_iter().zip(names).rev() {
        gate.resolve(Ok(format!("Analysis of {}", name)));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), ProcessOutcome::Ready);
    }

    let documents = tracker.documents();
    let order: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(order, names);
    assert!(documents
        .iter()
        .all(|d| d.content == format!("Analysis of {}", d.name)));
}

#[tokio::test]
async fn test_chat_context_from_ready_documents() {
    let analyzer = ScriptedAnalyzer::new();
    analyzer.push_answer("highway_schedule.pdf", Ok(SCHEDULE_ANALYSIS.to_string()));
    let tracker = tracker(&analyzer);

    assert!(tracker.chat_context().is_none());

    let (id, outcome) = tracker.ingest(pdf("highway_schedule.pdf", 1024)).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Ready);

    let context = tracker.chat_context().unwrap();
    assert!(context.contains("Document: highway_schedule.pdf"));
    assert!(context.contains("Compliance Score: "));

    let notice = tracker.get(&id).unwrap().completion_notice().unwrap();
    assert!(notice.contains("Highway engineering document \"highway_schedule.pdf\""));
}
