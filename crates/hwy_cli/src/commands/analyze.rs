//! Analyze command - Run documents through the tracker and report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::info;

use hwy_docs::{
    format_file_size, DocumentAnalyzer, DocumentRecord, DocumentTracker, GeminiClient,
    IncomingFile, ProcessOutcome, TrackerEvent,
};

use crate::settings::Settings;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// PDF files to analyse
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Print the resulting records as JSON
    #[arg(long)]
    json: bool,
}

/// One file's ingestion result
pub struct IngestReport {
    pub path: PathBuf,
    pub result: Result<ProcessOutcome>,
    pub record: Option<DocumentRecord>,
}

/// Build a tracker backed by the Gemini analyzer.
pub fn gemini_tracker(settings: &Settings) -> Result<Arc<DocumentTracker<GeminiClient>>> {
    let client = GeminiClient::new(settings.gemini_config()?)?;
    info!(model = %client.config().model, "Using Gemini for document analysis");
    Ok(Arc::new(DocumentTracker::new(
        Arc::new(client),
        settings.tracker_config(),
    )))
}

async fn ingest_one<A: DocumentAnalyzer>(tracker: &DocumentTracker<A>, path: &Path) -> IngestReport {
    let result = async {
        let file = IncomingFile::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = file.name.clone();
        let (id, outcome) = tracker
            .ingest(file)
            .await
            .with_context(|| format!("Failed to ingest {}", name))?;
        Ok::<_, anyhow::Error>((id, outcome))
    }
    .await;

    match result {
        Ok((id, outcome)) => IngestReport {
            path: path.to_path_buf(),
            result: Ok(outcome),
            record: tracker.get(&id),
        },
        Err(e) => IngestReport {
            path: path.to_path_buf(),
            result: Err(e),
            record: None,
        },
    }
}

fn print_event<A: DocumentAnalyzer>(tracker: &DocumentTracker<A>, event: &TrackerEvent) {
    if let TrackerEvent::Progress {
        document_id,
        percentage,
        status_text,
        ..
    } = event
    {
        if let Some(record) = tracker.get(document_id) {
            println!("   ⏳ {:>3}% {} - {}", percentage, record.name, status_text);
        }
    }
}

/// Ingest every file concurrently, printing progress as it arrives.
pub async fn ingest_files<A: DocumentAnalyzer>(
    tracker: &DocumentTracker<A>,
    files: &[PathBuf],
) -> Vec<IngestReport> {
    let mut events = tracker.subscribe();
    let ingest = join_all(files.iter().map(|path| ingest_one(tracker, path)));
    tokio::pin!(ingest);

    let reports = loop {
        tokio::select! {
            reports = &mut ingest => break reports,
            event = events.recv() => match event {
                Ok(event) => print_event(tracker, &event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {}
            },
        }
    };

    while let Ok(event) = events.try_recv() {
        print_event(tracker, &event);
    }
    reports
}

/// Print the outcome of one ingested file.
pub fn print_report(report: &IngestReport) {
    println!();
    match (&report.result, &report.record) {
        (Ok(_), Some(record)) => {
            if let Some(notice) = record.completion_notice() {
                println!("{}", notice);
            }
        }
        (Ok(outcome), None) => println!("{}: {:?}", report.path.display(), outcome),
        (Err(e), _) => println!("❌ {:#}", e),
    }
}

pub async fn execute(args: AnalyzeArgs, settings: Settings) -> Result<()> {
    let tracker = gemini_tracker(&settings)?;

    println!("📄 Analysing {} document(s)...", args.files.len());
    for path in &args.files {
        if let Ok(meta) = std::fs::metadata(path) {
            println!("   • {} ({})", path.display(), format_file_size(meta.len()));
        }
    }
    println!();

    let reports = ingest_files(&tracker, &args.files).await;

    if args.json {
        let records: Vec<&DocumentRecord> = reports.iter().filter_map(|r| r.record.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    let failed = reports
        .iter()
        .filter(|r| !matches!(r.result, Ok(ProcessOutcome::Ready)))
        .count();

    println!();
    if failed == 0 {
        println!("✅ All documents analysed");
        return Ok(());
    }

    // Surface the first typed error so the exit code reflects its category
    let first_error = reports.into_iter().find_map(|r| r.result.err());
    match first_error {
        Some(e) => Err(e.context(format!("{} of {} documents failed", failed, args.files.len()))),
        None => anyhow::bail!("{} of {} documents failed analysis", failed, args.files.len()),
    }
}
