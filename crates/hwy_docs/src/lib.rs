//! # hwy_docs - Document ingestion for Highway Desk
//!
//! Tracks uploaded engineering documents through validation, upload to an
//! external analyzer and best-effort extraction of compliance findings.
//!
//! ## Lifecycle
//!
//! ```text
//! accept ──▶ Processing(0) ──▶ Processing(30) ──▶ Analyzing(60) ──┬─▶ Ready(100)
//!                                                                 └─▶ Error
//! ```
//!
//! Every step is announced as a [`TrackerEvent`]; ready documents feed the
//! chat through [`DocumentTracker::chat_context`].

pub mod analyzer;
pub mod config;
pub mod context;
pub mod enrich;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod scripted;
pub mod tracker;
pub mod types;

pub use analyzer::DocumentAnalyzer;
pub use config::{GeminiConfig, TrackerConfig, DEFAULT_MAX_FILE_SIZE};
pub use context::{chat_context, format_file_size};
pub use enrich::{detect_document_kind, enrich_analysis};
pub use error::{DocumentError, DocumentResult};
pub use gemini::GeminiClient;
pub use scripted::{AnalyzerCall, AnswerGate, ScriptedAnalyzer};
pub use tracker::{DocumentTracker, ProcessOutcome, ProgressCallback, TrackerEvent};
pub use types::*;
