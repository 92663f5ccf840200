//! Document records and analysis results.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DocumentResult;

/// Unique identifier for an uploaded document
pub type DocumentId = String;

/// Lifecycle status of an uploaded document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Accepted and being prepared for analysis
    Processing,
    /// Submitted to the analyzer, waiting for its answer
    Analyzing,
    /// Analysis attached
    Ready,
    /// Failed; the error message is attached
    Error,
}

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Processing => 0,
            Self::Analyzing => 1,
            Self::Ready => 2,
            Self::Error => 3,
        }
    }

    /// Statuses only move forward; `Error` is reachable from any live status.
    pub fn can_advance_to(&self, next: DocumentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Error || next.rank() >= self.rank()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Analyzing => "analyzing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

/// What kind of document the analysis was about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    HighwayEngineering,
    General,
}

impl DocumentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::HighwayEngineering => "Highway engineering document",
            Self::General => "Engineering document",
        }
    }
}

/// Outcome of the external document analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalysisResult {
    pub success: bool,
    /// Free-text analysis body, or a raw error explanation on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(rename = "complianceScore", skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AnalysisResult {
    /// A successful analysis with no structured fields yet
    pub fn success(analysis: impl Into<String>) -> Self {
        Self {
            success: true,
            analysis: Some(analysis.into()),
            ..Default::default()
        }
    }

    /// A failed analysis; only the raw explanation survives
    pub fn failure(explanation: impl Into<String>) -> Self {
        Self {
            success: false,
            analysis: Some(explanation.into()),
            ..Default::default()
        }
    }

    pub fn issue_count(&self) -> usize {
        self.issues.as_ref().map_or(0, Vec::len)
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendations.as_ref().map_or(0, Vec::len)
    }
}

/// Tracked state of one uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub name: String,
    pub size: u64,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub status: DocumentStatus,
    /// Progress percentage while in flight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Text extracted by the analyzer
    pub content: String,
    #[serde(rename = "documentKind", skip_serializing_if = "Option::is_none")]
    pub document_kind: Option<DocumentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
}

/// A file handed to the tracker
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> DocumentResult<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_from_extension(path);
        Ok(Self::new(name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// One progress report for a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub document_id: DocumentId,
    pub percentage: u8,
    pub status_text: String,
}
