//! The seam between the tracker and an external analysis service.

use async_trait::async_trait;

use crate::error::DocumentResult;

/// A service that turns a PDF into free-text analysis.
///
/// Implementations return the raw analysis text; structured fields are
/// extracted afterwards by [`crate::enrich::enrich_analysis`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze a base64-encoded PDF.
    async fn analyze_pdf(&self, base64_pdf: &str, file_name: &str) -> DocumentResult<String>;
}
