//! Text rendered from tracked documents: chat context and status notices.

use crate::types::{DocumentRecord, DocumentStatus};

const CONTEXT_PREAMBLE: &str = "You have access to the following highway engineering documents \
with AI analysis. Please reference them when answering questions:\n\n";

const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Human-readable size, e.g. `3 MB` or `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}

fn document_context(record: &DocumentRecord) -> String {
    let mut context = format!("Document: {}\nContent:\n{}", record.name, record.content);

    if let Some(analysis) = record.analysis.as_ref().filter(|a| a.success) {
        if let Some(text) = &analysis.analysis {
            context.push_str(&format!("\n\nAI Analysis:\n{}", text));
        }
        if let Some(score) = analysis.compliance_score {
            context.push_str(&format!("\nCompliance Score: {}/100", score));
        }
        if let Some(issues) = analysis.issues.as_ref().filter(|i| !i.is_empty()) {
            context.push_str(&format!("\nIssues: {}", issues.join(", ")));
        }
        if let Some(recs) = analysis.recommendations.as_ref().filter(|r| !r.is_empty()) {
            context.push_str(&format!("\nRecommendations: {}", recs.join(" | ")));
        }
    }
    context
}

/// System context describing every ready document, or `None` when no
/// document is ready.
pub fn chat_context<'a>(records: impl IntoIterator<Item = &'a DocumentRecord>) -> Option<String> {
    let sections: Vec<String> = records
        .into_iter()
        .filter(|r| r.status == DocumentStatus::Ready)
        .map(document_context)
        .collect();

    if sections.is_empty() {
        return None;
    }
    Some(format!("{}{}", CONTEXT_PREAMBLE, sections.join(DOCUMENT_SEPARATOR)))
}

impl DocumentRecord {
    /// Chat notice announcing that this document finished processing.
    ///
    /// Returns `None` while the document is still in flight.
    pub fn completion_notice(&self) -> Option<String> {
        match self.status {
            DocumentStatus::Processing | DocumentStatus::Analyzing => None,
            DocumentStatus::Error => Some(format!(
                "❌ Failed to process \"{}\": {}",
                self.name,
                self.error_message.as_deref().unwrap_or("unknown error")
            )),
            DocumentStatus::Ready => {
                let kind = self
                    .document_kind
                    .map_or("Engineering document", |k| k.display_name());
                let mut notice = format!(
                    "📄 {} \"{}\" has been uploaded and processed.",
                    kind, self.name
                );

                match self.analysis.as_ref().filter(|a| a.success) {
                    Some(analysis) => {
                        notice.push_str("\n\n🤖 **AI Analysis Complete:**");
                        if let Some(score) = analysis.compliance_score {
                            let band = if score >= 80 {
                                "🟢"
                            } else if score >= 60 {
                                "🟡"
                            } else {
                                "🔴"
                            };
                            notice.push_str(&format!("\n{} Compliance Score: {}/100", band, score));
                        }
                        if let Some(summary) = &analysis.summary {
                            notice.push_str(&format!("\n📋 Summary: {}", summary));
                        }
                        if analysis.issue_count() > 0 {
                            notice.push_str(&format!("\n⚠️ Issues Found: {}", analysis.issue_count()));
                        }
                        if analysis.recommendation_count() > 0 {
                            notice.push_str(&format!(
                                "\n💡 Recommendations Available: {}",
                                analysis.recommendation_count()
                            ));
                        }
                        notice.push_str(
                            "\n\nYou can now ask questions about the highway engineering analysis and compliance!",
                        );
                    }
                    None => notice.push_str("\n\nYou can now ask questions about its content."),
                }
                Some(notice)
            }
        }
    }
}
