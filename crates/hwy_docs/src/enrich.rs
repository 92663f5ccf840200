//! Best-effort extraction of structured fields from free-text analysis.
//!
//! The analyzer answers in prose with loosely agreed section markers
//! (`SUBTASK 3`, `SUBTASK 4`, markdown tables with ✅/⚠️/❌). Nothing here
//! may fail the analysis: when a pattern does not match, the field stays
//! empty.

use regex::Regex;

use crate::types::{AnalysisResult, DocumentKind};

const ENGINEERING_INDICATORS: &[&str] = &[
    "highway",
    "cross section",
    "carriageway",
    "embankment",
    "median",
    "irc",
    "morth",
    "orange book",
    "road design",
    "pavement",
    "schedule b",
    "schedule-b",
    "schedule c",
    "schedule-c",
    "right of way",
    "formation width",
    "side slope",
    "camber",
];

const ISSUE_PATTERNS: &[&str] = &[
    r"(?i)not present",
    r"(?i)non-compliant",
    r"(?i)missing",
    r"(?i)discrepanc(?:y|ies)",
    r"(?i)issues?\s*identified",
    r"(?i)differences?\s*highlighted",
];

const MAX_ISSUES: usize = 10;
const MAX_GENERAL_LINES: usize = 5;

/// Guess the document kind from its file name and content.
pub fn detect_document_kind(content: &str, file_name: &str) -> DocumentKind {
    let name = file_name.to_lowercase();
    if ["schedule", "highway", "road"].iter().any(|k| name.contains(k)) {
        return DocumentKind::HighwayEngineering;
    }

    let content = content.to_lowercase();
    let matches = ENGINEERING_INDICATORS
        .iter()
        .filter(|indicator| content.contains(*indicator))
        .count();

    if matches >= 2 {
        DocumentKind::HighwayEngineering
    } else {
        DocumentKind::General
    }
}

/// Build an [`AnalysisResult`] from the analyzer's text.
pub fn enrich_analysis(text: &str, kind: DocumentKind) -> AnalysisResult {
    let mut result = AnalysisResult::success(text);
    match kind {
        DocumentKind::HighwayEngineering => enrich_highway(text, &mut result),
        DocumentKind::General => enrich_general(text, &mut result),
    }
    result
}

fn count(pattern: &str, text: &str) -> usize {
    Regex::new(pattern)
        .map(|re| re.find_iter(text).count())
        .unwrap_or(0)
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn enrich_highway(text: &str, result: &mut AnalysisResult) {
    let not_present = count(r"(?i)not present", text);
    let irc_refs = count(r"(?i)IRC[\s-]*\d+", text);
    let failed_checks = text.matches('❌').count();

    let total_checks = irc_refs.max(10);
    let non_compliant = (not_present + failed_checks).min(total_checks);
    let score =
        ((total_checks - non_compliant) as f64 / total_checks as f64 * 100.0).round() as u8;
    result.compliance_score = Some(score);

    let issues = section_after(text, r"(?i)subtask\s*4")
        .map(extract_issues)
        .unwrap_or_default();
    let recommendations = section_between(text, r"(?i)subtask\s*3", r"(?i)subtask\s*4")
        .map(extract_table_recommendations)
        .unwrap_or_default();

    result.summary = Some(format!(
        "Highway engineering document analysis completed with {}% compliance score. \
         Found {} IRC code references with {} issues identified.",
        score, irc_refs, issues.len()
    ));
    result.issues = non_empty(issues);
    result.recommendations = non_empty(recommendations);
}

fn section_after<'a>(text: &'a str, start: &str) -> Option<&'a str> {
    let re = Regex::new(start).ok()?;
    let found = re.find(text)?;
    Some(&text[found.start()..])
}

fn section_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let section = section_after(text, start)?;
    let end_re = Regex::new(end).ok()?;
    match end_re.find(section) {
        Some(found) => Some(&section[..found.start()]),
        None => Some(section),
    }
}

/// One issue per distinct line mentioning an issue marker.
fn extract_issues(section: &str) -> Vec<String> {
    let patterns: Vec<Regex> = ISSUE_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

    let mut issues: Vec<String> = Vec::new();
    for line in section.lines() {
        let line = line
            .trim()
            .trim_start_matches(|c: char| matches!(c, '-' | '*' | ' '))
            .trim();
        if line.is_empty() || line.starts_with('|') {
            continue;
        }
        if let Some(found) = patterns.iter().find_map(|re| re.find(line)) {
            let issue = format!("{} - {}", found.as_str(), line.replace("**", ""));
            if !issues.iter().any(|existing| existing.ends_with(&issue[found.as_str().len()..])) {
                issues.push(issue);
            }
        }
        if issues.len() >= MAX_ISSUES {
            break;
        }
    }
    issues
}

/// `Review {element} - {remarks}` for every flagged table row.
fn extract_table_recommendations(section: &str) -> Vec<String> {
    let Ok(row_re) = Regex::new(r"\|[^|\n]+\|[^|\n]+\|[^|\n]+\|[^|\n]+\|") else {
        return Vec::new();
    };

    row_re
        .find_iter(section)
        .map(|m| m.as_str())
        .filter(|row| row.contains('❌') || row.contains('⚠'))
        .filter_map(|row| {
            let cols: Vec<&str> = row.split('|').map(str::trim).collect();
            // Leading pipe yields an empty first column
            if cols.len() >= 5 {
                Some(format!("Review {} - {}", cols[1], cols[4]))
            } else {
                None
            }
        })
        .collect()
}

fn enrich_general(text: &str, result: &mut AnalysisResult) {
    let negatives = count(r"(?i)\b(?:non-compliant|incorrect|missing|incomplete)\b", text);
    let non_compliant = count(r"(?i)\bnon-compliant\b", text);
    let positives = count(r"(?i)\b(?:compliant|accurate|correct|complete)\b", text)
        .saturating_sub(non_compliant);

    let total = positives + negatives;
    if total > 0 {
        result.compliance_score = Some((positives as f64 / total as f64 * 100.0).round() as u8);
    }

    let lines_with = |needles: &[&str]| -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| {
                let lower = line.to_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .take(MAX_GENERAL_LINES)
            .map(str::to_string)
            .collect()
    };

    result.issues = non_empty(lines_with(&["issue", "problem", "error"]));
    result.recommendations = non_empty(lines_with(&["recommend", "suggest", "should"]));
    result.summary = Some("Document analysis completed with general compliance review.".to_string());
}
