//! Turn reports and critical issues into insights.
//!
//! Category and priority come from keyword matching on the report summary.
//! Critical issues are always risks; their priority follows the CVS score,
//! then the escalation level.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::types::{
    CriticalIssue, Insight, InsightCategory, Priority, ProjectInfo, ProjectType, Report,
};

const DEFAULT_AUTHOR: &str = "MPRBOT Analysis";
const MAX_TITLE_CHARS: usize = 50;

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Category of a report from its summary wording.
pub fn report_category(report: &Report) -> InsightCategory {
    let summary = report.summary_preview.to_lowercase();
    if contains_any(&summary, &["risk", "issue", "problem"]) {
        InsightCategory::Risk
    } else if contains_any(&summary, &["opportunity", "improve"]) {
        InsightCategory::Opportunity
    } else if contains_any(&summary, &["achieve", "success", "complete"]) {
        InsightCategory::Achievement
    } else {
        InsightCategory::Performance
    }
}

/// Priority of a report from its summary wording.
pub fn report_priority(report: &Report) -> Priority {
    let summary = report.summary_preview.to_lowercase();
    if contains_any(&summary, &["critical", "urgent", "immediate"]) {
        Priority::High
    } else if contains_any(&summary, &["minor", "low"]) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Priority of a critical issue: CVS score first, then escalation level.
pub fn issue_priority(issue: &CriticalIssue) -> Priority {
    if let Some(score) = issue.cvs_score {
        return if score >= 8.0 {
            Priority::High
        } else if score >= 5.0 {
            Priority::Medium
        } else {
            Priority::Low
        };
    }

    let level = issue.escalation_level.to_lowercase();
    if contains_any(&level, &["high", "critical", "urgent"]) {
        Priority::High
    } else if contains_any(&level, &["low", "minor"]) {
        Priority::Low
    } else {
        Priority::High
    }
}

fn report_title(report: &Report) -> String {
    let prefix = match report.project_type {
        ProjectType::OperationsMaintenance => "O&M",
        ProjectType::UnderConstruction => "Construction",
    };
    let name: String = report.project_name.chars().take(MAX_TITLE_CHARS).collect();
    let ellipsis = if report.project_name.chars().count() > MAX_TITLE_CHARS {
        "..."
    } else {
        ""
    };
    format!("{} Progress: {}{}", prefix, name, ellipsis)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Month name and year of a date string; unparseable or missing dates use `now`.
fn month_year(value: Option<&str>, now: DateTime<Utc>) -> (String, String) {
    let date = value.and_then(parse_date).unwrap_or_else(|| now.date_naive());
    (date.format("%B").to_string(), date.format("%Y").to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn viewable_by(project_type: &str) -> Vec<String> {
    vec!["manager".to_string(), "admin".to_string(), project_type.to_string()]
}

/// Insight for one progress report, generated at `now`.
pub fn report_insight(report: &Report, now: DateTime<Utc>) -> Insight {
    let (month, year) = month_year(Some(&report.reporting_period), now);

    Insight {
        id: report.id.to_string(),
        title: report_title(report),
        content: report.summary_preview.clone(),
        category: report_category(report),
        priority: report_priority(report),
        month,
        year,
        department: ProjectType::department_for(report.project_type.code()).to_string(),
        author: DEFAULT_AUTHOR.to_string(),
        persona: None,
        generated_date: timestamp(now),
        viewable_by: viewable_by(report.project_type.code()),
        source_report: Some(report.clone()),
        project_info: None,
    }
}

/// Insight for one critical issue, generated at `now`.
pub fn issue_insight(issue: &CriticalIssue, now: DateTime<Utc>) -> Insight {
    let created_at = non_blank(issue.created_at.as_deref());
    let dated = non_blank(issue.reporting_period.as_deref()).or(created_at);
    let (month, year) = month_year(dated, now);

    let author = if issue.persona.trim().is_empty() {
        DEFAULT_AUTHOR.to_string()
    } else {
        issue.persona.clone()
    };

    let project_info = (!issue.project_name.is_empty()).then(|| ProjectInfo {
        name: issue.project_name.clone(),
        upc: issue.upc_code.clone(),
        member: issue.member.clone(),
        ro: issue.ro.clone(),
        piu: issue.piu.clone(),
    });

    Insight {
        id: issue.id.to_string(),
        title: issue.title.clone(),
        content: format!(
            "{}\n\nRoot Cause: {}\n\nRecommended Action: {}",
            issue.description, issue.preliminary_root_cause, issue.recommended_action
        ),
        category: InsightCategory::Risk,
        priority: issue_priority(issue),
        month,
        year,
        department: ProjectType::department_for(&issue.project_type).to_string(),
        author,
        persona: Some(issue.persona.clone()),
        generated_date: created_at.map_or_else(|| timestamp(now), str::to_string),
        viewable_by: viewable_by(&issue.project_type),
        source_report: None,
        project_info,
    }
}

pub fn report_insights(reports: &[Report]) -> Vec<Insight> {
    let now = Utc::now();
    reports.iter().map(|r| report_insight(r, now)).collect()
}

pub fn issue_insights(issues: &[CriticalIssue]) -> Vec<Insight> {
    let now = Utc::now();
    issues.iter().map(|i| issue_insight(i, now)).collect()
}
