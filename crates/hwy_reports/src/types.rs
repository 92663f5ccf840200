//! Reporting backend payloads and the insights derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Kind of highway project a report belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    /// Operations and maintenance
    #[serde(rename = "OM")]
    OperationsMaintenance,
    /// Under construction
    #[serde(rename = "UC")]
    UnderConstruction,
}

impl ProjectType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OperationsMaintenance => "OM",
            Self::UnderConstruction => "UC",
        }
    }

    /// Department name; anything that is not an O&M code counts as construction
    pub fn department_for(code: &str) -> &'static str {
        if code == "OM" {
            "Operations & Maintenance"
        } else {
            "Under Construction"
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ProjectType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OM" => Ok(Self::OperationsMaintenance),
            "UC" => Ok(Self::UnderConstruction),
            _ => Err(ReportError::InvalidProjectType(s.to_string())),
        }
    }
}

/// Monthly progress report summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub upc_code: String,
    pub project_name: String,
    pub reporting_period: String,
    pub project_type: ProjectType,
    #[serde(default)]
    pub member: String,
    #[serde(default)]
    pub ro: String,
    #[serde(default)]
    pub piu: String,
    #[serde(default)]
    pub summary_preview: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportsResponse {
    pub reports: Vec<Report>,
    pub total: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub database: DatabaseStatus,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy && self.database == DatabaseStatus::Connected
    }
}

/// Critical issue joined with the details of its report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalIssue {
    pub id: i64,
    #[serde(default)]
    pub issue_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub preliminary_root_cause: String,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub recommended_action: String,
    #[serde(default)]
    pub impact_details: String,
    #[serde(default)]
    pub age_days: i64,
    pub target_date: Option<String>,
    #[serde(default)]
    pub escalation_level: String,
    pub cvs_score: Option<f64>,
    pub cost_score: Option<f64>,
    pub visibility_score: Option<f64>,
    pub severity_score: Option<f64>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub upc_code: String,
    #[serde(default)]
    pub project_name: String,
    pub reporting_period: Option<String>,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub member: String,
    #[serde(default)]
    pub ro: String,
    #[serde(default)]
    pub piu: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalIssuesResponse {
    pub critical_issues: Vec<CriticalIssue>,
    pub total: u64,
    pub count: u64,
}

/// Body of `GET /categories`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

/// Filters for `GET /reports`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Paging for `GET /critical-issues`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Risk,
    Opportunity,
    Achievement,
    Performance,
}

impl InsightCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Opportunity => "opportunity",
            Self::Achievement => "achievement",
            Self::Performance => "performance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Project a critical issue belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub upc: String,
    pub member: String,
    pub ro: String,
    pub piu: String,
}

/// Presentation-ready insight derived from a report or critical issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: InsightCategory,
    pub priority: Priority,
    pub month: String,
    pub year: String,
    pub department: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    pub generated_date: String,
    pub viewable_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_info: Option<ProjectInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_type_codes() {
        assert_eq!("om".parse::<ProjectType>().unwrap(), ProjectType::OperationsMaintenance);
        assert_eq!("UC".parse::<ProjectType>().unwrap(), ProjectType::UnderConstruction);
        assert!(matches!(
            "EPC".parse::<ProjectType>(),
            Err(ReportError::InvalidProjectType(_))
        ));
        assert_eq!(ProjectType::department_for("OM"), "Operations & Maintenance");
        assert_eq!(ProjectType::department_for("HAM"), "Under Construction");
    }

    #[test]
    fn test_health_requires_database() {
        let health: HealthResponse =
            serde_json::from_str(r#"{"status":"healthy","database":"disconnected"}"#).unwrap();
        assert!(!health.is_healthy());

        let health: HealthResponse =
            serde_json::from_str(r#"{"status":"healthy","database":"connected"}"#).unwrap();
        assert!(health.is_healthy());
    }

    #[test]
    fn test_critical_issue_tolerates_nulls() {
        let issue: CriticalIssue = serde_json::from_str(
            r#"{"id":7,"title":"Land acquisition delay","cvs_score":null,"cost_score":null,
                "visibility_score":null,"severity_score":null,"created_at":null,
                "target_date":null,"reporting_period":null}"#,
        )
        .unwrap();
        assert_eq!(issue.id, 7);
        assert!(issue.cvs_score.is_none());
        assert!(issue.persona.is_empty());
    }
}
