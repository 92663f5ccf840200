//! Reports command - Insights from the progress-report backend.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use hwy_reports::{
    issue_insights, report_insights, Insight, IssueQuery, Priority, ProjectType, ReportError,
    ReportQuery, ReportsClient,
};

use crate::settings::Settings;

#[derive(Args)]
pub struct ReportsArgs {
    /// Only reports of this project type (OM or UC)
    #[arg(long, value_name = "TYPE")]
    project_type: Option<ProjectType>,

    /// Maximum number of entries
    #[arg(long)]
    limit: Option<u32>,

    /// Number of entries to skip
    #[arg(long)]
    offset: Option<u32>,

    /// Show critical issues instead of progress reports
    #[arg(long)]
    critical: bool,

    /// Also list the backend's insight categories
    #[arg(long)]
    categories: bool,

    /// Print insights as JSON
    #[arg(long)]
    json: bool,
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🟢",
    }
}

/// Render one insight as a short text block.
fn render_insight(insight: &Insight) -> String {
    let mut out = format!(
        "{} [{}] {}\n   {} · {} {} · {}",
        priority_marker(insight.priority),
        insight.category.label(),
        insight.title,
        insight.department,
        insight.month,
        insight.year,
        insight.author
    );
    if let Some(project) = &insight.project_info {
        out.push_str(&format!("\n   {} ({}) · {}", project.name, project.upc, project.piu));
    }
    if let Some(first) = insight.content.lines().find(|l| !l.trim().is_empty()) {
        out.push_str(&format!("\n   {}", first.trim()));
    }
    out
}

pub async fn execute(args: ReportsArgs, settings: Settings) -> Result<()> {
    let client = ReportsClient::new(settings.reports_config()?)?;
    let base_url = client.config().base_url.clone();
    info!("Checking reporting backend at {}", base_url);

    if !client.check_health().await {
        println!("🔴 Reporting backend unavailable at {}", base_url);
        return Err(ReportError::Connection(base_url)).context("Reporting backend is not healthy");
    }
    println!("🟢 Connected to {}", base_url);

    if args.categories {
        let categories = client
            .categories()
            .await
            .context("Failed to load categories")?;
        println!("🏷️  Categories: {}", categories.join(", "));
    }

    let (mut insights, count, total) = if args.critical {
        let query = IssueQuery {
            skip: args.offset,
            limit: args.limit,
        };
        let response = client
            .critical_issues(&query)
            .await
            .context("Failed to load critical issues")?;
        (
            issue_insights(&response.critical_issues),
            response.count,
            response.total,
        )
    } else {
        let query = ReportQuery {
            project_type: args.project_type,
            limit: args.limit,
            offset: args.offset,
        };
        let response = client
            .reports(&query)
            .await
            .context("Failed to load reports")?;
        (report_insights(&response.reports), response.count, response.total)
    };

    // Stable: keeps backend order within a priority
    insights.sort_by_key(|i| i.priority);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    println!();
    if insights.is_empty() {
        println!("   No entries found.");
        return Ok(());
    }
    for insight in &insights {
        println!("{}", render_insight(insight));
        println!();
    }
    println!("Showing {} of {}", count, total);
    Ok(())
}
