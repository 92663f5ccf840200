//! # hwy_reports - Progress-report backend for Highway Desk
//!
//! Reads monthly progress reports and critical issues from the reporting
//! backend and derives prioritised [`Insight`]s from them.

pub mod client;
pub mod config;
pub mod error;
pub mod insight;
pub mod types;

pub use client::ReportsClient;
pub use config::{ReportsConfig, ENV_BASE_URL};
pub use error::{ReportError, ReportResult};
pub use insight::{
    issue_insight, issue_insights, issue_priority, report_category, report_insight,
    report_insights, report_priority,
};
pub use types::*;
