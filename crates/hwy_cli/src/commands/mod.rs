//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod analyze;
pub mod chat;
pub mod models;
pub mod reports;

/// Highway Desk - chat with local models about highway engineering documents
#[derive(Parser)]
#[command(name = "hwy")]
#[command(version, about = "Highway Desk - local model chat and document compliance review")]
#[command(long_about = r#"
Highway Desk chats with models served by a local Ollama server and reviews
highway engineering PDFs (schedules, cross sections) for IRC/MoRTH
compliance using the Gemini API.

COMMANDS:
  models    → Check the Ollama server and list installed models
  chat      → Interactive chat, optionally grounded in analysed documents
  analyze   → Analyse PDFs and print a compliance report
  reports   → Progress-report insights and critical issues

SETTINGS:
  .hwy/settings.json in the workspace, overridden by OLLAMA_BASE_URL,
  HWY_MODEL, HWY_TEMPERATURE, HWY_MAX_TOKENS, GEMINI_MODEL and
  HWY_MAX_FILE_SIZE_MB and MPR_API_BASE_URL. Document analysis requires
  GEMINI_API_KEY.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Connection error
  5 - Remote service or protocol error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Workspace directory holding .hwy/settings.json
    #[arg(long, global = true, env = "HWY_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the Ollama server and list installed models
    Models(models::ModelsArgs),

    /// Chat with a model
    Chat(chat::ChatArgs),

    /// Analyse documents and print a compliance report
    Analyze(analyze::AnalyzeArgs),

    /// Show insights from the progress-report backend
    Reports(reports::ReportsArgs),
}
