//! Highway Desk CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Connection error
//! - 5: Remote service or protocol error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hwy_chat::{ChatError, ErrorKind};
use hwy_docs::DocumentError;
use hwy_reports::ReportError;

mod commands;
mod settings;

use commands::{Cli, Commands};
use settings::Settings;

/// Script-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const CONNECTION_ERROR: u8 = 4;
    pub const REMOTE_ERROR: u8 = 5;
}

fn init_logging(verbose: bool, quiet: bool) {
    let (crate_level, default_level) = if verbose {
        ("hwy=debug", "info")
    } else if quiet {
        ("hwy=error", "error")
    } else {
        ("hwy=info", "warn")
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [crate_level, default_level] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Ignore failure: a subscriber may already be installed
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match Settings::resolve(&cli.workspace) {
        Ok(settings) => match cli.command {
            Commands::Models(args) => commands::models::execute(args, settings).await,
            Commands::Chat(args) => commands::chat::execute(args, settings).await,
            Commands::Analyze(args) => commands::analyze::execute(args, settings).await,
            Commands::Reports(args) => commands::reports::execute(args, settings).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Map an error to its exit code by the first typed cause in the chain
fn categorize_error(e: &anyhow::Error) -> u8 {
    let kind = e.chain().find_map(|cause| {
        cause
            .downcast_ref::<ChatError>()
            .map(ChatError::kind)
            .or_else(|| cause.downcast_ref::<DocumentError>().map(DocumentError::kind))
            .or_else(|| cause.downcast_ref::<ReportError>().map(ReportError::kind))
    });

    match kind {
        Some(ErrorKind::Validation) => ExitCodes::VALIDATION_FAILURE,
        Some(ErrorKind::Connection) => ExitCodes::CONNECTION_ERROR,
        Some(ErrorKind::Protocol) | Some(ErrorKind::Remote) => ExitCodes::REMOTE_ERROR,
        None if e.to_string().to_lowercase().contains("argument") => ExitCodes::INVALID_ARGS,
        None => ExitCodes::GENERAL_ERROR,
    }
}
