//! Chainwarden CLI - Verify hash-linked audit chains.
//!
//! Exit codes: `0` every chain passed, `1` at least one chain failed
//! verification, `2` usage or configuration error.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chainwarden_config::{Config, LoadOptions};
use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod config_bridge;
mod location;
mod theme;

use commands::{list, verify};
use theme::Theme;

/// Exit code for usage and configuration errors.
const USAGE_ERROR: u8 = 2;

/// Chainwarden - audit chain integrity verifier
#[derive(Parser)]
#[command(name = "chainwarden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file, merged over user and workspace config
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify one or more chains and report the result
    Verify(verify::VerifyArgs),

    /// List the chains under a location
    List {
        /// Directory or s3://bucket/prefix URI
        location: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::from(USAGE_ERROR)
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let resolved = Config::load(&LoadOptions {
        workspace_root: std::env::current_dir().ok(),
        home_dir: None,
        explicit: cli.config.clone(),
    })?;
    let mut cfg = resolved.config;

    if let Commands::Verify(args) = &cli.command {
        args.apply(&mut cfg)?;
    }

    let log_config = config_bridge::to_log_config(&cfg, cli.verbose);
    if let Err(e) = chainwarden_telemetry::setup_logging(&log_config) {
        eprintln!("{}", Theme::warning(&format!("Failed to initialize logging: {e}")));
    }
    for path in &resolved.loaded_files {
        tracing::debug!(path = %path.display(), "Using config file");
    }

    match &cli.command {
        Commands::Verify(args) => verify::run_verify(args, &cfg).await,
        Commands::List { location } => {
            list::list_chains(location, &cfg).await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}
