//! Kitty CLI - Group chat spending tracker
//!
//! Usage:
//!   kitty serve --feed events.jsonl   Process events and serve status/downloads
//!   kitty ingest --file events.jsonl  Process a feed to completion
//!   kitty summary                     Show the spending summary
//!   kitty export --sheet monthly      Export a sheet as CSV

mod cli;
mod commands;
mod feed;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.store.as_deref())?;

    match cli.command {
        Commands::Serve { port, host, feed } => {
            commands::cmd_serve(&config, &host, port, feed.as_deref()).await
        }
        Commands::Ingest { file } => commands::cmd_ingest(&config, &file).await,
        Commands::Extract { text } => commands::cmd_extract(&config, &text),
        Commands::Summary => commands::cmd_summary(&config),
        Commands::Export { sheet, output } => {
            commands::cmd_export(&config, &sheet, output.as_deref())
        }
        Commands::Status => commands::cmd_status(&config),
    }
}
