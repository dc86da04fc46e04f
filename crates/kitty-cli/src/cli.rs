//! CLI argument definitions using clap
//!
//! The command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kitty - Track shared spending from a group chat
#[derive(Parser)]
#[command(name = "kitty")]
#[command(about = "Group chat spending tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Workbook path (overrides store_path from the config)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process the event feed and serve status and downloads
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// JSONL event feed ("-" or omitted for stdin)
        #[arg(long)]
        feed: Option<PathBuf>,
    },

    /// Process a JSONL event file to completion
    Ingest {
        /// JSONL file, one event per line
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show what would be extracted from a message
    Extract {
        /// Message text
        text: String,
    },

    /// Show the spending summary
    Summary,

    /// Export one sheet as CSV
    Export {
        /// Sheet: messages, monthly, individual
        #[arg(short, long, default_value = "monthly")]
        sheet: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show workbook location, size and row counts
    Status,
}
