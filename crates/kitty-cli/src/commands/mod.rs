//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, opening the workbook, output blocks)
//! - `serve` - Event feed plus status server
//! - `ingest` - Process a JSONL feed to completion
//! - `extract` - Extraction diagnostics for one message
//! - `summary` - Spending summary
//! - `export` - Sheet CSV export
//! - `status` - Workbook status

pub mod core;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod serve;
pub mod status;
pub mod summary;

// Re-export command functions for main.rs
pub use core::*;
pub use export::*;
pub use extract::*;
pub use ingest::*;
pub use serve::*;
pub use status::*;
pub use summary::*;
