//! Kitty Core Library
//!
//! Shared functionality for the kitty group spending tracker:
//! - Amount extraction and message classification
//! - Ledger store (messages, monthly and per-person aggregates) backed by a
//!   single-file SQLite workbook
//! - Pipeline coordinator for inbound chat events
//! - Application context shared by the event feed and the status server
//! - Configuration, retry policy and CSV sheet export

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod retry;

pub use config::{Config, PersistSettings, SheetNames};
pub use context::AppContext;
pub use db::{Database, Workbook};
pub use error::{Error, Result};
pub use export::{sheet_csv, write_sheet_csv, Sheet};
pub use extract::{
    categorize, normalize_amount, sanitize_sender, Category, ExtractedItem, Extraction, Extractor,
};
pub use ledger::Ledger;
pub use models::*;
pub use pipeline::{insights, Pipeline, ProcessedMessage};
pub use retry::{retry_with_backoff, RetryPolicy};
