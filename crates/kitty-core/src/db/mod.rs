//! Workbook storage with connection pooling
//!
//! The ledger workbook is a single SQLite file. Each sheet is a table named
//! after the configured sheet name, with the sheet's headers as columns:
//! - Messages: append-only message log
//! - Spending Analysis: one row per month/year
//! - Individual Spending: one row per month/year/person
//!
//! Connections use a zero busy timeout, so a write that meets another writer
//! fails straight away with `DatabaseBusy` and the caller's retry policy
//! decides what happens next.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::config::SheetNames;
use crate::error::Result;

mod sheets;

pub use sheets::{Workbook, INDIVIDUAL_HEADERS, MESSAGE_HEADERS, MONTHLY_HEADERS};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Quote a sheet or column name for use as an SQL identifier
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Workbook file with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the workbook file
    path: PathBuf,
    sheets: SheetNames,
}

impl Database {
    /// Open (or create) the workbook at `path`, creating any missing sheets
    pub fn open(path: impl AsRef<Path>, sheets: SheetNames) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.busy_timeout(Duration::ZERO)?;
            // Rollback journal keeps the workbook a single self-contained file
            conn.execute_batch("PRAGMA journal_mode = DELETE;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool, path, sheets };
        db.ensure_sheets()?;

        Ok(db)
    }

    /// Create a workbook in a fresh temporary file (for testing)
    pub fn temporary(sheets: SheetNames) -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "kitty_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::open(path, sheets)
    }

    /// Get the path to the workbook file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheets(&self) -> &SheetNames {
        &self.sheets
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create any sheet that doesn't exist yet
    fn ensure_sheets(&self) -> Result<()> {
        let conn = self.conn()?;

        let messages = quote_ident(&self.sheets.messages);
        let monthly = quote_ident(&self.sheets.monthly);
        let individual = quote_ident(&self.sheets.individual);

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {messages} (
                "Timestamp" TEXT,
                "Sender" TEXT,
                "Message" TEXT,
                "Extracted Numbers" TEXT,
                "Extracted Items" TEXT,
                "Is Spending Related" TEXT,
                "Month" TEXT,
                "Year" TEXT
            );

            CREATE TABLE IF NOT EXISTS {monthly} (
                "Month" TEXT,
                "Year" TEXT,
                "Total Spent" REAL,
                "Number of Transactions" INTEGER,
                "Average Transaction" REAL,
                "Highest Transaction" REAL,
                "Lowest Transaction" REAL
            );

            CREATE TABLE IF NOT EXISTS {individual} (
                "Month" TEXT,
                "Year" TEXT,
                "Person" TEXT,
                "Total Spent" REAL,
                "Number of Transactions" INTEGER,
                "Percentage of Total" REAL
            );
            "#
        ))?;

        info!("Workbook ready at {}", self.path.display());
        Ok(())
    }
}
