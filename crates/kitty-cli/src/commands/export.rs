//! Export command implementation

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use super::open_ledger;
use kitty_core::{write_sheet_csv, Config, Sheet};

pub fn cmd_export(config: &Config, sheet: &str, output: Option<&Path>) -> Result<()> {
    let sheet: Sheet = sheet.parse()?;
    let ledger = open_ledger(config)?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_sheet_csv(&ledger, sheet, BufWriter::new(file))
                .context("Failed to write CSV")?;
            eprintln!("✅ Exported {} sheet to {}", sheet, path.display());
        }
        None => {
            write_sheet_csv(&ledger, sheet, io::stdout().lock()).context("Failed to write CSV")?;
        }
    }

    Ok(())
}
