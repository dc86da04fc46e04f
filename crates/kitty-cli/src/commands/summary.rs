//! Summary command implementation

use anyhow::Result;

use super::{format_summary, open_ledger};
use kitty_core::Config;

pub fn cmd_summary(config: &Config) -> Result<()> {
    let ledger = open_ledger(config)?;
    println!();
    println!("{}", format_summary(ledger.summary().as_ref()));
    Ok(())
}
