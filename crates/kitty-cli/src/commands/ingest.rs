//! Ingest command implementation

use std::path::Path;

use anyhow::Result;

use super::{format_summary, open_context, print_insights};
use crate::feed::{open_feed, run_feed};
use kitty_core::Config;

pub async fn cmd_ingest(config: &Config, file: &Path) -> Result<()> {
    println!("📥 Ingesting events from {}...", file.display());

    let ctx = open_context(config)?;
    let reader = open_feed(Some(file)).await?;
    let stats = run_feed(&ctx, reader, print_insights).await?;

    println!();
    println!("✅ Ingest complete");
    println!("   Events: {}", stats.events);
    println!("   Processed: {}", stats.processed);
    println!("   Ignored: {}", stats.events - stats.processed);
    if stats.invalid > 0 {
        println!("   ⚠️  Undecodable lines: {}", stats.invalid);
    }
    println!();
    println!("{}", format_summary(ctx.summary().as_ref()));

    Ok(())
}
