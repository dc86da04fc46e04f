//! Status command implementation

use std::fs;

use anyhow::Result;

use kitty_core::{Config, Database};

pub fn cmd_status(config: &Config) -> Result<()> {
    let path = &config.store_path;

    println!();
    println!("📊 Kitty Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Workbook: {}", path.display());
    println!("   Target Group: {}", config.target_conversation);

    if !path.exists() {
        println!("   Size: (workbook not created yet)");
        println!();
        return Ok(());
    }

    if let Ok(metadata) = fs::metadata(path) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb < 1024.0 {
            println!("   Size: {:.1} KB", size_kb);
        } else {
            println!("   Size: {:.1} MB", size_kb / 1024.0);
        }
    }

    match Database::open(path, config.sheets.clone()).and_then(|db| db.load_workbook()) {
        Ok(workbook) => {
            println!();
            println!("   {}: {} rows", config.sheets.messages, workbook.messages.len());
            println!("   {}: {} rows", config.sheets.monthly, workbook.monthly.len());
            println!(
                "   {}: {} rows",
                config.sheets.individual,
                workbook.individual.len()
            );
        }
        Err(e) => {
            println!();
            println!("   ❌ Error opening workbook: {}", e);
        }
    }

    println!();
    Ok(())
}
