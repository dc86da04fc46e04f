//! Extract command implementation (diagnostics for one message)

use anyhow::{Context, Result};

use kitty_core::{categorize, Config, Extraction, Extractor};

/// Human-readable extraction report
pub fn format_extraction(extractor: &Extractor, text: &str, extraction: &Extraction) -> String {
    let mut lines = vec![format!("🔎 {}", text.trim())];

    if extraction.numbers.is_empty() {
        lines.push("   Numbers: (none)".to_string());
    } else {
        lines.push(format!("   Numbers: {}", extraction.numbers.join(", ")));
    }
    for item in &extraction.items {
        lines.push(format!("     • {}: ${} ({})", item.label, item.amount, item.original));
    }
    lines.push(format!(
        "   Spending Related: {}",
        if extractor.is_spending_related(text) {
            "Yes"
        } else {
            "No"
        }
    ));
    lines.push(format!("   Category: {}", categorize(text)));

    lines.join("\n")
}

pub fn cmd_extract(config: &Config, text: &str) -> Result<()> {
    let extractor = Extractor::from_config(config).context("Invalid extraction patterns")?;
    let extraction = extractor
        .extract(text)
        .context("Failed to extract amounts")?;

    println!("{}", format_extraction(&extractor, text, &extraction));
    Ok(())
}
