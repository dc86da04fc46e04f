//! Shared command utilities
//!
//! - `load_config` - config resolution plus the `--store` override
//! - `open_context` / `open_ledger` - open the workbook
//! - `format_*` - human-readable blocks printed by several commands

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use kitty_core::{AppContext, Config, Database, Ledger, ProcessedMessage, Summary};

/// Separator line used between output blocks
pub fn rule() -> String {
    "─".repeat(50)
}

/// Load configuration and apply the `--store` override
pub fn load_config(config_path: Option<&Path>, store: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if let Some(store) = store {
        config.store_path = store.to_path_buf();
    }
    Ok(config)
}

/// Open the application context (extractor, workbook, ledger)
pub fn open_context(config: &Config) -> Result<AppContext> {
    AppContext::open(config).with_context(|| {
        format!(
            "Failed to open workbook at {}",
            config.store_path.display()
        )
    })
}

/// Open just the ledger, for read-only commands
pub fn open_ledger(config: &Config) -> Result<Ledger> {
    let db = Database::open(&config.store_path, config.sheets.clone()).with_context(|| {
        format!(
            "Failed to open workbook at {}",
            config.store_path.display()
        )
    })?;
    Ledger::load(db, config.persist.retry_policy()).context("Failed to load ledger")
}

/// Startup configuration block
pub fn format_config(config: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📋 Configuration:");
    let _ = writeln!(out, "   Target Group: {}", config.target_conversation);
    let _ = writeln!(out, "   Workbook: {}", config.store_path.display());
    let _ = writeln!(
        out,
        "   Spending Analysis: {}",
        if config.spending_analysis {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    let _ = write!(out, "{}", rule());
    out
}

/// Spending summary block
pub fn format_summary(summary: Option<&Summary>) -> String {
    let mut out = String::new();
    match summary {
        Some(summary) => {
            let _ = writeln!(out, "📊 Current Spending Summary:");
            let _ = writeln!(out, "   Total Months Tracked: {}", summary.total_months);
            let _ = writeln!(out, "   Total Spent: ${:.2}", summary.total_spent);
            let _ = writeln!(
                out,
                "   Average Monthly Spending: ${:.2}",
                summary.average_monthly_spending
            );
            if let Some(highest) = &summary.highest_month {
                let _ = writeln!(
                    out,
                    "   Highest Month: {} {} - ${:.2}",
                    highest.month, highest.year, highest.total
                );
            }

            let _ = writeln!(out);
            let _ = writeln!(out, "   Recent Months:");
            for month in &summary.recent_months {
                let _ = writeln!(
                    out,
                    "     {} {}: ${:.2} ({} transactions)",
                    month.month, month.year, month.total, month.transactions
                );
            }

            if !summary.individual_spending.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "   By Person:");
                for (month, people) in &summary.individual_spending {
                    let _ = writeln!(out, "     {}:", month);
                    for share in people {
                        let _ = writeln!(
                            out,
                            "       {}: ${:.2} ({:.2}%)",
                            share.person, share.amount, share.percentage
                        );
                    }
                }
            }
        }
        None => {
            let _ = writeln!(
                out,
                "📊 No spending data available yet. Start sending messages with amounts!"
            );
        }
    }
    let _ = write!(out, "{}", rule());
    out
}

/// Per-message spending block
pub fn format_insights(processed: &ProcessedMessage) -> String {
    let fact = &processed.fact;
    let insights = &processed.insights;

    let mut out = String::new();
    let _ = writeln!(out, "💰 Spending Analysis:");
    let _ = writeln!(out, "   Sender: {}", fact.sender);
    let _ = writeln!(out, "   Amount: ${:.2}", insights.total_amount);
    let _ = writeln!(out, "   Category: {}", insights.category);
    let _ = writeln!(
        out,
        "   High Value: {}",
        if insights.is_high_value { "Yes" } else { "No" }
    );
    let _ = writeln!(out, "   Numbers Found: {}", insights.amount_count);
    if !fact.items.is_empty() {
        let _ = writeln!(out, "   Items Detected:");
        for item in &fact.items {
            let _ = writeln!(out, "     • {}: ${}", item.label, item.amount);
        }
    }
    let _ = write!(out, "{}", rule());
    out
}

/// Print the insights block for messages that carried an amount
pub fn print_insights(processed: &ProcessedMessage) {
    if processed.insights.has_amount {
        println!();
        println!("{}", format_insights(processed));
    }
}
