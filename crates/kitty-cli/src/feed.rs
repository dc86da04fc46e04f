//! Line-delimited JSON event feed
//!
//! Stands in for the chat transport: each line is one inbound event. The
//! context is marked connected while the feed is open.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use kitty_core::{AppContext, InboundEvent, ProcessedMessage};

/// Counters for one run of a feed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    /// Events decoded from the feed
    pub events: usize,
    /// Events that went through the pipeline
    pub processed: usize,
    /// Lines that could not be decoded
    pub invalid: usize,
}

/// Decode one feed line; `None` for blank lines
pub fn parse_event(line: &str) -> Option<serde_json::Result<InboundEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Open a feed file, or stdin for `None` / "-"
pub async fn open_feed(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open feed {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Push every event of a feed through the context until EOF
pub async fn run_feed<R>(
    ctx: &AppContext,
    reader: R,
    mut on_processed: impl FnMut(&ProcessedMessage),
) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    ctx.set_connected(true);
    let read = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        line_no += 1;

        let event = match parse_event(&line) {
            None => continue,
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!(line = line_no, "Skipping undecodable event: {}", e);
                stats.invalid += 1;
                continue;
            }
        };
        stats.events += 1;

        if let Some(processed) = ctx.handle_event(&event).await {
            stats.processed += 1;
            on_processed(&processed);
        }
    };
    ctx.set_connected(false);

    read.context("Failed to read event feed")?;
    info!(
        events = stats.events,
        processed = stats.processed,
        invalid = stats.invalid,
        "Event feed closed"
    );
    Ok(stats)
}
