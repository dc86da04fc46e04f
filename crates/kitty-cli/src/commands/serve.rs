//! Serve command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use super::{format_config, format_summary, open_context, print_insights};
use crate::feed::{open_feed, run_feed};
use kitty_core::Config;

pub async fn cmd_serve(config: &Config, host: &str, port: u16, feed: Option<&Path>) -> Result<()> {
    println!("🚀 Starting kitty spending tracker...");
    println!("{}", format_config(config));

    let ctx = Arc::new(open_context(config)?);
    println!("{}", format_summary(ctx.summary().as_ref()));

    let server_config = kitty_server::ServerConfig::from_env();
    println!("   Listening: http://{}:{}", host, port);
    if !server_config.api_keys.is_empty() {
        println!(
            "   🔑 API keys: {} configured ({})",
            server_config.api_keys.len(),
            kitty_server::API_KEYS_ENV
        );
    }
    match feed {
        Some(path) if path != Path::new("-") => println!("   Feed: {}", path.display()),
        _ => println!("   Feed: stdin"),
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let reader = open_feed(feed).await?;
    let feed_ctx = ctx.clone();
    let feed_task = tokio::spawn(async move {
        if let Err(e) = run_feed(&feed_ctx, reader, print_insights).await {
            error!("Event feed failed: {:#}", e);
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Shutting down");
    };

    let served =
        kitty_server::serve_with_config(ctx.clone(), host, port, server_config, shutdown).await;

    // Let an in-flight event finish persisting before the feed is dropped
    let _pipeline = ctx.pipeline().await;
    feed_task.abort();
    served?;

    if ctx.summary().is_some() {
        println!("{}", format_summary(ctx.summary().as_ref()));
    }
    Ok(())
}
