//! Integration tests for kitty-core
//!
//! These tests drive whole events through the pipeline against real store
//! files: extract → append → aggregate → persist → reload.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use kitty_core::{
    AppContext, Category, Config, Database, Extractor, InboundEvent, Ledger, Pipeline,
    RetryPolicy, SheetNames,
};
use tempfile::TempDir;

const GROUP: &str = "120363342387374955@g.us";

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.target_conversation = GROUP.to_string();
    config.store_path = dir.path().join("kitty.db");
    config.persist.backoff_ms = 1;
    config
}

/// Mid-month, so the local month is May everywhere
fn may_event(text: &str, sender: &str) -> InboundEvent {
    InboundEvent {
        text: text.to_string(),
        sender: sender.to_string(),
        conversation_id: GROUP.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap(),
        is_status: false,
    }
}

// =============================================================================
// Extraction scenarios
// =============================================================================

#[test]
fn test_keyword_message_with_dollar_amount() {
    let extractor = Extractor::from_config(&Config::default()).unwrap();
    let text = "I spent $25.50 on lunch";

    let extraction = extractor.extract(text).unwrap();
    assert_eq!(extraction.numbers, vec!["25.5"]);
    assert!(extractor.is_spending_related(text));
    // "lunch" is not a category keyword
    assert_eq!(kitty_core::categorize(text), Category::Other);
}

#[test]
fn test_item_message_without_keywords() {
    let extractor = Extractor::from_config(&Config::default()).unwrap();
    let text = "Coffee 3.25 and sandwich 8.75";

    let extraction = extractor.extract(text).unwrap();
    assert_eq!(extraction.numbers, vec!["3.25", "8.75"]);
    let items: Vec<_> = extraction
        .items
        .iter()
        .map(|i| (i.label.as_str(), i.amount.as_str()))
        .collect();
    assert_eq!(items, vec![("coffee", "3.25"), ("sandwich", "8.75")]);
    assert!(extractor.is_spending_related(text));
}

#[tokio::test]
async fn test_plain_message_appended_without_spending() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::open(&config_in(&dir)).unwrap();

    let processed = pipeline
        .on_message(&may_event("Just a regular message", "Alice"))
        .await
        .unwrap();
    assert!(processed.fact.numbers.is_empty());
    assert!(processed.fact.items.is_empty());
    assert!(!processed.fact.is_spending_related);

    let reloaded = Pipeline::open(&config_in(&dir)).unwrap();
    assert_eq!(reloaded.ledger().messages().len(), 1);
    assert!(reloaded.ledger().monthly().is_empty());
    assert!(reloaded.ledger().individual().is_empty());
}

// =============================================================================
// Aggregation scenarios
// =============================================================================

#[tokio::test]
async fn test_two_senders_same_month() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::open(&config_in(&dir)).unwrap();

    pipeline.on_message(&may_event("spent 100", "Alice")).await.unwrap();
    pipeline.on_message(&may_event("spent 300", "Bob")).await.unwrap();

    // Reload from disk so the assertions cover what was persisted
    let reloaded = Pipeline::open(&config_in(&dir)).unwrap();
    let ledger = reloaded.ledger();

    let may = ledger.month("May", "2024").unwrap();
    assert_eq!(may.total_spent, 400.0);
    assert_eq!(may.transaction_count, 2);
    assert_eq!(may.average_transaction, 200.0);
    assert_eq!(may.highest_transaction, 300.0);
    assert_eq!(may.lowest_transaction, 100.0);

    assert_eq!(ledger.person("May", "2024", "Alice").unwrap().percentage, 25.0);
    assert_eq!(ledger.person("May", "2024", "Bob").unwrap().percentage, 75.0);

    let summary = ledger.summary().unwrap();
    assert_eq!(summary.total_months, 1);
    assert_eq!(summary.highest_month.unwrap().total, 400.0);
    assert_eq!(summary.individual_spending["May 2024"].len(), 2);
}

#[tokio::test]
async fn test_context_ignores_other_conversations() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::open(&config_in(&dir)).unwrap();

    let mut other = may_event("spent 100", "Alice");
    other.conversation_id = "15551234567@s.whatsapp.net".to_string();
    assert!(ctx.handle_event(&other).await.is_none());

    let processed = ctx.handle_event(&may_event("paid 2500 rent", "Bob")).await.unwrap();
    assert!(processed.insights.is_high_value);
    assert_eq!(processed.insights.category, Category::Housing);
    assert_eq!(ctx.summary().unwrap().total_spent, 2500.0);
    assert_eq!(ctx.pipeline().await.ledger().messages().len(), 1);
}

// =============================================================================
// Persistence under contention
// =============================================================================

#[tokio::test]
async fn test_busy_store_recovers_without_loss() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kitty.db");
    let db = Database::open(&path, SheetNames::default()).unwrap();
    let mut ledger = Ledger::load(db, RetryPolicy::new(3, Duration::from_millis(1))).unwrap();

    ledger.record_spending(&[100.0], "May", "2024", "Alice").await;

    let blocker = rusqlite::Connection::open(&path).unwrap();
    blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    // Every attempt meets the lock; the change stays in memory
    ledger.record_spending(&[300.0], "May", "2024", "Bob").await;
    assert!(!ledger.persist().await);
    assert_eq!(ledger.monthly_total("May", "2024"), 400.0);

    blocker.execute_batch("COMMIT;").unwrap();
    drop(blocker);

    assert!(ledger.persist().await);

    let reloaded = Ledger::load(
        Database::open(&path, SheetNames::default()).unwrap(),
        RetryPolicy::none(),
    )
    .unwrap();
    assert_eq!(reloaded.monthly().len(), 1);
    assert_eq!(reloaded.individual().len(), 2);
    assert_eq!(reloaded.monthly_total("May", "2024"), 400.0);
    assert_eq!(reloaded.month("May", "2024").unwrap().transaction_count, 2);
}
