//! Pipeline coordinator
//!
//! Takes one inbound event at a time through extract, append, aggregate and
//! persist. Events from other conversations and status updates are dropped
//! before any work is done.

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::extract::{categorize, sanitize_sender, Extraction, Extractor};
use crate::ledger::Ledger;
use crate::models::{
    InboundEvent, MessageFact, SpendingInsights, HIGH_VALUE_THRESHOLD, TIMESTAMP_FORMAT,
};

/// Outcome of processing one event
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMessage {
    pub fact: MessageFact,
    pub insights: SpendingInsights,
}

pub struct Pipeline {
    target_conversation: String,
    spending_analysis: bool,
    extractor: Extractor,
    ledger: Ledger,
}

impl Pipeline {
    pub fn new(config: &Config, extractor: Extractor, ledger: Ledger) -> Self {
        Self {
            target_conversation: config.target_conversation.clone(),
            spending_analysis: config.spending_analysis,
            extractor,
            ledger,
        }
    }

    /// Compile the patterns, open the workbook and load the ledger
    pub fn open(config: &Config) -> Result<Self> {
        let extractor = Extractor::from_config(config)?;
        let db = Database::open(&config.store_path, config.sheets.clone())?;
        let ledger = Ledger::load(db, config.persist.retry_policy())?;
        Ok(Self::new(config, extractor, ledger))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Whether an event should be processed at all
    pub fn accepts(&self, event: &InboundEvent) -> bool {
        !event.is_status && event.conversation_id == self.target_conversation
    }

    /// Process one event; `None` when it was ignored or could not be extracted
    pub async fn on_message(&mut self, event: &InboundEvent) -> Option<ProcessedMessage> {
        if !self.accepts(event) {
            debug!(conversation = %event.conversation_id, "Ignoring event");
            return None;
        }

        let extraction = match self.extractor.extract(&event.text) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Skipping message that failed extraction: {}", e);
                return None;
            }
        };

        let fact = self.build_fact(event, extraction);
        self.ledger.append_message(&fact).await;

        if !fact.numbers.is_empty() && self.spending_analysis {
            self.ledger
                .record_spending(&fact.amounts(), &fact.month, &fact.year, &fact.sender)
                .await;
        }

        let insights = insights(&fact);
        info!(
            sender = %fact.sender,
            amounts = insights.amount_count,
            total = insights.total_amount,
            high_value = insights.is_high_value,
            category = %insights.category,
            "Message processed"
        );

        Some(ProcessedMessage { fact, insights })
    }

    /// Combine an extraction with the event's sender and local timestamp
    pub fn build_fact(&self, event: &InboundEvent, extraction: Extraction) -> MessageFact {
        let local = event.timestamp.with_timezone(&Local).naive_local();
        let (month, year) = MessageFact::month_and_year(&local);
        let text = event.text.trim().to_string();

        MessageFact {
            timestamp: local.format(TIMESTAMP_FORMAT).to_string(),
            sender: sanitize_sender(&event.sender),
            is_spending_related: self.extractor.is_spending_related(&text),
            text,
            numbers: extraction.numbers,
            items: extraction.items,
            month,
            year,
        }
    }
}

/// Display facts for a processed message
pub fn insights(fact: &MessageFact) -> SpendingInsights {
    let amounts = fact.amounts();
    let total_amount: f64 = amounts.iter().sum();

    SpendingInsights {
        has_amount: !fact.numbers.is_empty(),
        amount_count: fact.numbers.len(),
        total_amount,
        is_high_value: total_amount > HIGH_VALUE_THRESHOLD,
        category: categorize(&fact.text),
    }
}
