//! Domain models for kitty

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::extract::{Category, ExtractedItem};

/// Timestamp format used in the Messages sheet
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One inbound chat message, as handed over by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub text: String,
    /// Display name of the sender (falls back to the raw sender id)
    pub sender: String,
    pub conversation_id: String,
    /// Defaults to the time the event was decoded
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Status updates and protocol messages are never processed
    #[serde(default)]
    pub is_status: bool,
}

/// A processed message, one row of the Messages sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFact {
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub sender: String,
    pub text: String,
    /// Normalized amounts, unique, in first-seen order
    pub numbers: Vec<String>,
    pub items: Vec<ExtractedItem>,
    pub is_spending_related: bool,
    /// Full month name, e.g. "March"
    pub month: String,
    /// Four digit year
    pub year: String,
}

impl MessageFact {
    pub fn month_and_year(at: &NaiveDateTime) -> (String, String) {
        (at.format("%B").to_string(), at.format("%Y").to_string())
    }

    /// Amounts as numbers, skipping anything that doesn't parse
    pub fn amounts(&self) -> Vec<f64> {
        self.numbers
            .iter()
            .filter_map(|n| n.parse::<f64>().ok())
            .collect()
    }

    /// "25.5, 3.25"
    pub fn numbers_cell(&self) -> String {
        self.numbers.join(", ")
    }

    /// "coffee: $3.25; sandwich: $8.75"
    pub fn items_cell(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{}: ${}", item.label, item.amount))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// "Yes" / "No"
    pub fn spending_cell(&self) -> &'static str {
        if self.is_spending_related {
            "Yes"
        } else {
            "No"
        }
    }
}

/// A stored row of the Messages sheet
///
/// Rows are kept in their rendered form; the structured items are not
/// recoverable from the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    pub timestamp: String,
    pub sender: String,
    pub message: String,
    pub extracted_numbers: String,
    pub extracted_items: String,
    pub is_spending_related: String,
    pub month: String,
    pub year: String,
}

impl From<&MessageFact> for MessageRow {
    fn from(fact: &MessageFact) -> Self {
        Self {
            timestamp: fact.timestamp.clone(),
            sender: fact.sender.clone(),
            message: fact.text.clone(),
            extracted_numbers: fact.numbers_cell(),
            extracted_items: fact.items_cell(),
            is_spending_related: fact.spending_cell().to_string(),
            month: fact.month.clone(),
            year: fact.year.clone(),
        }
    }
}

/// Key of the monthly aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub month: String,
    pub year: String,
}

impl MonthKey {
    pub fn new(month: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            year: year.into(),
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month, self.year)
    }
}

/// Key of the per-person aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonKey {
    pub month: String,
    pub year: String,
    pub person: String,
}

/// Running spending statistics for one month (Spending Analysis sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: String,
    pub year: String,
    pub total_spent: f64,
    pub transaction_count: i64,
    pub average_transaction: f64,
    pub highest_transaction: f64,
    pub lowest_transaction: f64,
}

impl MonthlyAggregate {
    pub fn key(&self) -> MonthKey {
        MonthKey::new(&self.month, &self.year)
    }
}

/// Running spending statistics for one person in one month (Individual Spending sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualAggregate {
    pub month: String,
    pub year: String,
    pub person: String,
    pub total_spent: f64,
    pub transaction_count: i64,
    /// Share of the month's total, 0-100, two decimals
    pub percentage: f64,
}

impl IndividualAggregate {
    pub fn key(&self) -> PersonKey {
        PersonKey {
            month: self.month.clone(),
            year: self.year.clone(),
            person: self.person.clone(),
        }
    }
}

/// Month total used in summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: String,
    pub year: String,
    pub total: f64,
    pub transactions: i64,
}

/// One person's share of a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonShare {
    pub person: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Rollup of the aggregate sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_months: usize,
    pub total_spent: f64,
    pub average_monthly_spending: f64,
    /// Absent when no month has a positive total
    pub highest_month: Option<MonthTotal>,
    /// Last three months in sheet order
    pub recent_months: Vec<MonthTotal>,
    /// Keyed by "Month Year", in the order months first appear
    pub individual_spending: IndexMap<String, Vec<PersonShare>>,
}

/// Display-only facts about one processed message (never persisted)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingInsights {
    pub has_amount: bool,
    pub amount_count: usize,
    pub total_amount: f64,
    pub is_high_value: bool,
    pub category: Category,
}

/// Amount above which a message counts as high value
pub const HIGH_VALUE_THRESHOLD: f64 = 1000.0;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fact() -> MessageFact {
        MessageFact {
            timestamp: "2024-03-05 12:00:00".to_string(),
            sender: "Alice".to_string(),
            text: "Coffee 3.25 and sandwich 8.75".to_string(),
            numbers: vec!["3.25".to_string(), "8.75".to_string()],
            items: vec![
                ExtractedItem {
                    label: "coffee".to_string(),
                    amount: "3.25".to_string(),
                    original: "coffee 3.25".to_string(),
                },
                ExtractedItem {
                    label: "sandwich".to_string(),
                    amount: "8.75".to_string(),
                    original: "sandwich 8.75".to_string(),
                },
            ],
            is_spending_related: true,
            month: "March".to_string(),
            year: "2024".to_string(),
        }
    }

    #[test]
    fn test_message_row_rendering() {
        let row = MessageRow::from(&fact());
        assert_eq!(row.extracted_numbers, "3.25, 8.75");
        assert_eq!(row.extracted_items, "coffee: $3.25; sandwich: $8.75");
        assert_eq!(row.is_spending_related, "Yes");
        assert_eq!(row.message, "Coffee 3.25 and sandwich 8.75");
    }

    #[test]
    fn test_month_and_year() {
        let at = NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            MessageFact::month_and_year(&at),
            ("November".to_string(), "2024".to_string())
        );
    }

    #[test]
    fn test_event_defaults() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"text": "hi", "sender": "Bob", "conversation_id": "g@g.us"}"#,
        )
        .unwrap();
        assert!(!event.is_status);
        assert_eq!(event.sender, "Bob");
    }

    #[test]
    fn test_month_key_display() {
        assert_eq!(MonthKey::new("May", "2025").to_string(), "May 2025");
    }
}
