//! Ledger store: the three sheets held in memory, rewritten to the workbook
//! after every mutation.
//!
//! Aggregates are kept in sheet order alongside a key index, so lookups don't
//! rescan the rows and persisting preserves the order rows were first seen in.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    IndividualAggregate, MessageFact, MessageRow, MonthKey, MonthTotal, MonthlyAggregate,
    PersonKey, PersonShare, Summary,
};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Number of months listed under "recent" in a summary
const RECENT_MONTHS: usize = 3;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn month_total(row: &MonthlyAggregate) -> MonthTotal {
    MonthTotal {
        month: row.month.clone(),
        year: row.year.clone(),
        total: row.total_spent,
        transactions: row.transaction_count,
    }
}

pub struct Ledger {
    db: Database,
    retry: RetryPolicy,
    messages: Vec<MessageRow>,
    monthly: Vec<MonthlyAggregate>,
    monthly_index: HashMap<MonthKey, usize>,
    individual: Vec<IndividualAggregate>,
    individual_index: HashMap<PersonKey, usize>,
}

impl Ledger {
    /// Load the ledger from the workbook, starting empty if it has no rows yet
    pub fn load(db: Database, retry: RetryPolicy) -> Result<Self> {
        let workbook = db.load_workbook()?;

        let mut ledger = Self {
            db,
            retry,
            messages: workbook.messages,
            monthly: Vec::with_capacity(workbook.monthly.len()),
            monthly_index: HashMap::new(),
            individual: Vec::with_capacity(workbook.individual.len()),
            individual_index: HashMap::new(),
        };

        for row in workbook.monthly {
            let key = row.key();
            if ledger.monthly_index.contains_key(&key) {
                warn!(month = %row.month, year = %row.year, "Ignoring duplicate monthly row");
                continue;
            }
            ledger.monthly_index.insert(key, ledger.monthly.len());
            ledger.monthly.push(row);
        }

        for row in workbook.individual {
            let key = row.key();
            if ledger.individual_index.contains_key(&key) {
                warn!(
                    month = %row.month,
                    year = %row.year,
                    person = %row.person,
                    "Ignoring duplicate individual row"
                );
                continue;
            }
            ledger.individual_index.insert(key, ledger.individual.len());
            ledger.individual.push(row);
        }

        info!(
            messages = ledger.messages.len(),
            months = ledger.monthly.len(),
            people = ledger.individual.len(),
            "Ledger loaded"
        );
        Ok(ledger)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn messages(&self) -> &[MessageRow] {
        &self.messages
    }

    pub fn monthly(&self) -> &[MonthlyAggregate] {
        &self.monthly
    }

    pub fn individual(&self) -> &[IndividualAggregate] {
        &self.individual
    }

    /// Monthly aggregate for a month, if any spending was recorded
    pub fn month(&self, month: &str, year: &str) -> Option<&MonthlyAggregate> {
        self.monthly_index
            .get(&MonthKey::new(month, year))
            .map(|&idx| &self.monthly[idx])
    }

    /// Individual aggregate for one person in one month
    pub fn person(&self, month: &str, year: &str, person: &str) -> Option<&IndividualAggregate> {
        let key = PersonKey {
            month: month.to_string(),
            year: year.to_string(),
            person: person.to_string(),
        };
        self.individual_index
            .get(&key)
            .map(|&idx| &self.individual[idx])
    }

    /// Total spent in a month, 0 when nothing is recorded
    pub fn monthly_total(&self, month: &str, year: &str) -> f64 {
        self.month(month, year).map_or(0.0, |m| m.total_spent)
    }

    /// Append one row to the Messages sheet and persist
    pub async fn append_message(&mut self, fact: &MessageFact) {
        self.messages.push(MessageRow::from(fact));
        debug!(sender = %fact.sender, rows = self.messages.len(), "Message appended");
        self.persist().await;
    }

    /// Attribute `amounts` to the month and to `person`, then persist
    ///
    /// Non-finite and non-positive amounts are ignored; when none remain, or
    /// the month's total would overflow, this does nothing.
    pub async fn record_spending(
        &mut self,
        amounts: &[f64],
        month: &str,
        year: &str,
        person: &str,
    ) {
        let amounts: Vec<f64> = amounts
            .iter()
            .copied()
            .filter(|a| a.is_finite() && *a > 0.0)
            .collect();
        if amounts.is_empty() {
            return;
        }

        let sum: f64 = amounts.iter().sum();
        // A person's total never exceeds the month's, so this covers both rows
        if !(self.monthly_total(month, year) + sum).is_finite() {
            warn!(month, year, person, "Ignoring spending that would overflow the totals");
            return;
        }
        let count = amounts.len() as i64;
        let highest = amounts.iter().copied().fold(f64::MIN, f64::max);
        let lowest = amounts.iter().copied().fold(f64::MAX, f64::min);

        let month_key = MonthKey::new(month, year);
        match self.monthly_index.get(&month_key) {
            Some(&idx) => {
                let row = &mut self.monthly[idx];
                row.total_spent += sum;
                row.transaction_count += count;
                row.average_transaction = row.total_spent / row.transaction_count as f64;
                row.highest_transaction = row.highest_transaction.max(highest);
                row.lowest_transaction = row.lowest_transaction.min(lowest);
            }
            None => {
                self.monthly_index.insert(month_key, self.monthly.len());
                self.monthly.push(MonthlyAggregate {
                    month: month.to_string(),
                    year: year.to_string(),
                    total_spent: sum,
                    transaction_count: count,
                    average_transaction: sum / count as f64,
                    highest_transaction: highest,
                    lowest_transaction: lowest,
                });
            }
        }

        let person_key = PersonKey {
            month: month.to_string(),
            year: year.to_string(),
            person: person.to_string(),
        };
        match self.individual_index.get(&person_key) {
            Some(&idx) => {
                let row = &mut self.individual[idx];
                row.total_spent += sum;
                row.transaction_count += count;
            }
            None => {
                self.individual_index.insert(person_key, self.individual.len());
                self.individual.push(IndividualAggregate {
                    month: month.to_string(),
                    year: year.to_string(),
                    person: person.to_string(),
                    total_spent: sum,
                    transaction_count: count,
                    percentage: 0.0,
                });
            }
        }

        self.refresh_percentages(month, year);

        info!(
            month,
            year,
            person,
            amount = sum,
            transactions = count,
            "Spending recorded"
        );
        self.persist().await;
    }

    /// Recompute every person's share of the month's total
    fn refresh_percentages(&mut self, month: &str, year: &str) {
        let total = self.monthly_total(month, year);
        for row in self
            .individual
            .iter_mut()
            .filter(|r| r.month == month && r.year == year)
        {
            row.percentage = if total > 0.0 {
                round2(row.total_spent / total * 100.0)
            } else {
                0.0
            };
        }
    }

    /// Write the whole ledger, retrying while the store is busy
    pub async fn try_persist(&self) -> Result<()> {
        let this = self;
        retry_with_backoff(&self.retry, Error::is_busy, move || async move {
            this.db
                .write_workbook(&this.messages, &this.monthly, &this.individual)
        })
        .await
    }

    /// Write the whole ledger, logging instead of failing
    ///
    /// Returns whether the write landed. The in-memory ledger is untouched
    /// either way, so the next persist writes everything again.
    pub async fn persist(&self) -> bool {
        match self.try_persist().await {
            Ok(()) => {
                debug!(path = %self.db.path().display(), "Workbook saved");
                true
            }
            Err(e) => {
                error!(
                    path = %self.db.path().display(),
                    "Failed to save workbook, keeping changes in memory: {}",
                    e
                );
                false
            }
        }
    }

    /// Rollup of the aggregate sheets, `None` before any spending is recorded
    pub fn summary(&self) -> Option<Summary> {
        if self.monthly.is_empty() {
            return None;
        }

        let total_spent: f64 = self.monthly.iter().map(|m| m.total_spent).sum();
        let total_months = self.monthly.len();

        let mut highest: Option<&MonthlyAggregate> = None;
        for row in &self.monthly {
            if row.total_spent > highest.map_or(0.0, |h| h.total_spent) {
                highest = Some(row);
            }
        }

        let recent_months = self.monthly[total_months.saturating_sub(RECENT_MONTHS)..]
            .iter()
            .map(month_total)
            .collect();

        let mut individual_spending: IndexMap<String, Vec<PersonShare>> = IndexMap::new();
        for row in &self.individual {
            individual_spending
                .entry(format!("{} {}", row.month, row.year))
                .or_default()
                .push(PersonShare {
                    person: row.person.clone(),
                    amount: row.total_spent,
                    percentage: row.percentage,
                });
        }

        Some(Summary {
            total_months,
            total_spent,
            average_monthly_spending: total_spent / total_months as f64,
            highest_month: highest.map(month_total),
            recent_months,
            individual_spending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetNames;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn ledger() -> Ledger {
        let db = Database::temporary(SheetNames::default()).unwrap();
        Ledger::load(db, fast_retry()).unwrap()
    }

    fn fact(text: &str, numbers: &[&str]) -> MessageFact {
        MessageFact {
            timestamp: "2024-05-02 10:00:00".to_string(),
            sender: "Alice".to_string(),
            text: text.to_string(),
            numbers: numbers.iter().map(|n| n.to_string()).collect(),
            items: vec![],
            is_spending_related: !numbers.is_empty(),
            month: "May".to_string(),
            year: "2024".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_ledger_has_no_summary() {
        let ledger = ledger();
        assert!(ledger.summary().is_none());
        assert_eq!(ledger.monthly_total("May", "2024"), 0.0);
    }

    #[tokio::test]
    async fn test_monthly_aggregate_seeded_then_updated() {
        let mut ledger = ledger();
        ledger.record_spending(&[10.0, 30.0], "May", "2024", "Alice").await;

        let may = ledger.month("May", "2024").unwrap();
        assert_eq!(may.total_spent, 40.0);
        assert_eq!(may.transaction_count, 2);
        assert_eq!(may.average_transaction, 20.0);
        assert_eq!(may.highest_transaction, 30.0);
        assert_eq!(may.lowest_transaction, 10.0);

        ledger.record_spending(&[5.0], "May", "2024", "Bob").await;
        let may = ledger.month("May", "2024").unwrap();
        assert_eq!(may.total_spent, 45.0);
        assert_eq!(may.transaction_count, 3);
        assert_eq!(may.average_transaction, 15.0);
        assert_eq!(may.highest_transaction, 30.0);
        assert_eq!(may.lowest_transaction, 5.0);
    }

    #[tokio::test]
    async fn test_aggregate_consistency() {
        let mut ledger = ledger();
        let batches: [&[f64]; 4] = [&[12.5], &[3.25, 99.99], &[0.01], &[1500.0, 7.0]];
        for (i, amounts) in batches.iter().enumerate() {
            let person = if i % 2 == 0 { "Alice" } else { "Bob" };
            ledger.record_spending(amounts, "June", "2024", person).await;

            let june = ledger.month("June", "2024").unwrap();
            let product = june.average_transaction * june.transaction_count as f64;
            assert!((product - june.total_spent).abs() < 1e-9);
            assert!(june.lowest_transaction <= june.average_transaction);
            assert!(june.average_transaction <= june.highest_transaction);
        }
    }

    #[tokio::test]
    async fn test_percentages_follow_month_total() {
        let mut ledger = ledger();
        ledger.record_spending(&[100.0], "May", "2024", "Alice").await;
        assert_eq!(ledger.person("May", "2024", "Alice").unwrap().percentage, 100.0);

        ledger.record_spending(&[300.0], "May", "2024", "Bob").await;
        assert_eq!(ledger.person("May", "2024", "Alice").unwrap().percentage, 25.0);
        assert_eq!(ledger.person("May", "2024", "Bob").unwrap().percentage, 75.0);

        ledger.record_spending(&[1.0], "June", "2024", "Carol").await;
        assert_eq!(ledger.person("May", "2024", "Alice").unwrap().percentage, 25.0);
        assert_eq!(ledger.person("June", "2024", "Carol").unwrap().percentage, 100.0);

        for row in ledger.individual() {
            assert!((0.0..=100.0).contains(&row.percentage));
        }
    }

    #[tokio::test]
    async fn test_percentage_rounded_to_two_decimals() {
        let mut ledger = ledger();
        ledger.record_spending(&[1.0], "May", "2024", "Alice").await;
        ledger.record_spending(&[2.0], "May", "2024", "Bob").await;
        assert_eq!(ledger.person("May", "2024", "Alice").unwrap().percentage, 33.33);
        assert_eq!(ledger.person("May", "2024", "Bob").unwrap().percentage, 66.67);
    }

    #[tokio::test]
    async fn test_keys_match_exactly() {
        let mut ledger = ledger();
        ledger.record_spending(&[1.0], "May", "2024", "alice").await;
        ledger.record_spending(&[1.0], "May", "2024", "Alice").await;
        ledger.record_spending(&[1.0], "may", "2024", "Alice").await;
        assert_eq!(ledger.monthly().len(), 2);
        assert_eq!(ledger.individual().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_amounts_ignored() {
        let mut ledger = ledger();
        ledger
            .record_spending(&[0.0, -4.0, f64::NAN], "May", "2024", "Alice")
            .await;
        assert!(ledger.monthly().is_empty());
        assert!(ledger.individual().is_empty());

        ledger
            .record_spending(&[-1.0, 8.0], "May", "2024", "Alice")
            .await;
        let may = ledger.month("May", "2024").unwrap();
        assert_eq!(may.transaction_count, 1);
        assert_eq!(may.lowest_transaction, 8.0);
    }

    #[tokio::test]
    async fn test_append_message_persists() {
        let mut ledger = ledger();
        ledger.append_message(&fact("hello", &[])).await;
        ledger.append_message(&fact("lunch 12", &["12"])).await;

        let reloaded = Ledger::load(ledger.db().clone(), fast_retry()).unwrap();
        assert_eq!(reloaded.messages().len(), 2);
        assert_eq!(reloaded.messages()[0].message, "hello");
        assert_eq!(reloaded.messages()[1].extracted_numbers, "12");
        assert_eq!(reloaded.messages()[1].is_spending_related, "Yes");
    }

    #[tokio::test]
    async fn test_reload_preserves_order_and_values() {
        let mut ledger = ledger();
        ledger.record_spending(&[50.0], "April", "2024", "Alice").await;
        ledger.record_spending(&[20.0], "May", "2024", "Bob").await;
        ledger.record_spending(&[30.0], "April", "2024", "Bob").await;

        let reloaded = Ledger::load(ledger.db().clone(), fast_retry()).unwrap();
        assert_eq!(reloaded.monthly(), ledger.monthly());
        assert_eq!(reloaded.individual(), ledger.individual());
        assert_eq!(reloaded.monthly()[0].month, "April");
        assert_eq!(reloaded.monthly_total("April", "2024"), 80.0);
    }

    #[tokio::test]
    async fn test_summary() {
        let mut ledger = ledger();
        ledger.record_spending(&[10.0], "January", "2024", "Alice").await;
        ledger.record_spending(&[40.0], "February", "2024", "Alice").await;
        ledger.record_spending(&[40.0], "March", "2024", "Bob").await;
        ledger.record_spending(&[30.0], "April", "2024", "Bob").await;

        let summary = ledger.summary().unwrap();
        assert_eq!(summary.total_months, 4);
        assert_eq!(summary.total_spent, 120.0);
        assert_eq!(summary.average_monthly_spending, 30.0);

        // First-seen month wins a tie
        let highest = summary.highest_month.unwrap();
        assert_eq!(highest.month, "February");
        assert_eq!(highest.total, 40.0);

        let recent: Vec<_> = summary.recent_months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(recent, vec!["February", "March", "April"]);

        let march = &summary.individual_spending["March 2024"];
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].person, "Bob");
        assert_eq!(march[0].percentage, 100.0);
    }

    #[tokio::test]
    async fn test_summary_groups_people_by_first_seen_month() {
        let mut ledger = ledger();
        ledger.record_spending(&[10.0], "May", "2024", "Alice").await;
        ledger.record_spending(&[20.0], "June", "2024", "Bob").await;
        ledger.record_spending(&[30.0], "April", "2024", "Carol").await;
        ledger.record_spending(&[5.0], "May", "2024", "Dave").await;

        let summary = ledger.summary().unwrap();
        let recent: Vec<_> = summary.recent_months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(recent, vec!["May", "June", "April"]);

        let groups: Vec<_> = summary.individual_spending.keys().map(String::as_str).collect();
        assert_eq!(groups, vec!["May 2024", "June 2024", "April 2024"]);
        let may: Vec<_> = summary.individual_spending["May 2024"]
            .iter()
            .map(|s| s.person.as_str())
            .collect();
        assert_eq!(may, vec!["Alice", "Dave"]);
    }

    #[tokio::test]
    async fn test_overflowing_spending_ignored() {
        let mut ledger = ledger();
        ledger.record_spending(&[f64::MAX], "May", "2024", "Alice").await;
        ledger.record_spending(&[f64::MAX], "May", "2024", "Bob").await;
        ledger.record_spending(&[f64::MAX, f64::MAX], "June", "2024", "Carol").await;

        let may = ledger.month("May", "2024").unwrap();
        assert_eq!(may.total_spent, f64::MAX);
        assert_eq!(may.transaction_count, 1);
        assert!(ledger.person("May", "2024", "Bob").is_none());
        assert_eq!(ledger.person("May", "2024", "Alice").unwrap().percentage, 100.0);
        assert!(ledger.month("June", "2024").is_none());
        for row in ledger.individual() {
            assert!((0.0..=100.0).contains(&row.percentage));
        }
    }

    #[tokio::test]
    async fn test_summary_without_positive_month() {
        let db = Database::temporary(SheetNames::default()).unwrap();
        let zero = MonthlyAggregate {
            month: "May".to_string(),
            year: "2024".to_string(),
            total_spent: 0.0,
            transaction_count: 0,
            average_transaction: 0.0,
            highest_transaction: 0.0,
            lowest_transaction: 0.0,
        };
        db.write_workbook(&[], &[zero], &[]).unwrap();

        let ledger = Ledger::load(db, fast_retry()).unwrap();
        let summary = ledger.summary().unwrap();
        assert_eq!(summary.total_months, 1);
        assert!(summary.highest_month.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_rows_keep_first() {
        let db = Database::temporary(SheetNames::default()).unwrap();
        let row = |total: f64| MonthlyAggregate {
            month: "May".to_string(),
            year: "2024".to_string(),
            total_spent: total,
            transaction_count: 1,
            average_transaction: total,
            highest_transaction: total,
            lowest_transaction: total,
        };
        db.write_workbook(&[], &[row(5.0), row(9.0)], &[]).unwrap();

        let ledger = Ledger::load(db, fast_retry()).unwrap();
        assert_eq!(ledger.monthly().len(), 1);
        assert_eq!(ledger.monthly_total("May", "2024"), 5.0);
    }

    #[tokio::test]
    async fn test_busy_store_keeps_memory_and_recovers() {
        let mut ledger = ledger();
        ledger.record_spending(&[100.0], "May", "2024", "Alice").await;

        let blocker = rusqlite::Connection::open(ledger.db().path()).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        ledger.record_spending(&[300.0], "May", "2024", "Bob").await;
        assert!(!ledger.persist().await);
        assert_eq!(ledger.monthly_total("May", "2024"), 400.0);

        blocker.execute_batch("ROLLBACK;").unwrap();
        assert!(ledger.persist().await);
        assert!(ledger.persist().await);

        let reloaded = Ledger::load(ledger.db().clone(), fast_retry()).unwrap();
        assert_eq!(reloaded.monthly().len(), 1);
        assert_eq!(reloaded.individual().len(), 2);
        assert_eq!(reloaded.monthly_total("May", "2024"), 400.0);
        assert_eq!(reloaded.person("May", "2024", "Alice").unwrap().percentage, 25.0);
    }
}
