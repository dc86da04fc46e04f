//! Reading and rewriting the three sheets

use rusqlite::types::ValueRef;
use rusqlite::{Row, TransactionBehavior};
use tracing::{debug, warn};

use super::{quote_ident, Database};
use crate::error::Result;
use crate::models::{IndividualAggregate, MessageRow, MonthlyAggregate};

pub const MESSAGE_HEADERS: [&str; 8] = [
    "Timestamp",
    "Sender",
    "Message",
    "Extracted Numbers",
    "Extracted Items",
    "Is Spending Related",
    "Month",
    "Year",
];

pub const MONTHLY_HEADERS: [&str; 7] = [
    "Month",
    "Year",
    "Total Spent",
    "Number of Transactions",
    "Average Transaction",
    "Highest Transaction",
    "Lowest Transaction",
];

pub const INDIVIDUAL_HEADERS: [&str; 6] = [
    "Month",
    "Year",
    "Person",
    "Total Spent",
    "Number of Transactions",
    "Percentage of Total",
];

/// Contents of all three sheets, rows in sheet order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub messages: Vec<MessageRow>,
    pub monthly: Vec<MonthlyAggregate>,
    pub individual: Vec<IndividualAggregate>,
}

fn column_list(headers: &[&str]) -> String {
    headers
        .iter()
        .map(|h| quote_ident(h))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn text(row: &Row, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Null | ValueRef::Blob(_) => String::new(),
    })
}

/// Numeric cell; anything that isn't a finite number reads as 0
fn number(row: &Row, idx: usize) -> rusqlite::Result<f64> {
    let value = match row.get_ref(idx)? {
        ValueRef::Real(f) => f,
        ValueRef::Integer(i) => i as f64,
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0.0),
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

fn count(row: &Row, idx: usize) -> rusqlite::Result<i64> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => i,
        _ => number(row, idx)? as i64,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        timestamp: text(row, 0)?,
        sender: text(row, 1)?,
        message: text(row, 2)?,
        extracted_numbers: text(row, 3)?,
        extracted_items: text(row, 4)?,
        is_spending_related: text(row, 5)?,
        month: text(row, 6)?,
        year: text(row, 7)?,
    })
}

fn row_to_monthly(row: &Row) -> rusqlite::Result<MonthlyAggregate> {
    Ok(MonthlyAggregate {
        month: text(row, 0)?,
        year: text(row, 1)?,
        total_spent: number(row, 2)?,
        transaction_count: count(row, 3)?,
        average_transaction: number(row, 4)?,
        highest_transaction: number(row, 5)?,
        lowest_transaction: number(row, 6)?,
    })
}

fn row_to_individual(row: &Row) -> rusqlite::Result<IndividualAggregate> {
    Ok(IndividualAggregate {
        month: text(row, 0)?,
        year: text(row, 1)?,
        person: text(row, 2)?,
        total_spent: number(row, 3)?,
        transaction_count: count(row, 4)?,
        percentage: number(row, 5)?,
    })
}

impl Database {
    /// Read one sheet
    ///
    /// Bad cells decode as 0 or empty; rows that can't be read at all are skipped.
    fn read_sheet<T>(
        &self,
        sheet: &str,
        headers: &[&str],
        decode: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            column_list(headers),
            quote_ident(sheet)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], decode)?;

        let mut decoded = Vec::new();
        for (idx, row) in rows.enumerate() {
            match row {
                Ok(value) => decoded.push(value),
                Err(e) => warn!(sheet, row = idx + 1, "Skipping malformed row: {}", e),
            }
        }
        Ok(decoded)
    }

    /// Read every sheet of the workbook
    pub fn load_workbook(&self) -> Result<Workbook> {
        let sheets = self.sheets().clone();
        let workbook = Workbook {
            messages: self.read_sheet(&sheets.messages, &MESSAGE_HEADERS, row_to_message)?,
            monthly: self.read_sheet(&sheets.monthly, &MONTHLY_HEADERS, row_to_monthly)?,
            individual: self.read_sheet(
                &sheets.individual,
                &INDIVIDUAL_HEADERS,
                row_to_individual,
            )?,
        };
        debug!(
            messages = workbook.messages.len(),
            months = workbook.monthly.len(),
            people = workbook.individual.len(),
            "Loaded workbook"
        );
        Ok(workbook)
    }

    /// Replace the contents of every sheet in a single write transaction
    ///
    /// Fails with `DatabaseBusy` when another connection holds the write lock;
    /// the previous contents stay intact in that case.
    pub fn write_workbook(
        &self,
        messages: &[MessageRow],
        monthly: &[MonthlyAggregate],
        individual: &[IndividualAggregate],
    ) -> Result<()> {
        let sheets = self.sheets().clone();
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for sheet in [&sheets.messages, &sheets.monthly, &sheets.individual] {
            tx.execute(&format!("DELETE FROM {}", quote_ident(sheet)), [])?;
        }

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&sheets.messages),
                column_list(&MESSAGE_HEADERS),
                placeholders(MESSAGE_HEADERS.len())
            ))?;
            for m in messages {
                stmt.execute(rusqlite::params![
                    m.timestamp,
                    m.sender,
                    m.message,
                    m.extracted_numbers,
                    m.extracted_items,
                    m.is_spending_related,
                    m.month,
                    m.year,
                ])?;
            }

            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&sheets.monthly),
                column_list(&MONTHLY_HEADERS),
                placeholders(MONTHLY_HEADERS.len())
            ))?;
            for m in monthly {
                stmt.execute(rusqlite::params![
                    m.month,
                    m.year,
                    m.total_spent,
                    m.transaction_count,
                    m.average_transaction,
                    m.highest_transaction,
                    m.lowest_transaction,
                ])?;
            }

            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&sheets.individual),
                column_list(&INDIVIDUAL_HEADERS),
                placeholders(INDIVIDUAL_HEADERS.len())
            ))?;
            for i in individual {
                stmt.execute(rusqlite::params![
                    i.month,
                    i.year,
                    i.person,
                    i.total_spent,
                    i.transaction_count,
                    i.percentage,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetNames;

    fn monthly(month: &str, total: f64) -> MonthlyAggregate {
        MonthlyAggregate {
            month: month.to_string(),
            year: "2024".to_string(),
            total_spent: total,
            transaction_count: 1,
            average_transaction: total,
            highest_transaction: total,
            lowest_transaction: total,
        }
    }

    #[test]
    fn test_empty_workbook() {
        let db = Database::temporary(SheetNames::default()).unwrap();
        assert_eq!(db.load_workbook().unwrap(), Workbook::default());
    }

    #[test]
    fn test_write_replaces_contents_in_order() {
        let db = Database::temporary(SheetNames::default()).unwrap();
        db.write_workbook(&[], &[monthly("May", 10.0), monthly("April", 5.0)], &[])
            .unwrap();
        db.write_workbook(&[], &[monthly("June", 1.0)], &[]).unwrap();

        let workbook = db.load_workbook().unwrap();
        assert_eq!(workbook.monthly, vec![monthly("June", 1.0)]);

        db.write_workbook(&[], &[monthly("May", 10.0), monthly("April", 5.0)], &[])
            .unwrap();
        let months: Vec<_> = db
            .load_workbook()
            .unwrap()
            .monthly
            .into_iter()
            .map(|m| m.month)
            .collect();
        assert_eq!(months, vec!["May", "April"]);
    }

    #[test]
    fn test_bad_cells_read_as_zero() {
        let db = Database::temporary(SheetNames::default()).unwrap();
        db.write_workbook(&[], &[monthly("May", 10.0)], &[]).unwrap();
        {
            let conn = db.conn().unwrap();
            conn.execute(
                r#"INSERT INTO "Spending Analysis" ("Month", "Year", "Total Spent", "Number of Transactions") VALUES ('June', 2024, 'lots', '3')"#,
                [],
            )
            .unwrap();
        }

        let workbook = db.load_workbook().unwrap();
        assert_eq!(workbook.monthly.len(), 2);
        assert_eq!(workbook.monthly[0], monthly("May", 10.0));

        let june = &workbook.monthly[1];
        assert_eq!(june.month, "June");
        assert_eq!(june.year, "2024");
        assert_eq!(june.total_spent, 0.0);
        assert_eq!(june.transaction_count, 3);
        assert_eq!(june.highest_transaction, 0.0);

        // The row survives the next full rewrite
        db.write_workbook(&workbook.messages, &workbook.monthly, &workbook.individual)
            .unwrap();
        assert_eq!(db.load_workbook().unwrap().monthly.len(), 2);
    }

    #[test]
    fn test_custom_sheet_names() {
        let sheets = SheetNames {
            messages: "Chat \"Log\"".to_string(),
            monthly: "Monthly".to_string(),
            individual: "People".to_string(),
        };
        let db = Database::temporary(sheets).unwrap();
        db.write_workbook(&[], &[monthly("May", 2.0)], &[]).unwrap();
        assert_eq!(db.load_workbook().unwrap().monthly.len(), 1);
    }

    #[test]
    fn test_busy_write_leaves_contents_intact() {
        let db = Database::temporary(SheetNames::default()).unwrap();
        db.write_workbook(&[], &[monthly("May", 10.0)], &[]).unwrap();

        let blocker = rusqlite::Connection::open(db.path()).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();

        let err = db
            .write_workbook(&[], &[monthly("June", 1.0)], &[])
            .unwrap_err();
        assert!(err.is_busy());

        blocker.execute_batch("ROLLBACK;").unwrap();
        assert_eq!(db.load_workbook().unwrap().monthly, vec![monthly("May", 10.0)]);
    }
}
