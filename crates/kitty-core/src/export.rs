//! CSV export of individual sheets
//!
//! Sheets are rendered from the in-memory ledger with the same headers the
//! workbook uses, so an export matches what a download of the store shows.

use std::io::Write;
use std::str::FromStr;

use crate::db::{INDIVIDUAL_HEADERS, MESSAGE_HEADERS, MONTHLY_HEADERS};
use crate::error::{Error, Result};
use crate::ledger::Ledger;

/// One of the three workbook sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sheet {
    Messages,
    Monthly,
    Individual,
}

impl Sheet {
    pub const ALL: [Sheet; 3] = [Sheet::Messages, Sheet::Monthly, Sheet::Individual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sheet::Messages => "messages",
            Sheet::Monthly => "monthly",
            Sheet::Individual => "individual",
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Sheet::Messages => &MESSAGE_HEADERS,
            Sheet::Monthly => &MONTHLY_HEADERS,
            Sheet::Individual => &INDIVIDUAL_HEADERS,
        }
    }

    /// Suggested download file name
    pub fn file_name(&self) -> String {
        format!("kitty-{}.csv", self.as_str())
    }
}

impl std::fmt::Display for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sheet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "messages" => Ok(Sheet::Messages),
            "monthly" | "spending" | "spending-analysis" => Ok(Sheet::Monthly),
            "individual" | "people" | "individual-spending" => Ok(Sheet::Individual),
            _ => Err(Error::NotFound(format!(
                "Unknown sheet '{}' (expected messages, monthly or individual)",
                s
            ))),
        }
    }
}

/// Write one sheet as CSV
pub fn write_sheet_csv<W: Write>(ledger: &Ledger, sheet: Sheet, out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(sheet.headers())?;

    match sheet {
        Sheet::Messages => {
            for row in ledger.messages() {
                wtr.write_record([
                    row.timestamp.as_str(),
                    row.sender.as_str(),
                    row.message.as_str(),
                    row.extracted_numbers.as_str(),
                    row.extracted_items.as_str(),
                    row.is_spending_related.as_str(),
                    row.month.as_str(),
                    row.year.as_str(),
                ])?;
            }
        }
        Sheet::Monthly => {
            for row in ledger.monthly() {
                wtr.write_record([
                    row.month.clone(),
                    row.year.clone(),
                    row.total_spent.to_string(),
                    row.transaction_count.to_string(),
                    row.average_transaction.to_string(),
                    row.highest_transaction.to_string(),
                    row.lowest_transaction.to_string(),
                ])?;
            }
        }
        Sheet::Individual => {
            for row in ledger.individual() {
                wtr.write_record([
                    row.month.clone(),
                    row.year.clone(),
                    row.person.clone(),
                    row.total_spent.to_string(),
                    row.transaction_count.to_string(),
                    row.percentage.to_string(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Render one sheet as a CSV string
pub fn sheet_csv(ledger: &Ledger, sheet: Sheet) -> Result<String> {
    let mut buf = Vec::new();
    write_sheet_csv(ledger, sheet, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::InvalidData(e.to_string()))
}
