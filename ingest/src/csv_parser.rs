//! Tolerant CSV statement parsing.
//!
//! Banks do not agree on headers, so columns are located by case-insensitive
//! substring match. Only the amount column is required. Bad rows are skipped,
//! never reported per-row; the import contract is best-effort.

use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use thiserror::Error;

use crate::{amount, date, NormalizedTransaction};

/// Data rows processed per import. Later rows are ignored, not an error.
pub const MAX_ROWS: usize = 100;

const DESCRIPTION_HEADERS: &[&str] = &["desc", "merchant", "name", "narration"];
const AMOUNT_HEADERS: &[&str] = &["amount", "debit", "credit"];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("statement is empty")]
    Empty,
    #[error("no amount column found (expected a header containing one of amount, debit, credit)")]
    MissingAmountColumn,
    #[error("failed to read csv: {0}")]
    Read(#[from] csv::Error),
}

struct Columns {
    date: Option<usize>,
    description: Option<usize>,
    amount: usize,
}

fn locate_columns(headers: &csv::StringRecord) -> Result<Columns, CsvError> {
    let lower: Vec<String> = headers
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let find = |names: &[&str]| {
        lower
            .iter()
            .position(|header| names.iter().any(|name| header.contains(name)))
    };

    Ok(Columns {
        date: find(&["date"]),
        description: find(DESCRIPTION_HEADERS),
        amount: find(AMOUNT_HEADERS).ok_or(CsvError::MissingAmountColumn)?,
    })
}

/// Parse statement CSV text into normalized transactions.
///
/// `now` substitutes for missing or unparseable dates. Rows with an
/// unparseable or non-positive amount (credits, refunds) are dropped.
pub fn parse_statement_csv(
    text: &str,
    now: DateTime<Utc>,
) -> Result<Vec<NormalizedTransaction>, CsvError> {
    if text.trim().is_empty() {
        return Err(CsvError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let columns = locate_columns(reader.headers()?)?;

    let mut out = Vec::new();
    for record in reader.records().take(MAX_ROWS) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable csv row");
                continue;
            }
        };

        let Some(cell) = record.get(columns.amount) else {
            continue;
        };
        let cents = match amount::parse_amount_to_cents(cell) {
            Ok(cents) => cents,
            Err(_) => {
                tracing::debug!(cell = %cell, "skipping row with unparseable amount");
                continue;
            }
        };
        if cents <= 0 {
            continue;
        }

        let description = columns
            .description
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        let date = columns
            .date
            .and_then(|i| record.get(i))
            .and_then(date::parse_flexible)
            .unwrap_or(now);

        out.push(NormalizedTransaction {
            description,
            amount_cents: cents,
            date,
        });
    }

    Ok(out)
}
