//! Parsing of model-produced transaction arrays.
//!
//! PDF and image statements go through one model call that is asked for a JSON
//! array of `{description, amount, date}` rows, amounts in positive dollars.
//! Models wrap JSON in markdown fences often enough that stripping them is
//! part of the contract. An output that still is not a JSON array fails the
//! whole import; individual malformed rows are merely dropped.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::{amount, date, NormalizedTransaction};

#[derive(Debug, Error)]
pub enum ModelOutputError {
    #[error("model output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model output is not a JSON array")]
    NotAnArray,
}

/// Remove a wrapping markdown code fence (```json ... ```), if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse the model's statement output into normalized transactions.
///
/// `amount` may be a JSON number (dollars) or a string amount cell; rows with
/// a missing, malformed or non-positive amount are skipped. `now` substitutes
/// for unparseable dates.
pub fn parse_transaction_array(
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Vec<NormalizedTransaction>, ModelOutputError> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))?;
    let rows = value.as_array().ok_or(ModelOutputError::NotAnArray)?;

    let mut out = Vec::new();
    for row in rows {
        let Some(obj) = row.as_object() else {
            continue;
        };
        let Some(cents) = amount_cents(obj.get("amount")) else {
            tracing::debug!("skipping model row without a usable amount");
            continue;
        };
        if cents <= 0 {
            continue;
        }

        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        let date = obj
            .get("date")
            .and_then(Value::as_str)
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

/// Dollars-to-cents happens here, the one sanctioned boundary conversion.
fn amount_cents(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_f64().map(|dollars| (dollars * 100.0).round() as i64),
        Value::String(s) => amount::parse_amount_to_cents(s).ok(),
        _ => None,
    }
}
