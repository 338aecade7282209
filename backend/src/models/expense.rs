use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::category::Category;

/// Sentinel id for an expense that was produced but never persisted
/// (free-tier uploads). Not a real row.
pub const EPHEMERAL_ID: i64 = -1;

/// Where an expense record came from. Drives UI grouping; everything except
/// receipt uploads requires premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Receipt,
    Manual,
    BankStatement,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Receipt => "receipt",
            Source::Manual => "manual",
            Source::BankStatement => "bank_statement",
        }
    }

    pub fn from_str_lossy(s: &str) -> Source {
        match s {
            "manual" => Source::Manual,
            "bank_statement" => Source::BankStatement,
            _ => Source::Receipt,
        }
    }
}

/// A single roasted expense. Rows are append-only; ingestion creates, the
/// user deletes, nothing updates in place.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    /// Integer minor units, always >= 1.
    pub amount_cents: i64,
    pub description: String,
    /// When the transaction occurred, not when it was uploaded.
    pub date: DateTime<Utc>,
    pub category: Category,
    /// Never empty; a fallback line substitutes when generation fails.
    pub roast: String,
    pub source: Source,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied to the store when creating a row.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_id: String,
    pub amount_cents: i64,
    pub description: String,
    pub date: DateTime<Utc>,
    pub category: Category,
    pub roast: String,
    pub source: Source,
}

impl NewExpense {
    /// Materialize the ephemeral (never-persisted) form of this expense for a
    /// free-tier response.
    pub fn into_ephemeral(self, now: DateTime<Utc>) -> Expense {
        Expense {
            id: EPHEMERAL_ID,
            user_id: self.user_id,
            amount_cents: self.amount_cents,
            description: self.description,
            date: self.date,
            category: self.category,
            roast: self.roast,
            source: self.source,
            created_at: now,
        }
    }
}
