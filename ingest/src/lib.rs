//! roastmywallet-ingest: statement normalization for the RoastMyWallet backend.
//!
//! Every supported import format (CSV text, PDF bytes, image bytes) reduces to
//! the same [`NormalizedTransaction`] shape so the downstream
//! categorize/roast/persist pipeline is written once. This crate holds the
//! pure parsing half of that work; the model calls needed for PDF and image
//! statements live in the backend, which feeds the raw model output back into
//! [`model_output`].

pub mod amount;
pub mod csv_parser;
pub mod date;
pub mod model_output;
pub mod pdf_text;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use amount::parse_amount_to_cents;
pub use csv_parser::parse_statement_csv;
pub use model_output::{parse_transaction_array, strip_code_fences};
pub use pdf_text::extract_statement_text;

/// Uniform output of every statement format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub description: String,
    /// Minor units. Always positive for a spend record.
    pub amount_cents: i64,
    /// When the transaction occurred, not when it was imported.
    pub date: DateTime<Utc>,
}

/// A statement import payload, keyed off the client's `format` field.
///
/// Closed set: adding a format means adding a variant here and a normalize arm
/// in the backend pipeline, nothing else.
#[derive(Debug, Clone)]
pub enum Statement {
    Csv { text: String },
    Pdf { bytes: Vec<u8> },
    /// Image statements go to the model as-is; the data URL is passed through
    /// opaquely.
    Image { data_url: String },
}

impl Statement {
    pub fn label(&self) -> &'static str {
        match self {
            Statement::Csv { .. } => "csv",
            Statement::Pdf { .. } => "pdf",
            Statement::Image { .. } => "image",
        }
    }
}
