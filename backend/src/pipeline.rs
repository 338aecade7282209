//! Document ingestion pipeline.
//!
//! The receipt path extracts one expense from one image. The statement path
//! normalizes CSV/PDF/image input into transaction rows, then runs every row
//! through the same categorize, roast, persist fan-out. Categorization and
//! roasting stay separate model calls so each prompt is short and the
//! category output machine-parseable.

use chrono::{DateTime, Utc};
use roastmywallet_ingest::{
    extract_statement_text, parse_statement_csv, parse_transaction_array, NormalizedTransaction,
    Statement,
};

use crate::error::{ApiError, Result};
use crate::llm::parse::{i64_field, str_field};
use crate::llm::{LlmClient, ModelJson};
use crate::models::category::Category;
use crate::models::expense::{Expense, NewExpense, Source};
use crate::roast::{self, Tone, FALLBACK_ROAST};
use crate::store::ExpenseStore;

/// Everything the receipt model call must produce for one expense.
#[derive(Debug, Clone)]
pub struct ReceiptExtraction {
    pub amount_cents: i64,
    pub description: String,
    pub date: DateTime<Utc>,
    pub category: Category,
    pub roast: String,
}

/// Extract one expense from a receipt image with a single JSON-mode call.
///
/// A missing or non-numeric amount is a hard failure; everything else has a
/// per-field fallback so a messy receipt still uploads.
pub async fn extract_receipt(
    llm: &LlmClient,
    image_url: &str,
    tone: Tone,
    now: DateTime<Utc>,
) -> Result<ReceiptExtraction> {
    let system = format!(
        "You are a {} financial assistant. You analyze receipts and extract the total \
         amount (in cents), a short description, the date of purchase (ISO string), and a \
         category from this list: {}. You must also generate a funny roast about the purchase.",
        tone.adjective(),
        Category::prompt_vocabulary(),
    );
    let instruction = "Extract the details of this expense and roast me for it. Respond with \
         JSON in this format: {\"amount\": 1250, \"description\": \"Starbucks Coffee\", \
         \"date\": \"2023-10-15T08:30:00Z\", \"category\": \"Food & Drink\", \
         \"roast\": \"Wow, $12.50 for bean water?\"}";

    let raw = llm
        .complete_with_image(&system, instruction, image_url, true)
        .await
        .map_err(|e| ApiError::Extraction(e.to_string()))?;

    let value = ModelJson::from_completion(&raw)
        .into_value()
        .ok_or_else(|| ApiError::Extraction("model returned unparseable output".to_string()))?;

    let amount_cents = i64_field(&value, "amount")
        .filter(|cents| *cents >= 1)
        .ok_or_else(|| ApiError::Extraction("no usable amount on the receipt".to_string()))?;

    let date = str_field(&value, "date")
        .and_then(|s| roastmywallet_ingest::date::parse_flexible(&s))
        .unwrap_or(now);

    Ok(ReceiptExtraction {
        amount_cents,
        description: str_field(&value, "description").unwrap_or_else(|| "Unknown".to_string()),
        date,
        category: str_field(&value, "category")
            .map(|label| Category::from_label(&label))
            .unwrap_or(Category::Other),
        roast: str_field(&value, "roast").unwrap_or_else(|| FALLBACK_ROAST.to_string()),
    })
}

/// Classify one transaction description into the category vocabulary.
/// Constrained call; any unexpected output coerces to Other.
pub async fn classify_category(llm: &LlmClient, description: &str) -> Category {
    let system = format!(
        "Classify the merchant into exactly one of these categories: {}. \
         Respond with the category name only, nothing else.",
        Category::prompt_vocabulary(),
    );

    match llm.complete_text(&system, description).await {
        Ok(label) => Category::from_label(&label),
        Err(e) => {
            tracing::warn!(error = %e, "category classification failed, defaulting to Other");
            Category::Other
        }
    }
}

const STATEMENT_ARRAY_INSTRUCTION: &str =
    "Extract every spending transaction as a JSON array of objects shaped \
     {\"description\": string, \"amount\": positive dollars, \"date\": \"YYYY-MM-DD\"}. \
     Exclude refunds, deposits and incoming transfers. Respond with the JSON array only.";

/// Reduce a statement of any supported format to normalized transactions.
pub async fn normalize_statement(
    llm: &LlmClient,
    statement: &Statement,
    now: DateTime<Utc>,
) -> Result<Vec<NormalizedTransaction>> {
    match statement {
        Statement::Csv { text } => {
            parse_statement_csv(text, now).map_err(|e| ApiError::ParseFailure(e.to_string()))
        }
        Statement::Pdf { bytes } => {
            let text = extract_statement_text(bytes)
                .map_err(|e| ApiError::ParseFailure(e.to_string()))?;
            let raw = llm
                .complete_text(STATEMENT_ARRAY_INSTRUCTION, &text)
                .await
                .map_err(|e| ApiError::Extraction(e.to_string()))?;
            parse_transaction_array(&raw, now)
                .map_err(|_| ApiError::ParseFailure("could not parse statement".to_string()))
        }
        Statement::Image { data_url } => {
            let raw = llm
                .complete_with_image(
                    STATEMENT_ARRAY_INSTRUCTION,
                    "Here is the bank statement.",
                    data_url,
                    false,
                )
                .await
                .map_err(|e| ApiError::Extraction(e.to_string()))?;
            parse_transaction_array(&raw, now)
                .map_err(|_| ApiError::ParseFailure("could not parse statement".to_string()))
        }
    }
}

/// Import a statement end to end: normalize, then categorize, roast and
/// persist each row. A row that fails to persist is dropped and logged; the
/// result is whatever made it through.
pub async fn import_statement(
    llm: &LlmClient,
    store: &ExpenseStore,
    user_id: &str,
    statement: &Statement,
    tone: Tone,
    now: DateTime<Utc>,
) -> Result<Vec<Expense>> {
    let transactions = normalize_statement(llm, statement, now).await?;
    tracing::info!(
        format = statement.label(),
        count = transactions.len(),
        "normalized statement"
    );

    let mut created = Vec::with_capacity(transactions.len());
    for txn in transactions {
        let category = classify_category(llm, &txn.description).await;
        let roast_text =
            roast::generate(llm, &txn.description, txn.amount_cents, category, tone).await;

        let new = NewExpense {
            user_id: user_id.to_string(),
            amount_cents: txn.amount_cents,
            description: txn.description,
            date: txn.date,
            category,
            roast: roast_text,
            source: Source::BankStatement,
        };
        match store.create_expense(&new) {
            Ok(expense) => created.push(expense),
            Err(e) => {
                tracing::warn!(error = %e, "dropping statement row that failed to persist");
            }
        }
    }

    Ok(created)
}
