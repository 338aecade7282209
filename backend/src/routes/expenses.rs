use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use base64::Engine;
use chrono::Utc;
use roastmywallet_ingest::Statement;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, Result};
use crate::models::expense::{Expense, NewExpense, Source};
use crate::models::user::User;
use crate::pipeline;
use crate::report::{self, MIN_REPORT_EXPENSES};
use crate::roast::{self, Tone};
use crate::routes::current_user;
use crate::{aggregate, AppState};

fn require_premium(user: &User, feature: &'static str) -> Result<()> {
    if user.is_premium() {
        Ok(())
    } else {
        Err(ApiError::PremiumRequired(feature))
    }
}

/// Tone selection is a premium feature; free-tier requests are forced to the
/// default before the roast generator ever sees them.
fn effective_tone(user: &User, requested: Option<&str>) -> Tone {
    if user.is_premium() {
        Tone::from_request(requested)
    } else {
        Tone::Savage
    }
}

/// Accept a data URL as-is, or wrap raw base64 into one.
fn to_data_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::validation_field("image is required", "image"));
    }
    if raw.starts_with("data:") {
        return Ok(raw.to_string());
    }
    base64::engine::general_purpose::STANDARD
        .decode(raw)
        .map_err(|_| ApiError::validation_field("image is not valid base64", "image"))?;
    Ok(format!("data:image/jpeg;base64,{raw}"))
}

/// GET /api/expenses - persisted expenses, newest first. Free-tier uploads
/// are never persisted, so free users see an empty list.
async fn list_expenses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Expense>>> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(state.store.list_expenses(&user.id)?))
}

/// GET /api/expenses/summary - current-month total and recent roasts.
async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<aggregate::MonthlySummary>> {
    let user = current_user(&state, &headers).await?;
    let expenses = state.store.list_expenses(&user.id)?;
    Ok(Json(aggregate::monthly_summary(&expenses, Utc::now())))
}

/// GET /api/expenses/monthly-series - trailing 12 months, gaps kept.
async fn monthly_series(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<aggregate::MonthRow>>> {
    let user = current_user(&state, &headers).await?;
    let expenses = state.store.list_expenses(&user.id)?;
    Ok(Json(aggregate::monthly_series(&expenses, Utc::now())))
}

/// GET /api/expenses/monthly-roast - one roast over the whole current month.
async fn monthly_roast(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user = current_user(&state, &headers).await?;
    require_premium(&user, "Monthly roast")?;

    let expenses = state.store.list_expenses(&user.id)?;
    let start = aggregate::start_of_month(Utc::now());
    let this_month: Vec<String> = expenses
        .iter()
        .filter(|e| e.date >= start)
        .map(|e| format!("{} (${}.{:02})", e.description, e.amount_cents / 100, e.amount_cents % 100))
        .collect();

    if this_month.is_empty() {
        return Ok(Json(json!({
            "roast": "Nothing to roast this month. Suspiciously responsible of you."
        })));
    }

    let system = "You are a savage financial assistant. Given a month of purchases, \
         write one short roast of the month as a whole. No preamble.";
    let roast = match state.llm.complete_text(system, &this_month.join("\n")).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) | Err(_) => roast::FALLBACK_ROAST.to_string(),
    };

    Ok(Json(json!({ "roast": roast })))
}

/// GET /api/expenses/financial-advice - premium-gated advice over history.
async fn financial_advice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<report::FinancialAdvice>> {
    let user = current_user(&state, &headers).await?;
    require_premium(&user, "Financial advice")?;

    let expenses = state.store.list_expenses(&user.id)?;
    Ok(Json(report::financial_advice(&state.llm, &expenses).await))
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    image: String,
    tone: Option<String>,
}

/// POST /api/expenses/upload - receipt upload, quota-gated.
///
/// Free-tier results are returned ephemerally (sentinel id, nothing
/// persisted); premium results are stored.
async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = current_user(&state, &headers).await?;
    let tone = effective_tone(&user, request.tone.as_deref());
    let image_url = to_data_url(&request.image)?;

    let now = Utc::now();
    let free_limit = state.config.quota.free_monthly_uploads;
    let decision = state.store.admit_upload(&user.id, now, free_limit)?;
    if !decision.admitted {
        return Err(ApiError::QuotaExceeded {
            used: decision.uploads_used,
            limit: decision.uploads_limit.unwrap_or(free_limit),
        });
    }

    let extracted = pipeline::extract_receipt(&state.llm, &image_url, tone, now).await?;
    let new = NewExpense {
        user_id: user.id.clone(),
        amount_cents: extracted.amount_cents,
        description: extracted.description,
        date: extracted.date,
        category: extracted.category,
        roast: extracted.roast,
        source: Source::Receipt,
    };

    let body = if user.is_premium() {
        let expense = state.store.create_expense(&new)?;
        serde_json::to_value(expense).map_err(|e| ApiError::Internal(e.to_string()))?
    } else {
        let mut value = serde_json::to_value(new.into_ephemeral(now))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        value["ephemeral"] = json!(true);
        value["uploadsUsed"] = json!(decision.uploads_used);
        value["uploadsLimit"] = json!(decision.uploads_limit);
        value
    };

    Ok((StatusCode::CREATED, Json(body)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManualRequest {
    amount_cents: i64,
    description: String,
    category: Option<String>,
    date: String,
    source: Option<String>,
    tone: Option<String>,
}

/// POST /api/expenses/manual - manual entry, premium-only.
async fn manual(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ManualRequest>,
) -> Result<(StatusCode, Json<Expense>)> {
    let user = current_user(&state, &headers).await?;
    require_premium(&user, "Manual entry")?;

    if request.amount_cents < 1 {
        return Err(ApiError::validation_field(
            "amountCents must be a positive integer",
            "amountCents",
        ));
    }
    let description = request.description.trim();
    if description.is_empty() {
        return Err(ApiError::validation_field(
            "description is required",
            "description",
        ));
    }
    let date = roastmywallet_ingest::date::parse_flexible(&request.date)
        .ok_or_else(|| ApiError::validation_field("date is not a recognized date", "date"))?;

    let category = match &request.category {
        Some(label) => crate::models::category::Category::from_label(label),
        None => pipeline::classify_category(&state.llm, description).await,
    };
    let tone = Tone::from_request(request.tone.as_deref());
    let roast_text =
        roast::generate(&state.llm, description, request.amount_cents, category, tone).await;

    let expense = state.store.create_expense(&NewExpense {
        user_id: user.id.clone(),
        amount_cents: request.amount_cents,
        description: description.to_string(),
        date,
        category,
        roast: roast_text,
        source: request
            .source
            .as_deref()
            .map(Source::from_str_lossy)
            .unwrap_or(Source::Manual),
    })?;

    Ok((StatusCode::CREATED, Json(expense)))
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    format: String,
    data: String,
    tone: Option<String>,
}

/// POST /api/expenses/import-csv - statement import (csv, pdf or image),
/// premium-only. Best-effort: reports the count of rows that made it.
async fn import_statement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ImportRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = current_user(&state, &headers).await?;
    require_premium(&user, "Statement import")?;
    let tone = Tone::from_request(request.tone.as_deref());

    let statement = match request.format.as_str() {
        "csv" => Statement::Csv {
            text: request.data.clone(),
        },
        "pdf" => Statement::Pdf {
            bytes: base64::engine::general_purpose::STANDARD
                .decode(request.data.trim())
                .map_err(|_| {
                    ApiError::validation_field("data is not valid base64", "data")
                })?,
        },
        "image" => Statement::Image {
            data_url: to_data_url(&request.data)?,
        },
        other => {
            return Err(ApiError::validation_field(
                format!("unknown format '{other}' (expected csv, pdf or image)"),
                "format",
            ))
        }
    };

    let created =
        pipeline::import_statement(&state.llm, &state.store, &user.id, &statement, tone, Utc::now())
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "imported": created.len(),
            "expenses": created,
        })),
    ))
}

/// POST /api/expenses/annual-report - premium or one-time purchase.
async fn annual_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<report::AnnualReport>> {
    let user = current_user(&state, &headers).await?;
    if !user.can_generate_annual_report() {
        return Err(ApiError::ReportNotPurchased);
    }

    let expenses = state.store.list_expenses(&user.id)?;
    if expenses.len() < MIN_REPORT_EXPENSES {
        return Err(ApiError::InsufficientData {
            required: MIN_REPORT_EXPENSES,
        });
    }

    Ok(Json(report::annual_report(&state.llm, &expenses).await))
}

/// DELETE /api/expenses/:id - scoped to the owner; someone else's id is a
/// silent no-op so record existence never leaks.
async fn delete_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let user = current_user(&state, &headers).await?;
    state.store.delete_expense(id, &user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/expenses", get(list_expenses))
        .route("/api/expenses/summary", get(summary))
        .route("/api/expenses/monthly-series", get(monthly_series))
        .route("/api/expenses/monthly-roast", get(monthly_roast))
        .route("/api/expenses/financial-advice", get(financial_advice))
        .route("/api/expenses/upload", post(upload))
        .route("/api/expenses/manual", post(manual))
        .route("/api/expenses/import-csv", post(import_statement))
        .route("/api/expenses/annual-report", post(annual_report))
        .route("/api/expenses/:id", delete(delete_expense))
        .with_state(state)
}
