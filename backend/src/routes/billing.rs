use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::billing::{self, BillingError, Product};
use crate::error::{ApiError, Result};
use crate::routes::current_user;
use crate::AppState;

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::InvalidSignatureHeader
            | BillingError::SignatureMismatch
            | BillingError::StaleTimestamp => ApiError::validation("Invalid webhook signature"),
            BillingError::InvalidPayload(m) => ApiError::validation(m),
            BillingError::UnknownProduct(p) => {
                ApiError::validation_field(format!("unknown product '{p}'"), "product")
            }
            BillingError::CheckoutFailed(m) => ApiError::Upstream(m),
            BillingError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    product: String,
}

/// POST /api/billing/checkout - create a checkout session with the payment
/// collaborator and hand the session URL back opaquely.
async fn checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    let user = current_user(&state, &headers).await?;
    let product = Product::from_request(&request.product)?;

    let url = billing::create_checkout_session(&state.config.billing, &user, product).await?;
    Ok(Json(json!({ "url": url })))
}

/// POST /api/billing/webhook - collaborator event delivery.
///
/// The raw body bytes are read before any JSON parsing so the signature is
/// verified over exactly what was sent.
async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get("billing-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::validation("Missing Billing-Signature header"))?;

    billing::verify_signature(&state.config.billing.webhook_secret, signature, &body)?;

    let event = billing::BillingEvent::from_payload(&body)?;
    billing::reconcile(&state.store, &event)?;

    Ok(Json(json!({ "received": true })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/billing/checkout", post(checkout))
        .route("/api/billing/webhook", post(webhook))
        .with_state(state)
}
