//! Payment collaborator boundary.
//!
//! Only two things live here: checkout-session creation and webhook
//! reconciliation into user entitlement fields. Subscription lifecycle is the
//! collaborator's business. The provider documents its API credential as
//! non-cacheable, so every outbound call reads the secret from config and
//! builds a fresh request; no client object holds it.

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::config::BillingConfig;
use crate::models::user::User;
use crate::store::{ExpenseStore, StoreError};

/// Tolerated clock skew on webhook timestamps, in seconds.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Invalid signature header")]
    InvalidSignatureHeader,
    #[error("Signature mismatch")]
    SignatureMismatch,
    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error("Unknown product: {0}")]
    UnknownProduct(String),
    #[error("Checkout request failed: {0}")]
    CheckoutFailed(String),
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

/// Purchasable products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Premium,
    AnnualReport,
}

impl Product {
    pub fn from_request(raw: &str) -> Result<Product, BillingError> {
        match raw {
            "premium" => Ok(Product::Premium),
            "annual_report" => Ok(Product::AnnualReport),
            other => Err(BillingError::UnknownProduct(other.to_string())),
        }
    }

    fn price_id<'a>(&self, config: &'a BillingConfig) -> &'a str {
        match self {
            Product::Premium => &config.premium_price_id,
            Product::AnnualReport => &config.report_price_id,
        }
    }
}

// HMAC-SHA256 (RFC 2104) over sha2. Secrets longer than the 64-byte block
// are hashed down first.
fn hmac_sha256(secret: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK: usize = 64;
    let mut key = [0u8; BLOCK];
    if secret.len() > BLOCK {
        key[..32].copy_from_slice(&Sha256::digest(secret));
    } else {
        key[..secret.len()].copy_from_slice(secret);
    }

    let mut inner = Sha256::new();
    inner.update(key.map(|b| b ^ 0x36));
    inner.update(message);
    let inner = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(key.map(|b| b ^ 0x5c));
    outer.update(inner);
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Build a `Billing-Signature` header value over a payload: the scheme the
/// provider signs with, exposed for tests and local replay tooling.
pub fn signature_header(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut message = timestamp.to_string().into_bytes();
    message.push(b'.');
    message.extend_from_slice(body);
    let mac = hmac_sha256(secret.as_bytes(), &message);
    format!("t={},v1={}", timestamp, hex::encode(mac))
}

/// Verify a `Billing-Signature` header (`t=<unix>,v1=<hex>`) against the raw
/// body bytes. The payload must not be parsed before this succeeds.
pub fn verify_signature(secret: &str, header: &str, body: &[u8]) -> Result<(), BillingError> {
    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signature = Some(v),
            _ => {}
        }
    }
    let (timestamp, signature) = timestamp
        .zip(signature)
        .ok_or(BillingError::InvalidSignatureHeader)?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| BillingError::InvalidSignatureHeader)?;
    if (Utc::now().timestamp() - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(BillingError::StaleTimestamp);
    }

    let provided = hex::decode(signature).map_err(|_| BillingError::InvalidSignatureHeader)?;

    let mut message = Vec::with_capacity(timestamp.len() + 1 + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'.');
    message.extend_from_slice(body);
    let expected = hmac_sha256(secret.as_bytes(), &message);

    if constant_time_eq(&expected, &provided) {
        Ok(())
    } else {
        Err(BillingError::SignatureMismatch)
    }
}

/// A verified webhook event, reduced to the fields this system reconciles.
#[derive(Debug, Clone)]
pub struct BillingEvent {
    pub event_type: String,
    pub user_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

impl BillingEvent {
    pub fn from_payload(body: &[u8]) -> Result<BillingEvent, BillingError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;
        let event_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BillingError::InvalidPayload("missing type".to_string()))?
            .to_string();
        let data = value.get("data").cloned().unwrap_or_default();
        let user_id = data
            .get("userId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BillingError::InvalidPayload("missing data.userId".to_string()))?
            .to_string();

        let opt = |key: &str| {
            data.get(key)
                .and_then(|v| v.as_str())
                .map(String::from)
        };
        Ok(BillingEvent {
            event_type,
            user_id,
            customer_id: opt("customerId"),
            subscription_id: opt("subscriptionId"),
        })
    }
}

/// Apply a verified event to user entitlement fields. Unknown event types are
/// acknowledged and ignored.
pub fn reconcile(store: &ExpenseStore, event: &BillingEvent) -> Result<(), BillingError> {
    match event.event_type.as_str() {
        "subscription.activated" => {
            tracing::info!(user_id = %event.user_id, "billing: subscription activated");
            store.activate_subscription(
                &event.user_id,
                event.customer_id.as_deref(),
                event.subscription_id.as_deref(),
            )?;
        }
        "subscription.canceled" => {
            tracing::info!(user_id = %event.user_id, "billing: subscription canceled");
            store.cancel_subscription(&event.user_id)?;
        }
        "report.purchased" => {
            tracing::info!(user_id = %event.user_id, "billing: annual report purchased");
            store.grant_annual_report(&event.user_id)?;
        }
        other => {
            tracing::debug!(event_type = %other, "billing: ignoring event");
        }
    }
    Ok(())
}

/// Create a checkout session for a product. The secret key is read from the
/// passed config on every call and never stored.
pub async fn create_checkout_session(
    config: &BillingConfig,
    user: &User,
    product: Product,
) -> Result<String, BillingError> {
    let url = format!(
        "{}/v1/checkout/sessions",
        config.base_url.trim_end_matches('/')
    );

    let mut form = vec![
        ("price_id", product.price_id(config).to_string()),
        ("client_reference_id", user.id.clone()),
    ];
    if let Some(customer) = &user.billing_customer_id {
        form.push(("customer_id", customer.clone()));
    }

    let response = reqwest::Client::new()
        .post(&url)
        .bearer_auth(&config.secret_key)
        .form(&form)
        .send()
        .await
        .map_err(|e| BillingError::CheckoutFailed(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(BillingError::CheckoutFailed(format!("{}: {}", status, body)));
    }

    let value: serde_json::Value = response
        .json()
        .await
        .map_err(|e| BillingError::CheckoutFailed(e.to_string()))?;
    value
        .get("url")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| BillingError::CheckoutFailed("response has no session url".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
        signature_header(secret, timestamp, body)
    }

    #[test]
    fn test_hmac_sha256_matches_rfc4231_vector() {
        // RFC 4231 test case 2.
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_valid_signature_verifies() {
        let body = br#"{"type":"report.purchased","data":{"userId":"u1"}}"#;
        let header = sign("whsec_test", Utc::now().timestamp(), body);
        assert!(verify_signature("whsec_test", &header, body).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let body = br#"{"type":"report.purchased","data":{"userId":"u1"}}"#;
        let header = sign("whsec_test", Utc::now().timestamp(), body);
        let tampered = br#"{"type":"report.purchased","data":{"userId":"u2"}}"#;
        assert!(matches!(
            verify_signature("whsec_test", &header, tampered),
            Err(BillingError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let body = b"{}";
        let header = sign("whsec_a", Utc::now().timestamp(), body);
        assert!(verify_signature("whsec_b", &header, body).is_err());
    }

    #[test]
    fn test_old_timestamp_is_rejected() {
        let body = b"{}";
        let header = sign("whsec_test", Utc::now().timestamp() - 3600, body);
        assert!(matches!(
            verify_signature("whsec_test", &header, body),
            Err(BillingError::StaleTimestamp)
        ));
    }

    #[test]
    fn test_garbage_header_is_rejected() {
        assert!(matches!(
            verify_signature("s", "not-a-signature", b"{}"),
            Err(BillingError::InvalidSignatureHeader)
        ));
        assert!(matches!(
            verify_signature("s", "t=abc,v1=00", b"{}"),
            Err(BillingError::InvalidSignatureHeader)
        ));
    }

    #[test]
    fn test_event_parses_reconcile_fields() {
        let body = serde_json::to_vec(&json!({
            "type": "subscription.activated",
            "data": {"userId": "u1", "customerId": "cus_1", "subscriptionId": "sub_1"}
        }))
        .unwrap();

        let event = BillingEvent::from_payload(&body).unwrap();
        assert_eq!(event.event_type, "subscription.activated");
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn test_event_without_user_is_invalid() {
        let body = br#"{"type": "subscription.activated", "data": {}}"#;
        assert!(matches!(
            BillingEvent::from_payload(body),
            Err(BillingError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_unknown_event_type_is_acknowledged() {
        let store = ExpenseStore::new(":memory:").unwrap();
        store.find_or_create_user("u1", None).unwrap();
        let event = BillingEvent {
            event_type: "invoice.finalized".to_string(),
            user_id: "u1".to_string(),
            customer_id: None,
            subscription_id: None,
        };
        assert!(reconcile(&store, &event).is_ok());
        assert_eq!(
            store.get_user("u1").unwrap().tier,
            crate::models::user::Tier::Free
        );
    }

    #[test]
    fn test_product_parsing() {
        assert_eq!(Product::from_request("premium").unwrap(), Product::Premium);
        assert_eq!(
            Product::from_request("annual_report").unwrap(),
            Product::AnnualReport
        );
        assert!(Product::from_request("gold").is_err());
    }
}
