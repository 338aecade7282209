//! Error types for the API.
//!
//! Everything recoverable funnels into [`ApiError`] at the request boundary
//! and leaves the process as a structured JSON body. Entitlement failures get
//! machine-readable types distinct from validation so the client can route to
//! an upgrade prompt instead of a generic error banner.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Monthly upload limit reached ({used} of {limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    #[error("{0} requires a premium subscription")]
    PremiumRequired(&'static str),

    #[error("The annual report has not been purchased")]
    ReportNotPurchased,

    #[error("At least {required} expenses are required")]
    InsufficientData { required: usize },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Could not parse statement: {0}")]
    ParseFailure(String),

    #[error("Receipt processing failed: {0}")]
    Extraction(String),

    #[error("Payment provider request failed: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(e: crate::auth::AuthError) -> Self {
        ApiError::Unauthorized(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::QuotaExceeded { .. } => (StatusCode::FORBIDDEN, "quota_exceeded"),
            ApiError::PremiumRequired(_) => (StatusCode::FORBIDDEN, "premium_required"),
            ApiError::ReportNotPurchased => (StatusCode::FORBIDDEN, "report_not_purchased"),
            ApiError::InsufficientData { .. } => (StatusCode::BAD_REQUEST, "insufficient_data"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::ParseFailure(_) => (StatusCode::BAD_REQUEST, "parse_error"),
            ApiError::Extraction(_) => (StatusCode::BAD_GATEWAY, "extraction_failed"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = match &self {
            // Internals stay in the log, not the response body.
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut error = json!({
            "type": error_type,
            "message": message,
        });
        match &self {
            ApiError::Validation {
                field: Some(field), ..
            } => {
                error["field"] = json!(field);
            }
            ApiError::QuotaExceeded { used, limit } => {
                error["uploadsUsed"] = json!(used);
                error["uploadsLimit"] = json!(limit);
            }
            _ => {}
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(status_of(ApiError::validation("bad")), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_entitlement_errors_map_to_403() {
        assert_eq!(
            status_of(ApiError::QuotaExceeded { used: 2, limit: 2 }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::PremiumRequired("Manual entry")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(ApiError::ReportNotPurchased), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_upstream_failures_map_to_502() {
        assert_eq!(
            status_of(ApiError::Extraction("no amount".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::Upstream("timeout".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        assert_eq!(
            status_of(ApiError::Unauthorized("missing header".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_insufficient_data_message_names_the_minimum() {
        let err = ApiError::InsufficientData { required: 3 };
        assert!(err.to_string().contains('3'));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}
