//! Upload quota decision type.
//!
//! The evaluation itself runs inside the store as one locked
//! reset-then-increment sequence (see `ExpenseStore::admit_upload`), so two
//! concurrent uploads can never both read the same stale counter. This module
//! only carries the outcome back to the handlers.

use serde::Serialize;

/// Outcome of one upload admission attempt.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDecision {
    /// Whether the upload may proceed. The counter was already incremented
    /// when this is true.
    pub admitted: bool,
    /// Uploads consumed this calendar month, this attempt included when
    /// admitted.
    pub uploads_used: i64,
    /// Free-tier allowance; `None` for premium (unlimited, still counted).
    pub uploads_limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_for_upgrade_prompts() {
        let decision = QuotaDecision {
            admitted: false,
            uploads_used: 2,
            uploads_limit: Some(2),
        };
        let json = serde_json::to_value(decision).unwrap();
        assert_eq!(json["uploadsUsed"], 2);
        assert_eq!(json["uploadsLimit"], 2);
    }
}
