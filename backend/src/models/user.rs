use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier. Gates features and the monthly upload quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }

    /// Stored as TEXT; anything unexpected in the column reads as free.
    pub fn from_str_lossy(s: &str) -> Tier {
        match s {
            "premium" => Tier::Premium,
            _ => Tier::Free,
        }
    }
}

/// User record created on first authentication.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID from OIDC (sub claim)
    pub id: String,
    /// Email from OIDC token
    pub email: Option<String>,
    pub tier: Tier,
    /// Uploads since the last calendar-month reset. Increments for every
    /// admitted upload, premium included.
    pub monthly_upload_count: i64,
    /// When the counter was last zeroed. None until the first reset.
    pub monthly_upload_reset_date: Option<DateTime<Utc>>,
    /// One-time annual-report entitlement, independent of tier.
    pub has_annual_report: bool,
    /// Opaque ids owned by the payment collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_premium(&self) -> bool {
        self.tier == Tier::Premium
    }

    pub fn can_generate_annual_report(&self) -> bool {
        self.is_premium() || self.has_annual_report
    }
}
