use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::paymentmodel::{PaymentMethod, PaymentStatus};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "promotion_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

impl PromotionStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PromotionStatus::Pending => "pending",
            PromotionStatus::Active => "active",
            PromotionStatus::Cancelled => "cancelled",
            PromotionStatus::Expired => "expired",
        }
    }
}

/// Admin decision on a pending purchase (promotion or ad campaign).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromotionPackage {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub duration_days: i32,
    pub is_active: bool,
    pub grants_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl PromotionPackage {
    /// Window a promotion bought now would cover.
    pub fn window_from(&self, starts_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (starts_at, starts_at + Duration::days(self.duration_days as i64))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListingPromotion {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub package_id: Uuid,
    pub seller_id: Uuid,
    pub payment_transaction_id: Option<Uuid>,
    pub status: PromotionStatus,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending promotion joined with its listing, package and payment.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingPromotionRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub promotion: ListingPromotion,
    pub listing_title: String,
    pub listing_promoted: bool,
    pub listing_featured: bool,
    pub package_name: String,
    pub package_price: i64,
    pub package_duration_days: i32,
    pub payment_reference: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_amount: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_spans_duration_days() {
        let package = PromotionPackage {
            id: Uuid::new_v4(),
            name: "featured_placement".to_string(),
            description: String::new(),
            price: 15_000,
            currency: "XAF".to_string(),
            duration_days: 7,
            is_active: true,
            grants_featured: true,
            created_at: Utc::now(),
        };
        let start = Utc::now();
        let (starts_at, expires_at) = package.window_from(start);
        assert_eq!(starts_at, start);
        assert_eq!(expires_at - starts_at, Duration::days(7));
    }

    #[test]
    fn review_action_parses_lowercase() {
        let action: ReviewAction = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(action, ReviewAction::Approve);
        assert!(serde_json::from_str::<ReviewAction>("\"archive\"").is_err());
    }
}
