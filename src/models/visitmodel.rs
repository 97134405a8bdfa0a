use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::paymentmodel::PaymentMethod;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "visit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    PendingPayment,
    Paid,
    Released,
    Cancelled,
}

impl VisitStatus {
    pub fn to_str(&self) -> &str {
        match self {
            VisitStatus::PendingPayment => "pending_payment",
            VisitStatus::Paid => "paid",
            VisitStatus::Released => "released",
            VisitStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitStatus::Released | VisitStatus::Cancelled)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payout_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Released,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VisitRequest {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,

    // Escrowed amounts
    pub visit_fee_amount: i64,
    pub platform_fee: i64,
    pub seller_payout: i64,
    pub currency: String,

    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub payment_transaction_id: Option<Uuid>,
    pub payment_details: Option<JsonValue>,

    pub preferred_date: Option<DateTime<Utc>>,
    pub message: Option<String>,

    pub status: VisitStatus,
    pub payout_status: PayoutStatus,

    pub paid_at: Option<DateTime<Utc>>,
    pub paid_verified_by: Option<Uuid>,
    pub released_at: Option<DateTime<Utc>>,
    pub released_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin view row: a visit request plus the listing title.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VisitRequestWithListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub visit: VisitRequest,
    pub listing_title: String,
}
