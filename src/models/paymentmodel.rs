// models/paymentmodel.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    BankTransfer,
    Card,
    Crypto,
}

impl PaymentMethod {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Crypto => "crypto",
        }
    }

    /// Methods settled outside any gateway; an admin records the proof.
    pub fn is_out_of_band(&self) -> bool {
        matches!(self, PaymentMethod::Crypto)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "payment_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    VisitFee,
    Promotion,
    AdCampaign,
}

impl PaymentPurpose {
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            PaymentPurpose::VisitFee => "VISIT",
            PaymentPurpose::Promotion => "PROMO",
            PaymentPurpose::AdCampaign => "ADS",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Expired,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub transaction_type: PaymentPurpose,
    pub status: PaymentStatus,
    pub our_reference: String,
    pub gateway_reference: Option<String>,
    pub metadata: Option<JsonValue>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Hours an unpaid payment stays open before the expiry job closes it.
pub const PAYMENT_WINDOW_HOURS: i64 = 24;

/// Correlation id shared with the gateway, e.g. `VISIT-3F2A...`.
pub fn generate_payment_reference(purpose: PaymentPurpose) -> String {
    format!(
        "{}-{}",
        purpose.reference_prefix(),
        Uuid::new_v4().simple().to_string().to_uppercase()
    )
}
