use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::money::DEFAULT_VISIT_FEE;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "listing_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingCategory {
    House,
    Car,
    Land,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Sold,
    Rented,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,

    pub title: String,
    pub description: String,
    pub category: ListingCategory,

    pub price: i64,
    pub currency: String,
    pub location: String,
    pub status: ListingStatus,

    // Visit fee settings
    pub visit_fee_enabled: bool,
    pub visit_fee_amount: Option<i64>,

    // Visibility flags, driven by promotions
    pub promoted: bool,
    pub featured: bool,

    pub media_urls: JsonValue,
    pub views_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Fee a buyer pays to request a visit; `None` when visits are not paid.
    pub fn effective_visit_fee(&self) -> Option<i64> {
        if !self.visit_fee_enabled {
            return None;
        }
        Some(self.visit_fee_amount.unwrap_or(DEFAULT_VISIT_FEE))
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.seller_id == user_id
    }
}
