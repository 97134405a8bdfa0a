use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ad_placement", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdPlacement {
    HomeBanner,
    SearchSidebar,
    ListingDetail,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "campaign_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Active,
    Rejected,
    Completed,
}

impl CampaignStatus {
    pub fn to_str(&self) -> &str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Active => "active",
            CampaignStatus::Rejected => "rejected",
            CampaignStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdCampaign {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub listing_id: Option<Uuid>,
    pub title: String,
    pub target_url: Option<String>,
    pub placement: AdPlacement,
    pub budget: i64,
    pub currency: String,
    pub payment_transaction_id: Option<Uuid>,
    pub status: CampaignStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub impressions: i64,
    pub clicks: i64,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdCampaign {
    pub fn click_through_rate(&self) -> f64 {
        if self.impressions == 0 {
            return 0.0;
        }
        self.clicks as f64 / self.impressions as f64
    }
}
