use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::paymentdtos::PaymentDetailsDto;
use crate::models::admodel::{AdCampaign, AdPlacement};
use crate::models::paymentmodel::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAdCampaignDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(url(message = "target_url must be a valid URL"))]
    pub target_url: Option<String>,

    pub listing_id: Option<Uuid>,

    pub placement: AdPlacement,

    #[validate(range(min = 1000, message = "Budget must be at least 1,000"))]
    pub budget: i64,

    pub starts_at: Option<DateTime<Utc>>,

    #[validate(range(min = 1, max = 90, message = "Campaigns run between 1 and 90 days"))]
    pub duration_days: i64,

    pub payment_method: PaymentMethod,

    #[serde(flatten)]
    #[validate]
    pub payment_details: PaymentDetailsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewCampaignDto {
    #[validate(required(message = "campaign_id is required"))]
    pub campaign_id: Option<Uuid>,

    #[validate(required(message = "action is required"))]
    pub action: Option<String>,

    #[validate(length(max = 1000, message = "Admin notes are too long"))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ActiveAdsQueryDto {
    pub placement: Option<AdPlacement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdCampaignDto {
    #[serde(flatten)]
    pub campaign: AdCampaign,
    pub click_through_rate: f64,
}

impl From<AdCampaign> for AdCampaignDto {
    fn from(campaign: AdCampaign) -> Self {
        let click_through_rate = campaign.click_through_rate();
        AdCampaignDto {
            campaign,
            click_through_rate,
        }
    }
}

