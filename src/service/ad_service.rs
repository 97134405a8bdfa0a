// service/ad_service.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{
        addb::{AdExt, NewAdCampaign},
        db::DBClient,
        listingdb::ListingExt,
        paymentdb::{NewPaymentTransaction, PaymentExt},
    },
    dtos::{addtos::CreateAdCampaignDto, paymentdtos::PaymentSummaryDto},
    models::{
        admodel::{AdCampaign, AdPlacement, CampaignStatus},
        paymentmodel::{generate_payment_reference, PaymentPurpose},
        promotionmodel::ReviewAction,
        usermodel::User,
    },
    service::{
        error::ServiceError,
        payment_provider::{PaymentGateway, PaymentRequest},
        side_effects::{SideEffect, SideEffectQueue},
    },
};

/// Ads served per placement request.
pub const ADS_PER_SLOT: i64 = 3;

#[derive(Clone)]
pub struct AdService {
    db_client: Arc<DBClient>,
    gateway: Arc<dyn PaymentGateway>,
    side_effects: SideEffectQueue,
    currency: String,
}

impl AdService {
    pub fn new(
        db_client: Arc<DBClient>,
        gateway: Arc<dyn PaymentGateway>,
        side_effects: SideEffectQueue,
        currency: String,
    ) -> Self {
        Self {
            db_client,
            gateway,
            side_effects,
            currency,
        }
    }

    pub async fn create_campaign(
        &self,
        advertiser: &User,
        body: CreateAdCampaignDto,
    ) -> Result<(PaymentSummaryDto, AdCampaign), ServiceError> {
        if let Some(listing_id) = body.listing_id {
            let listing = self
                .db_client
                .get_listing(listing_id)
                .await?
                .ok_or(ServiceError::ListingNotFound(listing_id))?;
            if !listing.is_owned_by(advertiser.id) {
                return Err(ServiceError::NotListingOwner(listing_id));
            }
        }
        if body.listing_id.is_none() && body.target_url.is_none() {
            return Err(ServiceError::Validation(
                "Either listing_id or target_url is required".to_string(),
            ));
        }
        if !self.gateway.supports(body.payment_method) {
            return Err(ServiceError::Validation(format!(
                "Payment method {} is not supported",
                body.payment_method.to_str()
            )));
        }
        body.payment_details
            .check_for(body.payment_method)
            .map_err(ServiceError::Validation)?;

        let now = Utc::now();
        let starts_at = body.starts_at.filter(|start| *start > now).unwrap_or(now);
        let ends_at = starts_at + Duration::days(body.duration_days);

        let reference = generate_payment_reference(PaymentPurpose::AdCampaign);
        let initiation = self
            .gateway
            .initiate_payment(PaymentRequest {
                reference: reference.clone(),
                amount: body.budget,
                currency: self.currency.clone(),
                payment_method: body.payment_method,
                customer_email: advertiser.email.clone(),
                customer_phone: body.payment_details.phone_number.clone(),
                description: format!("Ad campaign: {}", body.title),
                metadata: Some(serde_json::json!({ "purpose": "ad_campaign" })),
            })
            .await;

        if !initiation.success {
            return Err(ServiceError::Payment(
                initiation
                    .error
                    .unwrap_or_else(|| "Payment initiation failed".to_string()),
            ));
        }

        let transaction = match self
            .db_client
            .create_payment_transaction(NewPaymentTransaction {
                user_id: advertiser.id,
                amount: body.budget,
                currency: self.currency.clone(),
                payment_method: body.payment_method,
                purpose: PaymentPurpose::AdCampaign,
                our_reference: reference.clone(),
                gateway_reference: initiation.gateway_reference.clone(),
                metadata: Some(body.payment_details.to_json()),
            })
            .await
        {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                tracing::error!("Failed to record payment transaction {}: {}", reference, e);
                None
            }
        };

        let campaign = self
            .db_client
            .create_campaign(NewAdCampaign {
                advertiser_id: advertiser.id,
                listing_id: body.listing_id,
                title: body.title,
                target_url: body.target_url,
                placement: body.placement,
                budget: body.budget,
                currency: self.currency.clone(),
                payment_transaction_id: transaction.as_ref().map(|t| t.id),
                starts_at,
                ends_at,
            })
            .await?;

        tracing::info!("Ad campaign {} created by {}", campaign.id, advertiser.id);

        let payment = PaymentSummaryDto::from_initiation(
            &initiation,
            transaction.as_ref(),
            campaign.budget,
            &campaign.currency,
            body.payment_method,
        );

        Ok((payment, campaign))
    }

    pub async fn advertiser_campaigns(&self, advertiser_id: Uuid) -> Result<Vec<AdCampaign>, ServiceError> {
        Ok(self.db_client.get_advertiser_campaigns(advertiser_id).await?)
    }

    /// Campaigns to render now; impressions are counted in the background.
    pub async fn serve(&self, placement: Option<AdPlacement>) -> Result<Vec<AdCampaign>, ServiceError> {
        let campaigns = self
            .db_client
            .get_live_campaigns(placement, ADS_PER_SLOT)
            .await?;

        if !campaigns.is_empty() {
            self.side_effects.enqueue(SideEffect::AdImpressions {
                campaign_ids: campaigns.iter().map(|c| c.id).collect(),
            });
        }
        Ok(campaigns)
    }

    pub async fn record_click(&self, campaign_id: Uuid) -> Result<(), ServiceError> {
        if self.db_client.record_click(campaign_id).await? {
            Ok(())
        } else {
            Err(ServiceError::CampaignNotFound(campaign_id))
        }
    }

    pub async fn pending(&self) -> Result<Vec<AdCampaign>, ServiceError> {
        Ok(self.db_client.get_pending_campaigns().await?)
    }

    pub async fn review(
        &self,
        admin_id: Uuid,
        campaign_id: Uuid,
        action: ReviewAction,
        admin_notes: Option<String>,
    ) -> Result<AdCampaign, ServiceError> {
        let campaign = self
            .db_client
            .get_campaign(campaign_id)
            .await?
            .ok_or(ServiceError::CampaignNotFound(campaign_id))?;

        if campaign.status != CampaignStatus::Pending {
            return Err(ServiceError::InvalidCampaignStatus(campaign.id, campaign.status));
        }

        let reviewed = match action {
            ReviewAction::Approve => {
                self.db_client
                    .approve_campaign(campaign.id, admin_id, admin_notes)
                    .await?
            }
            ReviewAction::Reject => {
                self.db_client
                    .reject_campaign(campaign.id, admin_id, admin_notes)
                    .await?
            }
        };

        let Some(reviewed) = reviewed else {
            let current = self
                .db_client
                .get_campaign(campaign_id)
                .await?
                .ok_or(ServiceError::CampaignNotFound(campaign_id))?;
            return Err(ServiceError::InvalidCampaignStatus(current.id, current.status));
        };

        tracing::info!(
            "Ad campaign {} {} by admin {}",
            reviewed.id,
            reviewed.status.to_str(),
            admin_id
        );

        self.side_effects.enqueue(SideEffect::notify(
            reviewed.advertiser_id,
            "campaign_reviewed",
            format!("Your ad campaign \"{}\" is {}", reviewed.title, reviewed.status.to_str()),
            serde_json::json!({ "campaign_id": reviewed.id }),
        ));

        Ok(reviewed)
    }

    pub async fn complete_ended(&self) -> Result<u64, ServiceError> {
        Ok(self.db_client.complete_ended_campaigns().await?)
    }
}
