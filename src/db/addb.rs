// db/addb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::admodel::*;

#[derive(Debug, Clone)]
pub struct NewAdCampaign {
    pub advertiser_id: Uuid,
    pub listing_id: Option<Uuid>,
    pub title: String,
    pub target_url: Option<String>,
    pub placement: AdPlacement,
    pub budget: i64,
    pub currency: String,
    pub payment_transaction_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[async_trait]
pub trait AdExt {
    async fn create_campaign(&self, campaign: NewAdCampaign) -> Result<AdCampaign, Error>;

    async fn get_campaign(&self, campaign_id: Uuid) -> Result<Option<AdCampaign>, Error>;

    async fn get_advertiser_campaigns(&self, advertiser_id: Uuid) -> Result<Vec<AdCampaign>, Error>;

    async fn get_live_campaigns(
        &self,
        placement: Option<AdPlacement>,
        limit: i64,
    ) -> Result<Vec<AdCampaign>, Error>;

    async fn get_pending_campaigns(&self) -> Result<Vec<AdCampaign>, Error>;

    async fn approve_campaign(
        &self,
        campaign_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<AdCampaign>, Error>;

    async fn reject_campaign(
        &self,
        campaign_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<AdCampaign>, Error>;

    async fn record_impressions(&self, campaign_ids: &[Uuid]) -> Result<u64, Error>;

    /// `false` when the campaign is unknown or not running.
    async fn record_click(&self, campaign_id: Uuid) -> Result<bool, Error>;

    async fn complete_ended_campaigns(&self) -> Result<u64, Error>;
}

#[async_trait]
impl AdExt for DBClient {
    async fn create_campaign(&self, campaign: NewAdCampaign) -> Result<AdCampaign, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            INSERT INTO ad_campaigns
            (advertiser_id, listing_id, title, target_url, placement, budget, currency,
             payment_transaction_id, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(campaign.advertiser_id)
        .bind(campaign.listing_id)
        .bind(campaign.title)
        .bind(campaign.target_url)
        .bind(campaign.placement)
        .bind(campaign.budget)
        .bind(campaign.currency)
        .bind(campaign.payment_transaction_id)
        .bind(campaign.starts_at)
        .bind(campaign.ends_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_campaign(&self, campaign_id: Uuid) -> Result<Option<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>("SELECT * FROM ad_campaigns WHERE id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_advertiser_campaigns(&self, advertiser_id: Uuid) -> Result<Vec<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            SELECT * FROM ad_campaigns
            WHERE advertiser_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(advertiser_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_live_campaigns(
        &self,
        placement: Option<AdPlacement>,
        limit: i64,
    ) -> Result<Vec<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            SELECT * FROM ad_campaigns
            WHERE status = 'active'
              AND starts_at <= NOW() AND ends_at > NOW()
              AND ($1::ad_placement IS NULL OR placement = $1)
            ORDER BY RANDOM()
            LIMIT $2
            "#,
        )
        .bind(placement)
        .bind(limit)
        .fetch_all(&self.read_pool)
        .await
    }

    async fn get_pending_campaigns(&self) -> Result<Vec<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            SELECT * FROM ad_campaigns
            WHERE status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn approve_campaign(
        &self,
        campaign_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<AdCampaign>, Error> {
        let mut tx = self.pool.begin().await?;

        let campaign = sqlx::query_as::<_, AdCampaign>(
            r#"
            UPDATE ad_campaigns
            SET status = 'active', reviewed_by = $2, reviewed_at = NOW(),
                admin_notes = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(admin_id)
        .bind(admin_notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(campaign) = campaign else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(payment_id) = campaign.payment_transaction_id {
            sqlx::query(
                r#"
                UPDATE payment_transactions
                SET status = 'completed', updated_at = NOW()
                WHERE id = $1 AND status IN ('pending', 'expired')
                "#,
            )
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(campaign))
    }

    async fn reject_campaign(
        &self,
        campaign_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<AdCampaign>, Error> {
        sqlx::query_as::<_, AdCampaign>(
            r#"
            UPDATE ad_campaigns
            SET status = 'rejected', reviewed_by = $2, reviewed_at = NOW(),
                admin_notes = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(campaign_id)
        .bind(admin_id)
        .bind(admin_notes)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_impressions(&self, campaign_ids: &[Uuid]) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE ad_campaigns SET impressions = impressions + 1 WHERE id = ANY($1)",
        )
        .bind(campaign_ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn record_click(&self, campaign_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE ad_campaigns
            SET clicks = clicks + 1
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(campaign_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_ended_campaigns(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE ad_campaigns
            SET status = 'completed', updated_at = NOW()
            WHERE status = 'active' AND ends_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
