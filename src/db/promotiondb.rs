// db/promotiondb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, PgConnection};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::listingmodel::Listing;
use crate::models::promotionmodel::*;

#[derive(Debug, Clone)]
pub struct NewListingPromotion {
    pub listing_id: Uuid,
    pub package_id: Uuid,
    pub seller_id: Uuid,
    pub payment_transaction_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait PromotionExt {
    async fn get_active_packages(&self) -> Result<Vec<PromotionPackage>, Error>;

    async fn get_package(&self, package_id: Uuid) -> Result<Option<PromotionPackage>, Error>;

    async fn get_promotion(&self, promotion_id: Uuid) -> Result<Option<ListingPromotion>, Error>;

    async fn get_pending_promotions(&self) -> Result<Vec<PendingPromotionRow>, Error>;

    /// pending -> active, settles the payment and flags the listing.
    async fn approve_promotion(
        &self,
        promotion_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<ListingPromotion>, Error>;

    async fn reject_promotion(
        &self,
        promotion_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<ListingPromotion>, Error>;

    async fn link_promotion_payment(
        &self,
        promotion_id: Uuid,
        payment_transaction_id: Uuid,
    ) -> Result<Option<ListingPromotion>, Error>;

    /// Closes a pending promotion whose payment could not be started.
    async fn cancel_unpaid_promotion(
        &self,
        promotion_id: Uuid,
    ) -> Result<Option<ListingPromotion>, Error>;

    /// Returns the number of promotions that expired.
    async fn expire_promotions(&self) -> Result<u64, Error>;
}

/// Row lock that serialises purchase checks on one listing until the transaction ends.
pub async fn lock_listing(conn: &mut PgConnection, listing_id: Uuid) -> Result<Option<Listing>, Error> {
    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1 FOR UPDATE")
        .bind(listing_id)
        .fetch_optional(conn)
        .await
}

pub async fn has_active_promotion(
    conn: &mut PgConnection,
    listing_id: Uuid,
    package_id: Uuid,
) -> Result<bool, Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM listing_promotions
            WHERE listing_id = $1 AND package_id = $2 AND status = 'active'
        )
        "#,
    )
    .bind(listing_id)
    .bind(package_id)
    .fetch_one(conn)
    .await
}

pub async fn insert_promotion(
    conn: &mut PgConnection,
    promotion: NewListingPromotion,
) -> Result<ListingPromotion, Error> {
    sqlx::query_as::<_, ListingPromotion>(
        r#"
        INSERT INTO listing_promotions
        (listing_id, package_id, seller_id, payment_transaction_id, status, starts_at, expires_at)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6)
        RETURNING *
        "#,
    )
    .bind(promotion.listing_id)
    .bind(promotion.package_id)
    .bind(promotion.seller_id)
    .bind(promotion.payment_transaction_id)
    .bind(promotion.starts_at)
    .bind(promotion.expires_at)
    .fetch_one(conn)
    .await
}

#[async_trait]
impl PromotionExt for DBClient {
    async fn get_active_packages(&self) -> Result<Vec<PromotionPackage>, Error> {
        sqlx::query_as::<_, PromotionPackage>(
            r#"
            SELECT * FROM promotion_packages
            WHERE is_active = TRUE
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.read_pool)
        .await
    }

    async fn get_package(&self, package_id: Uuid) -> Result<Option<PromotionPackage>, Error> {
        sqlx::query_as::<_, PromotionPackage>("SELECT * FROM promotion_packages WHERE id = $1")
            .bind(package_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_promotion(&self, promotion_id: Uuid) -> Result<Option<ListingPromotion>, Error> {
        sqlx::query_as::<_, ListingPromotion>("SELECT * FROM listing_promotions WHERE id = $1")
            .bind(promotion_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_pending_promotions(&self) -> Result<Vec<PendingPromotionRow>, Error> {
        sqlx::query_as::<_, PendingPromotionRow>(
            r#"
            SELECT p.*,
                   l.title AS listing_title,
                   l.promoted AS listing_promoted,
                   l.featured AS listing_featured,
                   pk.name AS package_name,
                   pk.price AS package_price,
                   pk.duration_days AS package_duration_days,
                   pt.our_reference AS payment_reference,
                   pt.status AS payment_status,
                   pt.payment_method AS payment_method,
                   pt.amount AS payment_amount
            FROM listing_promotions p
            JOIN listings l ON l.id = p.listing_id
            JOIN promotion_packages pk ON pk.id = p.package_id
            LEFT JOIN payment_transactions pt ON pt.id = p.payment_transaction_id
            WHERE p.status = 'pending'
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn approve_promotion(
        &self,
        promotion_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<ListingPromotion>, Error> {
        let mut tx = self.pool.begin().await?;

        let promotion = sqlx::query_as::<_, ListingPromotion>(
            r#"
            UPDATE listing_promotions
            SET status = 'active', reviewed_by = $2, reviewed_at = NOW(),
                admin_notes = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(promotion_id)
        .bind(admin_id)
        .bind(admin_notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(promotion) = promotion else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(payment_id) = promotion.payment_transaction_id {
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

        sqlx::query(
            r#"
            UPDATE listings
            SET promoted = TRUE,
                featured = featured OR (
                    SELECT grants_featured FROM promotion_packages WHERE id = $2
                ),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(promotion.listing_id)
        .bind(promotion.package_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(promotion))
    }

    async fn reject_promotion(
        &self,
        promotion_id: Uuid,
        admin_id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<Option<ListingPromotion>, Error> {
        sqlx::query_as::<_, ListingPromotion>(
            r#"
            UPDATE listing_promotions
            SET status = 'cancelled', reviewed_by = $2, reviewed_at = NOW(),
                admin_notes = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(promotion_id)
        .bind(admin_id)
        .bind(admin_notes)
        .fetch_optional(&self.pool)
        .await
    }

    async fn link_promotion_payment(
        &self,
        promotion_id: Uuid,
        payment_transaction_id: Uuid,
    ) -> Result<Option<ListingPromotion>, Error> {
        sqlx::query_as::<_, ListingPromotion>(
            r#"
            UPDATE listing_promotions
            SET payment_transaction_id = $2, updated_at = NOW()
            WHERE id = $1 AND payment_transaction_id IS NULL
            RETURNING *
            "#,
        )
        .bind(promotion_id)
        .bind(payment_transaction_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn cancel_unpaid_promotion(
        &self,
        promotion_id: Uuid,
    ) -> Result<Option<ListingPromotion>, Error> {
        sqlx::query_as::<_, ListingPromotion>(
            r#"
            UPDATE listing_promotions
            SET status = 'cancelled', admin_notes = 'Payment initiation failed', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(promotion_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn expire_promotions(&self) -> Result<u64, Error> {
        let mut tx = self.pool.begin().await?;

        let listing_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE listing_promotions
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND expires_at < NOW()
            RETURNING listing_id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        if listing_ids.is_empty() {
            tx.rollback().await?;
            return Ok(0);
        }

        // Flags follow whatever promotions are still active on the listing
        sqlx::query(
            r#"
            UPDATE listings l
            SET promoted = EXISTS (
                    SELECT 1 FROM listing_promotions p
                    WHERE p.listing_id = l.id AND p.status = 'active'
                ),
                featured = EXISTS (
                    SELECT 1 FROM listing_promotions p
                    JOIN promotion_packages pk ON pk.id = p.package_id
                    WHERE p.listing_id = l.id AND p.status = 'active' AND pk.grants_featured
                ),
                updated_at = NOW()
            WHERE l.id = ANY($1)
            "#,
        )
        .bind(&listing_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(listing_ids.len() as u64)
    }
}
