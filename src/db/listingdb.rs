// db/listingdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::dtos::listingdtos::{CreateListingDto, UpdateListingDto};
use crate::models::listingmodel::*;

#[derive(Debug, Default, Clone, Copy)]
pub struct ListingFilter {
    pub category: Option<ListingCategory>,
    pub status: Option<ListingStatus>,
    pub promoted: Option<bool>,
}

#[async_trait]
pub trait ListingExt {
    async fn create_listing(
        &self,
        seller_id: Uuid,
        listing: CreateListingDto,
        default_currency: &str,
    ) -> Result<Listing, Error>;

    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, Error>;

    async fn get_listings(
        &self,
        filter: ListingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Listing>, Error>;

    async fn count_listings(&self, filter: ListingFilter) -> Result<i64, Error>;

    async fn get_seller_listings(&self, seller_id: Uuid) -> Result<Vec<Listing>, Error>;

    async fn update_listing(
        &self,
        listing_id: Uuid,
        changes: UpdateListingDto,
    ) -> Result<Listing, Error>;

    async fn append_listing_media(&self, listing_id: Uuid, url: &str) -> Result<Listing, Error>;

    async fn increment_listing_views(&self, listing_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
impl ListingExt for DBClient {
    async fn create_listing(
        &self,
        seller_id: Uuid,
        listing: CreateListingDto,
        default_currency: &str,
    ) -> Result<Listing, Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings
            (seller_id, title, description, category, price, currency, location,
             visit_fee_enabled, visit_fee_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(seller_id)
        .bind(listing.title)
        .bind(listing.description.unwrap_or_default())
        .bind(listing.category)
        .bind(listing.price)
        .bind(listing.currency.unwrap_or_else(|| default_currency.to_string()))
        .bind(listing.location)
        .bind(listing.visit_fee_enabled)
        .bind(listing.visit_fee_amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, Error> {
        sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
            .bind(listing_id)
            .fetch_optional(&self.read_pool)
            .await
    }

    async fn get_listings(
        &self,
        filter: ListingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Listing>, Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT * FROM listings
            WHERE ($1::listing_category IS NULL OR category = $1)
              AND ($2::listing_status IS NULL OR status = $2)
              AND ($3::boolean IS NULL OR promoted = $3)
            ORDER BY featured DESC, promoted DESC, created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.category)
        .bind(filter.status)
        .bind(filter.promoted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.read_pool)
        .await
    }

    async fn count_listings(&self, filter: ListingFilter) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM listings
            WHERE ($1::listing_category IS NULL OR category = $1)
              AND ($2::listing_status IS NULL OR status = $2)
              AND ($3::boolean IS NULL OR promoted = $3)
            "#,
        )
        .bind(filter.category)
        .bind(filter.status)
        .bind(filter.promoted)
        .fetch_one(&self.read_pool)
        .await
    }

    async fn get_seller_listings(&self, seller_id: Uuid) -> Result<Vec<Listing>, Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT * FROM listings
            WHERE seller_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_listing(
        &self,
        listing_id: Uuid,
        changes: UpdateListingDto,
    ) -> Result<Listing, Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                location = COALESCE($5, location),
                status = COALESCE($6, status),
                visit_fee_enabled = COALESCE($7, visit_fee_enabled),
                visit_fee_amount = COALESCE($8, visit_fee_amount),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(listing_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.location)
        .bind(changes.status)
        .bind(changes.visit_fee_enabled)
        .bind(changes.visit_fee_amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn append_listing_media(&self, listing_id: Uuid, url: &str) -> Result<Listing, Error> {
        sqlx::query_as::<_, Listing>(
            r#"
            UPDATE listings
            SET media_urls = media_urls || jsonb_build_array($2::text),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(listing_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
    }

    async fn increment_listing_views(&self, listing_id: Uuid) -> Result<(), Error> {
        sqlx::query("UPDATE listings SET views_count = views_count + 1 WHERE id = $1")
            .bind(listing_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
