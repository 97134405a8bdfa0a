// db/paymentdb.rs
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub purpose: PaymentPurpose,
    pub our_reference: String,
    pub gateway_reference: Option<String>,
    pub metadata: Option<JsonValue>,
}

#[async_trait]
pub trait PaymentExt {
    async fn create_payment_transaction(
        &self,
        payment: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, Error>;

    async fn get_payment_by_reference(
        &self,
        our_reference: &str,
    ) -> Result<Option<PaymentTransaction>, Error>;

    /// Conditional transition; `None` if the payment was not in `from`.
    /// Moves the payment to `to` if its current status is one of `from`.
    async fn update_payment_status(
        &self,
        our_reference: &str,
        from: &[PaymentStatus],
        to: PaymentStatus,
        gateway_reference: Option<String>,
    ) -> Result<Option<PaymentTransaction>, Error>;

    async fn expire_stale_payments(&self) -> Result<u64, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn create_payment_transaction(
        &self,
        payment: NewPaymentTransaction,
    ) -> Result<PaymentTransaction, Error> {
        let expires_at = Utc::now() + Duration::hours(PAYMENT_WINDOW_HOURS);

        sqlx::query_as::<_, PaymentTransaction>(
            r#"
            INSERT INTO payment_transactions
            (user_id, amount, currency, payment_method, transaction_type,
             our_reference, gateway_reference, metadata, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(payment.payment_method)
        .bind(payment.purpose)
        .bind(payment.our_reference)
        .bind(payment.gateway_reference)
        .bind(payment.metadata)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payment_by_reference(
        &self,
        our_reference: &str,
    ) -> Result<Option<PaymentTransaction>, Error> {
        sqlx::query_as::<_, PaymentTransaction>(
            "SELECT * FROM payment_transactions WHERE our_reference = $1",
        )
        .bind(our_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_payment_status(
        &self,
        our_reference: &str,
        from: &[PaymentStatus],
        to: PaymentStatus,
        gateway_reference: Option<String>,
    ) -> Result<Option<PaymentTransaction>, Error> {
        sqlx::query_as::<_, PaymentTransaction>(
            r#"
            UPDATE payment_transactions
            SET status = $3,
                gateway_reference = COALESCE($4, gateway_reference),
                updated_at = NOW()
            WHERE our_reference = $1 AND status = ANY($2)
            RETURNING *
            "#,
        )
        .bind(our_reference)
        .bind(from)
        .bind(to)
        .bind(gateway_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn expire_stale_payments(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'pending' AND expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
