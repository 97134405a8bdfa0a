// db/visitdb.rs
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::PaymentMethod;
use crate::models::visitmodel::*;
use crate::models::walletmodels::{visit_payout_reference, LedgerEntry, UserWallet};

/// Values computed by the visit flow before the row is written.
#[derive(Debug, Clone)]
pub struct NewVisitRequest {
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub visit_fee_amount: i64,
    pub platform_fee: i64,
    pub seller_payout: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub payment_transaction_id: Option<Uuid>,
    pub payment_details: Option<JsonValue>,
    pub preferred_date: Option<chrono::DateTime<chrono::Utc>>,
    pub message: Option<String>,
}

#[derive(Debug)]
pub enum PayoutRelease {
    Released(VisitRequest),
    NotFound,
    AlreadyReleased,
    NotPaid(VisitStatus),
    CurrencyMismatch {
        wallet_currency: String,
        payout_currency: String,
    },
}

#[async_trait]
pub trait VisitExt {
    async fn create_visit_request(&self, visit: NewVisitRequest) -> Result<VisitRequest, Error>;

    async fn get_visit_request(&self, visit_id: Uuid) -> Result<Option<VisitRequest>, Error>;

    async fn get_visit_request_by_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<VisitRequest>, Error>;

    async fn get_buyer_visit_requests(&self, buyer_id: Uuid) -> Result<Vec<VisitRequest>, Error>;

    async fn get_visit_requests_admin(
        &self,
        status: Option<VisitStatus>,
    ) -> Result<Vec<VisitRequestWithListing>, Error>;

    /// pending_payment -> paid. `None` when the visit was not awaiting payment.
    async fn mark_visit_paid(
        &self,
        visit_id: Uuid,
        verified_by: Option<Uuid>,
        gateway_reference: Option<String>,
    ) -> Result<Option<VisitRequest>, Error>;

    /// Moves the visit to cancelled if it is still in `expected`.
    async fn cancel_visit_request(
        &self,
        visit_id: Uuid,
        expected: VisitStatus,
        reason: Option<String>,
        refunded: bool,
    ) -> Result<Option<VisitRequest>, Error>;

    /// Undoes a refunding cancellation whose gateway refund did not go through.
    async fn restore_paid_visit(&self, visit_id: Uuid) -> Result<Option<VisitRequest>, Error>;

    async fn release_visit_payout(
        &self,
        visit_id: Uuid,
        admin_id: Uuid,
    ) -> Result<PayoutRelease, Error>;
}

#[async_trait]
impl VisitExt for DBClient {
    async fn create_visit_request(&self, visit: NewVisitRequest) -> Result<VisitRequest, Error> {
        sqlx::query_as::<_, VisitRequest>(
            r#"
            INSERT INTO visit_requests
            (listing_id, buyer_id, seller_id, visit_fee_amount, platform_fee, seller_payout,
             currency, payment_method, payment_reference, payment_transaction_id,
             payment_details, preferred_date, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(visit.listing_id)
        .bind(visit.buyer_id)
        .bind(visit.seller_id)
        .bind(visit.visit_fee_amount)
        .bind(visit.platform_fee)
        .bind(visit.seller_payout)
        .bind(visit.currency)
        .bind(visit.payment_method)
        .bind(visit.payment_reference)
        .bind(visit.payment_transaction_id)
        .bind(visit.payment_details)
        .bind(visit.preferred_date)
        .bind(visit.message)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_visit_request(&self, visit_id: Uuid) -> Result<Option<VisitRequest>, Error> {
        sqlx::query_as::<_, VisitRequest>("SELECT * FROM visit_requests WHERE id = $1")
            .bind(visit_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_visit_request_by_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<VisitRequest>, Error> {
        sqlx::query_as::<_, VisitRequest>(
            "SELECT * FROM visit_requests WHERE payment_reference = $1",
        )
        .bind(payment_reference)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_buyer_visit_requests(&self, buyer_id: Uuid) -> Result<Vec<VisitRequest>, Error> {
        sqlx::query_as::<_, VisitRequest>(
            r#"
            SELECT * FROM visit_requests
            WHERE buyer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_visit_requests_admin(
        &self,
        status: Option<VisitStatus>,
    ) -> Result<Vec<VisitRequestWithListing>, Error> {
        sqlx::query_as::<_, VisitRequestWithListing>(
            r#"
            SELECT v.*, l.title AS listing_title
            FROM visit_requests v
            JOIN listings l ON l.id = v.listing_id
            WHERE ($1::visit_status IS NULL OR v.status = $1)
            ORDER BY v.created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_visit_paid(
        &self,
        visit_id: Uuid,
        verified_by: Option<Uuid>,
        gateway_reference: Option<String>,
    ) -> Result<Option<VisitRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let visit = sqlx::query_as::<_, VisitRequest>(
            r#"
            UPDATE visit_requests
            SET status = 'paid', paid_at = NOW(), paid_verified_by = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending_payment'
            RETURNING *
            "#,
        )
        .bind(visit_id)
        .bind(verified_by)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(visit) = visit else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = 'completed',
                gateway_reference = COALESCE($2, gateway_reference),
                updated_at = NOW()
            WHERE our_reference = $1 AND status IN ('pending', 'expired')
            "#,
        )
        .bind(&visit.payment_reference)
        .bind(gateway_reference)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(visit))
    }

    async fn cancel_visit_request(
        &self,
        visit_id: Uuid,
        expected: VisitStatus,
        reason: Option<String>,
        refunded: bool,
    ) -> Result<Option<VisitRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let visit = sqlx::query_as::<_, VisitRequest>(
            r#"
            UPDATE visit_requests
            SET status = 'cancelled',
                payout_status = CASE WHEN $4 THEN 'refunded'::payout_status ELSE payout_status END,
                cancelled_at = NOW(),
                cancellation_reason = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = $2 AND payout_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(visit_id)
        .bind(expected)
        .bind(reason)
        .bind(refunded)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(visit) = visit else {
            tx.rollback().await?;
            return Ok(None);
        };

        // An unpaid cancellation closes the open payment; a refund marks the settled one.
        sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = CASE WHEN $2 THEN 'refunded'::payment_status ELSE 'failed'::payment_status END,
                updated_at = NOW()
            WHERE our_reference = $1
              AND status = CASE WHEN $2 THEN 'completed'::payment_status ELSE 'pending'::payment_status END
            "#,
        )
        .bind(&visit.payment_reference)
        .bind(refunded)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(visit))
    }

    async fn restore_paid_visit(&self, visit_id: Uuid) -> Result<Option<VisitRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let visit = sqlx::query_as::<_, VisitRequest>(
            r#"
            UPDATE visit_requests
            SET status = 'paid', payout_status = 'pending',
                cancelled_at = NULL, cancellation_reason = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'cancelled' AND payout_status = 'refunded'
            RETURNING *
            "#,
        )
        .bind(visit_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(visit) = visit else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = 'completed', updated_at = NOW()
            WHERE our_reference = $1 AND status = 'refunded'
            "#,
        )
        .bind(&visit.payment_reference)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(visit))
    }

    async fn release_visit_payout(
        &self,
        visit_id: Uuid,
        admin_id: Uuid,
    ) -> Result<PayoutRelease, Error> {
        let mut tx = self.pool.begin().await?;

        let visit = sqlx::query_as::<_, VisitRequest>(
            "SELECT * FROM visit_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(visit_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(visit) = visit else {
            tx.rollback().await?;
            return Ok(PayoutRelease::NotFound);
        };

        if visit.payout_status == PayoutStatus::Released {
            tx.rollback().await?;
            return Ok(PayoutRelease::AlreadyReleased);
        }
        if visit.status != VisitStatus::Paid || visit.payout_status != PayoutStatus::Pending {
            tx.rollback().await?;
            return Ok(PayoutRelease::NotPaid(visit.status));
        }

        // Wallets are created on the first payout
        sqlx::query(
            r#"
            INSERT INTO user_wallets (user_id, currency)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(visit.seller_id)
        .bind(&visit.currency)
        .execute(&mut *tx)
        .await?;

        let wallet = sqlx::query_as::<_, UserWallet>(
            "SELECT * FROM user_wallets WHERE user_id = $1 FOR UPDATE",
        )
        .bind(visit.seller_id)
        .fetch_one(&mut *tx)
        .await?;

        if !wallet.currency.eq_ignore_ascii_case(&visit.currency) {
            tx.rollback().await?;
            return Ok(PayoutRelease::CurrencyMismatch {
                wallet_currency: wallet.currency,
                payout_currency: visit.currency,
            });
        }

        let entry = LedgerEntry::deposit(visit.seller_payout, wallet.balance);

        sqlx::query(
            r#"
            UPDATE user_wallets
            SET balance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(wallet.id)
        .bind(entry.new_balance)
        .execute(&mut *tx)
        .await?;

        let ledger_insert = sqlx::query(
            r#"
            INSERT INTO wallet_transactions
            (wallet_id, transaction_type, amount, previous_balance, new_balance, reference, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(wallet.id)
        .bind(entry.transaction_type)
        .bind(entry.amount)
        .bind(entry.previous_balance)
        .bind(entry.new_balance)
        .bind(visit_payout_reference(visit.id))
        .bind(format!("Visit fee payout for visit request {}", visit.id))
        .execute(&mut *tx)
        .await;

        if let Err(Error::Database(db_err)) = &ledger_insert {
            if db_err.is_unique_violation() {
                tx.rollback().await?;
                return Ok(PayoutRelease::AlreadyReleased);
            }
        }
        ledger_insert?;

        let released = sqlx::query_as::<_, VisitRequest>(
            r#"
            UPDATE visit_requests
            SET status = 'released', payout_status = 'released',
                released_at = NOW(), released_by = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'paid' AND payout_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(visit.id)
        .bind(admin_id)
        .fetch_optional(&mut *tx)
        .await?;

        match released {
            Some(visit) => {
                tx.commit().await?;
                Ok(PayoutRelease::Released(visit))
            }
            None => {
                tx.rollback().await?;
                Ok(PayoutRelease::AlreadyReleased)
            }
        }
    }
}
