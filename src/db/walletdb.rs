// db/walletdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::walletmodels::*;

#[async_trait]
pub trait WalletExt {
    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<UserWallet>, Error>;

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error>;

    /// Looks the reference up in `user_id`'s own wallet only.
    async fn get_transaction_by_reference(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, Error>;
}

#[async_trait]
impl WalletExt for DBClient {
    async fn get_wallet(&self, user_id: Uuid) -> Result<Option<UserWallet>, Error> {
        sqlx::query_as::<_, UserWallet>(
            r#"
            SELECT id, user_id, balance, locked_balance, currency, created_at, updated_at
            FROM user_wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_wallet_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletTransaction>, Error> {
        sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT t.id, t.wallet_id, t.transaction_type, t.amount, t.previous_balance,
                   t.new_balance, t.reference, t.description, t.created_at
            FROM wallet_transactions t
            JOIN user_wallets w ON w.id = t.wallet_id
            WHERE w.user_id = $1
            ORDER BY t.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_transaction_by_reference(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> Result<Option<WalletTransaction>, Error> {
        sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT t.id, t.wallet_id, t.transaction_type, t.amount, t.previous_balance,
                   t.new_balance, t.reference, t.description, t.created_at
            FROM wallet_transactions t
            JOIN user_wallets w ON w.id = t.wallet_id
            WHERE w.user_id = $1 AND t.reference = $2
            "#,
        )
        .bind(user_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
    }
}
