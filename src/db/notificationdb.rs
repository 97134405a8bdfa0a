// db/notificationdb.rs
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::notificationmodel::Notification;

#[async_trait]
pub trait NotificationExt {
    async fn store_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        message: &str,
        metadata: Option<JsonValue>,
    ) -> Result<Notification, Error>;

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn store_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        message: &str,
        metadata: Option<JsonValue>,
    ) -> Result<Notification, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, kind, message, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, kind, message, metadata, read_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, kind, message, metadata, read_at, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
