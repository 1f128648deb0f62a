//! Notification log: write-once records of attempted customer communication.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone)]
pub struct NotificationStore {
    pool: PgPool,
}

impl NotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        order_id: Option<Uuid>,
        user_id: Option<Uuid>,
        channel: &str,
        event: &str,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO notification_log (id, order_id, user_id, channel, event, status, error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(user_id)
        .bind(channel)
        .bind(event)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
