//! Negotiation proposal persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::negotiation::NegotiatedItem;
use crate::domain::status::NegotiationStatus;
use crate::error::ApiError;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NegotiationRecord {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<NegotiatedItem>>,
    pub total_proposed: Decimal,
    pub counter_total: Option<Decimal>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NegotiationRecord {
    pub fn status(&self) -> Result<NegotiationStatus, ApiError> {
        self.status.parse().map_err(|_| {
            ApiError::Validation(format!("negotiation has unknown status {}", self.status))
        })
    }
}

#[derive(Clone)]
pub struct NegotiationStore {
    pool: PgPool,
}

impl NegotiationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        cart_id: Uuid,
        user_id: Uuid,
        items: Vec<NegotiatedItem>,
        total_proposed: Decimal,
    ) -> Result<NegotiationRecord, ApiError> {
        let record = sqlx::query_as::<_, NegotiationRecord>(
            "INSERT INTO negotiations (id, cart_id, user_id, items, total_proposed, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(cart_id)
        .bind(user_id)
        .bind(Json(items))
        .bind(total_proposed)
        .bind(NegotiationStatus::Pending.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<NegotiationRecord>, ApiError> {
        let record = sqlx::query_as::<_, NegotiationRecord>("SELECT * FROM negotiations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Conditional on the status the caller read; `None` means a concurrent
    /// decision won.
    pub async fn set_status(
        &self,
        id: Uuid,
        from: NegotiationStatus,
        to: NegotiationStatus,
        counter_total: Option<Decimal>,
    ) -> Result<Option<NegotiationRecord>, ApiError> {
        let record = sqlx::query_as::<_, NegotiationRecord>(
            "UPDATE negotiations SET status = $2, counter_total = COALESCE($3, counter_total), \
             updated_at = NOW() WHERE id = $1 AND status = $4 RETURNING *",
        )
        .bind(id)
        .bind(to.to_string())
        .bind(counter_total)
        .bind(from.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}
