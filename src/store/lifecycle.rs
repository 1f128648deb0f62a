//! Return, replacement and refund persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::status::{ReplacementStatus, ReturnStatus};
use crate::error::ApiError;

/// Item of a return or replacement request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RequestItem {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<RequestItem>>,
    pub reason: String,
    pub status: String,
    pub refund_mode: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnRecord {
    pub fn status(&self) -> Result<ReturnStatus, ApiError> {
        self.status
            .parse()
            .map_err(|_| ApiError::Validation(format!("return has unknown status {}", self.status)))
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ReplacementRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<RequestItem>>,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReplacementRecord {
    pub fn status(&self) -> Result<ReplacementStatus, ApiError> {
        self.status.parse().map_err(|_| {
            ApiError::Validation(format!("replacement has unknown status {}", self.status))
        })
    }
}

#[derive(Clone, Debug, serde::Serialize, sqlx::FromRow)]
pub struct RefundRecord {
    pub id: Uuid,
    pub return_id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub mode: String,
    pub amount: Decimal,
    pub transaction_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ReturnStore {
    pool: PgPool,
}

impl ReturnStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        items: Vec<RequestItem>,
        reason: &str,
    ) -> Result<ReturnRecord, ApiError> {
        let record = sqlx::query_as::<_, ReturnRecord>(
            "INSERT INTO order_returns (id, order_id, user_id, items, reason, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(user_id)
        .bind(Json(items))
        .bind(reason)
        .bind(ReturnStatus::Requested.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ReturnRecord>, ApiError> {
        let record = sqlx::query_as::<_, ReturnRecord>("SELECT * FROM order_returns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Conditional on the status the caller read; `None` means a concurrent
    /// update won.
    pub async fn set_status(
        &self,
        id: Uuid,
        from: ReturnStatus,
        to: ReturnStatus,
    ) -> Result<Option<ReturnRecord>, ApiError> {
        let record = sqlx::query_as::<_, ReturnRecord>(
            "UPDATE order_returns SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 RETURNING *",
        )
        .bind(id)
        .bind(to.to_string())
        .bind(from.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Conditional move into `refunded`. Only an `approved` return can make
    /// the jump, and only once; a second attempt matches zero rows.
    pub async fn mark_refunded(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        mode: &str,
        amount: Decimal,
    ) -> Result<Option<ReturnRecord>, ApiError> {
        let record = sqlx::query_as::<_, ReturnRecord>(
            "UPDATE order_returns SET status = $2, refund_mode = $3, refund_amount = $4, \
             processed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $5 RETURNING *",
        )
        .bind(id)
        .bind(ReturnStatus::Refunded.to_string())
        .bind(mode)
        .bind(amount)
        .bind(ReturnStatus::Approved.to_string())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(record)
    }
}

#[derive(Clone)]
pub struct ReplacementStore {
    pool: PgPool,
}

impl ReplacementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        items: Vec<RequestItem>,
        reason: &str,
    ) -> Result<ReplacementRecord, ApiError> {
        let record = sqlx::query_as::<_, ReplacementRecord>(
            "INSERT INTO order_replacements (id, order_id, user_id, items, reason, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(user_id)
        .bind(Json(items))
        .bind(reason)
        .bind(ReplacementStatus::Requested.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ReplacementRecord>, ApiError> {
        let record =
            sqlx::query_as::<_, ReplacementRecord>("SELECT * FROM order_replacements WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        from: ReplacementStatus,
        to: ReplacementStatus,
    ) -> Result<Option<ReplacementRecord>, ApiError> {
        let record = sqlx::query_as::<_, ReplacementRecord>(
            "UPDATE order_replacements SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 RETURNING *",
        )
        .bind(id)
        .bind(to.to_string())
        .bind(from.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[derive(Clone)]
pub struct RefundStore {
    pool: PgPool,
}

impl RefundStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ledger append. The unique index on `return_id` is the backstop against
    /// two refunds for one return; `None` means someone else already wrote it.
    pub async fn insert(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        return_id: Uuid,
        order_id: Uuid,
        user_id: Uuid,
        mode: &str,
        amount: Decimal,
    ) -> Result<Option<RefundRecord>, ApiError> {
        let record = sqlx::query_as::<_, RefundRecord>(
            "INSERT INTO refunds (id, return_id, order_id, user_id, mode, amount, transaction_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (return_id) DO NOTHING RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(return_id)
        .bind(order_id)
        .bind(user_id)
        .bind(mode)
        .bind(amount)
        .bind(format!("TXN-{:010}", rand::random::<u32>()))
        .fetch_optional(&mut **tx)
        .await?;
        Ok(record)
    }

    pub async fn by_return(&self, return_id: Uuid) -> Result<Option<RefundRecord>, ApiError> {
        let record = sqlx::query_as::<_, RefundRecord>("SELECT * FROM refunds WHERE return_id = $1")
            .bind(return_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}
