//! Order and order-history persistence.
//!
//! Orders are written once inside the checkout transaction; afterwards only
//! `status`, `payment_status` and tracking/address annotations may change.
//! The financial columns and the item snapshot are never updated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::status::OrderStatus;
use crate::domain::{Address, PricedLine, Totals};
use crate::error::ApiError;
use crate::identity::Identity;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub cart_id: Uuid,
    pub items: Json<Vec<PricedLine>>,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_address: Json<Address>,
    pub billing_address: Option<Json<Address>>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub coupon_code: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn status(&self) -> Result<OrderStatus, ApiError> {
        self.status
            .parse()
            .map_err(|_| ApiError::Validation(format!("order has unknown status {}", self.status)))
    }

    pub fn owned_by(&self, identity: &Identity) -> bool {
        identity.admin || (self.user_id.is_some() && self.user_id == identity.user_id)
    }
}

pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub cart_id: Uuid,
    pub items: Vec<PricedLine>,
    pub payment_method: String,
    pub payment_status: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub totals: Totals,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, sqlx::FromRow)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub comment: Option<String>,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
}

impl OrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Part of the checkout transaction. The order number comes from a
    /// database sequence so it is unique without retry loops.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrder,
    ) -> Result<OrderRecord, ApiError> {
        let record = sqlx::query_as::<_, OrderRecord>(
            "INSERT INTO orders \
             (id, order_number, user_id, cart_id, items, payment_method, payment_status, \
              shipping_address, billing_address, subtotal, discount, shipping, tax, \
              grand_total, coupon_code, status, notes) \
             VALUES ($1, 'ORD-' || nextval('order_number_seq'), $2, $3, $4, $5, $6, $7, $8, \
                     $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order.user_id)
        .bind(order.cart_id)
        .bind(Json(order.items.clone()))
        .bind(&order.payment_method)
        .bind(&order.payment_status)
        .bind(Json(order.shipping_address.clone()))
        .bind(order.billing_address.clone().map(Json))
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.shipping)
        .bind(order.totals.tax)
        .bind(order.totals.total)
        .bind(&order.coupon_code)
        .bind(OrderStatus::Placed.to_string())
        .bind(&order.notes)
        .fetch_one(&mut **tx)
        .await?;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<OrderRecord>, ApiError> {
        let order = sqlx::query_as::<_, OrderRecord>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderRecord>, ApiError> {
        let orders = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn list_all(&self, page: u32, per_page: u32) -> Result<(Vec<OrderRecord>, i64), ApiError> {
        let orders = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(per_page))
        .bind(page_offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok((orders, total.0))
    }

    /// Status annotation only; totals and items stay frozen. Conditional on
    /// the status the caller read, so two concurrent admin calls cannot both
    /// apply: the loser matches zero rows and gets `None`.
    pub async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Option<OrderRecord>, ApiError> {
        let order = sqlx::query_as::<_, OrderRecord>(
            "UPDATE orders SET status = $2, \
             tracking_number = COALESCE($3, tracking_number), updated_at = NOW() \
             WHERE id = $1 AND status = $4 RETURNING *",
        )
        .bind(id)
        .bind(to.to_string())
        .bind(tracking_number)
        .bind(from.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }
}

/// SQL OFFSET for 1-based page numbers. Computed in `i64` so an absurd page
/// value clamps instead of overflowing.
fn page_offset(page: u32, per_page: u32) -> i64 {
    (i64::from(page) - 1).max(0).saturating_mul(i64::from(per_page))
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: PgPool,
}

impl HistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append within the checkout transaction.
    pub async fn append_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        status: &str,
        comment: Option<&str>,
        updated_by: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO order_history (id, order_id, status, comment, updated_by) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(status)
        .bind(comment)
        .bind(updated_by)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn append(
        &self,
        order_id: Uuid,
        status: &str,
        comment: Option<&str>,
        updated_by: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO order_history (id, order_id, status, comment, updated_by) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(status)
        .bind(comment)
        .bind(updated_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn for_order(&self, order_id: Uuid) -> Result<Vec<HistoryRecord>, ApiError> {
        let rows = sqlx::query_as::<_, HistoryRecord>(
            "SELECT * FROM order_history WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_one_based_and_never_overflows() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        // page=0 is a caller bug; treat it like page 1 rather than a negative offset
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(u32::MAX, u32::MAX), (i64::from(u32::MAX) - 1) * i64::from(u32::MAX));
    }
}
