//! Order-summary persistence: one live summary per cart, upserted in place.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Address, PricedLine, Totals};
use crate::error::ApiError;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct SummaryRecord {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub cart_version: i64,
    pub user_id: Option<Uuid>,
    pub items: Json<Vec<PricedLine>>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub marketplace_fees: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub total_items: i32,
    pub shipping_address: Json<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            shipping: self.shipping,
            marketplace_fees: self.marketplace_fees,
            discount: self.discount,
            tax: self.tax,
            total: self.total,
        }
    }
}

#[derive(Clone)]
pub struct SummaryStore {
    pool: PgPool,
}

impl SummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn by_cart(&self, cart_id: Uuid) -> Result<Option<SummaryRecord>, ApiError> {
        let summary =
            sqlx::query_as::<_, SummaryRecord>("SELECT * FROM order_summaries WHERE cart_id = $1")
                .bind(cart_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(summary)
    }

    /// Replaces the cart's summary. Regenerating overwrites, never appends.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        cart_id: Uuid,
        cart_version: i64,
        user_id: Option<Uuid>,
        items: Vec<PricedLine>,
        totals: Totals,
        shipping_address: &Address,
    ) -> Result<SummaryRecord, ApiError> {
        let total_items: i64 = items.iter().map(|i| i64::from(i.quantity)).sum();
        let summary = sqlx::query_as::<_, SummaryRecord>(
            "INSERT INTO order_summaries \
             (id, cart_id, cart_version, user_id, items, subtotal, shipping, marketplace_fees, \
              discount, tax, total, total_items, shipping_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (cart_id) DO UPDATE SET \
               cart_version = EXCLUDED.cart_version, user_id = EXCLUDED.user_id, \
               items = EXCLUDED.items, subtotal = EXCLUDED.subtotal, \
               shipping = EXCLUDED.shipping, marketplace_fees = EXCLUDED.marketplace_fees, \
               discount = EXCLUDED.discount, tax = EXCLUDED.tax, total = EXCLUDED.total, \
               total_items = EXCLUDED.total_items, \
               shipping_address = EXCLUDED.shipping_address, updated_at = NOW() \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(cart_id)
        .bind(cart_version)
        .bind(user_id)
        .bind(Json(items))
        .bind(totals.subtotal)
        .bind(totals.shipping)
        .bind(totals.marketplace_fees)
        .bind(totals.discount)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(i32::try_from(total_items).unwrap_or(i32::MAX))
        .bind(Json(shipping_address.clone()))
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    /// The summary is consumed by checkout; removing it inside the checkout
    /// transaction keeps a cleared cart from pointing at a spent summary.
    pub async fn delete_by_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart_id: Uuid,
    ) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM order_summaries WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
