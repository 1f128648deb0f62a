//! Cart persistence.
//!
//! Every mutation bumps `version`; summaries record the version they priced
//! and checkout clears the cart with a compare-and-swap on it. That single
//! counter is what makes stale summaries and double checkouts detectable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::cart::{self, CartLine};
use crate::error::ApiError;
use crate::identity::Identity;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CartRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub items: Json<Vec<CartLine>>,
    pub coupon_code: Option<String>,
    pub discount: Decimal,
    pub cart_total: Decimal,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartRecord {
    pub fn lines(&self) -> &[CartLine] {
        &self.items.0
    }

    pub fn is_empty(&self) -> bool {
        self.items.0.is_empty()
    }

    /// Owner check: a cart belongs to the calling user, or to the calling
    /// guest session. Admins may read any cart.
    pub fn owned_by(&self, identity: &Identity) -> bool {
        if identity.admin {
            return true;
        }
        match (self.user_id, identity.user_id) {
            (Some(owner), Some(caller)) => owner == caller,
            (None, _) => {
                self.session_id.is_some() && self.session_id == identity.session_id
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct CartStore {
    pool: PgPool,
}

impl CartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, cart_id: Uuid) -> Result<Option<CartRecord>, ApiError> {
        let cart = sqlx::query_as::<_, CartRecord>("SELECT * FROM carts WHERE id = $1")
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cart)
    }

    pub async fn find_for(&self, identity: &Identity) -> Result<Option<CartRecord>, ApiError> {
        if let Some(user_id) = identity.user_id {
            let cart = sqlx::query_as::<_, CartRecord>("SELECT * FROM carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(cart);
        }
        if let Some(session) = &identity.session_id {
            let cart = sqlx::query_as::<_, CartRecord>("SELECT * FROM carts WHERE session_id = $1")
                .bind(session)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(cart);
        }
        Ok(None)
    }

    pub async fn get_or_create(&self, identity: &Identity) -> Result<CartRecord, ApiError> {
        if let Some(cart) = self.find_for(identity).await? {
            return Ok(cart);
        }
        let cart = sqlx::query_as::<_, CartRecord>(
            "INSERT INTO carts (id, user_id, session_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(identity.user_id)
        .bind(identity.user_id.is_none().then(|| identity.session_id.clone()).flatten())
        .fetch_one(&self.pool)
        .await?;
        Ok(cart)
    }

    /// Persists a new line set, recomputing the stored total and bumping the
    /// version. Coupon/discount are passed through so coupon handlers reuse
    /// the same write path.
    pub async fn save_lines(
        &self,
        cart_id: Uuid,
        lines: Vec<CartLine>,
        coupon_code: Option<String>,
        discount: Decimal,
    ) -> Result<CartRecord, ApiError> {
        let cart_total = cart::cart_total(&lines, discount);
        let cart = sqlx::query_as::<_, CartRecord>(
            "UPDATE carts SET items = $2, coupon_code = $3, discount = $4, cart_total = $5, \
             version = version + 1, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(cart_id)
        .bind(Json(lines))
        .bind(coupon_code)
        .bind(discount)
        .bind(cart_total)
        .fetch_optional(&self.pool)
        .await?;
        cart.ok_or(ApiError::NotFound("cart"))
    }

    /// Checkout-time clear. Succeeds only if the cart is still at
    /// `expected_version` and non-empty; a concurrent checkout or a mutation
    /// after the summary was generated makes this a no-op and the caller
    /// reports `Conflict`.
    pub async fn clear_for_checkout(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart_id: Uuid,
        expected_version: i64,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE carts SET items = '[]'::jsonb, coupon_code = NULL, discount = 0, \
             cart_total = 0, version = version + 1, updated_at = NOW() \
             WHERE id = $1 AND version = $2 AND jsonb_array_length(items) > 0",
        )
        .bind(cart_id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes a guest cart once its lines have been merged into the user's.
    pub async fn delete(&self, cart_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
