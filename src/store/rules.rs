//! Read-only shipping-rule and discount-rule access.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::discount::{AutoDiscount, Coupon, DiscountKind};
use crate::domain::shipping::ShippingRule;
use crate::error::ApiError;

#[derive(Clone)]
pub struct ShippingStore {
    pool: PgPool,
}

impl ShippingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn active_rules(&self) -> Result<Vec<ShippingRule>, ApiError> {
        let rules = sqlx::query_as::<_, ShippingRuleRow>(
            "SELECT * FROM shipping_rules WHERE active = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rules.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ShippingRuleRow {
    id: Uuid,
    country: Option<String>,
    state: Option<String>,
    pincode: Option<String>,
    min_order_value: Option<Decimal>,
    max_order_value: Option<Decimal>,
    shipping_cost: Decimal,
    marketplace_fee: Decimal,
    is_default: bool,
    active: bool,
}

impl From<ShippingRuleRow> for ShippingRule {
    fn from(r: ShippingRuleRow) -> Self {
        ShippingRule {
            id: r.id,
            country: r.country,
            state: r.state,
            pincode: r.pincode,
            min_order_value: r.min_order_value,
            max_order_value: r.max_order_value,
            shipping_cost: r.shipping_cost,
            marketplace_fee: r.marketplace_fee,
            is_default: r.is_default,
            active: r.active,
        }
    }
}

#[derive(Clone)]
pub struct CouponStore {
    pool: PgPool,
}

impl CouponStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn by_code(&self, code: &str) -> Result<Option<Coupon>, ApiError> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn active_auto_discounts(&self) -> Result<Vec<AutoDiscount>, ApiError> {
        let rows = sqlx::query_as::<_, AutoDiscountRow>(
            "SELECT * FROM auto_discounts WHERE active = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;
        // Rows missing the fields their rule type needs are skipped rather
        // than failing the whole pricing request.
        Ok(rows.into_iter().filter_map(AutoDiscountRow::into_rule).collect())
    }
}

fn parse_kind(kind: &str) -> Option<DiscountKind> {
    match kind {
        "percent" => Some(DiscountKind::Percent),
        "fixed" => Some(DiscountKind::Fixed),
        _ => None,
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    kind: String,
    value: Decimal,
    min_order_value: Option<Decimal>,
    max_discount: Option<Decimal>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(r: CouponRow) -> Self {
        Coupon {
            id: r.id,
            code: r.code,
            // Unknown kinds never pass the CHECK constraint; fall back to
            // fixed-zero rather than panicking if one does appear.
            kind: parse_kind(&r.kind).unwrap_or(DiscountKind::Fixed),
            value: r.value,
            min_order_value: r.min_order_value,
            max_discount: r.max_discount,
            expires_at: r.expires_at,
            active: r.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AutoDiscountRow {
    rule: String,
    kind: Option<String>,
    value: Option<Decimal>,
    threshold: Option<Decimal>,
    product_id: Option<Uuid>,
    buy_quantity: Option<i32>,
    free_quantity: Option<i32>,
}

impl AutoDiscountRow {
    fn into_rule(self) -> Option<AutoDiscount> {
        match self.rule.as_str() {
            "cart_value" => Some(AutoDiscount::CartValue {
                threshold: self.threshold?,
                kind: parse_kind(self.kind.as_deref()?)?,
                value: self.value?,
            }),
            "bogo" => Some(AutoDiscount::Bogo {
                product_id: self.product_id?,
                buy_quantity: u32::try_from(self.buy_quantity?).ok()?,
                free_quantity: u32::try_from(self.free_quantity?).ok()?,
            }),
            _ => None,
        }
    }
}
