//! Coupon and automatic discount evaluation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CouponError {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon has expired")]
    Expired,
    #[error("order value below coupon minimum")]
    BelowMinimum,
}

/// Discount a coupon grants on the given subtotal. Capped at the coupon's
/// `max_discount` and at the subtotal itself.
pub fn evaluate_coupon(
    coupon: &Coupon,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, CouponError> {
    if !coupon.active {
        return Err(CouponError::Inactive);
    }
    if coupon.expires_at.is_some_and(|exp| exp < now) {
        return Err(CouponError::Expired);
    }
    if coupon.min_order_value.is_some_and(|min| subtotal < min) {
        return Err(CouponError::BelowMinimum);
    }

    let raw = match coupon.kind {
        DiscountKind::Percent => subtotal * coupon.value / Decimal::ONE_HUNDRED,
        DiscountKind::Fixed => coupon.value,
    };
    let capped = match coupon.max_discount {
        Some(cap) if raw > cap => cap,
        _ => raw,
    };
    Ok(money::round(capped.min(subtotal)))
}

/// Automatic promotion, applied when no coupon is in play.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AutoDiscount {
    /// Cart-value promo: carts at or above `threshold` get `kind`/`value` off.
    CartValue {
        threshold: Decimal,
        kind: DiscountKind,
        value: Decimal,
    },
    /// Buy `buy_quantity`, get `free_quantity` of the same product free.
    Bogo {
        product_id: Uuid,
        buy_quantity: u32,
        free_quantity: u32,
    },
}

/// A priced line as the discount engine sees it: resolved unit price and
/// quantity, keyed by product.
#[derive(Clone, Copy, Debug)]
pub struct DiscountLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Best single auto-discount for the cart. Promotions do not stack; the
/// largest one wins.
pub fn evaluate_auto(rules: &[AutoDiscount], lines: &[DiscountLine], subtotal: Decimal) -> Decimal {
    rules
        .iter()
        .map(|rule| match rule {
            AutoDiscount::CartValue { threshold, kind, value } => {
                if subtotal < *threshold {
                    Decimal::ZERO
                } else {
                    match kind {
                        DiscountKind::Percent => subtotal * *value / Decimal::ONE_HUNDRED,
                        DiscountKind::Fixed => *value,
                    }
                }
            }
            AutoDiscount::Bogo { product_id, buy_quantity, free_quantity } => {
                let group = buy_quantity + free_quantity;
                if group == 0 {
                    return Decimal::ZERO;
                }
                lines
                    .iter()
                    .filter(|l| l.product_id == *product_id)
                    .map(|l| {
                        let free_units = (l.quantity / group) * free_quantity;
                        l.unit_price * Decimal::from(free_units)
                    })
                    .sum()
            }
        })
        .max()
        .map(|d| money::round(d.min(subtotal)))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coupon(kind: DiscountKind, value: Decimal) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE".into(),
            kind,
            value,
            min_order_value: None,
            max_discount: None,
            expires_at: None,
            active: true,
        }
    }

    #[test]
    fn percent_coupon() {
        let c = coupon(DiscountKind::Percent, dec!(10));
        assert_eq!(evaluate_coupon(&c, dec!(250), Utc::now()).unwrap(), dec!(25));
    }

    #[test]
    fn fixed_coupon_capped_at_subtotal() {
        let c = coupon(DiscountKind::Fixed, dec!(500));
        assert_eq!(evaluate_coupon(&c, dec!(100), Utc::now()).unwrap(), dec!(100));
    }

    #[test]
    fn max_discount_cap_applies() {
        let mut c = coupon(DiscountKind::Percent, dec!(50));
        c.max_discount = Some(dec!(40));
        assert_eq!(evaluate_coupon(&c, dec!(200), Utc::now()).unwrap(), dec!(40));
    }

    #[test]
    fn expired_coupon_rejected() {
        let mut c = coupon(DiscountKind::Fixed, dec!(10));
        c.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        assert_eq!(evaluate_coupon(&c, dec!(100), Utc::now()), Err(CouponError::Expired));
    }

    #[test]
    fn minimum_order_enforced() {
        let mut c = coupon(DiscountKind::Fixed, dec!(10));
        c.min_order_value = Some(dec!(150));
        assert_eq!(evaluate_coupon(&c, dec!(100), Utc::now()), Err(CouponError::BelowMinimum));
        assert!(evaluate_coupon(&c, dec!(150), Utc::now()).is_ok());
    }

    #[test]
    fn inactive_coupon_rejected() {
        let mut c = coupon(DiscountKind::Fixed, dec!(10));
        c.active = false;
        assert_eq!(evaluate_coupon(&c, dec!(100), Utc::now()), Err(CouponError::Inactive));
    }

    #[test]
    fn cart_value_promo_needs_threshold() {
        let rules = vec![AutoDiscount::CartValue {
            threshold: dec!(500),
            kind: DiscountKind::Percent,
            value: dec!(5),
        }];
        assert_eq!(evaluate_auto(&rules, &[], dec!(400)), Decimal::ZERO);
        assert_eq!(evaluate_auto(&rules, &[], dec!(600)), dec!(30));
    }

    #[test]
    fn bogo_gives_free_units_per_group() {
        let pid = Uuid::from_u128(7);
        let rules = vec![AutoDiscount::Bogo { product_id: pid, buy_quantity: 2, free_quantity: 1 }];
        let lines = [DiscountLine { product_id: pid, quantity: 7, unit_price: dec!(30) }];
        // 7 units in groups of 3 -> 2 free units.
        assert_eq!(evaluate_auto(&rules, &lines, dec!(210)), dec!(60));
    }

    #[test]
    fn best_promo_wins_no_stacking() {
        let pid = Uuid::from_u128(7);
        let rules = vec![
            AutoDiscount::CartValue { threshold: dec!(100), kind: DiscountKind::Fixed, value: dec!(20) },
            AutoDiscount::Bogo { product_id: pid, buy_quantity: 1, free_quantity: 1 },
        ];
        let lines = [DiscountLine { product_id: pid, quantity: 2, unit_price: dec!(50) }];
        assert_eq!(evaluate_auto(&rules, &lines, dec!(100)), dec!(50));
    }
}
