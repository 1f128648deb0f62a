//! Cart line items and totals.
//!
//! A cart is the mutable working set behind checkout. Every stored cart also
//! carries a `version` counter (bumped by the store on each mutation) that the
//! summary and checkout path use to detect staleness; the math here is the
//! part that is independent of storage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money;

/// One cart line. `price` is what the line was added at, `final_price` what it
/// currently sells for, `negotiated_price` an approved business-account
/// override. Unit-price precedence across these lives in [`super::pricing`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
    pub price: Decimal,
    pub final_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_charge: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiated_price: Option<Decimal>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        money::line_total(self.final_price, self.quantity)
    }

    fn same_product(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id && self.variant_id == other.variant_id
    }
}

/// Sum of line totals plus per-line shipping charges, minus the applied
/// discount. This is the figure the stored `cart_total` column must equal.
pub fn cart_total(lines: &[CartLine], discount: Decimal) -> Decimal {
    let lines_sum: Decimal = lines
        .iter()
        .map(|l| l.line_total() + l.shipping_charge.unwrap_or(Decimal::ZERO))
        .sum();
    money::non_negative(money::round(lines_sum - discount))
}

/// Adds a line to the set, merging quantities when the same product/variant
/// is already present.
pub fn upsert_line(lines: &mut Vec<CartLine>, line: CartLine) {
    if let Some(existing) = lines.iter_mut().find(|l| l.same_product(&line)) {
        existing.quantity += line.quantity;
        existing.price = line.price;
        existing.final_price = line.final_price;
    } else {
        lines.push(line);
    }
}

/// Folds a guest cart into a user cart on login: quantities merge per
/// product/variant, guest-only lines are appended.
pub fn merge_lines(user: &[CartLine], guest: &[CartLine]) -> Vec<CartLine> {
    let mut merged = user.to_vec();
    for line in guest {
        upsert_line(&mut merged, line.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product: u128, qty: u32, price: Decimal) -> CartLine {
        CartLine {
            product_id: Uuid::from_u128(product),
            variant_id: None,
            quantity: qty,
            price,
            final_price: price,
            shipping_charge: None,
            negotiated_price: None,
        }
    }

    #[test]
    fn total_sums_lines_minus_discount() {
        let lines = vec![line(1, 2, dec!(100)), line(2, 1, dec!(50))];
        assert_eq!(cart_total(&lines, dec!(30)), dec!(220));
    }

    #[test]
    fn total_never_negative() {
        let lines = vec![line(1, 1, dec!(10))];
        assert_eq!(cart_total(&lines, dec!(500)), Decimal::ZERO);
    }

    #[test]
    fn total_includes_line_shipping() {
        let mut l = line(1, 1, dec!(10));
        l.shipping_charge = Some(dec!(5));
        assert_eq!(cart_total(&[l], Decimal::ZERO), dec!(15));
    }

    #[test]
    fn upsert_merges_same_variant() {
        let mut lines = vec![line(1, 2, dec!(10))];
        upsert_line(&mut lines, line(1, 3, dec!(10)));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn merge_keeps_user_lines_and_appends_guest_only() {
        let user = vec![line(1, 1, dec!(10))];
        let guest = vec![line(1, 2, dec!(10)), line(2, 1, dec!(20))];
        let merged = merge_lines(&user, &guest);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].quantity, 3);
    }
}
