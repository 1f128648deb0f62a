//! Negotiated (business-account) pricing.
//!
//! Applying an approved negotiation is a pure transform over the cart lines:
//! it returns the rewritten lines and new total rather than mutating in place,
//! so the pricing pipeline stays composable. The store persists the result and
//! bumps the cart version, which invalidates any summary generated before the
//! negotiation landed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::{self, CartLine};

/// One negotiated line of a proposal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegotiatedItem {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    pub negotiated_price: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NegotiatedCart {
    pub lines: Vec<CartLine>,
    pub cart_total: Decimal,
}

/// Rewrites matching lines' prices to the negotiated value and recomputes the
/// cart total. Lines the negotiation does not mention are untouched; proposal
/// items with no matching line are ignored.
pub fn apply_negotiated_pricing(
    lines: &[CartLine],
    items: &[NegotiatedItem],
    discount: Decimal,
) -> NegotiatedCart {
    let lines: Vec<CartLine> = lines
        .iter()
        .map(|line| {
            let matched = items.iter().find(|i| {
                i.product_id == line.product_id && i.variant_id == line.variant_id
            });
            match matched {
                Some(item) => CartLine {
                    price: item.negotiated_price,
                    final_price: item.negotiated_price,
                    negotiated_price: Some(item.negotiated_price),
                    ..line.clone()
                },
                None => line.clone(),
            }
        })
        .collect();
    let cart_total = cart::cart_total(&lines, discount);
    NegotiatedCart { lines, cart_total }
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
    fn rewrites_matching_lines_only() {
        let lines = vec![line(1, 10, dec!(100)), line(2, 5, dec!(50))];
        let items = vec![NegotiatedItem {
            product_id: Uuid::from_u128(1),
            variant_id: None,
            negotiated_price: dec!(80),
        }];
        let result = apply_negotiated_pricing(&lines, &items, Decimal::ZERO);
        assert_eq!(result.lines[0].negotiated_price, Some(dec!(80)));
        assert_eq!(result.lines[0].final_price, dec!(80));
        assert_eq!(result.lines[1], lines[1]);
        assert_eq!(result.cart_total, dec!(1050));
    }

    #[test]
    fn original_lines_untouched() {
        let lines = vec![line(1, 1, dec!(100))];
        let items = vec![NegotiatedItem {
            product_id: Uuid::from_u128(1),
            variant_id: None,
            negotiated_price: dec!(90),
        }];
        let _ = apply_negotiated_pricing(&lines, &items, Decimal::ZERO);
        assert_eq!(lines[0].negotiated_price, None);
    }

    #[test]
    fn unmatched_proposal_items_ignored() {
        let lines = vec![line(1, 1, dec!(100))];
        let items = vec![NegotiatedItem {
            product_id: Uuid::from_u128(9),
            variant_id: None,
            negotiated_price: dec!(1),
        }];
        let result = apply_negotiated_pricing(&lines, &items, Decimal::ZERO);
        assert_eq!(result.cart_total, dec!(100));
    }
}
