//! Unit-price resolution and order totals.
//!
//! Pricing is recomputed server-side from the catalog on every summary; the
//! client-supplied cart numbers are only a fallback of last resort.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::CartLine;
use super::money;

/// Catalog product as the pricing path reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub final_price: Option<Decimal>,
    pub stock: i32,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Option<Decimal>,
    pub stock: i32,
}

/// Unit-price precedence, highest first:
///
/// 1. negotiated price on the cart line (approved business pricing)
/// 2. variant price
/// 3. product `final_price` (sale price)
/// 4. product list price
/// 5. price stored on the cart line (catalog row has since vanished)
///
/// The order is load-bearing: negotiation must beat the catalog or approved
/// deals silently revert, and `final_price` must beat list price or sales
/// never apply.
pub fn resolve_unit_price(
    line: &CartLine,
    product: Option<&Product>,
    variant: Option<&Variant>,
) -> Decimal {
    if let Some(negotiated) = line.negotiated_price {
        return negotiated;
    }
    if let Some(price) = variant.and_then(|v| v.price) {
        return price;
    }
    if let Some(p) = product {
        return p.final_price.unwrap_or(p.price);
    }
    line.final_price
}

/// Line snapshot denormalized into summaries and frozen into orders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl PricedLine {
    pub fn new(
        line: &CartLine,
        product: Option<&Product>,
        variant: Option<&Variant>,
    ) -> Self {
        let unit_price = resolve_unit_price(line, product, variant);
        Self {
            product_id: line.product_id,
            variant_id: line.variant_id,
            name: product.map_or_else(String::new, |p| p.name.clone()),
            brand: product.and_then(|p| p.brand.clone()),
            image_url: product.and_then(|p| p.image_url.clone()),
            quantity: line.quantity,
            unit_price,
            line_total: money::line_total(unit_price, line.quantity),
        }
    }
}

/// Tax as a percentage of subtotal. Held in app state so the 5% default is
/// a deployment setting, not a constant buried in the math.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub fn from_percent(percent: Decimal) -> Self {
        Self(percent)
    }

    pub fn percent(self) -> Decimal {
        self.0
    }

    pub fn tax_on(self, subtotal: Decimal) -> Decimal {
        money::round(subtotal * self.0 / Decimal::ONE_HUNDRED)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self(Decimal::new(5, 0))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub marketplace_fees: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// `total = max(subtotal + shipping + fees + tax - discount, 0)`.
pub fn compute_totals(
    subtotal: Decimal,
    shipping: Decimal,
    marketplace_fees: Decimal,
    discount: Decimal,
    tax_rate: TaxRate,
) -> Totals {
    let tax = tax_rate.tax_on(subtotal);
    let total = money::non_negative(money::round(
        subtotal + shipping + marketplace_fees + tax - discount,
    ));
    Totals { subtotal, shipping, marketplace_fees, discount, tax, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(final_price: Decimal) -> CartLine {
        CartLine {
            product_id: Uuid::from_u128(1),
            variant_id: None,
            quantity: 1,
            price: final_price,
            final_price,
            shipping_charge: None,
            negotiated_price: None,
        }
    }

    fn product(price: Decimal, final_price: Option<Decimal>) -> Product {
        Product {
            id: Uuid::from_u128(1),
            name: "Widget".into(),
            brand: Some("Acme".into()),
            image_url: None,
            price,
            final_price,
            stock: 10,
            active: true,
        }
    }

    #[test]
    fn negotiated_price_beats_everything() {
        let mut l = line(dec!(100));
        l.negotiated_price = Some(dec!(70));
        let p = product(dec!(100), Some(dec!(90)));
        let v = Variant {
            id: Uuid::from_u128(2),
            product_id: p.id,
            name: "L".into(),
            price: Some(dec!(95)),
            stock: 5,
        };
        assert_eq!(resolve_unit_price(&l, Some(&p), Some(&v)), dec!(70));
    }

    #[test]
    fn variant_price_beats_product() {
        let l = line(dec!(100));
        let p = product(dec!(100), Some(dec!(90)));
        let v = Variant {
            id: Uuid::from_u128(2),
            product_id: p.id,
            name: "L".into(),
            price: Some(dec!(95)),
            stock: 5,
        };
        assert_eq!(resolve_unit_price(&l, Some(&p), Some(&v)), dec!(95));
    }

    #[test]
    fn final_price_beats_list_price() {
        let l = line(dec!(100));
        let p = product(dec!(100), Some(dec!(90)));
        assert_eq!(resolve_unit_price(&l, Some(&p), None), dec!(90));
        let p = product(dec!(100), None);
        assert_eq!(resolve_unit_price(&l, Some(&p), None), dec!(100));
    }

    #[test]
    fn cart_price_is_last_resort() {
        let l = line(dec!(42));
        assert_eq!(resolve_unit_price(&l, None, None), dec!(42));
    }

    #[test]
    fn totals_identity_holds() {
        let t = compute_totals(dec!(200), dec!(15), Decimal::ZERO, Decimal::ZERO, TaxRate::default());
        assert_eq!(t.tax, dec!(10));
        assert_eq!(t.total, dec!(225));
        assert_eq!(
            t.total,
            t.subtotal + t.shipping + t.marketplace_fees + t.tax - t.discount
        );
    }

    #[test]
    fn total_clamped_at_zero() {
        let t = compute_totals(dec!(50), Decimal::ZERO, Decimal::ZERO, dec!(100), TaxRate::default());
        assert_eq!(t.total, Decimal::ZERO);
    }

    #[test]
    fn tax_rate_is_configurable() {
        let rate = TaxRate::from_percent(dec!(18));
        assert_eq!(rate.tax_on(dec!(100)), dec!(18));
        assert_eq!(TaxRate::default().tax_on(dec!(200)), dec!(10));
    }
}
