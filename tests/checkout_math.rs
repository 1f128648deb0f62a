//! End-to-end pricing math, from cart lines through shipping and discounts
//! to the totals that checkout freezes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use storefront_api::domain::cart::CartLine;
use storefront_api::domain::discount::{evaluate_coupon, Coupon, DiscountKind};
use storefront_api::domain::negotiation::{apply_negotiated_pricing, NegotiatedItem};
use storefront_api::domain::pricing::{compute_totals, PricedLine, Product, TaxRate};
use storefront_api::domain::shipping::{resolve, Destination, ShippingRule};

fn widget(price: Decimal) -> Product {
    Product {
        id: Uuid::from_u128(1),
        name: "Widget".into(),
        brand: Some("Acme".into()),
        image_url: None,
        price,
        final_price: None,
        stock: 100,
        active: true,
    }
}

fn cart_line(qty: u32, price: Decimal) -> CartLine {
    CartLine {
        product_id: Uuid::from_u128(1),
        variant_id: None,
        quantity: qty,
        price,
        final_price: price,
        shipping_charge: None,
        negotiated_price: None,
    }
}

fn zone_rule(cost: Decimal) -> ShippingRule {
    ShippingRule {
        id: Uuid::from_u128(10),
        country: Some("IN".into()),
        state: None,
        pincode: None,
        min_order_value: None,
        max_order_value: None,
        shipping_cost: cost,
        marketplace_fee: Decimal::ZERO,
        is_default: false,
        active: true,
    }
}

fn destination() -> Destination {
    Destination { country: "IN".into(), state: Some("MH".into()), pincode: "411001".into() }
}

/// One item at 100 x 2, shipping rule 15, 5% tax, no coupon:
/// subtotal 200, tax 10, shipping 15, total 225.
#[test]
fn baseline_checkout_scenario() {
    let product = widget(dec!(100));
    let line = cart_line(2, dec!(100));
    let priced = PricedLine::new(&line, Some(&product), None);
    assert_eq!(priced.line_total, dec!(200));

    let subtotal = priced.line_total;
    let quote = resolve(&[zone_rule(dec!(15))], &destination(), subtotal);
    let totals = compute_totals(
        subtotal,
        quote.cost,
        quote.marketplace_fee,
        Decimal::ZERO,
        TaxRate::default(),
    );

    assert_eq!(totals.subtotal, dec!(200));
    assert_eq!(totals.tax, dec!(10));
    assert_eq!(totals.shipping, dec!(15));
    assert_eq!(totals.discount, Decimal::ZERO);
    assert_eq!(totals.total, dec!(225));
}

/// Re-running the same pricing inputs produces identical totals.
#[test]
fn summary_math_is_deterministic() {
    let product = widget(dec!(99.99));
    let line = cart_line(3, dec!(99.99));
    let rules = [zone_rule(dec!(20))];

    let run = || {
        let priced = PricedLine::new(&line, Some(&product), None);
        let quote = resolve(&rules, &destination(), priced.line_total);
        compute_totals(
            priced.line_total,
            quote.cost,
            quote.marketplace_fee,
            Decimal::ZERO,
            TaxRate::default(),
        )
    };
    assert_eq!(run(), run());
}

/// Totals always satisfy the identity and never go negative, coupon or not.
#[test]
fn coupon_feeds_the_totals_identity() {
    let coupon = Coupon {
        id: Uuid::from_u128(5),
        code: "TEN".into(),
        kind: DiscountKind::Percent,
        value: dec!(10),
        min_order_value: None,
        max_discount: None,
        expires_at: None,
        active: true,
    };
    let subtotal = dec!(300);
    let discount = evaluate_coupon(&coupon, subtotal, chrono::Utc::now()).unwrap();
    let totals = compute_totals(subtotal, dec!(15), dec!(5), discount, TaxRate::default());

    assert_eq!(totals.discount, dec!(30));
    assert_eq!(
        totals.total,
        totals.subtotal + totals.shipping + totals.marketplace_fees + totals.tax - totals.discount
    );
    assert!(totals.total >= Decimal::ZERO);
}

/// An approved negotiation rewrites line prices before the next summary; the
/// pricing precedence then keeps the negotiated figure even if the catalog
/// price moves.
#[test]
fn negotiation_flows_into_pricing() {
    let lines = vec![cart_line(10, dec!(100))];
    let negotiated = apply_negotiated_pricing(
        &lines,
        &[NegotiatedItem {
            product_id: Uuid::from_u128(1),
            variant_id: None,
            negotiated_price: dec!(85),
        }],
        Decimal::ZERO,
    );
    assert_eq!(negotiated.cart_total, dec!(850));

    // Catalog price rises afterwards; the negotiated line is unaffected.
    let repriced = widget(dec!(120));
    let priced = PricedLine::new(&negotiated.lines[0], Some(&repriced), None);
    assert_eq!(priced.unit_price, dec!(85));
    assert_eq!(priced.line_total, dec!(850));
}

/// Catalog changes after an order is frozen must not leak into the snapshot:
/// the snapshot is a value copy, not a reference.
#[test]
fn frozen_snapshot_ignores_catalog_changes() {
    let mut product = widget(dec!(100));
    let line = cart_line(2, dec!(100));
    let frozen = PricedLine::new(&line, Some(&product), None);

    product.price = dec!(500);
    product.final_price = Some(dec!(450));

    assert_eq!(frozen.unit_price, dec!(100));
    assert_eq!(frozen.line_total, dec!(200));
}
