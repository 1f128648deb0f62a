//! Shipping rule matching.
//!
//! Rules pair an optional geographic scope (country, state, pincode) with an
//! optional order-value band. The most specific matching rule wins; carts that
//! match nothing fall back to the cheapest active default rule, and if no rule
//! exists at all shipping is free.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingRule {
    pub id: Uuid,
    pub country: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub min_order_value: Option<Decimal>,
    pub max_order_value: Option<Decimal>,
    pub shipping_cost: Decimal,
    pub marketplace_fee: Decimal,
    pub is_default: bool,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub country: String,
    pub state: Option<String>,
    pub pincode: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShippingQuote {
    pub cost: Decimal,
    pub marketplace_fee: Decimal,
}

impl ShippingRule {
    /// A rule matches when every geographic field it specifies equals the
    /// destination's, and the subtotal sits inside its value band.
    fn matches(&self, dest: &Destination, subtotal: Decimal) -> bool {
        if !self.active {
            return false;
        }
        if let Some(c) = &self.country {
            if !c.eq_ignore_ascii_case(&dest.country) {
                return false;
            }
        }
        if let Some(s) = &self.state {
            match &dest.state {
                Some(ds) if s.eq_ignore_ascii_case(ds) => {}
                _ => return false,
            }
        }
        if let Some(p) = &self.pincode {
            if p != &dest.pincode {
                return false;
            }
        }
        if let Some(min) = self.min_order_value {
            if subtotal < min {
                return false;
            }
        }
        if let Some(max) = self.max_order_value {
            if subtotal > max {
                return false;
            }
        }
        true
    }

    /// Pincode outranks state outranks country; a value band adds one notch
    /// so a banded rule beats an unbanded one at equal geography.
    fn specificity(&self) -> u8 {
        let mut score = 0;
        if self.country.is_some() {
            score += 1;
        }
        if self.state.is_some() {
            score += 2;
        }
        if self.pincode.is_some() {
            score += 4;
        }
        if self.min_order_value.is_some() || self.max_order_value.is_some() {
            score += 1;
        }
        score
    }
}

pub fn resolve(rules: &[ShippingRule], dest: &Destination, subtotal: Decimal) -> ShippingQuote {
    let best = rules
        .iter()
        .filter(|r| r.matches(dest, subtotal))
        .max_by(|a, b| {
            a.specificity()
                .cmp(&b.specificity())
                // Ties break toward the cheaper rule.
                .then(b.shipping_cost.cmp(&a.shipping_cost))
        });

    if let Some(rule) = best {
        return ShippingQuote { cost: rule.shipping_cost, marketplace_fee: rule.marketplace_fee };
    }

    rules
        .iter()
        .filter(|r| r.active && r.is_default)
        .min_by(|a, b| a.shipping_cost.cmp(&b.shipping_cost))
        .map(|r| ShippingQuote { cost: r.shipping_cost, marketplace_fee: r.marketplace_fee })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rule(country: Option<&str>, state: Option<&str>, pincode: Option<&str>, cost: Decimal) -> ShippingRule {
        ShippingRule {
            id: Uuid::new_v4(),
            country: country.map(String::from),
            state: state.map(String::from),
            pincode: pincode.map(String::from),
            min_order_value: None,
            max_order_value: None,
            shipping_cost: cost,
            marketplace_fee: Decimal::ZERO,
            is_default: false,
            active: true,
        }
    }

    fn dest() -> Destination {
        Destination { country: "IN".into(), state: Some("KA".into()), pincode: "560001".into() }
    }

    #[test]
    fn most_specific_rule_wins() {
        let rules = vec![
            rule(Some("IN"), None, None, dec!(50)),
            rule(Some("IN"), Some("KA"), None, dec!(30)),
            rule(Some("IN"), Some("KA"), Some("560001"), dec!(15)),
        ];
        assert_eq!(resolve(&rules, &dest(), dec!(200)).cost, dec!(15));
    }

    #[test]
    fn value_band_filters() {
        let mut banded = rule(Some("IN"), None, None, dec!(0));
        banded.min_order_value = Some(dec!(500));
        let rules = vec![banded, rule(Some("IN"), None, None, dec!(40))];
        assert_eq!(resolve(&rules, &dest(), dec!(200)).cost, dec!(40));
        assert_eq!(resolve(&rules, &dest(), dec!(600)).cost, dec!(0));
    }

    #[test]
    fn falls_back_to_cheapest_default() {
        // No rule scoped to the destination; the two US defaults are the
        // only candidates and the cheaper one wins.
        let mut d1 = rule(Some("US"), None, None, dec!(25));
        d1.is_default = true;
        let mut d2 = rule(Some("US"), None, None, dec!(10));
        d2.is_default = true;
        assert_eq!(resolve(&[d1, d2], &dest(), dec!(100)).cost, dec!(10));
    }

    #[test]
    fn no_rules_means_free_shipping() {
        assert_eq!(resolve(&[], &dest(), dec!(100)), ShippingQuote::default());
    }

    #[test]
    fn inactive_rules_are_ignored() {
        let mut r = rule(Some("IN"), None, None, dec!(50));
        r.active = false;
        assert_eq!(resolve(&[r], &dest(), dec!(100)).cost, Decimal::ZERO);
    }

    #[test]
    fn marketplace_fee_rides_along() {
        let mut r = rule(Some("IN"), None, None, dec!(20));
        r.marketplace_fee = dec!(3);
        let q = resolve(&[r], &dest(), dec!(100));
        assert_eq!(q.marketplace_fee, dec!(3));
    }
}
