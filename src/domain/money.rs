//! Monetary helpers

use rust_decimal::Decimal;

/// Rounds to two decimal places, the precision every stored amount carries.
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Clamps a computed amount at zero. Discounts can exceed the remaining
/// charges; the charged amount never goes negative.
pub fn non_negative(amount: Decimal) -> Decimal {
    if amount < Decimal::ZERO { Decimal::ZERO } else { amount }
}

pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round(unit_price * Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round(dec!(10.005)), dec!(10.01));
        assert_eq!(round(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn clamps_negative() {
        assert_eq!(non_negative(dec!(-3.50)), Decimal::ZERO);
        assert_eq!(non_negative(dec!(3.50)), dec!(3.50));
    }

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(dec!(19.99), 3), dec!(59.97));
    }
}
