//! Money helpers built on decimal arithmetic.
//!
//! Prices are carried as [`rust_decimal::Decimal`] in major units (shillings,
//! not cents). The payment gateway is the only consumer of minor units, so
//! conversion happens once at the checkout boundary.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Convert a major-unit amount to minor units (×100, banker's-rounded).
///
/// Amounts that would overflow `i64` saturate; the gateway rejects those
/// long before this matters for real basket sizes.
#[must_use]
pub fn minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_minor_units_whole() {
        assert_eq!(minor_units(Decimal::from(1500)), 150_000);
    }

    #[test]
    fn test_minor_units_fractional() {
        let amount = Decimal::from_str("19.99").unwrap();
        assert_eq!(minor_units(amount), 1999);
    }

    #[test]
    fn test_minor_units_rounds() {
        let amount = Decimal::from_str("10.005").unwrap();
        // Banker's rounding: .005 rounds to the even cent
        assert_eq!(minor_units(amount), 1000);
    }

    #[test]
    fn test_minor_units_zero() {
        assert_eq!(minor_units(Decimal::ZERO), 0);
    }
}
