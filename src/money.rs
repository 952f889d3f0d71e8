//! Money conversion helpers.
//!
//! Ledger rows store amounts as SQLite REAL (f64); every computation in the
//! reconciliation engine runs on `Decimal` so that proportional refund
//! allocation and long accumulations stay exact. Rounding to 2 decimal places
//! happens once, when the final report record is assembled — never in the
//! middle of the arithmetic.

use rust_decimal::prelude::*;

/// Rounding for monetary values (2 decimal places, half-up).
pub const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert an f64 ledger value to `Decimal` for calculation.
///
/// Non-finite or out-of-range values convert to zero; the ledger layer
/// rejects those before they reach the engine.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert a `Decimal` back to f64 for the report record, rounded to
/// 2 decimal places half-up. Sign is preserved — negative figures survive.
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compare two monetary f64 values for equality within [`MONEY_TOLERANCE`].
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_fixes_float_addition() {
        // 0.1 + 0.2 != 0.3 in f64, but does hold in Decimal.
        assert_ne!(0.1_f64 + 0.2_f64, 0.3_f64);
        assert_eq!(to_f64(to_decimal(0.1) + to_decimal(0.2)), 0.3);
    }

    #[test]
    fn test_accumulation_stays_exact() {
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += to_decimal(0.01);
        }
        assert_eq!(to_f64(total), 10.0);
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(to_f64(Decimal::new(5, 3)), 0.01); // 0.005 rounds up
        assert_eq!(to_f64(Decimal::new(4, 3)), 0.0); // 0.004 rounds down
    }

    #[test]
    fn test_negative_values_round_away_from_zero() {
        assert_eq!(to_f64(Decimal::new(-5, 3)), -0.01);
        assert_eq!(to_f64(to_decimal(-5.0)), -5.0);
    }

    #[test]
    fn test_non_finite_becomes_zero() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(to_decimal(f64::INFINITY), Decimal::ZERO);
        assert_eq!(to_decimal(f64::NEG_INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_money_eq_tolerance() {
        assert!(money_eq(100.0, 100.0));
        assert!(money_eq(100.004, 100.006));
        assert!(!money_eq(100.0, 100.02));
    }
}
