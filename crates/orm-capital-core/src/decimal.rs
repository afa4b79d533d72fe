//! Fixed-point decimal kernel shared by every calculation module (§4.1).
//!
//! All money and ratio values flow through [`rust_decimal::Decimal`] — never
//! `f64` — so results are reproducible bit-for-bit across platforms. Rounding
//! follows banker's rounding (round-half-to-even), matching RBI's published
//! worked examples.

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use crate::error::OrmError;
use crate::types::{Money, Rate};

/// Round a money amount to 2 decimal places using round-half-to-even.
pub fn round_money(value: Decimal) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Round a ratio/rate to 4 decimal places using round-half-to-even.
pub fn round_rate(value: Decimal) -> Rate {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven)
}

/// Divide `numerator` by `denominator`, raising a domain error instead of
/// producing `NaN`/`Infinity` when the denominator is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal, context: &str) -> Result<Decimal, OrmError> {
    if denominator.is_zero() {
        return Err(OrmError::DivisionByZero {
            context: context.to_string(),
        });
    }
    Ok(numerator / denominator)
}

/// Natural log via `rust_decimal`'s extended-precision `maths` feature.
///
/// Used by the ILM formula `ln(e - 1 + LC/BIC)`. The argument is always
/// strictly positive once BIC has been validated to be positive, but we
/// guard anyway since a zero/negative argument would otherwise panic deep
/// inside the `maths` feature's Taylor expansion.
pub fn checked_ln(value: Decimal, context: &str) -> Result<Decimal, OrmError> {
    if value <= Decimal::ZERO {
        return Err(OrmError::InvalidInput {
            field: context.to_string(),
            reason: format!("ln() argument must be positive, got {value}"),
        });
    }
    value.ln().map_err(|_| OrmError::ConvergenceFailure {
        function: format!("ln({context})"),
        iterations: 0,
        last_delta: value,
    })
}

/// Mean of a slice of decimals. Returns `None` for an empty slice.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(sum / Decimal::from(values.len() as u64))
}

/// Population standard deviation. Returns `None` for an empty slice; `Some(0)`
/// for a single-element slice. Used by the analytics engine's sensitivity
/// volatility metric (§4.10) — not precision-critical, so the square root is
/// taken via `f64` and converted back.
pub fn stdev(values: &[Decimal]) -> Option<Decimal> {
    let avg = mean(values)?;
    let variance = mean(&values.iter().map(|v| (*v - avg) * (*v - avg)).collect::<Vec<_>>())?;
    let variance_f64: f64 = variance.try_into().unwrap_or(0.0);
    Decimal::try_from(variance_f64.sqrt()).ok()
}

/// Sample a percentile from a slice of decimals using nearest-rank
/// interpolation. `q` is in `[0, 1]`. Returns `None` for an empty slice.
pub fn percentile(values: &[Decimal], q: Decimal) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let q_clamped = q.max(Decimal::ZERO).min(Decimal::ONE);
    let rank = (q_clamped * Decimal::from(sorted.len() - 1))
        .round()
        .to_string()
        .parse::<usize>()
        .unwrap_or(0);
    sorted.get(rank.min(sorted.len() - 1)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round_money(dec!(2.125)), dec!(2.12));
        assert_eq!(round_money(dec!(2.135)), dec!(2.14));
    }

    #[test]
    fn safe_div_rejects_zero_denominator() {
        let err = safe_div(dec!(10), Decimal::ZERO, "bic/ilm").unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn checked_ln_rejects_non_positive() {
        assert!(checked_ln(Decimal::ZERO, "ilm").is_err());
        assert!(checked_ln(dec!(-1), "ilm").is_err());
        assert!(checked_ln(dec!(1), "ilm").is_ok());
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[dec!(1), dec!(2), dec!(3)]), Some(dec!(2)));
    }

    #[test]
    fn stdev_of_constant_series_is_zero() {
        assert_eq!(stdev(&[dec!(5), dec!(5), dec!(5)]), Some(dec!(0)));
    }

    #[test]
    fn percentile_picks_nearest_rank() {
        let values = vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)];
        assert_eq!(percentile(&values, dec!(0)), Some(dec!(1)));
        assert_eq!(percentile(&values, dec!(1)), Some(dec!(5)));
        assert_eq!(percentile(&values, dec!(0.5)), Some(dec!(3)));
    }
}
