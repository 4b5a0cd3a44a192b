//! American odds → implied probability.
//!
//! Probabilities are raw bookmaker-implied values; no vig is removed.

use crate::error::{AppError, Result};

/// `+odds` → `100 / (odds + 100)`, `-odds` → `|odds| / (|odds| + 100)`.
///
/// Zero has no meaning in American notation and is rejected.
pub fn implied_probability(odds: i32) -> Result<f64> {
    if odds == 0 {
        return Err(AppError::InvalidOdds(odds));
    }
    let magnitude = f64::from(odds.unsigned_abs());
    if odds > 0 {
        Ok(100.0 / (magnitude + 100.0))
    } else {
        Ok(magnitude / (magnitude + 100.0))
    }
}

/// Rounds to 3 decimal places, the precision edges and projections are reported at.
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn even_money_is_one_half_on_both_sides() {
        assert!(close(implied_probability(100).unwrap(), 0.5));
        assert!(close(implied_probability(-100).unwrap(), 0.5));
    }

    #[test]
    fn positive_odds_use_underdog_formula() {
        for odds in [1, 50, 120, 250, 1000, 25_000] {
            let p = implied_probability(odds).unwrap();
            assert!(close(p, 100.0 / (odds as f64 + 100.0)), "odds={odds}");
            assert!(p > 0.0 && p < 1.0, "odds={odds} p={p}");
        }
    }

    #[test]
    fn negative_odds_use_favourite_formula() {
        for odds in [-1, -50, -110, -140, -1000, -25_000] {
            let abs = (odds as f64).abs();
            let p = implied_probability(odds).unwrap();
            assert!(close(p, abs / (abs + 100.0)), "odds={odds}");
            assert!(p > 0.0 && p < 1.0, "odds={odds} p={p}");
        }
    }

    #[test]
    fn known_prices() {
        assert!((implied_probability(-110).unwrap() - 0.5238).abs() < 1e-4);
        assert!((implied_probability(250).unwrap() - 0.2857).abs() < 1e-4);
        assert!((implied_probability(120).unwrap() - 0.4545).abs() < 1e-4);
    }

    #[test]
    fn zero_is_invalid() {
        assert!(matches!(implied_probability(0), Err(AppError::InvalidOdds(0))));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let p = implied_probability(i32::MIN).unwrap();
        assert!(p > 0.999 && p < 1.0);
        let p = implied_probability(i32::MAX).unwrap();
        assert!(p > 0.0 && p < 1e-6);
    }

    #[test]
    fn round3_rounds_half_away_from_zero() {
        assert_eq!(round3(0.0643), 0.064);
        assert_eq!(round3(0.0646), 0.065);
        assert_eq!(round3(0.35), 0.35);
    }
}
