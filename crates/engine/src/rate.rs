//! Ordered key for win-rate buckets.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A win rate stored in basis points so it can key ordered maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateKey(u32);

impl RateKey {
    const SCALE: f64 = 10_000.0;

    /// Buckets a probability, rounding to the nearest basis point.
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bp = (rate.clamp(0.0, 1.0) * Self::SCALE).round() as u32;
        Self(bp)
    }

    #[must_use]
    pub fn from_basis_points(bp: u32) -> Self {
        Self(bp)
    }

    #[must_use]
    pub fn basis_points(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / Self::SCALE
    }

    #[must_use]
    pub fn as_decimal(self) -> Decimal {
        Decimal::new(i64::from(self.0), 4).normalize()
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_noise_lands_in_same_bucket() {
        assert_eq!(RateKey::from_rate(0.5 + 0.07), RateKey::from_rate(0.57));
        assert_eq!(RateKey::from_rate(0.57).basis_points(), 5700);
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(RateKey::from_rate(0.5).to_string(), "0.5");
        assert_eq!(RateKey::from_rate(0.55).to_string(), "0.55");
        assert_eq!(RateKey::from_rate(0.5525).to_string(), "0.5525");
    }

    #[test]
    fn keys_order_by_rate() {
        let mut keys = vec![RateKey::from_rate(0.7), RateKey::from_rate(0.51), RateKey::from_rate(0.6)];
        keys.sort();
        assert_eq!(keys[0], RateKey::from_rate(0.51));
        assert!((keys[2].as_f64() - 0.7).abs() < 1e-12);
    }
}
