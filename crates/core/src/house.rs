//! Fixed-odds counterparty that resolves stakes into payouts.
//!
//! Each call to [`House::resolve`] is an independent trial: one uniform draw
//! over `1..=OUTCOME_RANGE`, split into three contiguous sub-ranges sized by
//! the win probability, the tie probability and the remainder.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use rust_decimal_macros::dec;
//! use wager_sim_core::House;
//!
//! let house = House::new(1.0, 0.0, dec!(1)).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! assert_eq!(house.resolve(dec!(100), &mut rng), dec!(200));
//! ```

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Size of the integer range a single outcome is drawn from.
pub const OUTCOME_RANGE: u32 = 1_000_000;

/// Slack allowed when checking `win + tie <= 1` so that decimal inputs such
/// as `0.7 + 0.3` are not rejected for float rounding.
const PROBABILITY_EPSILON: f64 = 1e-9;

/// Outcome of a single settled game, seen from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// Stake returned with profit.
    Win,
    /// Stake returned, no gain or loss.
    Tie,
    /// Stake kept by the house.
    Loss,
}

impl GameOutcome {
    /// Classifies a settled game by comparing the payout against the stake.
    #[must_use]
    pub fn classify(stake: Decimal, payout: Decimal) -> Self {
        if payout > stake {
            Self::Win
        } else if payout == stake {
            Self::Tie
        } else {
            Self::Loss
        }
    }
}

/// Immutable house configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct House {
    win_rate: f64,
    tie_rate: f64,
    return_on_investment: Decimal,
    win_upper: u32,
    tie_upper: u32,
}

impl House {
    /// Creates a house with the given probabilities and payout multiplier.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either probability is outside
    /// `[0, 1]`, if they sum to more than 1, or if the ROI is not positive.
    pub fn new(win_rate: f64, tie_rate: f64, return_on_investment: Decimal) -> Result<Self> {
        check_probability("win rate", win_rate)?;
        check_probability("tie rate", tie_rate)?;
        if win_rate + tie_rate > 1.0 + PROBABILITY_EPSILON {
            return Err(SimError::ProbabilitiesExceedOne { win_rate, tie_rate });
        }
        if return_on_investment <= Decimal::ZERO {
            return Err(SimError::NonPositiveRoi(return_on_investment));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let win_upper = (f64::from(OUTCOME_RANGE) * win_rate).round() as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tie_width = (f64::from(OUTCOME_RANGE) * tie_rate).round() as u32;
        let tie_upper = win_upper.saturating_add(tie_width).min(OUTCOME_RANGE);

        Ok(Self {
            win_rate,
            tie_rate,
            return_on_investment,
            win_upper: win_upper.min(OUTCOME_RANGE),
            tie_upper,
        })
    }

    #[must_use]
    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    #[must_use]
    pub fn tie_rate(&self) -> f64 {
        self.tie_rate
    }

    /// Probability of losing the stake, `1 - win - tie`.
    #[must_use]
    pub fn loss_rate(&self) -> f64 {
        (1.0 - self.win_rate - self.tie_rate).max(0.0)
    }

    #[must_use]
    pub fn return_on_investment(&self) -> Decimal {
        self.return_on_investment
    }

    /// Draws the outcome of one game.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> GameOutcome {
        let roll = rng.gen_range(1..=OUTCOME_RANGE);
        if roll <= self.win_upper {
            GameOutcome::Win
        } else if roll <= self.tie_upper {
            GameOutcome::Tie
        } else {
            GameOutcome::Loss
        }
    }

    /// Amount the house hands back for `stake` given an outcome.
    #[must_use]
    pub fn payout(&self, stake: Decimal, outcome: GameOutcome) -> Decimal {
        match outcome {
            GameOutcome::Win => stake * (Decimal::ONE + self.return_on_investment),
            GameOutcome::Tie => stake,
            GameOutcome::Loss => Decimal::ZERO,
        }
    }

    /// Resolves one stake: `stake * (1 + roi)` on a win, `stake` on a tie,
    /// zero on a loss.
    pub fn resolve<R: Rng + ?Sized>(&self, stake: Decimal, rng: &mut R) -> Decimal {
        let outcome = self.draw(rng);
        self.payout(stake, outcome)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidProbability { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rust_decimal_macros::dec;

    // ============================================================
    // Construction
    // ============================================================

    #[test]
    fn rejects_probabilities_above_one() {
        let err = House::new(0.7, 0.4, dec!(1)).unwrap_err();
        assert!(matches!(err, SimError::ProbabilitiesExceedOne { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn accepts_probabilities_summing_to_one() {
        let house = House::new(0.7, 0.3, dec!(1)).unwrap();
        assert!(house.loss_rate() < 1e-9);
    }

    #[test]
    fn rejects_negative_and_nan_probabilities() {
        assert!(House::new(-0.1, 0.0, dec!(1)).is_err());
        assert!(House::new(0.5, f64::NAN, dec!(1)).is_err());
    }

    #[test]
    fn rejects_non_positive_roi() {
        let err = House::new(0.5, 0.0, dec!(0)).unwrap_err();
        assert_eq!(err, SimError::NonPositiveRoi(dec!(0)));
    }

    // ============================================================
    // Resolution
    // ============================================================

    #[test]
    fn certain_win_pays_stake_plus_roi() {
        let house = House::new(1.0, 0.0, dec!(2)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(house.resolve(dec!(50), &mut rng), dec!(150));
        }
    }

    #[test]
    fn certain_tie_returns_stake() {
        let house = House::new(0.0, 1.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(house.resolve(dec!(50), &mut rng), dec!(50));
        }
    }

    #[test]
    fn certain_loss_returns_nothing() {
        let house = House::new(0.0, 0.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(house.resolve(dec!(50), &mut rng), Decimal::ZERO);
        }
    }

    #[test]
    fn payout_is_always_one_of_three_values() {
        let house = House::new(0.45, 0.1, dec!(1.5)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let stake = dec!(40);
        for _ in 0..5_000 {
            let payout = house.resolve(stake, &mut rng);
            assert!(
                payout == stake * dec!(2.5) || payout == stake || payout == Decimal::ZERO,
                "unexpected payout {payout}"
            );
        }
    }

    #[test]
    fn same_seed_reproduces_outcomes() {
        let house = House::new(0.5, 0.1, dec!(1)).unwrap();
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let left: Vec<_> = (0..200).map(|_| house.draw(&mut a)).collect();
        let right: Vec<_> = (0..200).map(|_| house.draw(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn observed_win_frequency_tracks_configured_rate() {
        let house = House::new(0.6, 0.0, dec!(1)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let n = 50_000;
        let wins = (0..n)
            .filter(|_| house.draw(&mut rng) == GameOutcome::Win)
            .count();
        let freq = wins as f64 / f64::from(n);
        assert!((freq - 0.6).abs() < 0.01, "frequency was {freq}");
    }

    #[test]
    fn classify_compares_payout_against_stake() {
        assert_eq!(GameOutcome::classify(dec!(10), dec!(20)), GameOutcome::Win);
        assert_eq!(GameOutcome::classify(dec!(10), dec!(10)), GameOutcome::Tie);
        assert_eq!(GameOutcome::classify(dec!(10), dec!(0)), GameOutcome::Loss);
    }
}
