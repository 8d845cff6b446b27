//! Summary statistics over decimal series.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Decimal places kept in reported statistics.
pub const STAT_PRECISION: u32 = 4;

/// Size, extremes, spread and centre of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub sample_size: usize,
    pub min: Decimal,
    pub max: Decimal,
    /// Population standard deviation.
    pub std: Decimal,
    pub mean: Decimal,
}

impl StatBlock {
    /// Summarises `values`, rounding every statistic to [`STAT_PRECISION`]
    /// places (half to even) with trailing zeros dropped.
    #[must_use]
    pub fn from_values(values: &[Decimal]) -> Self {
        if values.is_empty() {
            return Self::empty();
        }

        let n = values.len();
        let mut min = values[0];
        let mut max = values[0];
        for &value in &values[1..] {
            min = min.min(value);
            max = max.max(value);
        }

        if min == max {
            return Self {
                sample_size: n,
                min: round(min),
                max: round(max),
                std: Decimal::ZERO,
                mean: round(min),
            };
        }

        let count = Decimal::from(n);
        let mean = values.iter().copied().sum::<Decimal>() / count;
        let variance = values
            .iter()
            .map(|&x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<Decimal>()
            / count;

        Self {
            sample_size: n,
            min: round(min),
            max: round(max),
            std: round(decimal_sqrt(variance)),
            mean: round(mean),
        }
    }

    /// Summarises an integer series such as game counts.
    #[must_use]
    pub fn from_counts(values: &[u64]) -> Self {
        let values: Vec<Decimal> = values.iter().map(|&v| Decimal::from(v)).collect();
        Self::from_values(&values)
    }

    /// All-zero block for an empty series.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sample_size: 0,
            min: Decimal::ZERO,
            max: Decimal::ZERO,
            std: Decimal::ZERO,
            mean: Decimal::ZERO,
        }
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp(STAT_PRECISION).normalize()
}

/// Approximates square root for Decimal using Newton-Raphson method.
pub(crate) fn decimal_sqrt(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut guess = if x > Decimal::ONE { x / dec!(2) } else { Decimal::ONE };

    for _ in 0..100 {
        let next = (guess + x / guess) / dec!(2);
        if (next - guess).abs() < dec!(0.000000001) {
            return next;
        }
        guess = next;
    }

    guess
}
