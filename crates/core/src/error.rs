//! Error types for the simulation core.
//!
//! Everything except [`SimError::StakeViolation`] is a configuration error and
//! is raised before any session runs.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while configuring or running a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Win and tie probabilities together exceed certainty.
    #[error("win rate {win_rate} + tie rate {tie_rate} cannot exceed 1")]
    ProbabilitiesExceedOne {
        /// Configured win probability.
        win_rate: f64,
        /// Configured tie probability.
        tie_rate: f64,
    },

    /// A probability outside `[0, 1]` or not finite.
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability {
        /// Which probability was rejected.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Initial budget of zero or less.
    #[error("initial budget must be positive, got {0}")]
    NonPositiveBudget(Decimal),

    /// Return on investment of zero or less.
    #[error("return on investment must be positive, got {0}")]
    NonPositiveRoi(Decimal),

    /// A staking policy constant is out of range.
    #[error("invalid policy parameter {name}: {reason}")]
    InvalidPolicyParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Any other invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A staking policy produced a stake it is not allowed to place.
    #[error("stake violation: stake {stake} against balance {balance}")]
    StakeViolation {
        /// The offending stake.
        stake: Decimal,
        /// Balance at the time of the bet.
        balance: Decimal,
    },
}

impl SimError {
    /// Returns true for errors that stem from configuration rather than a
    /// staking logic fault.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::StakeViolation { .. })
    }
}

/// Result alias for simulation-core operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stake_violation_is_not_configuration() {
        let err = SimError::StakeViolation {
            stake: dec!(10),
            balance: dec!(5),
        };
        assert!(!err.is_configuration());
        assert!(SimError::NonPositiveBudget(dec!(0)).is_configuration());
    }

    #[test]
    fn probabilities_error_message_names_both_rates() {
        let err = SimError::ProbabilitiesExceedOne {
            win_rate: 0.7,
            tie_rate: 0.4,
        };
        assert_eq!(err.to_string(), "win rate 0.7 + tie rate 0.4 cannot exceed 1");
    }
}
