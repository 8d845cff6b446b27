//! Staking policies.
//!
//! A policy decides how much to stake on the next game, optionally clamps the
//! stake with a stop-loss, and decides when a player counts as broke. The set
//! of policies is closed, so they are a tagged enum rather than a trait.
//!
//! | policy                 | base stake                        | after a loss                                   | broke at        |
//! |------------------------|-----------------------------------|------------------------------------------------|-----------------|
//! | `FlatStake`            | `min(balance * 1%, cap)`          | unchanged                                      | 50% of budget   |
//! | `Martingale`           | `min(balance * 1% / roi, cap)`    | `(cumulative + initial * roi) / roi`           | 10% of budget   |
//! | `MartingaleStopLoss`   | as `Martingale`                   | as `Martingale`, streak capped at 10% balance  | 10% of budget   |

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::state::PlayerState;

/// Ceiling on a single base stake regardless of balance.
pub const STAKE_CAP: Decimal = dec!(100000000);

/// Fraction of the balance staked when not recovering losses.
pub const BASE_STAKE_FRACTION: Decimal = dec!(0.01);

/// Flat-stake players stop at half their budget.
pub const FLAT_STAKE_BROKE_RATIO: Decimal = dec!(0.5);

/// Martingale players stop at a tenth of their budget.
pub const MARTINGALE_BROKE_RATIO: Decimal = dec!(0.1);

/// Share of the balance a stop-loss streak may commit in total.
pub const STOP_LOSS_RATIO: Decimal = dec!(0.1);

/// Identifies a staking policy independently of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    FlatStake,
    Martingale,
    MartingaleStopLoss,
}

impl PolicyKind {
    /// Every policy, in reporting order.
    pub const ALL: [Self; 3] = [Self::Martingale, Self::MartingaleStopLoss, Self::FlatStake];

    /// Human-readable player name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FlatStake => "Flat stake player",
            Self::Martingale => "Martingale system player",
            Self::MartingaleStopLoss => "Martingale system stop-loss player",
        }
    }

    /// File-system friendly identifier.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::FlatStake => "flat_stake",
            Self::Martingale => "martingale",
            Self::MartingaleStopLoss => "martingale_stop_loss",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "flat_stake" | "flat" | "steady" => Ok(Self::FlatStake),
            "martingale" => Ok(Self::Martingale),
            "martingale_stop_loss" | "stop_loss" => Ok(Self::MartingaleStopLoss),
            other => Err(SimError::InvalidConfig(format!("unknown policy: {other}"))),
        }
    }
}

/// Stake sizing constants shared by every policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeParams {
    /// Fraction of the balance staked as a base bet.
    pub base_fraction: Decimal,
    /// Upper bound on a base bet.
    pub stake_cap: Decimal,
    /// Balance, as a fraction of the initial budget, at or below which the
    /// player is broke.
    pub broke_ratio: Decimal,
}

impl StakeParams {
    #[must_use]
    pub fn new(base_fraction: Decimal, stake_cap: Decimal, broke_ratio: Decimal) -> Self {
        Self {
            base_fraction,
            stake_cap,
            broke_ratio,
        }
    }

    /// Reference constants for flat staking.
    #[must_use]
    pub fn flat_stake() -> Self {
        Self::new(BASE_STAKE_FRACTION, STAKE_CAP, FLAT_STAKE_BROKE_RATIO)
    }

    /// Reference constants for both martingale variants.
    #[must_use]
    pub fn martingale() -> Self {
        Self::new(BASE_STAKE_FRACTION, STAKE_CAP, MARTINGALE_BROKE_RATIO)
    }

    /// Checks every constant is in range.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidPolicyParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.base_fraction <= Decimal::ZERO || self.base_fraction > Decimal::ONE {
            return Err(invalid("base_fraction", "must be within (0, 1]"));
        }
        if self.stake_cap <= Decimal::ZERO {
            return Err(invalid("stake_cap", "must be positive"));
        }
        if self.broke_ratio < Decimal::ZERO || self.broke_ratio >= Decimal::ONE {
            return Err(invalid("broke_ratio", "must be within [0, 1)"));
        }
        Ok(())
    }
}

/// A staking policy together with its constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StakingPolicy {
    /// Fixed fraction of the balance, independent of history.
    FlatStake(StakeParams),
    /// Recover every loss of the streak plus the original target gain.
    Martingale(StakeParams),
    /// Martingale whose streak commitment is capped at a share of the balance.
    MartingaleStopLoss {
        stake: StakeParams,
        stop_loss_ratio: Decimal,
    },
}

impl StakingPolicy {
    #[must_use]
    pub fn flat_stake() -> Self {
        Self::FlatStake(StakeParams::flat_stake())
    }

    #[must_use]
    pub fn martingale() -> Self {
        Self::Martingale(StakeParams::martingale())
    }

    #[must_use]
    pub fn martingale_stop_loss() -> Self {
        Self::MartingaleStopLoss {
            stake: StakeParams::martingale(),
            stop_loss_ratio: STOP_LOSS_RATIO,
        }
    }

    /// Policy of the given kind with reference constants.
    #[must_use]
    pub fn for_kind(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::FlatStake => Self::flat_stake(),
            PolicyKind::Martingale => Self::martingale(),
            PolicyKind::MartingaleStopLoss => Self::martingale_stop_loss(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::FlatStake(_) => PolicyKind::FlatStake,
            Self::Martingale(_) => PolicyKind::Martingale,
            Self::MartingaleStopLoss { .. } => PolicyKind::MartingaleStopLoss,
        }
    }

    #[must_use]
    pub fn params(&self) -> &StakeParams {
        match self {
            Self::FlatStake(params) | Self::Martingale(params) => params,
            Self::MartingaleStopLoss { stake, .. } => stake,
        }
    }

    /// Checks the policy constants.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidPolicyParameter`] on the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.params().validate()?;
        if let Self::MartingaleStopLoss {
            stop_loss_ratio, ..
        } = self
        {
            if *stop_loss_ratio <= Decimal::ZERO || *stop_loss_ratio > Decimal::ONE {
                return Err(invalid("stop_loss_ratio", "must be within (0, 1]"));
            }
        }
        Ok(())
    }

    /// Stake the policy wants for the next game, before any balance or
    /// stop-loss clamp.
    #[must_use]
    pub fn required_bet(&self, state: &PlayerState, roi: Decimal) -> Decimal {
        match self {
            Self::FlatStake(params) => (state.balance * params.base_fraction).min(params.stake_cap),
            Self::Martingale(params) | Self::MartingaleStopLoss { stake: params, .. } => {
                if state.lost_last_game {
                    let required_return = state.cumulative_bet + state.streak_initial_bet * roi;
                    required_return / roi
                } else {
                    (state.balance * params.base_fraction / roi).min(params.stake_cap)
                }
            }
        }
    }

    /// Caps the total committed in the current streak.
    ///
    /// Only the stop-loss variant clamps. When the streak would exceed
    /// `stop_loss_ratio * balance`, the streak tracker is reset and the full
    /// fresh allowance is staked instead.
    pub fn apply_stop_loss(&self, state: &mut PlayerState, stake: Decimal) -> Decimal {
        match self {
            Self::FlatStake(_) | Self::Martingale(_) => stake,
            Self::MartingaleStopLoss {
                stop_loss_ratio, ..
            } => {
                let max_bet = state.balance * *stop_loss_ratio;
                if state.cumulative_bet + stake <= max_bet {
                    return stake;
                }
                state.reset_streak();
                max_bet
            }
        }
    }

    /// Whether the balance has fallen to the broke threshold.
    #[must_use]
    pub fn is_broke(&self, state: &PlayerState) -> bool {
        state.balance <= state.initial_budget * self.params().broke_ratio
    }
}

fn invalid(name: &'static str, reason: &str) -> SimError {
    SimError::InvalidPolicyParameter {
        name,
        reason: reason.to_string(),
    }
}
