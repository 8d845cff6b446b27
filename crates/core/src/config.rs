//! Simulation configuration.
//!
//! Each policy carries its own stake constants under `[policies.<slug>]`.
//! The PnL sign convention is a single named setting,
//! `policies.pnl_convention`, shared by every policy: all summaries of one
//! run report PnL the same way, so groups stay comparable side by side.
//! It defaults to [`PnlConvention::ProfitRelative`].

use std::path::PathBuf;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::house::House;
use crate::staking::{
    PolicyKind, StakeParams, StakingPolicy, STOP_LOSS_RATIO,
};
use crate::state::{PlayerState, PnlConvention};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub win_rates: WinRateGrid,
    pub policies: PoliciesConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_budget: Decimal,
    pub tie_rate: f64,
    pub rois: Vec<Decimal>,
    pub games_per_session: u64,
    /// Sessions run for every occurrence of a rate in the grid.
    pub sessions_per_rate: usize,
    /// Full passes over the grid; each pass is absorbed into the same context.
    pub batches: usize,
    pub seed: Option<u64>,
    /// Worker threads; `None` uses the global pool.
    pub threads: Option<usize>,
    pub track_trajectories: bool,
}

/// Win rates `start, start + step, ...` (`steps` values), each listed `repeat` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRateGrid {
    pub start: f64,
    pub step: f64,
    pub steps: usize,
    pub repeat: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliciesConfig {
    pub enabled: Vec<PolicyKind>,
    pub flat_stake: StakeParams,
    pub martingale: StakeParams,
    pub martingale_stop_loss: StopLossParams,
    /// Applies to the summaries of every enabled policy.
    pub pnl_convention: PnlConvention,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLossParams {
    #[serde(flatten)]
    pub stake: StakeParams,
    pub stop_loss_ratio: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    pub persist_players: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_budget: dec!(1000000),
            tie_rate: 0.0,
            rois: vec![dec!(1), dec!(2), dec!(3)],
            games_per_session: 1_000,
            sessions_per_rate: 1_000,
            batches: 1,
            seed: None,
            threads: None,
            track_trajectories: false,
        }
    }
}

impl Default for WinRateGrid {
    fn default() -> Self {
        Self {
            start: 0.5,
            step: 0.01,
            steps: 30,
            repeat: 10,
        }
    }
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            enabled: PolicyKind::ALL.to_vec(),
            flat_stake: StakeParams::flat_stake(),
            martingale: StakeParams::martingale(),
            martingale_stop_loss: StopLossParams {
                stake: StakeParams::martingale(),
                stop_loss_ratio: STOP_LOSS_RATIO,
            },
            pnl_convention: PnlConvention::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            persist_players: true,
        }
    }
}

impl WinRateGrid {
    /// Distinct rates in ascending order, rounded to four decimals.
    #[must_use]
    pub fn distinct_rates(&self) -> Vec<f64> {
        (0..self.steps)
            .map(|x| {
                #[allow(clippy::cast_precision_loss)]
                let rate = self.start + self.step * x as f64;
                (rate * 10_000.0).round() / 10_000.0
            })
            .collect()
    }

    /// The full grid: every distinct rate, the whole list repeated `repeat` times.
    #[must_use]
    pub fn rates(&self) -> Vec<f64> {
        let distinct = self.distinct_rates();
        let mut rates = Vec::with_capacity(distinct.len() * self.repeat);
        for _ in 0..self.repeat {
            rates.extend_from_slice(&distinct);
        }
        rates
    }
}

impl PoliciesConfig {
    /// Builds the staking policy of `kind` from the configured constants.
    #[must_use]
    pub fn policy(&self, kind: PolicyKind) -> StakingPolicy {
        match kind {
            PolicyKind::FlatStake => StakingPolicy::FlatStake(self.flat_stake),
            PolicyKind::Martingale => StakingPolicy::Martingale(self.martingale),
            PolicyKind::MartingaleStopLoss => StakingPolicy::MartingaleStopLoss {
                stake: self.martingale_stop_loss.stake,
                stop_loss_ratio: self.martingale_stop_loss.stop_loss_ratio,
            },
        }
    }
}

impl SimConfig {
    /// Rejects any value that would make a session meaningless.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        PlayerState::new(sim.initial_budget)?;
        if sim.rois.is_empty() {
            return Err(SimError::InvalidConfig("at least one roi is required".into()));
        }
        if sim.games_per_session == 0 {
            return Err(SimError::InvalidConfig("games_per_session must be positive".into()));
        }
        if sim.sessions_per_rate == 0 {
            return Err(SimError::InvalidConfig("sessions_per_rate must be positive".into()));
        }
        if sim.batches == 0 {
            return Err(SimError::InvalidConfig("batches must be positive".into()));
        }
        if sim.threads == Some(0) {
            return Err(SimError::InvalidConfig("threads must be positive when set".into()));
        }

        let grid = &self.win_rates;
        if grid.steps == 0 || grid.repeat == 0 {
            return Err(SimError::InvalidConfig(
                "win_rates.steps and win_rates.repeat must be positive".into(),
            ));
        }
        if !(grid.step.is_finite() && grid.step >= 0.0) {
            return Err(SimError::InvalidConfig("win_rates.step must be non-negative".into()));
        }
        for rate in grid.distinct_rates() {
            for roi in &sim.rois {
                House::new(rate, sim.tie_rate, *roi)?;
            }
        }

        if self.policies.enabled.is_empty() {
            return Err(SimError::InvalidConfig("no policy enabled".into()));
        }
        for kind in PolicyKind::ALL {
            self.policies.policy(kind).validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_matches_reference_sweep() {
        let grid = WinRateGrid::default();
        let distinct = grid.distinct_rates();
        assert_eq!(distinct.len(), 30);
        assert!((distinct[0] - 0.5).abs() < f64::EPSILON);
        assert!((distinct[29] - 0.79).abs() < f64::EPSILON);
        assert!((distinct[7] - 0.57).abs() < f64::EPSILON);
        assert_eq!(grid.rates().len(), 300);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_grid_overlapping_tie_rate() {
        let mut config = SimConfig::default();
        config.simulation.tie_rate = 0.3;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimError::ProbabilitiesExceedOne { .. }));
    }

    #[test]
    fn validate_rejects_non_positive_budget() {
        let mut config = SimConfig::default();
        config.simulation.initial_budget = dec!(0);
        assert_eq!(config.validate().unwrap_err(), SimError::NonPositiveBudget(dec!(0)));
    }

    #[test]
    fn validate_rejects_empty_rois_and_zero_counts() {
        let mut config = SimConfig::default();
        config.simulation.rois.clear();
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.simulation.games_per_session = 0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.simulation.batches = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn pnl_convention_defaults_to_profit_relative() {
        assert_eq!(PoliciesConfig::default().pnl_convention, PnlConvention::ProfitRelative);
    }

    #[test]
    fn policies_use_configured_constants() {
        let mut policies = PoliciesConfig::default();
        policies.flat_stake.broke_ratio = dec!(0.9);
        match policies.policy(PolicyKind::FlatStake) {
            StakingPolicy::FlatStake(params) => assert_eq!(params.broke_ratio, dec!(0.9)),
            other => panic!("unexpected policy {other:?}"),
        }
        assert_eq!(
            policies.policy(PolicyKind::MartingaleStopLoss),
            StakingPolicy::martingale_stop_loss()
        );
    }
}
