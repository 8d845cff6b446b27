//! Parallel sweep over win rates and ROIs.
//!
//! Every session is an independent task: it owns its player, a house built
//! for its `(win rate, tie rate, roi)` point and its own `ChaCha8Rng`. Session
//! seeds are drawn from a master generator in task order before the tasks are
//! handed to rayon, so a seeded sweep gives the same states whatever the
//! thread count. The only synchronisation point is the final collect.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use wager_sim_core::StakingPolicy;
//! use wager_sim_engine::sweep::{master_rng, SweepDriver, SweepPlan};
//!
//! let plan = SweepPlan {
//!     initial_budget: dec!(10000),
//!     win_rates: vec![0.5, 0.6],
//!     tie_rate: 0.0,
//!     games_per_session: 50,
//!     sessions_per_rate: 4,
//!     track_trajectories: false,
//! };
//! let driver = SweepDriver::new(plan);
//! let buckets = driver
//!     .sweep(&StakingPolicy::flat_stake(), &[dec!(1)], &mut master_rng(Some(7)))
//!     .unwrap();
//! assert_eq!(buckets.len(), 2);
//! ```

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use wager_sim_core::{
    House, Player, SessionEnd, SessionReport, SessionRunner, SimConfig, SimError, StakingPolicy,
};

use crate::context::{AggregationContext, GroupKey, RateBuckets, TrajectoryBuckets};
use crate::rate::RateKey;

/// Errors from running sweeps.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration or staking fault from the simulation core.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The dedicated worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// What to run at every sweep point.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    pub initial_budget: Decimal,
    /// Win rates to visit; a rate listed twice gets twice the sessions.
    pub win_rates: Vec<f64>,
    pub tie_rate: f64,
    pub games_per_session: u64,
    /// Sessions per listed win rate.
    pub sessions_per_rate: usize,
    pub track_trajectories: bool,
}

impl SweepPlan {
    #[must_use]
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            initial_budget: config.simulation.initial_budget,
            win_rates: config.win_rates.rates(),
            tie_rate: config.simulation.tie_rate,
            games_per_session: config.simulation.games_per_session,
            sessions_per_rate: config.simulation.sessions_per_rate,
            track_trajectories: config.simulation.track_trajectories,
        }
    }

    /// Sessions run for one roi.
    #[must_use]
    pub fn sessions_per_point(&self) -> usize {
        self.win_rates.len() * self.sessions_per_rate
    }
}

/// Terminal states of one sweep point, grouped by win rate.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub states: RateBuckets,
    /// Empty unless the plan tracks trajectories.
    pub trajectories: TrajectoryBuckets,
    pub sessions: usize,
    /// Sessions that ended broke rather than out of games.
    pub broke: usize,
}

impl SweepOutcome {
    fn push(&mut self, rate: RateKey, report: SessionReport) {
        self.sessions += 1;
        if report.end == SessionEnd::Broke {
            self.broke += 1;
        }
        if let Some(trajectory) = report.trajectory {
            self.trajectories.entry(rate).or_default().push(trajectory);
        }
        self.states.entry(rate).or_default().push(report.state);
    }

    fn merge(&mut self, other: SweepOutcome) {
        self.sessions += other.sessions;
        self.broke += other.broke;
        for (rate, states) in other.states {
            self.states.entry(rate).or_default().extend(states);
        }
        for (rate, trajectories) in other.trajectories {
            self.trajectories.entry(rate).or_default().extend(trajectories);
        }
    }
}

/// Master generator for session seeds; entropy-seeded when `seed` is `None`.
#[must_use]
pub fn master_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

struct SessionTask<'a> {
    rate: RateKey,
    house: &'a House,
    seed: u64,
}

/// Runs sweep points in parallel.
pub struct SweepDriver {
    plan: SweepPlan,
    pool: Option<rayon::ThreadPool>,
}

impl SweepDriver {
    /// Creates a driver that runs on rayon's global pool.
    #[must_use]
    pub fn new(plan: SweepPlan) -> Self {
        Self { plan, pool: None }
    }

    /// Runs on a dedicated pool of `threads` workers instead.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ThreadPool`] if the pool cannot be built.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sweep-{i}"))
            .build()?;
        self.pool = Some(pool);
        Ok(self)
    }

    #[must_use]
    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    /// Runs every planned win rate at one `roi`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a house or player cannot be built,
    /// or the first stake violation raised by any session.
    pub fn run_point(
        &self,
        policy: &StakingPolicy,
        roi: Decimal,
        master: &mut ChaCha8Rng,
    ) -> Result<SweepOutcome, EngineError> {
        let plan = &self.plan;
        Player::new(*policy, plan.initial_budget)?;

        let houses = plan
            .win_rates
            .iter()
            .map(|&rate| Ok((RateKey::from_rate(rate), House::new(rate, plan.tie_rate, roi)?)))
            .collect::<Result<Vec<_>, SimError>>()?;

        let mut tasks = Vec::with_capacity(plan.sessions_per_point());
        for (rate, house) in &houses {
            for _ in 0..plan.sessions_per_rate {
                tasks.push(SessionTask {
                    rate: *rate,
                    house,
                    seed: master.gen(),
                });
            }
        }

        let runner = SessionRunner::new(plan.games_per_session).with_trajectory(plan.track_trajectories);
        let started = Instant::now();
        let reports = self.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let player = Player::new(*policy, plan.initial_budget)?;
                    let mut rng = ChaCha8Rng::seed_from_u64(task.seed);
                    let report = runner.run(player, task.house, &mut rng)?;
                    Ok((task.rate, report))
                })
                .collect::<Result<Vec<_>, SimError>>()
        })?;

        let mut outcome = SweepOutcome::default();
        for (rate, report) in reports {
            outcome.push(rate, report);
        }
        debug!(
            policy = %policy.kind(),
            %roi,
            sessions = outcome.sessions,
            broke = outcome.broke,
            elapsed_ms = started.elapsed().as_millis(),
            "sweep point finished"
        );
        Ok(outcome)
    }

    /// Runs every roi and groups all states by win rate alone.
    ///
    /// # Errors
    ///
    /// See [`SweepDriver::run_point`].
    pub fn sweep(
        &self,
        policy: &StakingPolicy,
        rois: &[Decimal],
        master: &mut ChaCha8Rng,
    ) -> Result<RateBuckets, EngineError> {
        let mut merged = SweepOutcome::default();
        for &roi in rois {
            merged.merge(self.run_point(policy, roi, master)?);
        }
        Ok(merged.states)
    }

    /// Runs every roi, absorbing each point into `ctx` under `(policy, roi)`.
    ///
    /// # Errors
    ///
    /// See [`SweepDriver::run_point`].
    pub fn run_into(
        &self,
        policy: &StakingPolicy,
        rois: &[Decimal],
        master: &mut ChaCha8Rng,
        ctx: &mut AggregationContext,
    ) -> Result<(), EngineError> {
        for &roi in rois {
            let outcome = self.run_point(policy, roi, master)?;
            ctx.absorb(GroupKey::new(policy.kind(), roi), outcome);
        }
        Ok(())
    }

    fn install<T, F>(&self, f: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}
