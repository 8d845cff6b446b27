//! Repeated sweeps over every configured policy and roi.

use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use wager_sim_core::{PolicyKind, SimConfig, StakingPolicy};

use crate::context::{AggregationContext, GroupKey};
use crate::sweep::{master_rng, EngineError, SweepDriver, SweepOutcome, SweepPlan};

/// One finished `(batch, policy, roi)` point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointReport {
    /// Zero-based batch index.
    pub batch: usize,
    pub key: GroupKey,
    pub sessions: usize,
    pub broke: usize,
    pub elapsed: Duration,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTotals {
    pub points: usize,
    pub sessions: usize,
    pub broke: usize,
}

pub struct BatchRunner {
    driver: SweepDriver,
    policies: Vec<StakingPolicy>,
    rois: Vec<Decimal>,
    batches: usize,
    seed: Option<u64>,
}

impl BatchRunner {
    /// Builds a runner for every enabled policy in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker pool
    /// cannot be built.
    pub fn from_config(config: &SimConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let mut driver = SweepDriver::new(SweepPlan::from_config(config));
        if let Some(threads) = config.simulation.threads {
            driver = driver.with_threads(threads)?;
        }

        let mut kinds: Vec<PolicyKind> = Vec::with_capacity(config.policies.enabled.len());
        for kind in &config.policies.enabled {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        Ok(Self {
            driver,
            policies: kinds.into_iter().map(|k| config.policies.policy(k)).collect(),
            rois: config.simulation.rois.clone(),
            batches: config.simulation.batches,
            seed: config.simulation.seed,
        })
    }

    #[must_use]
    pub fn driver(&self) -> &SweepDriver {
        &self.driver
    }

    /// Runs every batch, absorbing each point into `ctx`.
    ///
    /// `on_point` sees every outcome before it is absorbed; returning an
    /// error stops the run.
    ///
    /// # Errors
    ///
    /// Returns the first sweep error or the first error from `on_point`.
    pub fn run<E, F>(&self, ctx: &mut AggregationContext, on_point: F) -> Result<BatchTotals, E>
    where
        E: From<EngineError>,
        F: FnMut(&PointReport, &SweepOutcome) -> Result<(), E>,
    {
        self.run_batches(ctx, on_point, |_, _| Ok(()))
    }

    /// Like [`BatchRunner::run`], and hands `ctx` to `on_batch` after each
    /// finished batch with its zero-based index.
    ///
    /// `on_batch` may flush and clear the context, which bounds memory to a
    /// single batch.
    ///
    /// # Errors
    ///
    /// Returns the first sweep error or the first callback error.
    pub fn run_batches<E, F, G>(
        &self,
        ctx: &mut AggregationContext,
        mut on_point: F,
        mut on_batch: G,
    ) -> Result<BatchTotals, E>
    where
        E: From<EngineError>,
        F: FnMut(&PointReport, &SweepOutcome) -> Result<(), E>,
        G: FnMut(usize, &mut AggregationContext) -> Result<(), E>,
    {
        let mut master = master_rng(self.seed);
        let mut totals = BatchTotals::default();

        for batch in 0..self.batches {
            let started_at = Utc::now();
            let clock = Instant::now();
            info!(
                "Batch {}/{} started at {}",
                batch + 1,
                self.batches,
                started_at.format("%Y-%m-%d %H:%M:%S")
            );

            for policy in &self.policies {
                for &roi in &self.rois {
                    let point_clock = Instant::now();
                    let outcome = self.driver.run_point(policy, roi, &mut master)?;
                    let report = PointReport {
                        batch,
                        key: GroupKey::new(policy.kind(), roi),
                        sessions: outcome.sessions,
                        broke: outcome.broke,
                        elapsed: point_clock.elapsed(),
                    };
                    debug!(
                        batch,
                        policy = %report.key.policy,
                        roi = %report.key.roi,
                        sessions = report.sessions,
                        broke = report.broke,
                        "point complete"
                    );

                    on_point(&report, &outcome)?;

                    totals.points += 1;
                    totals.sessions += report.sessions;
                    totals.broke += report.broke;
                    ctx.absorb(report.key, outcome);
                }
            }

            info!("Batch {} finished in {:.2?}", batch + 1, clock.elapsed());
            on_batch(batch, ctx)?;
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wager_sim_core::WinRateGrid;

    use crate::rate::RateKey;

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.simulation.initial_budget = dec!(10000);
        config.simulation.rois = vec![dec!(1), dec!(2)];
        config.simulation.games_per_session = 50;
        config.simulation.sessions_per_rate = 3;
        config.simulation.batches = 2;
        config.simulation.seed = Some(42);
        config.win_rates = WinRateGrid {
            start: 0.5,
            step: 0.1,
            steps: 2,
            repeat: 1,
        };
        config
    }

    #[test]
    fn runs_every_batch_policy_and_roi() {
        let runner = BatchRunner::from_config(&small_config()).unwrap();
        let mut ctx = AggregationContext::new();
        let mut seen = Vec::new();
        let totals = runner
            .run::<EngineError, _>(&mut ctx, |report, _| {
                seen.push((report.batch, report.key));
                Ok(())
            })
            .unwrap();

        // 2 batches x 3 policies x 2 rois
        assert_eq!(totals.points, 12);
        assert_eq!(seen.len(), 12);
        // 2 rates x 3 sessions per point
        assert_eq!(totals.sessions, 72);
        assert_eq!(ctx.session_count(), 72);
        assert_eq!(ctx.groups().count(), 6);

        let key = GroupKey::new(PolicyKind::Martingale, dec!(2));
        assert_eq!(ctx.states(&key, RateKey::from_rate(0.6)).len(), 6);
    }

    #[test]
    fn callback_error_stops_run() {
        let runner = BatchRunner::from_config(&small_config()).unwrap();
        let mut ctx = AggregationContext::new();
        let mut calls = 0;
        let result = runner.run::<anyhow::Error, _>(&mut ctx, |_, _| {
            calls += 1;
            if calls == 2 {
                anyhow::bail!("stop");
            }
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(calls, 2);
        // only the first point was absorbed
        assert_eq!(ctx.session_count(), 6);
    }

    #[test]
    fn batch_hook_can_flush_between_batches() {
        let runner = BatchRunner::from_config(&small_config()).unwrap();
        let mut ctx = AggregationContext::new();
        let mut flushed = Vec::new();
        let mut flat_stake_batches = Vec::new();
        let totals = runner
            .run_batches::<EngineError, _, _>(
                &mut ctx,
                |report, _| {
                    if report.key == GroupKey::new(PolicyKind::FlatStake, dec!(1)) {
                        flat_stake_batches.push(report.batch);
                    }
                    Ok(())
                },
                |batch, ctx| {
                    flushed.push((batch, ctx.session_count()));
                    ctx.clear();
                    Ok(())
                },
            )
            .unwrap();

        // 3 policies x 2 rois x 2 rates x 3 sessions per batch
        assert_eq!(flushed, vec![(0, 36), (1, 36)]);
        assert_eq!(flat_stake_batches, vec![0, 1]);
        assert_eq!(totals.sessions, 72);
        assert!(ctx.is_empty());
    }

    #[test]
    fn batch_hook_error_stops_before_next_batch() {
        let runner = BatchRunner::from_config(&small_config()).unwrap();
        let mut ctx = AggregationContext::new();
        let mut points = 0;
        let result = runner.run_batches::<anyhow::Error, _, _>(
            &mut ctx,
            |_, _| {
                points += 1;
                Ok(())
            },
            |_, _| Err(anyhow::anyhow!("disk full")),
        );

        assert!(result.is_err());
        assert_eq!(points, 6);
        assert_eq!(ctx.session_count(), 36);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = small_config();
        let mut a = AggregationContext::new();
        let mut b = AggregationContext::new();
        BatchRunner::from_config(&config)
            .unwrap()
            .run::<EngineError, _>(&mut a, |_, _| Ok(()))
            .unwrap();
        BatchRunner::from_config(&config)
            .unwrap()
            .run::<EngineError, _>(&mut b, |_, _| Ok(()))
            .unwrap();

        let key = GroupKey::new(PolicyKind::MartingaleStopLoss, dec!(1));
        let rate = RateKey::from_rate(0.5);
        assert_eq!(a.states(&key, rate), b.states(&key, rate));
    }

    #[test]
    fn only_enabled_policies_run() {
        let mut config = small_config();
        config.policies.enabled = vec![PolicyKind::FlatStake, PolicyKind::FlatStake];
        let runner = BatchRunner::from_config(&config).unwrap();
        let mut ctx = AggregationContext::new();
        let totals = runner.run::<EngineError, _>(&mut ctx, |_, _| Ok(())).unwrap();
        assert_eq!(totals.points, 4);
        assert!(ctx.groups().all(|(key, _)| key.policy == PolicyKind::FlatStake));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = small_config();
        config.simulation.rois.clear();
        assert!(BatchRunner::from_config(&config).is_err());
    }
}
