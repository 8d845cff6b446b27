//! Sweep CLI command.
//!
//! Runs every enabled policy over the configured win-rate grid and ROIs,
//! persists the terminal states after every batch, exports one stats table
//! per group and prints the report.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use tracing::info;

use wager_sim_core::{PolicyKind, SimConfig};
use wager_sim_data::{PlayerStore, StatsWriter};
use wager_sim_engine::{
    summarize_trajectories, AggregationContext, BatchRunner, GroupKey, RateKey, TrajectoryBuckets,
};

use super::{export_group, load_config, print_reports, GroupReport, OutputFormat};

/// Arguments for the sweep command.
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Sim.toml")]
    pub config: String,

    /// Config profile overlay (reads <stem>.<profile>.toml next to the config)
    #[arg(long)]
    pub profile: Option<String>,

    /// Policy to run (repeatable); defaults to the configured policies
    #[arg(long = "policy")]
    pub policies: Vec<PolicyKind>,

    /// Return on investment to run (repeatable); defaults to the configured ROIs
    #[arg(long = "roi")]
    pub rois: Vec<Decimal>,

    /// Full passes over the grid
    #[arg(long)]
    pub batches: Option<usize>,

    /// Sessions per listed win rate
    #[arg(long)]
    pub sessions: Option<usize>,

    /// Games per session
    #[arg(long)]
    pub games: Option<u64>,

    /// Master seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Results directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Do not persist or merge player states
    #[arg(long)]
    pub no_persist: bool,

    /// Record balance trajectories and export per-game statistics
    #[arg(long)]
    pub trajectories: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl SweepArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut SimConfig) {
        let sim = &mut config.simulation;
        if !self.policies.is_empty() {
            config.policies.enabled.clone_from(&self.policies);
        }
        if !self.rois.is_empty() {
            sim.rois.clone_from(&self.rois);
        }
        if let Some(batches) = self.batches {
            sim.batches = batches;
        }
        if let Some(sessions) = self.sessions {
            sim.sessions_per_rate = sessions;
        }
        if let Some(games) = self.games {
            sim.games_per_session = games;
        }
        if self.seed.is_some() {
            sim.seed = self.seed;
        }
        if self.threads.is_some() {
            sim.threads = self.threads;
        }
        if self.trajectories {
            sim.track_trajectories = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.results_dir.clone_from(dir);
        }
        if self.no_persist {
            config.output.persist_players = false;
        }
    }
}

/// Runs all batches, persists and exports; returns one report per group.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a session raises a
/// stake violation or persistence/export fails.
pub fn sweep_and_export(args: &SweepArgs) -> Result<Vec<GroupReport>> {
    let mut config = load_config(&args.config, args.profile.as_deref())?;
    args.apply(&mut config);
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;

    let sim = &config.simulation;
    info!(
        policies = ?config.policies.enabled,
        rois = ?sim.rois,
        rates = config.win_rates.steps,
        repeat = config.win_rates.repeat,
        sessions_per_rate = sim.sessions_per_rate,
        games = sim.games_per_session,
        batches = sim.batches,
        seed = ?sim.seed,
        "Starting sweep"
    );

    let runner = BatchRunner::from_config(&config)?;
    let results_dir = config.output.results_dir.clone();
    let persist = config.output.persist_players;
    let store = PlayerStore::new(&results_dir);

    // with persistence on, each batch is flushed to disk and dropped, so
    // only the cells it touched and the opt-in trajectories outlive it
    let mut ctx = AggregationContext::new();
    let mut cells: BTreeMap<GroupKey, BTreeSet<RateKey>> = BTreeMap::new();
    let mut trajectories: BTreeMap<GroupKey, TrajectoryBuckets> = BTreeMap::new();

    let totals = runner.run_batches::<anyhow::Error, _, _>(
        &mut ctx,
        |report, _| {
            info!(
                batch = report.batch + 1,
                policy = %report.key.policy,
                roi = %report.key.roi,
                sessions = report.sessions,
                broke = report.broke,
                elapsed = ?report.elapsed,
                "Point finished"
            );
            Ok(())
        },
        |batch, ctx| {
            if !persist {
                return Ok(());
            }
            for (key, buckets) in ctx.groups() {
                cells.entry(*key).or_default().extend(buckets.keys().copied());
            }
            store
                .append_context(ctx)
                .with_context(|| format!("Failed to persist player states of batch {}", batch + 1))?;
            merge_trajectories(&mut trajectories, ctx.take_trajectories());
            ctx.clear();
            Ok(())
        },
    )?;
    info!(
        points = totals.points,
        sessions = totals.sessions,
        broke = totals.broke,
        "Sweep complete"
    );

    let writer = StatsWriter::new(&results_dir);
    let convention = config.policies.pnl_convention;
    let mut reports = Vec::new();

    if persist {
        for (key, rates) in &cells {
            let rates: Vec<RateKey> = rates.iter().copied().collect();
            let merged = store
                .load_buckets(key, &rates)
                .context("Failed to reload merged player states")?;
            reports.push(export_group(&writer, *key, &merged, convention)?);
        }
    } else {
        for (key, buckets) in ctx.groups() {
            reports.push(export_group(&writer, *key, buckets, convention)?);
        }
    }

    merge_trajectories(&mut trajectories, ctx.take_trajectories());
    for (key, buckets) in &trajectories {
        for (rate, balances) in buckets {
            writer
                .write_trajectory(key, *rate, &summarize_trajectories(balances))
                .context("Failed to export trajectory statistics")?;
        }
    }

    Ok(reports)
}

fn merge_trajectories(
    into: &mut BTreeMap<GroupKey, TrajectoryBuckets>,
    from: BTreeMap<GroupKey, TrajectoryBuckets>,
) {
    for (key, buckets) in from {
        let merged = into.entry(key).or_default();
        for (rate, runs) in buckets {
            merged.entry(rate).or_default().extend(runs);
        }
    }
}

/// Run the sweep command.
pub fn run_sweep(args: SweepArgs) -> Result<()> {
    let reports = sweep_and_export(&args)?;
    print_reports(&reports, args.format)
}
