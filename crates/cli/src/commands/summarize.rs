//! Recomputes stats tables from persisted player states without simulating.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use tracing::{info, warn};

use wager_sim_core::PolicyKind;
use wager_sim_data::{PlayerStore, StatsWriter};
use wager_sim_engine::{GroupKey, RateKey};

use super::{export_group, load_config, print_reports, results_dir, GroupReport, OutputFormat};

/// Arguments for the summarize command.
#[derive(Args, Debug, Clone, Default)]
pub struct SummarizeArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Sim.toml")]
    pub config: String,

    /// Config profile overlay
    #[arg(long)]
    pub profile: Option<String>,

    /// Policy to summarize (repeatable); defaults to the configured policies
    #[arg(long = "policy")]
    pub policies: Vec<PolicyKind>,

    /// Return on investment to summarize (repeatable); defaults to the configured ROIs
    #[arg(long = "roi")]
    pub rois: Vec<Decimal>,

    /// Results directory holding persisted players
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Loads, summarises and exports every requested group that has persisted
/// players. Groups with nothing on disk are skipped.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a player file is
/// unreadable or an export fails.
pub fn summarize_persisted(args: &SummarizeArgs) -> Result<Vec<GroupReport>> {
    let config = load_config(&args.config, args.profile.as_deref())?;
    let dir = results_dir(&config, args.output_dir.as_deref());

    let policies = if args.policies.is_empty() {
        config.policies.enabled.clone()
    } else {
        args.policies.clone()
    };
    let rois = if args.rois.is_empty() {
        config.simulation.rois.clone()
    } else {
        args.rois.clone()
    };
    let rates: Vec<RateKey> = config
        .win_rates
        .distinct_rates()
        .into_iter()
        .map(RateKey::from_rate)
        .collect();

    let store = PlayerStore::new(&dir);
    let writer = StatsWriter::new(&dir);
    let mut reports = Vec::new();

    for &policy in &policies {
        for &roi in &rois {
            let key = GroupKey::new(policy, roi);
            let buckets = store
                .load_buckets(&key, &rates)
                .with_context(|| format!("Failed to load players for {policy} roi {roi}"))?;
            if buckets.is_empty() {
                warn!(%policy, %roi, dir = %dir.display(), "No persisted players");
                continue;
            }
            reports.push(export_group(&writer, key, &buckets, config.policies.pnl_convention)?);
        }
    }

    info!(groups = reports.len(), "Summaries recomputed");
    Ok(reports)
}

/// Run the summarize command.
pub fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let reports = summarize_persisted(&args)?;
    print_reports(&reports, args.format)
}
