//! CLI commands for the betting-strategy simulator.

pub mod session;
pub mod summarize;
pub mod sweep;

pub use session::{run_session, simulate_session, SessionArgs};
pub use summarize::{run_summarize, summarize_persisted, SummarizeArgs};
pub use sweep::{run_sweep, sweep_and_export, SweepArgs};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;

use wager_sim_core::{ConfigLoader, PnlConvention, PolicyKind, SimConfig};
use wager_sim_data::StatsWriter;
use wager_sim_engine::{summarize_buckets, GroupKey, RateBuckets, RateSummary, ReportFormatter};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Boxed text tables
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Summaries of one `(policy, roi)` group, as printed and exported.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub policy: PolicyKind,
    pub roi: Decimal,
    pub stats_file: Option<PathBuf>,
    pub rates: Vec<RateSummary>,
}

impl GroupReport {
    #[must_use]
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.policy, self.roi)
    }
}

pub(crate) fn load_config(path: &str, profile: Option<&str>) -> Result<SimConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile),
        None => ConfigLoader::load(path),
    }
}

/// Summarises one group's buckets and writes its stats table.
pub(crate) fn export_group(
    writer: &StatsWriter,
    key: GroupKey,
    buckets: &RateBuckets,
    convention: PnlConvention,
) -> Result<GroupReport> {
    let rates = summarize_buckets(buckets, convention);
    let stats_file = writer
        .write_stats(&key, &rates)
        .with_context(|| format!("Failed to export stats for {} roi {}", key.policy, key.roi))?;

    Ok(GroupReport {
        policy: key.policy,
        roi: key.roi,
        stats_file,
        rates,
    })
}

pub(crate) fn print_reports(reports: &[GroupReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for report in reports {
                print!("{}", ReportFormatter::format_group(&report.key(), &report.rates));
                if let Some(path) = &report.stats_file {
                    println!("Stats written to {}", path.display());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?);
        }
    }
    Ok(())
}

pub(crate) fn results_dir(config: &SimConfig, override_dir: Option<&Path>) -> PathBuf {
    override_dir.map_or_else(|| config.output.results_dir.clone(), Path::to_path_buf)
}
