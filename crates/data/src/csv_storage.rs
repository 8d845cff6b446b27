use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use tracing::{debug, warn};

use wager_sim_engine::{GroupKey, IndexSummary, RateKey, RateSummary};

use crate::error::StorageError;

/// Writes statistic tables under a results directory.
#[derive(Debug, Clone)]
pub struct StatsWriter {
    root: PathBuf,
}

impl StatsWriter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/stats/<slug>/<slug>_rate_<lo>-<hi>_roi_<roi>.csv`
    #[must_use]
    pub fn stats_path(&self, key: &GroupKey, lo: RateKey, hi: RateKey) -> PathBuf {
        let slug = key.policy.slug();
        self.root
            .join("stats")
            .join(slug)
            .join(format!("{slug}_rate_{lo}-{hi}_roi_{}.csv", key.roi))
    }

    /// `<root>/trajectories/<slug>_rate_<rate>_roi_<roi>_balances.csv`
    #[must_use]
    pub fn trajectory_path(&self, key: &GroupKey, rate: RateKey) -> PathBuf {
        let slug = key.policy.slug();
        self.root
            .join("trajectories")
            .join(format!("{slug}_rate_{rate}_roi_{}_balances.csv", key.roi))
    }

    /// Writes one row per win rate, in the order given.
    ///
    /// Format: sample_size,rate,mvdd_min,mvdd_max,mvdd_std,mvdd_mean,pnl_min,
    /// pnl_max,pnl_std,pnl_mean,doubling_interval_min,doubling_interval_max,
    /// doubling_interval_std,doubling_interval_mean
    ///
    /// Returns `None` without touching the filesystem when `summaries` is empty.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or writing fails
    pub fn write_stats(
        &self,
        key: &GroupKey,
        summaries: &[RateSummary],
    ) -> Result<Option<PathBuf>, StorageError> {
        let (Some(first), Some(last)) = (summaries.first(), summaries.last()) else {
            warn!(policy = %key.policy, roi = %key.roi, "no summaries to export");
            return Ok(None);
        };

        let path = self.stats_path(key, first.rate, last.rate);
        let mut writer = create_writer(&path)?;

        writer.write_record([
            "sample_size",
            "rate",
            "mvdd_min",
            "mvdd_max",
            "mvdd_std",
            "mvdd_mean",
            "pnl_min",
            "pnl_max",
            "pnl_std",
            "pnl_mean",
            "doubling_interval_min",
            "doubling_interval_max",
            "doubling_interval_std",
            "doubling_interval_mean",
        ])?;

        for summary in summaries {
            let mdd = &summary.max_drawdown;
            let pnl = &summary.pnl;
            let dbl = &summary.doubling_interval;
            writer.write_record(&[
                summary.sample_size.to_string(),
                summary.rate.to_string(),
                mdd.min.to_string(),
                mdd.max.to_string(),
                mdd.std.to_string(),
                mdd.mean.to_string(),
                pnl.min.to_string(),
                pnl.max.to_string(),
                pnl.std.to_string(),
                pnl.mean.to_string(),
                dbl.min.to_string(),
                dbl.max.to_string(),
                dbl.std.to_string(),
                dbl.mean.to_string(),
            ])?;
        }

        writer.flush()?;
        debug!(path = %path.display(), rows = summaries.len(), "wrote stats table");
        Ok(Some(path))
    }

    /// Writes per-game-index balance statistics for one win rate.
    ///
    /// Format: index,sample_size,min,max,mean,std
    ///
    /// # Errors
    /// Returns error if the file cannot be created or writing fails
    pub fn write_trajectory(
        &self,
        key: &GroupKey,
        rate: RateKey,
        summaries: &[IndexSummary],
    ) -> Result<PathBuf, StorageError> {
        let path = self.trajectory_path(key, rate);
        let mut writer = create_writer(&path)?;

        writer.write_record(["index", "sample_size", "min", "max", "mean", "std"])?;
        for summary in summaries {
            let stats = &summary.stats;
            writer.write_record(&[
                summary.index.to_string(),
                stats.sample_size.to_string(),
                stats.min.to_string(),
                stats.max.to_string(),
                stats.mean.to_string(),
                stats.std.to_string(),
            ])?;
        }

        writer.flush()?;
        debug!(path = %path.display(), rows = summaries.len(), "wrote trajectory table");
        Ok(path)
    }
}

fn create_writer(path: &Path) -> Result<Writer<File>, StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(Writer::from_writer(File::create(path)?))
}
