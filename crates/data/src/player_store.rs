//! Player-state persistence.
//!
//! Terminal states are stored as one JSON file per `(policy, roi, rate)`
//! cell so later runs can append to them and `summarize` can recompute
//! statistics without simulating again:
//!
//! ```text
//! <root>/players/<slug>/roi_<roi>/<slug>_rate_<rate>_roi_<roi>_players.json
//! ```
//!
//! A missing file loads as an empty list. A file that exists but cannot be
//! parsed is an error, so appending never silently drops earlier results.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wager_sim_core::{PlayerState, PolicyKind};
use wager_sim_engine::{AggregationContext, GroupKey, RateBuckets, RateKey};

use crate::error::StorageError;

/// On-disk format of one cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPlayers {
    pub policy: PolicyKind,
    pub roi: Decimal,
    pub rate: RateKey,
    /// Timestamp when this was saved.
    pub saved_at: DateTime<Utc>,
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Clone)]
pub struct PlayerStore {
    root: PathBuf,
}

impl PlayerStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path(&self, key: &GroupKey, rate: RateKey) -> PathBuf {
        let slug = key.policy.slug();
        let roi = key.roi;
        self.root
            .join("players")
            .join(slug)
            .join(format!("roi_{roi}"))
            .join(format!("{slug}_rate_{rate}_roi_{roi}_players.json"))
    }

    /// Overwrites the cell with `states`.
    ///
    /// Creates parent directories if they don't exist. The file is written
    /// next to the target and renamed over it, so a failed save leaves the
    /// previous contents in place.
    ///
    /// # Errors
    /// Returns error if the file cannot be written or serialization fails
    pub fn save(
        &self,
        key: &GroupKey,
        rate: RateKey,
        states: &[PlayerState],
    ) -> Result<PathBuf, StorageError> {
        let path = self.path(key, rate);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let persisted = PersistedPlayers {
            policy: key.policy,
            roi: key.roi,
            rate,
            saved_at: Utc::now(),
            players: states.to_vec(),
        };
        let staging = staging_path(&path);
        if let Err(e) = write_json(&staging, &persisted) {
            if staging.is_file() {
                let _ = fs::remove_file(&staging);
            }
            return Err(e);
        }
        fs::rename(&staging, &path)?;

        debug!(path = %path.display(), players = states.len(), "saved player states");
        Ok(path)
    }

    /// Loads the cell's states; empty if nothing was saved yet.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed, or if
    /// its header names a different policy, roi or rate than its location
    pub fn load(&self, key: &GroupKey, rate: RateKey) -> Result<Vec<PlayerState>, StorageError> {
        let path = self.path(key, rate);
        if !path.exists() {
            debug!(path = %path.display(), "no persisted players");
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let persisted: PersistedPlayers = serde_json::from_reader(reader).map_err(|e| {
            warn!(path = %path.display(), error = %e, "unreadable player file");
            e
        })?;

        if persisted.policy != key.policy
            || persisted.roi.normalize() != key.roi
            || persisted.rate != rate
        {
            warn!(
                path = %path.display(),
                stored_policy = %persisted.policy,
                stored_roi = %persisted.roi,
                stored_rate = %persisted.rate,
                "player file header does not match its location"
            );
            return Err(StorageError::Mismatch {
                path,
                found: format!(
                    "{} roi {} rate {}",
                    persisted.policy, persisted.roi, persisted.rate
                ),
            });
        }
        Ok(persisted.players)
    }

    /// Appends `states` to whatever the cell already holds and returns the
    /// new total.
    ///
    /// # Errors
    /// Returns error if the existing file is unreadable or the save fails
    pub fn append(
        &self,
        key: &GroupKey,
        rate: RateKey,
        states: &[PlayerState],
    ) -> Result<usize, StorageError> {
        let mut merged = self.load(key, rate)?;
        merged.extend_from_slice(states);
        self.save(key, rate, &merged)?;
        Ok(merged.len())
    }

    /// Appends every cell of `ctx`; returns the number of files written.
    ///
    /// # Errors
    /// Returns the first storage error
    pub fn append_context(&self, ctx: &AggregationContext) -> Result<usize, StorageError> {
        let mut files = 0;
        for (key, buckets) in ctx.groups() {
            for (rate, states) in buckets {
                self.append(key, *rate, states)?;
                files += 1;
            }
        }
        info!(root = %self.root.display(), files, "persisted player states");
        Ok(files)
    }

    /// Loads every listed rate of one group, skipping rates with no file.
    ///
    /// # Errors
    /// Returns the first storage error
    pub fn load_buckets(&self, key: &GroupKey, rates: &[RateKey]) -> Result<RateBuckets, StorageError> {
        let mut buckets = RateBuckets::new();
        for &rate in rates {
            let states = self.load(key, rate)?;
            if !states.is_empty() {
                buckets.entry(rate).or_default().extend(states);
            }
        }
        Ok(buckets)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json(path: &Path, persisted: &PersistedPlayers) -> Result<(), StorageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, persisted)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wager_sim_engine::SweepOutcome;

    fn states(n: usize, balance: Decimal) -> Vec<PlayerState> {
        let mut state = PlayerState::new(dec!(1000)).unwrap();
        state.balance = balance;
        state.doubling_intervals = vec![12, 40];
        vec![state; n]
    }

    // =========================================================================
    // Paths
    // =========================================================================

    #[test]
    fn path_nests_policy_and_roi() {
        let store = PlayerStore::new("results");
        let key = GroupKey::new(PolicyKind::Martingale, dec!(3));
        assert_eq!(
            store.path(&key, RateKey::from_rate(0.57)),
            PathBuf::from("results/players/martingale/roi_3/martingale_rate_0.57_roi_3_players.json")
        );
    }

    // =========================================================================
    // Save / load
    // =========================================================================

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::FlatStake, dec!(1));
        assert!(store.load(&key, RateKey::from_rate(0.5)).unwrap().is_empty());
    }

    #[test]
    fn saved_states_load_back_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::MartingaleStopLoss, dec!(2));
        let rate = RateKey::from_rate(0.61);
        let saved = states(3, dec!(1234.5678));

        store.save(&key, rate, &saved).unwrap();
        assert_eq!(store.load(&key, rate).unwrap(), saved);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::Martingale, dec!(1));
        let rate = RateKey::from_rate(0.5);
        let path = store.path(&key, rate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let err = store.load(&key, rate).unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
        assert!(store.append(&key, rate, &states(1, dec!(10))).is_err());
    }

    #[test]
    fn save_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::FlatStake, dec!(1));
        let rate = RateKey::from_rate(0.5);

        let path = store.save(&key, rate, &states(2, dec!(700))).unwrap();
        store.save(&key, rate, &states(4, dec!(900))).unwrap();

        assert!(!staging_path(&path).exists());
        assert_eq!(store.load(&key, rate).unwrap().len(), 4);
    }

    #[test]
    fn failed_save_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::Martingale, dec!(2));
        let rate = RateKey::from_rate(0.66);
        let saved = states(3, dec!(1500));
        let path = store.save(&key, rate, &saved).unwrap();

        // a directory in the staging slot makes the write fail
        fs::create_dir(staging_path(&path)).unwrap();
        let err = store.append(&key, rate, &states(5, dec!(10))).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));

        assert_eq!(store.load(&key, rate).unwrap(), saved);
    }

    #[test]
    fn header_for_another_cell_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let rate = RateKey::from_rate(0.6);
        let roi_one = GroupKey::new(PolicyKind::Martingale, dec!(1));
        let roi_two = GroupKey::new(PolicyKind::Martingale, dec!(2));

        // same policy and rate, stored under the wrong roi
        let written = store.save(&roi_one, rate, &states(2, dec!(800))).unwrap();
        let target = store.path(&roi_two, rate);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::rename(&written, &target).unwrap();

        let err = store.load(&roi_two, rate).unwrap_err();
        assert!(matches!(err, StorageError::Mismatch { .. }));
        assert!(store.append(&roi_two, rate, &states(1, dec!(5))).is_err());
    }

    #[test]
    fn header_roi_matches_after_normalising() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let rate = RateKey::from_rate(0.7);
        let key = GroupKey::new(PolicyKind::FlatStake, dec!(2));
        let path = store.path(&key, rate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let persisted = PersistedPlayers {
            policy: PolicyKind::FlatStake,
            roi: dec!(2.00),
            rate,
            saved_at: Utc::now(),
            players: states(1, dec!(950)),
        };
        fs::write(&path, serde_json::to_string(&persisted).unwrap()).unwrap();

        assert_eq!(store.load(&key, rate).unwrap().len(), 1);
    }

    // =========================================================================
    // Append
    // =========================================================================

    #[test]
    fn append_merges_with_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::Martingale, dec!(1));
        let rate = RateKey::from_rate(0.55);

        assert_eq!(store.append(&key, rate, &states(2, dec!(900))).unwrap(), 2);
        assert_eq!(store.append(&key, rate, &states(3, dec!(1100))).unwrap(), 5);

        let loaded = store.load(&key, rate).unwrap();
        assert_eq!(loaded[0].balance, dec!(900));
        assert_eq!(loaded[4].balance, dec!(1100));
    }

    #[test]
    fn append_context_writes_one_file_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path());
        let key = GroupKey::new(PolicyKind::FlatStake, dec!(2));

        let mut outcome = SweepOutcome::default();
        outcome.states.insert(RateKey::from_rate(0.5), states(2, dec!(800)));
        outcome.states.insert(RateKey::from_rate(0.6), states(1, dec!(1200)));
        let mut ctx = AggregationContext::new();
        ctx.absorb(key, outcome);

        assert_eq!(store.append_context(&ctx).unwrap(), 2);

        let rates = [RateKey::from_rate(0.5), RateKey::from_rate(0.6), RateKey::from_rate(0.7)];
        let buckets = store.load_buckets(&key, &rates).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&RateKey::from_rate(0.5)].len(), 2);
    }
}
