//! Reduces terminal player states into per-rate statistics.
//!
//! Three series are derived from each group of states:
//!
//! - **max drawdown**: each state's `max_drawdown_pct`;
//! - **PnL**: each state's PnL percentage under the configured convention;
//! - **doubling interval**: every state's doubling intervals concatenated.
//!   When no player doubled, the series is `[0]` so the statistic is defined.
//!
//! The reduction does not depend on the order of the input states.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wager_sim_core::{PlayerState, PnlConvention};

use crate::rate::RateKey;
use crate::statistics::StatBlock;

/// Statistics for one win-rate bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSummary {
    pub rate: RateKey,
    /// Number of terminal states summarised.
    pub sample_size: usize,
    pub max_drawdown: StatBlock,
    pub pnl: StatBlock,
    pub doubling_interval: StatBlock,
}

/// Balance statistics across sessions at one game index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub index: usize,
    pub stats: StatBlock,
}

/// Summarises the terminal states of one win-rate bucket.
#[must_use]
pub fn summarize(rate: RateKey, states: &[PlayerState], convention: PnlConvention) -> RateSummary {
    let drawdowns: Vec<Decimal> = states.iter().map(|s| s.max_drawdown_pct).collect();
    let pnls: Vec<Decimal> = states.iter().map(|s| convention.percent(s)).collect();

    let mut intervals: Vec<u64> = states
        .iter()
        .flat_map(|s| s.doubling_intervals.iter().copied())
        .collect();
    if intervals.is_empty() {
        debug!(%rate, "no bankroll doublings; using [0]");
        intervals.push(0);
    }

    RateSummary {
        rate,
        sample_size: states.len(),
        max_drawdown: StatBlock::from_values(&drawdowns),
        pnl: StatBlock::from_values(&pnls),
        doubling_interval: StatBlock::from_counts(&intervals),
    }
}

/// Summarises every bucket, in ascending rate order.
#[must_use]
pub fn summarize_buckets(
    buckets: &BTreeMap<RateKey, Vec<PlayerState>>,
    convention: PnlConvention,
) -> Vec<RateSummary> {
    buckets
        .iter()
        .map(|(rate, states)| summarize(*rate, states, convention))
        .collect()
}

/// Reduces balance trajectories to one [`StatBlock`] per game index.
///
/// Sessions that stopped early contribute only to the indices they reached,
/// so later indices can have smaller samples.
#[must_use]
pub fn summarize_trajectories(trajectories: &[Vec<Decimal>]) -> Vec<IndexSummary> {
    let longest = trajectories.iter().map(Vec::len).max().unwrap_or(0);
    (0..longest)
        .map(|index| {
            let column: Vec<Decimal> = trajectories
                .iter()
                .filter_map(|t| t.get(index).copied())
                .collect();
            IndexSummary {
                index,
                stats: StatBlock::from_values(&column),
            }
        })
        .collect()
}
