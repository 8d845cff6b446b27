//! Parallel win-rate/roi sweeps and the statistics reported over them.

pub mod aggregate;
pub mod batch;
pub mod context;
pub mod rate;
pub mod report;
pub mod statistics;
pub mod sweep;

pub use aggregate::{summarize, summarize_buckets, summarize_trajectories, IndexSummary, RateSummary};
pub use batch::{BatchRunner, BatchTotals, PointReport};
pub use context::{AggregationContext, GroupKey, RateBuckets, TrajectoryBuckets};
pub use rate::RateKey;
pub use report::ReportFormatter;
pub use statistics::{StatBlock, STAT_PRECISION};
pub use sweep::{master_rng, EngineError, SweepDriver, SweepOutcome, SweepPlan};
