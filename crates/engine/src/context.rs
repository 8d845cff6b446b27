//! Accumulates sweep results across batches.
//!
//! The context is owned by whoever drives the sweeps and is keyed by
//! `(policy, roi)`, then by win rate. It starts empty, grows with each
//! [`AggregationContext::absorb`] and can be reset with
//! [`AggregationContext::clear`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use wager_sim_core::{PlayerState, PolicyKind};

use crate::rate::RateKey;
use crate::sweep::SweepOutcome;

/// Terminal states grouped by win rate.
pub type RateBuckets = BTreeMap<RateKey, Vec<PlayerState>>;

/// Balance trajectories grouped by win rate.
pub type TrajectoryBuckets = BTreeMap<RateKey, Vec<Vec<Decimal>>>;

/// Identifies one `(policy, roi)` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub policy: PolicyKind,
    pub roi: Decimal,
}

impl GroupKey {
    #[must_use]
    pub fn new(policy: PolicyKind, roi: Decimal) -> Self {
        Self {
            policy,
            roi: roi.normalize(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregationContext {
    states: BTreeMap<GroupKey, RateBuckets>,
    trajectories: BTreeMap<GroupKey, TrajectoryBuckets>,
}

impl AggregationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sweep outcome to the `(policy, roi)` group.
    pub fn absorb(&mut self, key: GroupKey, outcome: SweepOutcome) {
        let buckets = self.states.entry(key).or_default();
        for (rate, states) in outcome.states {
            buckets.entry(rate).or_default().extend(states);
        }
        if !outcome.trajectories.is_empty() {
            let buckets = self.trajectories.entry(key).or_default();
            for (rate, trajectories) in outcome.trajectories {
                buckets.entry(rate).or_default().extend(trajectories);
            }
        }
    }

    /// Drops everything accumulated so far.
    pub fn clear(&mut self) {
        self.states.clear();
        self.trajectories.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Groups present in the context, in key order.
    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &RateBuckets)> {
        self.states.iter()
    }

    /// Policies present, in key order without repeats.
    #[must_use]
    pub fn policies(&self) -> Vec<PolicyKind> {
        let mut policies: Vec<PolicyKind> = self.states.keys().map(|k| k.policy).collect();
        policies.dedup();
        policies
    }

    /// Win rates recorded for one group, ascending.
    pub fn rates(&self, key: &GroupKey) -> impl Iterator<Item = RateKey> + '_ {
        self.states.get(key).into_iter().flat_map(|b| b.keys().copied())
    }

    #[must_use]
    pub fn buckets(&self, key: &GroupKey) -> Option<&RateBuckets> {
        self.states.get(key)
    }

    /// States for one `(policy, roi, rate)` cell; empty if never absorbed.
    #[must_use]
    pub fn states(&self, key: &GroupKey, rate: RateKey) -> &[PlayerState] {
        self.states
            .get(key)
            .and_then(|b| b.get(&rate))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn trajectories(&self, key: &GroupKey) -> Option<&TrajectoryBuckets> {
        self.trajectories.get(key)
    }

    /// Moves every recorded trajectory out, leaving the states in place.
    pub fn take_trajectories(&mut self) -> BTreeMap<GroupKey, TrajectoryBuckets> {
        std::mem::take(&mut self.trajectories)
    }

    /// Total number of terminal states held.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.states
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}
