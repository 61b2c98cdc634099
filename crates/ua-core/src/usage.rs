//! Per-application usage buckets.

use std::collections::BTreeMap;
use std::mem;

use serde::Serialize;

use crate::types::ApplicationId;

/// Accumulated active time for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub application_id: ApplicationId,
    pub seconds_used: u64,
}

/// A set of usage buckets keyed by application.
///
/// Each application appears at most once. Buckets are only ever created by a
/// recorded tick, so a batch never holds zero-valued records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageBatch {
    buckets: BTreeMap<ApplicationId, u64>,
}

impl UsageBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no application has accumulated any time.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of distinct applications in the batch.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Seconds accumulated by the given application, if it appears.
    pub fn seconds_for(&self, application_id: &str) -> Option<u64> {
        self.buckets.get(application_id).copied()
    }

    /// Sum of all buckets.
    pub fn total_seconds(&self) -> u64 {
        self.buckets
            .values()
            .fold(0, |total, seconds| total.saturating_add(*seconds))
    }

    /// Iterates over the buckets by reference, ordered by application ID.
    pub fn iter(&self) -> impl Iterator<Item = (&ApplicationId, u64)> + '_ {
        self.buckets
            .iter()
            .map(|(application_id, seconds_used)| (application_id, *seconds_used))
    }

    /// Iterates over the records, ordered by application ID.
    pub fn records(&self) -> impl Iterator<Item = UsageRecord> + '_ {
        self.buckets
            .iter()
            .map(|(application_id, seconds_used)| UsageRecord {
                application_id: application_id.clone(),
                seconds_used: *seconds_used,
            })
    }

    fn add(&mut self, application_id: ApplicationId, seconds: u64) {
        let bucket = self.buckets.entry(application_id).or_insert(0);
        *bucket = bucket.saturating_add(seconds);
    }
}

/// In-memory usage aggregator for the current (unflushed) batch.
///
/// Owned by the scheduler, which is its only mutator. The contents can only be
/// read out through [`UsageAggregator::snapshot_and_reset`].
#[derive(Debug)]
pub struct UsageAggregator {
    seconds_per_tick: u64,
    current: UsageBatch,
}

impl UsageAggregator {
    /// Creates an empty aggregator crediting `seconds_per_tick` per recorded tick.
    #[must_use]
    pub fn new(seconds_per_tick: u64) -> Self {
        Self {
            seconds_per_tick,
            current: UsageBatch::new(),
        }
    }

    /// Credits one sample interval to `application_id`.
    ///
    /// The credit is the configured interval, not the wall-clock time since the
    /// previous tick.
    pub fn record_tick(&mut self, application_id: ApplicationId) {
        if self.seconds_per_tick == 0 {
            return;
        }
        self.current.add(application_id, self.seconds_per_tick);
    }

    /// Returns the accumulated batch and installs a fresh empty one.
    pub fn snapshot_and_reset(&mut self) -> UsageBatch {
        mem::take(&mut self.current)
    }

    /// Returns true if nothing has been recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
