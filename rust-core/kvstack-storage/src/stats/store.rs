// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store-wide statistics: one `RequestStats` per operation type, aggregate
// counters, and the monitoring interval.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::request::{LatencySummary, RequestSnapshot, RequestStats};
use super::{duration_nanos, millis};
use crate::error::ConfigError;
use crate::operation::OperationType;

/// Serializable copy of a [`StorageStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub store_type: String,
    pub history_size: usize,
    pub count: u64,
    pub total_nanos: u64,
    pub interval_start: DateTime<Utc>,
    pub interval_end: Option<DateTime<Utc>>,
    /// One entry per operation type, in [`OperationType::ALL`] order.
    pub operations: Vec<RequestSnapshot>,
}

/// Latency statistics for a whole store.
///
/// Every operation type has its own [`RequestStats`], created up front. The
/// aggregate count and total are updated by every [`record`](Self::record)
/// call with the same atomic primitive as the per-type counters, so once a
/// call returns the aggregate count equals the sum of the per-type counts.
///
/// Interval timestamps are stored as microseconds since the Unix epoch. An
/// end of `0` means the interval is still open.
#[derive(Debug)]
pub struct StorageStats {
    store_type: String,
    history_size: usize,
    per_type: HashMap<OperationType, RequestStats>,
    count: AtomicU64,
    total_nanos: AtomicU64,
    interval_start_us: AtomicI64,
    interval_end_us: AtomicI64,
}

const UNSET: i64 = 0;

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn from_micros(us: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(us).unwrap_or_default()
}

impl StorageStats {
    /// Fresh statistics for a store labelled `store_type`, keeping
    /// `history_size` recent samples per operation type. The interval starts
    /// now.
    pub fn new(store_type: impl Into<String>, history_size: usize) -> Result<Self, ConfigError> {
        let per_type = OperationType::ALL
            .into_iter()
            .map(|op| RequestStats::new(op, history_size).map(|stats| (op, stats)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            store_type: store_type.into(),
            history_size,
            per_type,
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            interval_start_us: AtomicI64::new(now_micros()),
            interval_end_us: AtomicI64::new(UNSET),
        })
    }

    /// Rebuild live statistics from a snapshot.
    ///
    /// Operation types missing from the snapshot start empty.
    pub fn from_snapshot(snapshot: &StatsSnapshot) -> Result<Self, ConfigError> {
        let mut stats = Self::new(snapshot.store_type.clone(), snapshot.history_size)?;
        for op in &snapshot.operations {
            let restored = RequestStats::from_snapshot(op, snapshot.history_size)?;
            stats.per_type.insert(op.operation, restored);
        }
        stats.count = AtomicU64::new(snapshot.count);
        stats.total_nanos = AtomicU64::new(snapshot.total_nanos);
        stats.interval_start_us = AtomicI64::new(snapshot.interval_start.timestamp_micros());
        stats.interval_end_us = AtomicI64::new(
            snapshot
                .interval_end
                .map_or(UNSET, |end| end.timestamp_micros()),
        );
        Ok(stats)
    }

    /// Record one completed operation of type `op`.
    pub fn record(&self, op: OperationType, sample: Duration) {
        self.for_type(op).record(sample);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos
            .fetch_add(duration_nanos(sample), Ordering::Relaxed);
    }

    /// Statistics for one operation type.
    pub fn for_type(&self, op: OperationType) -> &RequestStats {
        // Populated for every type at construction.
        &self.per_type[&op]
    }

    /// Label of the store these statistics describe.
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Operations recorded across all types.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Time spent in the store across all types.
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary::from_nanos(self.count(), self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn interval_start(&self) -> DateTime<Utc> {
        from_micros(self.interval_start_us.load(Ordering::Relaxed))
    }

    /// End of the monitoring interval, if it has been set.
    pub fn interval_end(&self) -> Option<DateTime<Utc>> {
        match self.interval_end_us.load(Ordering::Relaxed) {
            UNSET => None,
            us => Some(from_micros(us)),
        }
    }

    /// Restart the interval now.
    ///
    /// Samples already recorded stay in the totals, so the proportion of
    /// time in store is only meaningful for samples recorded after this call.
    pub fn reset_interval_start(&self) {
        self.interval_start_us.store(now_micros(), Ordering::Relaxed);
    }

    /// Close the interval now.
    pub fn set_interval_end(&self) {
        self.interval_end_us.store(now_micros(), Ordering::Relaxed);
    }

    /// Length of the interval, up to now if no end has been set.
    pub fn interval_length(&self) -> TimeDelta {
        let end = match self.interval_end_us.load(Ordering::Relaxed) {
            UNSET => now_micros(),
            us => us,
        };
        TimeDelta::microseconds(end - self.interval_start_us.load(Ordering::Relaxed))
    }

    /// Fraction of the interval spent inside the store.
    ///
    /// `None` when the interval has zero or negative length.
    pub fn proportion_of_time_in_store(&self) -> Option<f64> {
        let interval_us = self.interval_length().num_microseconds()?;
        if interval_us <= 0 {
            return None;
        }
        Some(self.total_time().as_secs_f64() / (interval_us as f64 / 1_000_000.0))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            store_type: self.store_type.clone(),
            history_size: self.history_size,
            count: self.count(),
            total_nanos: self.total_nanos.load(Ordering::Relaxed),
            interval_start: self.interval_start(),
            interval_end: self.interval_end(),
            operations: OperationType::ALL
                .into_iter()
                .map(|op| self.for_type(op).snapshot())
                .collect(),
        }
    }
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(f, "Statistics for {} store", self.store_type)?;
        writeln!(f, "Requests: {}", summary.count)?;
        writeln!(f, "Total time in store: {:.3} ms", summary.total_ms())?;
        match summary.average_ms() {
            Some(avg) => writeln!(f, "Average: {avg:.3} ms per request")?,
            None => writeln!(f, "Average: n/a")?,
        }
        writeln!(f, "Interval start: {}", self.interval_start().to_rfc3339())?;
        match self.interval_end() {
            Some(end) => writeln!(f, "Interval end: {}", end.to_rfc3339())?,
            None => writeln!(f, "Interval end: not set")?,
        }
        let length_ms = self
            .interval_length()
            .to_std()
            .map(millis)
            .unwrap_or(0.0);
        writeln!(f, "Interval length: {length_ms:.3} ms")?;
        match self.proportion_of_time_in_store() {
            Some(p) => writeln!(f, "Proportion of time in store: {p:.6}")?,
            None => writeln!(f, "Proportion of time in store: n/a")?,
        }
        for op in OperationType::ALL {
            writeln!(f)?;
            f.write_str(&self.for_type(op).report())?;
        }
        Ok(())
    }
}
