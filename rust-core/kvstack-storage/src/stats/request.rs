// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Statistics for a single operation type: all-time counters plus a window of
// recent latencies.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ring::LatencyRing;
use super::{duration_nanos, millis};
use crate::error::ConfigError;
use crate::operation::OperationType;

/// Count, total and average of a set of latency samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Number of samples.
    pub count: u64,
    /// Sum of all samples.
    pub total: Duration,
    /// `total / count`, or `None` when there are no samples.
    pub average: Option<Duration>,
}

impl LatencySummary {
    pub(crate) fn from_nanos(count: u64, total_nanos: u64) -> Self {
        let average = (count > 0).then(|| Duration::from_nanos(total_nanos / count));
        Self {
            count,
            total: Duration::from_nanos(total_nanos),
            average,
        }
    }

    /// Summarise a slice of samples.
    pub fn from_samples(samples: &[Duration]) -> Self {
        let total: u64 = samples.iter().map(|s| duration_nanos(*s)).sum();
        Self::from_nanos(samples.len() as u64, total)
    }

    /// Total in milliseconds.
    pub fn total_ms(&self) -> f64 {
        millis(self.total)
    }

    /// Average in milliseconds, if defined.
    pub fn average_ms(&self) -> Option<f64> {
        self.average.map(millis)
    }
}

/// Serializable copy of one [`RequestStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub operation: OperationType,
    pub count: u64,
    pub total_nanos: u64,
    /// Recent window, oldest first, in nanoseconds.
    pub recent_nanos: Vec<u64>,
}

/// All-time and recent latency statistics for one operation type.
///
/// `count` and the total are atomic counters and include every sample ever
/// recorded. The recent window only holds the last `history_size` samples.
#[derive(Debug)]
pub struct RequestStats {
    operation: OperationType,
    count: AtomicU64,
    total_nanos: AtomicU64,
    recent: LatencyRing,
}

impl RequestStats {
    /// Empty statistics keeping a window of `history_size` samples.
    pub fn new(operation: OperationType, history_size: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            operation,
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            recent: LatencyRing::new(history_size)?,
        })
    }

    /// Rebuild statistics from a snapshot.
    ///
    /// A recent window longer than `history_size` keeps only its newest
    /// samples.
    pub fn from_snapshot(
        snapshot: &RequestSnapshot,
        history_size: usize,
    ) -> Result<Self, ConfigError> {
        let stats = Self::new(snapshot.operation, history_size)?;
        stats.count.store(snapshot.count, Ordering::Relaxed);
        stats.total_nanos.store(snapshot.total_nanos, Ordering::Relaxed);
        let skip = snapshot.recent_nanos.len().saturating_sub(history_size);
        for nanos in &snapshot.recent_nanos[skip..] {
            stats.recent.record(Duration::from_nanos(*nanos));
        }
        Ok(stats)
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    /// Record one completed operation.
    pub fn record(&self, sample: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos
            .fetch_add(duration_nanos(sample), Ordering::Relaxed);
        self.recent.record(sample);
    }

    /// Number of operations recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of every recorded latency, including samples no longer in the
    /// recent window.
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    /// All-time count, total and average.
    pub fn summary(&self) -> LatencySummary {
        LatencySummary::from_nanos(self.count(), self.total_nanos.load(Ordering::Relaxed))
    }

    /// Count, total and average over the recent window only.
    pub fn recent_summary(&self) -> LatencySummary {
        LatencySummary::from_samples(&self.recent.snapshot())
    }

    /// The recent window, oldest first.
    pub fn recent_latencies(&self) -> Vec<Duration> {
        self.recent.snapshot()
    }

    pub fn history_size(&self) -> usize {
        self.recent.capacity()
    }

    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            operation: self.operation,
            count: self.count(),
            total_nanos: self.total_nanos.load(Ordering::Relaxed),
            recent_nanos: self
                .recent
                .snapshot()
                .into_iter()
                .map(duration_nanos)
                .collect(),
        }
    }

    /// Human-readable report of the all-time and recent figures.
    pub fn report(&self) -> String {
        let summary = self.summary();
        if summary.count == 0 {
            return format!("No requests of type {}\n", self.operation);
        }

        let recent = self.recent_latencies();
        let recent_summary = LatencySummary::from_samples(&recent);

        let mut out = String::new();
        let _ = writeln!(out, "{} requests: {}", self.operation, summary.count);
        let _ = writeln!(out, "  total time: {:.3} ms", summary.total_ms());
        if let Some(avg) = summary.average_ms() {
            let _ = writeln!(out, "  average: {avg:.3} ms per request");
        }
        let window: Vec<String> = recent.iter().map(|s| format!("{:.3}", millis(*s))).collect();
        let _ = writeln!(
            out,
            "  last {} (oldest first): [{}] ms",
            recent_summary.count,
            window.join(", ")
        );
        let _ = writeln!(
            out,
            "  recent total: {:.3} ms, recent average: {:.3} ms",
            recent_summary.total_ms(),
            recent_summary.average_ms().unwrap_or(0.0)
        );
        out
    }
}
