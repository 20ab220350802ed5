// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Latency statistics collected by [`MonitoredStore`](crate::monitored::MonitoredStore).
//!
//! [`StorageStats`] holds one [`RequestStats`] per [`OperationType`](crate::operation::OperationType),
//! each with atomic all-time counters and a [`LatencyRing`] of recent samples.

mod request;
mod ring;
mod store;

pub use request::{LatencySummary, RequestSnapshot, RequestStats};
pub use ring::LatencyRing;
pub use store::{StatsSnapshot, StorageStats};

use std::time::Duration;

pub(crate) fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

pub(crate) fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
