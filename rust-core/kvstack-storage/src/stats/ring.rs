// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed-capacity window of the most recent latency samples.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::ConfigError;

/// Circular buffer holding the `capacity` most recent latency samples of one
/// operation type.
///
/// Writers and readers share a single mutex owned by this ring, so recording
/// into the ring of one operation type never contends with another type.
#[derive(Debug)]
pub struct LatencyRing {
    capacity: usize,
    state: Mutex<RingState>,
}

#[derive(Debug)]
struct RingState {
    /// Grows to `capacity`, then slots are overwritten in place.
    slots: Vec<Duration>,
    /// Slot the next sample is written to once the ring is full.
    next: usize,
}

impl LatencyRing {
    /// Create an empty ring holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::NotPositive {
                name: "history size",
                value: capacity,
            });
        }
        Ok(Self {
            capacity,
            state: Mutex::new(RingState {
                slots: Vec::with_capacity(capacity),
                next: 0,
            }),
        })
    }

    /// Append a sample, overwriting the oldest one once the ring is full.
    pub fn record(&self, sample: Duration) {
        let mut state = self.lock();
        if state.slots.len() < self.capacity {
            state.slots.push(sample);
        } else {
            let next = state.next;
            state.slots[next] = sample;
            state.next = (next + 1) % self.capacity;
        }
    }

    /// Copy of the current window, oldest sample first.
    pub fn snapshot(&self) -> Vec<Duration> {
        let state = self.lock();
        let (newer, older) = state.slots.split_at(state.next);
        older.iter().chain(newer).copied().collect()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// True until the first sample is recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Every update leaves the state consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
