// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Latency-monitoring wrapper for kvstack stores.
//
// Wraps any `KeyValueStore` and times every call, recording the elapsed time
// into `StorageStats` bucketed by operation type. Return values and errors
// pass through untouched.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, trace};

use crate::backend::{ItemCount, KeyValueStore};
use crate::config::MonitorConfig;
use crate::error::{ConfigError, StorageError};
use crate::operation::OperationType;
use crate::stats::StorageStats;

/// A store wrapper that records per-operation latency statistics.
///
/// Every call is timed immediately around the delegated call. The sample is
/// recorded whether the wrapped store succeeded or failed.
///
/// # Example
///
/// ```rust
/// use kvstack_storage::backend::KeyValueStore;
/// use kvstack_storage::memory::InMemoryStore;
/// use kvstack_storage::monitored::MonitoredStore;
/// use kvstack_storage::operation::OperationType;
///
/// let store = MonitoredStore::new(InMemoryStore::new(), 10).unwrap();
/// store.put("key".to_string(), 1).unwrap();
/// store.get(&"key".to_string()).unwrap();
///
/// let stats = store.stats();
/// assert_eq!(stats.for_type(OperationType::Put).count(), 1);
/// assert_eq!(stats.for_type(OperationType::Get).count(), 1);
/// ```
#[derive(Debug)]
pub struct MonitoredStore<S: KeyValueStore> {
    inner: S,
    stats: RwLock<Arc<StorageStats>>,
}

impl<S: KeyValueStore> MonitoredStore<S> {
    /// Wrap `inner`, keeping `history_size` recent samples per operation type.
    pub fn new(inner: S, history_size: usize) -> Result<Self, ConfigError> {
        let stats = StorageStats::new(inner.describe(), history_size)?;
        debug!(store_type = stats.store_type(), history_size, "monitoring store");
        Ok(Self {
            inner,
            stats: RwLock::new(Arc::new(stats)),
        })
    }

    pub fn with_config(inner: S, config: &MonitorConfig) -> Result<Self, ConfigError> {
        Self::new(inner, config.history_size)
    }

    /// The statistics currently being recorded into.
    pub fn stats(&self) -> Arc<StorageStats> {
        Arc::clone(&self.stats.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the current statistics.
    ///
    /// The replacement is used as-is, so a caller can continue an earlier
    /// snapshot or share one `StorageStats` between several stores.
    pub fn set_stats(&self, stats: Arc<StorageStats>) {
        debug!(
            store_type = stats.store_type(),
            count = stats.count(),
            "replacing store statistics"
        );
        *self.stats.write().unwrap_or_else(PoisonError::into_inner) = stats;
    }

    /// Swap in fresh statistics with the same store label and history size.
    ///
    /// Returns the statistics that were replaced; any other retained
    /// reference to them also stays readable.
    pub fn reset_stats(&self) -> Arc<StorageStats> {
        let mut current = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        // Same label and a history size that was already accepted.
        let fresh = match StorageStats::new(current.store_type(), current.history_size()) {
            Ok(fresh) => fresh,
            Err(_) => return Arc::clone(&current),
        };
        debug!(
            store_type = current.store_type(),
            previous_count = current.count(),
            "resetting store statistics"
        );
        std::mem::replace(&mut *current, Arc::new(fresh))
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn timed<T>(
        &self,
        op: OperationType,
        call: impl FnOnce(&S) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let start = Instant::now();
        let result = call(&self.inner);
        let elapsed = start.elapsed();

        self.stats().record(op, elapsed);
        trace!(operation = %op, elapsed_us = elapsed.as_micros() as u64, "recorded sample");
        if let Err(err) = &result {
            debug!(operation = %op, error = %err, "wrapped store returned an error");
        }
        result
    }
}

impl<S: KeyValueStore> KeyValueStore for MonitoredStore<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn clear(&self) -> Result<(), StorageError> {
        self.timed(OperationType::Clear, |s| s.clear())
    }

    fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, StorageError> {
        self.timed(OperationType::Get, |s| s.get(key))
    }

    fn get_many(
        &self,
        keys: &[Self::Key],
    ) -> Result<HashMap<Self::Key, Self::Value>, StorageError> {
        self.timed(OperationType::GetMany, |s| s.get_many(keys))
    }

    fn put(&self, key: Self::Key, value: Self::Value) -> Result<(), StorageError> {
        self.timed(OperationType::Put, |s| s.put(key, value))
    }

    fn put_many(
        &self,
        entries: HashMap<Self::Key, Self::Value>,
    ) -> Result<ItemCount, StorageError> {
        self.timed(OperationType::PutMany, |s| s.put_many(entries))
    }

    fn delete(&self, key: &Self::Key) -> Result<ItemCount, StorageError> {
        self.timed(OperationType::Delete, |s| s.delete(key))
    }

    fn delete_many(&self, keys: &[Self::Key]) -> Result<ItemCount, StorageError> {
        self.timed(OperationType::DeleteMany, |s| s.delete_many(keys))
    }

    fn size(&self) -> Result<ItemCount, StorageError> {
        self.timed(OperationType::Size, |s| s.size())
    }

    fn describe(&self) -> &str {
        let start = Instant::now();
        let label = self.inner.describe();
        self.stats().record(OperationType::Describe, start.elapsed());
        label
    }

    fn dump(&self) -> Result<String, StorageError> {
        self.timed(OperationType::Dump, |s| s.dump())
    }
}
