// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker-pool async wrapper for kvstack stores.
//
// Every contract operation is available twice: the `KeyValueStore` methods
// call the wrapped store directly on the caller's thread, and the `*_async`
// methods run the same call on a `WorkerPool` and return a `PendingOp`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::backend::{ItemCount, KeyValueStore};
use crate::config::PoolConfig;
use crate::error::{ConfigError, StorageError};
use crate::pool::{PendingOp, WorkerPool};

/// A store wrapper that can run any operation on a worker pool.
///
/// Handles of separate async calls complete in no particular order. A caller
/// that needs one call to observe another must wait for the first handle
/// before submitting the second.
///
/// # Example
///
/// ```rust
/// use kvstack_storage::async_store::AsyncStore;
/// use kvstack_storage::memory::InMemoryStore;
///
/// let store = AsyncStore::new(InMemoryStore::new(), 4).unwrap();
/// store.put_async("k".to_string(), 7).wait().unwrap();
/// assert_eq!(store.get_async("k".to_string()).wait().unwrap(), Some(7));
/// ```
#[derive(Debug)]
pub struct AsyncStore<S: KeyValueStore + 'static> {
    inner: Arc<S>,
    pool: WorkerPool,
}

impl<S: KeyValueStore + 'static> AsyncStore<S> {
    /// Wrap `inner` with a pool of `pool_size` workers and an unbounded queue.
    pub fn new(inner: S, pool_size: usize) -> Result<Self, ConfigError> {
        Self::with_config(
            inner,
            &PoolConfig {
                pool_size,
                ..PoolConfig::default()
            },
        )
    }

    pub fn with_config(inner: S, config: &PoolConfig) -> Result<Self, ConfigError> {
        let pool = WorkerPool::with_config(config)?;
        debug!(pool_size = config.pool_size, "async store ready");
        Ok(Self {
            inner: Arc::new(inner),
            pool,
        })
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn pool_size(&self) -> usize {
        self.pool.pool_size()
    }

    /// Stop the pool; see [`WorkerPool::shutdown`].
    pub fn shutdown(&self, drain: Duration) -> bool {
        self.pool.shutdown(drain)
    }

    fn run<T, F>(&self, call: F) -> PendingOp<T>
    where
        F: FnOnce(&S) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.pool.submit(move || call(inner.as_ref()))
    }

    pub fn clear_async(&self) -> PendingOp<()> {
        self.run(|s| s.clear())
    }

    pub fn get_async(&self, key: S::Key) -> PendingOp<Option<S::Value>> {
        self.run(move |s| s.get(&key))
    }

    pub fn get_many_async(&self, keys: Vec<S::Key>) -> PendingOp<HashMap<S::Key, S::Value>> {
        self.run(move |s| s.get_many(&keys))
    }

    pub fn put_async(&self, key: S::Key, value: S::Value) -> PendingOp<()> {
        self.run(move |s| s.put(key, value))
    }

    pub fn put_many_async(&self, entries: HashMap<S::Key, S::Value>) -> PendingOp<ItemCount> {
        self.run(move |s| s.put_many(entries))
    }

    pub fn delete_async(&self, key: S::Key) -> PendingOp<ItemCount> {
        self.run(move |s| s.delete(&key))
    }

    pub fn delete_many_async(&self, keys: Vec<S::Key>) -> PendingOp<ItemCount> {
        self.run(move |s| s.delete_many(&keys))
    }

    pub fn size_async(&self) -> PendingOp<ItemCount> {
        self.run(|s| s.size())
    }

    pub fn describe_async(&self) -> PendingOp<String> {
        self.run(|s| Ok(s.describe().to_string()))
    }

    pub fn dump_async(&self) -> PendingOp<String> {
        self.run(|s| s.dump())
    }
}

impl<S: KeyValueStore + 'static> KeyValueStore for AsyncStore<S> {
    type Key = S::Key;
    type Value = S::Value;

    fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear()
    }

    fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, StorageError> {
        self.inner.get(key)
    }

    fn get_many(
        &self,
        keys: &[Self::Key],
    ) -> Result<HashMap<Self::Key, Self::Value>, StorageError> {
        self.inner.get_many(keys)
    }

    fn put(&self, key: Self::Key, value: Self::Value) -> Result<(), StorageError> {
        self.inner.put(key, value)
    }

    fn put_many(
        &self,
        entries: HashMap<Self::Key, Self::Value>,
    ) -> Result<ItemCount, StorageError> {
        self.inner.put_many(entries)
    }

    fn delete(&self, key: &Self::Key) -> Result<ItemCount, StorageError> {
        self.inner.delete(key)
    }

    fn delete_many(&self, keys: &[Self::Key]) -> Result<ItemCount, StorageError> {
        self.inner.delete_many(keys)
    }

    fn size(&self) -> Result<ItemCount, StorageError> {
        self.inner.size()
    }

    fn describe(&self) -> &str {
        self.inner.describe()
    }

    fn dump(&self) -> Result<String, StorageError> {
        self.inner.dump()
    }
}
