// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kvstack Storage Contract and Decorators
//
// This crate provides a uniform key-value storage contract and two decorators
// that stack on top of any implementation of it. The `KeyValueStore` trait is
// implemented identically by backends and by decorators, so a caller cannot
// tell a decorated store from a bare one except through the extra methods.
//
// # Modules
//
// - [`backend`] -- The `KeyValueStore` trait and the `ItemCount` result type.
// - [`error`] -- Storage, configuration and async-handle error enums.
// - [`memory`] -- An in-memory `BTreeMap`-based backend.
// - [`operation`] -- The `OperationType` enumeration statistics are keyed by.
// - [`stats`] -- Latency ring buffers, per-operation and store-wide statistics.
// - [`monitored`] -- A wrapper that times every call into `StorageStats`.
// - [`pool`] -- The worker pool and `PendingOp` handles.
// - [`async_store`] -- A wrapper that runs calls on the worker pool.
// - [`config`] -- Serde configuration for both decorators.
//
// # Example
//
// ```rust
// use kvstack_storage::{AsyncStore, InMemoryStore, KeyValueStore, MonitoredStore, OperationType};
//
// // Monitor an in-memory backend, then make it asynchronous.
// let monitored = MonitoredStore::new(InMemoryStore::new(), 10).unwrap();
// let store = AsyncStore::new(monitored, 4).unwrap();
//
// store.put_async("k".to_string(), 1u64).wait().unwrap();
// assert_eq!(store.get(&"k".to_string()).unwrap(), Some(1));
//
// let stats = store.inner().stats();
// assert_eq!(stats.for_type(OperationType::Put).count(), 1);
// assert_eq!(stats.for_type(OperationType::Get).count(), 1);
// ```

pub mod async_store;
pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod monitored;
pub mod operation;
pub mod pool;
pub mod stats;

// Re-export the most commonly used types at the crate root for convenience.
pub use async_store::AsyncStore;
pub use backend::{ItemCount, KeyValueStore};
pub use config::{MonitorConfig, PoolConfig, StackConfig};
pub use error::{AsyncError, ConfigError, StorageError};
pub use memory::InMemoryStore;
pub use monitored::MonitoredStore;
pub use operation::OperationType;
pub use pool::{PendingOp, WorkerPool};
pub use stats::{LatencySummary, StatsSnapshot, StorageStats};
