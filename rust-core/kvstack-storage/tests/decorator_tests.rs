// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for stacking the monitoring and async decorators.
//!
//! Checks that each decorator forwards results and errors unchanged in
//! either stacking order, and covers the end-to-end usage scenarios.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kvstack_storage::{
    AsyncError, AsyncStore, InMemoryStore, ItemCount, KeyValueStore, MonitoredStore,
    OperationType, StackConfig, StorageError, StorageStats,
};

fn key(s: &str) -> String {
    s.to_string()
}

/// Backend that can be switched into a failing state and never reports counts.
#[derive(Default)]
struct FlakyStore {
    data: InMemoryStore<String, i32>,
    failing: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::BackendUnavailable("flaky".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    type Key = String;
    type Value = i32;

    fn clear(&self) -> Result<(), StorageError> {
        self.check()?;
        self.data.clear()
    }

    fn get(&self, key: &String) -> Result<Option<i32>, StorageError> {
        self.check()?;
        self.data.get(key)
    }

    fn put(&self, key: String, value: i32) -> Result<(), StorageError> {
        self.check()?;
        self.data.put(key, value)
    }

    fn delete(&self, key: &String) -> Result<ItemCount, StorageError> {
        self.check()?;
        self.data.delete(key)?;
        Ok(ItemCount::Unknown)
    }

    fn size(&self) -> Result<ItemCount, StorageError> {
        self.check()?;
        Ok(ItemCount::Unknown)
    }

    fn describe(&self) -> &str {
        "flaky"
    }

    fn dump(&self) -> Result<String, StorageError> {
        self.check()?;
        self.data.dump()
    }
}

#[test]
fn test_monitored_end_to_end_scenario() {
    let store = MonitoredStore::new(InMemoryStore::new(), 10).unwrap();
    assert_eq!(store.size().unwrap(), ItemCount::Exact(0));

    store.put(key("k"), 1).unwrap();
    assert_eq!(store.get(&key("k")).unwrap(), Some(1));
    assert_eq!(store.delete(&key("k")).unwrap(), ItemCount::Exact(1));
    assert_eq!(store.get(&key("k")).unwrap(), None);

    let stats = store.stats();
    assert_eq!(stats.for_type(OperationType::Get).count(), 2);
    assert_eq!(stats.for_type(OperationType::Put).count(), 1);
    assert_eq!(stats.for_type(OperationType::Delete).count(), 1);
    assert_eq!(stats.for_type(OperationType::Size).count(), 1);
    for op in OperationType::ALL {
        assert!(stats.for_type(op).total_time() >= Duration::ZERO);
    }
}

#[test]
fn test_async_end_to_end_scenario() {
    let store = AsyncStore::new(InMemoryStore::<String, usize>::new(), 4).unwrap();

    let puts: Vec<_> = (0..100)
        .map(|i| store.put_async(format!("key_{i}"), i))
        .collect();
    for put in puts {
        put.wait().unwrap();
    }

    let gets: Vec<_> = (0..100)
        .map(|i| (i, store.get_async(format!("key_{i}"))))
        .collect();
    for (i, get) in gets {
        assert_eq!(get.wait().unwrap(), Some(i));
    }
    assert_eq!(store.size().unwrap(), ItemCount::Exact(100));
}

#[test]
fn test_async_over_monitored_records_worker_calls() {
    let monitored = MonitoredStore::new(InMemoryStore::new(), 5).unwrap();
    let store = AsyncStore::new(monitored, 3).unwrap();

    let puts: Vec<_> = (0..20).map(|i| store.put_async(format!("k{i}"), i)).collect();
    for put in puts {
        put.wait().unwrap();
    }
    store.get_many_async(vec![key("k1"), key("k2")]).wait().unwrap();
    // Sync path goes through the same monitored store.
    store.get(&key("k3")).unwrap();

    let stats = store.inner().stats();
    assert_eq!(stats.for_type(OperationType::Put).count(), 20);
    assert_eq!(stats.for_type(OperationType::GetMany).count(), 1);
    assert_eq!(stats.for_type(OperationType::Get).count(), 1);
    assert_eq!(stats.for_type(OperationType::Put).recent_latencies().len(), 5);
    assert_eq!(stats.count(), 22);
}

#[test]
fn test_monitored_over_async_times_only_sync_calls() {
    let async_store = AsyncStore::new(InMemoryStore::new(), 2).unwrap();
    let store = MonitoredStore::new(async_store, 5).unwrap();

    store.put(key("a"), 1).unwrap();
    // Async calls bypass the outer monitor.
    store.inner().put_async(key("b"), 2).wait().unwrap();

    assert_eq!(store.get(&key("b")).unwrap(), Some(2));
    assert_eq!(store.describe(), "in-memory");

    let stats = store.stats();
    assert_eq!(stats.for_type(OperationType::Put).count(), 1);
    assert_eq!(stats.for_type(OperationType::Get).count(), 1);
    assert_eq!(stats.store_type(), "in-memory");
}

#[test]
fn test_backend_errors_pass_through_both_orders() {
    let flaky = Arc::new(FlakyStore::default());
    let async_over_monitored =
        AsyncStore::new(MonitoredStore::new(Arc::clone(&flaky), 4).unwrap(), 2).unwrap();
    let monitored_over_async =
        MonitoredStore::new(AsyncStore::new(Arc::clone(&flaky), 2).unwrap(), 4).unwrap();

    flaky.failing.store(true, Ordering::SeqCst);

    let direct = flaky.get(&key("a")).unwrap_err().to_string();
    let sync_one = async_over_monitored.get(&key("a")).unwrap_err().to_string();
    let sync_two = monitored_over_async.get(&key("a")).unwrap_err().to_string();
    assert_eq!(direct, sync_one);
    assert_eq!(direct, sync_two);

    let pooled = async_over_monitored.get_async(key("a")).wait().unwrap_err();
    assert!(matches!(
        pooled.as_storage(),
        Some(StorageError::BackendUnavailable(m)) if m == "flaky"
    ));
    assert_eq!(pooled.to_string(), direct);

    // Failed calls are still timed.
    let stats = async_over_monitored.inner().stats();
    assert_eq!(stats.for_type(OperationType::Get).count(), 2);
    assert_eq!(monitored_over_async.stats().for_type(OperationType::Get).count(), 1);
}

#[test]
fn test_unknown_counts_pass_through() {
    let store = MonitoredStore::new(FlakyStore::default(), 4).unwrap();
    store.put(key("a"), 1).unwrap();
    store.put(key("b"), 2).unwrap();

    assert_eq!(store.delete(&key("a")).unwrap(), ItemCount::Unknown);
    // Default batch delete sums per-key counts; one unknown makes it unknown.
    assert_eq!(
        store.delete_many(&[key("b"), key("c")]).unwrap(),
        ItemCount::Unknown
    );
    assert!(store.size().unwrap().is_unknown());
}

#[test]
fn test_sync_and_async_forms_agree_on_shared_state() {
    let backend = Arc::new(InMemoryStore::<String, i32>::new());
    let store = AsyncStore::new(Arc::clone(&backend), 2).unwrap();

    let entries: HashMap<String, i32> = (0..8).map(|i| (format!("k{i}"), i)).collect();
    backend.put_many(entries).unwrap();

    let keys: Vec<String> = (0..10).map(|i| format!("k{i}")).collect();
    assert_eq!(
        store.get_many_async(keys.clone()).wait().unwrap(),
        store.get_many(&keys).unwrap()
    );
    assert_eq!(store.size_async().wait().unwrap(), store.size().unwrap());
    assert_eq!(store.dump_async().wait().unwrap(), backend.dump().unwrap());
}

#[test]
fn test_reset_stats_while_async_work_runs() {
    let store = AsyncStore::new(MonitoredStore::new(InMemoryStore::new(), 4).unwrap(), 2).unwrap();

    for i in 0..10 {
        store.put_async(format!("k{i}"), i).wait().unwrap();
    }
    let before = store.inner().reset_stats();
    store.get_async(key("k1")).wait().unwrap();

    assert_eq!(before.for_type(OperationType::Put).count(), 10);
    let after = store.inner().stats();
    assert_eq!(after.for_type(OperationType::Put).count(), 0);
    assert_eq!(after.for_type(OperationType::Get).count(), 1);
}

#[test]
fn test_restored_snapshot_keeps_counting() {
    let first = MonitoredStore::new(InMemoryStore::new(), 4).unwrap();
    first.put(key("a"), 1).unwrap();
    let snapshot = first.stats().snapshot();

    let second = MonitoredStore::new(InMemoryStore::new(), 4).unwrap();
    second.set_stats(Arc::new(StorageStats::from_snapshot(&snapshot).unwrap()));
    second.put(key("b"), 2).unwrap();

    assert_eq!(second.stats().for_type(OperationType::Put).count(), 2);
}

#[test]
fn test_stack_built_from_config() {
    let config =
        StackConfig::from_json_str(r#"{"monitor": {"history_size": 3}, "pool": {"pool_size": 2}}"#)
            .unwrap();
    let monitored = MonitoredStore::with_config(InMemoryStore::new(), &config.monitor).unwrap();
    let store = AsyncStore::with_config(monitored, &config.pool).unwrap();

    for i in 0..5 {
        store.put_async(format!("k{i}"), i).wait().unwrap();
    }
    assert_eq!(store.pool_size(), 2);
    assert_eq!(
        store.inner().stats().for_type(OperationType::Put).recent_latencies().len(),
        3
    );
    assert!(store.shutdown(config.pool.shutdown_drain()));
    assert!(matches!(
        store.size_async().wait(),
        Err(AsyncError::ShutDown)
    ));
}
