// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory storage backend for kvstack.
//
// Uses a `BTreeMap` behind a `std::sync::RwLock` for thread-safe, ordered
// key-value storage. Ordering keeps `dump()` output stable and gives the
// optional entry limit a deterministic eviction victim.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Write as _};
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::backend::{ItemCount, KeyValueStore};
use crate::error::{ConfigError, StorageError};

/// An in-memory storage backend backed by a sorted `BTreeMap`.
///
/// All data lives in process memory and is lost on drop. Clones share the
/// same map, so a clone handed to a decorator sees every write made through
/// the original.
///
/// # Example
///
/// ```rust
/// use kvstack_storage::memory::InMemoryStore;
/// use kvstack_storage::backend::{ItemCount, KeyValueStore};
///
/// let store = InMemoryStore::new();
/// store.put("hello".to_string(), 1).unwrap();
/// assert_eq!(store.get(&"hello".to_string()).unwrap(), Some(1));
/// assert_eq!(store.size().unwrap(), ItemCount::Exact(1));
/// ```
#[derive(Debug)]
pub struct InMemoryStore<K, V> {
    /// The underlying sorted map, protected by a read-write lock.
    data: Arc<RwLock<BTreeMap<K, V>>>,
    /// Upper bound on stored entries; `None` means unbounded.
    max_entries: Option<usize>,
}

impl<K: Ord, V> InMemoryStore<K, V> {
    /// Create a new, empty, unbounded store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            max_entries: None,
        }
    }

    /// Create a store that holds at most `max_entries` entries.
    ///
    /// Once full, inserting a new key evicts the smallest stored key.
    pub fn with_max_entries(max_entries: usize) -> Result<Self, ConfigError> {
        if max_entries == 0 {
            return Err(ConfigError::NotPositive {
                name: "max entries",
                value: max_entries,
            });
        }
        debug!(max_entries, "created bounded in-memory store");
        Ok(Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            max_entries: Some(max_entries),
        })
    }

    /// The entry limit, if any.
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Return the number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Return true if the store contains no keys.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // The map is never left half-updated by a panicking writer, so a
    // poisoned lock still guards a usable map.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<K, V>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<K, V>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_bounded(&self, map: &mut BTreeMap<K, V>, key: K, value: V) {
        if let Some(limit) = self.max_entries {
            if !map.contains_key(&key) && map.len() >= limit {
                map.pop_first();
            }
        }
        map.insert(key, value);
    }
}

impl<K, V> Clone for InMemoryStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            max_entries: self.max_entries,
        }
    }
}

impl<K: Ord, V> Default for InMemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyValueStore for InMemoryStore<K, V>
where
    K: Ord + Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn clear(&self) -> Result<(), StorageError> {
        self.write().clear();
        Ok(())
    }

    fn get(&self, key: &K) -> Result<Option<V>, StorageError> {
        Ok(self.read().get(key).cloned())
    }

    fn get_many(&self, keys: &[K]) -> Result<HashMap<K, V>, StorageError> {
        let map = self.read();
        let found = keys
            .iter()
            .filter_map(|key| map.get(key).map(|value| (key.clone(), value.clone())))
            .collect();
        Ok(found)
    }

    fn put(&self, key: K, value: V) -> Result<(), StorageError> {
        let mut map = self.write();
        self.insert_bounded(&mut map, key, value);
        Ok(())
    }

    fn put_many(&self, entries: HashMap<K, V>) -> Result<ItemCount, StorageError> {
        let mut map = self.write();
        let stored = entries.len() as u64;
        for (key, value) in entries {
            self.insert_bounded(&mut map, key, value);
        }
        Ok(ItemCount::Exact(stored))
    }

    fn delete(&self, key: &K) -> Result<ItemCount, StorageError> {
        let removed = self.write().remove(key).is_some();
        Ok(ItemCount::Exact(u64::from(removed)))
    }

    fn delete_many(&self, keys: &[K]) -> Result<ItemCount, StorageError> {
        let mut map = self.write();
        let removed = keys.iter().filter(|key| map.remove(*key).is_some()).count();
        Ok(ItemCount::Exact(removed as u64))
    }

    fn size(&self) -> Result<ItemCount, StorageError> {
        Ok(ItemCount::Exact(self.read().len() as u64))
    }

    fn describe(&self) -> &str {
        "in-memory"
    }

    fn dump(&self) -> Result<String, StorageError> {
        let map = self.read();
        let mut out = String::from("Contents of entire store\n\n");
        for (key, value) in map.iter() {
            let _ = writeln!(out, "{key:?} => {value:?}");
        }
        let _ = writeln!(out, "\nStore size is: {}", map.len());
        Ok(out)
    }
}
