// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core storage contract for kvstack.
//
// Defines the `KeyValueStore` trait that every backend and every decorator
// implements. Because decorators implement the same trait they wrap, they can
// be stacked in any order on top of any backend. Calls are blocking; the
// `async_store` module turns them into pooled, non-blocking calls.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Add;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// A count reported by a storage operation.
///
/// Some backends cannot say how many entries an operation touched (a cache
/// that invalidates blindly, a remote store that does not echo counts). They
/// report [`ItemCount::Unknown`] rather than a made-up number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCount {
    /// The backend reported this exact number.
    Exact(u64),
    /// The backend does not report a count for this operation.
    Unknown,
}

impl ItemCount {
    /// The exact count, if the backend reported one.
    pub fn exact(self) -> Option<u64> {
        match self {
            ItemCount::Exact(n) => Some(n),
            ItemCount::Unknown => None,
        }
    }

    /// Returns true if the backend did not report a count.
    pub fn is_unknown(self) -> bool {
        matches!(self, ItemCount::Unknown)
    }
}

impl From<u64> for ItemCount {
    fn from(n: u64) -> Self {
        ItemCount::Exact(n)
    }
}

impl Add for ItemCount {
    type Output = ItemCount;

    /// Unknown is absorbing: one unknown term makes the sum unknown.
    fn add(self, rhs: ItemCount) -> ItemCount {
        match (self, rhs) {
            (ItemCount::Exact(a), ItemCount::Exact(b)) => ItemCount::Exact(a.saturating_add(b)),
            _ => ItemCount::Unknown,
        }
    }
}

impl fmt::Display for ItemCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCount::Exact(n) => write!(f, "{n}"),
            ItemCount::Unknown => write!(f, "unknown"),
        }
    }
}

/// A blocking key-value store.
///
/// Backends wrap an existing client library; decorators wrap another
/// `KeyValueStore`. Callers cannot tell the two apart, which is what makes
/// decorators composable.
///
/// Implementations must be safe to share across threads. The async
/// decorator calls them from its worker pool.
pub trait KeyValueStore: Send + Sync {
    /// Key type.
    type Key: Eq + Hash + Clone + Send + Sync + 'static;
    /// Value type.
    type Value: Send + Sync + 'static;

    /// Remove every entry from the store.
    fn clear(&self) -> Result<(), StorageError>;

    /// Retrieve the value associated with `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist, rather than an error.
    fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, StorageError>;

    /// Retrieve several keys at once.
    ///
    /// Keys with no value are left out of the returned map. The default
    /// implementation calls [`get`](Self::get) once per key.
    fn get_many(
        &self,
        keys: &[Self::Key],
    ) -> Result<HashMap<Self::Key, Self::Value>, StorageError> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    /// Store a key-value pair, overwriting any previous value for `key`.
    fn put(&self, key: Self::Key, value: Self::Value) -> Result<(), StorageError>;

    /// Store several key-value pairs.
    ///
    /// The default implementation calls [`put`](Self::put) once per entry
    /// and reports how many were stored.
    fn put_many(
        &self,
        entries: HashMap<Self::Key, Self::Value>,
    ) -> Result<ItemCount, StorageError> {
        let mut stored = 0u64;
        for (key, value) in entries {
            self.put(key, value)?;
            stored += 1;
        }
        Ok(ItemCount::Exact(stored))
    }

    /// Delete the value associated with `key`.
    ///
    /// Reports `Exact(1)` if the key existed, `Exact(0)` if it did not, or
    /// `Unknown` if the backend cannot tell.
    fn delete(&self, key: &Self::Key) -> Result<ItemCount, StorageError>;

    /// Delete several keys.
    ///
    /// The default implementation sums the counts of per-key
    /// [`delete`](Self::delete) calls.
    fn delete_many(&self, keys: &[Self::Key]) -> Result<ItemCount, StorageError> {
        let mut deleted = ItemCount::Exact(0);
        for key in keys {
            deleted = deleted + self.delete(key)?;
        }
        Ok(deleted)
    }

    /// Number of entries currently stored.
    fn size(&self) -> Result<ItemCount, StorageError>;

    /// A label identifying the kind of backend, constant per instance.
    fn describe(&self) -> &str;

    /// Human-readable rendering of the whole store, for diagnostics only.
    fn dump(&self) -> Result<String, StorageError>;
}

macro_rules! forward_store {
    ($($ptr:ident),*) => {$(
        impl<S: KeyValueStore + ?Sized> KeyValueStore for $ptr<S> {
            type Key = S::Key;
            type Value = S::Value;

            fn clear(&self) -> Result<(), StorageError> {
                (**self).clear()
            }

            fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, StorageError> {
                (**self).get(key)
            }

            fn get_many(
                &self,
                keys: &[Self::Key],
            ) -> Result<HashMap<Self::Key, Self::Value>, StorageError> {
                (**self).get_many(keys)
            }

            fn put(&self, key: Self::Key, value: Self::Value) -> Result<(), StorageError> {
                (**self).put(key, value)
            }

            fn put_many(
                &self,
                entries: HashMap<Self::Key, Self::Value>,
            ) -> Result<ItemCount, StorageError> {
                (**self).put_many(entries)
            }

            fn delete(&self, key: &Self::Key) -> Result<ItemCount, StorageError> {
                (**self).delete(key)
            }

            fn delete_many(&self, keys: &[Self::Key]) -> Result<ItemCount, StorageError> {
                (**self).delete_many(keys)
            }

            fn size(&self) -> Result<ItemCount, StorageError> {
                (**self).size()
            }

            fn describe(&self) -> &str {
                (**self).describe()
            }

            fn dump(&self) -> Result<String, StorageError> {
                (**self).dump()
            }
        }
    )*};
}

// Lets one backend be shared between a raw handle and a decorated one.
forward_store!(Arc, Box);
