// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for the kvstack storage layer.
//
// `StorageError` is what a backend reports, and both decorators forward it
// untouched. `ConfigError` rejects a backend or decorator at construction.
// `AsyncError` is what an async handle resolves to.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that a storage backend may report for any contract operation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a value.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The stored data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The storage backend is not available (e.g., connection lost).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected or failed the operation for another reason.
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// Errors raised while building a backend, decorator, or configuration.
///
/// These are fatal: the value being built is never handed out.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A size parameter that must be at least 1 was zero.
    #[error("invalid {name}: {value} (must be at least 1)")]
    NotPositive {
        /// Name of the offending parameter.
        name: &'static str,
        /// The value that was supplied.
        value: usize,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration from {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid JSON for the expected shape.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The worker pool's threads could not be started.
    #[error("failed to start worker pool: {0}")]
    PoolStartup(#[source] std::io::Error),
}

/// Errors an async handle resolves to.
///
/// A backend failure is carried unchanged in [`AsyncError::Storage`]; every
/// other variant means the backend operation produced no result.
#[derive(Debug, Error)]
pub enum AsyncError {
    /// The wrapped store reported an error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The pool already held `capacity` unfinished submissions.
    #[error("worker pool queue is full ({capacity} pending operations)")]
    QueueFull {
        /// The configured pending-operation limit.
        capacity: usize,
    },

    /// The pool was shut down before the operation could be submitted.
    #[error("worker pool has been shut down")]
    ShutDown,

    /// The operation was cancelled before it started.
    #[error("operation was cancelled before it started")]
    Cancelled,

    /// The backend call panicked on a worker thread.
    #[error("storage operation panicked: {0}")]
    Panicked(String),

    /// The caller stopped waiting for the result.
    #[error("operation did not complete within {0:?}")]
    TimedOut(Duration),
}

impl AsyncError {
    /// Return the backend error if this failure came from the wrapped store.
    pub fn as_storage(&self) -> Option<&StorageError> {
        match self {
            AsyncError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file gone");
        let err = StorageError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_backend_unavailable_display() {
        let err = StorageError::BackendUnavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "backend unavailable: connection refused");
    }

    #[test]
    fn test_not_positive_display() {
        let err = ConfigError::NotPositive {
            name: "pool size",
            value: 0,
        };
        assert_eq!(err.to_string(), "invalid pool size: 0 (must be at least 1)");
    }

    #[test]
    fn test_read_error_names_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/kvstack.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/kvstack.json"));
    }

    #[test]
    fn test_storage_error_is_transparent_through_async_error() {
        let err: AsyncError = StorageError::CorruptedData("checksum mismatch".into()).into();
        assert_eq!(err.to_string(), "corrupted data: checksum mismatch");
        assert!(matches!(
            err.as_storage(),
            Some(StorageError::CorruptedData(_))
        ));
    }

    #[test]
    fn test_pool_errors_have_no_storage_source() {
        assert!(AsyncError::ShutDown.as_storage().is_none());
        let full = AsyncError::QueueFull { capacity: 8 };
        assert!(full.to_string().contains("8 pending"));
    }
}
