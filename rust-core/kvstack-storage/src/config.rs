// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Decorator configuration.
//!
//! Defaults:
//! - history_size: 10 recent samples per operation type
//! - pool_size: 4 workers, unbounded queue
//! - shutdown_drain_ms: 5000

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for [`MonitoredStore`](crate::monitored::MonitoredStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Recent latency samples kept per operation type.
    pub history_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { history_size: 10 }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("history size", self.history_size)
    }
}

/// Configuration for [`WorkerPool`](crate::pool::WorkerPool) and
/// [`AsyncStore`](crate::async_store::AsyncStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Backend calls allowed to run at once.
    pub pool_size: usize,
    /// Submitted but unfinished operations allowed before new submissions
    /// are rejected. `None` never rejects.
    pub max_pending: Option<usize>,
    /// How long `shutdown` waits for queued work, in milliseconds.
    pub shutdown_drain_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            max_pending: None,
            shutdown_drain_ms: 5000,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("pool size", self.pool_size)?;
        if let Some(max_pending) = self.max_pending {
            positive("max pending", max_pending)?;
        }
        Ok(())
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.shutdown_drain_ms)
    }
}

/// Configuration for a fully decorated store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub monitor: MonitorConfig,
    pub pool: PoolConfig,
}

impl StackConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: StackConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()?;
        self.pool.validate()
    }
}

fn positive(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NotPositive { name, value });
    }
    Ok(())
}
