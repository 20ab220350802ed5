// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! kvstack-probe: drives a workload through a monitored, pooled store.
//!
//! Builds `AsyncStore<MonitoredStore<InMemoryStore>>`, populates it through
//! the worker pool, runs rounds of hit reads, miss reads and batch reads,
//! deletes everything, and prints the collected latency statistics.

mod report;
mod workload;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use kvstack_storage::{
    AsyncError, AsyncStore, ConfigError, InMemoryStore, MonitoredStore, StackConfig,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::workload::Workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "kvstack-probe", version, about = "Latency probe for kvstack decorators")]
struct Cli {
    /// JSON configuration file (monitor and pool sections).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker pool size, overriding the configuration.
    #[arg(long)]
    pool_size: Option<usize>,

    /// Recent samples kept per operation type, overriding the configuration.
    #[arg(long)]
    history: Option<usize>,

    /// Number of distinct keys to write.
    #[arg(long, default_value_t = 1000)]
    keys: usize,

    /// Read rounds over the key set.
    #[arg(long, default_value_t = 3)]
    rounds: usize,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Error)]
enum ProbeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("workload failed: {0}")]
    Workload(#[from] AsyncError),

    #[error("failed to render statistics: {0}")]
    Render(#[from] serde_json::Error),
}

impl Cli {
    fn stack_config(&self) -> Result<StackConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => StackConfig::load(path)?,
            None => StackConfig::default(),
        };
        if let Some(pool_size) = self.pool_size {
            config.pool.pool_size = pool_size;
        }
        if let Some(history) = self.history {
            config.monitor.history_size = history;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<String, ProbeError> {
    let config = cli.stack_config()?;

    let monitored = MonitoredStore::with_config(InMemoryStore::<String, u64>::new(), &config.monitor)?;
    let store = AsyncStore::with_config(monitored, &config.pool)?;

    let workload = Workload {
        keys: cli.keys,
        rounds: cli.rounds,
    };
    let outcome = workload.run(&store)?;
    info!(
        hits = outcome.hits,
        misses = outcome.misses,
        batch_found = outcome.batch_found,
        "reads complete"
    );

    let stats = store.inner().stats();
    stats.set_interval_end();

    if !store.shutdown(config.pool.shutdown_drain()) {
        warn!("worker pool did not drain before the deadline");
    }

    match cli.format {
        OutputFormat::Text => Ok(report::text(&stats)),
        OutputFormat::Json => Ok(report::json(&stats)?),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "probe failed");
            ExitCode::FAILURE
        }
    }
}
