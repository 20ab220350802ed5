// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mixed read/write workload driven through the async path of a decorated store.

use kvstack_storage::{AsyncError, AsyncStore, ItemCount, KeyValueStore, PendingOp};
use tracing::{debug, info};

/// Keys per `get_many` batch.
const BATCH: usize = 16;

/// Shape of one probe run.
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    pub keys: usize,
    pub rounds: usize,
}

/// What the workload observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadOutcome {
    pub hits: u64,
    pub misses: u64,
    pub batch_found: u64,
    pub deleted: ItemCount,
}

fn present(i: usize) -> String {
    format!("key-{i}")
}

fn absent(i: usize) -> String {
    format!("missing-{i}")
}

fn wait_all<T>(ops: Vec<PendingOp<T>>) -> Result<Vec<T>, AsyncError> {
    ops.into_iter().map(PendingOp::wait).collect()
}

impl Workload {
    /// Populate, read and delete through `store`. Leaves the store empty.
    pub fn run<S>(&self, store: &AsyncStore<S>) -> Result<WorkloadOutcome, AsyncError>
    where
        S: KeyValueStore<Key = String, Value = u64> + 'static,
    {
        info!(keys = self.keys, rounds = self.rounds, "populating store");
        wait_all(
            (0..self.keys)
                .map(|i| store.put_async(present(i), i as u64))
                .collect(),
        )?;

        let mut outcome = WorkloadOutcome {
            hits: 0,
            misses: 0,
            batch_found: 0,
            deleted: ItemCount::Exact(0),
        };

        for round in 0..self.rounds {
            let hits = wait_all((0..self.keys).map(|i| store.get_async(present(i))).collect())?;
            outcome.hits += hits.iter().filter(|v| v.is_some()).count() as u64;

            let misses = wait_all(
                (0..self.keys.div_ceil(2))
                    .map(|i| store.get_async(absent(i)))
                    .collect(),
            )?;
            outcome.misses += misses.iter().filter(|v| v.is_none()).count() as u64;

            let batches: Vec<Vec<String>> = (0..self.keys)
                .collect::<Vec<_>>()
                .chunks(BATCH)
                .map(|chunk| chunk.iter().map(|i| present(*i)).collect())
                .collect();
            let found = wait_all(
                batches
                    .into_iter()
                    .map(|keys| store.get_many_async(keys))
                    .collect(),
            )?;
            outcome.batch_found += found.iter().map(|m| m.len() as u64).sum::<u64>();

            let size = store.size_async().wait()?;
            debug!(round, %size, "round complete");
        }

        let half = self.keys / 2;
        let batch_deleted = store
            .delete_many_async((0..half).map(present).collect())
            .wait()?;
        let single_deleted = wait_all(
            (half..self.keys)
                .map(|i| store.delete_async(present(i)))
                .collect(),
        )?;
        outcome.deleted = single_deleted
            .into_iter()
            .fold(batch_deleted, |total, n| total + n);

        let label = store.describe_async().wait()?;
        info!(store_type = %label, deleted = %outcome.deleted, "workload finished");
        Ok(outcome)
    }
}
