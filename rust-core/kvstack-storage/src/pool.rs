// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed-size worker pool for blocking storage calls.
//
// Each pool owns a dedicated tokio runtime whose blocking-thread limit is the
// pool size. Submissions go through `spawn_blocking`, so at most `pool_size`
// calls run at once and the rest wait in the runtime's queue. Results come
// back through `PendingOp`, which can be awaited from any executor or waited
// on from a plain thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::{AsyncError, ConfigError, StorageError};

/// Count of submitted operations that have not finished yet.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new operation unless `limit` operations are already pending.
    fn try_enter(self: &Arc<Self>, limit: Option<usize>) -> Option<InFlightGuard> {
        let mut count = self.lock();
        if limit.is_some_and(|limit| *count >= limit) {
            return None;
        }
        *count += 1;
        Some(InFlightGuard(Arc::clone(self)))
    }

    fn current(&self) -> usize {
        *self.lock()
    }

    /// Block until nothing is pending or `timeout` elapses. Returns true if idle.
    fn wait_idle(&self, timeout: Duration) -> bool {
        let count = self.lock();
        let (count, _) = self
            .idle
            .wait_timeout_while(count, timeout, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }
}

/// Held by a submitted closure; dropping it marks the operation finished,
/// including when the closure panics or is cancelled before running.
#[derive(Debug)]
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// A fixed-size pool of threads running blocking storage calls.
///
/// The queue is unbounded unless `max_pending` is set, in which case a
/// submission made while `max_pending` operations are unfinished is
/// rejected with [`AsyncError::QueueFull`]. Submissions never block.
///
/// Dropping the pool stops it without waiting. Operations still queued at
/// that point resolve to [`AsyncError::ShutDown`]; operations already
/// running finish on their thread.
#[derive(Debug)]
pub struct WorkerPool {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    pool_size: usize,
    max_pending: Option<usize>,
    accepting: AtomicBool,
    in_flight: Arc<InFlight>,
}

impl WorkerPool {
    /// Start a pool of `pool_size` threads with an unbounded queue.
    pub fn new(pool_size: usize) -> Result<Self, ConfigError> {
        Self::with_config(&PoolConfig {
            pool_size,
            ..PoolConfig::default()
        })
    }

    pub fn with_config(config: &PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.pool_size)
            .thread_name("kvstack-worker")
            .enable_time()
            .build()
            .map_err(ConfigError::PoolStartup)?;

        debug!(
            pool_size = config.pool_size,
            max_pending = ?config.max_pending,
            "started worker pool"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            pool_size: config.pool_size,
            max_pending: config.max_pending,
            accepting: AtomicBool::new(true),
            in_flight: Arc::new(InFlight::default()),
        })
    }

    /// Queue `task` and return a handle to its result.
    ///
    /// A submission that is not accepted yields a handle that is already
    /// resolved to [`AsyncError::ShutDown`] or [`AsyncError::QueueFull`].
    pub fn submit<T, F>(&self, task: F) -> PendingOp<T>
    where
        F: FnOnce() -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        if !self.accepting.load(Ordering::SeqCst) {
            warn!("rejected submission to a shut down worker pool");
            return PendingOp::rejected(AsyncError::ShutDown);
        }

        let Some(guard) = self.in_flight.try_enter(self.max_pending) else {
            let capacity = self.max_pending.unwrap_or_default();
            warn!(capacity, "worker pool queue is full, rejecting submission");
            return PendingOp::rejected(AsyncError::QueueFull { capacity });
        };

        let handle = self.handle.spawn_blocking(move || {
            let _guard = guard;
            task()
        });
        PendingOp::spawned(handle)
    }

    /// Stop accepting work, wait up to `drain` for pending operations, then
    /// release the threads.
    ///
    /// Returns true if every submitted operation finished within `drain`.
    /// Operations still queued after the drain resolve to
    /// [`AsyncError::ShutDown`]. Calling this again only reports whether the
    /// pool is idle.
    pub fn shutdown(&self, drain: Duration) -> bool {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            return self.in_flight.current() == 0;
        }

        debug!(
            pending = self.in_flight.current(),
            drain_ms = drain.as_millis() as u64,
            "shutting down worker pool"
        );
        let drained = self.in_flight.wait_idle(drain);
        if !drained {
            warn!(
                pending = self.in_flight.current(),
                "worker pool drain timed out, abandoning queued operations"
            );
        }
        self.release_runtime();
        drained
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn max_pending(&self) -> Option<usize> {
        self.max_pending
    }

    /// Operations submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    pub fn is_shut_down(&self) -> bool {
        !self.accepting.load(Ordering::SeqCst)
    }

    // Background shutdown never blocks, so it is safe inside an async context.
    fn release_runtime(&self) {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.release_runtime();
    }
}

enum PendingState<T> {
    Spawned {
        handle: JoinHandle<Result<T, StorageError>>,
        cancel_requested: AtomicBool,
    },
    Rejected(Option<AsyncError>),
}

/// Handle to the eventual result of a pooled operation.
///
/// Await it from any executor, or call [`wait`](Self::wait) from a plain
/// thread. Waiting on one handle never waits on unrelated operations.
///
/// Dropping the handle does not stop the operation.
///
/// # Example
///
/// ```rust
/// use kvstack_storage::pool::WorkerPool;
///
/// let pool = WorkerPool::new(2).unwrap();
/// let op = pool.submit(|| Ok("done"));
///
/// # tokio_test::block_on(async {
/// assert_eq!(op.await.unwrap(), "done");
/// # });
/// ```
pub struct PendingOp<T> {
    state: PendingState<T>,
}

impl<T> PendingOp<T> {
    fn spawned(handle: JoinHandle<Result<T, StorageError>>) -> Self {
        Self {
            state: PendingState::Spawned {
                handle,
                cancel_requested: AtomicBool::new(false),
            },
        }
    }

    fn rejected(err: AsyncError) -> Self {
        Self {
            state: PendingState::Rejected(Some(err)),
        }
    }

    /// Block the calling thread until the operation completes.
    ///
    /// Must not be called from inside an async task; await the handle there.
    pub fn wait(self) -> Result<T, AsyncError> {
        futures::executor::block_on(self)
    }

    /// Wait at most `limit` for the result.
    ///
    /// On timeout the operation keeps running; only this wait gives up. Uses
    /// the tokio timer of the calling runtime.
    pub async fn timeout(self, limit: Duration) -> Result<T, AsyncError> {
        match tokio::time::timeout(limit, self).await {
            Ok(result) => result,
            Err(_) => Err(AsyncError::TimedOut(limit)),
        }
    }

    /// Prevent the operation from starting if it is still queued.
    ///
    /// An operation that has already started runs to completion and the
    /// handle resolves to its result. A queued operation resolves to
    /// [`AsyncError::Cancelled`].
    pub fn cancel(&self) {
        if let PendingState::Spawned {
            handle,
            cancel_requested,
        } = &self.state
        {
            cancel_requested.store(true, Ordering::SeqCst);
            handle.abort();
        }
    }

    /// True once a result is available without waiting.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            PendingState::Spawned { handle, .. } => handle.is_finished(),
            PendingState::Rejected(_) => true,
        }
    }
}

impl<T> std::fmt::Debug for PendingOp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOp")
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<T> Future for PendingOp<T> {
    type Output = Result<T, AsyncError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            // A rejection is reported once; repeat polls report shutdown.
            PendingState::Rejected(err) => {
                Poll::Ready(Err(err.take().unwrap_or(AsyncError::ShutDown)))
            }
            PendingState::Spawned {
                handle,
                cancel_requested,
            } => match Pin::new(handle).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(result)) => Poll::Ready(result.map_err(AsyncError::from)),
                Poll::Ready(Err(err)) => Poll::Ready(Err(join_failure(
                    err,
                    cancel_requested.load(Ordering::SeqCst),
                ))),
            },
        }
    }
}

fn join_failure(err: JoinError, cancel_requested: bool) -> AsyncError {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        return AsyncError::Panicked(message);
    }
    // Not cancelled by the caller, so the runtime dropped it at shutdown.
    if cancel_requested {
        AsyncError::Cancelled
    } else {
        AsyncError::ShutDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    /// Occupy the only worker of `pool` until the returned sender is used.
    fn occupy(pool: &WorkerPool) -> (PendingOp<&'static str>, mpsc::Sender<()>) {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let op = pool.submit(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            Ok("released")
        });
        started_rx.recv().unwrap();
        (op, release_tx)
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let err = WorkerPool::new(0).unwrap_err();
        assert_eq!(err.to_string(), "invalid pool size: 0 (must be at least 1)");
    }

    #[test]
    fn test_submit_and_wait() {
        let pool = WorkerPool::new(2).unwrap();
        let op = pool.submit(|| Ok(21 * 2));
        assert_eq!(op.wait().unwrap(), 42);
        assert_eq!(pool.pool_size(), 2);
    }

    #[test]
    fn test_storage_error_surfaces_unchanged() {
        let pool = WorkerPool::new(1).unwrap();
        let op = pool.submit(|| -> Result<(), StorageError> {
            Err(StorageError::OperationFailed("nope".into()))
        });
        let err = op.wait().unwrap_err();
        assert!(matches!(
            err.as_storage(),
            Some(StorageError::OperationFailed(m)) if m == "nope"
        ));
    }

    #[test]
    fn test_panic_is_captured_and_pool_survives() {
        let pool = WorkerPool::new(1).unwrap();
        let op = pool.submit(|| -> Result<i32, StorageError> { panic!("backend exploded") });
        match op.wait() {
            Err(AsyncError::Panicked(message)) => assert_eq!(message, "backend exploded"),
            other => panic!("expected a captured panic, got {other:?}"),
        }

        assert_eq!(pool.submit(|| Ok(5)).wait().unwrap(), 5);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_bounded_queue_rejects_overflow() {
        let pool = WorkerPool::with_config(&PoolConfig {
            pool_size: 1,
            max_pending: Some(2),
            ..PoolConfig::default()
        })
        .unwrap();

        let (first, release) = occupy(&pool);
        let second = pool.submit(|| Ok("queued"));
        let third = pool.submit(|| Ok("overflow"));

        assert!(third.is_finished());
        assert!(matches!(
            third.wait(),
            Err(AsyncError::QueueFull { capacity: 2 })
        ));

        release.send(()).unwrap();
        assert_eq!(first.wait().unwrap(), "released");
        assert_eq!(second.wait().unwrap(), "queued");
        assert_eq!(pool.submit(|| Ok("accepted")).wait().unwrap(), "accepted");
    }

    #[test]
    fn test_cancel_prevents_queued_operation() {
        let pool = WorkerPool::new(1).unwrap();
        let (first, release) = occupy(&pool);

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let queued = pool.submit(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        queued.cancel();

        release.send(()).unwrap();
        assert_eq!(first.wait().unwrap(), "released");
        assert!(matches!(queued.wait(), Err(AsyncError::Cancelled)));
        assert!(pool.shutdown(Duration::from_secs(5)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancel_after_start_still_completes() {
        let pool = WorkerPool::new(1).unwrap();
        let (running, release) = occupy(&pool);
        running.cancel();
        release.send(()).unwrap();
        assert_eq!(running.wait().unwrap(), "released");
    }

    #[test]
    fn test_shutdown_drains_and_rejects_later_submissions() {
        let pool = WorkerPool::new(2).unwrap();
        let slow = pool.submit(|| {
            std::thread::sleep(Duration::from_millis(50));
            Ok("done")
        });

        assert!(pool.shutdown(Duration::from_secs(5)));
        assert!(pool.is_shut_down());
        assert_eq!(slow.wait().unwrap(), "done");

        assert!(matches!(
            pool.submit(|| Ok(1)).wait(),
            Err(AsyncError::ShutDown)
        ));
        // Idempotent.
        assert!(pool.shutdown(Duration::from_millis(1)));
    }

    #[test]
    fn test_shutdown_reports_timed_out_drain() {
        let pool = WorkerPool::new(1).unwrap();
        let (_running, release) = occupy(&pool);

        assert!(!pool.shutdown(Duration::from_millis(20)));
        release.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_await_from_async_context() {
        let pool = WorkerPool::new(2).unwrap();
        let value = pool.submit(|| Ok(String::from("awaited"))).await.unwrap();
        assert_eq!(value, "awaited");
    }

    #[tokio::test]
    async fn test_timeout_gives_up_without_stopping_the_operation() {
        let pool = WorkerPool::new(1).unwrap();
        let (running, release) = occupy(&pool);

        let err = running.timeout(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, AsyncError::TimedOut(d) if d == Duration::from_millis(20)));

        release.send(()).unwrap();
        // Dropping a pool inside an async context must not block or panic.
        drop(pool);
    }

    #[tokio::test]
    async fn test_timeout_returns_result_when_fast_enough() {
        let pool = WorkerPool::new(1).unwrap();
        let op = pool.submit(|| Ok(7u64));
        assert_eq!(op.timeout(Duration::from_secs(5)).await.unwrap(), 7);
    }
}
