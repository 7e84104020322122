//! Bounded fan-out / fan-in of per-object store operations.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::TRACING_TARGET_BATCH;
use crate::error::{Error, Result};

/// Upper bound on the default worker count.
const MAX_DEFAULT_CONCURRENCY: usize = 32;

/// Default number of concurrently running batch items.
///
/// Scales with the available parallelism plus a few slots for I/O waits,
/// capped at 32.
pub fn default_concurrency() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    (cpus + 4).min(MAX_DEFAULT_CONCURRENCY)
}

/// A set of dispatched tasks with at most `limit` running at once.
///
/// Tasks start as soon as they are spawned (subject to the limit) and are
/// only awaited by [`join`](Self::join), which drains every task before
/// returning, so no work outlives the batch.
pub(crate) struct Batch<T> {
    tasks: JoinSet<Result<T>>,
    permits: Arc<Semaphore>,
}

impl<T: Send + 'static> Batch<T> {
    /// Create an empty batch running at most `limit` tasks concurrently.
    pub fn new(limit: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Number of tasks not yet joined.
    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Dispatch `task`; it runs once a permit is free.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| Error::task(e.to_string()))?;
            task.await
        });
    }

    /// Await every task, passing each output to `sink` in completion order.
    ///
    /// Returns the first failure observed, after all remaining tasks have
    /// finished.
    pub async fn join<S>(mut self, mut sink: S) -> Result<()>
    where
        S: FnMut(T),
    {
        let total = self.tasks.len();
        let mut failed = 0usize;
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            match joined.map_err(Error::from).and_then(|output| output) {
                Ok(output) => sink(output),
                Err(err) => {
                    failed += 1;
                    tracing::debug!(
                        target: TRACING_TARGET_BATCH,
                        error = %err,
                        "batch task failed"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_BATCH,
                    total,
                    failed,
                    "batch finished with failures"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_concurrency_is_bounded() {
        let n = default_concurrency();
        assert!(n >= 5);
        assert!(n <= MAX_DEFAULT_CONCURRENCY);
    }

    #[tokio::test]
    async fn join_collects_all_outputs() {
        let mut batch = Batch::new(4);
        for i in 0..10u32 {
            batch.spawn(async move { Ok(i) });
        }
        assert_eq!(batch.len(), 10);

        let mut outputs = Vec::new();
        batch.join(|i| outputs.push(i)).await.unwrap();
        outputs.sort_unstable();
        assert_eq!(outputs, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_batch_joins_immediately() {
        let batch = Batch::<()>::new(4);
        batch.join(|()| unreachable!()).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut batch = Batch::new(3);
        for _ in 0..12 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            batch.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }

        batch.join(|()| {}).await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_drains_remaining_tasks() {
        let finished = Arc::new(AtomicUsize::new(0));

        let mut batch = Batch::new(2);
        batch.spawn(async { Err(Error::task("first")) });
        for _ in 0..5 {
            let finished = Arc::clone(&finished);
            batch.spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let err = batch.join(|()| {}).await.unwrap_err();
        assert!(matches!(err, Error::Task { .. }));
        assert_eq!(finished.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn panicking_task_becomes_error() {
        async fn blow_up() -> Result<()> {
            panic!("worker blew up")
        }

        let mut batch = Batch::<()>::new(1);
        batch.spawn(blow_up());

        let err = batch.join(|()| {}).await.unwrap_err();
        assert!(matches!(err, Error::Task { .. }));
    }
}
