//! Bounded offload of blocking driver calls.

use crate::{Result, error::SqlWardenError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

/// Runs blocking closures on tokio's blocking threads, at most `workers` at a
/// time.
///
/// The permit moves into the blocking closure, so it is held until the
/// closure returns even if the awaiting task is cancelled by a timeout.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BlockingPool {
    /// Creates a pool admitting `workers` concurrent closures (at least one).
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Configured concurrency bound
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of closures that could start right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs `f` on a blocking thread once a permit is free.
    ///
    /// # Errors
    /// Propagates the closure's error, or `QueryExecution` if the blocking
    /// task panicked.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SqlWardenError::configuration("Blocking worker pool is closed"))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| SqlWardenError::query_failed(format!("Blocking driver task failed: {}", e)))?
    }

    /// Like [`run`](Self::run), but `f` holds `session` exclusively for its
    /// whole duration.
    ///
    /// A statement and its commit or rollback then form one unit that no
    /// other caller sharing the session can interleave with. A session
    /// poisoned by a panicking closure is handed on as is.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub async fn run_exclusive<S, F, T>(&self, session: Arc<Mutex<S>>, f: F) -> Result<T>
    where
        S: Send + 'static,
        F: FnOnce(&mut S) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run(move || {
            let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_respects_worker_bound() {
        let pool = BlockingPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|_| {
            let pool = pool.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                pool.run(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }
        });

        for result in futures::future::join_all(tasks).await {
            assert!(result.is_ok());
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_caller_keeps_permit_until_closure_ends() {
        let pool = BlockingPool::new(1);

        let slow = pool.run(|| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        let outcome = tokio::time::timeout(Duration::from_millis(20), slow).await;
        assert!(outcome.is_err());
        assert_eq!(pool.available(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_exclusive_never_overlaps_on_one_session() {
        let pool = BlockingPool::new(4);
        let session = Arc::new(Mutex::new(Vec::<(usize, &'static str)>::new()));

        let tasks = (0..8).map(|n| {
            let pool = pool.clone();
            let session = Arc::clone(&session);
            async move {
                pool.run_exclusive(session, move |log| {
                    log.push((n, "statement"));
                    std::thread::sleep(Duration::from_millis(10));
                    log.push((n, "rollback"));
                    Ok(())
                })
                .await
            }
        });

        for result in futures::future::join_all(tasks).await {
            assert!(result.is_ok());
        }

        let log = session.lock().unwrap();
        assert_eq!(log.len(), 16);
        for pair in log.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0);
            assert_eq!(pair[0].1, "statement");
            assert_eq!(pair[1].1, "rollback");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_exclusive_survives_poisoned_session() {
        let pool = BlockingPool::new(2);
        let session = Arc::new(Mutex::new(0_u32));

        let panicked: Result<()> = pool
            .run_exclusive(Arc::clone(&session), |_| panic!("driver crashed"))
            .await;
        assert!(panicked.is_err());

        let value = pool
            .run_exclusive(Arc::clone(&session), |count| {
                *count += 1;
                Ok(*count)
            })
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_closure_error_propagates() {
        let pool = BlockingPool::new(0);
        assert_eq!(pool.workers(), 1);

        let result: Result<()> = pool
            .run(|| Err(SqlWardenError::query_failed("ORA-00942: table or view does not exist")))
            .await;
        assert!(result.unwrap_err().to_string().contains("ORA-00942"));
    }
}
