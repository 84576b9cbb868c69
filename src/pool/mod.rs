//! C2 Worker Pool: a bounded, fire-and-forget task pool.
//!
//! Two independent pools are built from this type in the orchestrator: the
//! notifier pool (delivers a [`crate::core::RatePoint`] to one subscriber)
//! and the DB pool (persists a poll batch). Both submit already-bound,
//! heterogeneous futures rather than a single typed request/response job,
//! so unlike the teacher's `TaskExecutor<P, T>` machinery this pool is
//! non-generic: it accepts `Pin<Box<dyn Future<Output = ()> + Send>>` and
//! never hands a result back to the submitter.
//!
//! Admission is non-blocking: a full queue drops the newest submission
//! rather than blocking the caller, matching spec.md's bounded-memory
//! requirement for the notifier pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A unit of work accepted by a [`WorkerPool`]: an already-bound future
/// that produces nothing and is run to completion (or timeout) by a
/// worker task.
pub type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Errors a [`WorkerPool`] can report back to a submitter.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The bounded queue was full; the job was dropped rather than queued.
    #[error("pool queue is full, job dropped")]
    QueueFull,
    /// `submit` was called after `stop` had already been issued.
    #[error("pool has been shut down")]
    PoolShutdown,
}

/// Construction parameters for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Name used in log lines, e.g. `"notifier"` or `"db"`.
    pub name: &'static str,
    /// Number of concurrent worker tasks.
    pub concurrency: usize,
    /// Bounded queue depth; a full queue drops new submissions.
    pub queue_size: usize,
    /// Per-job timeout; a job that overruns it is cancelled, not retried.
    /// `None` means a job is always awaited to completion (the DB pool:
    /// inserts are never force-cancelled, matching the original's
    /// `timeout=None`).
    pub timeout: Option<Duration>,
}

/// Snapshot of pool activity, exposed for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Jobs handed to `submit` successfully.
    pub submitted: u64,
    /// Jobs dropped because the queue was full.
    pub dropped: u64,
    /// Jobs that finished within their timeout.
    pub completed: u64,
    /// Jobs cancelled for exceeding their timeout.
    pub timed_out: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

enum PoolMessage {
    Job(BoxedJob),
    Shutdown,
}

/// A bounded pool of `concurrency` worker tasks draining one shared queue.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    sender: mpsc::Sender<PoolMessage>,
    counters: Arc<PoolCounters>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start the pool: spawns `config.concurrency` worker tasks immediately.
    #[must_use]
    pub fn start(config: WorkerPoolConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_size);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(PoolCounters::default());

        let workers = (0..config.concurrency.max(1))
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    config.name,
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                    config.timeout,
                ))
            })
            .collect();

        Self {
            config,
            sender,
            counters,
            workers: tokio::sync::Mutex::new(workers),
        }
    }

    /// Submit a job for execution by the next free worker.
    ///
    /// Non-blocking: if the queue is at capacity the job is dropped and
    /// [`PoolError::QueueFull`] is returned, rather than applying
    /// backpressure to the caller.
    pub fn submit(&self, job: BoxedJob) -> Result<(), PoolError> {
        match self.sender.try_send(PoolMessage::Job(job)) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(pool = self.config.name, "queue full, dropping job");
                Err(PoolError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PoolError::PoolShutdown),
        }
    }

    /// Current activity snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    /// Signal every worker to drain and exit, then wait for them to finish.
    ///
    /// One poison [`PoolMessage::Shutdown`] is pushed per worker; workers
    /// that see it stop pulling new jobs but still await whatever they are
    /// mid-way through. Takes `&self`, not `self`, so a pool can be shared
    /// (e.g. via `Arc<WorkerPool>`) between the service that submits to it
    /// and the orchestrator that stops it at shutdown.
    pub async fn stop(&self) {
        let worker_count = self.workers.lock().await.len();
        for _ in 0..worker_count {
            let _ = self.sender.send(PoolMessage::Shutdown).await;
        }
        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    name: &'static str,
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<PoolMessage>>>,
    counters: Arc<PoolCounters>,
    timeout: Option<Duration>,
) {
    loop {
        let message = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        match message {
            Some(PoolMessage::Job(job)) => match timeout {
                Some(timeout) => {
                    if tokio::time::timeout(timeout, job).await.is_err() {
                        counters.timed_out.fetch_add(1, Ordering::Relaxed);
                        warn!(pool = name, worker_id, "job exceeded timeout, cancelled");
                    } else {
                        counters.completed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => {
                    job.await;
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
            },
            Some(PoolMessage::Shutdown) | None => {
                debug!(pool = name, worker_id, "worker exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn submitted_job_runs() {
        let pool = WorkerPool::start(WorkerPoolConfig {
            name: "test",
            concurrency: 2,
            queue_size: 8,
            timeout: Some(Duration::from_secs(1)),
        });
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        pool.submit(Box::pin(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        pool.stop().await;
    }

    #[tokio::test]
    async fn full_queue_drops_newest() {
        let pool = WorkerPool::start(WorkerPoolConfig {
            name: "test",
            concurrency: 1,
            queue_size: 1,
            timeout: Some(Duration::from_secs(5)),
        });
        // Occupy the single worker with a long-running job, fill the queue.
        pool.submit(Box::pin(tokio::time::sleep(Duration::from_millis(200))))
            .unwrap();
        pool.submit(Box::pin(async {})).unwrap();
        let result = pool.submit(Box::pin(async {}));
        assert!(matches!(result, Err(PoolError::QueueFull)));
        assert_eq!(pool.stats().dropped, 1);
        pool.stop().await;
    }

    #[tokio::test]
    async fn slow_job_times_out_without_blocking_pool() {
        let pool = WorkerPool::start(WorkerPoolConfig {
            name: "test",
            concurrency: 1,
            queue_size: 4,
            timeout: Some(Duration::from_millis(20)),
        });
        pool.submit(Box::pin(tokio::time::sleep(Duration::from_millis(200))))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(pool.stats().timed_out, 1);
        pool.stop().await;
    }

    #[tokio::test]
    async fn no_timeout_runs_job_to_completion() {
        let pool = WorkerPool::start(WorkerPoolConfig {
            name: "test",
            concurrency: 1,
            queue_size: 4,
            timeout: None,
        });
        pool.submit(Box::pin(tokio::time::sleep(Duration::from_millis(60))))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.stats().timed_out, 0);
        assert_eq!(pool.stats().completed, 1);
        pool.stop().await;
    }
}
