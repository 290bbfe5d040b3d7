//! Bounded worker pool backed by a FIFO queue.
//!
//! # Responsibilities
//! - Run submitted jobs on at most `max_workers` worker tasks
//! - Queue jobs while every worker is busy
//! - Retire surplus idle workers after the keep-alive period
//! - Drain queued and running jobs on shutdown
//!
//! # Design Decisions
//! - A job goes straight to an idle worker over a oneshot, so each idle
//!   worker is claimed by exactly one submission
//! - Workers are spawned lazily, one per submission, until the bound is hit
//! - One worker is kept alive indefinitely once spawned
//! - Queue and counters share one mutex; it is never held across an await

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{oneshot, watch};

use crate::config::PoolConfig;

/// Workers that are never retired for idleness.
const MIN_WORKERS: usize = 1;

/// A unit of work accepted by the pool.
pub type Job = BoxFuture<'static, ()>;

/// Reasons a job was not accepted. The rejected job is dropped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("worker pool saturated with {pending} pending jobs")]
    Saturated { pending: usize },
}

/// A parked worker waiting for a job.
struct IdleWorker {
    id: u64,
    handoff: oneshot::Sender<Job>,
}

struct PoolState {
    queue: VecDeque<Job>,
    idle: Vec<IdleWorker>,
    workers: usize,
    next_idle_id: u64,
    shut_down: bool,
}

impl PoolState {
    /// Remove the parked entry `id`. `false` means a submission already claimed it.
    fn unpark(&mut self, id: u64) -> bool {
        match self.idle.iter().position(|w| w.id == id) {
            Some(pos) => {
                self.idle.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}

struct Shared {
    state: Mutex<PoolState>,
    live_workers: watch::Sender<usize>,
    max_workers: usize,
    keep_alive: Duration,
    max_pending: Option<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Jobs never run under the lock, so a poisoned guard still holds consistent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A cloneable handle to a bounded pool of worker tasks.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create a pool. `max_workers` is raised to 1 if zero.
    pub fn new(max_workers: usize, keep_alive: Duration, max_pending: Option<usize>) -> Self {
        let (live_workers, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    queue: VecDeque::new(),
                    idle: Vec::new(),
                    workers: 0,
                    next_idle_id: 0,
                    shut_down: false,
                }),
                live_workers,
                max_workers: max_workers.max(MIN_WORKERS),
                keep_alive,
                max_pending,
            }),
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.max_workers, config.keep_alive(), config.max_pending)
    }

    /// Hand `job` to an idle worker, spawn a worker if below the bound, or
    /// queue it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F>(&self, job: F) -> Result<(), SubmitError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.shut_down {
            return Err(SubmitError::ShutDown);
        }

        let mut job = job.boxed();
        // Most recently parked first, so older idle workers can age out.
        while let Some(idle) = state.idle.pop() {
            match idle.handoff.send(job) {
                Ok(()) => return Ok(()),
                Err(returned) => job = returned,
            }
        }

        if state.workers < self.shared.max_workers {
            state.workers += 1;
            self.shared.live_workers.send_replace(state.workers);
            tracing::trace!(workers = state.workers, "Spawning worker");
            drop(state);
            tokio::spawn(run_worker(Arc::clone(&self.shared), Some(job)));
            return Ok(());
        }

        if let Some(max_pending) = self.shared.max_pending {
            if state.queue.len() >= max_pending {
                return Err(SubmitError::Saturated {
                    pending: state.queue.len(),
                });
            }
        }
        state.queue.push_back(job);
        Ok(())
    }

    /// Stop accepting jobs and wait until queued and running jobs finish.
    pub async fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if !state.shut_down {
                state.shut_down = true;
                tracing::info!(
                    workers = state.workers,
                    pending = state.queue.len(),
                    "Worker pool draining"
                );
            }
            // Dropping the hand-off senders wakes every parked worker.
            state.idle.clear();
        }

        let mut live = self.shared.live_workers.subscribe();
        // The sender lives in `shared`, which we hold, so this cannot fail.
        let _ = live.wait_for(|workers| *workers == 0).await;
        tracing::debug!("Worker pool drained");
    }

    /// Number of live worker tasks.
    pub fn worker_count(&self) -> usize {
        self.shared.lock().workers
    }

    /// Number of jobs waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shut_down
    }

    pub fn max_workers(&self) -> usize {
        self.shared.max_workers
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("WorkerPool")
            .field("workers", &state.workers)
            .field("idle", &state.idle.len())
            .field("pending", &state.queue.len())
            .field("shut_down", &state.shut_down)
            .field("max_workers", &self.shared.max_workers)
            .finish()
    }
}

/// Decrements the live worker count when a worker task ends, unless the
/// worker already gave up its slot while retiring.
struct WorkerGuard {
    shared: Arc<Shared>,
    counted: bool,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if !self.counted {
            return;
        }
        let mut state = self.shared.lock();
        state.workers -= 1;
        self.shared.live_workers.send_replace(state.workers);
        tracing::trace!(workers = state.workers, "Worker exited");
    }
}

enum Step {
    Run(Job),
    Park {
        id: u64,
        handoff: oneshot::Receiver<Job>,
        surplus: bool,
    },
    Exit,
}

async fn run_worker(shared: Arc<Shared>, first: Option<Job>) {
    let mut guard = WorkerGuard {
        shared: Arc::clone(&shared),
        counted: true,
    };
    let mut next = first;

    loop {
        if let Some(job) = next.take() {
            if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                tracing::error!("Worker job panicked");
            }
        }

        let step = {
            let mut state = shared.lock();
            match state.queue.pop_front() {
                Some(job) => Step::Run(job),
                None if state.shut_down => Step::Exit,
                None => {
                    let id = state.next_idle_id;
                    state.next_idle_id += 1;
                    let (tx, rx) = oneshot::channel();
                    state.idle.push(IdleWorker { id, handoff: tx });
                    Step::Park {
                        id,
                        handoff: rx,
                        surplus: state.workers > MIN_WORKERS,
                    }
                }
            }
        };

        next = match step {
            Step::Run(job) => Some(job),
            Step::Exit => return,
            Step::Park {
                handoff,
                surplus: false,
                ..
            } => handoff.await.ok(),
            Step::Park {
                id,
                mut handoff,
                surplus: true,
            } => match tokio::time::timeout(shared.keep_alive, &mut handoff).await {
                Ok(received) => received.ok(),
                Err(_) => {
                    let mut state = shared.lock();
                    if !state.unpark(id) {
                        // Claimed just as the wait expired; the job is already in the channel.
                        drop(state);
                        handoff.try_recv().ok()
                    } else if state.workers > MIN_WORKERS {
                        state.workers -= 1;
                        shared.live_workers.send_replace(state.workers);
                        guard.counted = false;
                        drop(state);
                        tracing::debug!(
                            keep_alive_secs = shared.keep_alive.as_secs(),
                            "Retiring idle worker"
                        );
                        return;
                    } else {
                        None
                    }
                }
            },
        };
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Semaphore};

    const LONG: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn runs_submitted_job() {
        let pool = WorkerPool::new(2, LONG, None);
        let (tx, rx) = oneshot::channel();
        pool.submit(async move {
            let _ = tx.send(42);
        })
        .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
        assert_eq!(pool.worker_count(), 1);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_max_workers() {
        let pool = WorkerPool::new(2, LONG, None);
        let gate = Arc::new(Semaphore::new(0));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let gate = gate.clone();
            let running = running.clone();
            let peak = peak.clone();
            let done = done.clone();
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                let _permit = gate.acquire().await.unwrap();
                running.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        assert_eq!(pool.worker_count(), 2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.pending(), 3);

        gate.add_permits(5);
        pool.shutdown().await;

        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(1, LONG, None);
        pool.shutdown().await;
        assert!(pool.is_shut_down());
        assert_eq!(pool.submit(async {}), Err(SubmitError::ShutDown));
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let pool = WorkerPool::new(1, LONG, None);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let done = done.clone();
            pool.submit(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(pool.worker_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_rejects_with_saturated() {
        let pool = WorkerPool::new(1, LONG, Some(1));
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, started_rx) = oneshot::channel();

        let g = gate.clone();
        pool.submit(async move {
            let _ = started_tx.send(());
            let _permit = g.acquire().await.unwrap();
        })
        .unwrap();
        started_rx.await.unwrap();

        pool.submit(async {}).unwrap();
        assert_eq!(pool.submit(async {}), Err(SubmitError::Saturated { pending: 1 }));

        gate.add_permits(1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn surplus_workers_retire_after_keep_alive() {
        let pool = WorkerPool::new(3, Duration::from_millis(50), None);
        let gate = Arc::new(Semaphore::new(0));
        for _ in 0..3 {
            let gate = gate.clone();
            pool.submit(async move {
                let _permit = gate.acquire().await.unwrap();
            })
            .unwrap();
        }
        assert_eq!(pool.worker_count(), 3);

        gate.add_permits(3);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(pool.worker_count(), 1);

        pool.shutdown().await;
        assert_eq!(pool.worker_count(), 0);
    }

    async fn wait_until_parked(pool: &WorkerPool, parked: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while pool.shared.lock().idle.len() != parked {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("workers never parked");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn back_to_back_submissions_each_get_a_worker() {
        let pool = WorkerPool::new(2, LONG, None);
        let (tx, rx) = oneshot::channel();
        pool.submit(async move {
            let _ = tx.send(());
        })
        .unwrap();
        rx.await.unwrap();
        wait_until_parked(&pool, 1).await;

        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = tokio::sync::mpsc::unbounded_channel();
        for n in 0..2 {
            let gate = gate.clone();
            let started_tx = started_tx.clone();
            pool.submit(async move {
                let _ = started_tx.send(n);
                let _permit = gate.acquire().await.unwrap();
            })
            .unwrap();
        }

        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(2), started_rx.recv())
                .await
                .expect("job left waiting while a worker slot was free")
                .unwrap();
        }
        assert_eq!(pool.worker_count(), 2);
        assert_eq!(pool.pending(), 0);

        gate.add_permits(2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn zero_keep_alive_retires_surplus_workers_once_queue_empties() {
        let pool = WorkerPool::new(3, Duration::ZERO, None);
        let gate = Arc::new(Semaphore::new(0));
        for _ in 0..3 {
            let gate = gate.clone();
            pool.submit(async move {
                let _permit = gate.acquire().await.unwrap();
            })
            .unwrap();
        }
        assert_eq!(pool.worker_count(), 3);

        gate.add_permits(3);
        let mut live = pool.shared.live_workers.subscribe();
        tokio::time::timeout(Duration::from_secs(2), live.wait_for(|workers| *workers == 1))
            .await
            .expect("surplus workers not retired")
            .unwrap();
        drop(live);

        let (tx, rx) = oneshot::channel();
        pool.submit(async move {
            let _ = tx.send(());
        })
        .unwrap();
        rx.await.unwrap();
        assert!(pool.worker_count() >= 1);

        pool.shutdown().await;
        assert_eq!(pool.worker_count(), 0);
    }

    #[tokio::test]
    async fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1, LONG, None);
        pool.submit(async { panic!("boom") }).unwrap();

        let (tx, rx) = oneshot::channel();
        pool.submit(async move {
            let _ = tx.send(());
        })
        .unwrap();
        rx.await.unwrap();
        assert_eq!(pool.worker_count(), 1);
    }
}
