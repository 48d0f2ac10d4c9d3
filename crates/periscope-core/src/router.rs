//! Distributes submitted jobs over a fixed pool of workers.
//!
//! Selection is round robin with idle preference: starting at the cursor,
//! the first `Ready` worker wins. When nobody is idle the job queues on the
//! worker at the cursor. Either way the cursor moves one past the pick.

use std::sync::Mutex;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::error::AppError;
use crate::job::{Job, WorkerState};
use crate::models::SearchOutcome;
use crate::protocol::SearchProtocol;
use crate::traits::{MarkupParser, SearchSession};
use crate::worker::{Worker, WorkerHandle, WorkerReporter};

/// Round-robin cursor over a worker list.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(cursor: usize) -> Self {
        Self { cursor }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Picks a worker index given a snapshot of worker states.
    ///
    /// Returns `None` only for an empty pool.
    pub fn pick(&mut self, states: &[WorkerState]) -> Option<usize> {
        let n = states.len();
        if n == 0 {
            return None;
        }
        let start = self.cursor % n;
        let chosen = (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&i| states[i] == WorkerState::Ready)
            .unwrap_or(start);
        self.cursor = (chosen + 1) % n;
        Some(chosen)
    }
}

/// Front door of the pool.
///
/// Owns the worker handles and the loop tasks. Dropping the router cancels
/// the loops; [`JobRouter::shutdown`] additionally waits for them.
pub struct JobRouter {
    workers: Vec<WorkerHandle>,
    rotation: Mutex<RoundRobin>,
    cancel_token: CancellationToken,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    default_max_wait_seconds: u64,
}

impl JobRouter {
    /// Bootstraps one worker per session and starts their loops.
    ///
    /// Sessions that fail to bootstrap are closed and left out of the pool.
    /// Fails only when none survive.
    pub async fn start<S, P, R>(
        sessions: Vec<S>,
        protocol: SearchProtocol<P>,
        config: &PoolConfig,
        reporter: R,
    ) -> Result<Self, AppError>
    where
        S: SearchSession,
        P: MarkupParser,
        R: WorkerReporter + Clone + 'static,
    {
        if sessions.len() != config.workers {
            tracing::warn!(
                sessions = sessions.len(),
                configured = config.workers,
                "Session count differs from configured worker count"
            );
        }

        let mut pending = JoinSet::new();
        for (id, session) in sessions.into_iter().enumerate() {
            let protocol = protocol.clone();
            pending.spawn(async move {
                let (mut worker, handle) = Worker::new(id, session, protocol);
                let bootstrapped = worker.bootstrap().await;
                (worker, handle, bootstrapped)
            });
        }

        let mut ready = Vec::new();
        let mut last_error = None;
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((worker, handle, Ok(()))) => ready.push((worker, handle)),
                Ok((worker, _, Err(e))) => {
                    tracing::error!(worker_id = worker.id(), error = %e, "Worker failed to bootstrap");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Bootstrap task panicked");
                }
            }
        }

        if ready.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                AppError::BootstrapFailure("no sessions were provided".into())
            }));
        }
        ready.sort_by_key(|(worker, _)| worker.id());

        let cancel_token = CancellationToken::new();
        let mut workers = Vec::with_capacity(ready.len());
        let mut tasks = Vec::with_capacity(ready.len());
        for (worker, handle) in ready {
            let cancel = cancel_token.clone();
            let reporter = reporter.clone();
            tasks.push(tokio::spawn(async move {
                worker.run(cancel, &reporter).await;
            }));
            workers.push(handle);
        }

        tracing::info!(workers = workers.len(), "Worker pool started");

        Ok(Self {
            workers,
            rotation: Mutex::new(RoundRobin::new()),
            cancel_token,
            tasks: tokio::sync::Mutex::new(tasks),
            default_max_wait_seconds: config.default_max_wait_seconds,
        })
    }

    pub fn default_max_wait(&self) -> u64 {
        self.default_max_wait_seconds
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Snapshot of `(worker id, state)` pairs in pool order.
    pub fn worker_states(&self) -> Vec<(usize, WorkerState)> {
        self.workers.iter().map(|w| (w.id(), w.state())).collect()
    }

    /// Snapshot of `(worker id, jobs waiting)` pairs in pool order.
    pub fn queue_depths(&self) -> Vec<(usize, usize)> {
        self.workers.iter().map(|w| (w.id(), w.queued())).collect()
    }

    /// Route a query to a worker and wait for its outcome.
    pub async fn submit(
        &self,
        query: &str,
        max_wait_seconds: u64,
    ) -> Result<SearchOutcome, AppError> {
        if self.cancel_token.is_cancelled() {
            return Err(AppError::PoolShutdown);
        }

        let (job, result) = Job::new(query, max_wait_seconds);
        let worker = self.select_worker()?;
        tracing::debug!(job_id = %job.id, worker_id = worker.id(), state = %worker.state(), "Job routed");
        worker.dispatch(job)?;

        result.await.map_err(|_| AppError::Cancelled)?
    }

    /// [`JobRouter::submit`] with the pool's default wait.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, AppError> {
        self.submit(query, self.default_max_wait_seconds).await
    }

    /// Submit once; on a timeout, retry once with double the budget.
    pub async fn submit_with_fallback(
        &self,
        query: &str,
        max_wait_seconds: u64,
    ) -> Result<SearchOutcome, AppError> {
        match self.submit(query, max_wait_seconds).await {
            Err(e) if e.is_retryable() => {
                let extended = max_wait_seconds.saturating_mul(2);
                tracing::info!(%query, extended, "No results in time, retrying with a longer wait");
                self.submit(query, extended).await
            }
            other => other,
        }
    }

    /// Stop every worker. Queued jobs resolve as `Cancelled`; jobs in flight
    /// finish first. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
    }

    fn select_worker(&self) -> Result<&WorkerHandle, AppError> {
        let states: Vec<WorkerState> = self.workers.iter().map(|w| w.state()).collect();
        let mut rotation = self
            .rotation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rotation
            .pick(&states)
            .map(|index| &self.workers[index])
            .ok_or(AppError::PoolShutdown)
    }
}

impl Drop for JobRouter {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
