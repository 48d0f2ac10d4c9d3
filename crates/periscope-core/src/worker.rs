use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{Job, WorkerState};
use crate::models::Completion;
use crate::protocol::SearchProtocol;
use crate::traits::{MarkupParser, SearchSession};

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: usize,
    },
    JobStarted {
        worker_id: usize,
        job_id: Uuid,
        query: &'a str,
        queued_ms: i64,
    },
    JobCompleted {
        worker_id: usize,
        job_id: Uuid,
        completion: Completion,
        attempts: u64,
    },
    JobFailed {
        worker_id: usize,
        job_id: Uuid,
        error: &'a str,
    },
    ResetFailed {
        worker_id: usize,
        error: &'a str,
    },
    ShuttingDown {
        worker_id: usize,
        jobs_released: u64,
    },
    Stopped {
        worker_id: usize,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started");
            }
            WorkerEvent::JobStarted {
                worker_id,
                job_id,
                query,
                queued_ms,
            } => {
                tracing::info!(%worker_id, %job_id, %query, %queued_ms, "Processing job");
            }
            WorkerEvent::JobCompleted {
                worker_id,
                job_id,
                completion,
                attempts,
            } => {
                tracing::info!(%worker_id, %job_id, ?completion, %attempts, "Job completed");
            }
            WorkerEvent::JobFailed {
                worker_id,
                job_id,
                error,
            } => {
                tracing::warn!(%worker_id, %job_id, %error, "Job failed");
            }
            WorkerEvent::ResetFailed { worker_id, error } => {
                tracing::error!(%worker_id, %error, "Session reset failed, serving next job anyway");
            }
            WorkerEvent::ShuttingDown {
                worker_id,
                jobs_released,
            } => {
                tracing::info!(%worker_id, %jobs_released, "Worker shutting down");
            }
            WorkerEvent::Stopped { worker_id } => {
                tracing::info!(%worker_id, "Worker stopped");
            }
        }
    }
}

/// Router-side view of a worker: its queue and its published state.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    id: usize,
    sender: mpsc::UnboundedSender<Job>,
    state: watch::Receiver<WorkerState>,
    queued: Arc<AtomicUsize>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Jobs waiting in the queue; the job in flight is not counted.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Enqueue a job. Fails once the worker loop has exited.
    pub fn dispatch(&self, job: Job) -> Result<(), AppError> {
        self.queued.fetch_add(1, Ordering::AcqRel);
        self.sender.send(job).map_err(|_| {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            AppError::PoolShutdown
        })
    }

    /// Resolves once the worker publishes `target`.
    pub async fn wait_for_state(&self, target: WorkerState) -> Result<(), AppError> {
        let mut rx = self.state.clone();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| AppError::PoolShutdown)
    }
}

/// Owns one session and drains its own job queue, one job at a time.
///
/// Only the loop in [`Worker::run`] consumes the queue. The session mutex is
/// held for a whole job (submit, poll, extract, reset).
pub struct Worker<S: SearchSession, P: MarkupParser> {
    id: usize,
    session: Mutex<S>,
    protocol: SearchProtocol<P>,
    inbox: mpsc::UnboundedReceiver<Job>,
    state: watch::Sender<WorkerState>,
    queued: Arc<AtomicUsize>,
}

impl<S: SearchSession, P: MarkupParser> Worker<S, P> {
    /// Creates an `Initializing` worker and the handle used to feed it.
    pub fn new(id: usize, session: S, protocol: SearchProtocol<P>) -> (Self, WorkerHandle) {
        let (sender, inbox) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(WorkerState::Initializing);
        let queued = Arc::new(AtomicUsize::new(0));
        let worker = Self {
            id,
            session: Mutex::new(session),
            protocol,
            inbox,
            state,
            queued: Arc::clone(&queued),
        };
        let handle = WorkerHandle {
            id,
            sender,
            state: state_rx,
            queued,
        };
        (worker, handle)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Bring the session to the start page and mark the worker `Ready`.
    ///
    /// On failure the session is closed and the worker stays `Initializing`.
    pub async fn bootstrap(&mut self) -> Result<(), AppError> {
        let session = self.session.get_mut();
        if let Err(e) = self.protocol.bootstrap(session).await {
            if let Err(close_err) = session.close_session().await {
                tracing::warn!(worker_id = self.id, error = %close_err, "Failed to close session");
            }
            return Err(e);
        }
        self.state.send_replace(WorkerState::Ready);
        Ok(())
    }

    /// Run the worker loop until cancellation or until every handle is dropped.
    ///
    /// Cancellation is only observed between jobs; a job in flight runs to
    /// its own timeout.
    pub async fn run<WR: WorkerReporter>(mut self, cancel_token: CancellationToken, reporter: &WR) {
        reporter.report(WorkerEvent::Started { worker_id: self.id });

        loop {
            let job = tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                job = self.inbox.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.queued.fetch_sub(1, Ordering::AcqRel);
            self.process_job(job, reporter).await;
        }

        // Graceful shutdown: answer everything still queued
        self.inbox.close();
        let mut released = 0u64;
        while let Ok(job) = self.inbox.try_recv() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            job.resolve(Err(AppError::Cancelled));
            released += 1;
        }
        reporter.report(WorkerEvent::ShuttingDown {
            worker_id: self.id,
            jobs_released: released,
        });

        if let Err(e) = self.session.get_mut().close_session().await {
            tracing::warn!(worker_id = self.id, error = %e, "Failed to close session");
        }
        self.state.send_replace(WorkerState::Stopped);
        reporter.report(WorkerEvent::Stopped { worker_id: self.id });
    }

    async fn process_job<WR: WorkerReporter>(&self, job: Job, reporter: &WR) {
        self.state.send_replace(WorkerState::Busy);
        reporter.report(WorkerEvent::JobStarted {
            worker_id: self.id,
            job_id: job.id,
            query: &job.query,
            queued_ms: job.queued_for_ms(),
        });

        let mut session = self.session.lock().await;
        let result = self
            .protocol
            .run(&mut *session, &job.query, job.max_wait_seconds)
            .await;

        match &result {
            Ok(outcome) => reporter.report(WorkerEvent::JobCompleted {
                worker_id: self.id,
                job_id: job.id,
                completion: outcome.completion,
                attempts: outcome.attempts,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                reporter.report(WorkerEvent::JobFailed {
                    worker_id: self.id,
                    job_id: job.id,
                    error: &error_msg,
                });
            }
        }

        // Always return to baseline; a failed reset does not take the worker down.
        if let Err(e) = self.protocol.reset(&mut *session).await {
            let error_msg = e.to_string();
            reporter.report(WorkerEvent::ResetFailed {
                worker_id: self.id,
                error: &error_msg,
            });
        }
        drop(session);

        self.state.send_replace(WorkerState::Ready);
        job.resolve(result);
    }
}
