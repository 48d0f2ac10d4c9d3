use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::SearchOutcome;

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Initializing,
    Ready,
    Busy,
    Stopped,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Initializing => "initializing",
            WorkerState::Ready => "ready",
            WorkerState::Busy => "busy",
            WorkerState::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the submitter of a job eventually receives.
pub type JobResult = Result<SearchOutcome, AppError>;

/// One query submission.
///
/// Immutable once created; consumed when its result is delivered.
#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub query: String,
    pub max_wait_seconds: u64,
    pub submitted_at: DateTime<Utc>,
    responder: oneshot::Sender<JobResult>,
}

impl Job {
    /// Creates a job and the receiving end of its result handle.
    pub fn new(
        query: impl Into<String>,
        max_wait_seconds: u64,
    ) -> (Self, oneshot::Receiver<JobResult>) {
        let (tx, rx) = oneshot::channel();
        let job = Self {
            id: Uuid::new_v4(),
            query: query.into(),
            max_wait_seconds,
            submitted_at: Utc::now(),
            responder: tx,
        };
        (job, rx)
    }

    /// Delivers the result. A submitter that stopped waiting is not an error.
    pub fn resolve(self, result: JobResult) {
        if self.responder.send(result).is_err() {
            tracing::debug!(job_id = %self.id, "Submitter no longer waiting for result");
        }
    }

    /// Milliseconds since submission.
    pub fn queued_for_ms(&self) -> i64 {
        (Utc::now() - self.submitted_at).num_milliseconds()
    }
}
