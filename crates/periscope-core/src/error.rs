use thiserror::Error;

/// Application-wide error types for Periscope.
#[derive(Error, Debug)]
pub enum AppError {
    /// The session could not be brought to a submittable state.
    #[error("Bootstrap failed: {0}")]
    BootstrapFailure(String),

    /// The extraction pipeline could not make sense of the markup.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No reference-bearing result and no text within the job's budget.
    #[error("No results within {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The automation session faulted while processing a job.
    #[error("Session error: {0}")]
    SessionError(String),

    /// The session could not be returned to its baseline state.
    #[error("Reset failed: {0}")]
    ResetFailure(String),

    /// Invalid configuration or rule table.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The job was still queued when its worker shut down.
    #[error("Job cancelled before it started")]
    Cancelled,

    /// The pool no longer accepts jobs.
    #[error("Worker pool is shut down")]
    PoolShutdown,
}

impl AppError {
    /// Returns true for the no-content timeout surfaced to callers.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout { .. })
    }

    /// Returns true if resubmitting the same query may succeed.
    ///
    /// Only timeouts qualify: the upstream page may simply need longer.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }
}
