use std::time::Duration;

use crate::error::AppError;

/// Start page of the AI answer mode; the query box lives here.
pub const DEFAULT_START_URL: &str = "https://www.google.com/search?udm=50&q=";

/// Budget used when a caller does not specify one.
pub const DEFAULT_MAX_WAIT_SECONDS: u64 = 10;

/// Timing and navigation settings for [`crate::protocol::SearchProtocol`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub start_url: String,
    /// Delay before each poll tick.
    pub poll_interval: Duration,
    /// How long bootstrap waits for the input control after navigating.
    pub input_wait: Duration,
    /// Delay between input lookups while waiting.
    pub input_poll_interval: Duration,
    /// How long a reset waits for the input before falling back to bootstrap.
    pub reset_wait: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            poll_interval: Duration::from_secs(1),
            input_wait: Duration::from_secs(5),
            input_poll_interval: Duration::from_millis(100),
            reset_wait: Duration::from_secs(3),
        }
    }
}

impl SearchConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PERISCOPE_START_URL` (optional)
    /// - `PERISCOPE_POLL_INTERVAL_MS` (optional, defaults to 1000)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(url) = lookup("PERISCOPE_START_URL") {
            config.start_url = url;
        }
        if let Some(ms) = parse_positive(&lookup, "PERISCOPE_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets both the bootstrap wait and the lookup cadence.
    pub fn with_input_wait(mut self, wait: Duration, poll_interval: Duration) -> Self {
        self.input_wait = wait;
        self.input_poll_interval = poll_interval;
        self
    }

    pub fn with_reset_wait(mut self, wait: Duration) -> Self {
        self.reset_wait = wait;
        self
    }
}

/// Sizing of the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of sessions the pool is expected to run.
    pub workers: usize,
    pub default_max_wait_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            default_max_wait_seconds: DEFAULT_MAX_WAIT_SECONDS,
        }
    }
}

impl PoolConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PERISCOPE_WORKERS` (optional, defaults to 1)
    /// - `PERISCOPE_MAX_WAIT_SECONDS` (optional, defaults to 10)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(workers) = parse_positive(&lookup, "PERISCOPE_WORKERS")? {
            config.workers = workers as usize;
        }
        if let Some(secs) = parse_positive(&lookup, "PERISCOPE_MAX_WAIT_SECONDS")? {
            config.default_max_wait_seconds = secs;
        }
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_default_max_wait(mut self, seconds: u64) -> Self {
        self.default_max_wait_seconds = seconds;
        self
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {key} '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(Some(parsed))
}
