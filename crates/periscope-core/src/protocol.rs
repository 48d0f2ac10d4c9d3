//! Polling completion protocol.
//!
//! The answer page renders asynchronously and with unpredictable latency.
//! After submitting a query the protocol samples the page once per
//! `poll_interval`, parsing each sample, until a result carries references
//! or the caller's budget runs out.
//!
//! ```text
//! Submitted --> Polling --[references seen]-------------> Succeeded
//!                  |
//!                  +--[budget spent, final read has text]--> PartialTimeout
//!                  |
//!                  +--[budget spent, nothing usable]-------> Failed
//! ```

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::SearchConfig;
use crate::error::AppError;
use crate::models::{Completion, ExtractionResult, SearchOutcome, compute_hash};
use crate::traits::{MarkupParser, SearchSession};

/// Position of a search in the completion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Submitted,
    Polling,
    Succeeded,
    PartialTimeout,
    Failed,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolState::Submitted => write!(f, "submitted"),
            ProtocolState::Polling => write!(f, "polling"),
            ProtocolState::Succeeded => write!(f, "succeeded"),
            ProtocolState::PartialTimeout => write!(f, "partial-timeout"),
            ProtocolState::Failed => write!(f, "failed"),
        }
    }
}

/// Last successful parse, keyed by the hash of the markup it came from.
#[derive(Default)]
struct ParseCache {
    content_hash: String,
    result: Option<ExtractionResult>,
}

/// Drives one session through bootstrap, submit/poll/extract and reset.
///
/// Generic over the markup parser so the state machine can be tested
/// without a browser or real HTML.
#[derive(Clone)]
pub struct SearchProtocol<P: MarkupParser> {
    parser: P,
    config: SearchConfig,
}

impl<P: MarkupParser> SearchProtocol<P> {
    pub fn new(parser: P, config: SearchConfig) -> Self {
        Self { parser, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Navigate to the start page and wait for the query input.
    ///
    /// Failing here means the session never becomes usable.
    pub async fn bootstrap<S: SearchSession>(&self, session: &mut S) -> Result<(), AppError> {
        session
            .navigate(&self.config.start_url)
            .await
            .map_err(|e| AppError::BootstrapFailure(format!("navigation failed: {e}")))?;

        if self.wait_for_input(session, self.config.input_wait).await {
            Ok(())
        } else {
            Err(AppError::BootstrapFailure(format!(
                "search input not found within {}ms",
                self.config.input_wait.as_millis()
            )))
        }
    }

    /// Submit `query` and poll until the answer is ready or the budget is spent.
    pub async fn run<S: SearchSession>(
        &self,
        session: &mut S,
        query: &str,
        max_wait_seconds: u64,
    ) -> Result<SearchOutcome, AppError> {
        let input = session
            .locate_input()
            .await?
            .ok_or_else(|| AppError::SessionError("search input not found".into()))?;
        session.submit(&input, query).await?;
        tracing::debug!(state = %ProtocolState::Submitted, max_wait_seconds, "Query submitted");

        let mut cache = ParseCache::default();

        for attempt in 1..=max_wait_seconds {
            tokio::time::sleep(self.config.poll_interval).await;

            let markup = session.read_rendered_markup().await?;
            match self.parse_cached(markup, &mut cache).await {
                Ok(result) if result.has_references() => {
                    tracing::info!(
                        state = %ProtocolState::Succeeded,
                        attempt,
                        references = result.references.len(),
                        "Answer rendered"
                    );
                    return Ok(SearchOutcome {
                        result,
                        completion: Completion::Complete,
                        attempts: attempt,
                    });
                }
                Ok(result) => {
                    tracing::debug!(
                        state = %ProtocolState::Polling,
                        attempt,
                        max_wait_seconds,
                        text_blocks = result.text_blocks.len(),
                        "No references yet"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        state = %ProtocolState::Polling,
                        attempt,
                        error = %e,
                        "Parse failed, continuing"
                    );
                }
            }
        }

        tracing::warn!(max_wait_seconds, "No references before deadline");

        let markup = session.read_rendered_markup().await?;
        match self.parse_cached(markup, &mut cache).await {
            Ok(result) if result.has_references() => {
                return Ok(SearchOutcome {
                    result,
                    completion: Completion::Complete,
                    attempts: max_wait_seconds,
                });
            }
            Ok(result) if result.has_text() => {
                tracing::info!(
                    state = %ProtocolState::PartialTimeout,
                    text_blocks = result.text_blocks.len(),
                    "Returning partial answer"
                );
                return Ok(SearchOutcome {
                    result,
                    completion: Completion::Partial,
                    attempts: max_wait_seconds,
                });
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Final parse failed"),
        }

        tracing::warn!(state = %ProtocolState::Failed, max_wait_seconds, "Search timed out");
        Err(AppError::Timeout {
            seconds: max_wait_seconds,
        })
    }

    /// Return the session to its start page.
    ///
    /// A reset that leaves no usable input falls back to a full bootstrap.
    pub async fn reset<S: SearchSession>(&self, session: &mut S) -> Result<(), AppError> {
        match session.reset_session().await {
            Ok(()) => {
                if self.wait_for_input(session, self.config.reset_wait).await {
                    return Ok(());
                }
                tracing::warn!("Input missing after reset, re-bootstrapping session");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reset failed, re-bootstrapping session");
            }
        }

        self.bootstrap(session)
            .await
            .map_err(|e| AppError::ResetFailure(e.to_string()))
    }

    async fn wait_for_input<S: SearchSession>(&self, session: &mut S, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        loop {
            match session.locate_input().await {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "Input lookup failed"),
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.config.input_poll_interval).await;
        }
    }

    /// Parse off the async executor, reusing the last result when the markup is unchanged.
    async fn parse_cached(
        &self,
        markup: String,
        cache: &mut ParseCache,
    ) -> Result<ExtractionResult, AppError> {
        let content_hash = compute_hash(&markup);
        if content_hash == cache.content_hash {
            if let Some(result) = &cache.result {
                tracing::trace!(content_hash = %&content_hash[..8], "Markup unchanged");
                return Ok(result.clone());
            }
        }

        let parser = self.parser.clone();
        let result = tokio::task::spawn_blocking(move || parser.parse(&markup))
            .await
            .map_err(|e| AppError::ParseError(format!("parser task failed: {e}")))??;

        cache.content_hash = content_hash;
        cache.result = Some(result.clone());
        Ok(result)
    }
}
