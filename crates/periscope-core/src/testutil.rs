//! Test utilities: mock implementations of the session and parser traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, so a clone kept by
//! the test can inspect calls made after the original moved into a worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::AppError;
use crate::models::{Block, ExtractionResult, Reference};
use crate::traits::{MarkupParser, SearchSession};

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

/// Recorded interactions and scripted behaviour of a [`MockSession`].
#[derive(Default)]
pub struct MockSessionState {
    /// Markup returned by successive reads. The last entry repeats forever.
    pub markups: VecDeque<String>,
    /// Results of successive input lookups. When exhausted, `input_present` applies.
    pub input_lookups: VecDeque<bool>,
    pub input_present: bool,
    pub navigate_error: Option<AppError>,
    pub reset_error: Option<AppError>,
    pub read_error: Option<AppError>,
    /// Delay applied to every read, to keep a job in flight.
    pub read_delay: Duration,
    pub navigations: Vec<String>,
    pub submitted: Vec<String>,
    pub reads: usize,
    pub resets: usize,
    pub closed: bool,
}

/// Scripted session. Clones share state.
#[derive(Clone)]
pub struct MockSession {
    pub state: Arc<Mutex<MockSessionState>>,
}

impl MockSession {
    /// A session whose input is always present and whose page serves `markups` in order.
    pub fn with_markups(markups: &[&str]) -> Self {
        let state = MockSessionState {
            markups: markups.iter().map(|m| m.to_string()).collect(),
            input_present: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A session whose input never shows up.
    pub fn without_input() -> Self {
        let session = Self::with_markups(&[]);
        session.state.lock().unwrap().input_present = false;
        session
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl SearchSession for MockSession {
    type Input = ();

    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.navigate_error.take() {
            return Err(e);
        }
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn locate_input(&mut self) -> Result<Option<()>, AppError> {
        let mut state = self.state.lock().unwrap();
        let present = match state.input_lookups.pop_front() {
            Some(present) => present,
            None => state.input_present,
        };
        Ok(present.then_some(()))
    }

    async fn submit(&mut self, _input: &(), text: &str) -> Result<(), AppError> {
        self.state.lock().unwrap().submitted.push(text.to_string());
        Ok(())
    }

    async fn read_rendered_markup(&mut self) -> Result<String, AppError> {
        let delay = self.state.lock().unwrap().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if let Some(e) = state.read_error.take() {
            return Err(e);
        }
        let markup = if state.markups.len() > 1 {
            state.markups.pop_front().unwrap_or_default()
        } else {
            state.markups.front().cloned().unwrap_or_default()
        };
        Ok(markup)
    }

    async fn reset_session(&mut self) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.resets += 1;
        match state.reset_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn close_session(&mut self) -> Result<(), AppError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Parser keyed on marker strings inside the markup:
///
/// - `<refs>`: one paragraph and one reference
/// - `<text>`: one paragraph, no references
/// - `<broken>`: a parse error
/// - `<panic>`: panics inside the parser
/// - anything else: an empty result
#[derive(Clone, Default)]
pub struct MockParser {
    pub parses: Arc<AtomicUsize>,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }
}

impl MarkupParser for MockParser {
    fn parse(&self, markup: &str) -> Result<ExtractionResult, AppError> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        if markup.contains("<panic>") {
            panic!("parser blew up");
        }
        if markup.contains("<broken>") {
            return Err(AppError::ParseError("unbalanced markup".into()));
        }
        if markup.contains("<refs>") {
            return Ok(answer_with_references());
        }
        if markup.contains("<text>") {
            return Ok(ExtractionResult::new(
                vec![Block::paragraph("Partial answer prose that is still rendering.")],
                vec![],
                vec![],
            ));
        }
        Ok(ExtractionResult::default())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock worker reporter that records event labels.
#[derive(Clone, Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl crate::worker::WorkerReporter for MockReporter {
    fn report(&self, event: crate::worker::WorkerEvent<'_>) {
        let label = match &event {
            crate::worker::WorkerEvent::Started { .. } => "Started",
            crate::worker::WorkerEvent::JobStarted { .. } => "JobStarted",
            crate::worker::WorkerEvent::JobCompleted { .. } => "JobCompleted",
            crate::worker::WorkerEvent::JobFailed { .. } => "JobFailed",
            crate::worker::WorkerEvent::ResetFailed { .. } => "ResetFailed",
            crate::worker::WorkerEvent::ShuttingDown { .. } => "ShuttingDown",
            crate::worker::WorkerEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A complete answer: one paragraph and one reference.
pub fn answer_with_references() -> ExtractionResult {
    ExtractionResult::new(
        vec![Block::paragraph("Rust is a systems programming language.")],
        vec![Reference {
            title: "The Rust Programming Language".into(),
            link: "https://www.rust-lang.org/".into(),
            snippet: "A language empowering everyone.".into(),
            source: "rust-lang.org".into(),
            thumbnail: String::new(),
            favicon: String::new(),
            index: 1,
        }],
        vec![],
    )
}

/// Millisecond-scale timings so protocol tests run quickly.
pub fn fast_config() -> SearchConfig {
    SearchConfig::default()
        .with_start_url("https://search.test/?q=")
        .with_poll_interval(Duration::from_millis(1))
        .with_input_wait(Duration::from_millis(20), Duration::from_millis(1))
        .with_reset_wait(Duration::from_millis(10))
}
