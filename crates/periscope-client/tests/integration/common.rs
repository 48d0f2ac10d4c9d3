use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use periscope_core::error::AppError;
use periscope_core::traits::SearchSession;
use periscope_core::{SearchConfig, SearchProtocol};
use periscope_client::ScraperPipeline;

/// Paragraphs the results page opens with; the leading trim removes them.
pub const INTRO: [&str; 3] = [
    "AI Mode answers are generated from many sources.",
    "Responses may include mistakes, so verify facts.",
    "Ask a follow up question to refine this overview.",
];

/// Wraps body fragments in a results page, one blank line between fragments.
pub fn page(fragments: &[&str]) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>AI Mode</title>\
         <script>window.__state = {{\"loading\": true}};</script></head>\
         <body>\n\n{}\n\n</body></html>",
        fragments.join("\n\n")
    )
}

pub fn paragraph(text: &str) -> String {
    format!("<p>{text}</p>")
}

/// Intro chrome followed by `fragments`.
pub fn answer_page(fragments: &[&str]) -> String {
    let intro: Vec<String> = INTRO.iter().map(|p| paragraph(p)).collect();
    let mut all: Vec<&str> = intro.iter().map(String::as_str).collect();
    all.extend_from_slice(fragments);
    page(&all)
}

/// A page still rendering: a spinner and nothing else.
pub fn loading_page() -> String {
    page(&[r#"<div role="progressbar">Loading</div>"#])
}

pub fn fast_search_config() -> SearchConfig {
    SearchConfig::default()
        .with_start_url("https://search.test/?udm=50&q=")
        .with_poll_interval(Duration::from_millis(1))
        .with_input_wait(Duration::from_millis(50), Duration::from_millis(1))
        .with_reset_wait(Duration::from_millis(20))
}

pub fn protocol() -> SearchProtocol<ScraperPipeline> {
    SearchProtocol::new(ScraperPipeline::new().unwrap(), fast_search_config())
}

// ---------------------------------------------------------------------------
// ScriptedSession
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Script {
    pages: VecDeque<String>,
    submitted: Vec<String>,
    resets: usize,
}

/// Session that serves a fixed sequence of pages. The last page repeats.
/// Clones share the script, so tests keep one to inspect calls.
#[derive(Clone, Default)]
pub struct ScriptedSession {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSession {
    pub fn new(pages: Vec<String>) -> Self {
        let script = Script {
            pages: pages.into(),
            ..Default::default()
        };
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    pub fn submitted(&self) -> Vec<String> {
        self.script.lock().unwrap().submitted.clone()
    }

    pub fn resets(&self) -> usize {
        self.script.lock().unwrap().resets
    }
}

impl SearchSession for ScriptedSession {
    type Input = ();

    async fn navigate(&mut self, _url: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn locate_input(&mut self) -> Result<Option<()>, AppError> {
        Ok(Some(()))
    }

    async fn submit(&mut self, _input: &(), text: &str) -> Result<(), AppError> {
        self.script.lock().unwrap().submitted.push(text.to_string());
        Ok(())
    }

    async fn read_rendered_markup(&mut self) -> Result<String, AppError> {
        let mut script = self.script.lock().unwrap();
        let page = if script.pages.len() > 1 {
            script.pages.pop_front().unwrap_or_default()
        } else {
            script.pages.front().cloned().unwrap_or_default()
        };
        Ok(page)
    }

    async fn reset_session(&mut self) -> Result<(), AppError> {
        self.script.lock().unwrap().resets += 1;
        Ok(())
    }

    async fn close_session(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}
