//! Runs one query through a pool of headless Chromium sessions.
//!
//! Run with:
//!   cargo run --example ai_search --features browser -- "what is a borrow checker"

use periscope_client::{ChromiumSession, ExtractionConfig, ScraperPipeline, SessionConfig};
use periscope_core::{JobRouter, PoolConfig, SearchConfig, SearchProtocol, TracingWorkerReporter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "how does rust ensure memory safety".to_string());

    let pool_config = PoolConfig::from_env()?;
    let pipeline = ScraperPipeline::new()?.with_config(ExtractionConfig::from_env()?);
    let protocol = SearchProtocol::new(pipeline, SearchConfig::from_env()?);

    println!("Launching {} browser session(s)…", pool_config.workers);
    let sessions = ChromiumSession::launch_many(&SessionConfig::from_env()?, pool_config.workers).await?;
    let router = JobRouter::start(sessions, protocol, &pool_config, TracingWorkerReporter).await?;

    let outcome = router.submit_with_fallback(&query, router.default_max_wait()).await;
    router.shutdown().await;

    let outcome = outcome?;
    println!(
        "{:?} after {} poll(s): {} blocks, {} references",
        outcome.completion,
        outcome.attempts,
        outcome.result.text_blocks.len(),
        outcome.result.references.len()
    );
    println!("{}", serde_json::to_string_pretty(&outcome.result)?);
    Ok(())
}
