pub mod images;
pub mod pipeline;
pub mod references;
pub mod rules;
pub mod text;

#[cfg(feature = "browser")]
pub mod browser_session;

pub use pipeline::{ExtractionConfig, ScraperPipeline};
pub use rules::{RulePatterns, Rules};

#[cfg(feature = "browser")]
pub use browser_session::{ChromiumSession, SessionConfig};
