use std::sync::Arc;

use periscope_core::error::AppError;
use periscope_core::models::{ExtractionResult, MAX_IMAGES, MAX_REFERENCES, MAX_TEXT_BLOCKS};
use periscope_core::traits::MarkupParser;
use scraper::Html;

use crate::images::extract_images;
use crate::references::extract_references;
use crate::rules::Rules;
use crate::text::{build_blocks, drop_leading_paragraphs};

/// Tunables for [`ScraperPipeline`].
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Paragraphs dropped from the top of the answer; the page opens with
    /// chrome that survives the noise filter.
    pub leading_paragraphs_to_skip: usize,
    /// Capped at [`MAX_TEXT_BLOCKS`].
    pub max_text_blocks: usize,
    /// Capped at [`MAX_REFERENCES`].
    pub max_references: usize,
    /// Capped at [`MAX_IMAGES`].
    pub max_images: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            leading_paragraphs_to_skip: 3,
            max_text_blocks: MAX_TEXT_BLOCKS,
            max_references: MAX_REFERENCES,
            max_images: MAX_IMAGES,
        }
    }
}

impl ExtractionConfig {
    /// Read configuration from environment variables.
    ///
    /// - `PERISCOPE_LEADING_SKIP` (optional, defaults to 3, may be 0)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("PERISCOPE_LEADING_SKIP") {
            config.leading_paragraphs_to_skip = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "PERISCOPE_LEADING_SKIP must be a non-negative integer, got {raw:?}"
                ))
            })?;
        }
        Ok(config)
    }

    pub fn with_leading_skip(mut self, count: usize) -> Self {
        self.leading_paragraphs_to_skip = count;
        self
    }

    /// Lowers the per-field caps. Values above the model limits are clamped.
    pub fn with_limits(mut self, text_blocks: usize, references: usize, images: usize) -> Self {
        self.max_text_blocks = text_blocks;
        self.max_references = references;
        self.max_images = images;
        self.clamped()
    }

    /// The same config with every cap brought within the model limits.
    pub fn clamped(mut self) -> Self {
        self.max_text_blocks = self.max_text_blocks.min(MAX_TEXT_BLOCKS);
        self.max_references = self.max_references.min(MAX_REFERENCES);
        self.max_images = self.max_images.min(MAX_IMAGES);
        self
    }
}

/// Markup → [`ExtractionResult`] using `scraper` for the DOM and a
/// [`Rules`] table for every text heuristic.
///
/// Cheap to clone; the compiled rules are shared.
#[derive(Debug, Clone)]
pub struct ScraperPipeline {
    rules: Arc<Rules>,
    config: ExtractionConfig,
}

impl ScraperPipeline {
    /// Pipeline with the built-in rule table and default tunables.
    pub fn new() -> Result<Self, AppError> {
        Ok(Self::with_rules(Rules::standard()?, ExtractionConfig::default()))
    }

    pub fn with_rules(rules: Rules, config: ExtractionConfig) -> Self {
        Self {
            rules: Arc::new(rules),
            config: config.clamped(),
        }
    }

    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config.clamped();
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Parse and strip non-content elements.
    fn sanitize(&self, markup: &str) -> Html {
        let mut document = Html::parse_document(markup);
        let stripped: Vec<_> = document.select(&self.rules.stripped).map(|el| el.id()).collect();
        for id in stripped {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
        document
    }
}

impl MarkupParser for ScraperPipeline {
    fn parse(&self, markup: &str) -> Result<ExtractionResult, AppError> {
        let document = self.sanitize(markup);

        let inline_images = extract_images(&document, &self.rules, self.config.max_images);

        let text: String = document.root_element().text().collect();
        let blocks = build_blocks(&text, &self.rules, self.config.max_text_blocks);
        let text_blocks = drop_leading_paragraphs(blocks, self.config.leading_paragraphs_to_skip);

        let references = extract_references(&document, &self.rules, self.config.max_references);

        tracing::trace!(
            text_blocks = text_blocks.len(),
            references = references.len(),
            images = inline_images.len(),
            "Markup parsed"
        );

        Ok(ExtractionResult::new(text_blocks, references, inline_images))
    }
}
