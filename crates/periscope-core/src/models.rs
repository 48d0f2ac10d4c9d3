use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum number of references kept per result.
pub const MAX_REFERENCES: usize = 10;
/// Maximum number of inline images kept per result.
pub const MAX_IMAGES: usize = 5;
/// Maximum number of text blocks kept per result.
pub const MAX_TEXT_BLOCKS: usize = 20;
/// Maximum number of items in a single list block.
pub const MAX_LIST_ITEMS: usize = 10;

/// A unit of extracted prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph { snippet: String },
    List { items: Vec<String> },
}

impl Block {
    pub fn paragraph(snippet: impl Into<String>) -> Self {
        Block::Paragraph {
            snippet: snippet.into(),
        }
    }

    /// Builds a list block, keeping at most [`MAX_LIST_ITEMS`] items.
    pub fn list(mut items: Vec<String>) -> Self {
        items.truncate(MAX_LIST_ITEMS);
        Block::List { items }
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph { .. })
    }
}

/// An outbound link with its resolved destination and context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// Destination domain without a leading `www.`.
    pub source: String,
    pub thumbnail: String,
    pub favicon: String,
    /// 1-based position in the result.
    pub index: usize,
}

/// An image embedded in the answer body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub title: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Structured record extracted from one rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text_blocks: Vec<Block>,
    pub references: Vec<Reference>,
    pub inline_images: Vec<Image>,
}

impl ExtractionResult {
    /// Assembles a result, enforcing the per-field caps.
    pub fn new(
        mut text_blocks: Vec<Block>,
        mut references: Vec<Reference>,
        mut inline_images: Vec<Image>,
    ) -> Self {
        text_blocks.truncate(MAX_TEXT_BLOCKS);
        references.truncate(MAX_REFERENCES);
        inline_images.truncate(MAX_IMAGES);
        Self {
            text_blocks,
            references,
            inline_images,
        }
    }

    /// Reference presence is the signal that the answer finished rendering.
    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }

    pub fn has_text(&self) -> bool {
        !self.text_blocks.is_empty()
    }
}

/// How a search finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// References appeared before the deadline.
    Complete,
    /// Deadline passed; only prose was recovered.
    Partial,
}

/// Result delivered to the submitter of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub result: ExtractionResult,
    pub completion: Completion,
    /// Poll ticks consumed before returning.
    pub attempts: u64,
}

impl SearchOutcome {
    pub fn is_partial(&self) -> bool {
        self.completion == Completion::Partial
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
