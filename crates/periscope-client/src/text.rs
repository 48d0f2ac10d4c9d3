//! Flattened page text → paragraph and list blocks.

use std::collections::HashSet;

use periscope_core::models::{Block, MAX_LIST_ITEMS};

use crate::rules::{Rules, collapse_whitespace};

const MIN_SECTION_CHARS: usize = 30;
const MIN_SENTENCE_CHARS: usize = 20;
const MIN_LIST_ITEM_CHARS: usize = 10;
const MIN_COLON_LINE_CHARS: usize = 15;
const WORD_OVERLAP_THRESHOLD: f64 = 0.7;

/// Turn flattened text into deduplicated blocks, before the leading trim.
pub fn build_blocks(text: &str, rules: &Rules, max_blocks: usize) -> Vec<Block> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut blocks = Vec::new();
    for section in rules.split_sections(text) {
        let section = section.trim();
        if !is_content_section(section, rules) {
            continue;
        }

        if rules.looks_like_list(section) {
            let items = list_items(section, rules);
            if !items.is_empty() {
                blocks.push(Block::list(items));
                continue;
            }
        }
        // Prose, or a list-shaped section with no usable items
        blocks.extend(sentences(section, rules).into_iter().map(Block::paragraph));
    }

    dedup_blocks(blocks, max_blocks)
}

fn is_content_section(section: &str, rules: &Rules) -> bool {
    let len = section.chars().count();
    if len < MIN_SECTION_CHARS || rules.is_ui_noise(section) {
        return false;
    }
    // Mostly punctuation or navigation glyphs
    let wordish = section
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .count();
    wordish * 2 >= len
}

fn sentences(section: &str, rules: &Rules) -> Vec<String> {
    rules
        .split_sentences(section)
        .into_iter()
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS && !rules.is_ui_noise(s))
        .map(str::to_string)
        .collect()
}

/// Marker-delimited items; colon-separated lines when the section has no
/// usable markers and at least one such line exists.
fn list_items(section: &str, rules: &Rules) -> Vec<String> {
    let mut candidates: Vec<&str> = rules
        .split_list_items(section)
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .collect();

    if candidates.len() < 2 {
        let colon_lines: Vec<&str> = section
            .split('\n')
            .filter(|line| line.contains(':') && line.chars().count() > MIN_COLON_LINE_CHARS)
            .collect();
        if !colon_lines.is_empty() {
            candidates = colon_lines;
        }
    }

    let mut items: Vec<String> = Vec::new();
    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.chars().count() < MIN_LIST_ITEM_CHARS || rules.is_ui_noise(candidate) {
            continue;
        }
        let item = collapse_whitespace(candidate);
        if !items.contains(&item) {
            items.push(item);
        }
        if items.len() == MAX_LIST_ITEMS {
            break;
        }
    }
    items
}

/// Drop paragraphs that repeat an earlier one, then cap the block count.
///
/// A paragraph repeats an earlier one when either contains the other, or
/// when their shared words exceed 70% of the shorter one's word count.
/// Lists are never dropped.
pub fn dedup_blocks(blocks: Vec<Block>, max_blocks: usize) -> Vec<Block> {
    let mut kept: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks {
        let repeated = match &block {
            Block::Paragraph { snippet } => kept.iter().any(|earlier| match earlier {
                Block::Paragraph { snippet: seen } => overlaps(snippet, seen),
                Block::List { .. } => false,
            }),
            Block::List { .. } => false,
        };
        if !repeated {
            kept.push(block);
        }
    }
    kept.truncate(max_blocks);
    kept
}

fn overlaps(a: &str, b: &str) -> bool {
    if a.chars().count() <= MIN_SENTENCE_CHARS || b.chars().count() <= MIN_SENTENCE_CHARS {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    let a_set: HashSet<&str> = a_words.iter().copied().collect();
    let b_set: HashSet<&str> = b_words.iter().copied().collect();
    let shared = a_set.intersection(&b_set).count();
    shared as f64 > a_words.len().min(b_words.len()) as f64 * WORD_OVERLAP_THRESHOLD
}

/// Remove the first `count` paragraphs; lists keep their place.
pub fn drop_leading_paragraphs(blocks: Vec<Block>, count: usize) -> Vec<Block> {
    let mut dropped = 0;
    blocks
        .into_iter()
        .filter(|block| {
            if block.is_paragraph() && dropped < count {
                dropped += 1;
                return false;
            }
            true
        })
        .collect()
}
