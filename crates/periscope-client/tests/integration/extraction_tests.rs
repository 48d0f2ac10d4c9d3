use periscope_client::{ExtractionConfig, ScraperPipeline};
use periscope_core::MarkupParser;
use periscope_core::models::{Block, MAX_REFERENCES};

use crate::common::{INTRO, answer_page, page, paragraph};

fn pipeline() -> ScraperPipeline {
    ScraperPipeline::new().unwrap()
}

fn snippets(blocks: &[Block]) -> Vec<&str> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph { snippet } => Some(snippet.as_str()),
            Block::List { .. } => None,
        })
        .collect()
}

#[test]
fn six_paragraphs_become_three_after_leading_trim() {
    let sentences = [
        "Rust was started as a personal project at Mozilla Research.",
        "The compiler enforces ownership rules for every value.",
        "Cargo handles building, testing and publishing crates.",
        "Async functions return futures that executors poll.",
        "Traits describe shared behaviour across many types.",
        "Macros generate code before the type checker runs.",
    ];
    let fragments: Vec<String> = sentences.iter().map(|s| paragraph(s)).collect();
    let fragments: Vec<&str> = fragments.iter().map(String::as_str).collect();

    let result = pipeline().parse(&page(&fragments)).unwrap();

    assert_eq!(snippets(&result.text_blocks), sentences[3..].to_vec());
}

#[test]
fn leading_trim_is_tunable() {
    let pipeline = pipeline().with_config(ExtractionConfig::default().with_leading_skip(0));
    let html = answer_page(&[]);

    let result = pipeline.parse(&html).unwrap();

    assert_eq!(snippets(&result.text_blocks), INTRO.to_vec());
}

#[test]
fn tiny_sentences_and_short_sections_yield_nothing() {
    let html = page(&[
        &paragraph("A. B. C."),
        &paragraph("Short section."),
        "<div>Images Videos News Shopping</div>",
    ]);

    let result = pipeline().parse(&html).unwrap();

    assert!(result.text_blocks.is_empty());
}

#[test]
fn fifteen_external_links_give_ten_references() {
    let links: Vec<String> = (1..=15)
        .map(|i| {
            format!(r#"<p><a href="https://site{i}.example.org/article">Article from site {i}</a></p>"#)
        })
        .collect();
    let links: Vec<&str> = links.iter().map(String::as_str).collect();

    let result = pipeline().parse(&page(&links)).unwrap();

    assert_eq!(result.references.len(), MAX_REFERENCES);
    let indices: Vec<usize> = result.references.iter().map(|r| r.index).collect();
    assert_eq!(indices, (1..=10).collect::<Vec<_>>());
    assert_eq!(result.references[0].source, "site1.example.org");
    assert_eq!(result.references[9].link, "https://site10.example.org/article");
}

#[test]
fn redirects_to_one_destination_collapse_into_first_reference() {
    let html = page(&[
        r#"<p><a href="https://other.example.net/">Another useful resource</a></p>"#,
        r#"<p><a href="/url?q=https://www.example.org/guide&amp;sa=U">Guide to async Rust</a></p>"#,
        r#"<p><a href="https://www.google.com/url?q=https://www.example.org/guide&amp;ved=1">Async guide again</a></p>"#,
    ]);

    let result = pipeline().parse(&html).unwrap();

    let links: Vec<&str> = result.references.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(
        links,
        vec!["https://www.example.org/guide", "https://other.example.net/"]
    );
    assert_eq!(result.references[0].index, 1);
    assert_eq!(result.references[0].title, "Guide to async Rust");
    assert_eq!(result.references[0].source, "example.org");
}

#[test]
fn full_answer_page() {
    let html = answer_page(&[
        "<div>Images Videos News Shopping</div>",
        &paragraph(
            "Rust prevents data races at compile time. Its ownership model tracks which thread may mutate each value.",
        ),
        "<div>Main benefits of the language\n• Memory safety without garbage collection\n• Fearless concurrency through ownership\n• Zero-cost abstractions for performance</div>",
        r#"<div><a href="/url?q=https://doc.rust-lang.org/book/ch16-00-concurrency.html&amp;sa=U">Fearless Concurrency - The Rust Book</a><span> - Handling concurrent programming safely and efficiently is another of Rust's major goals.</span></div>"#,
        r#"<img src="https://upload.example.org/ferris.png" alt="Ferris the crab, unofficial mascot" width="240" height="160">"#,
        r#"<img src="https://www.gstatic.com/images/icons/search.svg" alt="">"#,
    ]);

    let result = pipeline().parse(&html).unwrap();

    assert_eq!(
        &result.text_blocks[..3],
        &[
            Block::paragraph("Rust prevents data races at compile time."),
            Block::paragraph("Its ownership model tracks which thread may mutate each value."),
            Block::list(vec![
                "Main benefits of the language".into(),
                "Memory safety without garbage collection".into(),
                "Fearless concurrency through ownership".into(),
                "Zero-cost abstractions for performance".into(),
            ]),
        ]
    );

    assert_eq!(result.references.len(), 1);
    let reference = &result.references[0];
    assert_eq!(
        reference.link,
        "https://doc.rust-lang.org/book/ch16-00-concurrency.html"
    );
    assert_eq!(reference.title, "Fearless Concurrency - The Rust Book");
    assert_eq!(
        reference.snippet,
        "Handling concurrent programming safely and efficiently is another of Rust's major goals."
    );
    assert_eq!(reference.source, "doc.rust-lang.org");

    assert_eq!(result.inline_images.len(), 1);
    assert_eq!(result.inline_images[0].width, Some(240));
    assert_eq!(result.inline_images[0].height, Some(160));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["text_blocks"][2]["type"], "list");
    assert_eq!(json["references"][0]["index"], 1);
}

#[test]
fn parsing_twice_is_stable() {
    let html = answer_page(&[&paragraph(
        "Serde derives serializers at compile time. Serde derives serializers at compile time.",
    )]);
    let pipeline = pipeline();

    let first = pipeline.parse(&html).unwrap();
    let second = pipeline.parse(&html).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        snippets(&first.text_blocks),
        vec!["Serde derives serializers at compile time."]
    );
}
