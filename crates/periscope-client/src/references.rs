use std::collections::HashSet;

use periscope_core::models::Reference;
use scraper::{ElementRef, Html};
use url::Url;

use crate::rules::{Rules, collapse_whitespace, truncate_chars};

const MIN_TITLE_CHARS: usize = 3;
const TITLE_MAX_CHARS: usize = 100;
const SNIPPET_MAX_CHARS: usize = 250;
const CONTEXT_MIN_CHARS: usize = 10;

/// Outbound references in first-seen order, unique by destination.
pub fn extract_references(document: &Html, rules: &Rules, max: usize) -> Vec<Reference> {
    let mut references: Vec<Reference> = Vec::new();
    let mut seen_urls = HashSet::new();

    for link in candidate_links(document, rules) {
        if references.len() >= max {
            break;
        }

        let href = href_of(&link);
        let title = link_title(link);
        if title.chars().count() < MIN_TITLE_CHARS {
            continue;
        }

        let destination = rules.unwrap_redirect(href);
        if destination.is_empty()
            || destination.starts_with('#')
            || (destination == href && href.starts_with('/'))
            || rules.is_source_site(&destination)
        {
            continue;
        }
        if !seen_urls.insert(destination.clone()) {
            continue;
        }
        let Some(source) = source_domain(&destination) else {
            continue;
        };

        let snippet = link_snippet(link, &title, rules);
        references.push(Reference {
            title: truncate_chars(&title, TITLE_MAX_CHARS),
            link: destination,
            snippet,
            source,
            thumbnail: String::new(),
            favicon: String::new(),
            index: references.len() + 1,
        });
    }

    references
}

/// Redirect-wrapped links, then pinged links, then plain outbound links,
/// each element at most once.
fn candidate_links<'a>(document: &'a Html, rules: &'a Rules) -> Vec<ElementRef<'a>> {
    let redirects = document
        .select(&rules.links)
        .filter(|a| rules.is_redirect(href_of(a)));
    let pinged = document.select(&rules.pinged_links);
    let outbound = document.select(&rules.links).filter(|a| {
        let href = href_of(a);
        href.starts_with("http") && !rules.mentions_source_domain(href)
    });

    let mut seen_nodes = HashSet::new();
    redirects
        .chain(pinged)
        .chain(outbound)
        .filter(|link| seen_nodes.insert(link.id()))
        .collect()
}

fn href_of<'a>(link: &ElementRef<'a>) -> &'a str {
    link.value().attr("href").unwrap_or_default()
}

fn link_title(link: ElementRef<'_>) -> String {
    let mut title = element_text(link);
    if title.chars().count() >= MIN_TITLE_CHARS {
        return title;
    }

    if let Some(parent) = link.parent().and_then(ElementRef::wrap) {
        let parent_text = element_text(parent);
        if parent_text.chars().count() > CONTEXT_MIN_CHARS {
            title = truncate_chars(&parent_text, TITLE_MAX_CHARS);
        }
    }
    if title.chars().count() < 5 {
        if let Some(text) = sibling_texts(link).find(|t| t.chars().count() > CONTEXT_MIN_CHARS) {
            title = truncate_chars(&text, TITLE_MAX_CHARS);
        }
    }
    title
}

/// Context for a link: the parent's text without the title, else the
/// grandparent's, else the first substantial following sibling.
fn link_snippet(link: ElementRef<'_>, title: &str, rules: &Rules) -> String {
    let title_len = title.chars().count();
    let parent = link.parent().and_then(ElementRef::wrap);
    let mut snippet = String::new();

    if let Some(parent) = parent {
        let text = element_text(parent);
        if text.chars().count() > title_len + 30 {
            snippet = surrounding_text(&text, title, rules);
        }
    }

    if snippet.chars().count() < 30 {
        let grandparent = parent
            .and_then(|p| p.parent())
            .and_then(ElementRef::wrap);
        if let Some(grandparent) = grandparent {
            let text = element_text(grandparent);
            if text.chars().count() > title_len + 50 {
                snippet = surrounding_text(&text, title, rules);
            }
        }
    }

    if snippet.chars().count() < 20 {
        if let Some(text) = sibling_texts(link).find(|t| t.chars().count() > 20) {
            snippet = truncate_chars(&text, TITLE_MAX_CHARS);
        }
    }

    if snippet.is_empty() {
        return snippet;
    }
    let snippet = rules.strip_cta(&snippet);
    if rules.is_ui_noise(&snippet) {
        return String::new();
    }
    truncate_chars(&snippet, SNIPPET_MAX_CHARS)
}

fn surrounding_text(text: &str, title: &str, rules: &Rules) -> String {
    rules.trim_separators(&text.replace(title, "")).to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn sibling_texts<'a>(link: ElementRef<'a>) -> impl Iterator<Item = String> + 'a {
    link.next_siblings().map(|node| match ElementRef::wrap(node) {
        Some(element) => element_text(element),
        None => node
            .value()
            .as_text()
            .map(|text| collapse_whitespace(text))
            .unwrap_or_default(),
    })
}

/// Host without a leading `www.`.
fn source_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let domain = host.strip_prefix("www.").unwrap_or(host);
    (!domain.is_empty()).then(|| domain.to_string())
}
