use periscope_core::models::Image;
use scraper::{ElementRef, Html};

use crate::rules::Rules;

const SHORT_SVG_URL_CHARS: usize = 100;
const MIN_ALT_CHARS: usize = 3;
const ICON_ALT_EXEMPT_CHARS: usize = 20;

/// Content images embedded in the answer, in document order.
pub fn extract_images(document: &Html, rules: &Rules, max: usize) -> Vec<Image> {
    document
        .select(&rules.images)
        .filter_map(|img| content_image(img, rules))
        .take(max)
        .collect()
}

fn content_image(img: ElementRef<'_>, rules: &Rules) -> Option<Image> {
    let element = img.value();
    let src = element.attr("src").unwrap_or_default();
    let alt = element.attr("alt").unwrap_or_default().trim();

    if is_ui_source(src) {
        return None;
    }

    let alt_len = alt.chars().count();
    let alt_lower = alt.to_lowercase();
    if alt_len < MIN_ALT_CHARS
        || rules.is_generic_alt(&alt_lower)
        || (rules.is_icon_alt(&alt_lower) && alt_len < ICON_ALT_EXEMPT_CHARS)
    {
        return None;
    }

    // Short captions only pass on images hosted off-site.
    if alt_len <= MIN_ALT_CHARS && rules.is_source_site(src) {
        return None;
    }

    Some(Image {
        title: alt.to_string(),
        url: src.to_string(),
        width: dimension(element.attr("width")),
        height: dimension(element.attr("height")),
    })
}

fn is_ui_source(src: &str) -> bool {
    src.is_empty()
        || src.starts_with("data:image/svg")
        || src.to_lowercase().contains("favicon")
        || (src.ends_with(".svg") && src.chars().count() < SHORT_SVG_URL_CHARS)
}

fn dimension(value: Option<&str>) -> Option<u32> {
    value.and_then(|v| v.trim().parse().ok())
}
