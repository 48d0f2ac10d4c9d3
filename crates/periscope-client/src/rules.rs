use periscope_core::error::AppError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Raw, uncompiled rule table.
///
/// Every pattern the pipeline matches against lives here so callers can swap
/// in their own vocabulary without touching the extraction code. Patterns
/// are compiled once by [`Rules::new`].
#[derive(Debug, Clone)]
pub struct RulePatterns {
    /// Case-insensitive patterns marking navigation chrome and footers.
    pub noise: Vec<String>,
    /// Any match marks a section as a list.
    pub list_markers: Vec<String>,
    /// Splits a list section into items.
    pub list_item_split: String,
    /// Boundary between sections of flattened text.
    pub section_break: String,
    /// Sentence boundary; the split happens across the `gap` group.
    pub sentence_boundary: String,
    pub cta_prefix: String,
    pub cta_suffix: String,
    /// Characters trimmed off both ends of a reference snippet.
    pub snippet_separators: Vec<char>,
    /// Alt texts that carry no information on their own.
    pub generic_alt: Vec<String>,
    /// Alt keywords that mark icons unless the alt text is long.
    pub icon_alt: Vec<String>,
    /// Domains that belong to the search site itself.
    pub source_domains: Vec<String>,
    /// Origin that relative redirect links resolve against.
    pub redirect_base: String,
    /// Path prefix of redirect-wrapped links.
    pub redirect_path: String,
    /// Query parameter carrying the real destination.
    pub redirect_param: String,
    /// Elements removed before any text is read.
    pub stripped_tags: Vec<String>,
}

impl Default for RulePatterns {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            noise: strings(&[
                r"^(Images|Videos|News|Shopping|Maps|Books|Tools|Settings|Sign in)(\s|$)",
                r"^\s*(Privacy|Terms|Advertising|About|Google)(\s|$)",
                r"^(All|Any time|Past hour|Past day|Past week)(\s|$)",
                r"^(Sort by|Clear)(\s|$)",
                r"^\s*(delete|click here|redirect|access|learn more)(\s|$)",
                r"^\s*(cookie|privacy policy|terms of service)",
                r"^\s*(search history|turn on|turn off)",
                r"^\s*(related searches|people also)",
                r"^\s*(Google apps|Google Account)",
            ]),
            list_markers: strings(&[
                r"(?m)^\s*[•\-*]\s+",
                r"(?m)^\s*\d+\.\s+",
                r"\n\s*[•\-*]\s+",
                r"\n\s*\d+\.\s+",
                r":\s*\n\s*[A-Z]",
            ]),
            list_item_split: r"(?:^|\n)\s*(?:[•\-*]|\d+\.)\s+".to_string(),
            section_break: r"\n\s*\n+".to_string(),
            sentence_boundary: r"[.!?](?P<gap>\s+)[A-Z]".to_string(),
            cta_prefix: r"(?i)^(Learn more|Read more|Click here|Visit|Go to)\s*".to_string(),
            cta_suffix: r"(?i)\s*(Learn more|Read more|Click here)$".to_string(),
            snippet_separators: vec!['-', '|', '•'],
            generic_alt: strings(&["image", "photo", "picture"]),
            icon_alt: strings(&["icon", "logo"]),
            source_domains: strings(&["google.com", "gstatic.com"]),
            redirect_base: "https://www.google.com".to_string(),
            redirect_path: "/url?".to_string(),
            redirect_param: "q".to_string(),
            stripped_tags: strings(&["script", "style", "noscript"]),
        }
    }
}

/// Compiled rule table shared by every stage of the pipeline.
#[derive(Debug)]
pub struct Rules {
    noise: Vec<Regex>,
    list_markers: Vec<Regex>,
    list_item_split: Regex,
    section_break: Regex,
    sentence_boundary: Regex,
    cta_prefix: Regex,
    cta_suffix: Regex,
    snippet_separators: Vec<char>,
    generic_alt: Vec<String>,
    icon_alt: Vec<String>,
    source_domains: Vec<String>,
    redirect_base: String,
    redirect_path: String,
    redirect_param: String,
    pub(crate) stripped: Selector,
    pub(crate) images: Selector,
    pub(crate) links: Selector,
    pub(crate) pinged_links: Selector,
}

impl Rules {
    pub fn new(patterns: RulePatterns) -> Result<Self, AppError> {
        let noise = patterns
            .noise
            .iter()
            .map(|p| compile(&format!("(?i){p}")))
            .collect::<Result<Vec<_>, _>>()?;
        let list_markers = patterns
            .list_markers
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let sentence_boundary = compile(&patterns.sentence_boundary)?;
        if sentence_boundary.capture_names().all(|name| name != Some("gap")) {
            return Err(AppError::ConfigError(
                "sentence boundary pattern needs a named `gap` group".into(),
            ));
        }

        Ok(Self {
            noise,
            list_markers,
            list_item_split: compile(&patterns.list_item_split)?,
            section_break: compile(&patterns.section_break)?,
            sentence_boundary,
            cta_prefix: compile(&patterns.cta_prefix)?,
            cta_suffix: compile(&patterns.cta_suffix)?,
            snippet_separators: patterns.snippet_separators,
            generic_alt: patterns.generic_alt,
            icon_alt: patterns.icon_alt,
            source_domains: patterns.source_domains,
            redirect_base: patterns.redirect_base,
            redirect_path: patterns.redirect_path,
            redirect_param: patterns.redirect_param,
            stripped: selector(&patterns.stripped_tags.join(", "))?,
            images: selector("img")?,
            links: selector("a[href]")?,
            pinged_links: selector("a[ping]")?,
        })
    }

    /// The built-in rule table for the AI-mode results page.
    pub fn standard() -> Result<Self, AppError> {
        Self::new(RulePatterns::default())
    }

    /// Text that looks like page chrome rather than answer content.
    ///
    /// Anything under 10 characters is noise; anything over 1000 never is.
    pub fn is_ui_noise(&self, text: &str) -> bool {
        let len = text.chars().count();
        if len < 10 {
            return true;
        }
        if len > 1000 {
            return false;
        }
        self.noise.iter().any(|re| re.is_match(text))
    }

    pub(crate) fn split_sections<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> {
        self.section_break.split(text)
    }

    pub(crate) fn looks_like_list(&self, section: &str) -> bool {
        if self.list_markers.iter().any(|re| re.is_match(section)) {
            return true;
        }
        let colon_lines = section
            .split('\n')
            .filter(|line| line.contains(':') && line.chars().count() > 10)
            .count();
        colon_lines >= 2
    }

    pub(crate) fn split_list_items<'t>(&self, section: &'t str) -> Vec<&'t str> {
        self.list_item_split.split(section).collect()
    }

    /// Splits at every boundary gap, keeping punctuation with the sentence
    /// it ends and the capital with the sentence it starts.
    pub(crate) fn split_sentences<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for caps in self.sentence_boundary.captures_iter(text) {
            if let Some(gap) = caps.name("gap") {
                pieces.push(&text[start..gap.start()]);
                start = gap.end();
            }
        }
        pieces.push(&text[start..]);
        pieces
    }

    pub(crate) fn strip_cta(&self, snippet: &str) -> String {
        let without_prefix = self.cta_prefix.replace(snippet, "");
        self.cta_suffix.replace(&without_prefix, "").into_owned()
    }

    pub(crate) fn trim_separators<'t>(&self, text: &'t str) -> &'t str {
        text.trim_matches(|c: char| c.is_whitespace() || self.snippet_separators.contains(&c))
    }

    pub(crate) fn is_generic_alt(&self, alt_lower: &str) -> bool {
        self.generic_alt.iter().any(|g| g == alt_lower)
    }

    pub(crate) fn is_icon_alt(&self, alt_lower: &str) -> bool {
        self.icon_alt.iter().any(|k| alt_lower.contains(k.as_str()))
    }

    /// Whether a URL is served by the search site itself.
    ///
    /// Relative URLs count as the site's own.
    pub fn is_source_site(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed
                .host_str()
                .is_none_or(|host| self.is_source_host(host)),
            Err(_) => true,
        }
    }

    fn is_source_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.source_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    /// Substring check used to pre-select plain outbound links.
    pub(crate) fn mentions_source_domain(&self, href: &str) -> bool {
        self.source_domains.iter().any(|d| href.contains(d.as_str()))
    }

    pub(crate) fn is_redirect(&self, href: &str) -> bool {
        href.starts_with(&self.redirect_path)
            || self
                .source_domains
                .iter()
                .any(|d| href.contains(&format!("{d}{}", self.redirect_path)))
    }

    /// Resolve a redirect-wrapped link to its destination.
    ///
    /// Links that are not redirects, or that carry no destination parameter,
    /// come back unchanged.
    pub fn unwrap_redirect(&self, href: &str) -> String {
        let absolute = if href.starts_with(&self.redirect_path) {
            Url::parse(&format!("{}{href}", self.redirect_base))
        } else if self.is_redirect(href) {
            Url::parse(href)
        } else {
            return href.to_string();
        };

        absolute
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == self.redirect_param.as_str())
                    .map(|(_, value)| value.into_owned())
            })
            .unwrap_or_else(|| href.to_string())
    }
}

fn compile(pattern: &str) -> Result<Regex, AppError> {
    Regex::new(pattern).map_err(|e| AppError::ConfigError(format!("invalid pattern {pattern:?}: {e}")))
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::ConfigError(format!("invalid selector {css:?}: {e}")))
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
