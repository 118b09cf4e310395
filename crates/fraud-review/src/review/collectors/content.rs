//! Landing-page content analysis for item URLs.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::CollaboratorError;

/// Characters of lower-cased body scanned for keywords.
const BODY_WINDOW_CHARS: usize = 25_000;
const LOW_TEXT_CHARS: usize = 200;
const DYNAMIC_TEXT_CEILING: usize = 600;
const DYNAMIC_SCRIPT_TAGS: usize = 8;
const SAFE_PAGE_MIN_HITS: usize = 2;

const PARKED_KEYWORDS: [&str; 5] = [
    "domain for sale",
    "buy this domain",
    "this domain is parked",
    "sedo",
    "afternic",
];

const SAFE_PAGE_PATTERNS: [&str; 5] = [
    "b2b solutions",
    "enterprise innovation",
    "digital transformation",
    "stock photo",
    "our mission is to empower",
];

const SPA_MARKERS: [&str; 5] = [
    "id=\"root\"",
    "id=\"__next\"",
    "id=\"app\"",
    "ng-app",
    "data-reactroot",
];

/// Raw page as returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// Result of inspecting one item URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFinding {
    pub url: String,
    pub reachable: bool,
    pub final_url: Option<String>,
    pub title: String,
    pub parked: bool,
    pub safe_page_template: bool,
    pub bait_switch: bool,
    pub rate_limited: bool,
    pub dynamic_content_suspected: bool,
    pub low_text_content: bool,
    pub error: Option<String>,
}

impl SignalFinding {
    pub fn failed(url: &str, error: &CollaboratorError) -> Self {
        Self {
            url: url.to_string(),
            rate_limited: matches!(error, CollaboratorError::RateLimited),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// Data-quality caveats that make the finding unreliable, in display order.
    pub fn caveats(&self) -> Vec<&'static str> {
        let mut caveats = Vec::new();
        if self.error.is_some() {
            caveats.push("inspection error");
        }
        if self.rate_limited {
            caveats.push("rate limited");
        }
        if self.dynamic_content_suspected {
            caveats.push("dynamic content suspected");
        }
        if self.low_text_content {
            caveats.push("low extractable text");
        }
        caveats
    }

    pub fn is_uncertain(&self) -> bool {
        !self.caveats().is_empty()
    }
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static title pattern compiles")
    })
}

fn invisible_blocks() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>")
            .expect("static block pattern compiles")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("static tag pattern compiles"))
}

/// Host of a URL without scheme, port, credentials, or a leading `www.`.
pub fn host_of(url: &str) -> String {
    let without_scheme = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url,
    };
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default().to_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        return stripped.to_string();
    }
    host
}

pub fn extract_title(body: &str) -> String {
    title_pattern()
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|title| title.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
        .to_lowercase()
}

/// Visible text with scripts, styles, and markup stripped.
pub fn visible_text(body: &str) -> String {
    let without_blocks = invisible_blocks().replace_all(body, " ");
    let without_tags = tag_pattern().replace_all(&without_blocks, " ");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify a fetched page against parked, safe-page, and redirect heuristics.
pub fn analyze_page(url: &str, page: &FetchedPage) -> SignalFinding {
    let lowered = page.body.to_lowercase();
    let window: String = lowered.chars().take(BODY_WINDOW_CHARS).collect();
    let title = extract_title(&page.body);

    let parked = PARKED_KEYWORDS
        .iter()
        .any(|keyword| window.contains(keyword) || title.contains(keyword));
    let safe_page_hits = SAFE_PAGE_PATTERNS
        .iter()
        .filter(|pattern| window.contains(*pattern))
        .count();

    let start_host = host_of(url);
    let end_host = host_of(&page.final_url);
    let bait_switch = !end_host.is_empty() && start_host != end_host;

    let rate_limited = page.status == 429;
    let text_chars = visible_text(&page.body).chars().count();
    let script_tags = lowered.matches("<script").count();
    let spa_root = SPA_MARKERS.iter().any(|marker| lowered.contains(marker));
    let dynamic_content_suspected = !rate_limited
        && text_chars < DYNAMIC_TEXT_CEILING
        && (spa_root || script_tags >= DYNAMIC_SCRIPT_TAGS);
    let low_text_content = !rate_limited && text_chars < LOW_TEXT_CHARS;

    SignalFinding {
        url: url.to_string(),
        reachable: page.status < 500,
        final_url: Some(page.final_url.clone()),
        title,
        parked,
        safe_page_template: safe_page_hits >= SAFE_PAGE_MIN_HITS,
        bait_switch,
        rate_limited,
        dynamic_content_suspected,
        low_text_content,
        error: None,
    }
}
