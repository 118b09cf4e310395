//! Contracts for everything the engine learns from outside the account record.
//!
//! Collectors never raise into the engine. Page inspection always yields a
//! [`SignalFinding`] (with `error` set on failure) and every optional check
//! yields a [`CheckOutcome`], so a failing collaborator degrades into
//! uncertainty instead of aborting the review.

pub mod advanced;
pub mod content;
pub mod http;
pub mod tls;
pub mod toolkit;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{AccountSummary, DecisionContext};

pub use content::{analyze_page, FetchedPage, SignalFinding};
pub use http::HttpClient;

/// At most this many item URLs are inspected per account.
pub const MAX_SAMPLED_URLS: usize = 5;

/// Retrieves a page for content inspection.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedPage, CollaboratorError>;
}

/// Inspect the first [`MAX_SAMPLED_URLS`] item URLs, in input order.
pub fn inspect_urls(fetcher: &dyn PageFetcher, urls: &[String]) -> Vec<SignalFinding> {
    urls.iter()
        .take(MAX_SAMPLED_URLS)
        .map(|url| match fetcher.fetch(url) {
            Ok(page) => analyze_page(url, &page),
            Err(error) => {
                tracing::debug!(%url, %error, "url inspection failed");
                SignalFinding::failed(url, &error)
            }
        })
        .collect()
}

/// Inputs handed to every optional check: the account plus the numeric
/// context of the rule-based assessment computed before enrichment.
#[derive(Debug, Clone, Copy)]
pub struct CheckRequest<'a> {
    pub account: &'a AccountSummary,
    pub context: &'a DecisionContext,
}

impl CheckRequest<'_> {
    pub fn primary_url(&self) -> Option<&str> {
        self.account.item_urls.first().map(String::as_str)
    }
}

/// Capability interface for optional enrichment. The engine folds over the
/// enabled outcomes without knowing which check produced them.
pub trait ExternalCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome;
}

/// Uniform result of one optional check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub applied: bool,
    pub risk_delta: i32,
    pub uncertainty_delta: i32,
    pub notes: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub detail: Value,
}

impl CheckOutcome {
    pub fn applied(name: &str) -> Self {
        Self {
            name: name.to_string(),
            applied: true,
            ..Self::default()
        }
    }

    /// The check did not run (for example no URL to probe); contributes nothing.
    pub fn skipped(name: &str, note: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            applied: false,
            notes: vec![note.into()],
            ..Self::default()
        }
    }

    /// Missing endpoint or credentials: typed as uncertainty, never a silent skip.
    pub fn not_configured(name: &str, note: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            applied: false,
            uncertainty_delta: 1,
            notes: vec![note.into()],
            ..Self::default()
        }
    }

    /// A collaborator failure becomes one uncertainty unit plus a note.
    pub fn failed(name: &str, label: &str, error: &CollaboratorError) -> Self {
        Self {
            name: name.to_string(),
            applied: true,
            uncertainty_delta: 1,
            notes: vec![format!("{label} could not complete: {error}.")],
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn add_risk(&mut self, points: i32, tag: &str, note: impl Into<String>) {
        self.risk_delta += points;
        self.tags.push(tag.to_string());
        self.notes.push(note.into());
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Sort and deduplicate tags so outcomes compare deterministically.
    pub fn normalize_tags(&mut self) {
        self.tags.sort();
        self.tags.dedup();
    }
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{0} not configured")]
    NotConfigured(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Unavailable(String),
}
