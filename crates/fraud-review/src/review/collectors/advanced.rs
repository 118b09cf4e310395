//! Optional reputation, registry, certificate, social, and ML-risk checks.
//!
//! Each check is an [`ExternalCheck`]; [`AdvancedCheckSuite`] folds the
//! enabled ones into a single outcome. Scoring lives in the `score_*`
//! functions so provider payloads can be evaluated without network access.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::CollaboratorConfig;

use super::tls::{self, HandshakeError};
use super::{CheckOutcome, CheckRequest, CollaboratorError, ExternalCheck, HttpClient, PageFetcher};

const OPENCORPORATES_SEARCH_URL: &str = "https://api.opencorporates.com/v0.4/companies/search";

const SOCIAL_DOMAINS: [&str; 7] = [
    "linkedin.com",
    "facebook.com",
    "x.com",
    "twitter.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
];

/// Which advanced checks to run for a review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedCheckOptions {
    pub scamadviser: bool,
    pub linkedin: bool,
    pub ssl: bool,
    pub social: bool,
    pub registry: bool,
    pub ml: bool,
}

impl AdvancedCheckOptions {
    pub fn any(&self) -> bool {
        self.scamadviser || self.linkedin || self.ssl || self.social || self.registry || self.ml
    }
}

/// First numeric value found under any of `keys`.
pub fn score_from_payload(payload: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_f64))
}

fn truthy(payload: &Value, key: &str) -> bool {
    match payload.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0) != 0.0,
        Some(Value::String(text)) => !text.is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// ScamAdviser

pub struct ScamAdviserCheck {
    client: HttpClient,
    endpoint: Option<String>,
    api_key: Option<String>,
    url_param: String,
}

impl ScamAdviserCheck {
    pub fn new(client: HttpClient, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            endpoint: config.scamadviser_url.clone(),
            api_key: config.scamadviser_key.clone(),
            url_param: config.scamadviser_url_param.clone(),
        }
    }
}

impl ExternalCheck for ScamAdviserCheck {
    fn name(&self) -> &'static str {
        "scamadviser"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let Some(primary_url) = request.primary_url() else {
            return CheckOutcome::skipped(self.name(), "ScamAdviser skipped: no item URL supplied.");
        };
        let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) else {
            return CheckOutcome::not_configured(
                self.name(),
                "ScamAdviser API not configured (set SCAMADVISER_API_URL and SCAMADVISER_API_KEY).",
            );
        };

        match self.client.get_json(
            endpoint,
            &[(self.url_param.as_str(), primary_url)],
            Some(api_key),
        ) {
            Ok(payload) => score_scamadviser(&payload),
            Err(error) => CheckOutcome::failed(self.name(), "ScamAdviser API check", &error),
        }
    }
}

pub fn score_scamadviser(payload: &Value) -> CheckOutcome {
    let mut outcome = CheckOutcome::applied("scamadviser").with_detail(payload.clone());
    let trust_score = score_from_payload(payload, &["trust_score", "score", "trustScore"]);
    let risk_score = score_from_payload(payload, &["risk_score", "riskScore"]);

    if truthy(payload, "unsafe") || truthy(payload, "is_unsafe") {
        outcome.add_risk(25, "SCAMADVISER_UNSAFE", "ScamAdviser API marked URL as unsafe.");
    } else if let Some(trust) = trust_score.filter(|trust| *trust < 40.0) {
        outcome.add_risk(
            20,
            "SCAMADVISER_LOW_TRUST",
            format!("ScamAdviser trust score is low ({trust:.0}/100)."),
        );
    } else if let Some(risk) = risk_score.filter(|risk| *risk >= 60.0) {
        outcome.add_risk(
            20,
            "SCAMADVISER_HIGH_RISK",
            format!("ScamAdviser risk score is high ({risk:.0}/100)."),
        );
    } else {
        outcome.note("ScamAdviser check returned no high-risk signal.");
    }
    outcome
}

// ---------------------------------------------------------------------------
// LinkedIn professional verification

pub struct LinkedInCheck {
    client: HttpClient,
    endpoint: Option<String>,
    token: Option<String>,
}

impl LinkedInCheck {
    pub fn new(client: HttpClient, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            endpoint: config.linkedin_url.clone(),
            token: config.linkedin_token.clone(),
        }
    }
}

impl ExternalCheck for LinkedInCheck {
    fn name(&self) -> &'static str {
        "linkedin"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let (Some(endpoint), Some(token)) = (&self.endpoint, &self.token) else {
            return CheckOutcome::not_configured(
                self.name(),
                "LinkedIn API not configured (set LINKEDIN_API_URL and LINKEDIN_ACCESS_TOKEN).",
            );
        };

        let payload = json!({
            "person_name": request.account.name,
            "company_name": request.account.company_name,
            "email": request.account.email,
        });
        match self.client.post_json(endpoint, &payload, Some(token)) {
            Ok(data) => score_linkedin(&data),
            Err(error) => CheckOutcome::failed(self.name(), "LinkedIn API verification", &error),
        }
    }
}

pub fn score_linkedin(data: &Value) -> CheckOutcome {
    let mut outcome = CheckOutcome::applied("linkedin").with_detail(data.clone());
    let verified = truthy(data, "verified") || truthy(data, "professional_match");
    let confidence = score_from_payload(data, &["confidence", "confidence_score", "score"]);

    if verified || confidence.is_some_and(|value| value >= 70.0) {
        outcome.note("LinkedIn professional verification indicates likely real professional identity.");
    } else {
        outcome.add_risk(
            12,
            "LINKEDIN_UNVERIFIED",
            "LinkedIn professional verification did not confirm person/business linkage.",
        );
    }
    outcome
}

// ---------------------------------------------------------------------------
// TLS certificate

/// Result of probing the primary URL's certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateReport {
    pub url: String,
    pub host: String,
    pub checked: bool,
    pub valid: Option<bool>,
    pub expires_in_days: Option<i64>,
    pub issuer: Option<String>,
    pub error: Option<String>,
}

/// Anything able to validate a site's certificate chain.
pub trait CertificateProber: Send + Sync {
    fn probe(&self, url: &str) -> CertificateReport;
}

/// Probe by a verified TLS handshake with the URL's own host (no redirects),
/// reading expiry and issuer from the leaf certificate.
pub struct HttpsCertificateProbe {
    timeout: Duration,
}

impl HttpsCertificateProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CertificateProber for HttpsCertificateProbe {
    fn probe(&self, url: &str) -> CertificateReport {
        let mut report = CertificateReport {
            url: url.to_string(),
            ..CertificateReport::default()
        };
        let Some((host, port)) = tls::https_endpoint(url) else {
            report.host = super::content::host_of(url);
            report.error = Some("SSL check requires HTTPS URL".to_string());
            return report;
        };
        report.host = host.clone();

        match tls::peer_certificate(&host, port, self.timeout) {
            Ok(leaf) => match tls::certificate_facts(leaf.as_ref(), Utc::now()) {
                Ok(facts) => {
                    report.checked = true;
                    report.valid = Some(facts.expires_in_days >= 0);
                    report.expires_in_days = Some(facts.expires_in_days);
                    report.issuer = facts.issuer;
                }
                Err(error) => report.error = Some(error),
            },
            Err(HandshakeError::Rejected(reason)) => {
                tracing::debug!(%url, %reason, "certificate rejected");
                report.checked = true;
                report.valid = Some(false);
            }
            Err(error) => report.error = Some(error.to_string()),
        }
        report
    }
}

pub struct CertificateCheck {
    prober: Arc<dyn CertificateProber>,
}

impl CertificateCheck {
    pub fn new(prober: Arc<dyn CertificateProber>) -> Self {
        Self { prober }
    }
}

impl ExternalCheck for CertificateCheck {
    fn name(&self) -> &'static str {
        "ssl"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        match request.primary_url() {
            Some(url) => score_certificate(&self.prober.probe(url)),
            None => CheckOutcome::skipped(self.name(), "SSL validation skipped: no item URL supplied."),
        }
    }
}

pub fn score_certificate(report: &CertificateReport) -> CheckOutcome {
    let detail = serde_json::to_value(report).unwrap_or(Value::Null);
    let mut outcome = CheckOutcome::applied("ssl").with_detail(detail);

    if let Some(error) = &report.error {
        outcome.uncertainty_delta += 1;
        outcome.note(format!("SSL validation could not complete: {error}."));
    } else if report.valid == Some(false) {
        outcome.add_risk(20, "SSL_INVALID", "SSL certificate is expired/invalid.");
    } else if let Some(days) = report.expires_in_days.filter(|days| *days < 15) {
        outcome.add_risk(
            8,
            "SSL_EXPIRING",
            format!("SSL certificate expires soon ({days} days)."),
        );
    }
    outcome
}

// ---------------------------------------------------------------------------
// Social presence

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<a\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#)
            .expect("static href pattern compiles")
    })
}

/// Sorted, deduplicated anchor targets that point at a social network.
pub fn social_links(body: &str) -> Vec<String> {
    let mut links: Vec<String> = href_pattern()
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .map(|href| href.as_str().to_lowercase())
        .filter(|href| SOCIAL_DOMAINS.iter().any(|domain| href.contains(domain)))
        .collect();
    links.sort();
    links.dedup();
    links
}

pub struct SocialPresenceCheck {
    fetcher: Arc<dyn PageFetcher>,
}

impl SocialPresenceCheck {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

impl ExternalCheck for SocialPresenceCheck {
    fn name(&self) -> &'static str {
        "social"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let Some(url) = request.primary_url() else {
            return CheckOutcome::skipped(self.name(), "Social presence skipped: no item URL supplied.");
        };
        match self.fetcher.fetch(url) {
            Ok(page) => score_social(url, &social_links(&page.body)),
            Err(error) => CheckOutcome::failed(self.name(), "Social media presence check", &error),
        }
    }
}

pub fn score_social(url: &str, links: &[String]) -> CheckOutcome {
    let mut outcome = CheckOutcome::applied("social").with_detail(json!({
        "url": url,
        "social_links_found": links,
        "count": links.len(),
    }));
    if links.is_empty() {
        outcome.add_risk(6, "NO_SOCIAL_PRESENCE", "No social media links found on primary website.");
    } else {
        outcome.note(format!("Social presence found ({} linked profile(s)).", links.len()));
    }
    outcome
}

// ---------------------------------------------------------------------------
// Business registry

pub struct RegistryCheck {
    client: HttpClient,
    token: Option<String>,
}

impl RegistryCheck {
    pub fn new(client: HttpClient, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            token: config.opencorporates_token.clone(),
        }
    }
}

impl ExternalCheck for RegistryCheck {
    fn name(&self) -> &'static str {
        "business_registry"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let company = request.account.company_name.as_str();
        if company.is_empty() {
            return CheckOutcome::skipped(self.name(), "Business registry skipped: no company name.");
        }

        let mut query = vec![("q", company)];
        if let Some(token) = self.token.as_deref() {
            query.push(("api_token", token));
        }
        match self.client.get_json(OPENCORPORATES_SEARCH_URL, &query, None) {
            Ok(payload) => score_registry(&payload),
            Err(error) => CheckOutcome::failed(self.name(), "Business registry lookup", &error),
        }
    }
}

pub fn score_registry(payload: &Value) -> CheckOutcome {
    let mut outcome = CheckOutcome::applied("business_registry").with_detail(payload.clone());

    if payload.get("error").is_some_and(|error| !error.is_null()) {
        outcome.uncertainty_delta += 1;
        outcome.note("Business registry lookup returned provider error; treated as uncertainty.");
        return outcome;
    }

    let companies = payload
        .get("results")
        .and_then(|results| results.get("companies"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);

    if companies > 0 {
        outcome.note("Business registry lookup found matching company records.");
    } else if payload.as_object().is_some_and(|object| !object.is_empty()) {
        outcome.add_risk(
            15,
            "REGISTRY_NOT_FOUND",
            "Business registry lookup found no matching entity (OpenCorporates).",
        );
    }
    outcome
}

// ---------------------------------------------------------------------------
// External ML risk API

pub struct MlRiskCheck {
    client: HttpClient,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl MlRiskCheck {
    pub fn new(client: HttpClient, config: &CollaboratorConfig) -> Self {
        Self {
            client,
            endpoint: config.ml_risk_url.clone(),
            api_key: config.ml_risk_key.clone(),
        }
    }
}

impl ExternalCheck for MlRiskCheck {
    fn name(&self) -> &'static str {
        "ml_api"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let Some(endpoint) = &self.endpoint else {
            return CheckOutcome::not_configured(
                self.name(),
                "ML scoring not configured (set ML_RISK_API_URL).",
            );
        };

        let account = request.account;
        let context = request.context;
        let payload = json!({
            "features": {
                "owner_name": account.name,
                "company_name": account.company_name,
                "email": account.email,
                "url_count": account.item_urls.len(),
                "clock_diff_minutes": context.clock_diff_minutes,
                "offset_diff_minutes": context.offset_diff_minutes,
                "base_risk_score": context.risk_score,
                "positive_signals": context.positive_signals,
            }
        });

        match self.client.post_json(endpoint, &payload, self.api_key.as_deref()) {
            Ok(data) => match score_from_payload(&data, &["risk_score", "score", "ml_risk_score"]) {
                Some(score) => score_ml_risk(score).with_detail(data),
                None => CheckOutcome::failed(
                    self.name(),
                    "ML risk API call",
                    &CollaboratorError::InvalidResponse("no risk score in payload".to_string()),
                )
                .with_detail(data),
            },
            Err(error) => CheckOutcome::failed(self.name(), "ML risk API call", &error),
        }
    }
}

pub fn score_ml_risk(score: f64) -> CheckOutcome {
    let mut outcome = CheckOutcome::applied("ml_api");
    if score >= 85.0 {
        outcome.add_risk(
            25,
            "ML_EXTREME_RISK",
            format!("External ML risk scoring is very high ({score:.1}/100)."),
        );
    } else if score >= 60.0 {
        outcome.add_risk(
            12,
            "ML_HIGH_RISK",
            format!("External ML risk scoring is elevated ({score:.1}/100)."),
        );
    } else if score <= 25.0 {
        outcome.note(format!("External ML risk scoring is low ({score:.1}/100)."));
    } else {
        outcome.note(format!("External ML risk scoring is moderate ({score:.1}/100)."));
    }
    outcome
}

// ---------------------------------------------------------------------------
// Suite

/// Folds every enabled advanced check into one `advanced_checks` outcome.
pub struct AdvancedCheckSuite {
    checks: Vec<Box<dyn ExternalCheck>>,
}

impl AdvancedCheckSuite {
    pub fn new(checks: Vec<Box<dyn ExternalCheck>>) -> Self {
        Self { checks }
    }

    /// Wire the network-backed checks selected by `options`.
    pub fn from_config(config: &CollaboratorConfig, options: AdvancedCheckOptions) -> Self {
        let api = HttpClient::new(config.api_timeout);
        let pages = HttpClient::new(config.page_timeout);
        let mut checks: Vec<Box<dyn ExternalCheck>> = Vec::new();

        if options.scamadviser {
            checks.push(Box::new(ScamAdviserCheck::new(api.clone(), config)));
        }
        if options.linkedin {
            checks.push(Box::new(LinkedInCheck::new(api.clone(), config)));
        }
        if options.ssl {
            checks.push(Box::new(CertificateCheck::new(Arc::new(
                HttpsCertificateProbe::new(config.page_timeout),
            ))));
        }
        if options.social {
            checks.push(Box::new(SocialPresenceCheck::new(Arc::new(pages))));
        }
        if options.registry {
            checks.push(Box::new(RegistryCheck::new(api.clone(), config)));
        }
        if options.ml {
            checks.push(Box::new(MlRiskCheck::new(api, config)));
        }

        Self::new(checks)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl ExternalCheck for AdvancedCheckSuite {
    fn name(&self) -> &'static str {
        "advanced_checks"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let mut merged = CheckOutcome {
            name: self.name().to_string(),
            ..CheckOutcome::default()
        };
        let mut detail = Map::new();

        for check in &self.checks {
            let outcome = check.run(request);
            merged.applied |= outcome.applied;
            merged.risk_delta += outcome.risk_delta;
            merged.uncertainty_delta += outcome.uncertainty_delta;
            merged.notes.extend(outcome.notes);
            merged.tags.extend(outcome.tags);
            if !outcome.detail.is_null() {
                detail.insert(outcome.name, outcome.detail);
            }
        }

        if merged.uncertainty_delta > 0 {
            merged.tags.push("EXTERNAL_INTEL_PARTIAL".to_string());
        }
        merged.normalize_tags();
        merged.detail = Value::Object(detail);
        merged
    }
}
