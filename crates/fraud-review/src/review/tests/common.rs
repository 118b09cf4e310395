use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::policy::PolicyConfig;
use crate::review::collectors::{
    CheckOutcome, CheckRequest, CollaboratorError, ExternalCheck, FetchedPage, PageFetcher,
};
use crate::review::domain::{AccountSummary, DecisionContext};
use crate::review::evaluation::DecisionEngine;

/// Manual-band account whose every rule lands on the approving side.
pub(super) fn clean_payload() -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@acme-widgets.com",
        "ml_score": 55,
        "company_name": "Acme Widgets LLC",
        "cc_owner": "John Doe",
        "cc_country": "United States",
        "address": "500 Main St, Austin, TX, USA",
        "local_time": "2025-03-01T10:00:00-06:00",
        "network_time": "2025-03-01T10:05:00-06:00",
        "item_urls": ["https://acme-widgets.com/catalog"],
        "ip_addresses": [{"ip": "203.0.113.7", "country": "United States"}],
        "email_first_seen": "2019-04-02",
        "email_invalid_flag": false,
        "network_country": "United States"
    })
}

pub(super) fn account_from(payload: Value) -> AccountSummary {
    AccountSummary::from_value(payload).expect("valid account payload")
}

pub(super) fn clean_account() -> AccountSummary {
    account_from(clean_payload())
}

/// Shell address paid for with a card from another country.
pub(super) fn shell_account(local_time: &str, network_time: &str) -> AccountSummary {
    let mut payload = clean_payload();
    payload["address"] = json!("1603 Capitol Ave, Cheyenne, WY 82001");
    payload["cc_country"] = json!("Nigeria");
    payload["local_time"] = json!(local_time);
    payload["network_time"] = json!(network_time);
    account_from(payload)
}

pub(super) fn engine() -> DecisionEngine {
    DecisionEngine::new(PolicyConfig::default())
}

pub(super) fn page(final_url: &str, status: u16, body: &str) -> FetchedPage {
    FetchedPage {
        final_url: final_url.to_string(),
        status,
        body: body.to_string(),
    }
}

pub(super) fn storefront_body() -> String {
    let filler = "Industrial fasteners and widgets shipped from Austin with same-day dispatch. ".repeat(6);
    format!("<html><head><title>Acme Widgets</title></head><body><main><p>{filler}</p></main></body></html>")
}

/// Serves canned pages and records every requested URL.
#[derive(Default)]
pub(super) struct StaticFetcher {
    pages: HashMap<String, Result<FetchedPage, CollaboratorError>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub(super) fn with_page(mut self, url: &str, page: FetchedPage) -> Self {
        self.pages.insert(url.to_string(), Ok(page));
        self
    }

    pub(super) fn with_error(mut self, url: &str, error: CollaboratorError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

impl PageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, CollaboratorError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(CollaboratorError::Network(format!("no route to {url}"))))
    }
}

/// Returns a fixed outcome and remembers the context it was shown.
pub(super) struct FixedCheck {
    name: &'static str,
    outcome: CheckOutcome,
    seen: Mutex<Vec<DecisionContext>>,
}

impl FixedCheck {
    pub(super) fn new(name: &'static str, outcome: CheckOutcome) -> Self {
        Self {
            name,
            outcome,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn risky(name: &'static str, points: i32, tag: &str) -> Self {
        let mut outcome = CheckOutcome::applied(name);
        outcome.add_risk(points, tag, format!("{name} flagged the account."));
        Self::new(name, outcome)
    }

    pub(super) fn seen(&self) -> Vec<DecisionContext> {
        self.seen.lock().expect("seen mutex poisoned").clone()
    }
}

impl ExternalCheck for FixedCheck {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        self.seen
            .lock()
            .expect("seen mutex poisoned")
            .push(request.context.clone());
        self.outcome.clone()
    }
}

impl ExternalCheck for std::sync::Arc<FixedCheck> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        self.as_ref().run(request)
    }
}
