//! Third-party fraud-intelligence toolkit, consumed through a narrow report contract.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::CollaboratorConfig;

use super::super::domain::{AccountSummary, IpObservation};
use super::{CheckOutcome, CheckRequest, CollaboratorError, ExternalCheck, HttpClient};

const CHECK_NAME: &str = "fraud_toolkit";

/// Payload sent to the toolkit's comprehensive check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitRequest {
    pub account_owner: String,
    pub cc_holder: String,
    pub company_name: String,
    pub email: String,
    pub urls: Vec<String>,
    pub ip_addresses: Vec<IpObservation>,
}

impl ToolkitRequest {
    pub fn from_account(account: &AccountSummary) -> Self {
        Self {
            account_owner: account.name.clone(),
            cc_holder: account.cc_owner.clone(),
            company_name: account.company_name.clone(),
            email: account.email.clone(),
            urls: account.item_urls.clone(),
            ip_addresses: account.ip_addresses.clone(),
        }
    }
}

/// Toolkit verdict. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitReport {
    pub overall_risk_score: f64,
    pub risk_level: String,
    pub red_flags: Vec<String>,
    pub green_flags: Vec<String>,
}

pub trait FraudIntelToolkit: Send + Sync {
    fn comprehensive_check(&self, request: &ToolkitRequest) -> Result<ToolkitReport, CollaboratorError>;
}

/// Toolkit reachable over HTTP at `FRAUD_TOOLKIT_URL`.
pub struct HttpToolkit {
    client: HttpClient,
    endpoint: String,
}

impl HttpToolkit {
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &CollaboratorConfig) -> Option<Self> {
        config
            .toolkit_url
            .as_ref()
            .map(|endpoint| Self::new(HttpClient::new(config.api_timeout), endpoint.clone()))
    }
}

impl FraudIntelToolkit for HttpToolkit {
    fn comprehensive_check(&self, request: &ToolkitRequest) -> Result<ToolkitReport, CollaboratorError> {
        let payload = serde_json::to_value(request)
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))?;
        let response = self.client.post_json(&self.endpoint, &payload, None)?;
        // Some deployments wrap the report as {"result": {...}}.
        let report = response.get("result").cloned().unwrap_or(response);
        serde_json::from_value(report).map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))
    }
}

/// Adapts any [`FraudIntelToolkit`] into an [`ExternalCheck`].
pub struct ToolkitCheck {
    toolkit: Option<Box<dyn FraudIntelToolkit>>,
}

impl ToolkitCheck {
    pub fn new(toolkit: Box<dyn FraudIntelToolkit>) -> Self {
        Self {
            toolkit: Some(toolkit),
        }
    }

    /// Check that reports "not configured" on every run.
    pub fn unavailable() -> Self {
        Self { toolkit: None }
    }

    pub fn from_config(config: &CollaboratorConfig) -> Self {
        match HttpToolkit::from_config(config) {
            Some(toolkit) => Self::new(Box::new(toolkit)),
            None => Self::unavailable(),
        }
    }
}

impl ExternalCheck for ToolkitCheck {
    fn name(&self) -> &'static str {
        CHECK_NAME
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let Some(toolkit) = &self.toolkit else {
            return CheckOutcome::not_configured(
                CHECK_NAME,
                "Fraud toolkit requested but unavailable (set FRAUD_TOOLKIT_URL).",
            );
        };

        match toolkit.comprehensive_check(&ToolkitRequest::from_account(request.account)) {
            Ok(report) => toolkit_outcome(&report),
            Err(error) => CheckOutcome::failed(CHECK_NAME, "Fraud toolkit check", &error),
        }
    }
}

/// Score a toolkit report: HIGH (or score ≥ 60) +30, MEDIUM (or ≥ 30) +15.
pub fn toolkit_outcome(report: &ToolkitReport) -> CheckOutcome {
    let level = report.risk_level.trim().to_uppercase();
    let score = report.overall_risk_score.max(0.0).trunc() as i64;
    let mut outcome = CheckOutcome::applied(CHECK_NAME).with_detail(json!(report));

    if level == "HIGH" || score >= 60 {
        outcome.risk_delta += 30;
        outcome.tags.push("AFOSINT_HIGH".to_string());
    } else if level == "MEDIUM" || score >= 30 {
        outcome.risk_delta += 15;
        outcome.tags.push("AFOSINT_MEDIUM".to_string());
    } else {
        outcome.tags.push("AFOSINT_LOW".to_string());
    }

    if !report.red_flags.is_empty() {
        let flags: Vec<&str> = report.red_flags.iter().take(3).map(String::as_str).collect();
        outcome.note(format!("Fraud toolkit red flags: {}.", flags.join(", ")));
    }
    if !report.green_flags.is_empty() {
        let flags: Vec<&str> = report.green_flags.iter().take(2).map(String::as_str).collect();
        outcome.note(format!("Fraud toolkit green flags: {}.", flags.join(", ")));
    }
    let shown_level = if level.is_empty() { "UNKNOWN" } else { level.as_str() };
    outcome.note(format!(
        "Fraud toolkit overall risk score={score}/100, level={shown_level}."
    ));
    outcome
}
