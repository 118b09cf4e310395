use std::sync::Arc;

use serde_json::Value;

use super::collectors::{inspect_urls, CheckOutcome, CheckRequest, ExternalCheck, PageFetcher};
use super::domain::{AccountSummary, DecisionResult, ReviewError};
use super::evaluation::{DecisionEngine, ExternalSignals};
use super::signals::AccountSignals;

/// Composes URL inspection, optional external checks, and the decision engine.
pub struct ReviewService {
    engine: Arc<DecisionEngine>,
    fetcher: Option<Arc<dyn PageFetcher>>,
    checks: Vec<Box<dyn ExternalCheck>>,
}

impl ReviewService {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            fetcher: None,
            checks: Vec::new(),
        }
    }

    /// Enable URL content inspection through `fetcher`.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_check(mut self, check: Box<dyn ExternalCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    pub fn review_value(&self, payload: Value) -> Result<DecisionResult, ReviewError> {
        let account = AccountSummary::from_value(payload)?;
        self.review(&account)
    }

    pub fn review(&self, account: &AccountSummary) -> Result<DecisionResult, ReviewError> {
        if let Some(gate) = self.engine.auto_gate(account) {
            tracing::info!(?gate, ml_score = account.ml_score, "auto-gated review");
            return self.engine.decide(account, &ExternalSignals::none());
        }

        // Reject malformed timestamps before any network traffic.
        AccountSignals::derive(account)?;

        let findings = self
            .fetcher
            .as_deref()
            .map(|fetcher| inspect_urls(fetcher, &account.item_urls));

        let outcomes = if self.checks.is_empty() {
            Vec::new()
        } else {
            let context = self.engine.base_context(account, findings.clone())?;
            let request = CheckRequest {
                account,
                context: &context,
            };
            self.checks
                .iter()
                .map(|check| run_check(check.as_ref(), &request))
                .collect()
        };

        let external = ExternalSignals {
            url_findings: findings,
            outcomes,
        };
        let result = self.engine.decide(account, &external)?;
        tracing::info!(
            verdict = %result.verdict,
            risk = result.risk_score(),
            confidence = result.confidence_score(),
            "review completed"
        );
        Ok(result)
    }
}

fn run_check(check: &dyn ExternalCheck, request: &CheckRequest<'_>) -> CheckOutcome {
    let outcome = check.run(request);
    if outcome.uncertainty_delta > 0 {
        tracing::warn!(
            check = check.name(),
            uncertainty = outcome.uncertainty_delta,
            "external check degraded to uncertainty"
        );
    } else {
        tracing::debug!(check = check.name(), risk = outcome.risk_delta, "external check finished");
    }
    outcome
}
