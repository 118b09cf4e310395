mod confidence;
mod policy;
mod rationale;
mod rules;

pub use confidence::{confidence_level, confidence_score, AUTO_GATE_CONFIDENCE};
pub use policy::{auto_gate, Adjustment, AutoGate, VerdictBasis};
pub use rationale::format_report;

use std::collections::BTreeMap;

use serde_json::Value;

use super::collectors::{CheckOutcome, SignalFinding};
use super::domain::{
    checked_score, AccountSummary, DecisionContext, DecisionDebug, DecisionResult, ReviewError,
    ScoreComponent, SignalGroup,
};
use super::signals::AccountSignals;
use crate::policy::PolicyConfig;
use policy::{classify, Totals};
use rationale::ManualAssessment;
use rules::{Contribution, ContentFacts};

/// Everything collected outside the account record for one review.
///
/// `url_findings` is `None` when URL inspection did not run, which differs
/// from an inspection that ran over zero URLs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalSignals {
    pub url_findings: Option<Vec<SignalFinding>>,
    pub outcomes: Vec<CheckOutcome>,
}

impl ExternalSignals {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_findings(mut self, findings: Vec<SignalFinding>) -> Self {
        self.url_findings = Some(findings);
        self
    }

    pub fn with_outcomes(mut self, outcomes: Vec<CheckOutcome>) -> Self {
        self.outcomes = outcomes;
        self
    }
}

/// Pure decision function: same account, policy, and signals give the same result.
pub fn decide(
    account: &AccountSummary,
    policy: &PolicyConfig,
    external: &ExternalSignals,
) -> Result<DecisionResult, ReviewError> {
    checked_score(account.ml_score).map_err(|detail| ReviewError::InvalidAccount { detail })?;
    if let Some(gate) = auto_gate(account.ml_score, policy) {
        return Ok(auto_decision(gate, account, policy));
    }

    let signals = AccountSignals::derive(account)?;
    let findings = external.url_findings.as_deref();
    let facts = ContentFacts::from_findings(findings);

    let contributions: [Contribution; 5] = [
        rules::evaluate_clock(&signals, policy),
        rules::evaluate_email(&signals),
        rules::evaluate_identity(&signals),
        rules::evaluate_content(&facts, findings.unwrap_or_default(), account.has_urls()),
        rules::evaluate_external(&external.outcomes),
    ];

    let totals = Totals {
        risk: contributions.iter().map(Contribution::risk_total).sum(),
        positive: contributions.iter().map(Contribution::positive_total).sum(),
        uncertainty: contributions.iter().map(Contribution::uncertainty_total).sum(),
    };
    let collaborator_tags: Vec<String> = contributions
        .iter()
        .flat_map(|contribution| contribution.tags.iter().cloned())
        .collect();
    let components: Vec<ScoreComponent> = contributions
        .into_iter()
        .flat_map(|contribution| contribution.components)
        .collect();
    let reasons: Vec<String> = components.iter().map(|component| component.note.clone()).collect();

    let hard_reject = (signals.chaotic_timezone() && signals.shell_hit)
        || (facts.parked_hits > 0 && facts.bait_hits > 0);
    let classification = classify(policy, totals, hard_reject, account.has_urls());

    let score = confidence_score(
        totals.positive,
        totals.risk,
        totals.uncertainty,
        account.has_urls(),
    );
    let level = confidence_level(score);

    let assessment = ManualAssessment {
        account,
        signals: &signals,
        policy,
        facts,
        totals,
        classification,
        components: &components,
        reasons: &reasons,
    };

    let verdict = classification.verdict;
    tracing::debug!(
        verdict = %verdict,
        risk = totals.risk,
        positive = totals.positive,
        uncertainty = totals.uncertainty,
        hard_reject,
        "manual-band decision"
    );

    Ok(DecisionResult {
        verdict,
        analysis: rationale::manual_analysis(&assessment),
        false_positive: rationale::manual_false_positive(verdict),
        decision_summary: rationale::manual_summary(&assessment, score, level),
        internal_note: rationale::manual_internal_note(&assessment),
        tags: rationale::manual_tags(&assessment, &collaborator_tags),
        debug: DecisionDebug {
            auto_gate: false,
            hard_reject,
            risk_score: totals.risk,
            positive_signals: totals.positive,
            uncertainty_signals: totals.uncertainty,
            clock_diff_minutes: Some(signals.clock_diff_minutes),
            offset_diff_minutes: Some(signals.offset_diff_minutes),
            reasons,
            components,
            url_findings: external.url_findings.clone().unwrap_or_default(),
            collaborators: collaborator_details(&external.outcomes),
        },
    })
}

fn auto_decision(gate: AutoGate, account: &AccountSummary, policy: &PolicyConfig) -> DecisionResult {
    let score = AUTO_GATE_CONFIDENCE;
    let level = confidence_level(score);
    let summary = rationale::auto_summary(gate, account, policy, score, level);
    let reason = summary.final_reason.clone();

    DecisionResult {
        verdict: gate.verdict(),
        analysis: rationale::auto_analysis(gate, policy),
        false_positive: rationale::auto_false_positive(gate, policy),
        decision_summary: summary,
        internal_note: rationale::auto_internal_note(gate, policy),
        tags: rationale::auto_tags(gate),
        debug: DecisionDebug {
            auto_gate: true,
            hard_reject: false,
            risk_score: 0,
            positive_signals: 0,
            uncertainty_signals: 0,
            clock_diff_minutes: None,
            offset_diff_minutes: None,
            reasons: vec![reason.clone()],
            components: vec![ScoreComponent {
                group: SignalGroup::AutoGate,
                risk: 0,
                positive: 0,
                uncertainty: 0,
                note: reason,
            }],
            url_findings: Vec::new(),
            collaborators: BTreeMap::new(),
        },
    }
}

fn collaborator_details(outcomes: &[CheckOutcome]) -> BTreeMap<String, Value> {
    outcomes
        .iter()
        .map(|outcome| {
            let detail = serde_json::to_value(outcome).unwrap_or(Value::Null);
            (outcome.name.clone(), detail)
        })
        .collect()
}

/// Stateless engine bound to one policy.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    policy: PolicyConfig,
}

impl DecisionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn auto_gate(&self, account: &AccountSummary) -> Option<AutoGate> {
        auto_gate(account.ml_score, &self.policy)
    }

    pub fn decide(
        &self,
        account: &AccountSummary,
        external: &ExternalSignals,
    ) -> Result<DecisionResult, ReviewError> {
        decide(account, &self.policy, external)
    }

    /// Rule-based context before optional enrichment, handed to external checks.
    pub fn base_context(
        &self,
        account: &AccountSummary,
        findings: Option<Vec<SignalFinding>>,
    ) -> Result<DecisionContext, ReviewError> {
        let external = ExternalSignals {
            url_findings: findings,
            outcomes: Vec::new(),
        };
        Ok(self.decide(account, &external)?.context())
    }
}
