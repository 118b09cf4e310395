//! Human-readable justification, tags, and the markdown report.

use super::super::domain::{
    AccountSummary, ConfidenceLevel, DecisionAnalysis, DecisionResult, DecisionSummary,
    ScoreComponent, Verdict,
};
use super::super::signals::AccountSignals;
use super::policy::{Adjustment, AutoGate, Classification, Totals, VerdictBasis};
use super::rules::ContentFacts;
use crate::policy::PolicyConfig;

const MULTI_SIGNAL_RISK: i32 = 40;
const NOTE_REASONS: usize = 4;

/// Everything the rationale needs from a manual-band assessment.
pub(crate) struct ManualAssessment<'a> {
    pub account: &'a AccountSummary,
    pub signals: &'a AccountSignals,
    pub policy: &'a PolicyConfig,
    pub facts: ContentFacts,
    pub totals: Totals,
    pub classification: Classification,
    pub components: &'a [ScoreComponent],
    pub reasons: &'a [String],
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn confidence_label(score: u8, level: ConfidenceLevel) -> String {
    format!("{} ({score}/100)", level.label())
}

pub(crate) fn auto_analysis(gate: AutoGate, policy: &PolicyConfig) -> DecisionAnalysis {
    let timezone_geo = match gate {
        AutoGate::Approve => format!(
            "ML score below {} threshold: auto-approved by policy before manual queue.",
            policy.ml_auto_approve_threshold
        ),
        AutoGate::Reject => format!(
            "ML score above {} threshold: auto-rejected by policy before manual queue.",
            policy.ml_auto_reject_threshold
        ),
    };
    DecisionAnalysis {
        timezone_geo,
        identity_payment: "Manual identity checks are bypassed by threshold policy.".to_string(),
        domain_policy: "Manual content checks are bypassed by threshold policy.".to_string(),
    }
}

pub(crate) fn auto_false_positive(gate: AutoGate, policy: &PolicyConfig) -> String {
    match gate {
        AutoGate::Approve => format!(
            "This is not a false positive case because policy routes sub-{} scores directly to approval.",
            policy.ml_auto_approve_threshold
        ),
        AutoGate::Reject => format!(
            "This is not treated as a manual false-positive case because policy routes >{} scores directly to rejection.",
            policy.ml_auto_reject_threshold
        ),
    }
}

pub(crate) fn auto_internal_note(gate: AutoGate, policy: &PolicyConfig) -> String {
    match gate {
        AutoGate::Approve => format!(
            "Auto-approved by ML threshold policy (<{}). No manual review required unless a post-approval alert is triggered.",
            policy.ml_auto_approve_threshold
        ),
        AutoGate::Reject => format!(
            "Auto-rejected by ML threshold policy (>{}). Escalate only if commercial owner requests override.",
            policy.ml_auto_reject_threshold
        ),
    }
}

pub(crate) fn auto_summary(
    gate: AutoGate,
    account: &AccountSummary,
    policy: &PolicyConfig,
    score: u8,
    level: ConfidenceLevel,
) -> DecisionSummary {
    let (approve_case, reject_case, final_reason) = match gate {
        AutoGate::Approve => (
            format!("Upstream ML score {} is below the auto-approve threshold.", account.ml_score),
            "No manual-band evidence was collected.".to_string(),
            format!(
                "Auto-approved: ML score {} < {}.",
                account.ml_score, policy.ml_auto_approve_threshold
            ),
        ),
        AutoGate::Reject => (
            "No manual-band evidence was collected.".to_string(),
            format!("Upstream ML score {} is above the auto-reject threshold.", account.ml_score),
            format!(
                "Auto-rejected: ML score {} > {}.",
                account.ml_score, policy.ml_auto_reject_threshold
            ),
        ),
    };
    DecisionSummary {
        approve_case,
        reject_case,
        final_reason,
        confidence: confidence_label(score, level),
        confidence_score: score,
        confidence_level: level,
    }
}

pub(crate) fn manual_analysis(assessment: &ManualAssessment<'_>) -> DecisionAnalysis {
    let signals = assessment.signals;
    let facts = &assessment.facts;

    let timezone_geo = format!(
        "Local offset={} min, network offset={} min, delta={} min, wall-clock gap={} min. \
         Natural delta={}; outsourced exemption={}.",
        signals.local_offset_minutes,
        signals.network_offset_minutes,
        signals.offset_diff_minutes,
        signals.clock_diff_minutes,
        yes_no(signals.natural_offset),
        yes_no(signals.outsourced_exemption),
    );

    let identity_payment = format!(
        "Name/card relation={}; shell address={}; foreign card risk={}.",
        if signals.last_name_match || signals.card_company_match {
            "match"
        } else {
            "mismatch"
        },
        yes_no(signals.shell_hit),
        yes_no(signals.foreign_card),
    );

    let url_checks = if facts.inspected {
        format!(
            "URL checks: parked={}, safe-template={}, bait-switch={}, uncertain={}.",
            facts.parked_hits, facts.safe_page_hits, facts.bait_hits, facts.uncertain_findings
        )
    } else {
        "URL checks: not performed.".to_string()
    };
    let domain_policy = format!(
        "{url_checks} Total risk score={}, positive signals={}, uncertainty signals={}.",
        assessment.totals.risk, assessment.totals.positive, assessment.totals.uncertainty
    );

    DecisionAnalysis {
        timezone_geo,
        identity_payment,
        domain_policy,
    }
}

pub(crate) fn manual_false_positive(verdict: Verdict) -> String {
    if verdict == Verdict::Reject {
        "This is not a false positive because multiple independent fraud indicators align \
         (identity/geo/content), not a single noisy flag."
            .to_string()
    } else {
        "False-positive risk is controlled because enterprise/outsourcing and family/corporate \
         payment patterns are explicitly exempted before rejection. The account is only rejected \
         when multi-signal fraud evidence is present."
            .to_string()
    }
}

fn case_for(components: &[ScoreComponent], pick: impl Fn(&ScoreComponent) -> bool, empty: &str) -> String {
    let notes: Vec<&str> = components
        .iter()
        .filter(|component| pick(component))
        .map(|component| component.note.as_str())
        .collect();
    if notes.is_empty() {
        empty.to_string()
    } else {
        notes.join(" ")
    }
}

fn final_reason(assessment: &ManualAssessment<'_>) -> String {
    let policy = assessment.policy;
    let totals = assessment.totals;
    let classification = assessment.classification;

    let base = match classification.basis {
        VerdictBasis::HardReject => {
            if assessment.signals.chaotic_timezone() && assessment.signals.shell_hit {
                "Hard-reject override: chaotic timezone delta combined with a known shell address."
                    .to_string()
            } else {
                "Hard-reject override: parked URL combined with a bait-and-switch redirect."
                    .to_string()
            }
        }
        VerdictBasis::RiskThreshold => format!(
            "Risk score {} meets the reject threshold {}.",
            totals.risk, policy.reject_risk_threshold
        ),
        VerdictBasis::ApproveThreshold => format!(
            "Risk score {} is within the approve ceiling {} with {} positive signals.",
            totals.risk, policy.approve_risk_threshold, totals.positive
        ),
        VerdictBasis::MixedEvidence => format!(
            "Mixed evidence (risk {}, positive signals {}) requires human review.",
            totals.risk, totals.positive
        ),
    };

    match classification.adjustment {
        Some(Adjustment::MissingUrls) => {
            format!("{base} No item URL supplied, so the account is held for URL verification.")
        }
        Some(Adjustment::Uncertainty) => format!(
            "{base} {} uncertainty signal(s) routed the approval to human review.",
            totals.uncertainty
        ),
        None => base,
    }
}

pub(crate) fn manual_summary(
    assessment: &ManualAssessment<'_>,
    score: u8,
    level: ConfidenceLevel,
) -> DecisionSummary {
    DecisionSummary {
        approve_case: case_for(
            assessment.components,
            |component| component.positive > 0,
            "No approval evidence recorded.",
        ),
        reject_case: case_for(
            assessment.components,
            |component| component.risk > 0,
            "No risk indicators recorded.",
        ),
        final_reason: final_reason(assessment),
        confidence: confidence_label(score, level),
        confidence_score: score,
        confidence_level: level,
    }
}

pub(crate) fn manual_internal_note(assessment: &ManualAssessment<'_>) -> String {
    let key_factors: Vec<&str> = assessment
        .reasons
        .iter()
        .take(NOTE_REASONS)
        .map(String::as_str)
        .collect();
    format!(
        "Manual-band review completed for ML score {}. Decision={}; key factors: {}. \
         Decision is evidence-based with false-positive exemptions evaluated first.",
        assessment.account.ml_score,
        assessment.classification.verdict,
        key_factors.join("; "),
    )
}

/// Verdict, risk class, location, content state, then collaborator tags.
pub(crate) fn manual_tags(assessment: &ManualAssessment<'_>, collaborator_tags: &[String]) -> Vec<String> {
    let risk_class = if assessment.totals.risk >= MULTI_SIGNAL_RISK {
        "MULTI_SIGNAL"
    } else {
        "LOW_SIGNAL"
    };
    let location = assessment
        .account
        .network_country
        .clone()
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let content = if !assessment.account.has_urls() {
        "URL_MISSING"
    } else if assessment.totals.uncertainty > 0 {
        "CONTENT_UNCERTAIN"
    } else if assessment.facts.cloaking() {
        "CLOAKING_RISK"
    } else {
        "CLEAN_CONTENT"
    };

    let mut extra: Vec<String> = collaborator_tags.to_vec();
    extra.sort();

    let mut tags = vec![
        assessment.classification.verdict.tag().to_string(),
        risk_class.to_string(),
        location,
        content.to_string(),
    ];
    tags.extend(extra);
    dedup_in_order(tags)
}

pub(crate) fn auto_tags(gate: AutoGate) -> Vec<String> {
    let tags: [&str; 3] = match gate {
        AutoGate::Approve => ["APPROVE", "ML_LOW_RISK", "AUTO"],
        AutoGate::Reject => ["REJECT", "ML_HIGH_RISK", "AUTO"],
    };
    tags.iter().map(|tag| tag.to_string()).collect()
}

fn dedup_in_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Render a decision as the markdown report reviewers paste into tickets.
pub fn format_report(result: &DecisionResult) -> String {
    let tags: Vec<String> = result.tags.iter().map(|tag| format!("`{tag}`")).collect();
    let summary = &result.decision_summary;
    [
        format!("### Verdict: {}", result.verdict),
        String::new(),
        "### Deep Analysis:".to_string(),
        String::new(),
        "**Timezone & GEO Logic:**".to_string(),
        result.analysis.timezone_geo.clone(),
        String::new(),
        "**Identity & Payment Logic:**".to_string(),
        result.analysis.identity_payment.clone(),
        String::new(),
        "**Domain & Policy Risk:**".to_string(),
        result.analysis.domain_policy.clone(),
        String::new(),
        "### Decision Summary:".to_string(),
        format!("- Approve case: {}", summary.approve_case),
        format!("- Reject case: {}", summary.reject_case),
        format!("- Final reason: {}", summary.final_reason),
        format!("- Confidence: {}", summary.confidence),
        String::new(),
        "### False Positive Check:".to_string(),
        result.false_positive.clone(),
        String::new(),
        "### Internal Note Summary:".to_string(),
        result.internal_note.clone(),
        String::new(),
        "### Tags:".to_string(),
        tags.join(" "),
    ]
    .join("\n")
}
