use serde::{Deserialize, Serialize};

use super::super::domain::Verdict;
use crate::policy::PolicyConfig;

/// Short-circuit decision taken from the upstream ML score alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoGate {
    Approve,
    Reject,
}

impl AutoGate {
    pub fn verdict(self) -> Verdict {
        match self {
            AutoGate::Approve => Verdict::Approve,
            AutoGate::Reject => Verdict::Reject,
        }
    }
}

pub fn auto_gate(ml_score: f64, policy: &PolicyConfig) -> Option<AutoGate> {
    if ml_score < policy.ml_auto_approve_threshold {
        Some(AutoGate::Approve)
    } else if ml_score > policy.ml_auto_reject_threshold {
        Some(AutoGate::Reject)
    } else {
        None
    }
}

/// Which rule produced the pre-adjustment verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictBasis {
    HardReject,
    RiskThreshold,
    ApproveThreshold,
    MixedEvidence,
}

/// Downgrade applied after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    MissingUrls,
    Uncertainty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Totals {
    pub risk: i32,
    pub positive: i32,
    pub uncertainty: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Classification {
    pub verdict: Verdict,
    pub basis: VerdictBasis,
    pub adjustment: Option<Adjustment>,
}

/// Classify the manual band. Adjustments only move toward manual review.
pub(crate) fn classify(
    policy: &PolicyConfig,
    totals: Totals,
    hard_reject: bool,
    has_urls: bool,
) -> Classification {
    let (verdict, basis) = if hard_reject {
        (Verdict::Reject, VerdictBasis::HardReject)
    } else if totals.risk >= policy.reject_risk_threshold {
        (Verdict::Reject, VerdictBasis::RiskThreshold)
    } else if totals.risk <= policy.approve_risk_threshold
        && totals.positive >= policy.approve_positive_signals_threshold
    {
        (Verdict::Approve, VerdictBasis::ApproveThreshold)
    } else {
        (Verdict::RouteToVipSales, VerdictBasis::MixedEvidence)
    };

    let mut classification = Classification {
        verdict,
        basis,
        adjustment: None,
    };

    if !has_urls && verdict != Verdict::Reject {
        classification.verdict = Verdict::ConditionalHold;
        classification.adjustment = Some(Adjustment::MissingUrls);
    } else if totals.uncertainty > 0 && verdict == Verdict::Approve {
        classification.verdict = Verdict::RouteToVipSales;
        classification.adjustment = Some(Adjustment::Uncertainty);
    }

    classification
}
