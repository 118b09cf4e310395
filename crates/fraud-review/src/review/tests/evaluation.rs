use serde_json::json;

use super::common::*;
use crate::policy::PolicyConfig;
use crate::review::collectors::{CheckOutcome, SignalFinding};
use crate::review::domain::{ConfidenceLevel, ReviewError, SignalGroup, Verdict};
use crate::review::evaluation::{confidence_level, confidence_score, ExternalSignals};
use crate::review::format_report;

#[test]
fn clean_manual_band_account_is_approved() {
    let result = engine()
        .decide(&clean_account(), &ExternalSignals::none())
        .expect("decision");

    assert_eq!(result.verdict, Verdict::Approve);
    assert_eq!(result.risk_score(), 0);
    assert_eq!(result.positive_signals(), 5);
    assert_eq!(result.uncertainty_signals(), 0);
    assert_eq!(result.confidence_score(), 85);
    assert_eq!(result.confidence_level(), ConfidenceLevel::High);
    assert!(!result.debug.auto_gate);
    assert_eq!(result.debug.clock_diff_minutes, Some(5));
    assert_eq!(result.debug.offset_diff_minutes, Some(0));
    assert_eq!(
        result.tags,
        vec!["APPROVE", "LOW_SIGNAL", "United States", "CLEAN_CONTENT"]
    );
    assert!(result
        .reasons()
        .iter()
        .any(|reason| reason == "URL content inspection was not performed."));
}

#[test]
fn ml_score_below_gate_approves_without_manual_checks() {
    let mut payload = clean_payload();
    payload["ml_score"] = json!(12);
    payload["address"] = json!("1603 Capitol Ave, Cheyenne, WY");
    payload["local_time"] = json!("not a timestamp");

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none())
        .expect("auto gate never parses timestamps");

    assert_eq!(result.verdict, Verdict::Approve);
    assert!(result.debug.auto_gate);
    assert_eq!(result.confidence_score(), 90);
    assert_eq!(result.confidence_level(), ConfidenceLevel::High);
    assert_eq!(result.tags, vec!["APPROVE", "ML_LOW_RISK", "AUTO"]);
    assert_eq!(result.debug.components.len(), 1);
    assert_eq!(result.debug.components[0].group, SignalGroup::AutoGate);
    assert!(result.decision_summary.final_reason.contains("Auto-approved"));
}

#[test]
fn ml_score_above_gate_rejects() {
    let mut payload = clean_payload();
    payload["ml_score"] = json!("91.5");

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none())
        .expect("decision");

    assert_eq!(result.verdict, Verdict::Reject);
    assert_eq!(result.tags, vec!["REJECT", "ML_HIGH_RISK", "AUTO"]);
    assert!(result.internal_note.contains("Auto-rejected by ML threshold policy (>85)"));
}

#[test]
fn gate_boundaries_fall_into_manual_band() {
    for score in [30.0, 85.0] {
        let mut payload = clean_payload();
        payload["ml_score"] = json!(score);
        let result = engine()
            .decide(&account_from(payload), &ExternalSignals::none())
            .expect("decision");
        assert!(!result.debug.auto_gate, "score {score} should be reviewed manually");
    }
}

#[test]
fn chaotic_timezone_with_shell_address_is_hard_rejected() {
    let mut payload = clean_payload();
    payload["address"] = json!("1603 Capitol Ave,  Cheyenne, WY");
    payload["local_time"] = json!("2025-03-01T10:00:00+05:45");
    payload["network_time"] = json!("2025-03-01T10:05:00+00:00");

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none())
        .expect("decision");

    // 35 chaotic + 20 shell stays below the reject threshold on its own.
    assert_eq!(result.risk_score(), 55);
    assert!(result.debug.hard_reject);
    assert_eq!(result.verdict, Verdict::Reject);
    assert!(result
        .decision_summary
        .final_reason
        .starts_with("Hard-reject override: chaotic timezone"));
    assert!(result.false_positive.starts_with("This is not a false positive"));
}

#[test]
fn shell_and_foreign_card_with_natural_delta_routes_to_vip() {
    let account = shell_account("2025-03-01T10:00:00-06:00", "2025-03-01T10:05:00-06:00");

    let result = engine()
        .decide(&account, &ExternalSignals::none())
        .expect("decision");

    assert!(!result.debug.hard_reject);
    assert_eq!(result.risk_score(), 35);
    assert_eq!(result.verdict, Verdict::RouteToVipSales);
    assert!(result.debug.components.iter().any(|component| {
        component.group == SignalGroup::IdentityPayment
            && component.risk == 35
            && component.note.contains("foreign card")
    }));
}

#[test]
fn wall_clock_gap_over_threshold_adds_risk() {
    let mut payload = clean_payload();
    payload["network_time"] = json!("2025-03-01T12:00:00-06:00");

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none())
        .expect("decision");

    assert_eq!(result.risk_score(), 30);
    assert_eq!(result.verdict, Verdict::RouteToVipSales);
    assert!(result
        .reasons()
        .iter()
        .any(|reason| reason.contains("differ by 120 minutes")));
}

#[test]
fn outsourced_agency_offset_earns_exemption() {
    let mut payload = clean_payload();
    payload["local_time"] = json!("2025-03-01T10:00:00-04:45");
    payload["network_time"] = json!("2025-03-01T10:10:00+05:30");

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none())
        .expect("decision");

    let clock: Vec<_> = result
        .debug
        .components
        .iter()
        .filter(|component| component.group == SignalGroup::Clock)
        .collect();
    assert_eq!(clock.len(), 1);
    assert_eq!(clock[0].positive, 2);
    assert!(clock[0].note.contains("outsourced agency"));
    assert_eq!(result.verdict, Verdict::Approve);
}

#[test]
fn burner_and_synthetic_email_domains_add_risk() {
    let mut burner = clean_payload();
    burner["email"] = json!("jane@protonmail.com");
    let burner = engine()
        .decide(&account_from(burner), &ExternalSignals::none())
        .expect("decision");
    assert_eq!(burner.risk_score(), 20);

    let mut synthetic = clean_payload();
    synthetic["email"] = json!("ops@xkcd8rtq.com");
    let synthetic = engine()
        .decide(&account_from(synthetic), &ExternalSignals::none())
        .expect("decision");
    assert!(synthetic
        .reasons()
        .iter()
        .any(|reason| reason == "Email domain looks synthetic/gibberish."));
}

#[test]
fn zero_history_is_forgiven_only_for_enterprise_domains() {
    let mut enterprise = clean_payload();
    enterprise["email_first_seen"] = json!("1970-01-01");
    let enterprise = engine()
        .decide(&account_from(enterprise), &ExternalSignals::none())
        .expect("decision");
    assert_eq!(enterprise.risk_score(), 0);
    assert!(enterprise
        .reasons()
        .iter()
        .any(|reason| reason.starts_with("Email API flag ignored")));

    let mut free = clean_payload();
    free["email"] = json!("jane.doe@gmail.com");
    free["email_invalid_flag"] = json!("yes");
    let free = engine()
        .decide(&account_from(free), &ExternalSignals::none())
        .expect("decision");
    assert_eq!(free.risk_score(), 20);
}

#[test]
fn unrelated_card_owner_adds_risk() {
    let mut payload = clean_payload();
    payload["cc_owner"] = json!("Robert Smith");

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none())
        .expect("decision");

    assert_eq!(result.risk_score(), 20);
    assert!(result.analysis.identity_payment.contains("Name/card relation=mismatch"));
}

#[test]
fn missing_urls_hold_for_verification() {
    let mut payload = clean_payload();
    payload["item_urls"] = json!([]);

    let result = engine()
        .decide(&account_from(payload), &ExternalSignals::none().with_findings(Vec::new()))
        .expect("decision");

    assert_eq!(result.verdict, Verdict::ConditionalHold);
    assert_eq!(result.confidence_score(), 75);
    assert!(result.tags.contains(&"URL_HOLD".to_string()));
    assert!(result.tags.contains(&"URL_MISSING".to_string()));
    assert!(result
        .decision_summary
        .final_reason
        .ends_with("held for URL verification."));
    assert!(result
        .reasons()
        .iter()
        .any(|reason| reason == "No item URLs supplied for content verification."));
}

#[test]
fn parked_page_with_redirect_is_hard_rejected() {
    let finding = SignalFinding {
        url: "https://acme-widgets.com/catalog".to_string(),
        reachable: true,
        final_url: Some("https://cheap-deals.example/".to_string()),
        parked: true,
        bait_switch: true,
        ..SignalFinding::default()
    };

    let result = engine()
        .decide(&clean_account(), &ExternalSignals::none().with_findings(vec![finding]))
        .expect("decision");

    assert_eq!(result.risk_score(), 50);
    assert!(result.debug.hard_reject);
    assert_eq!(result.verdict, Verdict::Reject);
    assert!(result.tags.contains(&"CLOAKING_RISK".to_string()));
    assert_eq!(result.debug.url_findings.len(), 1);
}

#[test]
fn uncertain_findings_demote_approval_to_vip() {
    let finding = SignalFinding {
        url: "https://acme-widgets.com/catalog".to_string(),
        rate_limited: true,
        ..SignalFinding::default()
    };

    let result = engine()
        .decide(&clean_account(), &ExternalSignals::none().with_findings(vec![finding]))
        .expect("decision");

    assert_eq!(result.uncertainty_signals(), 1);
    assert_eq!(result.verdict, Verdict::RouteToVipSales);
    assert!(result.tags.contains(&"CONTENT_UNCERTAIN".to_string()));
    assert!(result
        .decision_summary
        .final_reason
        .contains("routed the approval to human review"));
    assert!(result
        .reasons()
        .iter()
        .any(|reason| reason.contains("could not be fully verified: rate limited")));
}

#[test]
fn collaborator_outcomes_are_folded_into_the_score() {
    let mut flagged = CheckOutcome::applied("advanced_checks");
    flagged.add_risk(25, "SCAMADVISER_UNSAFE", "ScamAdviser API marked URL as unsafe.");
    let missing = CheckOutcome::not_configured("fraud_toolkit", "Fraud toolkit not configured.");

    let result = engine()
        .decide(
            &clean_account(),
            &ExternalSignals::none().with_outcomes(vec![flagged, missing]),
        )
        .expect("decision");

    assert_eq!(result.risk_score(), 25);
    assert_eq!(result.uncertainty_signals(), 1);
    assert_eq!(result.verdict, Verdict::RouteToVipSales);
    assert!(result.tags.contains(&"SCAMADVISER_UNSAFE".to_string()));
    assert!(result.debug.collaborators.contains_key("advanced_checks"));
    assert!(result.debug.collaborators.contains_key("fraud_toolkit"));
}

#[test]
fn stricter_policy_changes_the_verdict() {
    let policy = PolicyConfig {
        approve_positive_signals_threshold: 6,
        ..PolicyConfig::default()
    };

    let result = crate::review::decide(&clean_account(), &policy, &ExternalSignals::none())
        .expect("decision");

    assert_eq!(result.verdict, Verdict::RouteToVipSales);
}

#[test]
fn confidence_is_clamped_and_bucketed() {
    assert_eq!(confidence_score(20, 0, 0, true), 95);
    assert_eq!(confidence_score(0, 200, 3, false), 10);
    assert_eq!(confidence_score(4, 10, 0, true), 74);
    assert_eq!(confidence_level(75), ConfidenceLevel::High);
    assert_eq!(confidence_level(74), ConfidenceLevel::Medium);
    assert_eq!(confidence_level(49), ConfidenceLevel::Low);
}

#[test]
fn decision_context_mirrors_debug_totals() {
    let result = engine()
        .decide(&clean_account(), &ExternalSignals::none())
        .expect("decision");

    let context = result.context();
    assert_eq!(context.clock_diff_minutes, 5.0);
    assert_eq!(context.positive_signals, 5.0);
    assert_eq!(context.risk_score, 0.0);
}

#[test]
fn report_renders_every_section() {
    let result = engine()
        .decide(&clean_account(), &ExternalSignals::none())
        .expect("decision");

    let report = format_report(&result);

    assert!(report.starts_with("### Verdict: Approve"));
    for heading in [
        "### Deep Analysis:",
        "**Timezone & GEO Logic:**",
        "### Decision Summary:",
        "### False Positive Check:",
        "### Internal Note Summary:",
        "### Tags:",
    ] {
        assert!(report.contains(heading), "missing {heading}");
    }
    assert!(report.ends_with("`APPROVE` `LOW_SIGNAL` `United States` `CLEAN_CONTENT`"));
}

#[test]
fn hand_built_non_finite_score_never_reaches_the_manual_band() {
    let mut account = clean_account();
    account.ml_score = f64::NAN;

    match engine().decide(&account, &ExternalSignals::none()) {
        Err(ReviewError::InvalidAccount { detail }) => assert!(detail.contains("ml_score")),
        other => panic!("expected invalid account, got {other:?}"),
    }
}
