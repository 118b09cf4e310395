use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::review::collectors::CollaboratorError;
use crate::review::domain::{ReviewError, Verdict};
use crate::review::ReviewService;

const CATALOG: &str = "https://acme-widgets.com/catalog";

fn storefront_fetcher() -> Arc<StaticFetcher> {
    Arc::new(StaticFetcher::default().with_page(
        CATALOG,
        page("https://www.acme-widgets.com/catalog", 200, &storefront_body()),
    ))
}

#[test]
fn clean_storefront_is_approved_with_high_confidence() {
    let fetcher = storefront_fetcher();
    let service = ReviewService::new(engine()).with_fetcher(fetcher.clone());

    let result = service.review(&clean_account()).expect("review");

    assert_eq!(result.verdict, Verdict::Approve);
    assert_eq!(result.positive_signals(), 6);
    assert_eq!(result.confidence_score(), 91);
    assert_eq!(fetcher.calls(), vec![CATALOG.to_string()]);
    assert_eq!(result.debug.url_findings.len(), 1);
    assert!(result
        .reasons()
        .iter()
        .any(|reason| reason.starts_with("No cloaking or parked-domain indicators")));
}

#[test]
fn bad_timestamp_fails_before_any_collaborator_runs() {
    let fetcher = storefront_fetcher();
    let check = Arc::new(FixedCheck::risky("scamadviser", 25, "SCAMADVISER_UNSAFE"));
    let service = ReviewService::new(engine())
        .with_fetcher(fetcher.clone())
        .with_check(Box::new(check.clone()));
    let mut payload = clean_payload();
    payload["network_time"] = json!("03/01/2025 10:05");

    match service.review_value(payload) {
        Err(ReviewError::InvalidTimestamp { field, .. }) => assert_eq!(field, "network_time"),
        other => panic!("expected invalid timestamp, got {other:?}"),
    }
    assert!(fetcher.calls().is_empty());
    assert!(check.seen().is_empty());
}

#[test]
fn checks_receive_the_pre_enrichment_context() {
    let check = Arc::new(FixedCheck::risky("fraud_toolkit", 30, "AFOSINT_HIGH"));
    let service = ReviewService::new(engine())
        .with_fetcher(storefront_fetcher())
        .with_check(Box::new(check.clone()));

    let result = service.review(&clean_account()).expect("review");

    let seen = check.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].risk_score, 0.0);
    assert_eq!(seen[0].positive_signals, 6.0);
    assert_eq!(result.risk_score(), 30);
    assert_eq!(result.verdict, Verdict::RouteToVipSales);
    assert!(result.tags.contains(&"AFOSINT_HIGH".to_string()));
    assert!(result.debug.collaborators.contains_key("fraud_toolkit"));
}

#[test]
fn auto_gated_accounts_skip_collaborators() {
    let fetcher = storefront_fetcher();
    let check = Arc::new(FixedCheck::risky("ml_api", 25, "ML_EXTREME_RISK"));
    let service = ReviewService::new(engine())
        .with_fetcher(fetcher.clone())
        .with_check(Box::new(check.clone()));
    let mut payload = clean_payload();
    payload["ml_score"] = json!(5);

    let result = service.review_value(payload).expect("review");

    assert_eq!(result.verdict, Verdict::Approve);
    assert!(result.debug.auto_gate);
    assert!(fetcher.calls().is_empty());
    assert!(check.seen().is_empty());
}

#[test]
fn unreachable_urls_surface_as_uncertainty() {
    let fetcher = Arc::new(StaticFetcher::default().with_error(
        CATALOG,
        CollaboratorError::Network("connection reset".to_string()),
    ));
    let service = ReviewService::new(engine()).with_fetcher(fetcher);

    let result = service.review(&clean_account()).expect("review");

    assert_eq!(result.uncertainty_signals(), 1);
    assert_eq!(result.verdict, Verdict::RouteToVipSales);
    assert!(result
        .reasons()
        .iter()
        .any(|reason| reason.contains("inspection error (network error: connection reset)")));
}

#[test]
fn check_names_follow_registration_order() {
    let service = ReviewService::new(engine())
        .with_check(Box::new(FixedCheck::risky("advanced_checks", 0, "NONE")))
        .with_check(Box::new(FixedCheck::risky("self_learning", 0, "NONE")));

    assert_eq!(service.check_names(), vec!["advanced_checks", "self_learning"]);
}
