//! End-to-end review scenarios driven through the public service facade.

mod common {
    use std::sync::Arc;

    use fraud_review::policy::PolicyConfig;
    use fraud_review::review::collectors::FetchedPage;
    use fraud_review::review::{CollaboratorError, DecisionEngine, PageFetcher, ReviewService};
    use serde_json::{json, Value};

    pub(super) struct HealthyStorefront;

    impl PageFetcher for HealthyStorefront {
        fn fetch(&self, url: &str) -> Result<FetchedPage, CollaboratorError> {
            let copy = "Precision CNC parts, fasteners, and industrial widgets built in Ohio. ".repeat(6);
            Ok(FetchedPage {
                final_url: url.to_string(),
                status: 200,
                body: format!(
                    "<html><head><title>Northwind Components</title></head><body><p>{copy}</p></body></html>"
                ),
            })
        }
    }

    pub(super) fn service() -> ReviewService {
        ReviewService::new(DecisionEngine::new(PolicyConfig::default()))
            .with_fetcher(Arc::new(HealthyStorefront))
    }

    pub(super) fn enterprise_account() -> Value {
        json!({
            "name": "Maria Lopez",
            "email": "maria.lopez@northwind-components.com",
            "ml_score": 62,
            "company_name": "Northwind Components Inc",
            "cc_owner": "Carlos Lopez",
            "cc_country": "United States",
            "address": "88 Harbor Rd, Cleveland, OH, USA",
            "local_time": "2025-06-10T09:12:00-04:00",
            "network_time": "2025-06-10T09:14:00-04:00",
            "item_urls": ["https://northwind-components.com/products"],
            "ip_addresses": ["198.51.100.20"],
            "email_first_seen": "2016-02-11",
            "network_country": "United States"
        })
    }
}

use common::*;
use fraud_review::review::{format_report, ConfidenceLevel, ReviewError, Verdict};
use serde_json::json;

#[test]
fn enterprise_applicant_with_family_card_is_approved() {
    let result = service()
        .review_value(enterprise_account())
        .expect("review succeeds");

    assert_eq!(result.verdict, Verdict::Approve);
    assert!(result.confidence_score() >= 75);
    assert_eq!(result.confidence_level(), ConfidenceLevel::High);
    assert!(result.tags.contains(&"CLEAN_CONTENT".to_string()));
    assert!(format_report(&result).contains("### Verdict: Approve"));
}

#[test]
fn shell_address_foreign_card_and_forged_timezone_are_rejected() {
    let mut account = enterprise_account();
    account["address"] = json!("251 Little Falls Dr, Wilmington, DE 19808");
    account["cc_country"] = json!("Vietnam");
    account["local_time"] = json!("2025-06-10T19:02:00+05:45");
    account["network_time"] = json!("2025-06-10T09:14:00-04:00");

    let result = service().review_value(account).expect("review succeeds");

    assert_eq!(result.verdict, Verdict::Reject);
    assert!(result.debug.hard_reject);
    assert!(result.risk_score() >= 70);
    assert!(result.tags.contains(&"MULTI_SIGNAL".to_string()));
}

#[test]
fn auto_approve_gate_wins_over_manual_red_flags() {
    let mut account = enterprise_account();
    account["ml_score"] = json!(18);
    account["address"] = json!("30 N Gould St, Sheridan, WY");

    let result = service().review_value(account).expect("review succeeds");

    assert_eq!(result.verdict, Verdict::Approve);
    assert!(result.debug.auto_gate);
}

#[test]
fn account_without_urls_is_held() {
    let mut account = enterprise_account();
    account["item_urls"] = json!(null);

    let result = service().review_value(account).expect("review succeeds");

    assert_eq!(result.verdict, Verdict::ConditionalHold);
    assert!(result.tags.contains(&"URL_MISSING".to_string()));
}

#[test]
fn malformed_timestamp_is_a_fatal_input_error() {
    let mut account = enterprise_account();
    account["local_time"] = json!("10/06/2025 09:12");

    match service().review_value(account) {
        Err(ReviewError::InvalidTimestamp { field, .. }) => assert_eq!(field, "local_time"),
        other => panic!("expected invalid timestamp, got {other:?}"),
    }
}
