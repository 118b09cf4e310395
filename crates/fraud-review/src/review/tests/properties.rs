use proptest::prelude::*;
use serde_json::json;

use super::common::*;
use crate::review::domain::Verdict;
use crate::review::evaluation::{confidence_score, ExternalSignals};

fn offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

proptest! {
    #[test]
    fn confidence_never_rises_with_risk_or_uncertainty(
        positive in 0i32..15,
        risk in 0i32..200,
        uncertainty in 0i32..6,
        extra in 1i32..40,
        has_urls in any::<bool>(),
    ) {
        let base = confidence_score(positive, risk, uncertainty, has_urls);
        prop_assert!(confidence_score(positive, risk + extra, uncertainty, has_urls) <= base);
        prop_assert!(confidence_score(positive, risk, uncertainty + 1, has_urls) <= base);
        prop_assert!(confidence_score(positive + 1, risk, uncertainty, has_urls) >= base);
        prop_assert!((10..=95).contains(&base));
    }

    #[test]
    fn low_ml_scores_always_auto_approve(
        ml_score in 0.0f64..29.99,
        shell in any::<bool>(),
    ) {
        let mut payload = clean_payload();
        payload["ml_score"] = json!(ml_score);
        if shell {
            payload["address"] = json!("251 Little Falls Dr, Wilmington, DE");
            payload["cc_country"] = json!("Brazil");
        }

        let result = engine()
            .decide(&account_from(payload), &ExternalSignals::none())
            .expect("decision");

        prop_assert_eq!(result.verdict, Verdict::Approve);
        prop_assert!(result.debug.auto_gate);
    }

    #[test]
    fn accounts_without_urls_are_never_approved(
        ml_score in 30.0f64..=85.0,
        local in -720i32..=840,
        network in -720i32..=840,
        clock_gap in 0u32..600,
    ) {
        let mut payload = clean_payload();
        payload["ml_score"] = json!(ml_score);
        payload["item_urls"] = json!([]);
        payload["local_time"] = json!(format!("2025-03-01T08:00:00{}", offset(local)));
        payload["network_time"] = json!(format!(
            "2025-03-01T{:02}:{:02}:00{}",
            8 + clock_gap / 60,
            clock_gap % 60,
            offset(network)
        ));

        let result = engine()
            .decide(&account_from(payload), &ExternalSignals::none())
            .expect("decision");

        prop_assert_ne!(result.verdict, Verdict::Approve);
    }

    #[test]
    fn decisions_are_deterministic(
        ml_score in 0.0f64..=100.0,
        local in -720i32..=840,
    ) {
        let mut payload = clean_payload();
        payload["ml_score"] = json!(ml_score);
        payload["local_time"] = json!(format!("2025-03-01T10:00:00{}", offset(local)));
        let account = account_from(payload);

        let first = engine().decide(&account, &ExternalSignals::none()).expect("decision");
        let second = engine().decide(&account, &ExternalSignals::none()).expect("decision");

        prop_assert_eq!(first, second);
    }
}
