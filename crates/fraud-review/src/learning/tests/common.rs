use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::learning::{FeedbackMetadata, FeedbackRecord, FeedbackStore};

pub(super) fn reviewed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Feedback row whose features lean toward `verdict`.
pub(super) fn record(index: usize, verdict: &str) -> FeedbackRecord {
    let rejected = verdict == "Reject";
    let jitter = (index % 7) as f64;
    let account = json!({
        "name": format!("Reviewer Case {index}"),
        "email": if rejected { format!("case{index}@gmail.com") } else { format!("ops{index}@acme-widgets.com") },
        "ml_score": if rejected { 70.0 + jitter } else { 35.0 + jitter },
        "item_urls": if rejected { json!([]) } else { json!(["https://acme-widgets.com"]) },
    });
    let context = json!({
        "clock_diff_minutes": if rejected { 180.0 + jitter } else { 5.0 },
        "offset_diff_minutes": if rejected { 345.0 } else { 0.0 },
        "risk_score": if rejected { 75.0 + jitter } else { 10.0 + jitter },
        "positive_signals": if rejected { 1.0 } else { 5.0 },
        "uncertainty_signals": 0.0,
    });
    FeedbackRecord {
        account,
        final_verdict: verdict.to_string(),
        context,
        metadata: FeedbackMetadata {
            source: Some("unit-test".to_string()),
            review_id: Some(format!("case-{index}")),
        },
        reviewed_at_utc: reviewed_at(),
    }
}

/// `approve` non-reject rows followed by `reject` reject rows.
pub(super) fn seed_store(store: &FeedbackStore, approve: usize, reject: usize) {
    let approvals = ["Approve", "Route to Human VIP Sales", "Conditional Approval - Hold for URL Verification"];
    for index in 0..approve {
        store
            .append(&record(index, approvals[index % approvals.len()]))
            .expect("append approve");
    }
    for index in 0..reject {
        store
            .append(&record(approve + index, "Reject"))
            .expect("append reject");
    }
}

pub(super) fn account_value(ml_score: f64) -> Value {
    json!({
        "name": "Jane Doe",
        "email": "jane@acme-widgets.com",
        "ml_score": ml_score,
        "item_urls": ["https://acme-widgets.com"],
    })
}
