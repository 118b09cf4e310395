use std::fs;
use std::thread;

use super::common::*;
use crate::learning::{label_for, FeedbackMetadata, FeedbackRecord, FeedbackStore, LearningError};
use crate::review::{DecisionContext, Verdict};

#[test]
fn labels_map_reject_to_the_positive_class() {
    assert_eq!(label_for("Reject").expect("reject"), 1);
    for verdict in [
        "Approve",
        "Route to Human VIP Sales",
        "Conditional Approval - Hold for URL Verification",
    ] {
        assert_eq!(label_for(verdict).expect("known verdict"), 0);
    }
    match label_for("Maybe later") {
        Err(LearningError::UnknownLabel(label)) => assert_eq!(label, "Maybe later"),
        other => panic!("expected unknown label, got {other:?}"),
    }
}

#[test]
fn blank_verdict_has_no_label() {
    let mut blank = record(0, "Approve");
    blank.final_verdict = "   ".to_string();
    assert_eq!(blank.label().expect("blank is not an error"), None);
}

#[test]
fn append_creates_parent_dirs_and_preserves_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FeedbackStore::new(dir.path().join("nested/feedback.jsonl"));
    assert!(!store.exists());

    store.append(&record(1, "Approve")).expect("append");
    store.append(&record(2, "Reject")).expect("append");

    let records = store.read_all().expect("read");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].final_verdict, "Approve");
    assert_eq!(records[1].metadata.review_id.as_deref(), Some("case-2"));
    assert_eq!(records[1].reviewed_at_utc, reviewed_at());
}

#[test]
fn record_new_captures_verdict_label_and_context() {
    let context = DecisionContext {
        clock_diff_minutes: 12.0,
        risk_score: 40.0,
        ..DecisionContext::default()
    };

    let record = FeedbackRecord::new(
        account_value(61.0),
        Verdict::RouteToVipSales,
        &context,
        FeedbackMetadata::default(),
        reviewed_at(),
    );

    assert_eq!(record.final_verdict, "Route to Human VIP Sales");
    assert_eq!(record.context["risk_score"], 40.0);
    assert_eq!(record.label().expect("label"), Some(0));
}

#[test]
fn blank_lines_are_ignored_by_reads_and_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("feedback.jsonl");
    let line = serde_json::to_string(&record(3, "Reject")).expect("serialize");
    fs::write(&path, format!("\n{line}\n   \n{line}\n\n")).expect("write");

    let store = FeedbackStore::new(&path);

    assert_eq!(store.count_lines().expect("count"), 2);
    assert_eq!(store.read_all().expect("read").len(), 2);
}

#[test]
fn malformed_line_reports_its_number() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("feedback.jsonl");
    let line = serde_json::to_string(&record(3, "Reject")).expect("serialize");
    fs::write(&path, format!("{line}\n{{truncated\n")).expect("write");

    match FeedbackStore::new(&path).read_all() {
        Err(LearningError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn null_fields_and_non_object_lines_read_as_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("feedback.jsonl");
    let good = serde_json::to_string(&record(1, "Approve")).expect("serialize");
    let nulls = r#"{"account":{"ml_score":72},"final_verdict":"Reject","context":null,"metadata":null,"reviewed_at_utc":null}"#;
    fs::write(&path, format!("{good}\n{nulls}\n[1, 2]\n\"loose text\"\n{{\"final_verdict\":null}}\n"))
        .expect("write");

    let records = FeedbackStore::new(&path).read_all().expect("lenient read");
    assert_eq!(records.len(), 5);
    assert_eq!(records[1].final_verdict, "Reject");
    assert_eq!(records[1].metadata, FeedbackMetadata::default());
    assert_eq!(records[1].label().expect("known"), Some(1));
    for skipped in &records[2..] {
        assert_eq!(skipped.label().expect("blank"), None);
    }
}

#[test]
fn concurrent_appends_never_interleave() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("feedback.jsonl");

    thread::scope(|scope| {
        for worker in 0..8 {
            let store = FeedbackStore::new(&path);
            scope.spawn(move || {
                for index in 0..25 {
                    store
                        .append(&record(worker * 100 + index, "Approve"))
                        .expect("append");
                }
            });
        }
    });

    let store = FeedbackStore::new(&path);
    assert_eq!(store.count_lines().expect("count"), 200);
    assert_eq!(store.read_all().expect("every line parses").len(), 200);
}
