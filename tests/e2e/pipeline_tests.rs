//! Submission pipeline: tag, verify, collect, persist.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{StubPost, TestHarness, START};
use serde_json::json;
use std::time::Duration;
use tensorflix_core::{CoordinatorEvent, Error, SubmissionStatus, TAG_TTL_SECS};
use tokio_test::assert_ok;

fn tagged_post(h: &TestHarness, submission_id: &str, metrics: serde_json::Value) -> String {
    let tag = h
        .coordinator
        .create_tag(submission_id, "miner-7", START)
        .expect("create tag");
    h.publish(
        &format!("post-{submission_id}"),
        StubPost {
            text: tag.clone(),
            time: START + 120.0,
            metrics,
        },
    );
    tag
}

#[tokio::test]
async fn test_authentic_post_flows_to_verified() {
    let h = TestHarness::setup();
    let mut events = h.coordinator.subscribe_events();
    tagged_post(&h, "sub-1", json!({"views": "5000", "likes": 250, "comments": 30, "shares": 5}));

    let outcome = h
        .coordinator
        .process_post("sub-1", "post-sub-1", "stub", START)
        .await
        .expect("process");

    assert!(outcome.valid);
    assert_eq!(outcome.status, SubmissionStatus::Verified);
    assert!((outcome.metrics.views - 5000.0).abs() < f64::EPSILON);

    let record = h.db.submission("sub-1").expect("query").expect("row");
    assert_eq!(record.status, SubmissionStatus::Verified);
    assert!(h.db.pending_submissions().expect("query").is_empty());

    let snapshot = h
        .db
        .latest_snapshot("post-sub-1", "stub")
        .expect("query")
        .expect("row");
    assert_eq!(snapshot.views, 5000);
    assert_eq!(snapshot.shares, 5);

    let verdicts = h.db.validation_results("sub-1").expect("query");
    let authenticity = verdicts
        .iter()
        .find(|v| v.validation_type == "authenticity")
        .expect("authenticity verdict");
    assert_eq!(authenticity.result, "pass");

    let received: Vec<CoordinatorEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(received.contains(&CoordinatorEvent::TagCreated {
        submission_id: "sub-1".to_string()
    }));
    assert!(received.contains(&CoordinatorEvent::PostVerified {
        post_id: "post-sub-1".to_string(),
        platform: "stub".to_string(),
        valid: true,
    }));
}

#[tokio::test]
async fn test_late_post_is_rejected() {
    let h = TestHarness::setup();
    let tag = h.coordinator.create_tag("sub-1", "miner-7", START).expect("tag");
    h.publish(
        "late",
        StubPost {
            text: tag,
            time: START + 601.0,
            metrics: json!({"views": 10}),
        },
    );

    let outcome = h
        .coordinator
        .process_post("sub-1", "late", "stub", START)
        .await
        .expect("process");

    assert!(!outcome.valid);
    assert_eq!(outcome.status, SubmissionStatus::Rejected);
    assert_eq!(
        h.db.social_post_validity("late", "stub").expect("query"),
        Some(false)
    );
}

#[tokio::test]
async fn test_expired_tag_is_rejected() {
    let h = TestHarness::setup();
    tagged_post(&h, "sub-1", json!({"views": 10}));
    h.clock.advance(TAG_TTL_SECS);

    let outcome = h
        .coordinator
        .process_post("sub-1", "post-sub-1", "stub", START)
        .await
        .expect("process");

    assert!(!outcome.valid);
    assert_eq!(h.coordinator.tags().get_tag("sub-1"), None);
}

#[tokio::test]
async fn test_uppercase_hash_still_matches() {
    let h = TestHarness::setup();
    let tag = h.coordinator.create_tag("sub-1", "miner-7", START).expect("tag");
    let (prefix, hash) = tag.split_at(tag.len() - 64);
    h.publish(
        "shouty",
        StubPost {
            text: format!("  {prefix}{}  ", hash.to_uppercase()),
            time: START,
            metrics: json!({}),
        },
    );

    assert!(h.coordinator.verify_post("shouty", "stub", START).await);
}

#[tokio::test]
async fn test_missing_post_and_outage_fail_closed() {
    let h = TestHarness::setup();
    h.coordinator.create_tag("sub-1", "miner-7", START).expect("tag");

    let missing = h
        .coordinator
        .process_post("sub-1", "never-posted", "stub", START)
        .await
        .expect("process");
    assert!(!missing.valid);
    assert_eq!(missing.metrics, Default::default());

    let outage = h
        .coordinator
        .process_post("sub-1", "anything", "down", START)
        .await
        .expect("process");
    assert!(!outage.valid);
    assert_eq!(outage.status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn test_gaming_and_virality() {
    let h = TestHarness::setup();
    tagged_post(&h, "gamed", json!({"views": 100, "likes": 5000}));
    tagged_post(
        &h,
        "viral",
        json!({"views": 200_000, "likes": 30_000, "comments": 2_000, "shares": 500}),
    );

    let gamed = h
        .coordinator
        .process_post("gamed", "post-gamed", "stub", START)
        .await
        .expect("process");
    assert!(gamed.gaming_suspected);
    assert_eq!(gamed.status, SubmissionStatus::Flagged);

    let viral = h
        .coordinator
        .process_post("viral", "post-viral", "stub", START)
        .await
        .expect("process");
    assert!(viral.viral);
    assert!(!viral.gaming_suspected);
    assert_eq!(viral.status, SubmissionStatus::Verified);
}

#[tokio::test]
async fn test_rate_limit_defers_then_recovers() {
    let h = TestHarness::setup_with(|config| {
        config.rate_limit.requests = 2;
        config.rate_limit.period_secs = 60;
        config.rate_limit.call_cost = 1.5;
    });
    tagged_post(&h, "sub-1", json!({"views": 10}));
    tagged_post(&h, "sub-2", json!({"views": 10}));

    for _ in 0..2 {
        h.coordinator
            .process_post("sub-1", "post-sub-1", "stub", START)
            .await
            .expect("within budget");
    }

    // A settled submission keeps its status when the budget runs out.
    let err = h
        .coordinator
        .process_post("sub-1", "post-sub-1", "stub", START)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)));
    let record = h.db.submission("sub-1").expect("query").expect("row");
    assert_eq!(record.status, SubmissionStatus::Verified);

    let err = h
        .coordinator
        .process_post("sub-2", "post-sub-2", "stub", START)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)));
    let record = h.db.submission("sub-2").expect("query").expect("row");
    assert_eq!(record.status, SubmissionStatus::Deferred);
    assert!((h.coordinator.api_cost("stub") - 3.0).abs() < f64::EPSILON);

    // One token replenishes every 30 seconds.
    h.clock.advance(31.0);
    let outcome = h
        .coordinator
        .process_post("sub-2", "post-sub-2", "stub", START)
        .await
        .expect("replenished");
    assert_eq!(outcome.status, SubmissionStatus::Verified);

    // Other platforms have their own budget.
    assert_ok!(h.coordinator.process_post("sub-1", "x", "down", START).await);
}

#[tokio::test]
async fn test_old_records_cleaned_up() {
    let h = TestHarness::setup();
    tagged_post(&h, "sub-1", json!({"views": 10}));
    h.coordinator
        .process_post("sub-1", "post-sub-1", "stub", START)
        .await
        .expect("process");

    h.clock.advance(7200.0);
    let report = h
        .db
        .cleanup_old_records(Duration::from_secs(3600))
        .expect("cleanup");

    assert_eq!(report.submissions, 1);
    assert_eq!(report.snapshots, 1);
    assert_eq!(report.validations, 2);
    assert_eq!(report.social_posts, 1);
    assert!(h.db.submission_history(10).expect("query").is_empty());
}
