//! E2E tests for deletion pacing.

mod common;

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use common::{TestTree, days_ago};

const POLICY: &str = r#"{"retention":{"default":30}}"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_deletions_at_five_per_second_take_nine_seconds() {
    let tree = TestTree::new(POLICY);
    for minute in 0..50 {
        tree.add_minute(
            "1001",
            "cam1",
            days_ago(400) + ChronoDuration::minutes(minute),
        );
    }

    let start = tokio::time::Instant::now();
    let result = tree
        .run(&["--execute", "--deletes-per-sec", "5", "--workers", "4"])
        .await;
    let elapsed = start.elapsed();

    assert!(!result.has_error);
    assert_eq!(result.stats.deleted, 50);
    assert!(
        elapsed >= Duration::from_millis(9_000),
        "50 deletions at 5/s finished in {elapsed:?}"
    );
}

#[tokio::test]
async fn unlimited_rate_is_fast() {
    let tree = TestTree::new(POLICY);
    for minute in 0..50 {
        tree.add_minute(
            "1001",
            "cam1",
            days_ago(400) + ChronoDuration::minutes(minute),
        );
    }

    let start = tokio::time::Instant::now();
    let result = tree.run(&["--execute", "--deletes-per-sec", "0"]).await;

    assert_eq!(result.stats.deleted, 50);
    assert!(start.elapsed() < Duration::from_secs(9));
}

#[tokio::test]
async fn dry_run_is_paced_too() {
    let tree = TestTree::new(POLICY);
    for minute in 0..6 {
        tree.add_minute(
            "1001",
            "cam1",
            days_ago(400) + ChronoDuration::minutes(minute),
        );
    }

    let start = tokio::time::Instant::now();
    let result = tree.run(&["--deletes-per-sec", "10"]).await;

    assert_eq!(result.stats.deleted, 6);
    assert!(start.elapsed() >= Duration::from_millis(500));
}
