//! Session discipline: every opened session is closed exactly once

use std::time::Duration;
use test_utils::{device, ConfigBuilder, MockDevice, MockDriver, SessionCounts, TestContext};

fn closed_once() -> SessionCounts {
    SessionCounts {
        attempts: 1,
        opens: 1,
        closes: 1,
    }
}

#[tokio::test]
async fn test_close_after_success() {
    let ctx = TestContext::new();
    let driver = MockDriver::new();

    ctx.manager(driver.clone())
        .run_backup(vec![device("r1")], 1)
        .await
        .unwrap();

    assert_eq!(driver.counts("r1"), closed_once());
}

#[tokio::test]
async fn test_close_when_retrieval_fails() {
    let ctx = TestContext::new();
    let driver = MockDriver::new()
        .failing_config("cfg-fail")
        .failing_facts("facts-fail");

    let summary = ctx
        .manager(driver.clone())
        .run_backup(vec![device("cfg-fail"), device("facts-fail")], 2)
        .await
        .unwrap();

    assert_eq!(summary.failed, 2);
    assert!(summary.errors.iter().all(|e| e.category == "retrieval"));
    assert_eq!(driver.counts("cfg-fail"), closed_once());
    assert_eq!(driver.counts("facts-fail"), closed_once());
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_close_when_retrieval_times_out() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_timeout(1));
    let driver = MockDriver::new().device(
        "slow",
        MockDevice {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        },
    );

    let summary = ctx
        .manager(driver.clone())
        .run_backup(vec![device("slow")], 1)
        .await
        .unwrap();

    assert_eq!(summary.errors[0].category, "retrieval");
    assert_eq!(driver.counts("slow"), closed_once());
}

#[tokio::test]
async fn test_no_close_without_open() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().unreachable("down");

    let summary = ctx
        .manager(driver.clone())
        .run_backup(vec![device("down")], 1)
        .await
        .unwrap();

    assert_eq!(summary.errors[0].category, "connection");
    assert_eq!(
        driver.counts("down"),
        SessionCounts {
            attempts: 1,
            opens: 0,
            closes: 0,
        }
    );
}

#[tokio::test]
async fn test_missing_reported_hostname_still_closes() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().device(
        "anon",
        MockDevice {
            reported_hostname: Some("   ".to_string()),
            ..Default::default()
        },
    );

    let summary = ctx
        .manager(driver.clone())
        .run_backup(vec![device("anon")], 1)
        .await
        .unwrap();

    assert_eq!(summary.errors[0].category, "retrieval");
    assert_eq!(driver.counts("anon"), closed_once());
    assert!(ctx.artifact_names("anon").is_empty());
}
