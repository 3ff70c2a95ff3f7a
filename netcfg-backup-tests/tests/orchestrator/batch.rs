//! Batch-level guarantees: one result per device, bounded concurrency,
//! failure isolation

use rstest::rstest;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use test_utils::{devices, ConfigBuilder, MockDevice, MockDriver, TestContext};

#[rstest]
#[case(1, 1)]
#[case(1, 7)]
#[case(3, 7)]
#[case(7, 7)]
#[case(16, 7)]
#[case(4, 0)]
#[tokio::test]
async fn test_one_result_per_device(#[case] workers: usize, #[case] count: usize) {
    let ctx = TestContext::new();
    let input = devices("sw", count);
    let driver = MockDriver::new().with_delay(Duration::from_millis(5));

    let summary = ctx.manager(driver).run_backup(input.clone(), workers).await.unwrap();

    assert_eq!(summary.total, count);
    assert_eq!(summary.results.len(), count);
    assert_eq!(summary.succeeded, count);

    let expected: BTreeSet<_> = input.iter().map(|d| d.hostname.clone()).collect();
    let actual: BTreeSet<_> = summary.results.iter().map(|r| r.hostname.clone()).collect();
    assert_eq!(actual, expected);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
#[tokio::test]
async fn test_concurrency_never_exceeds_workers(#[case] workers: usize) {
    let ctx = TestContext::new();
    let driver = MockDriver::new().with_delay(Duration::from_millis(40));

    let summary = ctx
        .manager(driver.clone())
        .run_backup(devices("r", 12), workers)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 12);
    assert!(
        driver.max_concurrent_sessions() <= workers,
        "{} sessions open at once with {} workers",
        driver.max_concurrent_sessions(),
        workers
    );
    assert!(driver.max_concurrent_sessions() >= 1);
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test]
async fn test_pool_actually_runs_in_parallel() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().with_delay(Duration::from_millis(400));

    let started = Instant::now();
    let summary = ctx
        .manager(driver.clone())
        .run_backup(devices("r", 4), 4)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 4);
    assert!(driver.max_concurrent_sessions() > 1);
    assert!(started.elapsed() < Duration::from_millis(1200));
}

#[tokio::test]
async fn test_failing_device_does_not_affect_others() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().unreachable("r03").failing_config("r05");

    let summary = ctx.manager(driver).run_backup(devices("r", 6), 2).await.unwrap();

    assert_eq!(summary.total, 6);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 2);
    for result in &summary.results {
        let should_fail = result.hostname == "r03" || result.hostname == "r05";
        assert_eq!(!result.is_success(), should_fail, "{:?}", result);
    }
}

#[tokio::test]
async fn test_hung_device_costs_only_its_timeout() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_timeout(1));
    let driver = MockDriver::new().device(
        "r02",
        MockDevice {
            hang_on_open: true,
            ..Default::default()
        },
    );

    let started = Instant::now();
    let summary = ctx.manager(driver).run_backup(devices("r", 4), 4).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].hostname, "r02");
    assert_eq!(summary.errors[0].category, "connection");
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3), "run took {:?}", elapsed);
}

#[tokio::test]
async fn test_timeout_frees_worker_slot() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_timeout(1));
    let driver = MockDriver::new().device(
        "r01",
        MockDevice {
            hang_on_config: true,
            ..Default::default()
        },
    );

    // One worker: the rest can only run after the hung device times out
    let summary = ctx
        .manager(driver.clone())
        .run_backup(devices("r", 3), 1)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.errors[0].hostname, "r01");
    assert_eq!(summary.errors[0].category, "retrieval");
    assert_eq!(driver.open_sessions(), 0);
}
