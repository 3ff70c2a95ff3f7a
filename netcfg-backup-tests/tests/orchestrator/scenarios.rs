//! End-to-end scenarios against the artifact store

use netcfg_backup::config::NotifyEvent;
use test_utils::{
    device, ArtifactKind, BackupError, ConfigBuilder, MockDevice, MockDriver, TestContext,
};

#[tokio::test]
async fn test_three_devices_one_unreachable() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().unreachable("C");

    let summary = ctx
        .manager(driver)
        .run_backup(vec![device("A"), device("B"), device("C")], 3)
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].hostname, "C");
    assert_eq!(summary.errors[0].category, "connection");
    assert!(!summary.is_success());

    for host in ["A", "B"] {
        let names = ctx.artifact_names(host);
        assert_eq!(names.len(), 4, "{}: {:?}", host, names);
        assert!(names.contains(&format!("{}_running_latest.cfg", host)));
        assert!(names.contains(&format!("{}_facts_latest.json", host)));
    }
    assert!(ctx.artifact_names("C").is_empty());
    assert!(!ctx.backup_root().join("C").exists());
}

#[tokio::test]
async fn test_empty_startup_is_not_written() {
    let ctx = TestContext::new();
    let driver = MockDriver::new()
        .device(
            "blank",
            MockDevice {
                startup: Some("  \n".to_string()),
                ..Default::default()
            },
        )
        .with_startup("full", "hostname full\n!\nend\n");

    let summary = ctx
        .manager(driver)
        .run_backup(vec![device("none"), device("blank"), device("full")], 3)
        .await
        .unwrap();

    assert!(summary.is_success());
    for result in &summary.results {
        let expected = if result.hostname == "full" { 3 } else { 2 };
        assert_eq!(result.artifacts.len(), expected, "{:?}", result);
    }

    let store = ctx.store();
    assert!(store.list("none", ArtifactKind::Startup).unwrap().is_empty());
    assert!(store.list("blank", ArtifactKind::Startup).unwrap().is_empty());
    assert_eq!(store.list("full", ArtifactKind::Startup).unwrap().len(), 1);
}

#[tokio::test]
async fn test_reported_hostname_keys_artifacts() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().device(
        "10.0.0.1",
        MockDevice {
            reported_hostname: Some("core-sw-01".to_string()),
            ..Default::default()
        },
    );

    let summary = ctx
        .manager(driver)
        .run_backup(vec![device("10.0.0.1")], 1)
        .await
        .unwrap();

    let result = &summary.results[0];
    assert!(result.is_success());
    assert_eq!(result.hostname, "core-sw-01");
    assert_eq!(result.inventory_hostname, "10.0.0.1");
    assert!(result
        .artifacts
        .iter()
        .all(|p| p.starts_with(ctx.backup_root().join("core-sw-01"))));
    assert!(ctx.artifact_names("10.0.0.1").is_empty());
}

#[tokio::test]
async fn test_repeated_runs_keep_every_artifact() {
    let ctx = TestContext::new();

    for round in 0..3 {
        let driver = MockDriver::new().device(
            "r1",
            MockDevice {
                running: Some(format!("hostname r1\n! round {}\n", round)),
                ..Default::default()
            },
        );
        let summary = ctx
            .manager(driver)
            .run_backup(vec![device("r1")], 1)
            .await
            .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.results[0].config_changed, round > 0);
    }

    let store = ctx.store();
    let running = store.list("r1", ArtifactKind::Running).unwrap();
    assert_eq!(running.len(), 3);

    let latest = store.resolve_latest("r1", ArtifactKind::Running).unwrap();
    assert_eq!(Some(&latest), running.last());
    assert_eq!(
        std::fs::read_to_string(&latest).unwrap(),
        "hostname r1\n! round 2\n"
    );

    let diffs: Vec<String> = ctx
        .artifact_names("r1")
        .into_iter()
        .filter(|name| name.ends_with(".diff"))
        .collect();
    assert_eq!(diffs.len(), 2, "{:?}", diffs);
    let last_diff = ctx.backup_root().join("r1").join(&diffs[1]);
    assert!(std::fs::read_to_string(last_diff).unwrap().contains("+! round 2"));
}

#[tokio::test]
async fn test_shared_reported_hostname_persists_once() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_keep_last(1));
    let chassis = || MockDevice {
        reported_hostname: Some("core".to_string()),
        ..Default::default()
    };
    let driver = MockDriver::new()
        .device("10.0.0.1", chassis())
        .device("10.0.0.2", chassis());

    let summary = ctx
        .manager(driver)
        .run_backup(vec![device("10.0.0.1"), device("10.0.0.2")], 2)
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].category, "storage");
    assert!(summary.errors[0].message.contains("'core'"));

    let winner = summary.results.iter().find(|r| r.is_success()).unwrap();
    assert_eq!(winner.hostname, "core");
    assert!(winner.artifacts.iter().all(|p| p.exists()), "{:?}", winner.artifacts);

    let store = ctx.store();
    assert_eq!(store.list("core", ArtifactKind::Running).unwrap().len(), 1);
    assert_eq!(
        store.resolve_latest("core", ArtifactKind::Running).as_ref(),
        winner.artifacts.first()
    );
}

#[tokio::test]
async fn test_retention_applied_after_backup() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_keep_last(2));

    for _ in 0..4 {
        ctx.manager(MockDriver::new())
            .run_backup(vec![device("r1")], 1)
            .await
            .unwrap();
    }

    let store = ctx.store();
    assert_eq!(store.list("r1", ArtifactKind::Running).unwrap().len(), 2);
    assert_eq!(store.list("r1", ArtifactKind::Facts).unwrap().len(), 2);
    assert!(store.resolve_latest("r1", ArtifactKind::Running).is_some());
}

#[tokio::test]
async fn test_storage_failure_is_reported_as_storage() {
    let ctx = TestContext::new();
    // A plain file where the device directory should go
    ctx.create_file("backups/blocked", "not a directory");

    let summary = ctx
        .manager(MockDriver::new())
        .run_backup(vec![device("blocked"), device("fine")], 2)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    let failed = summary.results.iter().find(|r| r.hostname == "blocked").unwrap();
    assert!(matches!(failed.error, Some(BackupError::Storage(_))));
    assert!(failed.artifacts.is_empty());
}

#[tokio::test]
async fn test_summary_report_round_trip() {
    let ctx = TestContext::new();
    let driver = MockDriver::new().unreachable("r2");

    let summary = ctx
        .manager(driver)
        .run_backup(vec![device("r1"), device("r2")], 2)
        .await
        .unwrap();

    let path = ctx.store().write_report(&summary).unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(report["total"], 2);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["errors"][0]["hostname"], "r2");
    assert_eq!(report["errors"][0]["category"], "connection");

    let rendered = summary.render();
    assert!(rendered.contains("Devices failed:     1"));
    assert!(rendered.contains("r2 [connection]"));
}

#[test]
fn test_default_notifications_only_on_failure() {
    let config = ConfigBuilder::minimal().build();
    assert_eq!(config.notifications.notify_on, vec![NotifyEvent::Failure]);
}
