//! Unit tests for configuration loading and validation
//!
//! These tests verify config parsing, validation, and device resolution.

use netcfg_backup::config::{load_config, resolve_devices, ConfigError, NotifyEvent};
use netcfg_backup::Credential;
use rstest::rstest;
use test_utils::{
    minimal_config_toml, multi_device_config_toml, render_config, ConfigBuilder, TestContext,
};

fn write_template(ctx: &TestContext, template: &str) -> std::path::PathBuf {
    let backup_root = ctx.temp_dir().join("backups").to_string_lossy().replace('\\', "/");
    let log_dir = ctx.temp_dir().join("logs").to_string_lossy().replace('\\', "/");
    ctx.create_file("config.toml", &render_config(template, &backup_root, &log_dir))
}

#[test]
fn test_config_loading_valid() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_device("r1").add_device("r2"));
    let config_path = ctx.write_config().unwrap();

    let loaded = load_config(&config_path);
    assert!(loaded.is_ok(), "Config should load successfully: {:?}", loaded.err());

    let loaded = loaded.unwrap();
    assert_eq!(loaded.devices.len(), 2);
    assert_eq!(loaded.devices[0].hostname, "r1");
}

#[test]
fn test_minimal_template_defaults() {
    let ctx = TestContext::new();
    let path = write_template(&ctx, minimal_config_toml());

    let config = load_config(&path).unwrap();
    assert_eq!(config.global.max_workers, 2);
    assert_eq!(config.global.operation_timeout_seconds, 30);
    assert!(config.global.write_report);
    assert!(config.notifications.discord_webhook_url.is_empty());
}

#[test]
fn test_multi_device_template() {
    let ctx = TestContext::new();
    let path = write_template(&ctx, multi_device_config_toml());

    let config = load_config(&path).unwrap();
    assert_eq!(config.devices.len(), 3);
    assert_eq!(config.platforms.len(), 2);
    assert_eq!(config.global.keep_last, Some(5));
    assert_eq!(
        config.notifications.notify_on,
        vec![NotifyEvent::Failure, NotifyEvent::Changes]
    );

    let junos = &config.platforms["juniper_junos"];
    assert!(junos.facts_command.is_some());
    assert!(junos.connect_command.is_none());
}

#[test]
fn test_resolve_devices_with_env_password() {
    let ctx = TestContext::new();
    let path = write_template(&ctx, multi_device_config_toml());
    let config = load_config(&path).unwrap();

    std::env::set_var("NETCFG_TEST_ACCESS_PASSWORD", "from-env");
    let devices = resolve_devices(&config).unwrap();

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[1].hostname, "edge-fw-01");
    assert_eq!(devices[1].option("port"), Some("830"));
    assert_eq!(
        devices[1].credential,
        Credential::KeyFile("/keys/id_ed25519".into())
    );
    assert_eq!(
        devices[2].credential,
        Credential::Password("from-env".to_string())
    );
}

#[test]
fn test_config_missing_file() {
    let result = load_config("/nonexistent/netcfg-backup.toml");
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[rstest]
#[case::zero_workers("max_workers = 2", "max_workers = 0")]
#[case::zero_timeout("max_workers = 2", "max_workers = 2\noperation_timeout_seconds = 0")]
#[case::zero_keep_last("max_workers = 2", "max_workers = 2\nkeep_last = 0")]
#[case::empty_running_command("running_command = \"printf 'hostname {host}\\n'\"", "running_command = \"  \"")]
fn test_invalid_values_rejected(#[case] from: &str, #[case] to: &str) {
    let ctx = TestContext::new();
    let template = minimal_config_toml().replace(from, to);
    assert_ne!(template, minimal_config_toml(), "replacement did not apply");

    let path = write_template(&ctx, &template);
    let result = load_config(&path);
    assert!(
        matches!(result, Err(ConfigError::ValidationError(_))),
        "expected validation error, got {:?}",
        result
    );
}

#[test]
fn test_unknown_platform_reference() {
    let ctx = TestContext::new();
    let template = minimal_config_toml().replace(
        "platform = \"linux_shell\"",
        "platform = \"arista_eos\"",
    );
    let path = write_template(&ctx, &template);

    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::PlatformNotFound { ref platform, .. } if platform == "arista_eos"));
    assert!(err.to_string().contains("r1"));
}

#[test]
fn test_invalid_toml() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "[global\nbackup_root = ");
    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}
