//! Test fixtures and sample data
//!
//! Provides pre-built devices and config templates for testing.

use netcfg_backup::{Credential, DeviceDescriptor};

/// Platform tag the mock driver is registered under
pub const MOCK_PLATFORM: &str = "mock_ios";

/// A device on the mock platform
pub fn device(hostname: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(
        hostname,
        MOCK_PLATFORM,
        "backup",
        Credential::Password("test-password".to_string()),
    )
}

/// `count` devices named `{prefix}01`, `{prefix}02`, ...
pub fn devices(prefix: &str, count: usize) -> Vec<DeviceDescriptor> {
    (1..=count)
        .map(|i| device(&format!("{}{:02}", prefix, i)))
        .collect()
}

/// Minimal valid config TOML template
///
/// Placeholders: `{backup_root}`, `{log_dir}`.
pub fn minimal_config_toml() -> &'static str {
    r#"
[global]
backup_root = "{backup_root}"
log_directory = "{log_dir}"
max_workers = 2

[platforms.linux_shell]
running_command = "printf 'hostname {host}\n'"

[[devices]]
hostname = "r1"
platform = "linux_shell"
username = "backup"
password = "secret"
"#
}

/// Config with several devices, options and all credential sources
pub fn multi_device_config_toml() -> &'static str {
    r#"
[global]
backup_root = "{backup_root}"
log_directory = "{log_dir}"
max_workers = 4
operation_timeout_seconds = 10
keep_last = 5

[notifications]
discord_webhook_url = ""
notify_on = ["failure", "changes"]

[platforms.cisco_ios]
connect_command = "true"
running_command = "printf 'hostname {host}\n'"
startup_command = "printf 'hostname {host}\n'"

[platforms.juniper_junos]
running_command = "printf 'host-name {host};\n'"
facts_command = "printf '{\"hostname\": \"{host}\"}'"

[[devices]]
hostname = "core-sw-01"
platform = "cisco_ios"
username = "backup"
password = "secret"

[[devices]]
hostname = "edge-fw-01"
platform = "juniper_junos"
username = "backup"
key_file = "/keys/id_ed25519"
[devices.options]
port = "830"

[[devices]]
hostname = "access-sw-07"
platform = "cisco_ios"
username = "backup"
password_env = "NETCFG_TEST_ACCESS_PASSWORD"
"#
}

/// Substitute `{backup_root}` and `{log_dir}` in a template
pub fn render_config(template: &str, backup_root: &str, log_dir: &str) -> String {
    template
        .replace("{backup_root}", backup_root)
        .replace("{log_dir}", log_dir)
}
