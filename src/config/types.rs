use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub global: GlobalConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Command templates per platform tag
    #[serde(default)]
    pub platforms: HashMap<String, PlatformConfig>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Directory receiving all artifacts and reports
    pub backup_root: PathBuf,

    /// Upper bound on concurrent device backups (required)
    pub max_workers: usize,

    /// Timeout applied to each driver operation
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_seconds: u64,

    /// Keep only this many artifacts per device and kind
    #[serde(default)]
    pub keep_last: Option<usize>,

    /// Write a JSON run report into the backup root
    #[serde(default = "default_write_report")]
    pub write_report: bool,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub discord_webhook_url: String,

    #[serde(default = "default_notify_on")]
    pub notify_on: Vec<NotifyEvent>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: String::new(),
            notify_on: default_notify_on(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifyEvent {
    Failure,
    Success,
    Changes,
}

/// Shell command templates for one platform
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Reachability/handshake check run when a session opens
    #[serde(default)]
    pub connect_command: Option<String>,

    /// Prints the running configuration
    pub running_command: String,

    /// Prints the startup configuration
    #[serde(default)]
    pub startup_command: Option<String>,

    /// Prints facts as a JSON object containing `hostname`
    #[serde(default)]
    pub facts_command: Option<String>,
}

/// Device entry as written in the config file (before credential resolution)
#[derive(Clone, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub hostname: String,
    pub platform: String,
    pub username: String,

    /// Exactly one of `password`, `password_env`, `key_file`
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl fmt::Debug for DeviceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceEntry")
            .field("hostname", &self.hostname)
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .field("key_file", &self.key_file)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .finish()
    }
}

// Default value functions

fn default_operation_timeout() -> u64 { 30 }
fn default_write_report() -> bool { true }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_notify_on() -> Vec<NotifyEvent> {
    vec![NotifyEvent::Failure]
}
