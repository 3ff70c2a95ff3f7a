//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use crate::fixtures::MOCK_PLATFORM;
use netcfg_backup::config::{
    Config, DeviceEntry, GlobalConfig, NotificationConfig, PlatformConfig,
};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    platforms: HashMap<String, PlatformConfig>,
    devices: Vec<DeviceEntry>,
    notifications: NotificationConfig,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no platforms or devices
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backup_root = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_root).expect("Failed to create backup_root");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let global = GlobalConfig {
            backup_root,
            max_workers: 4,
            operation_timeout_seconds: 5,
            keep_last: None,
            write_report: true,
            log_directory,
            log_level: "debug".to_string(),
            log_max_files: 5,
        };

        Self {
            temp_dir,
            global,
            platforms: HashMap::new(),
            devices: Vec::new(),
            notifications: NotificationConfig::default(),
        }
    }

    /// Create a config with the mock platform declared
    pub fn minimal() -> Self {
        Self::new().add_shell_platform(MOCK_PLATFORM, "printf 'hostname {host}\\n'")
    }

    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.global.max_workers = max_workers;
        self
    }

    /// Set the per-operation timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.global.operation_timeout_seconds = seconds;
        self
    }

    pub fn with_keep_last(mut self, keep_last: usize) -> Self {
        self.global.keep_last = Some(keep_last);
        self
    }

    pub fn without_report(mut self) -> Self {
        self.global.write_report = false;
        self
    }

    /// Declare a platform whose running config comes from one shell command
    pub fn add_shell_platform(self, tag: &str, running_command: &str) -> Self {
        self.add_platform(
            tag,
            PlatformConfig {
                connect_command: None,
                running_command: running_command.to_string(),
                startup_command: None,
                facts_command: None,
            },
        )
    }

    /// Declare a platform with full command templates
    pub fn add_platform(mut self, tag: &str, platform: PlatformConfig) -> Self {
        self.platforms.insert(tag.to_string(), platform);
        self
    }

    /// Add a password-authenticated device on the mock platform
    pub fn add_device(self, hostname: &str) -> Self {
        self.add_device_on(hostname, MOCK_PLATFORM)
    }

    /// Add a password-authenticated device on a given platform
    pub fn add_device_on(mut self, hostname: &str, platform: &str) -> Self {
        self.devices.push(DeviceEntry {
            hostname: hostname.to_string(),
            platform: platform.to_string(),
            username: "backup".to_string(),
            password: Some("test-password".to_string()),
            password_env: None,
            key_file: None,
            options: BTreeMap::new(),
        });
        self
    }

    /// Add a device entry with full control over credentials and options
    pub fn add_device_entry(mut self, entry: DeviceEntry) -> Self {
        self.devices.push(entry);
        self
    }

    /// Set notification configuration
    pub fn with_notifications(mut self, config: NotificationConfig) -> Self {
        self.notifications = config;
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn backup_root(&self) -> PathBuf {
        self.global.backup_root.clone()
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.persist().0
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            global: self.global,
            notifications: self.notifications,
            platforms: self.platforms,
            devices: self.devices,
        };
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
