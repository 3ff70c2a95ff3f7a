//! Test context and harness for orchestrator testing
//!
//! Provides a unified context for setting up and tearing down test environments.

use crate::config_builder::ConfigBuilder;
use anyhow::Result;
use netcfg_backup::config::{self, Config};
use netcfg_backup::drivers::mock::MockDriver;
use netcfg_backup::{ArtifactStore, BackupManager, BackupTask, DeviceDescriptor, DriverRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Config,
}

impl TestContext {
    /// Create a test context with the mock platform and no devices
    pub fn new() -> Self {
        Self::from_builder(ConfigBuilder::minimal())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();
        Self { temp_dir, config }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backup_root(&self) -> &Path {
        &self.config.global.backup_root
    }

    /// Artifact store rooted at the configured backup root
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(self.backup_root())
    }

    /// Resolved devices in configuration order
    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        config::resolve_devices(&self.config).expect("Failed to resolve devices")
    }

    /// Backup manager with `driver` registered for every configured platform
    pub fn manager(&self, driver: MockDriver) -> BackupManager {
        let driver = Arc::new(driver);
        let mut registry = DriverRegistry::new();
        for tag in self.config.platforms.keys() {
            registry.register(tag, driver.clone());
        }

        let task = BackupTask::new(
            Arc::new(self.store()),
            self.config.global.operation_timeout(),
        )
        .with_retention(self.config.global.keep_last);

        BackupManager::new(registry, task)
    }

    /// Serialize the configuration to `config.toml` in the temp dir
    pub fn write_config(&self) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("config.toml");
        std::fs::write(&path, toml::to_string_pretty(&self.config)?)?;
        Ok(path)
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// File names inside a device's artifact directory, sorted
    pub fn artifact_names(&self, hostname: &str) -> Vec<String> {
        let dir = self.backup_root().join(hostname);
        let mut names: Vec<String> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Read a file from the temp directory
    pub fn read_file(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
