//! Test utilities for netcfg-backup
//!
//! This crate provides shared test utilities, fixtures, and re-exports of
//! the mock driver for testing the netcfg-backup orchestrator.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockDriver, TestContext};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_device("r1"));
//!     let summary = ctx
//!         .manager(MockDriver::new())
//!         .run_backup(ctx.devices(), 2)
//!         .await
//!         .unwrap();
//!     // ... assertions
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use netcfg_backup::config::{
    Config, DeviceEntry, GlobalConfig, NotificationConfig, NotifyEvent, PlatformConfig,
};
pub use netcfg_backup::{
    ArtifactKind, ArtifactStore, BackupError, BackupManager, BackupResult, BackupStatus,
    BackupTask, Credential, DeviceDescriptor, DriverRegistry, RunSummary,
};

// Re-export mock implementations from the main crate
pub use netcfg_backup::drivers::mock::{MockDevice, MockDriver, SessionCounts};
pub use netcfg_backup::drivers::DriverError;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
