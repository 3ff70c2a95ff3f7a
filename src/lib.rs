//! Netcfg Backup Library
//!
//! This library backs up running and startup configurations from a fleet of
//! network devices concurrently, writing timestamped artifacts per device.

pub mod config;
pub mod device;
pub mod drivers;
pub mod error;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_devices, Config};
pub use device::{Credential, DeviceDescriptor};
pub use drivers::{DeviceConfig, DeviceDriver, DriverError, DriverRegistry, DriverSession, Facts};
pub use error::{BackupError, OrchestratorError};
pub use managers::artifacts::{ArtifactKind, ArtifactStore};
pub use managers::backup::BackupManager;
pub use managers::logging::{init_logging, init_console_logging, LoggingConfig, LogGuard};
pub use managers::notification::NotificationManager;
pub use managers::report::{BackupResult, BackupStatus, RunSummary};
pub use managers::task::BackupTask;
