//! Configuration module for netcfg-backup
//!
//! This module handles loading, validating, and resolving configuration from TOML files.
//!
//! ## Layout
//!
//! - `[global]`: backup root, worker count, timeouts, retention, logging
//! - `[notifications]`: optional Discord webhook
//! - `[platforms.<tag>]`: shell command templates per platform
//! - `[[devices]]`: the inventory, in backup dispatch order
//!
//! ## Example Usage
//!
//! ```no_run
//! use netcfg_backup::config;
//!
//! let config = config::load_config("netcfg-backup.toml")?;
//! let devices = config::resolve_devices(&config)?;
//!
//! for device in devices {
//!     println!("Device: {} ({})", device.hostname, device.platform);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, parse_config, resolve_device, resolve_devices, ConfigError, Result};
pub use types::*;

use std::time::Duration;

impl GlobalConfig {
    /// Backup root with `~` expanded
    pub fn backup_root(&self) -> std::path::PathBuf {
        expand_tilde(&self.backup_root)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
