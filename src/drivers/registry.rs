//! Platform tag to driver registry

use super::{DeviceDriver, ShellDriver};
use crate::config::PlatformConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Maps platform tags to the driver that handles them
///
/// Adding a vendor means registering another driver here; nothing in the
/// orchestrator branches on platform.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DeviceDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one shell driver per configured platform
    pub fn from_platforms(platforms: &HashMap<String, PlatformConfig>) -> Self {
        let mut registry = Self::new();
        for (tag, platform) in platforms {
            registry.register(tag, Arc::new(ShellDriver::new(tag, platform.clone())));
        }
        registry
    }

    /// Register (or replace) the driver for a platform tag
    pub fn register(&mut self, platform: &str, driver: Arc<dyn DeviceDriver>) {
        debug!("Registering driver '{}' for platform '{}'", driver.name(), platform);
        self.drivers.insert(platform.to_string(), driver);
    }

    /// Builder-style registration
    pub fn with_driver(mut self, platform: &str, driver: Arc<dyn DeviceDriver>) -> Self {
        self.register(platform, driver);
        self
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn DeviceDriver>> {
        self.drivers.get(platform).cloned()
    }

    pub fn contains(&self, platform: &str) -> bool {
        self.drivers.contains_key(platform)
    }

    /// Registered platform tags, sorted
    pub fn platforms(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.drivers.keys().cloned().collect();
        tags.sort();
        tags
    }
}
