//! Device driver contract
//!
//! A driver opens sessions to devices of one platform. The backup core only
//! talks to [`DeviceDriver`] and [`DriverSession`]; vendor specifics live in
//! the implementations, selected at runtime through the [`DriverRegistry`].

pub mod mock;
pub mod registry;
pub mod shell;

pub use registry::DriverRegistry;
pub use shell::ShellDriver;

use crate::device::DeviceDescriptor;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Errors reported by driver implementations
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriverError {
    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Command(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Configuration text retrieved from a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub running: String,
    pub startup: Option<String>,
}

impl DeviceConfig {
    pub fn new(running: impl Into<String>) -> Self {
        Self {
            running: running.into(),
            startup: None,
        }
    }

    pub fn with_startup(mut self, startup: impl Into<String>) -> Self {
        self.startup = Some(startup.into());
        self
    }

    /// Startup config, treating blank output as absent
    pub fn startup_text(&self) -> Option<&str> {
        self.startup
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Device facts, kept key-ordered so serialized output diffs cleanly
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Facts(BTreeMap<String, Value>);

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The device-reported hostname, if present and a non-empty string
    pub fn hostname(&self) -> Option<&str> {
        self.0
            .get("hostname")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for Facts {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// Opens sessions to devices of one platform
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Establish a session with the device
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DriverSession>, DriverError>;

    /// Driver name (for logging)
    fn name(&self) -> &str;
}

/// An open session with one device
#[async_trait]
pub trait DriverSession: Send {
    /// Fetch running and (optionally) startup configuration
    async fn get_config(&mut self) -> Result<DeviceConfig, DriverError>;

    /// Fetch device facts; must include a `hostname` key
    async fn get_facts(&mut self) -> Result<Facts, DriverError>;

    /// Release the session. Safe to call after failed calls; never fails.
    async fn close(&mut self);
}
