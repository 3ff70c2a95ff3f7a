//! Device descriptors - identity and connection parameters for one device

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Resolved credential for a device
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    KeyFile(PathBuf),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
        }
    }
}

/// One device as handed to the orchestrator
///
/// Built once from the resolved inventory and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// Connection hostname or address, unique within a run
    pub hostname: String,
    /// Platform tag selecting the driver (e.g. `cisco_ios`)
    pub platform: String,
    pub username: String,
    #[serde(skip)]
    pub credential: Credential,
    /// Vendor-specific tuning such as `port` or `enable_secret`
    #[serde(skip)]
    pub options: BTreeMap<String, String>,
}

impl DeviceDescriptor {
    pub fn new(
        hostname: impl Into<String>,
        platform: impl Into<String>,
        username: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            platform: platform.into(),
            username: username.into(),
            credential,
            options: BTreeMap::new(),
        }
    }

    /// Add a vendor-specific option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up an option value
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Check the descriptor invariants, returning a reason on violation
    pub fn validate(&self) -> Result<(), String> {
        if self.hostname.trim().is_empty() {
            return Err("hostname is empty".to_string());
        }
        if self.platform.trim().is_empty() {
            return Err(format!("device '{}' has an empty platform", self.hostname));
        }
        Ok(())
    }
}
