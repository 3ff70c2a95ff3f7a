//! Mock driver for testing that records sessions and returns configured responses
//! Available for use in external test crates

use super::{DeviceConfig, DeviceDriver, DriverError, DriverSession, Facts};
use crate::device::DeviceDescriptor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a mocked device behaves
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    /// Fail `open` with this error
    pub open_error: Option<DriverError>,
    /// Never return from `open`
    pub hang_on_open: bool,
    pub config_error: Option<DriverError>,
    /// Never return from `get_config`
    pub hang_on_config: bool,
    pub facts_error: Option<DriverError>,
    /// Hostname the device reports in its facts (defaults to the descriptor's)
    pub reported_hostname: Option<String>,
    /// Running config text (defaults to a generated config)
    pub running: Option<String>,
    /// Startup config text; `None` means the device has none
    pub startup: Option<String>,
    /// Latency added to `get_config`
    pub delay: Option<Duration>,
}

/// Per-host session counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCounts {
    /// Calls to `open`, successful or not
    pub attempts: usize,
    /// Sessions actually opened
    pub opens: usize,
    pub closes: usize,
}

#[derive(Default)]
struct MockState {
    devices: Mutex<HashMap<String, MockDevice>>,
    counts: Mutex<HashMap<String, SessionCounts>>,
    open_now: AtomicUsize,
    max_open: AtomicUsize,
}

/// Mock device driver
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
    default_delay: Option<Duration>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add latency to every device's `get_config` unless overridden
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Configure the behavior of one device
    pub fn device(self, hostname: &str, device: MockDevice) -> Self {
        self.state
            .devices
            .lock()
            .unwrap()
            .insert(hostname.to_string(), device);
        self
    }

    pub fn unreachable(self, hostname: &str) -> Self {
        self.device(
            hostname,
            MockDevice {
                open_error: Some(DriverError::Unreachable(format!("no route to {}", hostname))),
                ..Default::default()
            },
        )
    }

    pub fn failing_config(self, hostname: &str) -> Self {
        self.device(
            hostname,
            MockDevice {
                config_error: Some(DriverError::Command("% Invalid input detected".to_string())),
                ..Default::default()
            },
        )
    }

    pub fn failing_facts(self, hostname: &str) -> Self {
        self.device(
            hostname,
            MockDevice {
                facts_error: Some(DriverError::MalformedResponse("garbled output".to_string())),
                ..Default::default()
            },
        )
    }

    pub fn with_startup(self, hostname: &str, startup: &str) -> Self {
        self.device(
            hostname,
            MockDevice {
                startup: Some(startup.to_string()),
                ..Default::default()
            },
        )
    }

    /// Number of sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.state.open_now.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were open at the same time
    pub fn max_concurrent_sessions(&self) -> usize {
        self.state.max_open.load(Ordering::SeqCst)
    }

    /// Session counters for one host
    pub fn counts(&self, hostname: &str) -> SessionCounts {
        self.state
            .counts
            .lock()
            .unwrap()
            .get(hostname)
            .cloned()
            .unwrap_or_default()
    }

    /// Total `open` attempts across all hosts
    pub fn total_attempts(&self) -> usize {
        self.state.counts.lock().unwrap().values().map(|c| c.attempts).sum()
    }

    fn behavior(&self, hostname: &str) -> MockDevice {
        self.state
            .devices
            .lock()
            .unwrap()
            .get(hostname)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeviceDriver for MockDriver {
    async fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn DriverSession>, DriverError> {
        let behavior = self.behavior(&device.hostname);

        self.state
            .counts
            .lock()
            .unwrap()
            .entry(device.hostname.clone())
            .or_default()
            .attempts += 1;

        if behavior.hang_on_open {
            std::future::pending::<()>().await;
        }
        if let Some(err) = behavior.open_error.clone() {
            return Err(err);
        }

        self.state
            .counts
            .lock()
            .unwrap()
            .entry(device.hostname.clone())
            .or_default()
            .opens += 1;
        let now = self.state.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_open.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            hostname: device.hostname.clone(),
            behavior,
            default_delay: self.default_delay,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSession {
    hostname: String,
    behavior: MockDevice,
    default_delay: Option<Duration>,
    state: Arc<MockState>,
    closed: bool,
}

#[async_trait]
impl DriverSession for MockSession {
    async fn get_config(&mut self) -> Result<DeviceConfig, DriverError> {
        if let Some(delay) = self.behavior.delay.or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        if self.behavior.hang_on_config {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.behavior.config_error.clone() {
            return Err(err);
        }

        let running = self.behavior.running.clone().unwrap_or_else(|| {
            format!("hostname {}\n!\ninterface Loopback0\n!\nend\n", self.hostname)
        });

        Ok(DeviceConfig {
            running,
            startup: self.behavior.startup.clone(),
        })
    }

    async fn get_facts(&mut self) -> Result<Facts, DriverError> {
        if let Some(err) = self.behavior.facts_error.clone() {
            return Err(err);
        }

        let hostname = self
            .behavior
            .reported_hostname
            .clone()
            .unwrap_or_else(|| self.hostname.clone());

        Ok(Facts::new()
            .with("hostname", hostname)
            .with("vendor", "mock")
            .with("uptime_seconds", 3600))
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.open_now.fetch_sub(1, Ordering::SeqCst);
        }
        self.state
            .counts
            .lock()
            .unwrap()
            .entry(self.hostname.clone())
            .or_default()
            .closes += 1;
    }
}
