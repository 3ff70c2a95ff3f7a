//! Backup results and run summaries

use crate::error::BackupError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Success,
    Failure,
}

/// Outcome of one device's backup attempt
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    /// Device-reported hostname when known, otherwise the inventory hostname
    pub hostname: String,
    /// Hostname the device was reached at
    pub inventory_hostname: String,
    pub platform: String,
    pub status: BackupStatus,
    /// Artifact paths written; empty on failure
    pub artifacts: Vec<PathBuf>,
    /// Size of the configuration and facts artifacts
    pub bytes_written: u64,
    /// Present iff `status` is `Failure`
    pub error: Option<BackupError>,
    /// Running config differs from the previous backup
    pub config_changed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BackupResult {
    pub fn success(
        hostname: String,
        inventory_hostname: String,
        platform: String,
        artifacts: Vec<PathBuf>,
        bytes_written: u64,
        config_changed: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            hostname,
            inventory_hostname,
            platform,
            status: BackupStatus::Success,
            artifacts,
            bytes_written,
            error: None,
            config_changed,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        hostname: String,
        inventory_hostname: String,
        platform: String,
        error: BackupError,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            hostname,
            inventory_hostname,
            platform,
            status: BackupStatus::Failure,
            artifacts: Vec::new(),
            bytes_written: 0,
            error: Some(error),
            config_changed: false,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BackupStatus::Success
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// One failed device in a run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDevice {
    pub hostname: String,
    pub category: String,
    pub message: String,
}

/// Aggregate of a batch run, built as results arrive
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub changes_detected: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// In completion order
    pub results: Vec<BackupResult>,
    pub errors: Vec<FailedDevice>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            changes_detected: 0,
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record one completed result
    pub fn push(&mut self, result: BackupResult) {
        self.total += 1;
        if result.is_success() {
            self.succeeded += 1;
            if result.config_changed {
                self.changes_detected += 1;
            }
        } else {
            self.failed += 1;
            if let Some(ref error) = result.error {
                self.errors.push(FailedDevice {
                    hostname: result.hostname.clone(),
                    category: error.category().to_string(),
                    message: error.message().to_string(),
                });
            }
        }
        self.results.push(result);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// True when no device failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Results whose running config changed since the previous backup
    pub fn changed_devices(&self) -> impl Iterator<Item = &BackupResult> {
        self.results
            .iter()
            .filter(|r| r.is_success() && r.config_changed)
    }

    /// Human-readable summary for the console
    pub fn render(&self) -> String {
        let rule = "=".repeat(70);
        let mut out = String::new();

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Backup Summary");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Devices total:      {}", self.total);
        let _ = writeln!(out, "Devices backed up:  {}", self.succeeded);
        let _ = writeln!(out, "Devices failed:     {}", self.failed);
        let _ = writeln!(out, "Changes detected:   {}", self.changes_detected);

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\nFailed devices:");
            for failure in &self.errors {
                let _ = writeln!(
                    out,
                    "  ✗ {} [{}] {}",
                    failure.hostname, failure.category, failure.message
                );
            }
        }

        if self.changes_detected > 0 {
            let _ = writeln!(out, "\nDevices with configuration changes:");
            for result in self.changed_devices() {
                if result.hostname == result.inventory_hostname {
                    let _ = writeln!(out, "  - {}", result.hostname);
                } else {
                    let _ = writeln!(out, "  - {} ({})", result.hostname, result.inventory_hostname);
                }
            }
        }

        out
    }
}
