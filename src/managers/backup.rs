//! Backup manager - orchestrates backups across a fleet of devices
//!
//! Devices are dispatched in input order onto a pool of at most
//! `max_workers` concurrent tasks. Each task succeeds or fails on its own;
//! results are collected in completion order into a [`RunSummary`].

use crate::device::DeviceDescriptor;
use crate::drivers::DriverRegistry;
use crate::error::{BackupError, OrchestratorError};
use crate::managers::report::{BackupResult, RunSummary};
use crate::managers::task::{BackupTask, HostClaims};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

pub struct BackupManager {
    registry: DriverRegistry,
    task: BackupTask,
    shutdown: Option<watch::Receiver<bool>>,
}

impl BackupManager {
    /// Create new backup manager
    pub fn new(registry: DriverRegistry, task: BackupTask) -> Self {
        Self {
            registry,
            task,
            shutdown: None,
        }
    }

    /// Stop dispatching new devices once the receiver reads `true`
    ///
    /// Tasks already running are left to finish or time out.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Check run preconditions without contacting any device
    pub fn validate(
        &self,
        devices: &[DeviceDescriptor],
        max_workers: usize,
    ) -> Result<(), OrchestratorError> {
        if max_workers == 0 {
            return Err(OrchestratorError::InvalidWorkerCount(max_workers));
        }

        let mut seen = HashSet::new();
        for device in devices {
            device.validate().map_err(OrchestratorError::InvalidDevice)?;

            if !seen.insert(device.hostname.as_str()) {
                return Err(OrchestratorError::DuplicateHostname(device.hostname.clone()));
            }

            if !self.registry.contains(&device.platform) {
                return Err(OrchestratorError::UnknownPlatform {
                    hostname: device.hostname.clone(),
                    platform: device.platform.clone(),
                });
            }
        }

        Ok(())
    }

    /// Back up every device, returning once all dispatched tasks have finished
    pub async fn run_backup(
        &self,
        devices: Vec<DeviceDescriptor>,
        max_workers: usize,
    ) -> Result<RunSummary, OrchestratorError> {
        self.validate(&devices, max_workers)?;

        info!(
            "Starting backup of {} device(s) with up to {} worker(s)",
            devices.len(),
            max_workers
        );

        let run_task = self.task.clone().with_claims(HostClaims::default());
        let mut summary = RunSummary::new();
        let mut pending = devices.into_iter();
        let mut running = JoinSet::new();
        let mut in_flight = HashMap::new();
        let mut interrupted = false;

        loop {
            while !interrupted && running.len() < max_workers {
                if self.shutdown_requested() {
                    warn!("Interrupt received, no further devices will be dispatched");
                    interrupted = true;
                    break;
                }

                let Some(device) = pending.next() else {
                    break;
                };

                // validate() has checked every platform
                let Some(driver) = self.registry.get(&device.platform) else {
                    summary.push(unfinished(
                        &device,
                        BackupError::Internal(format!(
                            "driver for platform '{}' disappeared after validation",
                            device.platform
                        )),
                    ));
                    continue;
                };

                let task = run_task.clone();
                let span = info_span!("backup", device = %device.hostname);
                let dispatched = device.clone();
                let handle = running.spawn(
                    async move { task.run(&dispatched, driver.as_ref()).await }.instrument(span),
                );
                in_flight.insert(handle.id(), device);
            }

            match running.join_next_with_id().await {
                Some(Ok((id, result))) => {
                    in_flight.remove(&id);
                    summary.push(result);
                }
                Some(Err(join_error)) => {
                    let Some(device) = in_flight.remove(&join_error.id()) else {
                        error!("Backup task failed with unknown id: {}", join_error);
                        continue;
                    };
                    error!("Backup task for {} aborted: {}", device.hostname, join_error);
                    summary.push(unfinished(
                        &device,
                        BackupError::Internal(format!("backup task aborted: {}", join_error)),
                    ));
                }
                None => break,
            }
        }

        for device in pending {
            summary.push(unfinished(
                &device,
                BackupError::Cancelled("run interrupted before this device was dispatched".to_string()),
            ));
        }

        summary.finish();

        info!(
            "Backup summary: {} succeeded, {} failed, {} changed",
            summary.succeeded, summary.failed, summary.changes_detected
        );

        Ok(summary)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }
}

fn unfinished(device: &DeviceDescriptor, error: BackupError) -> BackupResult {
    BackupResult::failure(
        device.hostname.clone(),
        device.hostname.clone(),
        device.platform.clone(),
        error,
        Utc::now(),
    )
}
