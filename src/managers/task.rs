//! Backup task - one backup attempt for one device
//!
//! A task never returns an error: every failure is captured in the
//! [`BackupResult`]. Within a task the order is strictly open, retrieve,
//! close, persist. Each driver call is bounded by the operation timeout and
//! the session is closed exactly once on every path after a successful open.

use crate::device::DeviceDescriptor;
use crate::drivers::{DeviceConfig, DeviceDriver, DriverSession, Facts};
use crate::error::BackupError;
use crate::managers::artifacts::{ArtifactKind, ArtifactStore, StorageError};
use crate::managers::report::BackupResult;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Executes single-device backups against a shared artifact store
#[derive(Debug, Clone)]
pub struct BackupTask {
    store: Arc<ArtifactStore>,
    operation_timeout: Duration,
    keep_last: Option<usize>,
    claims: Option<HostClaims>,
}

/// Reported hostnames persisted during one run, each mapped to the inventory
/// hostname that wrote it
///
/// Two inventory entries reporting the same hostname would share a device
/// directory and prune each other's artifacts, so only the first may persist.
#[derive(Debug, Clone, Default)]
pub struct HostClaims {
    claimed: Arc<Mutex<HashMap<String, String>>>,
}

impl HostClaims {
    /// Claim `reported` for `inventory`, returning the current owner on conflict
    pub fn claim(&self, reported: &str, inventory: &str) -> Result<(), String> {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let owner = claimed
            .entry(reported.to_string())
            .or_insert_with(|| inventory.to_string());
        if owner == inventory {
            Ok(())
        } else {
            Err(owner.clone())
        }
    }
}

/// What a successful persist produced
struct Persisted {
    paths: Vec<PathBuf>,
    bytes: u64,
    config_changed: bool,
}

impl BackupTask {
    pub fn new(store: Arc<ArtifactStore>, operation_timeout: Duration) -> Self {
        Self {
            store,
            operation_timeout,
            keep_last: None,
            claims: None,
        }
    }

    /// Keep only the newest `keep_last` artifacts per kind after each backup
    pub fn with_retention(mut self, keep_last: Option<usize>) -> Self {
        self.keep_last = keep_last;
        self
    }

    /// Refuse to persist a reported hostname already claimed by another device
    pub fn with_claims(mut self, claims: HostClaims) -> Self {
        self.claims = Some(claims);
        self
    }

    /// Back up one device
    pub async fn run(&self, device: &DeviceDescriptor, driver: &dyn DeviceDriver) -> BackupResult {
        let started_at = Utc::now();
        let failure = |hostname: &str, error: BackupError| {
            warn!("Backup of {} failed: {}", device.hostname, error);
            BackupResult::failure(
                hostname.to_string(),
                device.hostname.clone(),
                device.platform.clone(),
                error,
                started_at,
            )
        };

        info!("Starting backup for {} ({})", device.hostname, device.platform);

        let mut session = match timeout(self.operation_timeout, driver.open(device)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return failure(&device.hostname, BackupError::Connection(e.to_string())),
            Err(_) => {
                return failure(
                    &device.hostname,
                    BackupError::Connection(format!(
                        "timed out after {:?} opening session",
                        self.operation_timeout
                    )),
                )
            }
        };

        let retrieved = self.retrieve(session.as_mut()).await;
        self.close(session.as_mut(), &device.hostname).await;

        let (config, facts) = match retrieved {
            Ok(data) => data,
            Err(e) => return failure(&device.hostname, e),
        };

        // retrieve() guarantees the hostname is present
        let hostname = facts.hostname().unwrap_or(&device.hostname).to_string();
        if hostname != device.hostname {
            debug!(
                "Device {} reports hostname '{}', keying artifacts by it",
                device.hostname, hostname
            );
        }

        if let Some(ref claims) = self.claims {
            if let Err(owner) = claims.claim(&hostname, &device.hostname) {
                return failure(
                    &device.hostname,
                    BackupError::Storage(format!(
                        "reported hostname '{}' was already backed up from {} in this run",
                        hostname, owner
                    )),
                );
            }
        }

        match self.persist(&hostname, config, facts).await {
            Ok(persisted) => {
                let result = BackupResult::success(
                    hostname,
                    device.hostname.clone(),
                    device.platform.clone(),
                    persisted.paths,
                    persisted.bytes,
                    persisted.config_changed,
                    started_at,
                );
                info!(
                    "Backup of {} completed in {:.1}s: {} artifact(s){}",
                    result.hostname,
                    result.duration_secs(),
                    result.artifacts.len(),
                    if result.config_changed { ", configuration changed" } else { "" }
                );
                result
            }
            Err(e) => failure(&hostname, e),
        }
    }

    /// Fetch config then facts, each bounded by the operation timeout
    async fn retrieve(
        &self,
        session: &mut dyn DriverSession,
    ) -> Result<(DeviceConfig, Facts), BackupError> {
        let config = match timeout(self.operation_timeout, session.get_config()).await {
            Ok(Ok(config)) => config,
            Ok(Err(e)) => return Err(BackupError::Retrieval(format!("config: {}", e))),
            Err(_) => {
                return Err(BackupError::Retrieval(format!(
                    "config: timed out after {:?}",
                    self.operation_timeout
                )))
            }
        };

        let facts = match timeout(self.operation_timeout, session.get_facts()).await {
            Ok(Ok(facts)) => facts,
            Ok(Err(e)) => return Err(BackupError::Retrieval(format!("facts: {}", e))),
            Err(_) => {
                return Err(BackupError::Retrieval(format!(
                    "facts: timed out after {:?}",
                    self.operation_timeout
                )))
            }
        };

        if facts.hostname().is_none() {
            return Err(BackupError::Retrieval(
                "facts: no hostname reported".to_string(),
            ));
        }

        Ok((config, facts))
    }

    async fn close(&self, session: &mut dyn DriverSession, hostname: &str) {
        if timeout(self.operation_timeout, session.close()).await.is_err() {
            warn!(
                "Closing session to {} timed out after {:?}",
                hostname, self.operation_timeout
            );
        }
    }

    /// Write artifacts on the blocking pool
    async fn persist(
        &self,
        hostname: &str,
        config: DeviceConfig,
        facts: Facts,
    ) -> Result<Persisted, BackupError> {
        let store = Arc::clone(&self.store);
        let keep_last = self.keep_last;
        let host = hostname.to_string();

        let joined = tokio::task::spawn_blocking(move || {
            persist_all(&store, &host, &config, &facts, keep_last)
        })
        .await;

        match joined {
            Ok(Ok(persisted)) => Ok(persisted),
            Ok(Err(e)) => Err(BackupError::Storage(e.to_string())),
            Err(e) => Err(BackupError::Internal(format!("persist task failed: {}", e))),
        }
    }
}

fn persist_all(
    store: &ArtifactStore,
    hostname: &str,
    config: &DeviceConfig,
    facts: &Facts,
    keep_last: Option<usize>,
) -> Result<Persisted, StorageError> {
    let mut paths = Vec::with_capacity(4);
    let mut kinds = Vec::with_capacity(3);

    let running = store.persist(hostname, ArtifactKind::Running, &config.running)?;
    let config_changed = running.changed;
    let mut bytes = running.bytes;
    paths.push(running.path);
    paths.extend(running.diff);
    kinds.push(ArtifactKind::Running);

    match config.startup_text() {
        Some(startup) => {
            let startup = store.persist(hostname, ArtifactKind::Startup, startup)?;
            bytes += startup.bytes;
            paths.push(startup.path);
            kinds.push(ArtifactKind::Startup);
        }
        None => debug!("No startup configuration for {}, skipping", hostname),
    }

    let facts = store.persist_facts(hostname, facts)?;
    bytes += facts.bytes;
    paths.push(facts.path);
    kinds.push(ArtifactKind::Facts);

    if let Some(keep) = keep_last {
        for kind in kinds {
            match store.prune(hostname, kind, keep) {
                Ok(removed) if !removed.is_empty() => {
                    debug!("Pruned {} old {} artifact(s) for {}", removed.len(), kind.as_str(), hostname)
                }
                Ok(_) => {}
                Err(e) => warn!("Retention for {} {} failed: {}", hostname, kind.as_str(), e),
            }
        }
    }

    Ok(Persisted {
        paths,
        bytes,
        config_changed,
    })
}
