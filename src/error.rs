//! Error taxonomy for backup runs
//!
//! Per-device failures are captured as [`BackupError`] values inside results
//! and never abort a batch. [`OrchestratorError`] covers the precondition
//! violations that abort a run before any device is contacted.

use serde::Serialize;

/// Why a single device backup failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "category", content = "message", rename_all = "lowercase")]
pub enum BackupError {
    /// Session could not be established (unreachable, auth, timeout before open)
    #[error("connection failed: {0}")]
    Connection(String),

    /// Session opened but fetching config or facts failed
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// Device answered but the artifacts could not be stored locally
    #[error("storage failed: {0}")]
    Storage(String),

    /// The backup task itself panicked
    #[error("internal error: {0}")]
    Internal(String),

    /// The run was interrupted before this device was dispatched
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl BackupError {
    /// Stable category name used in reports
    pub fn category(&self) -> &'static str {
        match self {
            BackupError::Connection(_) => "connection",
            BackupError::Retrieval(_) => "retrieval",
            BackupError::Storage(_) => "storage",
            BackupError::Internal(_) => "internal",
            BackupError::Cancelled(_) => "cancelled",
        }
    }

    /// The message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            BackupError::Connection(m)
            | BackupError::Retrieval(m)
            | BackupError::Storage(m)
            | BackupError::Internal(m)
            | BackupError::Cancelled(m) => m,
        }
    }
}

/// Fatal errors raised before a run dispatches any device
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("max_workers must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    #[error("invalid device descriptor: {0}")]
    InvalidDevice(String),

    #[error("duplicate hostname in device list: {0}")]
    DuplicateHostname(String),

    #[error("no driver registered for platform '{platform}' (device '{hostname}')")]
    UnknownPlatform { hostname: String, platform: String },
}
