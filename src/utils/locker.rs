//! File-based locking to prevent concurrent runs against one backup root

use anyhow::{Context, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOCK_FILE_NAME: &str = ".netcfg-backup.lock";

/// Lock file for a backup root
///
/// Open it once, then hold the guard from [`RunLock::try_acquire`] for the
/// duration of the run.
pub struct RunLock {
    lock: RwLock<File>,
    lock_path: PathBuf,
}

impl RunLock {
    /// Open (creating if needed) the lock file inside `backup_root`
    pub fn open(backup_root: &Path) -> Result<Self> {
        std::fs::create_dir_all(backup_root)
            .with_context(|| format!("Failed to create backup root: {:?}", backup_root))?;

        let lock_path = backup_root.join(LOCK_FILE_NAME);
        debug!("Opening run lock: {:?}", lock_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        Ok(Self {
            lock: RwLock::new(file),
            lock_path,
        })
    }

    /// Take the exclusive lock, failing immediately if another run holds it
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        let guard = self.lock.try_write().with_context(|| {
            format!(
                "Another backup run is already using this backup root (lock held: {:?})",
                self.lock_path
            )
        })?;

        info!("Acquired run lock: {:?}", self.lock_path);
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}
