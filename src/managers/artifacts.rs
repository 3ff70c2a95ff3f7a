//! Artifact store - timestamped, "latest"-aliased persistence of device backups
//!
//! Layout under the backup root:
//!
//! ```text
//! {root}/{hostname}/{hostname}_{kind}_{YYYYmmdd_HHMMSS}[_NN].{ext}
//! {root}/{hostname}/{hostname}_{kind}_latest.{ext}   -> newest artifact of that kind
//! {root}/{hostname}/{hostname}_running_{YYYYmmdd_HHMMSS}[_NN].diff   when the config changed
//! {root}/backup_report_{YYYYmmdd_HHMMSS}[_NN].json
//! ```
//!
//! Timestamps are UTC with fixed width, so file name order is chronological
//! order. Artifact files are created exclusively and fully written before the
//! alias is repointed; the alias swap is a rename, which is atomic.

use crate::drivers::Facts;
use chrono::{DateTime, Utc};
use serde::Serialize;
use similar::TextDiff;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// File name timestamp format (second granularity)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Extension of the change diffs written beside running configs
pub const DIFF_EXTENSION: &str = "diff";

/// How many disambiguating suffixes to try for one timestamp
const MAX_COLLISION_SUFFIX: u32 = 99;

static ALIAS_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Kind of persisted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Running,
    Startup,
    Facts,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Running => "running",
            ArtifactKind::Startup => "startup",
            ArtifactKind::Facts => "facts",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Running | ArtifactKind::Startup => "cfg",
            ArtifactKind::Facts => "json",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("hostname {0:?} cannot be used as an artifact path")]
    InvalidHostname(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path collision unresolved for {0:?} after {1} attempts")]
    Collision(PathBuf, u32),

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A freshly written artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub bytes: u64,
    /// Content differs from the previous artifact of the same kind
    pub changed: bool,
    /// Unified diff against the previous running config, when it changed
    pub diff: Option<PathBuf>,
}

/// Filesystem-backed artifact store rooted at the configured backup directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one device's artifacts
    pub fn device_dir(&self, hostname: &str) -> Result<PathBuf, StorageError> {
        validate_hostname(hostname)?;
        Ok(self.root.join(hostname))
    }

    /// Path of the "latest" alias for a device and kind
    pub fn latest_alias(&self, hostname: &str, kind: ArtifactKind) -> Result<PathBuf, StorageError> {
        Ok(self.device_dir(hostname)?.join(alias_name(hostname, kind)))
    }

    /// Persist content with the current time as its timestamp
    pub fn persist(
        &self,
        hostname: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<PersistedArtifact, StorageError> {
        self.persist_at(hostname, kind, content, Utc::now())
    }

    /// Persist facts as pretty, key-ordered JSON
    pub fn persist_facts(&self, hostname: &str, facts: &Facts) -> Result<PersistedArtifact, StorageError> {
        let mut json = serde_json::to_string_pretty(facts)?;
        json.push('\n');
        self.persist(hostname, ArtifactKind::Facts, &json)
    }

    /// Persist content under an explicit timestamp
    ///
    /// A running config that differs from the previous one also gets a
    /// unified diff written next to it, named after the new artifact.
    pub fn persist_at(
        &self,
        hostname: &str,
        kind: ArtifactKind,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<PersistedArtifact, StorageError> {
        let dir = self.device_dir(hostname)?;
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;

        let previous = self.list(hostname, kind)?.pop();

        let stem = format!("{}_{}_{}", hostname, kind.as_str(), at.format(TIMESTAMP_FORMAT));
        let path = write_exclusive(&dir, &stem, kind.extension(), content.as_bytes())?;

        let mut changed = false;
        let mut diff = None;
        if let Some(ref prev) = previous {
            match fs::read(prev) {
                Ok(old) if old == content.as_bytes() => {}
                Ok(old) => {
                    changed = true;
                    if kind == ArtifactKind::Running {
                        let old = String::from_utf8_lossy(&old);
                        diff = Some(write_diff(&dir, prev, &path, &old, content)?);
                    }
                }
                Err(e) => {
                    warn!("Could not read previous artifact {:?}: {}", prev, e);
                    changed = true;
                }
            }
        }

        update_alias(&dir, &path, &alias_name(hostname, kind))?;

        info!("Stored {} artifact for {}: {:?}", kind.as_str(), hostname, path);

        Ok(PersistedArtifact {
            kind,
            path,
            bytes: content.len() as u64,
            changed,
            diff,
        })
    }

    /// Timestamped artifacts of a kind for a device, oldest first
    pub fn list(&self, hostname: &str, kind: ArtifactKind) -> Result<Vec<PathBuf>, StorageError> {
        let dir = self.device_dir(hostname)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}_{}_", hostname, kind.as_str());
        let suffix = format!(".{}", kind.extension());
        let alias = alias_name(hostname, kind);

        let mut names: Vec<String> = fs::read_dir(&dir)
            .map_err(io_err(&dir))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(&suffix) && *name != alias)
            .collect();
        names.sort();

        Ok(names.into_iter().map(|name| dir.join(name)).collect())
    }

    /// Artifact the "latest" alias currently points to
    pub fn resolve_latest(&self, hostname: &str, kind: ArtifactKind) -> Option<PathBuf> {
        let alias = self.latest_alias(hostname, kind).ok()?;
        read_alias(&alias)
    }

    /// Delete the oldest artifacts beyond `keep`, never the alias target
    pub fn prune(
        &self,
        hostname: &str,
        kind: ArtifactKind,
        keep: usize,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let artifacts = self.list(hostname, kind)?;
        if artifacts.len() <= keep {
            return Ok(Vec::new());
        }

        let latest = self.resolve_latest(hostname, kind);
        let excess = artifacts.len() - keep;
        let mut removed = Vec::new();

        for path in artifacts.into_iter() {
            if removed.len() == excess {
                break;
            }
            if latest.as_ref() == Some(&path) {
                continue;
            }
            fs::remove_file(&path).map_err(io_err(&path))?;
            let diff = path.with_extension(DIFF_EXTENSION);
            if diff.exists() {
                fs::remove_file(&diff).map_err(io_err(&diff))?;
            }
            debug!("Pruned old artifact {:?}", path);
            removed.push(path);
        }

        Ok(removed)
    }

    /// Write a JSON run report into the backup root
    pub fn write_report<T: Serialize>(&self, report: &T) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;

        let mut json = serde_json::to_string_pretty(report)?;
        json.push('\n');

        let stem = format!("backup_report_{}", Utc::now().format(TIMESTAMP_FORMAT));
        write_exclusive(&self.root, &stem, "json", json.as_bytes())
    }
}

fn alias_name(hostname: &str, kind: ArtifactKind) -> String {
    format!("{}_{}_latest.{}", hostname, kind.as_str(), kind.extension())
}

#[cfg(unix)]
fn read_alias(alias: &Path) -> Option<PathBuf> {
    let target = fs::read_link(alias).ok()?;
    Some(alias.parent()?.join(target))
}

#[cfg(not(unix))]
fn read_alias(alias: &Path) -> Option<PathBuf> {
    alias.exists().then(|| alias.to_path_buf())
}

fn validate_hostname(hostname: &str) -> Result<(), StorageError> {
    let invalid = hostname.is_empty()
        || hostname == "."
        || hostname == ".."
        || hostname.starts_with('.')
        || hostname
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());

    if invalid {
        return Err(StorageError::InvalidHostname(hostname.to_string()));
    }
    Ok(())
}

/// Create `{stem}.{ext}` (or `{stem}_NN.{ext}` if taken) and write it fully
fn write_exclusive(dir: &Path, stem: &str, ext: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
    for attempt in 0..=MAX_COLLISION_SUFFIX {
        let name = if attempt == 0 {
            format!("{}.{}", stem, ext)
        } else {
            format!("{}_{:02}.{}", stem, attempt, ext)
        };
        let path = dir.join(name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Artifact path {:?} exists, trying next suffix", path);
                continue;
            }
            Err(e) => return Err(io_err(&path)(e)),
        };

        if let Err(e) = file.write_all(content).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(io_err(&path)(e));
        }

        return Ok(path);
    }

    Err(StorageError::Collision(
        dir.join(format!("{}.{}", stem, ext)),
        MAX_COLLISION_SUFFIX + 1,
    ))
}

/// Write `{new artifact stem}.diff` describing `previous` -> `current`
fn write_diff(
    dir: &Path,
    previous: &Path,
    current: &Path,
    old: &str,
    new: &str,
) -> Result<PathBuf, StorageError> {
    let from = file_name(previous);
    let to = file_name(current);
    let text = TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&from, &to)
        .to_string();

    let stem = current
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(to);
    write_exclusive(dir, &stem, DIFF_EXTENSION, text.as_bytes())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Atomically repoint `alias` at `target` (which lives in `dir`)
fn update_alias(dir: &Path, target: &Path, alias: &str) -> Result<(), StorageError> {
    let tmp = dir.join(format!(
        ".{}.{}.{}.tmp",
        alias,
        std::process::id(),
        ALIAS_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    #[cfg(unix)]
    {
        let file_name = target.file_name().unwrap_or(target.as_os_str());
        std::os::unix::fs::symlink(file_name, &tmp).map_err(io_err(&tmp))?;
    }

    #[cfg(not(unix))]
    {
        fs::copy(target, &tmp).map_err(io_err(&tmp))?;
    }

    let alias_path = dir.join(alias);
    if let Err(e) = fs::rename(&tmp, &alias_path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&alias_path)(e));
    }

    Ok(())
}
