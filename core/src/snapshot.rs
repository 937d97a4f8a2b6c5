//! Persisted record of which group modules were enabled before a bulk disable.
//!
//! Format: `<var_dir>/<state_file>`
//! ```json
//! {
//!   "timestamp": "2026-10-18 12:00:00",
//!   "enabled_modules": ["Swissup_Core", "Swissup_Tm"]
//! }
//! ```
//! Writes go through `<state_file>.tmp` + rename, so a reader sees either the
//! previous file or the new one. Each session holds the group lock.

use crate::group::ModuleGroup;
use crate::lock::{self, LockGuard};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    /// Local capture time. Older files may lack it.
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<String>,
    pub enabled_modules: Vec<String>,
}

impl ModuleSnapshot {
    fn now(enabled_modules: Vec<String>) -> Self {
        Self {
            taken_at: Some(chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()),
            enabled_modules,
        }
    }

    pub fn taken_at_display(&self) -> &str {
        self.taken_at.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// No module was enabled; nothing was written.
    NothingToCapture,
    Written { path: PathBuf, snapshot: ModuleSnapshot },
}

/// The restore succeeded but the snapshot file could not be removed.
#[derive(Debug, thiserror::Error)]
#[error("could not remove snapshot {path}: {source}")]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Snapshot files for every group, rooted at the var directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, group: &ModuleGroup) -> PathBuf {
        self.dir.join(&group.state_file)
    }

    fn lock_path_for(&self, group: &ModuleGroup) -> PathBuf {
        self.dir.join(format!("{}.lock", group.state_file))
    }

    /// Lock the group's snapshot for a sequence of operations.
    pub fn session<'g>(&self, group: &'g ModuleGroup) -> Result<SnapshotSession<'g>> {
        let guard = lock::try_lock_exclusive(&self.lock_path_for(group), &group.name)?;
        Ok(SnapshotSession {
            group,
            path: self.path_for(group),
            _guard: guard,
        })
    }

    /// Lock the group and persist `enabled` as its snapshot.
    /// See [`SnapshotSession::capture`].
    pub fn capture(&self, group: &ModuleGroup, enabled: &[String]) -> Result<CaptureOutcome> {
        self.session(group)?.capture(enabled)
    }

    /// Lock the group and read its snapshot.
    ///
    /// Fails with `NotFound` when no snapshot exists and `CorruptSnapshot`
    /// when the file does not parse; a broken file never reads as empty.
    pub fn load(&self, group: &ModuleGroup) -> Result<ModuleSnapshot> {
        self.session(group)?.load()
    }

    /// Lock the group and remove its snapshot.
    ///
    /// The outer error is a lock failure. The inner one means the file is
    /// still there after a removal attempt.
    pub fn discard(&self, group: &ModuleGroup) -> Result<std::result::Result<(), CleanupWarning>> {
        Ok(self.session(group)?.discard())
    }

    /// Presence check without locking or parsing.
    pub fn exists(&self, group: &ModuleGroup) -> bool {
        self.path_for(group).is_file()
    }
}

/// Exclusive access to one group's snapshot; the lock is released on drop.
#[derive(Debug)]
pub struct SnapshotSession<'g> {
    group: &'g ModuleGroup,
    path: PathBuf,
    _guard: LockGuard,
}

impl SnapshotSession<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `enabled` as the group's snapshot, replacing any previous one.
    ///
    /// Duplicates are dropped keeping the first occurrence. Names outside the
    /// group are ignored. An empty list writes nothing.
    pub fn capture(&self, enabled: &[String]) -> Result<CaptureOutcome> {
        let mut seen = HashSet::new();
        let mut modules = Vec::with_capacity(enabled.len());
        for name in enabled {
            if !self.group.contains(name) {
                tracing::warn!(group = %self.group.name, module = %name, "skipping module outside group");
                continue;
            }
            if seen.insert(name.as_str()) {
                modules.push(name.clone());
            }
        }
        if modules.is_empty() {
            tracing::debug!(group = %self.group.name, "nothing to capture");
            return Ok(CaptureOutcome::NothingToCapture);
        }

        let snapshot = ModuleSnapshot::now(modules);
        write_atomic(&self.path, &snapshot)?;
        tracing::info!(
            group = %self.group.name,
            path = %self.path.display(),
            count = snapshot.enabled_modules.len(),
            "snapshot saved"
        );
        Ok(CaptureOutcome::Written {
            path: self.path.clone(),
            snapshot,
        })
    }

    pub fn load(&self) -> Result<ModuleSnapshot> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    group: self.group.name.clone(),
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(Error::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let snapshot: ModuleSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| Error::CorruptSnapshot {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(
            group = %self.group.name,
            count = snapshot.enabled_modules.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Remove the snapshot. A missing file counts as removed.
    pub fn discard(&self) -> std::result::Result<(), CleanupWarning> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(group = %self.group.name, path = %self.path.display(), "snapshot removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                tracing::warn!(group = %self.group.name, error = %source, "snapshot cleanup failed");
                Err(CleanupWarning {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }
}

fn write_atomic(path: &Path, snapshot: &ModuleSnapshot) -> Result<()> {
    let persistence = |p: &Path| {
        let p = p.to_path_buf();
        move |source| Error::Persistence { path: p, source }
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(persistence(dir))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut data = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| persistence(path)(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    data.push(b'\n');

    let written = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp)
        .map_err(persistence(&tmp))
        .and_then(|mut f| {
            f.write_all(&data).map_err(persistence(&tmp))?;
            f.sync_all().map_err(persistence(&tmp))
        })
        .and_then(|()| fs::rename(&tmp, path).map_err(persistence(path)));
    if let Err(e) = written {
        // Never leave a half-written temp file next to the snapshot.
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    sync_dir(dir);
    Ok(())
}

/// Flush the directory entry so the rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
