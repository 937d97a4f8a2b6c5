//! Advisory per-group lock so concurrent invocations fail fast.
//!
//! Lock file path: `<var_dir>/<state_file>.lock`. The file is left in place;
//! only the `fs2` lock on it matters. Released on drop.

use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the handle releases the lock anyway.
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| Error::Persistence {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| Error::Persistence {
            path: path.to_path_buf(),
            source,
        })
}

/// Take the exclusive lock without blocking. Returns [`Error::Locked`] when
/// another handle already holds it.
pub fn try_lock_exclusive(path: &Path, group: &str) -> Result<LockGuard> {
    let file = open_lock_file(path)?;
    if let Err(e) = file.try_lock_exclusive() {
        if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
            return Err(Error::Locked {
                group: group.to_string(),
                path: path.to_path_buf(),
            });
        }
        return Err(Error::Persistence {
            path: path.to_path_buf(),
            source: e,
        });
    }
    tracing::trace!(path = %path.display(), "acquired group lock");
    Ok(LockGuard {
        file,
        path: path.to_path_buf(),
    })
}
