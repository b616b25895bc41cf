//! Lock file that keeps two runs from touching the same state at once.
//!
//! The lock is an OS advisory lock on the file, not the file's existence.
//! The kernel drops it when the holding process exits, however it exits, so
//! a run killed mid-way never blocks the next one. The file itself stays in
//! place between runs.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::types::{FetchError, FetchResult};

/// Held for the duration of a run; the lock is released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// Lock `path`, failing with `Locked` if a live process holds it.
    pub fn acquire(path: &Path) -> FetchResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(FetchError::Locked(path.to_path_buf()));
            }
            return Err(FetchError::Io(e));
        }

        // The pid is informational only.
        if file.set_len(0).is_ok() {
            let _ = writeln!(file, "{}", std::process::id());
        }
        tracing::debug!("Acquired run lock {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::error!("Failed to release run lock {}: {e}", self.path.display());
        }
    }
}
