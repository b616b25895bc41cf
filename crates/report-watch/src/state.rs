//! Persisted publish timestamp of the last downloaded document.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::types::{FetchError, FetchResult, PublishTimestamp};

/// True when `candidate` should be downloaded given the last recorded publish.
///
/// No prior state means everything is new. Equal instants are not newer, so
/// re-running against an unchanged catalog never downloads twice.
pub fn is_newer(candidate: &PublishTimestamp, previous: Option<&PublishTimestamp>) -> bool {
    match previous {
        None => true,
        Some(prev) => candidate > prev,
    }
}

/// Single-value state file holding one timestamp string.
#[derive(Debug, Clone)]
pub struct PublicationState {
    path: PathBuf,
}

impl PublicationState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded timestamp. A missing file is `None`; unparsable
    /// contents are `CorruptState`, never silently ignored.
    pub fn read(&self) -> FetchResult<Option<PublishTimestamp>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(FetchError::Io(e)),
        };

        let contents = String::from_utf8(bytes).map_err(|e| FetchError::CorruptState {
            path: self.path.clone(),
            value: String::from_utf8_lossy(e.as_bytes()).trim().to_string(),
        })?;

        PublishTimestamp::parse(&contents)
            .map(Some)
            .ok_or_else(|| FetchError::CorruptState {
                path: self.path.clone(),
                value: contents.trim().to_string(),
            })
    }

    /// Replace the state with `published`.
    ///
    /// The value goes to a temporary file beside the target which is then
    /// renamed over it, so readers see either the old or the new timestamp.
    pub fn write(&self, published: &PublishTimestamp) -> FetchResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| state_write_error(&self.path, e))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(|e| state_write_error(&self.path, e))?;
        staged
            .write_all(published.as_str().as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| state_write_error(&self.path, e))?;
        staged
            .persist(&self.path)
            .map_err(|e| state_write_error(&self.path, e.error))?;

        tracing::debug!("Recorded publish timestamp {published} in {}", self.path.display());
        Ok(())
    }
}

fn state_write_error(path: &Path, e: std::io::Error) -> FetchError {
    FetchError::StateWrite(format!("{}: {e}", path.display()))
}
