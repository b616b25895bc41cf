//! One check-and-download pass.
//!
//! A run walks the stages in a fixed order and never loops back:
//!
//! ```text
//! AcquiringLock -> ResolvingParameter -> FetchingCatalog -> ComparingTimestamp
//!     -> Downloading -> PersistingState
//! ```
//!
//! `ComparingTimestamp` may end the run early as `SkippedNotNewer`. Any error
//! ends it as `Failed` at the stage where it happened. The artifact is fully
//! stored before the state file is touched, so a failed download leaves the
//! state exactly as it was and the next run retries the same document.

use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::catalog::DocumentCatalogClient;
use crate::config::FetchConfig;
use crate::lock::RunLock;
use crate::resolver;
use crate::state::{is_newer, PublicationState};
use crate::transport::Transport;
use crate::types::{
    DocumentDescriptor, FetchError, FetchResult, ParameterSource, PublishTimestamp,
    ResolvedParameter,
};

/// Stage of the run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    AcquiringLock,
    ResolvingParameter,
    FetchingCatalog,
    ComparingTimestamp,
    Downloading,
    PersistingState,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::AcquiringLock => "acquiring run lock",
            RunStage::ResolvingParameter => "resolving Report Type ID",
            RunStage::FetchingCatalog => "fetching catalog",
            RunStage::ComparingTimestamp => "comparing publish timestamps",
            RunStage::Downloading => "downloading",
            RunStage::PersistingState => "persisting state",
        };
        f.write_str(s)
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    Downloaded {
        name: String,
        path: PathBuf,
        published: PublishTimestamp,
    },
    SkippedNotNewer {
        candidate: PublishTimestamp,
        previous: PublishTimestamp,
    },
    Failed {
        stage: RunStage,
        error: FetchError,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Downloaded {
                name, published, ..
            } => write!(f, "Downloaded: {name} (published {published})"),
            Outcome::SkippedNotNewer {
                candidate,
                previous,
            } => write!(
                f,
                "No new document to download (latest published {candidate}, last downloaded {previous})"
            ),
            Outcome::Failed { stage, error } => {
                write!(f, "Failed while {stage}: [{}] {error}", error.kind())
            }
        }
    }
}

/// Runs the resolve, fetch, compare, download, persist sequence.
pub struct FetchOrchestrator<T: Transport> {
    config: FetchConfig,
    transport: T,
    state: PublicationState,
}

impl<T: Transport> FetchOrchestrator<T> {
    pub fn new(config: FetchConfig, transport: T) -> Self {
        let state = PublicationState::new(config.state_path.clone());
        Self {
            config,
            transport,
            state,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn state(&self) -> &PublicationState {
        &self.state
    }

    /// Perform one pass. Never panics on remote or local failures; they come
    /// back as `Outcome::Failed`.
    pub fn run(&self) -> Outcome {
        let mut stage = RunStage::AcquiringLock;
        match self.execute(&mut stage) {
            Ok(outcome) => {
                tracing::info!("{outcome}");
                outcome
            }
            Err(error) => {
                tracing::error!("Run failed while {stage}: {error}");
                Outcome::Failed { stage, error }
            }
        }
    }

    fn execute(&self, stage: &mut RunStage) -> FetchResult<Outcome> {
        let _lock = self
            .config
            .lock_path
            .as_deref()
            .map(RunLock::acquire)
            .transpose()?;

        enter(stage, RunStage::ResolvingParameter);
        let parameter = self.resolve_parameter()?;

        enter(stage, RunStage::FetchingCatalog);
        let descriptor = DocumentCatalogClient::new(&self.transport, &self.config)
            .fetch_latest(&parameter.value)?;

        enter(stage, RunStage::ComparingTimestamp);
        let previous = self.state.read()?;
        if let Some(previous) = previous {
            if !is_newer(&descriptor.published, Some(&previous)) {
                return Ok(Outcome::SkippedNotNewer {
                    candidate: descriptor.published,
                    previous,
                });
            }
            tracing::info!(
                "New document is available: {} > {previous}",
                descriptor.published
            );
        } else {
            tracing::info!("No prior publish recorded; treating document as new");
        }

        enter(stage, RunStage::Downloading);
        let path = self.download(&descriptor)?;

        enter(stage, RunStage::PersistingState);
        self.state.write(&descriptor.published)?;

        Ok(Outcome::Downloaded {
            name: descriptor.display_name,
            path,
            published: descriptor.published,
        })
    }

    fn resolve_parameter(&self) -> FetchResult<ResolvedParameter> {
        let resolved = match &self.config.report_type_id {
            Some(id) => ResolvedParameter::new(id.clone(), ParameterSource::Configured),
            None => resolver::fetch_and_resolve(&self.transport, &self.config.discovery_url)?,
        };
        tracing::info!(
            "Using Report Type ID {} (from {})",
            resolved.value,
            resolved.source
        );
        Ok(resolved)
    }

    /// Stream the artifact into a temporary file in the downloads directory
    /// and rename it into place once every byte has arrived.
    fn download(&self, descriptor: &DocumentDescriptor) -> FetchResult<PathBuf> {
        let dir = &self.config.downloads_dir;
        fs::create_dir_all(dir).map_err(|e| download_error("create downloads directory", e))?;

        let target = dir.join(&descriptor.display_name);
        let url = self.config.download_query_url(&descriptor.id);
        tracing::debug!("Downloading {url} -> {}", target.display());

        let mut staged =
            NamedTempFile::new_in(dir).map_err(|e| download_error("create temp file", e))?;
        let bytes = {
            let mut sink = BufWriter::new(staged.as_file_mut());
            let bytes = self
                .transport
                .fetch_to(&url, &mut sink)
                .map_err(|e| FetchError::Download(e.to_string()))?;
            sink.flush().map_err(|e| download_error("flush", e))?;
            bytes
        };
        staged
            .as_file()
            .sync_all()
            .map_err(|e| download_error("sync", e))?;
        staged
            .persist(&target)
            .map_err(|e| download_error("move into place", e.error))?;

        tracing::info!("Downloaded {} ({bytes} bytes)", target.display());
        Ok(target)
    }
}

fn enter(stage: &mut RunStage, next: RunStage) {
    tracing::debug!("{stage} -> {next}");
    *stage = next;
}

fn download_error(step: &str, e: std::io::Error) -> FetchError {
    FetchError::Download(format!("{step}: {e}"))
}
