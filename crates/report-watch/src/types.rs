//! Core data types for catalog entries, publish timestamps, and errors.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

use crate::transport::TransportError;

/// Offset-carrying layouts accepted besides RFC 3339.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

/// Opaque identifier of a downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocId(pub String);

impl DocId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A timezone-aware publish moment, keeping the upstream text verbatim.
///
/// Equality and ordering compare the instant only, so
/// `2024-06-01T10:00:00-05:00` equals `2024-06-01T15:00:00+00:00`.
#[derive(Debug, Clone)]
pub struct PublishTimestamp {
    raw: String,
    at: DateTime<FixedOffset>,
}

impl PublishTimestamp {
    /// Parse a timestamp that carries a UTC offset. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let at = DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        })?;

        Some(Self {
            raw: raw.to_string(),
            at,
        })
    }

    /// The text exactly as it was received.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

impl PartialEq for PublishTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for PublishTimestamp {}

impl PartialOrd for PublishTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublishTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at)
    }
}

impl fmt::Display for PublishTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The catalog entry chosen for this run, validated at the parse boundary.
#[derive(Debug, Clone)]
pub struct DocumentDescriptor {
    pub id: DocId,
    /// Local file name for the artifact.
    pub display_name: String,
    pub extension: Option<String>,
    pub published: PublishTimestamp,
}

/// Where the catalog identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    /// Fixed in configuration; discovery was skipped.
    Configured,
    /// The span following the label on the discovery page.
    Structured,
    /// The `Report Type ID: <digits>` pattern in the page text.
    Pattern,
}

impl fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterSource::Configured => f.write_str("configuration"),
            ParameterSource::Structured => f.write_str("structured lookup"),
            ParameterSource::Pattern => f.write_str("pattern fallback"),
        }
    }
}

/// The catalog identifier, fixed for the remainder of a run once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameter {
    pub value: String,
    pub source: ParameterSource,
}

impl ResolvedParameter {
    pub fn new(value: impl Into<String>, source: ParameterSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// Errors that can end a run.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Report Type ID not found on discovery page")]
    ParameterNotFound,

    #[error("No documents in catalog{}", describe_filter(.filter))]
    EmptyCatalog { filter: Option<String> },

    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("Corrupt state file {}: {value:?} is not a timestamp", .path.display())]
    CorruptState { path: PathBuf, value: String },

    #[error("Download error: {0}")]
    Download(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("State write error: {0}")]
    StateWrite(String),

    #[error("Another run holds the lock at {}", .0.display())]
    Locked(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Stable short name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::ParameterNotFound => "ParameterNotFound",
            FetchError::EmptyCatalog { .. } => "EmptyCatalog",
            FetchError::MalformedResponse(_) => "MalformedResponse",
            FetchError::CorruptState { .. } => "CorruptState",
            FetchError::Download(_) => "DownloadError",
            FetchError::Transport(_) => "TransportError",
            FetchError::StateWrite(_) => "StateWriteError",
            FetchError::Locked(_) => "Locked",
            FetchError::Io(_) => "IoError",
        }
    }
}

fn describe_filter(filter: &Option<String>) -> String {
    match filter {
        Some(ext) => format!(" with extension {ext:?}"),
        None => String::new(),
    }
}

/// Convenience result type.
pub type FetchResult<T> = Result<T, FetchError>;
