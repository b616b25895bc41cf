//! Run configuration: endpoints, storage locations, and selection policy.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::types::DocId;

pub const DEFAULT_DISCOVERY_URL: &str =
    "https://www.ercot.com/mp/data-products/data-product-details?id=NP9-605-M";
pub const DEFAULT_CATALOG_URL: &str =
    "https://www.ercot.com/misapp/servlets/IceDocListJsonWS?reportTypeId=";
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://www.ercot.com/misdownload/servlets/mirDownload?doclookupId=";
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";
pub const DEFAULT_EXTENSION: &str = "docx";
pub const STATE_FILE_NAME: &str = "last_published_date.txt";
pub const LOCK_FILE_NAME: &str = ".report-watch.lock";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How the catalog entry for a run is chosen among the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// First candidate in the order the endpoint returned them.
    #[default]
    ListOrder,
    /// Candidate with the greatest publish timestamp; ties keep list order.
    NewestPublished,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "list-order" | "first" => Ok(SelectionPolicy::ListOrder),
            "newest" | "newest-published" => Ok(SelectionPolicy::NewestPublished),
            other => Err(format!(
                "unknown selection policy {other:?} (expected list-order or newest)"
            )),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::ListOrder => f.write_str("list-order"),
            SelectionPolicy::NewestPublished => f.write_str("newest"),
        }
    }
}

/// Everything a run needs, passed to the orchestrator at construction.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Page scraped for the Report Type ID.
    pub discovery_url: String,
    /// Listing endpoint; the identifier is appended.
    pub catalog_url: String,
    /// Download endpoint; the document id is appended.
    pub download_url: String,
    pub downloads_dir: PathBuf,
    pub state_path: PathBuf,
    /// Skips discovery when set.
    pub report_type_id: Option<String>,
    /// Only entries with this extension are candidates. `None` accepts all.
    pub extension: Option<String>,
    pub selection: SelectionPolicy,
    pub timeout: Duration,
    pub user_agent: String,
    /// Lock file guarding against overlapping runs. `None` disables locking.
    pub lock_path: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::for_downloads_dir(DEFAULT_DOWNLOADS_DIR)
    }
}

impl FetchConfig {
    /// Default endpoints with state and lock files placed inside `dir`.
    pub fn for_downloads_dir(dir: impl AsRef<Path>) -> Self {
        let downloads_dir = dir.as_ref().to_path_buf();
        Self {
            discovery_url: DEFAULT_DISCOVERY_URL.to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            state_path: downloads_dir.join(STATE_FILE_NAME),
            lock_path: Some(downloads_dir.join(LOCK_FILE_NAME)),
            downloads_dir,
            report_type_id: None,
            extension: Some(DEFAULT_EXTENSION.to_string()),
            selection: SelectionPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("report-watch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Listing URL for a resolved identifier.
    pub fn catalog_query_url(&self, identifier: &str) -> String {
        format!("{}{}", self.catalog_url, identifier)
    }

    /// Download URL for a catalog document.
    pub fn download_query_url(&self, id: &DocId) -> String {
        format!("{}{}", self.download_url, id)
    }
}
