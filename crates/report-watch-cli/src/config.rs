//! Command-line and environment overrides on top of the default configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use report_watch::{FetchConfig, SelectionPolicy};

/// Extension value that turns filtering off.
const ANY_EXTENSION: &str = "any";

/// Flags shared by every subcommand. Each falls back to an environment
/// variable, then to the built-in default.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Page scraped for the Report Type ID.
    #[arg(long, global = true, env = "REPORT_WATCH_DISCOVERY_URL")]
    pub discovery_url: Option<String>,

    /// Listing endpoint; the Report Type ID is appended.
    #[arg(long, global = true, env = "REPORT_WATCH_CATALOG_URL")]
    pub catalog_url: Option<String>,

    /// Download endpoint; the document id is appended.
    #[arg(long, global = true, env = "REPORT_WATCH_DOWNLOAD_URL")]
    pub download_url: Option<String>,

    /// Directory that receives downloaded documents.
    #[arg(long, global = true, env = "REPORT_WATCH_DOWNLOADS_DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// State file holding the last publish timestamp [default: <downloads-dir>/last_published_date.txt].
    #[arg(long, global = true, env = "REPORT_WATCH_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Use this Report Type ID and skip page discovery.
    #[arg(long, global = true, env = "REPORT_WATCH_REPORT_TYPE_ID")]
    pub report_type_id: Option<String>,

    /// Only consider documents with this extension ("any" accepts all) [default: docx].
    #[arg(long, global = true, env = "REPORT_WATCH_EXTENSION")]
    pub extension: Option<String>,

    /// Catalog entry selection: list-order or newest.
    #[arg(long, global = true, env = "REPORT_WATCH_SELECT")]
    pub select: Option<SelectionPolicy>,

    /// Per-request HTTP timeout in seconds (at least 1).
    #[arg(
        long,
        global = true,
        env = "REPORT_WATCH_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: Option<u64>,

    /// Do not take the run lock file.
    #[arg(long, global = true)]
    pub no_lock: bool,
}

impl RunArgs {
    /// Apply the overrides to the defaults.
    pub fn to_config(&self) -> FetchConfig {
        let mut config = match &self.downloads_dir {
            Some(dir) => FetchConfig::for_downloads_dir(dir),
            None => FetchConfig::default(),
        };

        if let Some(url) = &self.discovery_url {
            config.discovery_url = url.clone();
        }
        if let Some(url) = &self.catalog_url {
            config.catalog_url = url.clone();
        }
        if let Some(url) = &self.download_url {
            config.download_url = url.clone();
        }
        if let Some(path) = &self.state_file {
            config.state_path = path.clone();
        }
        if let Some(id) = &self.report_type_id {
            let id = id.trim();
            if !id.is_empty() {
                config.report_type_id = Some(id.to_string());
            }
        }
        if let Some(ext) = &self.extension {
            let ext = ext.trim().trim_start_matches('.');
            config.extension = if ext.is_empty() || ext.eq_ignore_ascii_case(ANY_EXTENSION) {
                None
            } else {
                Some(ext.to_string())
            };
        }
        if let Some(policy) = self.select {
            config.selection = policy;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if self.no_lock {
            config.lock_path = None;
        }

        config
    }
}
