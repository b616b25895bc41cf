//! Command line for report-watch: one check-and-download pass per invocation.

pub mod config;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub use config::RunArgs;

use report_watch::FetchError;

#[derive(Parser, Debug)]
#[command(
    name = "report-watch",
    about = "Download a report once per new publication",
    version
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check for a new publication and download it (default).
    Run,

    /// Print the recorded publish timestamp without touching the network.
    Status,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   report-watch completions bash > ~/.local/share/bash-completion/completions/report-watch
    ///   report-watch completions zsh > ~/.zfunc/_report-watch
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

/// Status line for a run that could not start because the HTTP client
/// failed to build. Same shape as a failed run's line.
pub fn client_failure_line(error: &FetchError) -> String {
    format!("Failed while building HTTP client: [{}] {error}", error.kind())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_means_run() {
        let cli = Cli::try_parse_from(["report-watch"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "report-watch",
            "status",
            "--downloads-dir",
            "matrix",
            "--select",
            "newest",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Status)));
        let config = cli.run.to_config();
        assert_eq!(config.downloads_dir, std::path::PathBuf::from("matrix"));
        assert_eq!(
            config.selection,
            report_watch::SelectionPolicy::NewestPublished
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["report-watch", "--timeout-secs", "0"]).is_err());

        let cli = Cli::try_parse_from(["report-watch", "--timeout-secs", "5"]).unwrap();
        assert_eq!(
            cli.run.to_config().timeout,
            std::time::Duration::from_secs(5)
        );
    }

    #[test]
    fn test_client_failure_line() {
        let error = FetchError::from(report_watch::TransportError::Client(
            "no TLS backend".to_string(),
        ));
        let line = client_failure_line(&error);
        assert!(
            line.starts_with("Failed while building HTTP client: [TransportError] "),
            "{line}"
        );
        assert!(line.contains("no TLS backend"), "{line}");
    }

    #[test]
    fn test_bad_selection_is_rejected() {
        assert!(Cli::try_parse_from(["report-watch", "--select", "random"]).is_err());
    }
}
