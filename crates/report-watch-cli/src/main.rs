//! report-watch entry point.

use clap::{CommandFactory, Parser};

use report_watch::{FetchConfig, FetchError, FetchOrchestrator, HttpTransport, PublicationState};
use report_watch_cli::{client_failure_line, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.run.to_config();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let code = run_once(config);
            std::process::exit(code);
        }

        Commands::Status => {
            let state = PublicationState::new(config.state_path.clone());
            match state.read() {
                Ok(Some(published)) => println!("Last downloaded publication: {published}"),
                Ok(None) => println!(
                    "No publication recorded yet ({} does not exist)",
                    state.path().display()
                ),
                Err(e) => {
                    eprintln!("Invalid state file: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "report-watch", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn run_once(config: FetchConfig) -> i32 {
    tracing::debug!(
        "Downloads dir {}, state file {}",
        config.downloads_dir.display(),
        config.state_path.display()
    );

    let transport = match HttpTransport::new(config.timeout, &config.user_agent) {
        Ok(transport) => transport,
        Err(e) => {
            let error = FetchError::from(e);
            tracing::error!("Could not build HTTP client: {error}");
            println!("{}", client_failure_line(&error));
            return 1;
        }
    };
    let outcome = FetchOrchestrator::new(config, transport).run();

    println!("{outcome}");
    outcome.exit_code()
}
