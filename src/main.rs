use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use relcheck::{
    Config, ConfigError, ConsoleReporter, GitHubClient, Notifier, Outcome, Report, StateStore,
};

#[derive(Parser)]
#[command(name = "relcheck")]
#[command(version, about = "Check an upstream project for new releases and announce each one once")]
struct Cli {
    /// JSON config file (defaults to ~/.config/relcheck/config.json when present)
    #[arg(long, global = true, env = "RELCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// GitHub repository to watch, as owner/name
    #[arg(long, global = true, env = "RELCHECK_REPO")]
    repo: Option<String>,

    /// Notification state file
    #[arg(long, global = true, env = "RELCHECK_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print an update report: local version, latest release, recent activity
    Check,
    /// Check once and send a notification if a new release appeared
    Notify {
        /// Channel address passed to the sender, e.g. telegram:123456
        #[arg(long, env = "RELCHECK_TARGET")]
        target: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => tracing::Level::DEBUG,
        (Command::Notify { .. }, false) => tracing::Level::INFO,
        (Command::Check, false) => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(repo) = cli.repo {
        config.repo = repo;
    }
    if let Some(path) = cli.state_file {
        config.state_file = Some(path);
    }

    let github = GitHubClient::new(&config.api_base, config.http_timeout())
        .context("failed to build HTTP client")?;
    let probe = config.command_probe();

    match cli.command {
        Command::Check => {
            let report = Report {
                config: &config,
                source: &github,
                feed: &github,
                probe: &probe,
            };
            let mut out = ConsoleReporter::new(std::io::stdout().lock());
            report
                .render(&mut out, Local::now())
                .context("failed to write report")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Notify { target } => {
            let target = target
                .or_else(|| config.sender.target.clone())
                .ok_or(ConfigError::MissingTarget)?;
            let sender = config.command_sender();
            let store = StateStore::new(config.state_path());
            let template = config.message_template();

            let notifier = Notifier::new(&github, &probe, &sender, &store, &template, &target);
            match notifier.run() {
                Ok(Outcome::Notified { tag, .. }) => {
                    info!(%tag, "done, notification delivered");
                    Ok(ExitCode::SUCCESS)
                }
                Ok(Outcome::Skipped { tag, reason, .. }) => {
                    info!(%tag, ?reason, "done, nothing to announce");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(error = %e, "check failed");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
