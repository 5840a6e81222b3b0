//! # WT - Weekly Task Tracker
//!
//! Turns free-text weekly status updates into a short list of imperative
//! "macro" tasks plus the follow-ups that tend to get overlooked, and keeps
//! every processed update in an append-only CSV log.
//!
//! ## Key Features
//!
//! - **Typed or e-mailed updates**: pass the text directly, pipe it via stdin,
//!   or point `--email` at an Outlook `.eml` (or `.msg` with the `msg` feature)
//! - **Weekly de-duplication**: a task already recorded for the same project in
//!   the same ISO week is not repeated
//! - **Append-only log**: one CSV row per update; the log is also what every
//!   query reads, so nothing else needs to be kept in sync
//! - **Filtering and reports**: project, activity type, date range and keyword
//!   filters; per-project rollups; Markdown export
//!
//! ## Quick Start
//!
//! ```bash
//! # Record an update
//! wt submit "We should follow-up on the vendor contract. Lead the Q3 rollout." --project Atlas
//!
//! # Record an update from an e-mail
//! wt submit --email status.eml --activity product-design
//!
//! # Review this week
//! wt history --from 2025-03-03 --project atlas
//!
//! # Export a report
//! wt export -o weekly.md
//! ```
//!
//! The log lives at `$WT_LOG_PATH` (default `./weekly_tasks_log.csv`). Set
//! `RUST_LOG=wt=debug` to see dedup decisions.

use std::process;

use clap::Parser;
use tracing::error;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod dedup;
pub mod derive;
pub mod email;
pub mod error;
pub mod fields;
pub mod query;
pub mod task;
pub mod tracker;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::Settings;
use tracker::WeeklyTaskTracker;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Log to stderr so command output on stdout stays clean.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wt=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> error::Result<()> {
    let mut settings = Settings::load()?;
    if let Some(path) = cli.log {
        settings.log_path = path;
    }

    // Completions and backup never open the tracker.
    let open = || WeeklyTaskTracker::open(&settings.log_path);

    match cli.command {
        Commands::Submit { update, project, context, activity, email, json } => {
            cmd_submit(&open()?, update, project, context, activity, email, json)
        }
        Commands::History { limit, filter, json } => {
            cmd_history(&open()?, limit.unwrap_or(settings.history_limit), &filter, json)
        }
        Commands::Show { id, json } => cmd_show(&open()?, &id, json),
        Commands::Summary { limit, filter } => {
            cmd_summary(&open()?, limit.unwrap_or(settings.export_limit), &filter)
        }
        Commands::Export { output, limit, filter } => {
            cmd_export(&open()?, output, limit.unwrap_or(settings.export_limit), &filter)
        }
        Commands::Ui { limit } => cmd_ui(&open()?, limit.unwrap_or(settings.export_limit)),
        Commands::Backup => cmd_backup(&settings.log_path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn run_args(args: &[&str]) -> error::Result<()> {
        run(Cli::try_parse_from(args.iter().copied()).unwrap())
    }

    #[test]
    fn test_backup_does_not_touch_the_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // Old header: opening the tracker would migrate it.
        std::fs::write(&path, "timestamp,id\r\n").unwrap();
        let log = path.to_str().unwrap();

        run_args(&["wt", "--log", log, "backup"]).unwrap();
        assert_eq!(std::fs::read_dir(dir.path().join("backup")).unwrap().count(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "timestamp,id\r\n");
    }

    #[test]
    fn test_dispatch_opens_the_log_on_demand() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let log = path.to_str().unwrap();

        run_args(&["wt", "--log", log, "completions", "bash"]).unwrap();
        assert!(!path.exists());

        run_args(&["wt", "--log", log, "submit", "Plan the partner webinar for April.", "--project", "Atlas"])
            .unwrap();
        run_args(&["wt", "--log", log, "history", "--project", "atlas"]).unwrap();
        assert_eq!(WeeklyTaskTracker::open(&path).unwrap().history(10).unwrap().len(), 1);
    }
}
