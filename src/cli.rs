use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed weekly task tracker.
/// The log defaults to $WT_LOG_PATH, then ./weekly_tasks_log.csv; --log overrides both.
#[derive(Parser)]
#[command(name = "wt", version, about = "Turn weekly status updates into de-duplicated tasks")]
pub struct Cli {
    /// Path to the CSV log file.
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
