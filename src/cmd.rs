//! Command implementations for the CLI interface.
//!
//! Each handler takes the already-opened tracker (or just the log path for
//! commands that never touch tracker state) and prints its result to stdout.
//! Errors are returned to `main`, which reports them and exits non-zero.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use clap::{Args, Subcommand};
use clap_complete::{generate, Shell};

use crate::db::create_backup;
use crate::email::parse_email;
use crate::error::{Result, TrackerError};
use crate::fields::ActivityType;
use crate::query::*;
use crate::task::{WeeklyTaskSubmission, WeeklyTaskSummary};
use crate::tracker::WeeklyTaskTracker;
use crate::tui::run::run_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Record a weekly update and print the derived tasks.
    Submit {
        /// Update text. Use "-" to read it from stdin. Optional with --email.
        update: Option<String>,
        /// Project or initiative name.
        #[arg(long)]
        project: Option<String>,
        /// Where the update came from (weekly sync, e-mail, ...).
        #[arg(long)]
        context: Option<String>,
        /// Activity type used for filtering and reports.
        #[arg(long, value_enum, default_value_t = ActivityType::CampaignExecution)]
        activity: ActivityType,
        /// Outlook e-mail (.eml or .msg) to take the update from.
        #[arg(long)]
        email: Option<PathBuf>,
        /// Print the stored summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recorded summaries, newest first.
    History {
        /// Maximum number of entries to read (default: $WT_HISTORY_LIMIT or 20).
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one summary by ID.
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Count entries per project and per activity type.
    Summary {
        /// Maximum number of entries to read (default: $WT_EXPORT_LIMIT or 500).
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Export history as a Markdown report.
    Export {
        /// Output file path (default: weekly-tasks-<timestamp>.md)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Maximum number of entries to export (default: $WT_EXPORT_LIMIT or 500).
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Create a timestamped backup of the log.
    Backup,

    /// Browse history in the terminal UI.
    Ui {
        /// Maximum number of entries to load (default: $WT_EXPORT_LIMIT or 500).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// History filters shared by `history`, `summary` and `export`.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Project name contains this text (case-insensitive).
    #[arg(long)]
    pub project: Option<String>,
    /// Only this activity type.
    #[arg(long, value_enum)]
    pub activity: Option<ActivityType>,
    /// Any of these activity types (comma-separated). Ignored with --activity.
    #[arg(long, value_enum, value_delimiter = ',')]
    pub activities: Vec<ActivityType>,
    /// Created at or after: YYYY-MM-DD or an RFC 3339 timestamp.
    #[arg(long)]
    pub from: Option<String>,
    /// Created at or before: YYYY-MM-DD or an RFC 3339 timestamp.
    #[arg(long)]
    pub to: Option<String>,
    /// Text to look for in context, project, excerpt and tasks.
    #[arg(long)]
    pub keyword: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<HistoryFilter> {
        let bound = |raw: &Option<String>, end_of_day: bool| -> Result<_> {
            match raw {
                None => Ok(None),
                Some(s) => parse_date_bound(s, end_of_day)
                    .map(Some)
                    .ok_or_else(|| TrackerError::Validation(format!("Unrecognised date '{s}'"))),
            }
        };
        Ok(HistoryFilter {
            project: self.project.clone().filter(|p| !p.trim().is_empty()),
            activity_type: self.activity,
            activity_types: self.activities.clone(),
            date_from: bound(&self.from, false)?,
            date_to: bound(&self.to, true)?,
            keyword: self.keyword.clone().filter(|k| !k.trim().is_empty()),
        })
    }
}

/// Build a submission from CLI input and run it through the tracker.
#[allow(clippy::too_many_arguments)]
pub fn cmd_submit(
    tracker: &WeeklyTaskTracker,
    update: Option<String>,
    project: Option<String>,
    context: Option<String>,
    activity: ActivityType,
    email: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let update = match update.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Some(buf)
        }
        _ => update,
    };

    let submission = match email {
        Some(path) => {
            let bytes = fs::read(&path)?;
            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            parse_email(filename, &bytes)?.into_submission(project, context, activity, update)?
        }
        None => {
            let update = update.ok_or_else(|| {
                TrackerError::Validation("Update text is required when no email file is provided".into())
            })?;
            WeeklyTaskSubmission::new(project, context, activity, update)?
        }
    };

    let summary = tracker.process_update(&submission)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// List history with optional filtering.
pub fn cmd_history(tracker: &WeeklyTaskTracker, limit: usize, filter: &FilterArgs, json: bool) -> Result<()> {
    let entries = filter_entries(&tracker.history(limit)?, &filter.to_filter()?);
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No entries found.");
    } else {
        print_table(&entries);
    }
    Ok(())
}

pub fn cmd_show(tracker: &WeeklyTaskTracker, id: &str, json: bool) -> Result<()> {
    let Some(summary) = tracker.get_by_id(id)? else {
        return Err(TrackerError::Validation(format!("No entry with ID {id}")));
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Print per-project and per-activity counts.
pub fn cmd_summary(tracker: &WeeklyTaskTracker, limit: usize, filter: &FilterArgs) -> Result<()> {
    let entries = filter_entries(&tracker.history(limit)?, &filter.to_filter()?);
    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!("By project:");
    for (project, rollup) in group_by_project(&entries) {
        let breakdown = rollup
            .by_activity
            .iter()
            .map(|(activity, n)| format!("{} {}", activity.display_name(), n))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<24} total {:<4} ({})", truncate(&project, 24), rollup.total, breakdown);
    }
    println!();
    println!("By activity:");
    for (activity, n) in group_by_activity(&entries) {
        println!("  {} {:<24} {}", activity.icon(), activity.display_name(), n);
    }
    Ok(())
}

/// Write the Markdown report for the (filtered) history to a file.
pub fn cmd_export(
    tracker: &WeeklyTaskTracker,
    output: Option<PathBuf>,
    limit: usize,
    filter: &FilterArgs,
) -> Result<()> {
    let entries = filter_entries(&tracker.history(limit)?, &filter.to_filter()?);
    if entries.is_empty() {
        return Err(TrackerError::Validation("No weekly tracker entries to export".into()));
    }
    let now = Utc::now().trunc_subsecs(0);
    let output_path = output.unwrap_or_else(|| PathBuf::from(report_filename(now)));
    fs::write(&output_path, render_report(&entries, now))?;
    println!("Exported {} entr{} to {}", entries.len(), if entries.len() == 1 { "y" } else { "ies" }, output_path.display());
    Ok(())
}

pub fn cmd_backup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Err(TrackerError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Log file {} does not exist", log_path.display()),
        )));
    }
    let backup_path = create_backup(log_path)?;
    println!("Backup created: {}", backup_path.display());
    Ok(())
}

/// Launch the terminal history browser.
pub fn cmd_ui(tracker: &WeeklyTaskTracker, limit: usize) -> Result<()> {
    let entries = tracker.history(limit)?;
    run_tui(entries)?;
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut io::stdout());
}

/// Print one summary in full.
pub fn print_summary(summary: &WeeklyTaskSummary) {
    println!("ID:        {}", summary.id);
    println!("Created:   {}", summary.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Project:   {}", summary.project.as_deref().unwrap_or("-"));
    println!("Context:   {}", summary.context.as_deref().unwrap_or("-"));
    println!("Activity:  {} {}", summary.activity_type.icon(), summary.activity_type.display_name());
    println!("Excerpt:   {}", summary.input_excerpt.replace('\n', " "));
    println!();
    println!("Macro tasks:");
    for task in &summary.generated_tasks {
        println!("  - {task}");
    }
    println!("Overlooked / missing tasks:");
    for task in &summary.overlooked_tasks {
        println!("  - {task}");
    }
}

/// Print summaries as a compact table.
pub fn print_table(entries: &[WeeklyTaskSummary]) {
    println!(
        "{:<8} {:<16} {:<22} {:<16} {:>5} {:>5}  {}",
        "ID", "Created", "Activity", "Project", "Macro", "Miss", "Context"
    );
    for e in entries {
        println!(
            "{:<8} {:<16} {:<22} {:<16} {:>5} {:>5}  {}",
            truncate(&e.id, 8),
            e.created_at.format("%Y-%m-%d %H:%M"),
            e.activity_type.display_name(),
            truncate(e.project.as_deref().unwrap_or("-"), 16),
            e.generated_tasks.len(),
            e.overlooked_tasks.len(),
            truncate(e.context.as_deref().unwrap_or("-"), 40),
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
