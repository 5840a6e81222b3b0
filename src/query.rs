//! Filtering, grouping and reporting over tracker history.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::db::parse_timestamp;
use crate::fields::ActivityType;
use crate::task::WeeklyTaskSummary;

/// Group name for entries without a project.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Independent, composable history filters. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Case-insensitive substring of the project name.
    pub project: Option<String>,
    /// Exactly this activity type. Takes precedence over `activity_types`.
    pub activity_type: Option<ActivityType>,
    pub activity_types: Vec<ActivityType>,
    /// Inclusive lower bound on `created_at`.
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub date_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring of context, project, excerpt or any task.
    pub keyword: Option<String>,
}

impl HistoryFilter {
    pub fn is_empty(&self) -> bool {
        self.project.is_none()
            && self.activity_type.is_none()
            && self.activity_types.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.keyword.is_none()
    }

    pub fn matches(&self, entry: &WeeklyTaskSummary) -> bool {
        if let Some(ref project) = self.project {
            let term = project.to_lowercase();
            match entry.project {
                Some(ref p) if p.to_lowercase().contains(&term) => {}
                _ => return false,
            }
        }

        if let Some(activity) = self.activity_type {
            if entry.activity_type != activity {
                return false;
            }
        } else if !self.activity_types.is_empty() && !self.activity_types.contains(&entry.activity_type) {
            return false;
        }

        if let Some(from) = self.date_from {
            if entry.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if entry.created_at > to {
                return false;
            }
        }

        if let Some(ref keyword) = self.keyword {
            let term = keyword.to_lowercase();
            let hit = |s: &str| s.to_lowercase().contains(&term);
            let found = entry.context.as_deref().is_some_and(hit)
                || entry.project.as_deref().is_some_and(hit)
                || hit(entry.input_excerpt.as_str())
                || entry.generated_tasks.iter().any(|t| hit(t.as_str()))
                || entry.overlooked_tasks.iter().any(|t| hit(t.as_str()));
            if !found {
                return false;
            }
        }
        true
    }
}

/// Entries matching `filter`, order preserved.
pub fn filter_entries(entries: &[WeeklyTaskSummary], filter: &HistoryFilter) -> Vec<WeeklyTaskSummary> {
    entries.iter().filter(|e| filter.matches(e)).cloned().collect()
}

/// Parse a date bound from user input.
///
/// Accepts RFC 3339 (`Z` included), a naive `YYYY-MM-DDTHH:MM:SS` read as UTC,
/// or a bare `YYYY-MM-DD`, which covers the whole day: midnight for a lower
/// bound, the last instant of the day for an upper one.
pub fn parse_date_bound(input: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Some(ts) = parse_timestamp(input) {
        return Some(ts);
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };
    Some(date.and_time(time).and_utc())
}

/// Per-project counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRollup {
    pub total: usize,
    pub by_activity: BTreeMap<ActivityType, usize>,
}

pub fn group_by_project(entries: &[WeeklyTaskSummary]) -> BTreeMap<String, ProjectRollup> {
    let mut groups: BTreeMap<String, ProjectRollup> = BTreeMap::new();
    for entry in entries {
        let key = entry.project.clone().unwrap_or_else(|| UNCATEGORIZED.to_string());
        let rollup = groups.entry(key).or_default();
        *rollup.by_activity.entry(entry.activity_type).or_default() += 1;
        rollup.total += 1;
    }
    groups
}

pub fn group_by_activity(entries: &[WeeklyTaskSummary]) -> BTreeMap<ActivityType, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.activity_type).or_default() += 1;
    }
    counts
}

/// Markdown export of `entries`.
///
/// `entries` is expected newest first (as returned by history); sections are
/// written oldest first. The output depends only on the arguments.
pub fn render_report(entries: &[WeeklyTaskSummary], generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        "# Weekly Task Tracker Export".to_string(),
        String::new(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        format!("Total entries: {}", entries.len()),
        String::new(),
    ];
    for entry in entries.iter().rev() {
        let header = entry.project.as_deref().unwrap_or("General update");
        lines.push(format!("## {header} ({})", entry.created_at.format("%Y-%m-%d %H:%M UTC")));
        lines.push(format!("*Activity type:* {}", entry.activity_type.display_name()));
        if let Some(ref context) = entry.context {
            lines.push(format!("**Context:** {context}"));
        }
        lines.push(String::new());
        lines.push("### Macro tasks".to_string());
        lines.extend(entry.generated_tasks.iter().map(|t| format!("- {t}")));
        lines.push(String::new());
        lines.push("### Overlooked / missing tasks".to_string());
        lines.extend(entry.overlooked_tasks.iter().map(|t| format!("- {t}")));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Default export file name, e.g. `weekly-tasks-20250303-090000.md`.
pub fn report_filename(at: DateTime<Utc>) -> String {
    format!("weekly-tasks-{}.md", at.format("%Y%m%d-%H%M%S"))
}
