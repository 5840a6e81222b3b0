//! Per-week, per-project task de-duplication.
//!
//! Tasks are only compared inside their window: the ISO week they were
//! recorded in plus the normalized project name. The seen-set is a cache
//! derived from the log and can be rebuilt from it at any time.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

use crate::db::LogRow;

/// Window used when a submission has no project.
pub const GENERAL_WINDOW: &str = "general";

/// Bucket key, e.g. `2025-W02:atlas`.
pub fn window_key(timestamp: DateTime<Utc>, project: Option<&str>) -> String {
    let week = timestamp.iso_week();
    let project_key = project
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| GENERAL_WINDOW.to_string());
    format!("{}-W{:02}:{}", week.year(), week.week(), project_key)
}

/// Collapse whitespace runs and lowercase.
pub fn normalize_task(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Set of `"{window}|{normalized task}"` entries already recorded.
#[derive(Debug, Default)]
pub struct DedupWindow {
    seen: HashSet<String>,
}

impl DedupWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay log rows into a fresh seen-set.
    ///
    /// Rows with an unreadable timestamp are ignored, and a task column with
    /// broken JSON is ignored on its own without dropping the rest of the row.
    pub fn rebuild<'a>(rows: impl IntoIterator<Item = &'a LogRow>) -> Self {
        let mut window = Self::new();
        for row in rows {
            let Some(created) = row.created_at() else {
                continue;
            };
            let key = window_key(created, Some(row.project.as_str()));
            for column in [&row.generated_tasks, &row.overlooked_tasks] {
                let Ok(tasks) = serde_json::from_str::<Vec<String>>(column) else {
                    continue;
                };
                for task in &tasks {
                    window.record(&key, task);
                }
            }
        }
        debug!(entries = window.len(), "rebuilt dedup window");
        window
    }

    pub fn seen(&self, key: &str, task: &str) -> bool {
        self.seen.contains(&seen_key(key, task))
    }

    pub fn record(&mut self, key: &str, task: &str) {
        self.seen.insert(seen_key(key, task));
    }

    /// Record `task` if it is new to the window; returns whether it was new.
    pub fn accept(&mut self, key: &str, task: &str) -> bool {
        let inserted = self.seen.insert(seen_key(key, task));
        if !inserted {
            debug!(window = key, task, "suppressed duplicate task");
        }
        inserted
    }

    /// Candidates not yet seen in the window, without recording them.
    ///
    /// `batch` collects what passes, so repeats across one call (including
    /// across several lists sharing the batch) are dropped too. Fold it in
    /// with [`DedupWindow::merge`] once the tasks are persisted.
    pub fn filter_new(&self, key: &str, candidates: Vec<String>, batch: &mut DedupWindow) -> Vec<String> {
        candidates
            .into_iter()
            .filter(|task| !self.seen(key, task) && batch.accept(key, task))
            .collect()
    }

    /// Absorb entries recorded elsewhere, e.g. a batch that was just written.
    pub fn merge(&mut self, other: DedupWindow) {
        self.seen.extend(other.seen);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn seen_key(window: &str, task: &str) -> String {
    format!("{window}|{}", normalize_task(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_key_format() {
        assert_eq!(window_key(at(2025, 1, 8), Some("  Atlas ")), "2025-W02:atlas");
        assert_eq!(window_key(at(2025, 1, 8), None), "2025-W02:general");
        assert_eq!(window_key(at(2025, 1, 8), Some("   ")), "2025-W02:general");
    }

    #[test]
    fn test_window_key_uses_iso_year() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        assert_eq!(window_key(at(2024, 12, 30), None), "2025-W01:general");
        // 2021-01-03 is a Sunday in ISO week 53 of 2020.
        assert_eq!(window_key(at(2021, 1, 3), Some("x")), "2020-W53:x");
    }

    #[test]
    fn test_normalized_comparison() {
        let mut window = DedupWindow::new();
        let key = window_key(at(2025, 3, 4), Some("Atlas"));
        window.record(&key, "Ship  the\tPage.");
        assert!(window.seen(&key, "ship the page."));
        assert!(!window.seen(&key, "ship the page"));
        assert!(!window.seen("2025-W11:other", "ship the page."));
    }

    #[test]
    fn test_filter_new_drops_repeats_within_call() {
        let mut window = DedupWindow::new();
        let key = "2025-W10:atlas";
        window.record(key, "Book travel.");

        let mut batch = DedupWindow::new();
        let kept = window.filter_new(
            key,
            vec!["Plan the offsite.".into(), "plan  the offsite.".into(), "Book travel.".into()],
            &mut batch,
        );
        assert_eq!(kept, vec!["Plan the offsite."]);
        // Nothing is recorded until the batch is merged.
        assert_eq!(window.len(), 1);
        assert!(!window.seen(key, "plan the offsite."));

        window.merge(batch);
        assert_eq!(window.len(), 2);
        assert!(window.filter_new(key, vec!["Plan the offsite.".into()], &mut DedupWindow::new()).is_empty());
    }

    #[test]
    fn test_rebuild_skips_bad_rows_and_columns() {
        let good = LogRow {
            timestamp: "2025-01-08T10:00:00.000000+00:00".into(),
            id: "a".into(),
            project: "Atlas".into(),
            generated_tasks: r#"["Lead the rollout."]"#.into(),
            overlooked_tasks: "not json".into(),
            ..LogRow::default()
        };
        let bad_time = LogRow {
            timestamp: "yesterday".into(),
            id: "b".into(),
            generated_tasks: r#"["Ghost task."]"#.into(),
            ..LogRow::default()
        };
        let window = DedupWindow::rebuild([&good, &bad_time]);
        assert_eq!(window.len(), 1);
        assert!(window.seen("2025-W02:atlas", "lead the rollout."));
    }
}
