//! The weekly tracker service.
//!
//! `WeeklyTaskTracker` ties the pipeline together:
//! segment → derive → de-duplicate per window → append to the log.
//!
//! One mutex guards the dedup state and every log access, so within a process
//! reads always observe earlier writes and rows never interleave. Nothing
//! guards against a second process writing the same file.

use std::path::PathBuf;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::db::AppendLog;
use crate::dedup::{window_key, DedupWindow};
use crate::derive::{split_sentences, HeuristicExtractor, TaskExtractor};
use crate::error::Result;
use crate::task::{excerpt, WeeklyTaskSubmission, WeeklyTaskSummary};

/// Macro list used when every candidate was already tracked this week.
pub const NO_NEW_MACRO_TASKS: &str =
    "No new macro-level tasks detected beyond the items already tracked in the weekly tracker.";

/// Overlooked list used when every candidate was already tracked this week.
pub fn reconfirm_fallback(project: Option<&str>) -> String {
    format!(
        "Reconfirm risks and dependencies for {} if they change in future updates.",
        project.unwrap_or("the initiative")
    )
}

pub struct WeeklyTaskTracker {
    log: AppendLog,
    extractor: Box<dyn TaskExtractor>,
    seen: Mutex<DedupWindow>,
}

impl WeeklyTaskTracker {
    /// Open (or create) the log and replay it into the dedup window.
    pub fn open(log_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_extractor(log_path, Box::new(HeuristicExtractor))
    }

    pub fn with_extractor(log_path: impl Into<PathBuf>, extractor: Box<dyn TaskExtractor>) -> Result<Self> {
        let log = AppendLog::open(log_path)?;
        let rows = log.read_all()?;
        let seen = DedupWindow::rebuild(&rows);
        info!(path = %log.path().display(), rows = rows.len(), "weekly tracker ready");
        Ok(WeeklyTaskTracker { log, extractor, seen: Mutex::new(seen) })
    }

    pub fn log(&self) -> &AppendLog {
        &self.log
    }

    /// Drop the cached seen-set and replay the log again.
    pub fn rebuild_dedup(&self) -> Result<usize> {
        let mut seen = self.seen.lock();
        let rows = self.log.read_all()?;
        *seen = DedupWindow::rebuild(&rows);
        Ok(seen.len())
    }

    /// Turn a submission into a summary and append it to the log.
    pub fn process_update(&self, submission: &WeeklyTaskSubmission) -> Result<WeeklyTaskSummary> {
        // The log keeps microseconds; match it so returned and re-read summaries agree.
        self.process_update_at(submission, Utc::now().trunc_subsecs(6))
    }

    /// `process_update` with an explicit creation time.
    pub fn process_update_at(
        &self,
        submission: &WeeklyTaskSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<WeeklyTaskSummary> {
        submission.validate()?;

        let mut seen = self.seen.lock();
        let project = submission.project.as_deref();
        let text = submission.update.trim();
        let window = window_key(created_at, project);
        let sentences = split_sentences(text);

        // Nothing reaches `seen` until the row is on disk.
        let mut batch = DedupWindow::new();
        let mut generated = seen.filter_new(&window, self.extractor.macro_tasks(&sentences), &mut batch);
        let mut overlooked =
            seen.filter_new(&window, self.extractor.overlooked_tasks(&sentences, project), &mut batch);
        if generated.is_empty() {
            generated.push(NO_NEW_MACRO_TASKS.to_string());
        }
        if overlooked.is_empty() {
            overlooked.push(reconfirm_fallback(project));
        }

        let summary = WeeklyTaskSummary {
            id: Uuid::new_v4().to_string(),
            created_at,
            project: submission.project.clone(),
            context: submission.context.clone(),
            activity_type: submission.activity_type,
            input_excerpt: excerpt(text),
            generated_tasks: generated,
            overlooked_tasks: overlooked,
        };
        self.log.append(&summary)?;
        seen.merge(batch);
        info!(
            project = project.unwrap_or("-"),
            window = %window,
            entries = summary.generated_tasks.len(),
            overlooked = summary.overlooked_tasks.len(),
            "weekly task report recorded"
        );
        Ok(summary)
    }

    /// Up to `limit` summaries, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<WeeklyTaskSummary>> {
        let _guard = self.seen.lock();
        let mut rows = self.log.read_summaries()?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<WeeklyTaskSummary>> {
        let _guard = self.seen.lock();
        let rows = self.log.read_all()?;
        Ok(rows.iter().find(|row| row.id == id).and_then(|row| row.to_summary()))
    }
}
